//! Configuration module for Crates-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every setting has a default, so a configuration file is optional.
//!
//! # Example
//!
//! ```no_run
//! use crates_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvester.toml")).unwrap();
//! println!("Retries per request: {}", config.client.max_retries);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{ClientConfig, Config, CRATES_API_URL, CRATES_URL, MAX_RETRIES, SLEEP_TIME};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
