//! Crates-Harvester: an incremental crates.io data connector
//!
//! This crate walks the crates.io registry API, enriches every recently
//! updated crate with its owners, versions and download statistics, and emits
//! the results (plus a registry-wide summary) as uniform item envelopes for
//! downstream indexing.

pub mod archive;
pub mod backend;
pub mod client;
pub mod config;
pub mod dates;
pub mod item;

use thiserror::Error;

/// Main error type for Crates-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    Transport {
        url: String,
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}: {body}")]
    HttpStatus { url: String, status: u16, body: String },

    #[error("Failed to decode JSON from {resource}: {source}")]
    Decode {
        resource: String,
        source: serde_json::Error,
    },

    #[error("Missing or invalid field '{field}' in {context}")]
    Schema { context: String, field: String },

    #[error("Invalid timestamp: '{0}'")]
    InvalidTimestamp(String),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Creates a schema error for a missing or malformed field
    pub fn schema(context: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Schema {
            context: context.into(),
            field: field.into(),
        }
    }

    /// Returns the HTTP status code if this error came from a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Archive-specific errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("No archived response for {uri} (hashcode {hashcode})")]
    ResponseNotFound { uri: String, hashcode: String },

    #[error("Response for {uri} is already archived")]
    DuplicateEntry { uri: String },

    #[error("Archive metadata is missing")]
    MissingMetadata,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for Crates-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for archive operations
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

// Re-export commonly used types
pub use archive::{Archive, ArchiveMetadata};
pub use backend::{CratesBackend, ItemEnvelope};
pub use client::{CrateAttribute, CratesClient, Transport};
pub use config::Config;
pub use item::{Category, CrateRecord, Item, Summary};
