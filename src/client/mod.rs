//! Registry client
//!
//! This module contains everything that talks to the registry API:
//! - A retrying HTTP transport with archive record/replay
//! - The paginated crate listing walker
//! - Typed accessors for summary, crate detail and crate sub-resources

mod pages;
mod resources;
mod transport;

pub use pages::CratePages;
pub use resources::{join_path, CrateAttribute, CratesClient};
pub use transport::{build_http_client, ArchiveMode, Transport};
