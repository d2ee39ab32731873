//! Crates.io backend
//!
//! This module ties the registry client to the item model:
//! - Incremental aggregation of enriched crates since a watermark
//! - Single-shot summary capture
//! - Wrapping every item in an [`ItemEnvelope`]
//!
//! # Example
//!
//! ```no_run
//! use crates_harvester::backend::CratesBackend;
//! use crates_harvester::client::CratesClient;
//! use crates_harvester::config::ClientConfig;
//! use crates_harvester::dates::DEFAULT_DATETIME;
//! use crates_harvester::item::Category;
//!
//! # async fn example() -> crates_harvester::Result<()> {
//! let config = ClientConfig::default();
//! let backend = CratesBackend::new(CratesClient::new(&config)?, &config.origin);
//!
//! let mut items = backend.fetch(Category::Crate, DEFAULT_DATETIME)?;
//! while let Some(envelope) = items.next_item().await? {
//!     println!("{} updated at {}", envelope.uuid, envelope.updated_on);
//! }
//! # Ok(())
//! # }
//! ```

mod aggregator;
mod envelope;
mod summary;

pub use aggregator::{fetch_crate, CrateFeed};
pub use envelope::{item_uuid, ItemEnvelope, SearchFields};
pub use summary::fetch_summary;

use crate::archive::ArchiveMetadata;
use crate::client::CratesClient;
use crate::dates::format_timestamp;
use crate::item::{Category, Item};
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Name reported in item envelopes and archive metadata
pub const BACKEND_NAME: &str = "Crates";

/// Version reported in item envelopes and archive metadata
pub const BACKEND_VERSION: &str = "1.0.0";

/// Decodes a JSON payload, tagging failures with the resource they came from
pub(crate) fn decode<T: DeserializeOwned>(raw: &str, resource: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|source| HarvestError::Decode {
        resource: resource.to_string(),
        source,
    })
}

/// Fetches crates.io items and wraps them in envelopes
pub struct CratesBackend {
    client: CratesClient,
    origin: String,
    tag: String,
}

impl CratesBackend {
    /// Creates a backend; the tag defaults to the origin
    pub fn new(client: CratesClient, origin: &str) -> Self {
        Self {
            client,
            origin: origin.to_string(),
            tag: origin.to_string(),
        }
    }

    /// Labels every emitted item with `tag`
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Whether fetches can be recorded to and replayed from an archive
    pub fn has_archiving() -> bool {
        true
    }

    /// Whether an interrupted fetch can be resumed
    pub fn has_resuming() -> bool {
        false
    }

    /// The registry URL items are attributed to
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Label stamped on every emitted item
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The API client this backend fetches through
    pub fn client(&self) -> &CratesClient {
        &self.client
    }

    /// Describes a fetch for archive metadata
    pub fn archive_metadata(&self, category: Category, from_date: DateTime<Utc>) -> ArchiveMetadata {
        ArchiveMetadata::new(
            &self.origin,
            BACKEND_NAME,
            BACKEND_VERSION,
            category.as_str(),
            json!({
                "from_date": format_timestamp(from_date),
                "tag": self.tag,
            }),
        )
    }

    /// Starts fetching items of one category
    ///
    /// For [`Category::Crate`], only crates updated at or after `from_date`
    /// are emitted. The watermark is ignored for [`Category::Summary`].
    pub fn fetch(&self, category: Category, from_date: DateTime<Utc>) -> Result<ItemFetch<'_>> {
        tracing::info!(
            "Fetching {} from {} since {}",
            category,
            self.origin,
            format_timestamp(from_date)
        );

        let source = match category {
            Category::Crate => Source::Crates(CrateFeed::new(&self.client, from_date)?),
            Category::Summary => Source::Summary { done: false },
        };

        Ok(ItemFetch {
            backend: self,
            source,
            fetched: 0,
        })
    }
}

enum Source<'a> {
    Crates(CrateFeed<'a>),
    Summary { done: bool },
}

/// Pull-based sequence of enveloped items from one fetch
pub struct ItemFetch<'a> {
    backend: &'a CratesBackend,
    source: Source<'a>,
    fetched: u64,
}

impl<'a> ItemFetch<'a> {
    /// Returns the next raw item
    pub async fn next_raw(&mut self) -> Result<Option<Item>> {
        let item = match &mut self.source {
            Source::Crates(feed) => feed.next_crate().await?.map(Item::from),
            Source::Summary { done } => {
                if *done {
                    None
                } else {
                    *done = true;
                    Some(Item::from(fetch_summary(&self.backend.client).await?))
                }
            }
        };

        if item.is_some() {
            self.fetched += 1;
        }
        Ok(item)
    }

    /// Returns the next item wrapped in its envelope
    pub async fn next_item(&mut self) -> Result<Option<ItemEnvelope>> {
        let backend = self.backend;
        Ok(self
            .next_raw()
            .await?
            .map(|item| ItemEnvelope::wrap(item, &backend.origin, &backend.tag)))
    }

    /// Number of items produced so far
    pub fn fetched(&self) -> u64 {
        self.fetched
    }
}
