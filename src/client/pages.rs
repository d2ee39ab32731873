//! Paginated listing fetcher
//!
//! Walks `GET /crates?sort=alphabetical&page=N` one page at a time. The first
//! page's `meta.total` fixes how many entries the walk expects, and the walk
//! ends once that many entries have been seen.
//!
//! A page that comes back empty also ends the walk, even when fewer than
//! `total` entries were seen. This guard sits on top of the total-based stop
//! and keeps a registry that shrinks mid-walk from paging forever.

use crate::client::Transport;
use crate::{HarvestError, Result};
use serde::de::IgnoredAny;
use serde::Deserialize;
use url::Url;

/// Only the bookkeeping parts of a listing page
#[derive(Debug, Deserialize)]
struct PageEnvelope {
    crates: Option<Vec<IgnoredAny>>,
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    total: Option<u64>,
}

/// Lazy, finite, non-restartable sequence of raw listing pages
///
/// Pull pages with [`CratePages::next_page`]. After the last page, or after
/// any error, every further call returns `Ok(None)`.
pub struct CratePages<'a> {
    transport: &'a Transport,
    url: Url,
    page: u32,
    parsed: u64,
    total: Option<u64>,
    done: bool,
}

impl<'a> CratePages<'a> {
    pub(crate) fn new(transport: &'a Transport, url: Url, from_page: u32) -> Self {
        Self {
            transport,
            url,
            page: from_page,
            parsed: 0,
            total: None,
            done: false,
        }
    }

    /// Number of the page the next call will request
    pub fn current_page(&self) -> u32 {
        self.page
    }

    /// Number of listing entries seen so far
    pub fn parsed(&self) -> u64 {
        self.parsed
    }

    /// Total reported by the first page, once known
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    /// Fetches the next raw page
    ///
    /// # Returns
    ///
    /// * `Ok(Some(body))` - The raw JSON text of the next page
    /// * `Ok(None)` - Pagination has finished
    /// * `Err(HarvestError)` - The request or envelope decoding failed; the
    ///   sequence is aborted
    pub async fn next_page(&mut self) -> Result<Option<String>> {
        if self.done {
            return Ok(None);
        }

        let result = self.fetch_page().await;
        if result.is_err() {
            self.done = true;
        }
        result.map(Some)
    }

    async fn fetch_page(&mut self) -> Result<String> {
        tracing::debug!("Fetching page: {}", self.page);

        let query = [
            ("sort", "alphabetical".to_string()),
            ("page", self.page.to_string()),
        ];
        let raw = self.transport.fetch(&self.url, &query).await?;

        let envelope: PageEnvelope =
            serde_json::from_str(&raw).map_err(|source| HarvestError::Decode {
                resource: self.url.to_string(),
                source,
            })?;

        let count = envelope
            .crates
            .ok_or_else(|| HarvestError::schema("crates page", "crates"))?
            .len() as u64;
        self.parsed += count;

        let total = match self.total {
            Some(total) => total,
            None => {
                let total = envelope
                    .meta
                    .and_then(|meta| meta.total)
                    .ok_or_else(|| HarvestError::schema("crates page", "meta.total"))?;
                self.total = Some(total);
                total
            }
        };

        tracing::debug!(
            "Page {} had {} crates ({}/{} parsed)",
            self.page,
            count,
            self.parsed,
            total
        );

        self.page += 1;
        // Empty page guard
        if self.parsed >= total || count == 0 {
            self.done = true;
        }

        Ok(raw)
    }
}
