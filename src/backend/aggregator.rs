//! Incremental crate aggregation
//!
//! Turns the raw alphabetical listing into enriched [`CrateRecord`]s. Listing
//! entries older than the watermark are skipped without any further request;
//! every other entry costs five sequential requests (detail plus four
//! sub-resources) and is handed to the caller as soon as it is complete.
//!
//! The listing is alphabetical, not ordered by update time, so the watermark
//! check is applied to each entry independently and never stops the walk.

use crate::backend::decode;
use crate::client::{CrateAttribute, CratePages, CratesClient};
use crate::dates::parse_timestamp;
use crate::item::{CrateParts, CrateRecord};
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// One entry of a listing page
#[derive(Debug, Deserialize)]
struct ListingEntry {
    id: Value,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct ListingPage {
    crates: Vec<ListingEntry>,
}

#[derive(Debug, Deserialize)]
struct CrateEnvelope {
    #[serde(rename = "crate")]
    krate: Option<Map<String, Value>>,
}

/// Pull-based sequence of enriched crates updated since a watermark
pub struct CrateFeed<'a> {
    client: &'a CratesClient,
    pages: CratePages<'a>,
    from_date: DateTime<Utc>,
    pending: VecDeque<ListingEntry>,
    done: bool,
}

impl<'a> CrateFeed<'a> {
    /// Starts a feed over the whole listing
    pub fn new(client: &'a CratesClient, from_date: DateTime<Utc>) -> Result<Self> {
        Self::from_page(client, from_date, 1)
    }

    /// Starts a feed at the given listing page
    pub fn from_page(client: &'a CratesClient, from_date: DateTime<Utc>, page: u32) -> Result<Self> {
        Ok(Self {
            client,
            pages: client.crates(page)?,
            from_date,
            pending: VecDeque::new(),
            done: false,
        })
    }

    /// The watermark this feed filters on
    pub fn from_date(&self) -> DateTime<Utc> {
        self.from_date
    }

    /// Returns the next enriched crate
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The next crate updated at or after the watermark
    /// * `Ok(None)` - The listing is exhausted
    /// * `Err(HarvestError)` - A listing or sub-resource request failed; no
    ///   partial record is produced and the feed is finished
    pub async fn next_crate(&mut self) -> Result<Option<CrateRecord>> {
        if self.done {
            return Ok(None);
        }

        let result = self.advance().await;
        if !matches!(result, Ok(Some(_))) {
            self.done = true;
        }
        result
    }

    async fn advance(&mut self) -> Result<Option<CrateRecord>> {
        loop {
            while let Some(entry) = self.pending.pop_front() {
                let crate_id = listing_id(&entry.id)?;
                let updated_at = parse_timestamp(&entry.updated_at)?;

                if updated_at < self.from_date {
                    tracing::trace!("Skipping crate {} (updated {})", crate_id, updated_at);
                    continue;
                }

                let record = fetch_crate(self.client, &crate_id).await?;
                return Ok(Some(record));
            }

            let Some(raw) = self.pages.next_page().await? else {
                return Ok(None);
            };
            let page: ListingPage = decode(&raw, "crates listing")?;
            self.pending.extend(page.crates);
        }
    }
}

/// Fetches one crate and all of its sub-resources
///
/// Requests are issued sequentially: detail, owner team, owner user,
/// version downloads, versions. Any failure aborts the whole record.
pub async fn fetch_crate(client: &CratesClient, crate_id: &str) -> Result<CrateRecord> {
    tracing::debug!("Fetching crate: {}", crate_id);

    let raw = client.crate_detail(crate_id).await?;
    let envelope: CrateEnvelope = decode(&raw, &format!("crates/{}", crate_id))?;
    let detail = envelope
        .krate
        .ok_or_else(|| HarvestError::schema(format!("crates/{}", crate_id), "crate"))?;

    let parts = CrateParts {
        owner_team: fetch_attribute(client, crate_id, CrateAttribute::OwnerTeam).await?,
        owner_user: fetch_attribute(client, crate_id, CrateAttribute::OwnerUser).await?,
        version_downloads: fetch_attribute(client, crate_id, CrateAttribute::Downloads).await?,
        versions: fetch_attribute(client, crate_id, CrateAttribute::Versions).await?,
    };

    CrateRecord::compose(detail, parts)
}

async fn fetch_attribute(
    client: &CratesClient,
    crate_id: &str,
    attribute: CrateAttribute,
) -> Result<Value> {
    let raw = client.crate_attribute(crate_id, attribute).await?;
    decode(&raw, &format!("crates/{}/{}", crate_id, attribute))
}

fn listing_id(id: &Value) -> Result<String> {
    match id {
        Value::String(id) => Ok(id.clone()),
        Value::Number(id) => Ok(id.to_string()),
        _ => Err(HarvestError::schema("crates listing", "id")),
    }
}
