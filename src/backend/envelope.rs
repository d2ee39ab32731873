//! Uniform item envelope
//!
//! Downstream indexers never see bare registry objects: every item is wrapped
//! with the metadata they need for deduplication and freshness tracking.

use crate::backend::{BACKEND_NAME, BACKEND_VERSION};
use crate::dates::timestamp_seconds;
use crate::item::Item;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Fields an indexer may search an item by
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchFields {
    pub item_id: String,
}

/// An item plus the metadata describing where and when it was fetched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemEnvelope {
    pub backend_name: String,
    pub backend_version: String,
    /// When the item was fetched (UTC seconds)
    pub timestamp: f64,
    pub origin: String,
    /// Stable hash of origin and item identifier
    pub uuid: String,
    /// When the item was last updated (UTC seconds)
    pub updated_on: f64,
    pub category: String,
    pub search_fields: SearchFields,
    pub tag: String,
    pub data: Item,
}

impl ItemEnvelope {
    /// Wraps an item fetched from `origin`
    pub fn wrap(item: Item, origin: &str, tag: &str) -> Self {
        let identifier = item.identifier();

        Self {
            backend_name: BACKEND_NAME.to_string(),
            backend_version: BACKEND_VERSION.to_string(),
            timestamp: timestamp_seconds(Utc::now()),
            origin: origin.to_string(),
            uuid: item_uuid(origin, &identifier),
            updated_on: item.updated_on(),
            category: item.category().to_string(),
            search_fields: SearchFields {
                item_id: identifier,
            },
            tag: tag.to_string(),
            data: item,
        }
    }
}

/// Hex SHA-256 of `origin:identifier`
pub fn item_uuid(origin: &str, identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(origin.as_bytes());
    hasher.update(b":");
    hasher.update(identifier.as_bytes());
    hex::encode(hasher.finalize())
}
