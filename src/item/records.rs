//! Concrete record shapes emitted by the harvester
//!
//! Both records keep the registry payload as an ordered JSON map so nothing
//! the registry sends is lost, and cache the parsed identity fields the
//! classifier needs.

use crate::dates::{format_timestamp, parse_timestamp};
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

pub const OWNER_TEAM_KEY: &str = "owner_team_data";
pub const OWNER_USER_KEY: &str = "owner_user_data";
pub const VERSION_DOWNLOADS_KEY: &str = "version_downloads_data";
pub const VERSIONS_KEY: &str = "versions_data";
pub const FETCHED_ON_KEY: &str = "fetched_on";

/// Sub-resource payloads fetched for one crate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrateParts {
    pub owner_team: Value,
    pub owner_user: Value,
    pub version_downloads: Value,
    pub versions: Value,
}

/// A crate's core detail merged with its four sub-resource payloads
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrateRecord {
    /// Registry-defined crate fields, including `id` and `updated_at`
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    pub owner_team_data: Value,
    pub owner_user_data: Value,
    pub version_downloads_data: Value,
    pub versions_data: Value,

    #[serde(skip)]
    id: String,
    #[serde(skip)]
    updated_at: DateTime<Utc>,
}

impl CrateRecord {
    /// Builds a composite record from a crate detail object and its parts
    ///
    /// # Errors
    ///
    /// Fails with a schema error when `id` is missing or not a string/number,
    /// and with `InvalidTimestamp` when `updated_at` cannot be parsed.
    pub fn compose(fields: Map<String, Value>, parts: CrateParts) -> Result<Self> {
        let id = crate_id(&fields)?;
        let updated_at = timestamp_field(&fields, "updated_at", "crate")?;

        Ok(Self {
            fields,
            owner_team_data: parts.owner_team,
            owner_user_data: parts.owner_user,
            version_downloads_data: parts.version_downloads,
            versions_data: parts.versions,
            id,
            updated_at,
        })
    }

    /// Rebuilds a composite record from its emitted JSON form
    ///
    /// Only `id` and `updated_at` are required. Absent sub-resource keys
    /// become `null`.
    pub fn from_map(mut fields: Map<String, Value>) -> Result<Self> {
        let mut take = |key: &str| fields.remove(key).unwrap_or(Value::Null);

        let parts = CrateParts {
            owner_team: take(OWNER_TEAM_KEY),
            owner_user: take(OWNER_USER_KEY),
            version_downloads: take(VERSION_DOWNLOADS_KEY),
            versions: take(VERSIONS_KEY),
        };

        Self::compose(fields, parts)
    }

    /// The crate identifier, stringified
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the registry last updated this crate
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Registry-wide statistics stamped with their capture time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Registry summary fields plus `fetched_on`
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    #[serde(skip)]
    fetched_on: DateTime<Utc>,
}

impl Summary {
    /// Stamps a freshly fetched summary payload with `fetched_on`
    pub fn capture(mut fields: Map<String, Value>, fetched_on: DateTime<Utc>) -> Self {
        fields.insert(
            FETCHED_ON_KEY.to_string(),
            Value::String(format_timestamp(fetched_on)),
        );
        Self { fields, fetched_on }
    }

    /// Rebuilds a summary from its emitted JSON form
    pub fn from_map(fields: Map<String, Value>) -> Result<Self> {
        let fetched_on = timestamp_field(&fields, FETCHED_ON_KEY, "summary")?;
        Ok(Self { fields, fetched_on })
    }

    /// When this summary was captured
    pub fn fetched_on(&self) -> DateTime<Utc> {
        self.fetched_on
    }
}

fn crate_id(fields: &Map<String, Value>) -> Result<String> {
    match fields.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(HarvestError::schema("crate", "id")),
    }
}

fn timestamp_field(
    fields: &Map<String, Value>,
    field: &str,
    context: &str,
) -> Result<DateTime<Utc>> {
    let raw = fields
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| HarvestError::schema(context, field))?;
    parse_timestamp(raw)
}
