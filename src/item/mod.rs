//! Item model and classification
//!
//! Every object the harvester emits is an [`Item`]: either an enriched crate
//! or a registry summary. Raw JSON is turned into an `Item` in exactly one
//! place, [`Item::classify`], and the three classifier operations
//! (`category`, `identifier`, `updated_on`) are methods on the result.

mod records;

pub use records::{
    CrateParts, CrateRecord, Summary, FETCHED_ON_KEY, OWNER_TEAM_KEY, OWNER_USER_KEY,
    VERSIONS_KEY, VERSION_DOWNLOADS_KEY,
};

use crate::dates::timestamp_seconds;
use crate::{HarvestError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Key only present at the top level of summary payloads
const SUMMARY_MARKER: &str = "num_downloads";

/// Kind of item produced by the harvester
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// An enriched crate record
    Crate,
    /// The registry-wide summary
    Summary,
}

impl Category {
    /// All categories supported by the harvester
    pub const ALL: [Category; 2] = [Category::Crate, Category::Summary];

    /// Returns the wire name of this category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crate => "crates",
            Self::Summary => "summary",
        }
    }

    /// Decides the category of a raw JSON object by key presence
    pub fn of(fields: &Map<String, Value>) -> Self {
        if fields.contains_key(SUMMARY_MARKER) {
            Self::Summary
        } else {
            Self::Crate
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "crates" | "crate" => Ok(Self::Crate),
            "summary" => Ok(Self::Summary),
            other => Err(format!(
                "unknown category '{}' (expected 'crates' or 'summary')",
                other
            )),
        }
    }
}

/// An item emitted by the harvester
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Item {
    Crate(CrateRecord),
    Summary(Summary),
}

impl Item {
    /// Classifies a raw JSON object into a typed item
    ///
    /// Objects carrying `num_downloads` are summaries; everything else is a
    /// crate record and must carry the four sub-resource keys.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the value is not an object or lacks the
    /// fields its category requires.
    pub fn classify(value: Value) -> Result<Self> {
        let fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(HarvestError::schema("item", "<object>")),
        };

        match Category::of(&fields) {
            Category::Summary => Ok(Self::Summary(Summary::from_map(fields)?)),
            Category::Crate => Ok(Self::Crate(CrateRecord::from_map(fields)?)),
        }
    }

    /// The category tag of this item
    pub fn category(&self) -> Category {
        match self {
            Self::Crate(_) => Category::Crate,
            Self::Summary(_) => Category::Summary,
        }
    }

    /// Stable identifier used for deduplication
    ///
    /// Crates use their registry `id`; summaries use the capture time in
    /// floating point UTC seconds.
    pub fn identifier(&self) -> String {
        match self {
            Self::Crate(record) => record.id().to_string(),
            Self::Summary(summary) => format!("{:?}", timestamp_seconds(summary.fetched_on())),
        }
    }

    /// Update time in UTC seconds
    pub fn updated_on(&self) -> f64 {
        match self {
            Self::Crate(record) => timestamp_seconds(record.updated_at()),
            Self::Summary(summary) => timestamp_seconds(summary.fetched_on()),
        }
    }
}

impl From<CrateRecord> for Item {
    fn from(record: CrateRecord) -> Self {
        Self::Crate(record)
    }
}

impl From<Summary> for Item {
    fn from(summary: Summary) -> Self {
        Self::Summary(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_summary() {
        let item = Item::classify(json!({
            "num_downloads": 5,
            "fetched_on": "2020-01-01T00:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(item.category(), Category::Summary);
        assert_eq!(item.identifier(), "1577836800.0");
        assert_eq!(item.updated_on(), 1577836800.0);
    }

    #[test]
    fn test_classify_crate() {
        let item = Item::classify(json!({
            "id": 42,
            "updated_at": "2021-06-01T00:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(item.category(), Category::Crate);
        assert_eq!(item.identifier(), "42");
        assert_eq!(item.updated_on(), 1622505600.0);
    }

    #[test]
    fn test_classify_summary_with_fraction() {
        let item = Item::classify(json!({
            "num_downloads": 1,
            "fetched_on": "2020-01-01 00:00:00.250000+00:00"
        }))
        .unwrap();

        assert_eq!(item.identifier(), "1577836800.25");
    }

    #[test]
    fn test_classify_rejects_non_object() {
        assert!(Item::classify(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_serialized_item_classifies_back() {
        let original = Item::classify(json!({
            "id": "tokio",
            "updated_at": "2021-06-01T00:00:00+00:00",
            "owner_team_data": {},
            "owner_user_data": {},
            "version_downloads_data": {},
            "versions_data": {}
        }))
        .unwrap();

        let emitted = serde_json::to_value(&original).unwrap();
        assert_eq!(Item::classify(emitted).unwrap(), original);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("crates".parse::<Category>().unwrap(), Category::Crate);
        assert_eq!("summary".parse::<Category>().unwrap(), Category::Summary);
        assert!("issues".parse::<Category>().is_err());
        assert_eq!(Category::Crate.to_string(), "crates");
    }
}
