//! Registry summary fetch

use crate::backend::decode;
use crate::client::CratesClient;
use crate::item::Summary;
use crate::Result;
use chrono::Utc;
use serde_json::{Map, Value};

/// Fetches the registry summary and stamps it with the capture time
pub async fn fetch_summary(client: &CratesClient) -> Result<Summary> {
    let raw = client.summary().await?;
    let fields: Map<String, Value> = decode(&raw, "summary")?;

    tracing::debug!("Fetched summary with {} fields", fields.len());

    Ok(Summary::capture(fields, Utc::now()))
}
