//! Typed accessors over the crates.io API
//!
//! Each accessor builds its request path from the API root and hands the
//! request to the [`Transport`]. Payloads are returned as raw text; decoding
//! is left to the caller.

use crate::client::pages::CratePages;
use crate::client::Transport;
use crate::config::ClientConfig;
use crate::{HarvestError, Result};
use std::fmt;
use url::Url;

const CATEGORY_CRATES: &str = "crates";
const CATEGORY_SUMMARY: &str = "summary";

/// Per-crate sub-resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrateAttribute {
    OwnerTeam,
    OwnerUser,
    Versions,
    Downloads,
}

impl CrateAttribute {
    /// Returns the path segment for this sub-resource
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OwnerTeam => "owner_team",
            Self::OwnerUser => "owner_user",
            Self::Versions => "versions",
            Self::Downloads => "downloads",
        }
    }
}

impl fmt::Display for CrateAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client for the crates.io registry API
pub struct CratesClient {
    api_root: Url,
    transport: Transport,
}

impl CratesClient {
    /// Creates a client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let api_root = Url::parse(&config.api_root)?;
        Ok(Self::with_transport(api_root, Transport::new(config)?))
    }

    /// Creates a client over an already configured transport
    pub fn with_transport(api_root: Url, transport: Transport) -> Self {
        Self {
            api_root,
            transport,
        }
    }

    /// The API root all paths are joined onto
    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// The underlying transport
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Gets the registry summary
    pub async fn summary(&self) -> Result<String> {
        let url = self.join(&[CATEGORY_SUMMARY])?;
        self.transport.fetch(&url, &[]).await
    }

    /// Gets crates in alphabetical order, one page at a time
    pub fn crates(&self, from_page: u32) -> Result<CratePages<'_>> {
        let url = self.join(&[CATEGORY_CRATES])?;
        Ok(CratePages::new(&self.transport, url, from_page))
    }

    /// Gets a crate by its ID
    pub async fn crate_detail(&self, crate_id: &str) -> Result<String> {
        let url = self.join(&[CATEGORY_CRATES, crate_id])?;
        self.transport.fetch(&url, &[]).await
    }

    /// Gets one sub-resource of a crate
    pub async fn crate_attribute(&self, crate_id: &str, attribute: CrateAttribute) -> Result<String> {
        let url = self.join(&[CATEGORY_CRATES, crate_id, attribute.as_str()])?;
        self.transport.fetch(&url, &[]).await
    }

    fn join(&self, segments: &[&str]) -> Result<Url> {
        join_path(&self.api_root, segments)
    }
}

/// Appends path segments to a base URL, ignoring any trailing slash
pub fn join_path(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| HarvestError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
