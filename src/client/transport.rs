//! HTTP transport
//!
//! This module owns every network request the harvester makes, including:
//! - Building the HTTP client with user agent, timeouts and TLS settings
//! - Retrying transient failures with a fixed sleep between attempts
//! - Recording responses to an archive, or replaying them from one

use crate::archive::Archive;
use crate::config::ClientConfig;
use crate::{HarvestError, Result};
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Statuses that are worth retrying
const RETRY_STATUSES: &[StatusCode] = &[
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::LOCKED,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Where responses come from and go to
pub enum ArchiveMode {
    /// Talk to the network only
    Off,
    /// Talk to the network and record every response
    Record(Archive),
    /// Never touch the network; answer from the archive
    Replay(Archive),
}

/// Retrying HTTP GET transport
pub struct Transport {
    client: Client,
    sleep_time: Duration,
    max_retries: u32,
    token: Option<String>,
    archive: ArchiveMode,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The client configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &ClientConfig) -> std::result::Result<Client, reqwest::Error> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout))
        .connect_timeout(Duration::from_secs(10))
        .danger_accept_invalid_certs(!config.ssl_verify)
        .gzip(true)
        .brotli(true)
        .build()
}

impl Transport {
    /// Creates a transport from the client configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            sleep_time: Duration::from_secs(config.sleep_time),
            max_retries: config.max_retries.max(1),
            token: None,
            archive: ArchiveMode::Off,
        })
    }

    /// Sends `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the sleep between retries
    pub fn with_sleep_time(mut self, sleep_time: Duration) -> Self {
        self.sleep_time = sleep_time;
        self
    }

    /// Attaches an archive to record to or replay from
    pub fn with_archive(mut self, archive: ArchiveMode) -> Self {
        self.archive = archive;
        self
    }

    /// Returns true if responses are served from an archive
    pub fn is_replaying(&self) -> bool {
        matches!(self.archive, ArchiveMode::Replay(_))
    }

    /// Returns the archive in use, if any
    pub fn archive(&self) -> Option<&Archive> {
        match &self.archive {
            ArchiveMode::Off => None,
            ArchiveMode::Record(archive) | ArchiveMode::Replay(archive) => Some(archive),
        }
    }

    /// Fetches a URL and returns its body as text
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | 408, 423, 429, 502, 503, 504 | Retry after `sleep_time` |
    /// | Connection error / timeout | Retry after `sleep_time` |
    /// | Any other status | Fail immediately with `HttpStatus` |
    ///
    /// At most `max_retries` attempts are made in total.
    pub async fn fetch(&self, url: &Url, query: &[(&str, String)]) -> Result<String> {
        let (status, body) = match &self.archive {
            ArchiveMode::Replay(archive) => {
                let response = archive.retrieve(url.as_str(), query)?;
                tracing::trace!("Replaying {} from archive", url);
                (response.status, response.body)
            }
            ArchiveMode::Record(archive) => {
                let (status, body) = self.fetch_remote(url, query).await?;
                archive.store(url.as_str(), query, status, &body)?;
                (status, body)
            }
            ArchiveMode::Off => self.fetch_remote(url, query).await?,
        };

        if !StatusCode::from_u16(status).is_ok_and(|s| s.is_success()) {
            tracing::error!("HTTP {} for {}: {}", status, url, body);
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status,
                body,
            });
        }

        Ok(body)
    }

    /// Performs the request with retries and returns the final status and body
    async fn fetch_remote(&self, url: &Url, query: &[(&str, String)]) -> Result<(u16, String)> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut request = self.client.get(url.clone());
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(token) = &self.token {
                request = request.bearer_auth(token);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if RETRY_STATUSES.contains(&status) && attempt < self.max_retries {
                        tracing::warn!(
                            "HTTP {} for {} (attempt {}/{}), retrying in {:?}",
                            status,
                            url,
                            attempt,
                            self.max_retries,
                            self.sleep_time
                        );
                        tokio::time::sleep(self.sleep_time).await;
                        continue;
                    }

                    let body = response.text().await.map_err(|source| HarvestError::Transport {
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    })?;
                    return Ok((status.as_u16(), body));
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < self.max_retries => {
                    tracing::warn!(
                        "Connection to {} failed (attempt {}/{}): {}, retrying in {:?}",
                        url,
                        attempt,
                        self.max_retries,
                        e,
                        self.sleep_time
                    );
                    tokio::time::sleep(self.sleep_time).await;
                }
                Err(source) => {
                    return Err(HarvestError::Transport {
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}
