use serde::Deserialize;

/// Default registry API root
pub const CRATES_API_URL: &str = "https://crates.io/api/v1/";

/// Default origin stamped on emitted items
pub const CRATES_URL: &str = "https://crates.io/";

/// Default seconds to sleep between retries
pub const SLEEP_TIME: u64 = 60;

/// Default number of attempts per request
pub const MAX_RETRIES: u32 = 5;

/// Main configuration structure for Crates-Harvester
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
}

/// Registry client configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the registry API
    #[serde(rename = "api-root")]
    pub api_root: String,

    /// Origin recorded in item envelopes
    pub origin: String,

    /// Seconds to sleep between retries of a failed request
    #[serde(rename = "sleep-time")]
    pub sleep_time: u64,

    /// Total attempts per request before giving up
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Request timeout (seconds)
    pub timeout: u64,

    /// Verify TLS certificates
    #[serde(rename = "ssl-verify")]
    pub ssl_verify: bool,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_root: CRATES_API_URL.to_string(),
            origin: CRATES_URL.to_string(),
            sleep_time: SLEEP_TIME,
            max_retries: MAX_RETRIES,
            timeout: 30,
            ssl_verify: true,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
