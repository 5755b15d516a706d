use crate::listing::SortOrder;
use serde::Deserialize;

pub const DEFAULT_LISTING_URL: &str = "https://www.khanacademy.org/api/internal/scratchpads/top";
pub const DEFAULT_TOPIC_ID: &str = "xffde7c31";
pub const DEFAULT_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_OUTPUT_PATH: &str = "programs.json";

/// Main configuration structure for Scratchpad-Harvest
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// defaults of the public scratchpad listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listing: ListingConfig,
    pub paging: PagingConfig,
    pub output: OutputConfig,
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Upstream listing endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ListingConfig {
    /// Base URL of the listing endpoint (without query string)
    pub url: String,

    /// Fixed topic the listing is scoped to
    pub topic_id: String,

    /// Which program list to page through
    pub sort: SortOrder,

    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_LISTING_URL.to_string(),
            topic_id: DEFAULT_TOPIC_ID.to_string(),
            sort: SortOrder::default(),
            timeout_secs: 30,
        }
    }
}

/// Page size, item budget and start position
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PagingConfig {
    /// Number of items requested per page
    pub page_size: u32,

    /// Maximum number of records to produce; unbounded when absent
    pub max_items: Option<u64>,

    /// Starting continuation token, overrides the stored checkpoint
    pub cursor: Option<String>,

    /// Log progress every N persisted pages
    pub progress_interval: u64,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_items: None,
            cursor: None,
            progress_interval: 1,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the JSON store file
    pub path: String,

    /// Discard any prior store instead of resuming from it
    pub overwrite: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_OUTPUT_PATH.to_string(),
            overwrite: false,
        }
    }
}

/// Retry and failure-escalation limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Retries per page fetch after the first attempt
    pub max_retries: u32,

    /// First backoff delay; doubles on every further attempt
    pub backoff_base_ms: u64,

    /// Consecutive store write failures tolerated before halting
    pub max_persist_failures: u32,

    /// How long a cancelled run waits for an outstanding fetch
    pub drain_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
            max_persist_failures: 3,
            drain_timeout_secs: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the harvester
    pub name: String,

    /// Version of the harvester
    pub version: String,

    /// URL with information about the harvester
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: "scratchpad-harvest".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}
