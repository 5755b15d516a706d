//! HTTP fetcher for the listing endpoint
//!
//! This module handles all HTTP requests made by the harvester, including:
//! - Building the HTTP client with a proper user agent string
//! - GET requests for a single listing page
//! - Decoding the `{scratchpads, cursor}` response body
//! - Error classification for the retry layer

use crate::config::{ListingConfig, UserAgentConfig};
use crate::listing::request::ListingRequest;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// One page of the listing as returned by the endpoint
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListingPage {
    /// Raw items in listing order
    pub scratchpads: Vec<Value>,

    /// Token of the following page; absent once the listing is exhausted
    #[serde(default)]
    pub cursor: Option<String>,
}

impl ListingPage {
    /// The continuation token, with empty strings treated as absent
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|cursor| !cursor.is_empty())
    }
}

/// Failure of a single page fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode listing page from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },
}

impl FetchError {
    /// Returns true if the same request may succeed when repeated
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } | Self::Decode { .. } => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
        }
    }
}

/// Source of listing pages
///
/// The pagination engine only talks to this trait; [`HttpListing`] is the
/// network implementation.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the page starting at `cursor`; `None` fetches the first page
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ListingPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use scratchpad_harvest::config::UserAgentConfig;
/// use scratchpad_harvest::listing::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: Name/Version (+ContactURL)
    let agent = match &user_agent.contact_url {
        Some(contact) => format!("{}/{} (+{})", user_agent.name, user_agent.version, contact),
        None => format!("{}/{}", user_agent.name, user_agent.version),
    };

    Client::builder()
        .user_agent(agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Listing endpoint reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpListing {
    client: Client,
    request: ListingRequest,
}

impl HttpListing {
    pub fn new(client: Client, request: ListingRequest) -> Self {
        Self { client, request }
    }

    /// Builds the client and request from configuration
    pub fn from_config(
        listing: &ListingConfig,
        user_agent: &UserAgentConfig,
        page_size: u32,
    ) -> Result<Self, crate::HarvestError> {
        let client = build_http_client(user_agent, Duration::from_secs(listing.timeout_secs))?;
        let request = ListingRequest::new(&listing.url, listing.sort, page_size, &listing.topic_id)
            .map_err(|e| crate::ConfigError::InvalidUrl(format!("{}: {}", listing.url, e)))?;
        Ok(Self::new(client, request))
    }

    pub fn request(&self) -> &ListingRequest {
        &self.request
    }
}

#[async_trait]
impl PageSource for HttpListing {
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ListingPage, FetchError> {
        let url = self.request.page_url(cursor);
        let url_str = url.to_string();
        tracing::trace!("GET {}", url_str);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport(&url_str, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_transport(&url_str, e))?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url_str,
            source,
        })
    }
}

fn classify_transport(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::SortOrder;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn listing_for(server: &MockServer) -> HttpListing {
        let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(5)).unwrap();
        let request = ListingRequest::new(
            &format!("{}/api/scratchpads", server.uri()),
            SortOrder::Hot,
            2,
            "topic",
        )
        .unwrap();
        HttpListing::new(client, request)
    }

    #[test]
    fn test_build_http_client() {
        let mut user_agent = UserAgentConfig::default();
        assert!(build_http_client(&user_agent, Duration::from_secs(1)).is_ok());

        user_agent.contact_url = Some("https://example.com/about".to_string());
        assert!(build_http_client(&user_agent, Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_retryable_classification() {
        let status = |status| FetchError::Status {
            url: "u".to_string(),
            status,
        };
        assert!(status(500).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(400).is_retryable());
        assert!(FetchError::Timeout {
            url: "u".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_next_cursor_ignores_empty() {
        let page = ListingPage {
            scratchpads: vec![],
            cursor: Some(String::new()),
        };
        assert_eq!(page.next_cursor(), None);
    }

    #[tokio::test]
    async fn test_fetch_page_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/scratchpads"))
            .and(query_param("sort", "3"))
            .and(query_param("limit", "2"))
            .and(query_param("topic_id", "topic"))
            .and(query_param("cursor", "C1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"scratchpads":[{"title":"a"},{"title":"b"}],"cursor":"C2"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let listing = listing_for(&server).await;
        let page = listing.fetch_page(Some("C1")).await.unwrap();

        assert_eq!(page.scratchpads.len(), 2);
        assert_eq!(page.next_cursor(), Some("C2"));
    }

    #[tokio::test]
    async fn test_fetch_page_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let listing = listing_for(&server).await;
        let error = listing.fetch_page(None).await.unwrap_err();

        assert!(matches!(error, FetchError::Status { status: 503, .. }));
        assert!(error.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_page_reports_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let listing = listing_for(&server).await;
        let error = listing.fetch_page(None).await.unwrap_err();

        assert!(matches!(error, FetchError::Decode { .. }));
    }
}
