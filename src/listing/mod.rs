//! Listing module for the upstream paginated endpoint
//!
//! This module contains everything that touches the remote listing:
//! - Request URL construction (sort order, page size, topic, cursor)
//! - The `PageSource` seam and its HTTP implementation
//! - Bounded retry with exponential backoff

mod fetcher;
mod request;
mod retry;

pub use fetcher::{build_http_client, FetchError, HttpListing, ListingPage, PageSource};
pub use request::{ListingRequest, SortOrder};
pub use retry::{backoff_duration, fetch_with_retry, RetryPolicy};
