//! Listing request construction
//!
//! Builds `GET <listing-url>?sort=..&limit=..&topic_id=..[&cursor=..]` URLs.

use serde::Deserialize;
use std::fmt;
use url::Url;

/// Which program list the listing is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Recent,
    Hot,
    #[serde(alias = "contest")]
    Contests,
    #[default]
    Top,
}

impl SortOrder {
    /// Numeric code the listing endpoint expects in the `sort` parameter
    pub fn wire_code(&self) -> u8 {
        match self {
            Self::Recent => 2,
            Self::Hot => 3,
            Self::Contests => 4,
            Self::Top => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Hot => "hot",
            Self::Contests => "contests",
            Self::Top => "top",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fixed part of every page request
#[derive(Debug, Clone)]
pub struct ListingRequest {
    base: Url,
    sort: SortOrder,
    page_size: u32,
    topic_id: String,
}

impl ListingRequest {
    pub fn new(
        base_url: &str,
        sort: SortOrder,
        page_size: u32,
        topic_id: impl Into<String>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base_url)?,
            sort,
            page_size,
            topic_id: topic_id.into(),
        })
    }

    /// URL of the page that starts at `cursor`; no cursor means the first page
    pub fn page_url(&self, cursor: Option<&str>) -> Url {
        let mut url = self.base.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("sort", &self.sort.wire_code().to_string())
                .append_pair("limit", &self.page_size.to_string())
                .append_pair("topic_id", &self.topic_id);
            if let Some(cursor) = cursor.filter(|cursor| !cursor.is_empty()) {
                query.append_pair("cursor", cursor);
            }
        }
        url
    }
}
