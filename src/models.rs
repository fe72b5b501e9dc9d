//! Data models flowing through the pipeline.
//!
//! - [`PageSource`]: one listing page to fetch
//! - [`Article`]: a single extracted news item
//! - [`Feed`]: the ordered, deduplicated set of articles plus channel metadata

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use url::Url;

/// One listing page on the source site.
///
/// `index` is the position in the configured source list and is what the
/// pipeline uses to keep page order stable when fetches overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    pub index: usize,
    pub url: Url,
}

/// A news article discovered on a listing page.
///
/// Two articles with the same `id` are the same article, regardless of which
/// page listed them or how the slug was spelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Numeric id taken from the trailing `,<id>` of the link.
    pub id: u64,
    /// Visible headline text.
    pub title: String,
    /// Absolute article URL.
    pub link: String,
    /// Slug segment between `/news/` and the comma, as found in the link.
    pub slug: String,
}

impl Article {
    /// Stable, opaque guid: the hex SHA-256 digest of the absolute link.
    pub fn guid(&self) -> String {
        hex::encode(Sha256::digest(self.link.as_bytes()))
    }
}

/// Everything needed to render one RSS document.
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub ttl_minutes: u32,
    pub built_at: DateTime<Utc>,
    pub articles: Vec<Article>,
}
