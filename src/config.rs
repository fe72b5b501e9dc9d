//! Run configuration.
//!
//! [`FeedConfig`] is the one struct the pipeline reads its tunables from. The
//! defaults reproduce the epiotrkow.pl setup; a YAML file can override any
//! subset of fields, and the CLI overrides the file (see [`crate::cli`]).
//!
//! ```yaml
//! source_urls:
//!   - https://epiotrkow.pl/news/
//!   - https://epiotrkow.pl/news/wydarzenia-p2
//! article_link_selectors:
//!   - ".tn-title"
//! id_link: '^/news/(?P<slug>[^/]*),(?P<id>\d+)$'
//! ```

use crate::error::ConfigError;
use crate::models::PageSource;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_SITE: &str = "https://epiotrkow.pl";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (+https://github.com/) RSS static builder";
pub const DEFAULT_ID_LINK: &str = r"^/news/(?P<slug>[^/]*),(?P<id>\d+)$";

/// Numbered listing pages following the first one (`/news/wydarzenia-p2` ..).
const NUMBERED_PAGES: std::ops::RangeInclusive<u32> = 2..=9;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// Base URL relative links are resolved against. Links to other hosts are
    /// rejected; a leading `www.` does not count as a different host.
    pub site_url: String,
    /// Listing pages, in the order their articles should appear in the feed.
    pub source_urls: Vec<String>,
    /// Title-marker selectors in order of preference; the first one that
    /// matches anything on a page is used for that page.
    pub article_link_selectors: Vec<String>,
    /// Pattern a link path must match. Must capture `id`; may capture `slug`.
    pub id_link: String,

    pub feed_title: String,
    pub feed_link: String,
    pub feed_description: String,
    pub ttl_minutes: u32,
    pub max_items: usize,
    /// Title used when the marker text, the link text and image alts are all empty.
    pub fallback_title: String,

    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_retries: usize,
    /// Pages fetched at once. Output order does not depend on it.
    pub concurrency: usize,
    /// Skip pages that fail to fetch or parse instead of aborting the run.
    pub skip_failed_pages: bool,

    pub output_path: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        let source_urls = std::iter::once(format!("{DEFAULT_SITE}/news/"))
            .chain(NUMBERED_PAGES.map(|i| format!("{DEFAULT_SITE}/news/wydarzenia-p{i}")))
            .collect();

        Self {
            site_url: DEFAULT_SITE.to_string(),
            source_urls,
            article_link_selectors: vec![".tn-title".to_string()],
            id_link: DEFAULT_ID_LINK.to_string(),
            feed_title: "epiotrkow.pl – Wydarzenia (p1–p9)".to_string(),
            feed_link: format!("{DEFAULT_SITE}/news/"),
            feed_description: "Automatyczny RSS z list newsów epiotrkow.pl (wydarzenia p1–p9)."
                .to_string(),
            ttl_minutes: 60,
            max_items: 255,
            fallback_title: "Bez tytułu".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 20,
            max_retries: 1,
            concurrency: 1,
            skip_failed_pages: true,
            output_path: PathBuf::from("feed.xml"),
        }
    }
}

impl FeedConfig {
    /// Load a config file, filling anything it leaves out with defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?config, "Loaded config file");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes as unit, not as an empty map.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn site(&self) -> Result<Url, ConfigError> {
        parse_url(&self.site_url)
    }

    /// The configured listing pages, validated and numbered in order.
    pub fn page_sources(&self) -> Result<Vec<PageSource>, ConfigError> {
        if self.source_urls.is_empty() {
            return Err(ConfigError::NoSources);
        }
        self.source_urls
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                Ok(PageSource {
                    index,
                    url: parse_url(raw)?,
                })
            })
            .collect()
    }
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::Url {
        url: raw.to_string(),
        source,
    })
}
