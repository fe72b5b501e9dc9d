//! Command-line interface.
//!
//! Every flag is optional: with no arguments the job scrapes the default
//! epiotrkow.pl listing pages and writes `./feed.xml`. Values are layered as
//! defaults → config file → environment / flags.

use crate::config::FeedConfig;
use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Scheduled run with defaults
/// epiotrkow_feed
///
/// # Custom output and a YAML config
/// epiotrkow_feed -c feed.yaml -o public/feed.xml
///
/// # Only the first two listing pages, stop on the first failure
/// epiotrkow_feed --source-url https://epiotrkow.pl/news/ \
///                --source-url https://epiotrkow.pl/news/wydarzenia-p2 --fail-fast
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "FEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where to write the RSS document
    #[arg(short, long, env = "FEED_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Listing page to scrape (repeatable; replaces the configured list)
    #[arg(long = "source-url", env = "SOURCE_URLS", value_delimiter = ',')]
    pub source_urls: Vec<String>,

    /// Title-marker selector in order of preference (repeatable; `;`-separated in the env var)
    #[arg(long = "selector", env = "ARTICLE_LINK_SELECTORS", value_delimiter = ';')]
    pub article_link_selectors: Vec<String>,

    /// Regex an article link path must match; must capture `id`
    #[arg(long, env = "ID_LINK")]
    pub id_link: Option<String>,

    /// Maximum number of items in the feed (0 = unlimited)
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Retries per page for transient failures
    #[arg(long)]
    pub retries: Option<usize>,

    /// Pages fetched at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Abort the run when any page fails instead of skipping it
    #[arg(long)]
    pub fail_fast: bool,
}

impl Cli {
    /// Build the effective configuration: defaults, then the config file if
    /// one was given, then whatever was set on the command line.
    pub fn load_config(&self) -> Result<FeedConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => FeedConfig::from_yaml_file(path)?,
            None => FeedConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut FeedConfig) {
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if !self.source_urls.is_empty() {
            config.source_urls = self.source_urls.clone();
        }
        if !self.article_link_selectors.is_empty() {
            config.article_link_selectors = self.article_link_selectors.clone();
        }
        if let Some(id_link) = &self.id_link {
            config.id_link = id_link.clone();
        }
        if let Some(max_items) = self.max_items {
            config.max_items = max_items;
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.max_retries = retries;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if self.fail_fast {
            config.skip_failed_pages = false;
        }
    }
}
