//! The scrape → extract → render → write run.
//!
//! 1. **Fetching**: every configured listing page, `concurrency` at a time,
//!    with results kept in page order
//! 2. **Extraction**: articles per page, in document order
//! 3. **Merge**: concatenate in page order, drop repeated ids (first wins),
//!    cap at `max_items`
//! 4. **Output**: render RSS and replace the output file
//!
//! Nothing is written unless every page has been attempted and at least one
//! article survived, so a failed run leaves the previous feed untouched.

use crate::config::FeedConfig;
use crate::error::{PageError, RunError};
use crate::extractor::ExtractRules;
use crate::fetcher::PageFetcher;
use crate::models::{Article, Feed, PageSource};
use crate::outputs::{feed_file, rss};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument, warn};

/// What a successful run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub pages: usize,
    pub failed_pages: Vec<String>,
    pub articles: usize,
    pub duplicates: usize,
    pub output: PathBuf,
}

/// Run the whole pipeline once.
///
/// `built_at` becomes the feed's build timestamp; passing it in keeps the
/// output reproducible under test.
#[instrument(level = "info", skip_all, fields(output = %config.output_path.display()))]
pub async fn run<F: PageFetcher>(
    config: &FeedConfig,
    fetcher: &F,
    built_at: DateTime<Utc>,
) -> Result<RunSummary, RunError> {
    let pages = config.page_sources()?;
    let rules = ExtractRules::from_config(config)?;
    info!(pages = pages.len(), concurrency = config.concurrency, "Scraping listing pages");

    let mut per_page: Vec<Vec<Article>> = Vec::with_capacity(pages.len());
    let mut failed_pages = Vec::new();

    let mut outcomes = stream::iter(pages.iter())
        .map(|page| {
            let rules = &rules;
            async move { (page, scrape_page(page, fetcher, rules).await) }
        })
        .buffered(config.concurrency.max(1));

    while let Some((page, outcome)) = outcomes.next().await {
        match outcome {
            Ok(articles) => per_page.push(articles),
            Err(e) if config.skip_failed_pages => {
                error!(page = %page.url, index = page.index, error = %e, "Page failed; skipping");
                failed_pages.push(page.url.to_string());
            }
            Err(e) => {
                error!(page = %page.url, index = page.index, error = %e, "Page failed; aborting run");
                return Err(RunError::PageFailed {
                    url: page.url.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if !failed_pages.is_empty() {
        warn!(
            failed = failed_pages.len(),
            pages = ?failed_pages,
            "Some listing pages were skipped; the feed is partial"
        );
    }

    let (articles, duplicates) = merge_pages(per_page, config.max_items);
    for article in &articles {
        debug!(id = article.id, slug = %article.slug, title = %article.title, "Feed item");
    }
    if articles.is_empty() {
        return Err(RunError::NoItems {
            pages: pages.len(),
            failed: failed_pages.len(),
        });
    }

    let feed = Feed {
        title: config.feed_title.clone(),
        link: config.feed_link.clone(),
        description: config.feed_description.clone(),
        ttl_minutes: config.ttl_minutes,
        built_at,
        articles,
    };
    let xml = rss::render(&feed)?;
    feed_file::write_feed(&config.output_path, &xml).await?;

    info!(
        articles = feed.articles.len(),
        duplicates,
        failed_pages = failed_pages.len(),
        "Feed generated"
    );

    Ok(RunSummary {
        pages: pages.len(),
        failed_pages,
        articles: feed.articles.len(),
        duplicates,
        output: config.output_path.clone(),
    })
}

async fn scrape_page<F: PageFetcher>(
    page: &PageSource,
    fetcher: &F,
    rules: &ExtractRules,
) -> Result<Vec<Article>, PageError> {
    let html = fetcher.fetch(&page.url).await?;
    Ok(rules.extract(page.url.as_str(), &html)?)
}

/// Flatten pages in order, keep the first article per id, and cap the
/// result. A `max_items` of 0 means no cap. Returns the merged list and how
/// many duplicates were dropped.
fn merge_pages(per_page: Vec<Vec<Article>>, max_items: usize) -> (Vec<Article>, usize) {
    let total: usize = per_page.iter().map(Vec::len).sum();
    let unique: Vec<Article> = per_page
        .into_iter()
        .flatten()
        .unique_by(|article| article.id)
        .collect();
    let duplicates = total - unique.len();

    let cap = if max_items == 0 { usize::MAX } else { max_items };
    let merged: Vec<Article> = unique.into_iter().take(cap).collect();
    (merged, duplicates)
}
