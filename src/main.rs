//! # epiotrkow_feed
//!
//! Builds a static RSS feed from the epiotrkow.pl news listings. Meant to be
//! run hourly by an external scheduler, which then publishes `feed.xml`.
//!
//! ## Usage
//!
//! ```sh
//! epiotrkow_feed -o public/feed.xml
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: download each configured listing page
//! 2. **Extraction**: find title markers and their `/news/<slug>,<id>` links
//! 3. **Merge**: page order, first occurrence of each id wins
//! 4. **Output**: render RSS 2.0 and atomically replace the output file
//!
//! Pages that fail are logged and skipped. The process exits non-zero only if
//! no article could be collected, or if rendering or writing the feed fails;
//! in those cases the previous feed file is left as it was.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod extractor;
mod fetcher;
mod models;
mod outputs;
mod pipeline;
mod utils;

use cli::Cli;
use fetcher::{HttpFetcher, RetryFetch};
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "epiotrkow_feed starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = args.load_config().inspect_err(|e| {
        error!(error = %e, "Invalid configuration");
    })?;

    // Early check: fail before scraping if the feed could never be written
    if let Err(e) = ensure_writable_parent(&config.output_path).await {
        error!(
            path = %config.output_path.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let fetcher = RetryFetch::new(
        HttpFetcher::new(&config)?,
        config.max_retries,
        Duration::from_secs(1),
    );

    let summary = pipeline::run(&config, &fetcher, Utc::now())
        .await
        .inspect_err(|e| error!(error = %e, "Feed generation failed; previous feed left untouched"))?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        pages = summary.pages,
        failed_pages = summary.failed_pages.len(),
        articles = summary.articles,
        duplicates = summary.duplicates,
        output = %summary.output.display(),
        "Execution complete"
    );

    Ok(())
}
