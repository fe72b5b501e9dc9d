//! Listing-page retrieval.
//!
//! # Architecture
//!
//! - [`PageFetcher`]: the seam the pipeline depends on
//! - [`HttpFetcher`]: reqwest-backed implementation used in production
//! - [`RetryFetch`]: decorator adding bounded exponential backoff to any
//!   [`PageFetcher`]
//!
//! # Retry Strategy
//!
//! Only transient failures (timeouts, transport errors, 5xx and 429) are
//! retried. The delay doubles per attempt, is capped at 30 seconds, and gets
//! 0-250ms of random jitter on top.

use crate::config::FeedConfig;
use crate::error::{ConfigError, FetchError};
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::Client;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Retrieves the raw HTML of one page.
pub trait PageFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Plain HTTP GET with the configured user agent and timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FeedConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ConfigError::Client)?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let status = resp.status();
        if !status.is_success() {
            let preview = resp.text().await.unwrap_or_default();
            debug!(
                status = status.as_u16(),
                body_preview = %truncate_for_log(&preview, 200),
                "Non-success response"
            );
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`PageFetcher`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..max_jitter)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl<T> RetryFetch<T>
where
    T: PageFetcher,
{
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
            max_jitter: Duration::from_millis(250),
        }
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageFetcher for RetryFetch<T>
where
    T: PageFetcher,
{
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries || !e.is_transient() {
                        if attempt > 1 {
                            error!(
                                attempt,
                                max = self.max_retries,
                                elapsed_ms_total = total_dt.as_millis() as u64,
                                error = %e,
                                "fetch() giving up"
                            );
                        }
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
