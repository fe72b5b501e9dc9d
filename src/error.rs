//! Error types for every stage of the feed pipeline.
//!
//! Per-page failures ([`FetchError`], [`ParseError`]) are recoverable: the
//! pipeline logs them and moves on to the next listing page. Everything that
//! ends up in [`RunError`] aborts the run with a non-zero exit code.

use std::path::PathBuf;
use thiserror::Error;

/// A single listing page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} timed out")]
    Timeout { url: String },
}

impl FetchError {
    /// Classify a reqwest error for `url`, separating timeouts from other
    /// transport failures.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// Whether trying the same request again could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Request { .. } => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
        }
    }
}

/// A fetched page could not be turned into a document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{url} returned an empty document")]
    EmptyDocument { url: String },
}

/// Why a single page contributed nothing to the feed.
#[derive(Debug, Error)]
pub enum PageError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// The configuration is unusable; raised before anything is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },

    #[error("invalid link pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("link pattern '{0}' has no `id` capture group")]
    MissingIdGroup(String),

    #[error("invalid URL '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no source URLs configured")]
    NoSources,

    #[error("no title selectors configured")]
    NoSelectors,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Feed serialization failed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("XML serialization failed: {0}")]
    Xml(#[from] std::io::Error),

    #[error("rendered feed is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The rendered feed could not be written to disk.
#[derive(Debug, Error)]
#[error("failed to {operation} '{path}': {source}")]
pub struct WriteError {
    pub operation: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Fatal outcome of a pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("page {url} failed and fail-fast is enabled: {reason}")]
    PageFailed { url: String, reason: String },

    #[error("no articles could be collected from {pages} page(s) ({failed} failed)")]
    NoItems { pages: usize, failed: usize },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Write(#[from] WriteError),
}
