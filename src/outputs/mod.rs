//! Feed output.
//!
//! # Submodules
//!
//! - [`rss`]: turns a [`crate::models::Feed`] into an RSS 2.0 document
//! - [`feed_file`]: replaces the output file with the rendered document

pub mod feed_file;
pub mod rss;
