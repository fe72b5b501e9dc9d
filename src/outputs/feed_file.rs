//! Writing the rendered feed to disk.
//!
//! The document goes to a sibling temp file first and is then renamed over
//! the target, so readers (and the scheduler's commit step) only ever see the
//! previous feed or the complete new one.

use crate::error::WriteError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Replace the file at `path` with `contents`.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_feed(path: &Path, contents: &str) -> Result<(), WriteError> {
    let tmp = temp_path(path);

    if let Err(source) = fs::write(&tmp, contents).await {
        error!(tmp = %tmp.display(), error = %source, "Failed to write temp feed file");
        let _ = fs::remove_file(&tmp).await;
        return Err(WriteError {
            operation: "write",
            path: tmp,
            source,
        });
    }

    if let Err(source) = fs::rename(&tmp, path).await {
        error!(error = %source, "Failed to move feed into place");
        let _ = fs::remove_file(&tmp).await;
        return Err(WriteError {
            operation: "rename",
            path: path.to_path_buf(),
            source,
        });
    }

    info!(bytes = contents.len(), "Wrote feed");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "feed.xml".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(
            temp_path(Path::new("out/feed.xml")),
            PathBuf::from("out/feed.xml.tmp")
        );
    }

    #[tokio::test]
    async fn test_write_feed_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, "old feed that is longer than the new one").unwrap();

        write_feed(&path, "<rss/>").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<rss/>");
        assert!(!dir.path().join("feed.xml.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_feed_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing/feed.xml");
        let err = write_feed(&path, "<rss/>").await.unwrap_err();
        assert_eq!(err.operation, "write");
    }
}
