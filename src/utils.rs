//! Small helpers shared across the pipeline: whitespace cleanup for scraped
//! text, log-friendly truncation, and the early output-directory check.

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Collapse runs of whitespace (including newlines and NBSP) into single
/// spaces and trim the ends.
///
/// ```ignore
/// assert_eq!(normalize_whitespace("  a\n\t b "), "a b");
/// ```
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure the directory that will hold `output` exists and is writable.
///
/// Runs before any page is fetched so a misconfigured output path fails fast
/// instead of after a full scrape.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub async fn ensure_writable_parent(output: &Path) -> Result<(), Box<dyn Error>> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).await?;

    // Try a small sync write using std fs (simpler error surface)
    let probe_path = dir.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!(dir = %dir.display(), "Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Hello \n\t  world  "), "Hello world");
        assert_eq!(normalize_whitespace("Pożar\u{a0}w Piotrkowie"), "Pożar w Piotrkowie");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        // 'ż' is two bytes; cutting at 1 must back off to 0.
        assert_eq!(truncate_for_log("żółw", 1), "…(+7 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_writable_parent_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("nested/out/feed.xml");
        ensure_writable_parent(&output).await.unwrap();
        assert!(tmp.path().join("nested/out").is_dir());
        assert!(!tmp.path().join("nested/out/..__probe_write__").exists());
    }
}
