//! Append-only record of fully downloaded URLs
//!
//! One URL per line. Read once at startup when resuming, appended to after
//! every successful download, never rewritten or compacted.

use crate::error::Result;
use crate::types::IndexEntry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Resume ledger; the only writer of its file
#[derive(Debug)]
pub struct ResumeLedger {
    path: PathBuf,
    // serializes appends so concurrent downloads never interleave lines
    write_lock: Mutex<()>,
}

impl ResumeLedger {
    /// Ledger backed by `path`; the file is created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the ledger file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// URLs already recorded; empty when the file does not exist
    pub async fn load(&self) -> Result<HashSet<String>> {
        load(&self.path).await
    }

    /// Append `url` as complete
    ///
    /// Safe to call from many tasks at once; each call writes one whole line.
    pub async fn mark_complete(&self, url: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut line = String::with_capacity(url.len() + 1);
        line.push_str(url);
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(url = %url, ledger = ?self.path, "recorded completed download");
        Ok(())
    }
}

/// Read a ledger file into a set of trimmed, non-empty lines
pub async fn load(path: &Path) -> Result<HashSet<String>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Download URLs from `entries` that are not in `completed`, in index order
///
/// Entries without a URL are dropped.
pub fn pending_urls(entries: &[IndexEntry], completed: &HashSet<String>) -> Vec<String> {
    entries
        .iter()
        .filter_map(IndexEntry::download_url)
        .filter(|url| !completed.contains(*url))
        .map(str::to_string)
        .collect()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(url: &str) -> IndexEntry {
        IndexEntry {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ResumeLedger::new(dir.path().join("downloaded_urls.txt"));
        assert!(ledger.load().await.unwrap().is_empty());
        assert!(!ledger.path().exists(), "loading must not create the file");
    }

    #[tokio::test]
    async fn load_trims_lines_and_skips_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloaded_urls.txt");
        std::fs::write(&path, "u1\n  u2  \n\nu1\n").unwrap();

        let set = load(&path).await.unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("u1"));
        assert!(set.contains("u2"));
    }

    #[tokio::test]
    async fn mark_complete_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloaded_urls.txt");
        std::fs::write(&path, "existing\n").unwrap();

        let ledger = ResumeLedger::new(&path);
        ledger.mark_complete("https://h/a.zip").await.unwrap();
        ledger.mark_complete("https://h/b.zip").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "existing\nhttps://h/a.zip\nhttps://h/b.zip\n");
    }

    #[tokio::test]
    async fn concurrent_appends_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloaded_urls.txt");
        let ledger = Arc::new(ResumeLedger::new(&path));

        let mut handles = Vec::new();
        for i in 0..64 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let url = format!("https://cdn.example.net/datasets/program-{i:03}.zip");
                ledger.mark_complete(&url).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let set = ledger.load().await.unwrap();
        assert_eq!(set.len(), 64);
        let content = std::fs::read_to_string(&path).unwrap();
        for line in content.lines() {
            assert!(line.starts_with("https://cdn.example.net/datasets/program-"));
            assert!(line.ends_with(".zip"));
        }
    }

    #[test]
    fn resume_filter_keeps_only_unfinished_urls() {
        let completed: HashSet<String> = ["u1", "u2"].into_iter().map(String::from).collect();
        let entries = vec![entry("u1"), entry("u2"), entry("u3")];

        assert_eq!(pending_urls(&entries, &completed), vec!["u3".to_string()]);
    }

    #[test]
    fn filter_drops_entries_without_url() {
        let entries = vec![
            entry("u1"),
            IndexEntry::default(),
            IndexEntry {
                url: Some(String::new()),
                ..Default::default()
            },
        ];
        assert_eq!(pending_urls(&entries, &HashSet::new()), vec!["u1".to_string()]);
    }
}
