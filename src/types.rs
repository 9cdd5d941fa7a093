//! Core types for chaos-collector

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One record from the remote index
///
/// Only `URL` drives downloads; the remaining fields are informational and
/// may be absent. A field holding a value of the wrong type reads as `None`
/// rather than failing the whole index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Dataset archive URL
    #[serde(rename = "URL", default, deserialize_with = "lenient")]
    pub url: Option<String>,

    /// Program name
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,

    /// Hosting platform (hackerone, bugcrowd, ...)
    #[serde(default, deserialize_with = "lenient")]
    pub platform: Option<String>,

    /// Whether the program pays bounties
    #[serde(default, deserialize_with = "lenient")]
    pub bounty: Option<bool>,

    /// Number of subdomains in the dataset, as reported by the index
    #[serde(default, deserialize_with = "lenient")]
    pub count: Option<u64>,
}

/// Any JSON value; `None` unless it converts cleanly to `T`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl IndexEntry {
    /// The download URL if present and non-empty
    pub fn download_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// A single URL to fetch and the file it is written to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadTask {
    /// Source URL
    pub url: String,
    /// Destination file (named after the URL's last path segment)
    pub destination: PathBuf,
}

impl DownloadTask {
    /// Build a task whose file name is the URL's last path segment
    ///
    /// Two URLs sharing a basename map to the same destination; the later
    /// download overwrites the earlier one.
    pub fn from_url(url: &str, download_dir: &Path) -> Self {
        Self {
            url: url.to_string(),
            destination: download_dir.join(file_name_from_url(url)),
        }
    }
}

/// Last non-empty path segment of a URL, or `"download"` when there is none
pub fn file_name_from_url(url: &str) -> String {
    let from_path = match url::Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string)),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    };

    from_path
        .filter(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| "download".to_string())
}

/// Outcome counts of a download batch
///
/// `succeeded + failed + cancelled` always equals the number of tasks
/// submitted; `cancelled` is only non-zero when the batch was interrupted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Tasks whose file was fully written and recorded in the ledger
    pub succeeded: usize,
    /// Tasks that failed after retries
    pub failed: usize,
    /// Tasks never started because the batch was cancelled
    pub cancelled: usize,
}

impl BatchResult {
    /// Number of tasks accounted for
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }
}

/// Pipeline position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Nothing done yet
    Init,
    /// Remote index downloaded and parsed
    IndexFetched,
    /// Resume filtering applied, task list built
    TasksResolved,
    /// Download batch finished
    Downloaded,
    /// Archives extracted
    Extracted,
    /// Domains aggregated
    Aggregated,
    /// Reports written
    Reported,
    /// Output bundle written (or skipped)
    Compressed,
    /// Working directory removed (or kept)
    CleanedUp,
    /// Run finished
    Done,
    /// Run aborted by a fatal error or interruption
    Aborted,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::IndexFetched => "index_fetched",
            Stage::TasksResolved => "tasks_resolved",
            Stage::Downloaded => "downloaded",
            Stage::Extracted => "extracted",
            Stage::Aggregated => "aggregated",
            Stage::Reported => "reported",
            Stage::Compressed => "compressed",
            Stage::CleanedUp => "cleaned_up",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Run counters, owned by the pipeline and merged from each stage's result
#[derive(Clone, Debug, Serialize)]
pub struct CollectionStats {
    /// URLs found in the index (before resume filtering)
    pub total_urls: usize,
    /// Datasets downloaded this run
    pub downloaded: usize,
    /// Datasets that failed to download
    pub failed: usize,
    /// Archives extracted
    pub extracted: usize,
    /// Unique domains in the final set
    pub total_domains: usize,
    /// Accepted lines dropped as duplicates
    pub duplicates_removed: usize,
    /// Domains that resolved, when DNS resolution ran
    pub resolved_domains: Option<usize>,
    /// Run start
    pub start_time: DateTime<Local>,
    /// Run end, set once the pipeline finishes
    pub end_time: Option<DateTime<Local>>,
}

impl CollectionStats {
    /// Fresh counters starting now
    pub fn new() -> Self {
        Self {
            total_urls: 0,
            downloaded: 0,
            failed: 0,
            extracted: 0,
            total_domains: 0,
            duplicates_removed: 0,
            resolved_domains: None,
            start_time: Local::now(),
            end_time: None,
        }
    }

    /// Elapsed time until `end_time`, or until now if still running
    pub fn duration(&self) -> Duration {
        let end = self.end_time.unwrap_or_else(Local::now);
        (end - self.start_time).to_std().unwrap_or_default()
    }

    /// Fold a download batch into the counters
    pub fn record_batch(&mut self, batch: &BatchResult) {
        self.downloaded += batch.succeeded;
        self.failed += batch.failed;
    }
}

impl Default for CollectionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// How a pipeline run ended successfully
#[derive(Clone, Debug)]
pub enum RunOutcome {
    /// All stages ran; reports may or may not have been written
    Completed(CollectionStats),
    /// Nothing to download after resume filtering (or an empty index)
    NothingToDo(CollectionStats),
    /// Dry run: nothing was fetched or written
    DryRun,
}
