//! Report generation for an aggregated domain set
//!
//! All files land directly in the output directory:
//! - the main domain list (configurable name), sorted ascending
//! - `tld_distribution.txt` and `domain_distribution.txt`
//! - `wildcard_patterns.txt`
//! - `collection_summary.json`
//! - `resolved_domains.txt` when DNS resolution ran

use crate::domain;
use crate::error::Result;
use crate::types::CollectionStats;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// TLD distribution file name
pub const TLD_DISTRIBUTION_FILE: &str = "tld_distribution.txt";
/// Base-domain distribution file name
pub const DOMAIN_DISTRIBUTION_FILE: &str = "domain_distribution.txt";
/// Wildcard pattern file name
pub const WILDCARD_FILE: &str = "wildcard_patterns.txt";
/// Summary JSON file name
pub const SUMMARY_FILE: &str = "collection_summary.json";
/// Live domains file name (DNS resolution only)
pub const RESOLVED_FILE: &str = "resolved_domains.txt";

/// Contents of `collection_summary.json`
#[derive(Clone, Debug, Serialize)]
pub struct CollectionSummary {
    /// When the summary was written (RFC 3339, local time)
    pub collection_date: DateTime<Local>,
    /// Domains in the final set
    pub total_domains: usize,
    /// Same as `total_domains`; the set is always deduplicated
    pub unique_domains: usize,
    /// Accepted lines dropped as duplicates
    pub duplicates_removed: usize,
    /// Datasets downloaded this run
    pub datasets_downloaded: usize,
    /// Datasets that failed to download
    pub datasets_failed: usize,
    /// Archives extracted
    pub archives_extracted: usize,
    /// Path of the main domain file
    pub output_file: PathBuf,
    /// Size of the main domain file
    pub file_size_bytes: u64,
    /// Run duration so far
    pub duration_seconds: f64,
    /// Domains that resolved; only present when DNS resolution ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_domains: Option<usize>,
}

/// Count domains per key, ordered by descending count then ascending key
pub fn distribution<'a, I, F>(domains: I, key: F) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(&'a str) -> &'a str,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for domain in domains {
        *counts.entry(key(domain)).or_default() += 1;
    }

    let mut rows: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, count)| (k.to_string(), count))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

/// One `*.<base>` pattern per distinct base domain, sorted
pub fn wildcard_patterns<'a, I>(domains: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    domains
        .into_iter()
        .map(domain::extract_base_domain)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|base| format!("*.{base}"))
        .collect()
}

fn render_distribution(rows: &[(String, usize)]) -> String {
    rows.iter()
        .map(|(key, count)| format!("{count:>8} {key}\n"))
        .collect()
}

fn render_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

/// Writes report files into one output directory
#[derive(Clone, Debug)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    /// Writer targeting `output_dir` (created on first write)
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Output directory
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write the main list, both distributions, wildcard patterns and the summary
    ///
    /// Returns the path of the main domain file.
    pub async fn write(
        &self,
        domains: &HashSet<String>,
        main_file_name: &str,
        stats: &CollectionStats,
    ) -> Result<PathBuf> {
        info!(domains = domains.len(), output_dir = ?self.output_dir, "generating reports");
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let mut sorted: Vec<&str> = domains.iter().map(String::as_str).collect();
        sorted.sort_unstable();

        let main_file = self.output_dir.join(main_file_name);
        tokio::fs::write(&main_file, render_lines(&sorted)).await?;
        debug!(path = ?main_file, "wrote domain list");

        let tld_rows = distribution(sorted.iter().copied(), domain::extract_tld);
        self.write_file(TLD_DISTRIBUTION_FILE, render_distribution(&tld_rows))
            .await?;

        let domain_rows = distribution(sorted.iter().copied(), domain::extract_base_domain);
        self.write_file(DOMAIN_DISTRIBUTION_FILE, render_distribution(&domain_rows))
            .await?;

        let wildcards = wildcard_patterns(sorted.iter().copied());
        self.write_file(WILDCARD_FILE, render_lines(&wildcards))
            .await?;

        self.write_summary(&main_file, stats).await?;

        info!(
            tlds = tld_rows.len(),
            base_domains = domain_rows.len(),
            "reports generated"
        );
        Ok(main_file)
    }

    /// Write `collection_summary.json` for the given main file and counters
    pub async fn write_summary(
        &self,
        main_file: &Path,
        stats: &CollectionStats,
    ) -> Result<CollectionSummary> {
        let file_size_bytes = match tokio::fs::metadata(main_file).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        let summary = CollectionSummary {
            collection_date: Local::now(),
            total_domains: stats.total_domains,
            unique_domains: stats.total_domains,
            duplicates_removed: stats.duplicates_removed,
            datasets_downloaded: stats.downloaded,
            datasets_failed: stats.failed,
            archives_extracted: stats.extracted,
            output_file: main_file.to_path_buf(),
            file_size_bytes,
            duration_seconds: stats.duration().as_secs_f64(),
            resolved_domains: stats.resolved_domains,
        };

        let json = serde_json::to_string_pretty(&summary)?;
        self.write_file(SUMMARY_FILE, json).await?;
        Ok(summary)
    }

    /// Write live domains, sorted, one per line
    pub async fn write_resolved(&self, live: &[String]) -> Result<PathBuf> {
        let mut sorted: Vec<&str> = live.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        self.write_file(RESOLVED_FILE, render_lines(&sorted)).await
    }

    async fn write_file(&self, name: &str, content: String) -> Result<PathBuf> {
        let path = self.output_dir.join(name);
        tokio::fs::write(&path, content).await?;
        debug!(path = ?path, "wrote report file");
        Ok(path)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn set(domains: &[&str]) -> HashSet<String> {
        domains.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn distribution_orders_by_count_then_key() {
        let domains = ["a.io", "b.io", "c.net", "d.com", "e.net", "f.org"];
        let rows = distribution(domains, domain::extract_tld);
        assert_eq!(
            rows,
            vec![
                ("io".to_string(), 2),
                ("net".to_string(), 2),
                ("com".to_string(), 1),
                ("org".to_string(), 1),
            ]
        );
    }

    #[test]
    fn distribution_rows_right_align_counts() {
        let rows = vec![
            ("com".to_string(), 123_456_789),
            ("io".to_string(), 7),
        ];
        assert_eq!(
            render_distribution(&rows),
            "123456789 com\n       7 io\n"
        );
        assert_eq!(render_distribution(&[]), "");
    }

    #[test]
    fn wildcards_are_deduplicated_and_sorted() {
        let domains = ["api.foo.com", "www.foo.com", "bar.io", "x.y.bar.io", "zed.dev"];
        assert_eq!(
            wildcard_patterns(domains),
            vec!["*.bar.io", "*.foo.com", "*.zed.dev"]
        );
    }

    #[tokio::test]
    async fn writes_every_report_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("out"));
        let domains = set(&["b.foo.com", "a.foo.com", "bar.io"]);
        let mut stats = CollectionStats::new();
        stats.total_domains = 3;
        stats.duplicates_removed = 4;
        stats.downloaded = 2;
        stats.extracted = 2;

        let main = writer
            .write(&domains, "aggregated_domains.txt", &stats)
            .await
            .unwrap();

        let out = dir.path().join("out");
        assert_eq!(
            std::fs::read_to_string(&main).unwrap(),
            "a.foo.com\nb.foo.com\nbar.io\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join(TLD_DISTRIBUTION_FILE)).unwrap(),
            "       2 com\n       1 io\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join(DOMAIN_DISTRIBUTION_FILE)).unwrap(),
            "       2 foo.com\n       1 bar.io\n"
        );
        assert_eq!(
            std::fs::read_to_string(out.join(WILDCARD_FILE)).unwrap(),
            "*.bar.io\n*.foo.com\n"
        );

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join(SUMMARY_FILE)).unwrap())
                .unwrap();
        assert_eq!(summary["total_domains"], 3);
        assert_eq!(summary["unique_domains"], 3);
        assert_eq!(summary["duplicates_removed"], 4);
        assert_eq!(summary["datasets_downloaded"], 2);
        assert_eq!(summary["archives_extracted"], 2);
        assert_eq!(summary["file_size_bytes"], 27);
        assert!(summary["collection_date"].is_string());
        assert!(summary["duration_seconds"].is_number());
        assert!(summary.get("resolved_domains").is_none());
    }

    #[tokio::test]
    async fn summary_includes_resolved_count_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());
        let mut stats = CollectionStats::new();
        stats.resolved_domains = Some(5);

        let summary = writer
            .write_summary(&dir.path().join("missing.txt"), &stats)
            .await
            .unwrap();

        assert_eq!(summary.file_size_bytes, 0);
        let json: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(SUMMARY_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(json["resolved_domains"], 5);
    }

    #[tokio::test]
    async fn resolved_file_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path());

        let path = writer
            .write_resolved(&["b.io".to_string(), "a.io".to_string()])
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "a.io\nb.io\n");
    }
}
