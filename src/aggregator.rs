//! Domain aggregation over extracted text files
//!
//! Walks every `.txt` file under the extraction root and merges its lines
//! into one deduplicated set. Validation is a filter, not a transform: a line
//! that passes is stored trimmed but with its original case.

use crate::domain;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of one aggregation pass
#[derive(Clone, Debug, Default)]
pub struct AggregateResult {
    /// Deduplicated domains, unsorted
    pub domains: HashSet<String>,
    /// Lines that were kept (before deduplication)
    pub accepted_lines: usize,
    /// Non-empty lines rejected by the validator
    pub rejected_lines: usize,
    /// Text files read
    pub files_read: usize,
    /// Text files that could not be read
    pub files_skipped: usize,
}

impl AggregateResult {
    /// Accepted lines dropped because the domain was already in the set
    pub fn duplicates_removed(&self) -> usize {
        self.accepted_lines.saturating_sub(self.domains.len())
    }

    /// Merge one file's content
    fn add_content(&mut self, content: &str, validate: bool) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if validate && !domain::is_valid_domain(line) {
                self.rejected_lines += 1;
                continue;
            }
            self.accepted_lines += 1;
            self.domains.insert(line.to_string());
        }
    }
}

/// Whether `path` has a `.txt` extension (case-insensitive)
fn is_text_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("txt"))
}

/// Collect domains from every `.txt` file under `root`
///
/// Blocking; run on the blocking pool from async code. Unreadable files and
/// directory entries are skipped with a warning. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn collect(root: &Path, validate: bool) -> AggregateResult {
    info!(?root, validate, "processing domains");

    let mut result = AggregateResult::default();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                debug!(?root, error = %e, "extraction root not readable, nothing to aggregate");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "error walking extraction directory");
                continue;
            }
        };

        if !entry.file_type().is_file() || !is_text_file(entry.path()) {
            continue;
        }

        match std::fs::read(entry.path()) {
            Ok(bytes) => {
                result.files_read += 1;
                result.add_content(&String::from_utf8_lossy(&bytes), validate);
                debug!(path = ?entry.path(), "read domain file");
            }
            Err(e) => {
                result.files_skipped += 1;
                warn!(path = ?entry.path(), error = %e, "error reading domain file, skipping");
            }
        }
    }

    info!(
        unique = result.domains.len(),
        duplicates_removed = result.duplicates_removed(),
        rejected = result.rejected_lines,
        files = result.files_read,
        "processed domains"
    );

    result
}
