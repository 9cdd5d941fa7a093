//! Remote index download and task resolution

use crate::config::RetryConfig;
use crate::error::IndexError;
use crate::ledger;
use crate::retry::{Classified, retry_with_backoff};
use crate::types::{DownloadTask, IndexEntry};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Download and parse the index: a JSON array of dataset records
///
/// Each attempt must complete within `timeout`, body included. Transient
/// failures are retried under `retry`. Any failure that survives the retries
/// is fatal for the run.
pub async fn fetch_index(
    client: &reqwest::Client,
    url: &str,
    retry: &RetryConfig,
    timeout: Duration,
) -> std::result::Result<Vec<IndexEntry>, IndexError> {
    info!(url = %url, "downloading index");

    let body = retry_with_backoff(retry, || fetch_index_body(client, url, retry, timeout))
        .await
        .map_err(|classified| classified.error)?;

    let entries = parse_index(url, &body)?;
    info!(url = %url, entries = entries.len(), "index downloaded successfully");
    Ok(entries)
}

async fn fetch_index_body(
    client: &reqwest::Client,
    url: &str,
    retry: &RetryConfig,
    timeout: Duration,
) -> std::result::Result<Vec<u8>, Classified<IndexError>> {
    let may_retry = retry.allows_method("GET");

    let response = client.get(url).timeout(timeout).send().await.map_err(|e| {
        let error = IndexError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        };
        if may_retry && (e.is_timeout() || e.is_connect()) {
            Classified::transient(error)
        } else {
            Classified::permanent(error)
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let error = IndexError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        };
        return Err(if may_retry && retry.is_retryable_status(status.as_u16()) {
            Classified::transient(error)
        } else {
            Classified::permanent(error)
        });
    }

    let bytes = response.bytes().await.map_err(|e| {
        let error = IndexError::Request {
            url: url.to_string(),
            reason: format!("failed to read response body: {e}"),
        };
        if may_retry && e.is_timeout() {
            Classified::transient(error)
        } else {
            Classified::permanent(error)
        }
    })?;

    debug!(url = %url, bytes = bytes.len(), "index body received");
    Ok(bytes.to_vec())
}

/// Parse raw index JSON
///
/// Only a body that is not a JSON array is an error. Array elements that are
/// not objects are skipped.
pub fn parse_index(url: &str, body: &[u8]) -> std::result::Result<Vec<IndexEntry>, IndexError> {
    let records: Vec<serde_json::Value> =
        serde_json::from_slice(body).map_err(|e| IndexError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let total = records.len();
    let entries: Vec<IndexEntry> = records
        .into_iter()
        .filter_map(|record| serde_json::from_value(record).ok())
        .collect();
    if entries.len() < total {
        warn!(url = %url, skipped = total - entries.len(), "ignoring malformed index records");
    }
    Ok(entries)
}

/// Index URLs in order, skipping entries without one
pub fn extract_urls(entries: &[IndexEntry]) -> Vec<String> {
    ledger::pending_urls(entries, &HashSet::new())
}

/// Turn pending URLs into download tasks rooted at `download_dir`
pub fn resolve_tasks(urls: &[String], download_dir: &Path) -> Vec<DownloadTask> {
    urls.iter()
        .map(|url| DownloadTask::from_url(url, download_dir))
        .collect()
}
