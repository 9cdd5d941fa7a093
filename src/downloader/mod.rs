//! Concurrent dataset downloads
//!
//! - [`fetcher`] - Single-URL fetch with retry, streaming and ledger update
//!
//! [`Downloader::download_all`] runs a batch of [`DownloadTask`]s with at most
//! `parallel_downloads` fetches in flight. One failure never aborts the
//! batch: every task ends up counted as succeeded, failed, or cancelled.

pub mod fetcher;


pub use fetcher::{DatasetFetcher, HttpFetcher, build_client};

use crate::types::{BatchResult, DownloadTask};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Bounded-concurrency batch runner over a [`DatasetFetcher`]
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<dyn DatasetFetcher>,
    /// Limits concurrent fetches (parallel_downloads)
    concurrent_limit: Arc<Semaphore>,
}

impl Downloader {
    /// Runner allowing `concurrency` fetches at once (clamped to at least 1)
    pub fn new(fetcher: Arc<dyn DatasetFetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrent_limit: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Fetch every task, returning per-outcome counts
    ///
    /// Tasks are started in order as permits free up. Once `cancel` fires, no
    /// new task starts and in-flight fetches are aborted; both count as
    /// cancelled. Partial files left by aborted fetches are never recorded in
    /// the resume ledger.
    pub async fn download_all(
        &self,
        tasks: Vec<DownloadTask>,
        cancel: &CancellationToken,
    ) -> BatchResult {
        let total = tasks.len();
        let mut result = BatchResult::default();
        let mut in_flight = JoinSet::new();

        info!(total, "starting dataset downloads");

        for task in tasks {
            // Acquire a permit (blocks while at the concurrency limit)
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = self.concurrent_limit.clone().acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                result.cancelled += 1;
                continue;
            };

            let fetcher = self.fetcher.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                let outcome = fetcher.fetch(&task).await;
                (task, outcome)
            });
        }

        let mut aborted = false;
        loop {
            tokio::select! {
                _ = cancel.cancelled(), if !aborted => {
                    warn!(in_flight = in_flight.len(), "download batch interrupted, aborting in-flight fetches");
                    in_flight.abort_all();
                    aborted = true;
                }
                joined = in_flight.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((task, Ok(bytes))) => {
                            result.succeeded += 1;
                            debug!(url = %task.url, bytes, "download complete");
                        }
                        Ok((task, Err(e))) => {
                            result.failed += 1;
                            warn!(url = %task.url, error = %e, "download failed");
                        }
                        Err(e) if e.is_cancelled() => {
                            result.cancelled += 1;
                        }
                        Err(e) => {
                            result.failed += 1;
                            warn!(error = %e, "download task panicked");
                        }
                    }
                    debug!(
                        done = result.total(),
                        total,
                        "download progress"
                    );
                }
            }
        }

        info!(
            succeeded = result.succeeded,
            failed = result.failed,
            cancelled = result.cancelled,
            "dataset downloads finished"
        );

        result
    }
}
