//! # chaos-collector
//!
//! Parallel collector for published reconnaissance domain datasets.
//!
//! One run downloads a remote JSON index of dataset archives, fetches the
//! archives with bounded concurrency and retry, extracts them, validates and
//! deduplicates the domains they contain, and writes sorted reports plus an
//! optional compressed bundle.
//!
//! ## Design Philosophy
//!
//! - **Resumable** - completed downloads are recorded in an append-only ledger
//! - **Failure tolerant** - one bad download or corrupt archive never aborts a run
//! - **Deterministic output** - reports are sorted, ties broken by key
//! - **Library-first** - the binary is a thin wrapper over [`Pipeline`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use chaos_collector::{Config, Pipeline, RunOutcome};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.download.parallel_downloads = 8;
//!
//!     let pipeline = Pipeline::new(config)?;
//!     let cancel = CancellationToken::new();
//!     chaos_collector::cancel_on_signal(cancel.clone());
//!
//!     if let RunOutcome::Completed(stats) = pipeline.run(&cancel).await? {
//!         println!("{} unique domains", stats.total_domains);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Domain aggregation over extracted text files
pub mod aggregator;
/// Configuration types
pub mod config;
/// Optional DNS liveness check
pub mod dns;
/// Domain validation and key extraction
pub mod domain;
/// Concurrent dataset downloads
pub mod downloader;
/// Error types
pub mod error;
/// Archive extraction
pub mod extraction;
/// Remote index download
pub mod index;
/// Resume ledger
pub mod ledger;
/// Tracing subscriber setup
pub mod logging;
/// Collection pipeline orchestration
pub mod pipeline;
/// Output compression and work directory cleanup
pub mod post_processing;
/// Report generation
pub mod report;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigOverrides, RunOptions};
pub use downloader::{DatasetFetcher, Downloader, HttpFetcher};
pub use error::{Error, ExtractionError, FetchCause, FetchError, IndexError, Result};
pub use pipeline::Pipeline;
pub use types::{BatchResult, CollectionStats, DownloadTask, IndexEntry, RunOutcome, Stage};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives a termination signal.
///
/// Spawns a background task; returns immediately. The task also ends, without
/// touching the token, once the token is cancelled elsewhere.
///
/// - **Unix:** SIGINT or SIGTERM, whichever handlers could be registered.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
pub fn cancel_on_signal(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            signal = wait_for_signal() => {
                tracing::warn!(signal, "interrupt received, stopping collection");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

/// Name of the first termination signal delivered
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    // registration can fail in sandboxes; fall back to whatever is available
    match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
        (Ok(mut sigint), Ok(mut sigterm)) => tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        },
        (Ok(mut sigint), Err(e)) => {
            tracing::warn!(error = %e, "cannot watch SIGTERM, collection stops on SIGINT only");
            sigint.recv().await;
            "SIGINT"
        }
        (Err(e), Ok(mut sigterm)) => {
            tracing::warn!(error = %e, "cannot watch SIGINT, collection stops on SIGTERM only");
            sigterm.recv().await;
            "SIGTERM"
        }
        (Err(e), Err(_)) => {
            tracing::warn!(error = %e, "cannot watch SIGINT or SIGTERM, falling back to ctrl_c");
            wait_for_ctrl_c().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

/// Resolves on Ctrl+C; never resolves if the listener cannot be installed
async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "interrupt handling unavailable, run cannot be stopped by signal");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
