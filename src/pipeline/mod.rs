//! Collection pipeline orchestration
//!
//! [`Pipeline::run`] drives one run through the stages
//! `Init → IndexFetched → TasksResolved → Downloaded → Extracted →
//! Aggregated → Reported → Compressed → CleanedUp → Done`.
//!
//! Each stage returns its own result ([`BatchResult`], an extraction count,
//! an [`AggregateResult`]) which the pipeline folds into [`CollectionStats`].
//! Only an index failure or an interruption ends the run early; both move it
//! to `Aborted` after the working directory has been cleaned up.


use crate::aggregator::{self, AggregateResult};
use crate::config::Config;
use crate::dns::DnsResolver;
use crate::downloader::{DatasetFetcher, Downloader, HttpFetcher, build_client};
use crate::error::{Error, Result};
use crate::extraction;
use crate::index;
use crate::ledger::{self, ResumeLedger};
use crate::post_processing;
use crate::report::ReportWriter;
use crate::types::{BatchResult, CollectionStats, RunOutcome, Stage};
use chrono::Local;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Downloads subdirectory of the working directory
pub const DOWNLOADS_DIR: &str = "downloads";
/// Extraction subdirectory of the working directory
pub const EXTRACTED_DIR: &str = "extracted";

/// Stage position and counters of an in-progress run
#[derive(Debug)]
struct RunState {
    stage: Stage,
    stats: CollectionStats,
}

impl RunState {
    fn advance(&mut self, stage: Stage) {
        debug!(from = %self.stage, to = %stage, "pipeline stage");
        self.stage = stage;
    }
}

/// How the stage sequence ended, before cleanup
enum Flow {
    Completed,
    NothingToDo,
}

/// Orchestrator for one collection run
pub struct Pipeline {
    config: Arc<Config>,
    client: reqwest::Client,
    ledger: Arc<ResumeLedger>,
    downloader: Downloader,
    reports: ReportWriter,
}

impl Pipeline {
    /// Pipeline downloading datasets over HTTP
    pub fn new(config: Config) -> Result<Self> {
        let client = build_client(&config)?;
        let ledger = Arc::new(ResumeLedger::new(config.resume_file()));
        let fetcher = Arc::new(HttpFetcher::new(
            client.clone(),
            &config.download,
            ledger.clone(),
        ));
        Ok(Self::assemble(config, client, ledger, fetcher))
    }

    /// Pipeline using a custom dataset fetcher (the index is still fetched over HTTP)
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn DatasetFetcher>) -> Result<Self> {
        let client = build_client(&config)?;
        let ledger = Arc::new(ResumeLedger::new(config.resume_file()));
        Ok(Self::assemble(config, client, ledger, fetcher))
    }

    fn assemble(
        config: Config,
        client: reqwest::Client,
        ledger: Arc<ResumeLedger>,
        fetcher: Arc<dyn DatasetFetcher>,
    ) -> Self {
        let downloader = Downloader::new(fetcher, config.download.parallel_downloads);
        let reports = ReportWriter::new(config.output.output_dir.clone());
        Self {
            config: Arc::new(config),
            client,
            ledger,
            downloader,
            reports,
        }
    }

    /// Resolved configuration of this pipeline
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the run
    ///
    /// Returns `Err(Error::Index)` when the index cannot be fetched and
    /// `Err(Error::Interrupted)` when `cancel` fires first. The working
    /// directory is cleaned up (if enabled) on every path.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunOutcome> {
        if self.config.run.dry_run {
            self.log_dry_run();
            return Ok(RunOutcome::DryRun);
        }

        let mut state = RunState {
            stage: Stage::Init,
            stats: CollectionStats::new(),
        };

        if self.config.run.resume {
            info!("resume mode enabled");
        }

        tokio::fs::create_dir_all(&self.config.output.output_dir).await?;
        let work_dir = self.prepare_work_dir().await?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Interrupted),
            flow = self.run_stages(&work_dir, &mut state, cancel) => flow,
        };

        if result.is_err() {
            state.advance(Stage::Aborted);
        }

        post_processing::cleanup_work_dir(&work_dir, self.config.processing.cleanup).await;
        state.stats.end_time = Some(Local::now());

        match result {
            Ok(flow) => {
                state.advance(Stage::CleanedUp);
                state.advance(Stage::Done);
                info!(
                    duration_secs = state.stats.duration().as_secs_f64(),
                    "collection completed successfully"
                );
                Ok(match flow {
                    Flow::Completed => RunOutcome::Completed(state.stats),
                    Flow::NothingToDo => RunOutcome::NothingToDo(state.stats),
                })
            }
            Err(Error::Interrupted) => {
                warn!("collection interrupted by user");
                Err(Error::Interrupted)
            }
            Err(e) => {
                error!(error = %e, error_code = e.error_code(), "collection failed");
                Err(e)
            }
        }
    }

    fn log_dry_run(&self) {
        info!(url = %self.config.index_url, "[DRY RUN] Would download index");
        info!(
            parallel_downloads = self.config.download.parallel_downloads,
            max_retries = self.config.download.retry.max_retries,
            output_dir = ?self.config.output.output_dir,
            output_file = %self.config.output.output_file,
            resume = self.config.run.resume,
            "[DRY RUN] Would download, extract and aggregate every dataset in the index"
        );
    }

    /// Create a fresh `chaos_<timestamp>_<pid>` working directory
    async fn prepare_work_dir(&self) -> Result<PathBuf> {
        let base = self
            .config
            .output
            .work_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let work_dir = base.join(format!(
            "chaos_{}_{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            std::process::id()
        ));
        tokio::fs::create_dir_all(work_dir.join(DOWNLOADS_DIR)).await?;
        tokio::fs::create_dir_all(work_dir.join(EXTRACTED_DIR)).await?;
        debug!(?work_dir, "created working directory");
        Ok(work_dir)
    }

    async fn run_stages(
        &self,
        work_dir: &Path,
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> Result<Flow> {
        // Init -> IndexFetched
        let entries = index::fetch_index(
            &self.client,
            &self.config.index_url,
            &self.config.download.retry,
            self.config.download.timeout,
        )
        .await?;
        state.advance(Stage::IndexFetched);

        // IndexFetched -> TasksResolved
        let urls = self.resolve_urls(&entries, state).await?;
        if urls.is_empty() {
            warn!("no URLs to process");
            state.advance(Stage::TasksResolved);
            return Ok(Flow::NothingToDo);
        }
        let downloads_dir = work_dir.join(DOWNLOADS_DIR);
        let tasks = index::resolve_tasks(&urls, &downloads_dir);
        state.advance(Stage::TasksResolved);

        // TasksResolved -> Downloaded
        let batch = self.downloader.download_all(tasks, cancel).await;
        if cancel.is_cancelled() {
            return Err(Error::Interrupted);
        }
        state.stats.record_batch(&batch);
        state.advance(Stage::Downloaded);

        // Downloaded -> Extracted
        let extracted = self.extract(&batch, &downloads_dir, work_dir).await?;
        state.stats.extracted = extracted;
        state.advance(Stage::Extracted);

        // Extracted -> Aggregated
        let aggregate = self.aggregate(extracted, work_dir).await?;
        state.stats.total_domains = aggregate.domains.len();
        state.stats.duplicates_removed = aggregate.duplicates_removed();
        state.advance(Stage::Aggregated);

        if aggregate.domains.is_empty() {
            warn!("no domains collected, skipping reports and compression");
            return Ok(Flow::Completed);
        }

        // Aggregated -> Reported
        if self.config.processing.resolve_dns {
            let live = self.resolve_dns(&aggregate.domains).await?;
            state.stats.resolved_domains = Some(live);
        }
        self.reports
            .write(
                &aggregate.domains,
                &self.config.output.output_file,
                &state.stats,
            )
            .await?;
        state.advance(Stage::Reported);

        // Reported -> Compressed
        if self.config.processing.enable_compression {
            post_processing::compress_output(&self.config.output.output_dir).await?;
        } else {
            debug!("compression disabled, skipping");
        }
        state.advance(Stage::Compressed);

        Ok(Flow::Completed)
    }

    /// Index URLs minus those already in the resume ledger (when resuming)
    async fn resolve_urls(
        &self,
        entries: &[crate::types::IndexEntry],
        state: &mut RunState,
    ) -> Result<Vec<String>> {
        let all = index::extract_urls(entries);
        state.stats.total_urls = all.len();
        info!(count = all.len(), "found dataset URLs");

        if !self.config.run.resume {
            return Ok(all);
        }

        let completed = self.ledger.load().await?;
        let pending = ledger::pending_urls(entries, &completed);
        info!(remaining = pending.len(), skipped = all.len() - pending.len(), "resuming");
        Ok(pending)
    }

    async fn extract(
        &self,
        batch: &BatchResult,
        downloads_dir: &Path,
        work_dir: &Path,
    ) -> Result<usize> {
        if batch.succeeded == 0 {
            warn!("no datasets downloaded, nothing to extract");
            return Ok(0);
        }
        extraction::extract_all(downloads_dir, &work_dir.join(EXTRACTED_DIR)).await
    }

    async fn aggregate(&self, extracted: usize, work_dir: &Path) -> Result<AggregateResult> {
        if extracted == 0 {
            warn!("no archives extracted, nothing to aggregate");
            return Ok(AggregateResult::default());
        }

        let root = work_dir.join(EXTRACTED_DIR);
        let validate = self.config.processing.should_validate();
        spawn_blocking(move || aggregator::collect(&root, validate))
            .await
            .map_err(|e| Error::Other(format!("aggregation task panicked: {e}")))
    }

    /// Resolve the first `max_batch` domains in sorted order and write the live ones
    async fn resolve_dns(&self, domains: &HashSet<String>) -> Result<usize> {
        let mut sorted: Vec<&str> = domains.iter().map(String::as_str).collect();
        sorted.sort_unstable();

        let resolver = DnsResolver::new(&self.config.processing.dns);
        let results = resolver.bulk_resolve(sorted).await;

        let live: Vec<String> = results
            .into_iter()
            .filter_map(|(domain, alive)| alive.then_some(domain))
            .collect();

        tokio::fs::create_dir_all(&self.config.output.output_dir).await?;
        self.reports.write_resolved(&live).await?;
        Ok(live.len())
    }
}
