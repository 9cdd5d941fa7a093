//! Single-URL dataset fetch with retry, streaming to disk, and ledger update.

use crate::config::{Config, DownloadConfig, RetryConfig};
use crate::error::{Error, FetchCause, FetchError, Result};
use crate::ledger::ResumeLedger;
use crate::retry::{Classified, retry_with_backoff};
use crate::types::DownloadTask;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Abstraction over dataset fetching, enabling testability.
#[async_trait::async_trait]
pub trait DatasetFetcher: Send + Sync {
    /// Download `task.url` into `task.destination`, returning bytes written
    async fn fetch(&self, task: &DownloadTask) -> std::result::Result<u64, FetchError>;
}

/// Build the shared HTTP client (User-Agent, Accept, connect timeout)
///
/// No overall request deadline is set: dataset bodies may stream for far
/// longer than `download.timeout`. [`HttpFetcher`] applies the timeout to
/// each read instead, and the index request sets its own deadline.
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );

    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .connect_timeout(config.download.timeout)
        .build()
        .map_err(|e| Error::Other(format!("failed to create HTTP client: {e}")))
}

/// Production [`DatasetFetcher`] over HTTP(S)
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryConfig,
    /// Longest wait for response headers or for the next body chunk
    read_timeout: Duration,
    ledger: Arc<ResumeLedger>,
}

impl HttpFetcher {
    /// Fetcher that records every completed URL in `ledger`
    pub fn new(
        client: reqwest::Client,
        download: &DownloadConfig,
        ledger: Arc<ResumeLedger>,
    ) -> Self {
        Self {
            client,
            retry: download.retry.clone(),
            read_timeout: download.timeout,
            ledger,
        }
    }

    fn stalled(&self, waiting_for: &str) -> FetchCause {
        FetchCause::Transport {
            message: format!(
                "no {waiting_for} received within {:.1}s",
                self.read_timeout.as_secs_f64()
            ),
            transient: true,
        }
    }

    async fn fetch_once(
        &self,
        task: &DownloadTask,
    ) -> std::result::Result<u64, Classified<FetchError>> {
        let may_retry = self.retry.allows_method("GET");
        let fail = |cause: FetchCause, transient: bool| {
            let error = FetchError::new(&task.url, cause);
            if may_retry && transient {
                Classified::transient(error)
            } else {
                Classified::permanent(error)
            }
        };

        let sent = timeout(self.read_timeout, self.client.get(&task.url).send())
            .await
            .map_err(|_| fail(self.stalled("response"), true))?;
        let mut response = sent.map_err(|e| {
            let transient = e.is_timeout() || e.is_connect();
            fail(
                FetchCause::Transport {
                    message: e.to_string(),
                    transient,
                },
                transient,
            )
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(fail(
                FetchCause::Status(status),
                self.retry.is_retryable_status(status),
            ));
        }

        let mut file = tokio::fs::File::create(&task.destination)
            .await
            .map_err(|e| fail(FetchCause::Io(e.to_string()), false))?;

        let mut written: u64 = 0;
        loop {
            let read = timeout(self.read_timeout, response.chunk())
                .await
                .map_err(|_| fail(self.stalled("data"), true))?;
            let chunk = read.map_err(|e| {
                // body interrupted mid-stream (reset, timeout)
                fail(
                    FetchCause::Transport {
                        message: e.to_string(),
                        transient: true,
                    },
                    true,
                )
            })?;

            let Some(chunk) = chunk else { break };
            file.write_all(&chunk)
                .await
                .map_err(|e| fail(FetchCause::Io(e.to_string()), false))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| fail(FetchCause::Io(e.to_string()), false))?;

        Ok(written)
    }
}

#[async_trait::async_trait]
impl DatasetFetcher for HttpFetcher {
    async fn fetch(&self, task: &DownloadTask) -> std::result::Result<u64, FetchError> {
        let bytes = retry_with_backoff(&self.retry, || self.fetch_once(task))
            .await
            .map_err(|classified| classified.error)?;

        debug!(
            url = %task.url,
            destination = ?task.destination,
            bytes,
            "dataset downloaded"
        );

        // file is complete; a ledger write failure is not a fetch failure
        if let Err(e) = self.ledger.mark_complete(&task.url).await {
            warn!(url = %task.url, error = %e, "failed to record download in resume ledger");
        }

        Ok(bytes)
    }
}
