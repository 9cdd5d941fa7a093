//! Error types for chaos-collector
//!
//! This module provides the error taxonomy used by the collection pipeline:
//! - Fatal index errors that abort a run
//! - Per-URL fetch errors that are retried and then recorded as failures
//! - Archive extraction errors that are skipped per archive
//! - Interruption, which aborts the run after cleanup

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for chaos-collector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chaos-collector
///
/// Only [`Error::Index`] and [`Error::Interrupted`] abort the pipeline; the
/// stage-level variants are absorbed and counted by the stage that hit them.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "parallel_downloads")
        key: Option<String>,
    },

    /// Remote index could not be fetched or parsed
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// A single dataset download failed
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Archive extraction failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operator requested cancellation
    #[error("collection interrupted by user")]
    Interrupted,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, attached to log lines
    pub fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Index(e) => match e {
                IndexError::Request { .. } => "index_unreachable",
                IndexError::Status { .. } => "index_bad_status",
                IndexError::Parse { .. } => "index_unparsable",
            },
            Error::Fetch(_) => "fetch_failed",
            Error::Extraction(_) => "extraction_failed",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Interrupted => "interrupted",
            Error::Other(_) => "internal_error",
        }
    }

    /// Process exit status for a run that ended with this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Interrupted => 130,
            _ => 1,
        }
    }
}

/// Fatal errors while fetching the remote index
#[derive(Debug, Error)]
pub enum IndexError {
    /// Index URL unreachable (connect, DNS, timeout)
    #[error("failed to download index from {url}: {reason}")]
    Request {
        /// The index URL
        url: String,
        /// Transport-level failure description
        reason: String,
    },

    /// Index responded with a non-2xx status
    #[error("index {url} returned HTTP {status}")]
    Status {
        /// The index URL
        url: String,
        /// HTTP status code returned
        status: u16,
    },

    /// Index body was not a JSON array of objects
    #[error("failed to parse index from {url}: {reason}")]
    Parse {
        /// The index URL
        url: String,
        /// Parser error description
        reason: String,
    },
}

/// Failure of a single URL download after retries are exhausted
#[derive(Debug, Clone, Error)]
#[error("failed to download {url}: {cause}")]
pub struct FetchError {
    /// The dataset URL
    pub url: String,
    /// What went wrong
    pub cause: FetchCause,
}

impl FetchError {
    /// Create a new fetch error
    pub fn new(url: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            url: url.into(),
            cause,
        }
    }
}

/// Underlying cause of a [`FetchError`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchCause {
    /// Server responded with a non-success status code
    #[error("HTTP status {0}")]
    Status(u16),

    /// Request could not be completed (connect refused, timeout, reset)
    #[error("transport error: {message}")]
    Transport {
        /// Error description
        message: String,
        /// Whether the failure was a timeout or connection-level error
        transient: bool,
    },

    /// Writing the response body to disk failed
    #[error("write error: {0}")]
    Io(String),
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Archive file could not be opened
    #[error("failed to open archive {archive}: {reason}")]
    Open {
        /// The archive file
        archive: PathBuf,
        /// The reason it could not be opened
        reason: String,
    },

    /// Archive is not a valid zip (truncated, bad central directory, ...)
    #[error("corrupt archive {archive}: {reason}")]
    Corrupt {
        /// The archive file
        archive: PathBuf,
        /// The reason the archive was rejected
        reason: String,
    },

    /// An entry could not be written to disk
    #[error("failed to extract {entry} from {archive}: {reason}")]
    Entry {
        /// The archive file
        archive: PathBuf,
        /// Entry name inside the archive
        entry: String,
        /// The reason the entry failed
        reason: String,
    },
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_distinguish_index_failures() {
        let cases = [
            (
                Error::Index(IndexError::Request {
                    url: "http://x/index.json".into(),
                    reason: "connection refused".into(),
                }),
                "index_unreachable",
            ),
            (
                Error::Index(IndexError::Status {
                    url: "http://x/index.json".into(),
                    status: 503,
                }),
                "index_bad_status",
            ),
            (
                Error::Index(IndexError::Parse {
                    url: "http://x/index.json".into(),
                    reason: "expected value".into(),
                }),
                "index_unparsable",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.error_code(), expected, "{error}");
        }
    }

    #[test]
    fn interrupted_exits_with_sigint_status() {
        assert_eq!(Error::Interrupted.exit_code(), 130);
        assert_eq!(Error::Other("boom".into()).exit_code(), 1);
        assert_eq!(
            Error::config("parallel_downloads", "must be at least 1").exit_code(),
            1
        );
    }

    #[test]
    fn fetch_error_display_includes_url_and_cause() {
        let err = FetchError::new("https://host/a.zip", FetchCause::Status(404));
        assert_eq!(
            err.to_string(),
            "failed to download https://host/a.zip: HTTP status 404"
        );
    }

    #[test]
    fn config_helper_records_key() {
        match Error::config("index_url", "must not be empty") {
            Error::Config { message, key } => {
                assert_eq!(message, "must not be empty");
                assert_eq!(key.as_deref(), Some("index_url"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
