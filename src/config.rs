//! Configuration types for chaos-collector
//!
//! Configuration is layered and resolved once at startup:
//! built-in defaults, then the home-directory JSON file, then command line
//! overrides. The resolved [`Config`] is passed immutably to every component.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the per-user configuration file in the home directory
pub const HOME_CONFIG_FILE: &str = ".chaos_collector.json";

/// Output locations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output directory for reports, ledger, logs and bundles (default: "chaos_data")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Main aggregated domain list file name (default: "aggregated_domains.txt")
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Base directory for per-run working directories (default: system temp dir)
    ///
    /// Each run creates and owns a fresh `chaos_<timestamp>_<pid>` directory
    /// under this base; cleanup removes only that directory.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            output_file: default_output_file(),
            work_dir: None,
        }
    }
}

/// Download behavior (concurrency, timeouts, retries)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Maximum concurrent dataset downloads (default: 5)
    #[serde(default = "default_parallel_downloads")]
    pub parallel_downloads: usize,

    /// Connect and read timeout (default: 30 seconds)
    ///
    /// Bounds connecting, waiting for response headers, and each gap between
    /// body chunks. A download that keeps receiving data is never cut off.
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Retry policy for transient HTTP failures
    #[serde(flatten)]
    pub retry: RetryConfig,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            parallel_downloads: default_parallel_downloads(),
            timeout: default_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for transient failures
///
/// Independent of any HTTP library: statuses and methods are plain values that
/// the fetcher checks against its own responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 3)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (default: 0.5 seconds)
    #[serde(default = "default_initial_delay", with = "duration_secs_f64")]
    pub initial_delay: Duration,

    /// Upper bound for a single backoff delay (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_secs_f64")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,

    /// HTTP status codes treated as transient (default: 429, 500, 502, 503, 504)
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    /// HTTP methods that may be retried (default: GET, HEAD)
    #[serde(default = "default_retry_methods")]
    pub retry_methods: Vec<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
            retry_statuses: default_retry_statuses(),
            retry_methods: default_retry_methods(),
        }
    }
}

impl RetryConfig {
    /// Whether a response with this status code should be retried
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    /// Whether requests with this method may be retried at all
    pub fn allows_method(&self, method: &str) -> bool {
        self.retry_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method))
    }

    /// Backoff delay before retry number `retry` (1-based)
    ///
    /// `initial_delay * multiplier^(retry - 1)`, capped at `max_delay`.
    /// An overflowing or non-finite product yields `max_delay`.
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }
}

/// Content processing toggles (validation, compression, cleanup, DNS)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Filter lines through the domain validator (default: true)
    #[serde(default = "default_true")]
    pub validate_domains: bool,

    /// Deduplicate domains (default: true)
    ///
    /// The aggregated set always deduplicates; with this off, validation is
    /// skipped as well and every non-empty line is kept.
    #[serde(default = "default_true")]
    pub remove_duplicates: bool,

    /// Bundle the output directory into a timestamped `.tar.gz` (default: true)
    #[serde(default = "default_true")]
    pub enable_compression: bool,

    /// Remove the working directory at the end of the run (default: true)
    #[serde(default = "default_true")]
    pub cleanup: bool,

    /// Resolve aggregated domains via DNS after aggregation (default: false)
    #[serde(default)]
    pub resolve_dns: bool,

    /// DNS resolution limits
    #[serde(flatten)]
    pub dns: DnsConfig,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            validate_domains: true,
            remove_duplicates: true,
            enable_compression: true,
            cleanup: true,
            resolve_dns: false,
            dns: DnsConfig::default(),
        }
    }
}

impl ProcessingConfig {
    /// Whether aggregation should run lines through the validator
    pub fn should_validate(&self) -> bool {
        self.validate_domains && self.remove_duplicates
    }
}

/// DNS resolution limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Concurrent lookups (default: 10)
    #[serde(default = "default_dns_concurrency", rename = "dns_concurrency")]
    pub concurrency: usize,

    /// Per-lookup timeout (default: 5 seconds)
    #[serde(
        default = "default_dns_timeout",
        rename = "dns_timeout",
        with = "duration_serde"
    )]
    pub timeout: Duration,

    /// Maximum number of domains resolved per run (default: 1000)
    #[serde(default = "default_dns_max_batch", rename = "dns_max_batch")]
    pub max_batch: usize,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_dns_concurrency(),
            timeout: default_dns_timeout(),
            max_batch: default_dns_max_batch(),
        }
    }
}

/// Per-invocation switches; never read from or written to the config file
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Skip URLs already recorded in the resume ledger
    pub resume: bool,
    /// Log what would happen without downloading anything
    pub dry_run: bool,
    /// Debug-level console output
    pub verbose: bool,
    /// Suppress console output except errors
    pub quiet: bool,
}

/// Main configuration for a collection run
///
/// Sub-configs are flattened so the JSON file stays a single flat object,
/// e.g. `{"index_url": "...", "timeout": 30, "parallel_downloads": 8}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Remote index URL (JSON array of dataset records)
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Output locations
    #[serde(flatten)]
    pub output: OutputConfig,

    /// Download behavior
    #[serde(flatten)]
    pub download: DownloadConfig,

    /// Processing toggles
    #[serde(flatten)]
    pub processing: ProcessingConfig,

    /// Per-invocation switches
    #[serde(skip)]
    pub run: RunOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            user_agent: default_user_agent(),
            output: OutputConfig::default(),
            download: DownloadConfig::default(),
            processing: ProcessingConfig::default(),
            run: RunOptions::default(),
        }
    }
}

/// Command line layer; `None` leaves the lower layer's value in place
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Index URL
    pub index_url: Option<String>,
    /// Output directory
    pub output_dir: Option<PathBuf>,
    /// Main output file name
    pub output_file: Option<String>,
    /// Parallel download count
    pub parallel_downloads: Option<usize>,
    /// Max retries per download
    pub max_retries: Option<u32>,
    /// Timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Domain validation toggle
    pub validate_domains: Option<bool>,
    /// Deduplication toggle
    pub remove_duplicates: Option<bool>,
    /// Compression toggle
    pub enable_compression: Option<bool>,
    /// Cleanup toggle
    pub cleanup: Option<bool>,
    /// DNS resolution toggle
    pub resolve_dns: Option<bool>,
    /// Per-invocation switches
    pub run: RunOptions,
}

impl Config {
    /// Default location of the per-user config file (`~/.chaos_collector.json`)
    pub fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(HOME_CONFIG_FILE))
    }

    /// Load a config file layer; missing keys take their defaults
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Resolve defaults, the optional file layer, and CLI overrides into one config
    ///
    /// A missing file is not an error. A file that exists but cannot be read or
    /// parsed is returned as an error so the caller can warn and fall back to
    /// `Config::resolve(None, overrides)`.
    pub fn resolve(file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = match file {
            Some(path) if path.exists() => Self::load_file(path)?,
            _ => Self::default(),
        };
        config.apply(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Overlay the command line layer
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.index_url {
            self.index_url = url.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            self.output.output_dir = dir.clone();
        }
        if let Some(file) = &overrides.output_file {
            self.output.output_file = file.clone();
        }
        if let Some(parallel) = overrides.parallel_downloads {
            self.download.parallel_downloads = parallel;
        }
        if let Some(retries) = overrides.max_retries {
            self.download.retry.max_retries = retries;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.download.timeout = Duration::from_secs(secs);
        }
        if let Some(v) = overrides.validate_domains {
            self.processing.validate_domains = v;
        }
        if let Some(v) = overrides.remove_duplicates {
            self.processing.remove_duplicates = v;
        }
        if let Some(v) = overrides.enable_compression {
            self.processing.enable_compression = v;
        }
        if let Some(v) = overrides.cleanup {
            self.processing.cleanup = v;
        }
        if let Some(v) = overrides.resolve_dns {
            self.processing.resolve_dns = v;
        }
        self.run = overrides.run.clone();
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.index_url.trim().is_empty() {
            return Err(Error::config("index_url", "index URL must not be empty"));
        }
        if self.download.parallel_downloads == 0 {
            return Err(Error::config(
                "parallel_downloads",
                "parallel downloads must be at least 1",
            ));
        }
        if self.output.output_file.trim().is_empty() {
            return Err(Error::config(
                "output_file",
                "output file name must not be empty",
            ));
        }
        let multiplier = self.download.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::config(
                "backoff_multiplier",
                format!("backoff multiplier must be a finite number >= 1.0, got {multiplier}"),
            ));
        }
        if self.processing.dns.concurrency == 0 {
            return Err(Error::config(
                "dns_concurrency",
                "DNS concurrency must be at least 1",
            ));
        }
        Ok(())
    }

    /// Write the file layer as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Path of the resume ledger inside the output directory
    pub fn resume_file(&self) -> PathBuf {
        self.output.output_dir.join("downloaded_urls.txt")
    }

    /// Path of the main aggregated domain file
    pub fn main_output_path(&self) -> PathBuf {
        self.output.output_dir.join(&self.output.output_file)
    }
}

fn default_index_url() -> String {
    "https://chaos-data.projectdiscovery.io/index.json".to_string()
}

fn default_user_agent() -> String {
    "Chaos-Collector-Pro/2.0 (+https://github.com/security-tools)".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("chaos_data")
}

fn default_output_file() -> String {
    "aggregated_domains.txt".to_string()
}

fn default_parallel_downloads() -> usize {
    5
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

fn default_retry_methods() -> Vec<String> {
    vec!["GET".to_string(), "HEAD".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_dns_concurrency() -> usize {
    10
}

fn default_dns_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_dns_max_batch() -> usize {
    1000
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Fractional seconds, for sub-second backoff delays
mod duration_secs_f64 {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
