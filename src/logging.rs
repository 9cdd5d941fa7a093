//! Tracing subscriber setup for the command line tool
//!
//! Two layers share one registry: a console layer on stderr and a plain-text
//! file layer writing `chaos_collector_<timestamp>.log` into the output
//! directory. `RUST_LOG`, when set, replaces the level chosen from the
//! verbosity flags.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::{Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Console and file logging switches
#[derive(Clone, Debug, Default)]
pub struct LogOptions {
    /// Debug-level output on both layers
    pub verbose: bool,
    /// Console shows errors only; the file layer is unaffected
    pub quiet: bool,
    /// Directory for the run log; no file layer when `None`
    pub log_dir: Option<PathBuf>,
}

/// Log file name for a run started at `now`
pub fn log_file_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("chaos_collector_{}.log", now.format("%Y%m%d_%H%M%S"))
}

fn level_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the global subscriber
///
/// Returns the path of the log file when a file layer was installed. Fails
/// if the log directory or file cannot be created, or if a global subscriber
/// is already set.
pub fn init(options: &LogOptions) -> Result<Option<PathBuf>> {
    let base_level = if options.verbose { "debug" } else { "info" };
    let console_level = if options.quiet { "error" } else { base_level };

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(level_filter(console_level));

    let (file_layer, log_path) = match &options.log_dir {
        Some(dir) => {
            let (file, path) = open_log_file(dir)?;
            let layer = fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .with_filter(level_filter(base_level));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Other(format!("failed to initialize logging: {e}")))?;

    Ok(log_path)
}

fn open_log_file(dir: &Path) -> Result<(std::fs::File, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(log_file_name(chrono::Local::now()));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    Ok((file, path))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn log_file_name_uses_compact_timestamp() {
        let at = chrono::Local
            .with_ymd_and_hms(2025, 11, 2, 23, 4, 59)
            .single()
            .unwrap();
        assert_eq!(log_file_name(at), "chaos_collector_20251102_230459.log");
    }

    #[test]
    fn open_log_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("logs");

        let (_file, path) = open_log_file(&nested).unwrap();

        assert!(path.exists());
        assert!(path.starts_with(&nested));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("chaos_collector_")
        );
    }
}
