//! Archive extraction
//!
//! Every ZIP archive directly inside the download directory is unpacked into
//! a subdirectory named after the archive's stem. A corrupt archive is
//! skipped with a warning; the rest of the batch carries on.

mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use zip::ZipExtractor;

use crate::error::{Error, ExtractionError, Result};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Extract every ZIP archive in `source_dir` into `target_dir/<stem>/`
///
/// Returns the number of archives extracted successfully. Only a failure to
/// list `source_dir` is an error; per-archive failures are logged and skipped.
pub async fn extract_all(source_dir: &Path, target_dir: &Path) -> Result<usize> {
    info!(?source_dir, "extracting archives");

    let archives = match ZipExtractor::detect_zip_files(source_dir) {
        Ok(archives) => archives,
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?source_dir, "download directory missing, nothing to extract");
            return Ok(0);
        }
        Err(e) => return Err(e),
    };

    tokio::fs::create_dir_all(target_dir).await?;

    let mut extracted = 0;
    for archive_path in archives {
        let dest_path = archive_destination(&archive_path, target_dir);

        match extract_archive(archive_path.clone(), dest_path).await {
            Ok(files) => {
                extracted += 1;
                debug!(?archive_path, files = files.len(), "archive extracted");
            }
            Err(e) => {
                warn!(?archive_path, error = %e, "failed to extract archive, skipping");
            }
        }
    }

    info!(extracted, "archive extraction finished");
    Ok(extracted)
}

/// Extract one archive on the blocking pool
pub async fn extract_archive(
    archive_path: PathBuf,
    dest_path: PathBuf,
) -> std::result::Result<Vec<PathBuf>, ExtractionError> {
    let archive = archive_path.clone();
    spawn_blocking(move || ZipExtractor::try_extract(&archive_path, &dest_path))
        .await
        .map_err(|e| ExtractionError::Corrupt {
            archive,
            reason: format!("extraction task panicked: {e}"),
        })?
}

/// `target_dir/<archive stem>`
fn archive_destination(archive_path: &Path, target_dir: &Path) -> PathBuf {
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    target_dir.join(stem)
}
