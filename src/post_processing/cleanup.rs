//! Cleanup stage for removing the working directory

use std::path::Path;
use tracing::{debug, info, warn};

/// Remove the working directory tree, or report where it was kept
///
/// Errors are logged as warnings but never fail the run. Returns whether the
/// directory is gone afterwards.
pub async fn cleanup_work_dir(work_dir: &Path, enabled: bool) -> bool {
    if !enabled {
        info!(?work_dir, "temporary files kept");
        return false;
    }

    info!(?work_dir, "cleaning up temporary files");

    if tokio::fs::metadata(work_dir).await.is_err() {
        debug!(?work_dir, "work directory does not exist, skipping cleanup");
        return true;
    }

    match tokio::fs::remove_dir_all(work_dir).await {
        Ok(()) => {
            debug!(?work_dir, "work directory removed");
            true
        }
        Err(e) => {
            warn!(?work_dir, error = %e, "failed to remove work directory");
            false
        }
    }
}
