//! Output bundling into a timestamped `.tar.gz`

use crate::error::{Error, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info};

/// Prefix shared by every bundle; files carrying it are never bundled again
pub const BUNDLE_PREFIX: &str = "chaos_data_";

/// Bundle file name for a given timestamp
pub fn bundle_name(now: chrono::DateTime<chrono::Local>) -> String {
    format!("{BUNDLE_PREFIX}{}.tar.gz", now.format("%Y%m%d_%H%M%S"))
}

/// Regular files directly inside `output_dir` that belong in a bundle, sorted by name
pub fn bundle_candidates(output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(output_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(BUNDLE_PREFIX) {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

/// Write every bundle candidate of `output_dir` into a new gzip tarball there
///
/// Returns the bundle path.
pub async fn compress_output(output_dir: &Path) -> Result<PathBuf> {
    info!(?output_dir, "compressing output");

    let bundle = output_dir.join(bundle_name(chrono::Local::now()));
    let dir = output_dir.to_path_buf();
    let target = bundle.clone();

    let added = spawn_blocking(move || write_bundle(&dir, &target))
        .await
        .map_err(|e| Error::Other(format!("compression task panicked: {e}")))??;

    info!(archive = ?bundle, files = added, "archive created");
    Ok(bundle)
}

fn write_bundle(output_dir: &Path, bundle: &Path) -> Result<usize> {
    let candidates = bundle_candidates(output_dir)?;

    let file = std::fs::File::create(bundle)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for path in &candidates {
        let Some(name) = path.file_name() else {
            continue;
        };

        let source = std::fs::File::open(path)?;
        let metadata = source.metadata()?;

        // size is fixed up front: the run log may still be growing
        let mut header = tar::Header::new_gnu();
        header.set_metadata(&metadata);
        header.set_size(metadata.len());
        builder.append_data(&mut header, name, source.take(metadata.len()))?;

        debug!(file = ?name, bytes = metadata.len(), "added to archive");
    }

    builder.into_inner()?.finish()?;
    Ok(candidates.len())
}
