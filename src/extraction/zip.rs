use crate::error::{ExtractionError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Archive extractor for ZIP files
pub struct ZipExtractor;

impl ZipExtractor {
    /// Detect ZIP archive files directly inside a directory, sorted by path
    pub fn detect_zip_files(download_path: &Path) -> Result<Vec<PathBuf>> {
        debug!(?download_path, "detecting ZIP archives");

        let mut archives = Vec::new();

        for entry in std::fs::read_dir(download_path)? {
            let path = entry?.path();

            // Skip directories
            if path.is_dir() {
                continue;
            }

            if let Some(ext) = path.extension()
                && ext.to_string_lossy().eq_ignore_ascii_case("zip")
            {
                archives.push(path);
            }
        }

        archives.sort();
        debug!("found {} ZIP archive(s)", archives.len());
        Ok(archives)
    }

    /// Extract a single ZIP entry under `dest_path`
    ///
    /// Entries whose name would resolve outside `dest_path` (absolute paths,
    /// `..` components) are skipped with a warning and yield `Ok(None)`.
    fn extract_zip_entry(
        mut file: zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> std::result::Result<Option<PathBuf>, ExtractionError> {
        let entry_name = file.name().to_string();
        let entry_error = |reason: String| ExtractionError::Entry {
            archive: archive_path.to_path_buf(),
            entry: entry_name.clone(),
            reason,
        };

        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(
                    ?archive_path,
                    entry = %entry_name,
                    "skipping entry with unsafe path"
                );
                return Ok(None);
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path)
                .map_err(|e| entry_error(format!("failed to create directory: {e}")))?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| entry_error(format!("failed to create parent directories: {e}")))?;
        }

        let mut outfile = std::fs::File::create(&file_path)
            .map_err(|e| entry_error(format!("failed to create output file: {e}")))?;

        std::io::copy(&mut file, &mut outfile)
            .map_err(|e| entry_error(format!("failed to extract file: {e}")))?;

        Ok(Some(file_path))
    }

    /// Extract every entry of a ZIP archive into `dest_path`
    ///
    /// Returns the files written. An archive that cannot be opened or parsed
    /// fails as a whole; nothing is extracted from it.
    pub fn try_extract(
        archive_path: &Path,
        dest_path: &Path,
    ) -> std::result::Result<Vec<PathBuf>, ExtractionError> {
        debug!(?archive_path, ?dest_path, "attempting ZIP extraction");

        let file = std::fs::File::open(archive_path).map_err(|e| ExtractionError::Open {
            archive: archive_path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractionError::Corrupt {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to read ZIP archive: {e}"),
        })?;

        // Create destination directory only once the archive is known to be readable
        std::fs::create_dir_all(dest_path).map_err(|e| ExtractionError::Open {
            archive: archive_path.to_path_buf(),
            reason: format!("failed to create destination: {e}"),
        })?;

        let mut extracted_files = Vec::new();

        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| ExtractionError::Corrupt {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP entry {i}: {e}"),
            })?;

            if let Some(file_path) = Self::extract_zip_entry(file, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }
}
