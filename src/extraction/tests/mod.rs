use crate::error::ExtractionError;
use crate::extraction::*;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a valid ZIP archive containing the given files
fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap();
}

/// Source/target directory pair under one scratch dir
fn scratch_dirs() -> (TempDir, std::path::PathBuf, std::path::PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("downloads");
    let target = temp_dir.path().join("extracted");
    std::fs::create_dir_all(&source).unwrap();
    (temp_dir, source, target)
}

// ---------------------------------------------------------------------------
// detect_zip_files
// ---------------------------------------------------------------------------

#[test]
fn test_detect_zip_files_ignores_other_extensions() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("b.zip"), b"zip").unwrap();
    std::fs::write(temp_dir.path().join("a.ZIP"), b"zip").unwrap();
    std::fs::write(temp_dir.path().join("notes.txt"), b"text").unwrap();
    std::fs::create_dir(temp_dir.path().join("dir.zip")).unwrap();

    let result = ZipExtractor::detect_zip_files(temp_dir.path()).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0], temp_dir.path().join("a.ZIP"));
    assert_eq!(result[1], temp_dir.path().join("b.zip"));
}

// ---------------------------------------------------------------------------
// try_extract
// ---------------------------------------------------------------------------

#[test]
fn test_try_extract_writes_nested_entries() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("acme.zip");
    create_zip_archive(
        &archive,
        &[
            ("acme.txt", &b"foo.com\nbar.foo.com\n"[..]),
            ("nested/more.txt", &b"baz.io\n"[..]),
        ],
    );

    let dest = temp_dir.path().join("out");
    let files = ZipExtractor::try_extract(&archive, &dest).unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(
        std::fs::read_to_string(dest.join("acme.txt")).unwrap(),
        "foo.com\nbar.foo.com\n"
    );
    assert!(dest.join("nested/more.txt").exists());
}

#[test]
fn test_try_extract_rejects_garbage() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("broken.zip");
    std::fs::write(&archive, b"this is not a zip archive").unwrap();

    let dest = temp_dir.path().join("out");
    let err = ZipExtractor::try_extract(&archive, &dest).unwrap_err();

    assert!(matches!(err, ExtractionError::Corrupt { .. }), "got {err:?}");
    assert!(!dest.exists(), "no destination for unreadable archive");
}

#[test]
fn test_try_extract_skips_path_traversal_entries() {
    let temp_dir = TempDir::new().unwrap();
    let archive = temp_dir.path().join("evil.zip");
    create_zip_archive(
        &archive,
        &[
            ("../escaped.txt", &b"owned.com\n"[..]),
            ("/abs/escaped.txt", &b"owned.com\n"[..]),
            ("safe.txt", &b"foo.com\n"[..]),
        ],
    );

    let dest = temp_dir.path().join("jail").join("evil");
    let files = ZipExtractor::try_extract(&archive, &dest).unwrap();

    assert_eq!(files, vec![dest.join("safe.txt")]);
    assert!(!temp_dir.path().join("jail").join("escaped.txt").exists());
    assert!(!Path::new("/abs/escaped.txt").exists());
}

// ---------------------------------------------------------------------------
// extract_all
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_extract_all_uses_archive_stem_subdirectories() {
    let (_temp_dir, source, target) = scratch_dirs();
    create_zip_archive(&source.join("alpha.zip"), &[("alpha.txt", &b"a.alpha.com\n"[..])]);
    create_zip_archive(&source.join("beta.zip"), &[("beta.txt", &b"b.beta.net\n"[..])]);

    let count = extract_all(&source, &target).await.unwrap();

    assert_eq!(count, 2);
    assert!(target.join("alpha").join("alpha.txt").exists());
    assert!(target.join("beta").join("beta.txt").exists());
}

#[tokio::test]
async fn test_extract_all_skips_single_corrupt_archive() {
    let (_temp_dir, source, target) = scratch_dirs();
    for name in ["one", "two", "three", "four"] {
        create_zip_archive(
            &source.join(format!("{name}.zip")),
            &[("domains.txt", format!("{name}.com\n").as_bytes())],
        );
    }
    std::fs::write(source.join("corrupt.zip"), b"PK\x03\x04 truncated").unwrap();

    let count = extract_all(&source, &target).await.unwrap();

    // N = 5 archives, one of them corrupt
    assert_eq!(count, 4);
    assert!(!target.join("corrupt").exists());
    assert!(target.join("three").join("domains.txt").exists());
}

#[tokio::test]
async fn test_extract_all_missing_source_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let count = extract_all(
        &temp_dir.path().join("never-created"),
        &temp_dir.path().join("extracted"),
    )
    .await
    .unwrap();
    assert_eq!(count, 0);
}
