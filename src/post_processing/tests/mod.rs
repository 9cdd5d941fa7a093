use crate::post_processing::*;
use flate2::read::GzDecoder;
use std::path::Path;
use tempfile::TempDir;

/// Entry names of a `.tar.gz` bundle
fn bundle_entries(bundle: &Path) -> Vec<String> {
    let file = std::fs::File::open(bundle).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|entry| entry.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// compress
// ---------------------------------------------------------------------------

#[test]
fn test_bundle_name_uses_timestamp() {
    use chrono::TimeZone;
    let at = chrono::Local
        .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
        .single()
        .unwrap();
    assert_eq!(bundle_name(at), "chaos_data_20240309_070501.tar.gz");
}

#[tokio::test]
async fn test_compress_bundles_regular_files_only() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path();
    std::fs::write(out.join("aggregated_domains.txt"), "foo.com\n").unwrap();
    std::fs::write(out.join("collection_summary.json"), "{}").unwrap();
    std::fs::write(out.join("chaos_data_20200101_000000.tar.gz"), b"old bundle").unwrap();
    std::fs::create_dir(out.join("nested")).unwrap();
    std::fs::write(out.join("nested").join("inner.txt"), "x").unwrap();

    let bundle = compress_output(out).await.unwrap();

    assert!(bundle.exists());
    assert!(
        bundle
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(BUNDLE_PREFIX)
    );
    assert_eq!(
        bundle_entries(&bundle),
        vec!["aggregated_domains.txt", "collection_summary.json"]
    );
}

#[tokio::test]
async fn test_compressed_content_round_trips() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path();
    let body = "a.foo.com\nb.foo.com\n".repeat(500);
    std::fs::write(out.join("aggregated_domains.txt"), &body).unwrap();

    let bundle = compress_output(out).await.unwrap();

    let file = std::fs::File::open(&bundle).unwrap();
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    let mut entry = archive.entries().unwrap().next().unwrap().unwrap();
    let mut content = String::new();
    std::io::Read::read_to_string(&mut entry, &mut content).unwrap();
    assert_eq!(content, body);
}

#[test]
fn test_bundle_candidates_skip_prior_bundles() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("chaos_data_x.tar.gz"), b"").unwrap();
    std::fs::write(temp_dir.path().join("b.txt"), b"").unwrap();
    std::fs::write(temp_dir.path().join("a.txt"), b"").unwrap();

    let files = bundle_candidates(temp_dir.path()).unwrap();

    assert_eq!(
        files,
        vec![temp_dir.path().join("a.txt"), temp_dir.path().join("b.txt")]
    );
}

// ---------------------------------------------------------------------------
// cleanup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_cleanup_removes_work_dir() {
    let temp_dir = TempDir::new().unwrap();
    let work = temp_dir.path().join("chaos_work");
    std::fs::create_dir_all(work.join("downloads")).unwrap();
    std::fs::write(work.join("downloads").join("a.zip"), b"PK").unwrap();

    assert!(cleanup_work_dir(&work, true).await);
    assert!(!work.exists());
}

#[tokio::test]
async fn test_cleanup_disabled_keeps_work_dir() {
    let temp_dir = TempDir::new().unwrap();
    let work = temp_dir.path().join("chaos_work");
    std::fs::create_dir_all(&work).unwrap();

    assert!(!cleanup_work_dir(&work, false).await);
    assert!(work.exists());
}

#[tokio::test]
async fn test_cleanup_missing_dir_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    assert!(cleanup_work_dir(&temp_dir.path().join("absent"), true).await);
}
