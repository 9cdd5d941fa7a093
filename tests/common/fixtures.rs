//! Dataset archives, index mocks and config builders

use chaos_collector::Config;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// In-memory zip with stored (uncompressed) entries
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Bytes that start like a zip but are not one
pub fn corrupt_zip_bytes() -> Vec<u8> {
    b"PK\x03\x04 truncated archive".to_vec()
}

/// Mount `/index.json` listing `/datasets/<name>` for each dataset name
pub async fn mount_index(server: &MockServer, datasets: &[&str]) {
    let entries: Vec<serde_json::Value> = datasets
        .iter()
        .map(|name| {
            serde_json::json!({
                "name": name.trim_end_matches(".zip"),
                "URL": format!("{}/datasets/{name}", server.uri()),
                "platform": "hackerone",
                "bounty": true,
                "count": 1,
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(entries))
        .mount(server)
        .await;
}

/// Mount one dataset body at `/datasets/<name>`
pub async fn mount_dataset(server: &MockServer, name: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/datasets/{name}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Config pointing at the mock index with scratch output and work dirs
pub fn test_config(server: &MockServer, root: &Path) -> Config {
    let mut config = Config::default();
    config.index_url = format!("{}/index.json", server.uri());
    config.output.output_dir = root.join("out");
    config.output.work_dir = Some(root.join("work"));
    config.download.timeout = Duration::from_secs(5);
    config.download.retry.initial_delay = Duration::from_millis(10);
    config.processing.enable_compression = false;
    config
}

/// Sorted names of the regular files in `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().unwrap().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Read a report file from the output directory
pub fn read_output(config: &Config, name: &str) -> String {
    let path: PathBuf = config.output.output_dir.join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {path:?}: {e}"))
}
