#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use serde::de::DeserializeOwned;
use tempfile::TempDir;

pub const QUERY: &str = "query.csv";
pub const SEARCH_DDG: &str = "search_ddg.csv";
pub const SEARCH_BING: &str = "search_bing.csv";
pub const PREDICTIONS: &str = "predictions.csv";
pub const LABEL_MAP: &str = "label_map.json";

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative)
}

pub fn load_fixture(relative: &str) -> String {
    fs::read_to_string(fixture_path(relative))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", relative))
}

pub fn load_json_fixture<T: DeserializeOwned>(relative: &str) -> T {
    let content = load_fixture(relative);
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse JSON fixture {}: {}", relative, e))
}

pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> T {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse JSON {}: {}", path.display(), e))
}

/// Copy the shipped config into `tmp/config/` so the binary finds
/// `./config/domainmatch.toml` relative to its working directory.
pub fn setup_config_dir(tmp: &TempDir) {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
    let dst = tmp.path().join("config");
    fs::create_dir_all(&dst).unwrap();
    fs::copy(src.join("domainmatch.toml"), dst.join("domainmatch.toml")).unwrap();
}
