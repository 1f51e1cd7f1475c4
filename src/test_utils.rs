//! Fixture helpers for tests

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding Cargo.toml, found through `CARGO_MANIFEST_DIR` or by walking up
pub fn get_project_root() -> PathBuf {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return PathBuf::from(manifest_dir);
    }

    let start = env::current_dir().expect("Failed to get current directory");
    start
        .ancestors()
        .find(|dir| dir.join("Cargo.toml").is_file())
        .map(Path::to_path_buf)
        .expect("Could not find project root (Cargo.toml not found)")
}

/// Path of a file under `testdata/`, given with forward slashes
pub fn testdata(relative: &str) -> PathBuf {
    relative
        .split('/')
        .fold(get_project_root().join("testdata"), |path, part| path.join(part))
}

/// Copy a fixture into `dir` so a test can edit it without touching `testdata/`
pub fn copy_fixture(relative: &str, dir: &Path) -> PathBuf {
    let source = testdata(relative);
    let target = dir.join(source.file_name().expect("fixture has a file name"));
    fs::copy(&source, &target).expect("Failed to copy fixture");
    target
}
