#![allow(dead_code)]

pub mod fixtures;
pub mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use thumbnailer_lambda::Thumbnailer;
use thumbnailer_processing::TransformOptions;
use thumbnailer_storage::{LocalStorage, Storage};

pub const INPUT_BUCKET: &str = "thumbnail-input";
pub const OUTPUT_BUCKET: &str = "thumbnail-output";

/// Handler wired to a local storage root in a temp dir.
pub struct TestEnv {
    pub storage: Arc<LocalStorage>,
    pub thumbnailer: Thumbnailer,
    pub _temp_dir: TempDir,
}

impl TestEnv {
    pub fn root(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Put `data` under `key` in the input bucket.
    pub async fn seed(&self, key: &str, data: Vec<u8>) {
        self.storage
            .upload(INPUT_BUCKET, key, data)
            .await
            .expect("Failed to seed input object");
    }

    pub async fn read_output(&self, key: &str) -> Vec<u8> {
        self.storage
            .download(OUTPUT_BUCKET, key)
            .await
            .expect("Output object missing")
    }

    /// Every file under the output bucket, staging files included.
    pub fn output_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.root().join(OUTPUT_BUCKET), &mut files);
        files
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

pub async fn setup_test_env() -> TestEnv {
    setup_test_env_with(TransformOptions::default()).await
}

pub async fn setup_test_env_with(options: TransformOptions) -> TestEnv {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = Arc::new(
        LocalStorage::new(temp_dir.path())
            .await
            .expect("Failed to create local storage")
            .with_buffer_chunks(options.buffer_chunks),
    );
    let thumbnailer = Thumbnailer::new(storage.clone()).with_options(options);

    TestEnv {
        storage,
        thumbnailer,
        _temp_dir: temp_dir,
    }
}
