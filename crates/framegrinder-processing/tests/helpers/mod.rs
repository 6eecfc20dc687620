//! Test helpers: isolated directories, a stand-in ffmpeg and storage doubles.
//!
//! Run from workspace root: `cargo test -p framegrinder-processing`.
//! The fake ffmpeg is a shell script, so these tests only run on unix.

#![allow(dead_code)]

pub mod ffmpeg;
pub mod storage;

use framegrinder_core::Config;
use framegrinder_processing::ProcessingOrchestrator;
use framegrinder_storage::{create_storage, Storage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub use ffmpeg::FakeFfmpeg;
pub use storage::{MemoryStorage, CHUNK_SIZE};

/// Directories and configuration for one test, removed on drop.
pub struct TestEnv {
    pub dir: TempDir,
    pub config: Config,
    pub ffmpeg_args: PathBuf,
}

impl TestEnv {
    pub fn new(ffmpeg: FakeFfmpeg) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let (ffmpeg_path, ffmpeg_args) = ffmpeg.install(dir.path());

        let config = Config {
            uploads_dir: dir.path().join("uploads"),
            outputs_dir: dir.path().join("outputs"),
            temp_dir: dir.path().join("temp"),
            ffmpeg_path: ffmpeg_path.to_string_lossy().into_owned(),
            ..Config::default()
        };
        config
            .create_directories()
            .expect("Failed to create test directories");

        Self {
            dir,
            config,
            ffmpeg_args,
        }
    }

    /// Orchestrator persisting to local storage under the outputs directory.
    pub async fn local_orchestrator(&self) -> ProcessingOrchestrator {
        let storage = create_storage(&self.config)
            .await
            .expect("Failed to create local storage");
        ProcessingOrchestrator::new(self.config.clone(), storage)
    }

    pub fn orchestrator_with(&self, storage: Arc<dyn Storage>) -> ProcessingOrchestrator {
        ProcessingOrchestrator::new(self.config.clone(), storage)
    }

    /// Write a placeholder video into the uploads directory.
    pub fn write_video(&self, name: &str) -> PathBuf {
        let path = self.config.uploads_dir.join(name);
        std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42 fake video").expect("write video");
        path
    }

    /// Bytes of the video the fake ffmpeg last read, or `None` if it never ran.
    pub fn recorded_ffmpeg_input(&self) -> Option<Vec<u8>> {
        std::fs::read(self.dir.path().join(ffmpeg::RECORDED_INPUT)).ok()
    }

    /// Arguments the fake ffmpeg was last invoked with, or `None` if it never ran.
    pub fn recorded_ffmpeg_args(&self) -> Option<Vec<String>> {
        std::fs::read_to_string(&self.ffmpeg_args)
            .ok()
            .map(|s| s.lines().map(str::to_string).collect())
    }
}

/// Names of the entries directly inside `dir` (empty if it does not exist).
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

/// Entry names of a zip archive, in archive order.
pub fn zip_entry_names(bytes: &[u8]) -> Vec<String> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).expect("archive should be readable");
    (0..archive.len())
        .map(|i| archive.by_index(i).expect("entry").name().to_string())
        .collect()
}
