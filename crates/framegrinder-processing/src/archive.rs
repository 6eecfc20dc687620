//! Zip archive of extracted frames.

use chrono::{DateTime, Datelike, Timelike, Utc};
use framegrinder_core::validation::validate_within_root;
use framegrinder_core::{Frame, PipelineError};
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Bundles frames into a single zip, one entry per frame in the order given.
///
/// Entry names are frame basenames; directory structure is never stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveBuilder;

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the archive in memory.
    pub async fn build(&self, frames: &[Frame]) -> Result<Vec<u8>, PipelineError> {
        let frames = frames.to_vec();
        let start = std::time::Instant::now();

        let buffer = tokio::task::spawn_blocking(move || {
            write_archive(Cursor::new(Vec::new()), &frames).map(Cursor::into_inner)
        })
        .await
        .map_err(|e| PipelineError::ArchiveBuildFailed(format!("Archive task failed: {}", e)))??;

        tracing::info!(
            size_bytes = buffer.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive built in memory"
        );

        Ok(buffer)
    }

    /// Build the archive at `output_path`, which must lie under `outputs_root`.
    ///
    /// A partially written file is removed on failure. Returns the archive size.
    pub async fn build_to_path(
        &self,
        frames: &[Frame],
        output_path: &Path,
        outputs_root: &Path,
    ) -> Result<u64, PipelineError> {
        validate_within_root(output_path, outputs_root)?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                PipelineError::ArchiveBuildFailed(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let frames = frames.to_vec();
        let path: PathBuf = output_path.to_path_buf();
        let start = std::time::Instant::now();

        let size = tokio::task::spawn_blocking(move || {
            let result = File::create(&path)
                .map_err(|e| {
                    PipelineError::ArchiveBuildFailed(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    ))
                })
                .and_then(|file| write_archive(file, &frames))
                .and_then(|file| {
                    file.sync_all()
                        .and_then(|_| file.metadata())
                        .map(|meta| meta.len())
                        .map_err(|e| PipelineError::ArchiveBuildFailed(e.to_string()))
                });

            if result.is_err() {
                let _ = std::fs::remove_file(&path);
            }
            result
        })
        .await
        .map_err(|e| PipelineError::ArchiveBuildFailed(format!("Archive task failed: {}", e)))??;

        tracing::info!(
            path = %output_path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive written"
        );

        Ok(size)
    }
}

fn write_archive<W: Write + Seek>(writer: W, frames: &[Frame]) -> Result<W, PipelineError> {
    let mut zip = ZipWriter::new(writer);

    for frame in frames {
        let name = frame.file_name().ok_or_else(|| {
            PipelineError::ArchiveBuildFailed(format!(
                "Frame has no file name: {}",
                frame.path.display()
            ))
        })?;

        let mut file = File::open(&frame.path).map_err(|e| {
            PipelineError::ArchiveBuildFailed(format!("Failed to open {}: {}", name, e))
        })?;
        let meta = file.metadata().map_err(|e| {
            PipelineError::ArchiveBuildFailed(format!("Failed to stat {}: {}", name, e))
        })?;

        let mut options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);
        if let Some(modified) = meta.modified().ok().and_then(zip_timestamp) {
            options = options.last_modified_time(modified);
        }

        zip.start_file(name, options).map_err(|e| {
            PipelineError::ArchiveBuildFailed(format!("Failed to add {} to ZIP: {}", name, e))
        })?;
        std::io::copy(&mut file, &mut zip).map_err(|e| {
            PipelineError::ArchiveBuildFailed(format!("Failed to write {} to ZIP: {}", name, e))
        })?;
    }

    zip.finish().map_err(|e| {
        PipelineError::ArchiveBuildFailed(format!("Failed to finalize ZIP archive: {}", e))
    })
}

/// Zip timestamps cannot represent dates before 1980.
fn zip_timestamp(modified: std::time::SystemTime) -> Option<zip::DateTime> {
    let dt: DateTime<Utc> = modified.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(dt.year()).ok()?,
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
    )
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn write_frames(dir: &Path, count: u32) -> Vec<Frame> {
        (1..=count)
            .map(|i| {
                let path = dir.join(format!("frame_{:04}.png", i));
                std::fs::write(&path, format!("png-{}", i)).unwrap();
                Frame::new(path, i)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_build_in_memory_has_basename_entries_in_order() {
        let dir = tempdir().unwrap();
        let frames = write_frames(dir.path(), 3);

        let bytes = ArchiveBuilder::new().build(&frames).await.unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(archive.len(), 3);
        for i in 0..3 {
            let mut entry = archive.by_index(i).unwrap();
            assert_eq!(entry.name(), format!("frame_{:04}.png", i + 1));
            assert_eq!(entry.compression(), CompressionMethod::Deflated);
            let mut content = String::new();
            entry.read_to_string(&mut content).unwrap();
            assert_eq!(content, format!("png-{}", i + 1));
        }
    }

    #[tokio::test]
    async fn test_entry_count_matches_frame_count() {
        use rand::Rng;

        let mut rng = rand::rng();
        let counts: Vec<u32> = (0..10).map(|_| rng.random_range(1..=25)).collect();

        for count in counts {
            let dir = tempdir().unwrap();
            let frames = write_frames(dir.path(), count);
            let bytes = ArchiveBuilder::new().build(&frames).await.unwrap();
            let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

            assert_eq!(archive.len(), count as usize);
            assert!(archive.file_names().all(|name| !name.contains('/')));
        }
    }

    #[tokio::test]
    async fn test_build_to_path() {
        let work = tempdir().unwrap();
        let outputs = tempdir().unwrap();
        let frames = write_frames(work.path(), 5);
        let output = outputs.path().join("frames_test.zip");

        let size = ArchiveBuilder::new()
            .build_to_path(&frames, &output, outputs.path())
            .await
            .unwrap();

        assert!(size > 0);
        assert_eq!(std::fs::metadata(&output).unwrap().len(), size);
        let archive = zip::ZipArchive::new(File::open(&output).unwrap()).unwrap();
        assert_eq!(archive.len(), 5);
    }

    #[tokio::test]
    async fn test_build_to_path_outside_root_rejected() {
        let work = tempdir().unwrap();
        let outputs = tempdir().unwrap();
        let frames = write_frames(work.path(), 1);
        let escape = outputs.path().join("../frames_escape.zip");

        let err = ArchiveBuilder::new()
            .build_to_path(&frames, &escape, outputs.path())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::PathEscapesRoot(_)));
        assert!(!escape.exists());
    }

    #[tokio::test]
    async fn test_missing_frame_removes_partial_output() {
        let work = tempdir().unwrap();
        let outputs = tempdir().unwrap();
        let mut frames = write_frames(work.path(), 2);
        frames.push(Frame::new(work.path().join("frame_0003.png"), 3));
        let output = outputs.path().join("frames_partial.zip");

        let err = ArchiveBuilder::new()
            .build_to_path(&frames, &output, outputs.path())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ArchiveBuildFailed(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_zip_timestamp_before_1980_is_skipped() {
        let epoch = std::time::UNIX_EPOCH;
        assert!(zip_timestamp(epoch).is_none());
        assert!(zip_timestamp(std::time::SystemTime::now()).is_some());
    }
}
