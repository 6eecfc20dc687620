//! Frame extraction orchestration: validate → workspace → extract → archive → persist.

use bytes::Bytes;
use framegrinder_core::constants::{archive_name, FRAME_PATTERN};
use framegrinder_core::validation::{
    absolute_normalized, validate_job_timestamp, validate_no_shell_metacharacters,
    validate_no_traversal, validate_within_root,
};
use framegrinder_core::{Config, JobTimestamp, PipelineError, ProcessingResult};
use framegrinder_storage::{Storage, StorageBackend};
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::StreamReader;

use crate::archive::ArchiveBuilder;
use crate::request::ProcessingRequest;
use crate::validator::VideoValidator;
use crate::video::FrameExtractor;
use crate::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Validate,
    FetchSource,
    AcquireWorkspace,
    Extract,
    BuildArchive,
    Persist,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::FetchSource => "stage_source",
            Stage::AcquireWorkspace => "acquire_workspace",
            Stage::Extract => "extract",
            Stage::BuildArchive => "build_archive",
            Stage::Persist => "persist",
        }
    }
}

#[derive(Debug)]
struct Failure {
    stage: Stage,
    error: PipelineError,
}

impl Failure {
    fn at(stage: Stage) -> impl FnOnce(PipelineError) -> Failure {
        move |error| Failure { stage, error }
    }

    fn into_result(self) -> ProcessingResult {
        self.error.log(self.stage.as_str());
        ProcessingResult::failed(&self.error)
    }
}

/// Runs one job at a time per call; concurrent calls share nothing but the storage
/// handle and are kept apart by their job timestamps.
pub struct ProcessingOrchestrator {
    config: Config,
    storage: Arc<dyn Storage>,
    validator: VideoValidator,
    extractor: FrameExtractor,
    archiver: ArchiveBuilder,
}

impl ProcessingOrchestrator {
    /// `storage` receives finished archives. For the local backend it must be rooted
    /// at `config.outputs_dir`.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        let extractor = FrameExtractor::new(config.ffmpeg_path.clone());
        Self {
            config,
            storage,
            validator: VideoValidator::default(),
            extractor,
            archiver: ArchiveBuilder::new(),
        }
    }

    /// Run the pipeline on a video already on local disk.
    #[tracing::instrument(skip(self), fields(job = %timestamp))]
    pub async fn process_video(
        &self,
        video_path: &Path,
        timestamp: &JobTimestamp,
    ) -> ProcessingResult {
        match self.run(video_path, timestamp).await {
            Ok(result) => result,
            Err(failure) => failure.into_result(),
        }
    }

    /// Stage an inbound stream into the uploads directory and process it.
    ///
    /// Unsupported extensions are rejected before anything touches the disk. The
    /// staged copy is removed whatever the outcome.
    #[tracing::instrument(
        skip(self, request),
        fields(job = %request.job_timestamp, filename = %request.declared_filename)
    )]
    pub async fn process_upload(&self, request: ProcessingRequest) -> ProcessingResult {
        let ProcessingRequest {
            source,
            declared_filename,
            job_timestamp,
        } = request;

        let staged = match self.staging_path(&declared_filename, &job_timestamp) {
            Ok(path) => path,
            Err(failure) => return failure.into_result(),
        };

        if let Err(failure) = stage_stream(source, &staged, PipelineError::UploadFailed).await {
            remove_staged(&staged).await;
            return failure.into_result();
        }

        let result = self.process_video(&staged, &job_timestamp).await;
        remove_staged(&staged).await;
        result
    }

    /// Fetch `source_key` from `source`, process it, and delete the source object
    /// again if the archive could not be persisted.
    #[tracing::instrument(skip(self, source), fields(job = %timestamp))]
    pub async fn process_stored(
        &self,
        source: Arc<dyn Storage>,
        source_key: &str,
        timestamp: &JobTimestamp,
    ) -> ProcessingResult {
        let staged = match self.staging_path(source_key, timestamp) {
            Ok(path) => path,
            Err(failure) => return failure.into_result(),
        };

        let fetched = async {
            let stream = source
                .get(source_key)
                .await
                .map_err(|e| Failure::at(Stage::FetchSource)(e.into()))?;
            let reader: Pin<Box<dyn AsyncRead + Send + Unpin>> =
                Box::pin(StreamReader::new(stream.map_err(std::io::Error::other)));
            stage_stream(reader, &staged, PipelineError::DownloadFailed).await
        }
        .await;

        if let Err(failure) = fetched {
            remove_staged(&staged).await;
            return failure.into_result();
        }

        let outcome = self.run(&staged, timestamp).await;
        remove_staged(&staged).await;

        match outcome {
            Ok(result) => result,
            Err(failure) => {
                if failure.stage == Stage::Persist {
                    match source.delete(source_key).await {
                        Ok(()) => tracing::info!(
                            key = %source_key,
                            "Removed source object after persistence failure"
                        ),
                        Err(e) => tracing::error!(
                            key = %source_key,
                            error = %e,
                            "Failed to remove source object after persistence failure"
                        ),
                    }
                }
                failure.into_result()
            }
        }
    }

    /// `<uploads_dir>/<timestamp>_<basename>`, after extension and containment checks.
    fn staging_path(
        &self,
        filename: &str,
        timestamp: &JobTimestamp,
    ) -> Result<PathBuf, Failure> {
        let validate = Failure::at(Stage::Validate);

        if let Err(e) = self.validator.validate_extension(filename) {
            return Err(validate(e.into()));
        }
        if let Err(e) = validate_job_timestamp(timestamp.as_str()) {
            return Err(validate(e.into()));
        }
        let basename = match self.validator.sanitize_filename(filename) {
            Ok(name) => name,
            Err(e) => return Err(validate(e.into())),
        };

        let staged = self
            .config
            .uploads_dir
            .join(format!("{}_{}", timestamp, basename));
        if let Err(e) = validate_within_root(&staged, &self.config.uploads_dir) {
            return Err(validate(e.into()));
        }
        Ok(staged)
    }

    async fn run(
        &self,
        video_path: &Path,
        timestamp: &JobTimestamp,
    ) -> Result<ProcessingResult, Failure> {
        let start = std::time::Instant::now();

        validate_no_traversal(&video_path.to_string_lossy(), timestamp.as_str())
            .and_then(|_| validate_job_timestamp(timestamp.as_str()))
            .map_err(|e| Failure::at(Stage::Validate)(e.into()))?;
        self.validator
            .validate_extension(&video_path.to_string_lossy())
            .map_err(|e| Failure::at(Stage::Validate)(e.into()))?;
        self.validate_command_paths(video_path, timestamp)
            .map_err(Failure::at(Stage::Validate))?;

        let workspace = Workspace::acquire(&self.config.temp_dir, timestamp)
            .await
            .map_err(Failure::at(Stage::AcquireWorkspace))?;

        let outcome = self.extract_and_persist(video_path, &workspace, timestamp).await;
        workspace.release().await;

        if let Ok(result) = &outcome {
            tracing::info!(
                archive_key = ?result.archive_key,
                frame_count = result.frame_count,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Video processing complete"
            );
        }
        outcome
    }

    /// Shell-metacharacter check on the absolute ffmpeg input and output pattern,
    /// before any directory is created.
    fn validate_command_paths(
        &self,
        video_path: &Path,
        timestamp: &JobTimestamp,
    ) -> Result<(), PipelineError> {
        let pattern = self
            .config
            .temp_dir
            .join(timestamp.as_str())
            .join(FRAME_PATTERN);
        let (Some(input), Some(pattern)) =
            (absolute_normalized(video_path), absolute_normalized(&pattern))
        else {
            return Err(PipelineError::InvalidPathParameters(format!(
                "Cannot resolve paths for {}",
                video_path.display()
            )));
        };
        validate_no_shell_metacharacters([&input, &pattern])?;
        Ok(())
    }

    async fn extract_and_persist(
        &self,
        video_path: &Path,
        workspace: &Workspace,
        timestamp: &JobTimestamp,
    ) -> Result<ProcessingResult, Failure> {
        let frames = self
            .extractor
            .extract(video_path, workspace.path())
            .await
            .map_err(Failure::at(Stage::Extract))?;

        let frame_names: Vec<String> = frames
            .iter()
            .filter_map(|f| f.file_name().map(str::to_string))
            .collect();

        let archive_key = archive_name(timestamp.as_str());

        match self.storage.backend_type() {
            StorageBackend::Local => {
                let output_path = self.config.outputs_dir.join(&archive_key);
                self.archiver
                    .build_to_path(&frames, &output_path, &self.config.outputs_dir)
                    .await
                    .map_err(Failure::at(Stage::BuildArchive))?;
            }
            StorageBackend::S3 => {
                let data = self
                    .archiver
                    .build(&frames)
                    .await
                    .map_err(Failure::at(Stage::BuildArchive))?;
                self.storage
                    .put(&archive_key, Bytes::from(data), Some("application/zip"))
                    .await
                    .map_err(|e| Failure::at(Stage::Persist)(e.into()))?;
            }
        }

        let download_url = self
            .storage
            .presign(&archive_key, self.config.presigned_timeout)
            .await
            .map_err(|e| Failure::at(Stage::Persist)(e.into()))?;

        Ok(ProcessingResult::completed(
            archive_key,
            Some(download_url.into_string()),
            frame_names,
        ))
    }
}

/// Copy `source` to `staged`; errors are reported with `kind`.
async fn stage_stream(
    mut source: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    staged: &Path,
    kind: fn(String) -> PipelineError,
) -> Result<u64, Failure> {
    let failed = |message: String| Failure {
        stage: Stage::FetchSource,
        error: kind(message),
    };

    if let Some(parent) = staged.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| failed(format!("Failed to create {}: {}", parent.display(), e)))?;
    }

    let mut file = tokio::fs::File::create(staged)
        .await
        .map_err(|e| failed(format!("Failed to create {}: {}", staged.display(), e)))?;
    let written = tokio::io::copy(&mut source, &mut file)
        .await
        .map_err(|e| failed(format!("Failed to stage source: {}", e)))?;
    file.flush()
        .await
        .map_err(|e| failed(format!("Failed to stage source: {}", e)))?;

    tracing::debug!(path = %staged.display(), size_bytes = written, "Source staged");
    Ok(written)
}

async fn remove_staged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged upload")
        }
    }
}
