//! Framegrinder CLI: extract one frame per second from videos into zip archives.
//!
//! Configuration comes from the environment (or `.env`); see `Config::from_env`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use framegrinder_cli::init_tracing;
use framegrinder_core::{Config, JobTimestamp};
use framegrinder_processing::{ArchiveCatalog, ProcessingOrchestrator, ProcessingRequest};
use framegrinder_storage::{create_storage, create_upload_storage};
use futures::StreamExt;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "framegrinder", about = "Video frame extraction CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract frames from a local video file
    Process {
        /// Path to the video (mp4, avi, mov, mkv, wmv, flv, webm)
        file: PathBuf,
    },
    /// Extract frames from a video already in the uploads store
    ProcessStored {
        /// Key of the video in the uploads store
        key: String,
    },
    /// List finished archives
    List,
    /// Download an archive
    Download {
        /// Archive file name, e.g. frames_20240101_120000_abcd1234.zip
        name: String,
        /// Destination path (defaults to the archive name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete an archive
    Delete {
        /// Archive file name
        name: String,
    },
    /// Print the download location of an archive
    Url {
        /// Archive file name
        name: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .create_directories()
        .context("Failed to create uploads, outputs or temp directory")?;

    let storage = create_storage(&config)
        .await
        .context("Failed to initialize output storage")?;
    tracing::debug!(backend = %storage.backend_type(), "Output storage initialized");

    match cli.command {
        Commands::Process { file } => {
            let request = ProcessingRequest::from_file(&file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let orchestrator = ProcessingOrchestrator::new(config, storage);
            let result = orchestrator.process_upload(request).await;
            print_json(&result)?;
            if !result.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::ProcessStored { key } => {
            let uploads = create_upload_storage(&config)
                .await
                .context("Failed to initialize upload storage")?;
            let orchestrator = ProcessingOrchestrator::new(config, storage);
            let result = orchestrator
                .process_stored(uploads, &key, &JobTimestamp::now())
                .await;
            print_json(&result)?;
            if !result.success {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::List => {
            let catalog = ArchiveCatalog::new(storage, config.presigned_timeout);
            let archives = catalog.list_archives().await?;
            print_json(&serde_json::json!({ "count": archives.len(), "archives": archives }))?;
        }
        Commands::Download { name, out } => {
            let catalog = ArchiveCatalog::new(storage, config.presigned_timeout);
            let out = out.unwrap_or_else(|| PathBuf::from(&name));

            let mut stream = catalog.download_archive(&name).await?;
            let mut file = tokio::fs::File::create(&out)
                .await
                .with_context(|| format!("Failed to create {}", out.display()))?;
            let mut size = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.context("Failed to read archive")?;
                file.write_all(&chunk)
                    .await
                    .with_context(|| format!("Failed to write {}", out.display()))?;
                size += chunk.len() as u64;
            }
            file.flush().await?;

            print_json(&serde_json::json!({
                "filename": name,
                "path": out.display().to_string(),
                "size": size,
            }))?;
        }
        Commands::Delete { name } => {
            let catalog = ArchiveCatalog::new(storage, config.presigned_timeout);
            catalog.delete_archive(&name).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("Archive {} deleted", name) }),
            )?;
        }
        Commands::Url { name } => {
            let catalog = ArchiveCatalog::new(storage, config.presigned_timeout);
            let location = catalog.download_location(&name).await?;
            print_json(&location)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
