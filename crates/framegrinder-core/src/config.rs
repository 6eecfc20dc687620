//! Configuration module
//!
//! Directory roots, the ffmpeg binary and the storage backend settings are loaded
//! once and injected into the storage factory and the orchestrator.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const UPLOADS_DIR: &str = "uploads";
const OUTPUTS_DIR: &str = "outputs";
const TEMP_DIR: &str = "temp";
const FFMPEG_PATH: &str = "ffmpeg";
const AWS_REGION: &str = "us-east-1";
const UPLOADS_BUCKET: &str = "framegrinder-uploads";
const OUTPUTS_BUCKET: &str = "framegrinder-outputs";
const DOWNLOAD_PATH_PREFIX: &str = "/api/v1/videos";
const PRESIGNED_TIMEOUT: Duration = Duration::from_secs(60 * 60);
/// S3 rejects presigned URLs valid for longer than seven days.
const MAX_PRESIGNED_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Object storage settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3Config {
    pub uploads_bucket: String,
    pub outputs_bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, LocalStack, ...).
    /// When set, the deployment is treated as local development.
    pub endpoint: Option<String>,
    /// Browser-reachable base URL replacing the endpoint host in presigned URLs.
    pub external_url: Option<String>,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            uploads_bucket: UPLOADS_BUCKET.to_string(),
            outputs_bucket: OUTPUTS_BUCKET.to_string(),
            region: AWS_REGION.to_string(),
            endpoint: None,
            external_url: None,
        }
    }
}

/// Application configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub uploads_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub ffmpeg_path: String,
    pub storage_backend: StorageBackend,
    pub s3: S3Config,
    pub presigned_timeout: Duration,
    pub download_path_prefix: String,
    pub environment: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from(UPLOADS_DIR),
            outputs_dir: PathBuf::from(OUTPUTS_DIR),
            temp_dir: PathBuf::from(TEMP_DIR),
            ffmpeg_path: FFMPEG_PATH.to_string(),
            storage_backend: StorageBackend::Local,
            s3: S3Config::default(),
            presigned_timeout: PRESIGNED_TIMEOUT,
            download_path_prefix: DOWNLOAD_PATH_PREFIX.to_string(),
            environment: "development".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) if !value.trim().is_empty() => value.parse()?,
            _ => StorageBackend::Local,
        };

        let presigned_timeout = match env::var("AWS_PRESIGNED_TIMEOUT") {
            Ok(value) => parse_duration(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Invalid AWS_PRESIGNED_TIMEOUT, using default 1h");
                PRESIGNED_TIMEOUT
            }),
            Err(_) => PRESIGNED_TIMEOUT,
        };

        let s3 = S3Config {
            uploads_bucket: env_or("S3_BUCKET_UPLOADS", UPLOADS_BUCKET),
            outputs_bucket: env_or("S3_BUCKET_OUTPUTS", OUTPUTS_BUCKET),
            region: non_empty_env("S3_REGION")
                .or_else(|| non_empty_env("AWS_REGION"))
                .unwrap_or_else(|| AWS_REGION.to_string()),
            endpoint: non_empty_env("S3_ENDPOINT").or_else(|| non_empty_env("AWS_ENDPOINT_URL")),
            external_url: non_empty_env("AWS_EXTERNAL_URL"),
        };

        let config = Config {
            uploads_dir: PathBuf::from(env_or("UPLOADS_DIR", UPLOADS_DIR)),
            outputs_dir: PathBuf::from(env_or("OUTPUTS_DIR", OUTPUTS_DIR)),
            temp_dir: PathBuf::from(env_or("TEMP_DIR", TEMP_DIR)),
            ffmpeg_path: env_or("FFMPEG_PATH", FFMPEG_PATH),
            storage_backend,
            s3,
            presigned_timeout,
            download_path_prefix: env_or("DOWNLOAD_PATH_PREFIX", DOWNLOAD_PATH_PREFIX),
            environment: non_empty_env("ENVIRONMENT")
                .or_else(|| non_empty_env("APP_ENV"))
                .unwrap_or_else(|| "development".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.ffmpeg_path.trim().is_empty() {
            return Err(anyhow::anyhow!("FFMPEG_PATH must not be empty"));
        }

        for (name, dir) in [
            ("UPLOADS_DIR", &self.uploads_dir),
            ("OUTPUTS_DIR", &self.outputs_dir),
            ("TEMP_DIR", &self.temp_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(anyhow::anyhow!("{} must not be empty", name));
            }
        }

        if self.presigned_timeout.is_zero() || self.presigned_timeout > MAX_PRESIGNED_TIMEOUT {
            return Err(anyhow::anyhow!(
                "AWS_PRESIGNED_TIMEOUT must be between 1s and 7 days"
            ));
        }

        if self.storage_backend == StorageBackend::S3 {
            if self.s3.outputs_bucket.trim().is_empty() || self.s3.uploads_bucket.trim().is_empty()
            {
                return Err(anyhow::anyhow!(
                    "S3_BUCKET_UPLOADS and S3_BUCKET_OUTPUTS must be set when using S3 storage backend"
                ));
            }
            if self.s3.region.trim().is_empty() {
                return Err(anyhow::anyhow!(
                    "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                ));
            }
            if let Some(endpoint) = &self.s3.endpoint {
                if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                    return Err(anyhow::anyhow!(
                        "S3_ENDPOINT must be an http:// or https:// URL"
                    ));
                }
                if self.is_production() && endpoint.starts_with("http://") {
                    return Err(anyhow::anyhow!(
                        "S3_ENDPOINT must use https in production"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Create the uploads, outputs and temp directories if they are missing.
    pub fn create_directories(&self) -> std::io::Result<()> {
        for dir in [&self.uploads_dir, &self.outputs_dir, &self.temp_dir] {
            std::fs::create_dir_all(dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o750))?;
            }
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, fallback: &str) -> String {
    non_empty_env(key).unwrap_or_else(|| fallback.to_string())
}

/// Parse durations such as `1h`, `30m`, `45s`, `250ms` or `1h30m`.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let mut total = Duration::ZERO;
    let mut rest = value;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let amount: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let part = match &rest[..unit_len] {
            "h" => Duration::from_secs(amount.checked_mul(3600)?),
            "m" => Duration::from_secs(amount.checked_mul(60)?),
            "s" => Duration::from_secs(amount),
            "ms" => Duration::from_millis(amount),
            _ => return None,
        };
        total = total.checked_add(part)?;
        rest = &rest[unit_len..];
    }

    Some(total)
}
