use crate::keys::{content_type_for_key, validate_key};
use crate::traits::{ByteStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use framegrinder_core::{DownloadLocation, StorageObject};
use futures::StreamExt;
use std::pin::Pin;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;
use url::Url;

/// Part size for multipart uploads; S3's minimum for every part but the last.
const PART_SIZE: usize = 5 * 1024 * 1024;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    external_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:4566" for LocalStack, "http://localhost:9000" for MinIO)
    /// * `external_url` - Optional browser-reachable base URL substituted into presigned URLs
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        external_url: Option<String>,
    ) -> StorageResult<Self> {
        let region_provider =
            RegionProviderChain::first_try(aws_config::Region::new(region.clone()));

        let retry_config = RetryConfig::standard()
            .with_max_attempts(5)
            .with_retry_mode(RetryMode::Adaptive);

        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config.clone())
            .load()
            .await;

        let client = if let Some(ref endpoint) = endpoint_url {
            let mut s3_config_builder = aws_sdk_s3::Config::builder()
                .endpoint_url(endpoint)
                .region(config.region().cloned())
                .retry_config(retry_config);
            if let Some(provider) = config.credentials_provider().into_iter().next() {
                s3_config_builder = s3_config_builder.credentials_provider(provider);
            }
            // Path-style addressing is required by LocalStack and MinIO
            s3_config_builder = s3_config_builder.force_path_style(true);

            Client::from_conf(s3_config_builder.build())
        } else {
            Client::new(&config)
        };

        tracing::info!(
            bucket = %bucket,
            region = %region,
            endpoint = ?endpoint_url,
            "S3 storage initialized"
        );

        Ok(S3Storage {
            client,
            bucket,
            endpoint_url,
            external_url,
        })
    }

    fn is_local_endpoint(&self) -> bool {
        self.endpoint_url.is_some()
    }

    /// Upload `first_part` and the rest of `reader` as parts of `upload_id`, then
    /// complete the upload. Returns the total size.
    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        reader: &mut Pin<Box<dyn AsyncRead + Send + Unpin>>,
        mut buffer: Vec<u8>,
        first_part: usize,
    ) -> StorageResult<u64> {
        let mut parts = Vec::new();
        let mut part_number = 1i32;
        let mut filled = first_part;
        let mut total_size = 0u64;

        while filled > 0 {
            let body = aws_sdk_s3::primitives::ByteStream::from(buffer[..filled].to_vec());
            let uploaded = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(body)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        part_number = part_number,
                        "Failed to upload part"
                    );
                    StorageError::UploadFailed(e.to_string())
                })?;

            let etag = uploaded.e_tag().ok_or_else(|| {
                StorageError::UploadFailed(format!("No ETag returned for part {}", part_number))
            })?;
            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(etag)
                    .build(),
            );
            total_size += filled as u64;
            part_number += 1;

            if filled < PART_SIZE {
                break;
            }
            filled = fill_part(reader, &mut buffer).await?;
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "Failed to complete multipart upload"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        Ok(total_size)
    }
}

/// Read from `reader` until `buffer` is full or the stream ends.
async fn fill_part<R>(reader: &mut R, buffer: &mut [u8]) -> StorageResult<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buffer.len() {
        let read = reader.read(&mut buffer[filled..]).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read upload stream: {}", e))
        })?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

/// Replace scheme, host and port of a presigned URL with those of `external`.
///
/// The path and signed query string are kept untouched.
pub fn rewrite_to_external(raw: &str, external: &str) -> StorageResult<String> {
    let mut url =
        Url::parse(raw).map_err(|e| StorageError::InvalidUrl(format!("{}: {}", raw, e)))?;
    let external = Url::parse(external)
        .map_err(|e| StorageError::InvalidUrl(format!("AWS_EXTERNAL_URL {}: {}", external, e)))?;

    let host = external
        .host_str()
        .ok_or_else(|| StorageError::InvalidUrl("AWS_EXTERNAL_URL has no host".to_string()))?;

    url.set_scheme(external.scheme())
        .map_err(|_| StorageError::InvalidUrl(format!("Cannot set scheme on {}", raw)))?;
    url.set_host(Some(host))
        .map_err(|e| StorageError::InvalidUrl(e.to_string()))?;
    url.set_port(external.port())
        .map_err(|_| StorageError::InvalidUrl(format!("Cannot set port on {}", raw)))?;

    Ok(url.to_string())
}

/// Accept only absolute https URLs with a host. `allow_http` relaxes the scheme
/// rule for local S3 emulators.
pub fn validate_presigned_url(raw: &str, allow_http: bool) -> StorageResult<String> {
    let url =
        Url::parse(raw).map_err(|e| StorageError::InvalidUrl(format!("{}: {}", raw, e)))?;

    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        other => {
            return Err(StorageError::InvalidUrl(format!(
                "Presigned URL uses disallowed scheme {}",
                other
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(StorageError::InvalidUrl(
            "Presigned URL has no host".to_string(),
        ));
    }

    Ok(url.to_string())
}

fn to_chrono(value: Option<&aws_sdk_s3::primitives::DateTime>) -> DateTime<Utc> {
    value
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()))
        .unwrap_or_else(Utc::now)
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> StorageResult<()> {
        validate_key(key)?;
        let size = data.len();
        let content_type = content_type.unwrap_or_else(|| content_type_for_key(key));

        let start = std::time::Instant::now();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 put failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            content_type = %content_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn put_stream(
        &self,
        key: &str,
        content_type: Option<&str>,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
    ) -> StorageResult<u64> {
        validate_key(key)?;
        let content_type = content_type.unwrap_or_else(|| content_type_for_key(key));

        let mut buffer = vec![0u8; PART_SIZE];
        let first_part = fill_part(&mut reader, &mut buffer).await?;
        if first_part < PART_SIZE {
            buffer.truncate(first_part);
            self.put(key, Bytes::from(buffer), Some(content_type)).await?;
            return Ok(first_part as u64);
        }

        let start = std::time::Instant::now();
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "Failed to create multipart upload"
                );
                StorageError::UploadFailed(e.to_string())
            })?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::UploadFailed("No upload ID returned from S3".to_string()))?
            .to_string();

        match self
            .upload_parts(key, &upload_id, &mut reader, buffer, first_part)
            .await
        {
            Ok(size) => {
                tracing::info!(
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 multipart upload successful"
                );
                Ok(size)
            }
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        error = %abort_err,
                        key = %key,
                        "Failed to abort multipart upload"
                    );
                }
                Err(e)
            }
        }
    }

    async fn get(&self, key: &str) -> StorageResult<ByteStream> {
        validate_key(key)?;
        let start = std::time::Instant::now();

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    GetObjectError::NoSuchKey(_) => StorageError::NotFound(key.to_string()),
                    _ => StorageError::DownloadFailed(e.to_string()),
                },
                _ => StorageError::DownloadFailed(e.to_string()),
            })?;

        let async_read = response.body.into_async_read();
        let bucket = self.bucket.clone();
        let key = key.to_string();
        let stream = ReaderStream::new(async_read).map(move |result| {
            result.map_err(|e| {
                tracing::error!(
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 stream download error"
                );
                StorageError::DownloadFailed(e.to_string())
            })
        });

        Ok(Box::pin(stream))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let start = std::time::Instant::now();

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                StorageError::DeleteFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| StorageError::BackendError(e.to_string()))?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    HeadObjectError::NotFound(_) => Ok(false),
                    _ => Err(StorageError::BackendError(e.to_string())),
                },
                _ => Err(StorageError::BackendError(e.to_string())),
            },
        }
    }

    async fn stat(&self, key: &str) -> StorageResult<StorageObject> {
        validate_key(key)?;
        let response = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ServiceError(service_err) => match service_err.err() {
                    HeadObjectError::NotFound(_) => StorageError::NotFound(key.to_string()),
                    _ => StorageError::BackendError(e.to_string()),
                },
                _ => StorageError::BackendError(e.to_string()),
            })?;

        Ok(StorageObject {
            bucket_or_root: self.bucket.clone(),
            key: key.to_string(),
            size: response.content_length().unwrap_or(0).max(0) as u64,
            last_modified: to_chrono(response.last_modified()),
        })
    }

    async fn presign(&self, key: &str, expires_in: Duration) -> StorageResult<DownloadLocation> {
        validate_key(key)?;

        let presigning_config = PresigningConfig::builder()
            .expires_in(expires_in)
            .build()
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let raw = match &self.external_url {
            Some(external) => rewrite_to_external(presigned_request.uri(), external)?,
            None => presigned_request.uri().to_string(),
        };

        let url = validate_presigned_url(&raw, self.is_local_endpoint())?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %key,
            expires_in_secs = expires_in.as_secs(),
            "Generated presigned URL"
        );

        Ok(DownloadLocation::Url(url))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
