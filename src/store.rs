//! S3-compatible object storage client for archiving aged files.
//!
//! Archived files are stored with the following key structure:
//!   {host_id}/{base_file_name}
//!
//! Local directory components are stripped so one bucket can hold archives
//! from many groups, namespaced only by the host that produced them.

use chrono::Utc;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use s3::{Bucket, BucketConfiguration};
use std::env;
use std::path::{Path, PathBuf};

use crate::actions::DisposalFailure;
use crate::config::Config;

/// Storage failures, separated by kind so the run controller can map each
/// to a distinct exit status.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("bucket {bucket} is owned by another account")]
    OwnershipConflict { bucket: String },
    #[error("permission denied on bucket {bucket}: {reason}")]
    PermissionDenied { bucket: String, reason: String },
    #[error("creating bucket {bucket} failed: {reason}")]
    CreateFailed { bucket: String, reason: String },
    #[error("bucket {bucket} unavailable: {reason}")]
    BucketUnavailable { bucket: String, reason: String },
    #[error("storage error: {0}")]
    Unknown(String),
}

/// Object storage client: credentials plus region/endpoint resolution.
///
/// Bucket handles are built per call, mirroring how each action names its
/// own destination bucket in the configuration.
#[derive(Clone)]
pub struct StoreClient {
    credentials: Credentials,
    region: Region,
    use_path_style: bool,
}

/// Build the object key for an archived file: `{prefix}/{basename}`.
///
/// Returns `None` for paths without a usable file name.
pub fn object_key(prefix: &str, file: &Path) -> Option<String> {
    let name = file.file_name()?.to_str()?;
    Some(format!("{prefix}/{name}"))
}

impl StoreClient {
    /// Build a client from config credentials and environment overrides.
    ///
    /// `S3_REGION` defaults to us-east-1; `S3_ENDPOINT` selects a custom
    /// S3-compatible endpoint (MinIO etc.) and switches to path-style
    /// addressing, which those backends require.
    pub fn from_config(cfg: &Config) -> Result<Self, StoreError> {
        let region_name = env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let endpoint = env::var("S3_ENDPOINT").ok();
        let use_path_style = endpoint.is_some();

        let region = if let Some(endpoint) = endpoint {
            Region::Custom {
                region: region_name,
                endpoint,
            }
        } else {
            region_name.parse().unwrap_or(Region::UsEast1)
        };

        let credentials = Credentials::new(
            Some(cfg.access_key.as_str()),
            Some(cfg.secret_key.as_str()),
            None,
            None,
            None,
        )
        .map_err(|e| StoreError::Auth(e.to_string()))?;

        Ok(Self {
            credentials,
            region,
            use_path_style,
        })
    }

    fn bucket_handle(&self, name: &str) -> Result<Box<Bucket>, StoreError> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| StoreError::Unknown(e.to_string()))?;
        Ok(if self.use_path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }

    /// Verify the storage target is reachable and writable.
    ///
    /// Creates a probe bucket named after the host, writes and deletes a
    /// small test object, then removes the bucket. A probe bucket that
    /// already exists under these credentials counts as verified.
    pub async fn preflight(&self, host_id: &str) -> Result<(), StoreError> {
        let probe = self.bucket_handle(host_id)?;
        match probe.exists().await {
            Ok(true) => {
                tracing::warn!(bucket = host_id, "probe bucket already exists; treating storage as verified");
                return Ok(());
            }
            Ok(false) => {}
            Err(err) => return Err(classify(host_id, err)),
        }

        let config = BucketConfiguration::default();
        let created = if self.use_path_style {
            Bucket::create_with_path_style(
                host_id,
                self.region.clone(),
                self.credentials.clone(),
                config,
            )
            .await
        } else {
            Bucket::create(host_id, self.region.clone(), self.credentials.clone(), config).await
        };
        match created {
            Ok(resp) if resp.success() => {}
            Ok(resp) if resp.response_text.contains("BucketAlreadyOwnedByYou") => {
                tracing::warn!(bucket = host_id, "probe bucket already owned by this account; treating storage as verified");
                return Ok(());
            }
            Ok(resp) => return Err(classify_http(host_id, resp.response_code, &resp.response_text)),
            Err(err) => return Err(classify(host_id, err)),
        }

        let body = format!("Testing storage at {}", Utc::now().format("%Y%m%d-%H%M%S"));
        probe
            .put_object("logging/test", body.as_bytes())
            .await
            .map_err(|e| classify(host_id, e))?;
        probe
            .delete_object("logging/test")
            .await
            .map_err(|e| classify(host_id, e))?;
        probe.delete().await.map_err(|e| classify(host_id, e))?;
        tracing::info!(bucket = host_id, "storage pre-flight check passed");
        Ok(())
    }

    /// Upload each file into `bucket_name` under `{key_prefix}/{basename}`.
    ///
    /// Per-object failures are collected and the pass continues; a missing
    /// or forbidden bucket aborts the whole batch with
    /// [`StoreError::BucketUnavailable`].
    pub async fn archive(
        &self,
        bucket_name: &str,
        key_prefix: &str,
        files: &[PathBuf],
    ) -> Result<Vec<DisposalFailure>, StoreError> {
        if files.is_empty() {
            tracing::info!("nothing to upload");
            return Ok(Vec::new());
        }

        let bucket = self.bucket_handle(bucket_name)?;
        let mut failures = Vec::new();
        for file in files {
            let Some(key) = object_key(key_prefix, file) else {
                failures.push(DisposalFailure::new(
                    file,
                    Some(bucket_name),
                    anyhow::anyhow!("path has no usable file name"),
                ));
                continue;
            };
            let data = match tokio::fs::read(file).await {
                Ok(data) => data,
                Err(err) => {
                    failures.push(DisposalFailure::new(file, Some(bucket_name), err));
                    continue;
                }
            };
            match bucket.put_object(&key, &data).await {
                Ok(_) => {
                    tracing::info!(file = %file.display(), bucket = bucket_name, key = %key, "uploaded file");
                }
                Err(S3Error::HttpFailWithBody(code, body))
                    if code == 403 || code == 404 =>
                {
                    // The whole batch targets one bucket; an authorization
                    // or missing-bucket response will repeat for every key.
                    return Err(StoreError::BucketUnavailable {
                        bucket: bucket_name.to_string(),
                        reason: format!("HTTP {code}: {}", summarize(&body)),
                    });
                }
                Err(err) => {
                    failures.push(DisposalFailure::new(file, Some(bucket_name), err));
                }
            }
        }
        Ok(failures)
    }
}

fn classify(bucket: &str, err: S3Error) -> StoreError {
    match err {
        S3Error::HttpFailWithBody(code, body) => classify_http(bucket, code, &body),
        other => StoreError::Unknown(other.to_string()),
    }
}

/// Map an S3 error response to the failure kinds the exit codes need.
fn classify_http(bucket: &str, code: u16, body: &str) -> StoreError {
    if body.contains("InvalidAccessKeyId") || body.contains("SignatureDoesNotMatch") || code == 401
    {
        return StoreError::Auth(format!("HTTP {code}: {}", summarize(body)));
    }
    if body.contains("BucketAlreadyExists") {
        return StoreError::OwnershipConflict {
            bucket: bucket.to_string(),
        };
    }
    if code == 403 {
        return StoreError::PermissionDenied {
            bucket: bucket.to_string(),
            reason: summarize(body),
        };
    }
    if code == 409 || body.contains("TooManyBuckets") || body.contains("InvalidBucketName") {
        return StoreError::CreateFailed {
            bucket: bucket.to_string(),
            reason: summarize(body),
        };
    }
    StoreError::Unknown(format!("HTTP {code}: {}", summarize(body)))
}

/// First line of an error body, enough for the log without the XML noise.
fn summarize(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.lines().next() {
        Some(line) if line.len() < 200 => line.to_string(),
        _ => trimmed.chars().take(200).collect(),
    }
}
