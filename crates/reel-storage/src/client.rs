//! S3 client implementation.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// AWS region
    pub region: String,
    /// Bucket rendered videos are uploaded to
    pub bucket_name: String,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            region: std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            bucket_name: std::env::var("S3_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("S3_BUCKET_NAME not set"))?,
        })
    }
}

/// S3 storage client for rendered videos.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    bucket: String,
    region: String,
}

impl StorageClient {
    /// Create a new client from configuration. Credentials come from the
    /// default AWS provider chain.
    pub async fn new(config: S3Config) -> StorageResult<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let client = Client::new(&sdk_config);

        Ok(Self {
            client,
            bucket: config.bucket_name,
            region: config.region,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config).await
    }

    /// Upload a rendered video file and return its public URL.
    pub async fn upload_video(
        &self,
        path: impl AsRef<Path>,
        video_id: i64,
    ) -> StorageResult<String> {
        let path = path.as_ref();
        let key = object_key(video_id);
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body)
            .content_type("video/mp4")
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let url = public_url(&self.bucket, &self.region, &key);
        info!("Uploaded {} to {}", path.display(), url);

        Ok(url)
    }

    /// Check connectivity to S3 by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::config_error(format!("S3 connectivity check failed: {}", e))
            })?;
        Ok(())
    }
}

/// Object key a rendered video is stored under.
pub fn object_key(video_id: i64) -> String {
    format!("videos/{}/rendered_video.mp4", video_id)
}

/// Public URL of an object in a bucket.
pub fn public_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key)
}
