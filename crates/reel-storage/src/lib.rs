//! S3 upload of rendered videos.
//!
//! This crate provides:
//! - Client setup from `AWS_REGION` and `S3_BUCKET_NAME`
//! - Upload of finished renders under `videos/{id}/rendered_video.mp4`
//! - Public URL construction for uploaded objects

pub mod client;
pub mod error;

pub use client::{object_key, public_url, S3Config, StorageClient};
pub use error::{StorageError, StorageResult};
