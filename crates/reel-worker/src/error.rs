//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Video not found: {0}")]
    VideoNotFound(i64),

    #[error("Video has no audio url: {0}")]
    MissingAudio(i64),

    #[error("Video has no captions: {0}")]
    MissingCaptions(i64),

    #[error("Failed to parse captions: {0}")]
    InvalidCaptions(#[from] serde_json::Error),

    #[error("No scenes found for video: {0}")]
    NoScenes(i64),

    #[error("Scenes missing image urls: {0}")]
    MissingSceneImages(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Queue error: {0}")]
    Queue(#[from] reel_queue::QueueError),

    #[error("Database error: {0}")]
    Db(#[from] reel_db::DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] reel_storage::StorageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn render_failed(msg: impl Into<String>) -> Self {
        Self::RenderFailed(msg.into())
    }
}
