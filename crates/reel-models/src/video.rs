//! Video and scene row models.
//!
//! Field sets mirror the columns this worker reads from the API service's
//! `videos` and `video_scenes` tables; the worker flips statuses and writes
//! the final video URL.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Video lifecycle status.
///
/// The API side owns the `pending` → `generating_*` transitions; this worker
/// only ever writes `rendering`, `completed` and `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Pending,
    GeneratingScript,
    GeneratingAudio,
    GeneratingScenes,
    GeneratingImages,
    Rendering,
    Processing,
    Completed,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::GeneratingScript => "generating_script",
            VideoStatus::GeneratingAudio => "generating_audio",
            VideoStatus::GeneratingScenes => "generating_scenes",
            VideoStatus::GeneratingImages => "generating_images",
            VideoStatus::Rendering => "rendering",
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row from the `videos` table, limited to the columns this worker touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: i64,
    pub user_id: i64,

    /// URL of the generated narration audio.
    pub audio_url: Option<String>,

    /// Caption payload as stored (see [`crate::Caption::parse_list`]).
    pub captions: Option<serde_json::Value>,

    /// Final rendered video URL, set by this worker on completion.
    pub video_url: Option<String>,

    pub status: String,
}

/// A row from the `video_scenes` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoScene {
    pub id: i64,
    pub video_id: i64,

    /// Generated scene image URL; a scene without one cannot be rendered.
    pub image_url: Option<String>,

    /// Zero-based position within the video.
    pub index: i64,

    pub prompt: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        let json = serde_json::to_string(&VideoStatus::GeneratingImages).unwrap();
        assert_eq!(json, "\"generating_images\"");

        let back: VideoStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VideoStatus::GeneratingImages);
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(VideoStatus::Rendering.as_str(), "rendering");
        assert_eq!(VideoStatus::Completed.to_string(), "completed");
        assert_eq!(VideoStatus::Failed.as_str(), "failed");
    }
}
