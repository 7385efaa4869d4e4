//! Task type tags and payload shapes shared with the producing services.

use serde::{Deserialize, Serialize};

/// Redis list holding not-yet-consumed envelopes. The producing API service
/// appends render requests here; this worker appends completion events to the
/// same list.
pub const PENDING_LIST_KEY: &str = "asynq:queues:default:pending";

/// Type tag for render requests consumed by this worker.
pub const TYPE_RENDER_VIDEO: &str = "video:render";

/// Type tag for completion events emitted by this worker.
pub const TYPE_VIDEO_COMPLETE: &str = "video:complete";

/// Payload of a [`TYPE_RENDER_VIDEO`] task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderVideoPayload {
    pub video_id: i64,
}

/// Payload of a [`TYPE_VIDEO_COMPLETE`] task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCompletePayload {
    pub video_id: i64,
    pub video_url: String,
}
