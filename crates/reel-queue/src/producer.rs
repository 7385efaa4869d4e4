//! Outbound task production.

use redis::AsyncCommands;
use serde::Serialize;
use tracing::info;

use crate::codec::encode_envelope;
use crate::connection::RedisConnections;
use crate::error::QueueResult;
use crate::task::{VideoCompletePayload, PENDING_LIST_KEY, TYPE_VIDEO_COMPLETE};

/// Append a completion event to the pending list for downstream consumers.
pub async fn enqueue_video_complete(
    connections: &RedisConnections,
    payload: &VideoCompletePayload,
) -> QueueResult<()> {
    enqueue(connections, TYPE_VIDEO_COMPLETE, payload).await?;
    info!(video_id = payload.video_id, "Enqueued completion event");
    Ok(())
}

/// Build an envelope for `task_type` and append it to the tail of the same
/// pending list the consumer loop reads from the head of.
///
/// Encode failures surface to the caller before any network traffic.
pub async fn enqueue<T: Serialize>(
    connections: &RedisConnections,
    task_type: &str,
    payload: &T,
) -> QueueResult<()> {
    let encoded = encode_envelope(task_type, payload)?;
    let mut conn = connections.client().await?;
    let _len: i64 = conn.rpush(PENDING_LIST_KEY, encoded).await?;
    Ok(())
}
