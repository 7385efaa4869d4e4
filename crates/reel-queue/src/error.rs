//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    /// Neither envelope format parsed the item.
    #[error("Envelope decode failed: {0}")]
    Decode(String),

    /// The item parsed, but required fields are missing or the payload does
    /// not match the expected job shape.
    #[error("Envelope shape invalid: {0}")]
    Shape(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Transport errors are retried by the consumer loop; any other error on
    /// the dequeue path means the popped item is dropped.
    pub fn is_transport(&self) -> bool {
        matches!(self, QueueError::Redis(_))
    }
}
