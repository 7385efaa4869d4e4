//! Asynq-compatible Redis task queue client.
//!
//! This crate provides:
//! - Process-scoped Redis connections, lazily created with capped backoff
//! - A liberal envelope codec (MessagePack or JSON in, JSON out)
//! - A blocking consumer loop filtered to render tasks
//! - A producer for completion events
//!
//! The wire protocol belongs to an external producer ecosystem and is
//! reproduced from observed traffic; see [`codec`] for the envelope contract
//! and [`task`] for the list key and type tags.

pub mod codec;
pub mod connection;
pub mod consumer;
pub mod error;
pub mod producer;
pub mod task;

pub use codec::{decode_envelope, encode_envelope, TaskEnvelope, TaskPayload, DEFAULT_QUEUE};
pub use connection::{QueueConfig, RedisConnections};
pub use consumer::listen_render_tasks;
pub use error::{QueueError, QueueResult};
pub use producer::{enqueue, enqueue_video_complete};
pub use task::{
    RenderVideoPayload, VideoCompletePayload, PENDING_LIST_KEY, TYPE_RENDER_VIDEO,
    TYPE_VIDEO_COMPLETE,
};
