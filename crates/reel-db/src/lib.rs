//! Postgres access for the video render pipeline.
//!
//! This crate provides:
//! - Connection pool setup from `BLUEPRINT_DB_*` environment variables
//! - Reads over the `videos` and `video_scenes` tables
//! - Status transitions and completion updates for video rows

pub mod client;
pub mod error;

pub use client::{DbConfig, VideoStore};
pub use error::{DbError, DbResult};
