//! Shared data models for the ReelForge render pipeline.
//!
//! This crate provides:
//! - Word-level caption types with liberal parsing
//! - Video and scene row models mirroring the API service's schema
//! - Video status lifecycle

pub mod caption;
pub mod video;

pub use caption::{captions_duration, Caption};
pub use video::{VideoRecord, VideoScene, VideoStatus};
