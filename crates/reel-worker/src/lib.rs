//! Video render worker.
//!
//! This crate provides:
//! - The render task handler tying queue, database, renderer, and storage
//!   together
//! - Asset staging for scene images and narration audio
//! - FFmpeg plan building and execution for portrait video renders

pub mod assets;
pub mod config;
pub mod error;
pub mod handler;
pub mod renderer;

pub use assets::{AssetFetcher, RenderAssets};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use handler::RenderWorker;
