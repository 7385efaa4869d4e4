//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory rendered videos are written to
    pub output_dir: PathBuf,
    /// Work directory for downloaded assets
    pub work_dir: PathBuf,
    /// Render timeout
    pub render_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            work_dir: PathBuf::from("/tmp/reelforge"),
            render_timeout: Duration::from_secs(1800),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./output")),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/reelforge")),
            render_timeout: Duration::from_secs(
                std::env::var("WORKER_RENDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
        }
    }
}
