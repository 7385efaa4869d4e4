//! Remote asset staging for renders.
//!
//! Scene images and the narration audio live behind URLs in the database.
//! FFmpeg wants local files, so everything is downloaded into a per-video
//! work directory before the render starts.

use std::path::{Path, PathBuf};

use reel_models::VideoScene;
use tracing::{debug, info};

use crate::error::{WorkerError, WorkerResult};

/// Local paths of everything a render needs.
#[derive(Debug, Clone)]
pub struct RenderAssets {
    /// Narration audio file
    pub audio_path: PathBuf,
    /// Scene images in playback order
    pub scene_images: Vec<PathBuf>,
}

/// Downloads render inputs over HTTP.
#[derive(Clone)]
pub struct AssetFetcher {
    client: reqwest::Client,
}

impl Default for AssetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetFetcher {
    /// Create a fetcher with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Download a single URL to a local file.
    pub async fn download(&self, url: &str, dest: impl AsRef<Path>) -> WorkerResult<()> {
        let dest = dest.as_ref();
        debug!("Downloading {} to {}", url, dest.display());

        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;

        Ok(())
    }

    /// Stage the audio track and every scene image under `job_dir`.
    ///
    /// Callers must have verified that every scene carries an image URL.
    pub async fn fetch_render_assets(
        &self,
        job_dir: &Path,
        audio_url: &str,
        scenes: &[VideoScene],
    ) -> WorkerResult<RenderAssets> {
        let audio_path = job_dir.join(format!("audio.{}", url_extension(audio_url, "mp3")));
        self.download(audio_url, &audio_path).await?;

        let mut scene_images = Vec::with_capacity(scenes.len());
        for (i, scene) in scenes.iter().enumerate() {
            let image_url = scene
                .image_url
                .as_deref()
                .ok_or_else(|| WorkerError::MissingSceneImages(scene.id.to_string()))?;

            let image_path = job_dir.join(format!("scene_{:03}.{}", i, url_extension(image_url, "jpg")));
            self.download(image_url, &image_path).await?;
            scene_images.push(image_path);
        }

        info!(
            "Staged {} scene images and audio under {}",
            scene_images.len(),
            job_dir.display()
        );

        Ok(RenderAssets {
            audio_path,
            scene_images,
        })
    }
}

/// File extension of a URL path, without the query string.
fn url_extension(url: &str, fallback: &str) -> String {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .rsplit('/')
        .next()
        .unwrap_or("");

    match path.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 4 => ext.to_ascii_lowercase(),
        _ => fallback.to_string(),
    }
}
