//! Render task handling.
//!
//! One task means one video: mark it rendering, load its rows, stage its
//! assets, render, upload, record the URL, and announce completion on the
//! queue. Any failure flips the video to `failed` and the task is done
//! with, matching the queue's at-most-once delivery.

use std::sync::Arc;

use reel_db::VideoStore;
use reel_models::{Caption, VideoStatus};
use reel_queue::{
    enqueue_video_complete, RedisConnections, RenderVideoPayload, VideoCompletePayload,
};
use reel_storage::StorageClient;
use tracing::{error, info, warn};

use crate::assets::AssetFetcher;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::renderer::{output_path, RenderPlan, RenderRunner};

/// Handles `video:render` tasks end to end.
pub struct RenderWorker {
    config: WorkerConfig,
    connections: Arc<RedisConnections>,
    store: VideoStore,
    storage: StorageClient,
    fetcher: AssetFetcher,
}

impl RenderWorker {
    /// Create a worker over already-connected collaborators.
    pub fn new(
        config: WorkerConfig,
        connections: Arc<RedisConnections>,
        store: VideoStore,
        storage: StorageClient,
    ) -> Self {
        Self {
            config,
            connections,
            store,
            storage,
            fetcher: AssetFetcher::new(),
        }
    }

    /// Process one render task. Errors are terminal for the video, never
    /// for the worker.
    pub async fn handle(&self, payload: RenderVideoPayload) {
        let video_id = payload.video_id;
        info!("Processing render_video task for video {}", video_id);

        match self.render_video(video_id).await {
            Ok(video_url) => {
                info!("Completed render for video {}: {}", video_id, video_url);
            }
            Err(e) => {
                error!("Render task for video {} failed: {}", video_id, e);
                if let Err(update_err) = self.store.update_status(video_id, VideoStatus::Failed).await
                {
                    error!(
                        "Failed to mark video {} as failed: {}",
                        video_id, update_err
                    );
                }
            }
        }
    }

    async fn render_video(&self, video_id: i64) -> WorkerResult<String> {
        self.store
            .update_status(video_id, VideoStatus::Rendering)
            .await?;

        let video = self
            .store
            .fetch_video(video_id)
            .await?
            .ok_or(WorkerError::VideoNotFound(video_id))?;

        let audio_url = video
            .audio_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(WorkerError::MissingAudio(video_id))?;

        let captions_value = video
            .captions
            .as_ref()
            .ok_or(WorkerError::MissingCaptions(video_id))?;
        let captions: Vec<Caption> = Caption::parse_list(captions_value)?;

        let scenes = self.store.fetch_scenes(video_id).await?;
        if scenes.is_empty() {
            return Err(WorkerError::NoScenes(video_id));
        }

        let missing: Vec<String> = scenes
            .iter()
            .filter(|s| s.image_url.as_deref().map_or(true, str::is_empty))
            .map(|s| s.id.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(WorkerError::MissingSceneImages(missing.join(", ")));
        }

        info!(
            "Video data fetched: {} scenes, {} captions",
            scenes.len(),
            captions.len()
        );

        let job_dir = self.config.work_dir.join(format!("video_{}", video_id));
        let assets = self
            .fetcher
            .fetch_render_assets(&job_dir, audio_url, &scenes)
            .await?;

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let output = output_path(&self.config.output_dir, video_id);

        let plan = RenderPlan::new(
            assets.scene_images,
            assets.audio_path,
            captions,
            output.clone(),
        );
        RenderRunner::new()
            .with_timeout(self.config.render_timeout)
            .run(&plan)
            .await?;
        info!("Video rendered successfully: {}", output.display());

        let video_url = self.storage.upload_video(&output, video_id).await?;

        self.store.update_video_url(video_id, &video_url).await?;

        enqueue_video_complete(
            &self.connections,
            &VideoCompletePayload {
                video_id,
                video_url: video_url.clone(),
            },
        )
        .await?;

        if let Err(e) = tokio::fs::remove_dir_all(&job_dir).await {
            warn!("Failed to clean work dir {}: {}", job_dir.display(), e);
        }

        Ok(video_url)
    }
}
