//! FFmpeg render plan and runner.
//!
//! A render turns an ordered list of scene images plus a narration track
//! into a portrait H.264 video. Scenes share the duration evenly, images
//! are cover-cropped to the output frame, and captions are drawn word by
//! word over the composed video.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use reel_models::{captions_duration, Caption};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};

/// Output frame width.
pub const OUTPUT_WIDTH: u32 = 1080;
/// Output frame height.
pub const OUTPUT_HEIGHT: u32 = 1920;
/// Output frame rate.
pub const OUTPUT_FPS: u32 = 30;
/// Seconds per scene when there are no captions to derive a duration from.
pub const FALLBACK_SCENE_SECONDS: f64 = 5.0;
/// Caption font size at the output resolution.
const CAPTION_FONT_SIZE: u32 = 48;

/// Everything FFmpeg needs to produce one video.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    /// Scene images in playback order
    pub scene_images: Vec<PathBuf>,
    /// Narration audio file
    pub audio_path: PathBuf,
    /// Word-level captions
    pub captions: Vec<Caption>,
    /// Output file path
    pub output: PathBuf,
}

impl RenderPlan {
    /// Create a plan over staged assets.
    pub fn new(
        scene_images: Vec<PathBuf>,
        audio_path: PathBuf,
        captions: Vec<Caption>,
        output: PathBuf,
    ) -> Self {
        Self {
            scene_images,
            audio_path,
            captions,
            output,
        }
    }

    /// Total video duration in seconds.
    ///
    /// Derived from the last caption end, falling back to a fixed number of
    /// seconds per scene when no captions exist.
    pub fn duration(&self) -> f64 {
        captions_duration(&self.captions)
            .unwrap_or(self.scene_images.len() as f64 * FALLBACK_SCENE_SECONDS)
    }

    /// Build the full FFmpeg argument list.
    pub fn build_args(&self) -> Vec<String> {
        let scene_count = self.scene_images.len();
        let duration = self.duration();
        // max(1) keeps the division defined should a plan ever be built
        // without scenes; the handler rejects those before planning.
        let per_scene = duration / scene_count.max(1) as f64;

        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
        ];

        for image in &self.scene_images {
            args.push("-loop".to_string());
            args.push("1".to_string());
            args.push("-t".to_string());
            args.push(format!("{:.3}", per_scene));
            args.push("-i".to_string());
            args.push(image.to_string_lossy().to_string());
        }

        args.push("-i".to_string());
        args.push(self.audio_path.to_string_lossy().to_string());

        args.push("-filter_complex".to_string());
        args.push(build_render_filter(scene_count, &self.captions));

        args.extend(
            [
                "-map",
                "[vout]",
                "-map",
                &format!("{}:a", scene_count),
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-crf",
                "23",
                "-pix_fmt",
                "yuv420p",
                "-r",
                &OUTPUT_FPS.to_string(),
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-t",
                &format!("{:.3}", duration),
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Build the filter complex: cover-crop each scene, concatenate, then draw
/// captions over the composed video.
pub fn build_render_filter(scene_count: usize, captions: &[Caption]) -> String {
    let mut chains: Vec<String> = Vec::new();
    let mut concat_inputs = String::new();

    for i in 0..scene_count {
        chains.push(format!(
            "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=increase,\
             crop={w}:{h},setsar=1[s{i}]",
            i = i,
            w = OUTPUT_WIDTH,
            h = OUTPUT_HEIGHT,
        ));
        concat_inputs.push_str(&format!("[s{i}]"));
    }

    if captions.is_empty() {
        chains.push(format!(
            "{concat_inputs}concat=n={scene_count}:v=1:a=0[vout]"
        ));
    } else {
        let draws: Vec<String> = captions.iter().map(caption_drawtext).collect();
        chains.push(format!(
            "{concat_inputs}concat=n={scene_count}:v=1:a=0,{}[vout]",
            draws.join(",")
        ));
    }

    chains.join(";")
}

/// One drawtext filter showing a caption word for its time window.
fn caption_drawtext(caption: &Caption) -> String {
    format!(
        "drawtext=text='{text}':font=Arial:fontsize={size}:fontcolor=white:\
         box=1:boxcolor=black@0.7:boxborderw=20:\
         x=(w-text_w)/2:y=(h-text_h)/2:\
         enable='between(t,{start:.3},{end:.3})'",
        text = escape_drawtext(&caption.word),
        size = CAPTION_FONT_SIZE,
        start = caption.start_time,
        end = caption.end_time,
    )
}

// The filtergraph scanner and the option parser each strip one escape
// level. A quote cannot be escaped inside a quoted span, so the span is
// closed and reopened around a graph-level escaped quote.
fn escape_drawtext(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\'', r"'\\\''")
        .replace(':', "\\:")
        .replace(',', "\\,")
}

/// Output file path for a video id.
pub fn output_path(output_dir: &Path, video_id: i64) -> PathBuf {
    output_dir.join(format!("video_{}.mp4", video_id))
}

/// Runs FFmpeg render plans with an optional timeout.
pub struct RenderRunner {
    timeout: Option<Duration>,
}

impl Default for RenderRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Set a timeout for the whole render.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run a render plan to completion.
    pub async fn run(&self, plan: &RenderPlan) -> WorkerResult<()> {
        which::which("ffmpeg").map_err(|_| WorkerError::FfmpegNotFound)?;

        let args = plan.build_args();
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, wait).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(
                        "FFmpeg timed out after {} seconds, killing process",
                        timeout.as_secs()
                    );
                    return Err(WorkerError::render_failed(format!(
                        "FFmpeg timed out after {} seconds",
                        timeout.as_secs()
                    )));
                }
            },
            None => wait.await?,
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(WorkerError::render_failed(format!(
                "FFmpeg exited with status {:?}: {}",
                output.status.code(),
                stderr.trim()
            )))
        }
    }
}
