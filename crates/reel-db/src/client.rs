//! Postgres client for the video pipeline tables.

use reel_models::{VideoRecord, VideoScene, VideoStatus};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

/// Configuration for the Postgres connection.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database host
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database name
    pub database: String,
    /// Role to connect as
    pub username: String,
    /// Password for the role
    pub password: String,
    /// Maximum pool size
    pub max_connections: u32,
}

impl DbConfig {
    /// Create config from environment variables.
    pub fn from_env() -> DbResult<Self> {
        Ok(Self {
            host: std::env::var("BLUEPRINT_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("BLUEPRINT_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            database: std::env::var("BLUEPRINT_DB_DATABASE")
                .map_err(|_| DbError::config("BLUEPRINT_DB_DATABASE not set"))?,
            username: std::env::var("BLUEPRINT_DB_USERNAME")
                .map_err(|_| DbError::config("BLUEPRINT_DB_USERNAME not set"))?,
            password: std::env::var("BLUEPRINT_DB_PASSWORD").unwrap_or_default(),
            max_connections: std::env::var("BLUEPRINT_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        })
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
    }
}

/// Store over the `videos` and `video_scenes` tables.
#[derive(Clone)]
pub struct VideoStore {
    pool: PgPool,
}

impl VideoStore {
    /// Connect a new pool from configuration.
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        debug!(
            "Connecting to Postgres at {}:{}/{}",
            config.host, config.port, config.database
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options())
            .await?;

        info!("Connected to Postgres at {}:{}", config.host, config.port);

        Ok(Self { pool })
    }

    /// Connect from environment variables.
    pub async fn from_env() -> DbResult<Self> {
        let config = DbConfig::from_env()?;
        Self::connect(&config).await
    }

    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a video row by id. Returns `None` when the row does not exist.
    pub async fn fetch_video(&self, video_id: i64) -> DbResult<Option<VideoRecord>> {
        debug!("Fetching video {}", video_id);

        let row = sqlx::query(
            "SELECT id, user_id, audio_url, captions, video_url, status \
             FROM videos WHERE id = $1",
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(video_from_row).transpose()
    }

    /// Fetch the scenes of a video in playback order.
    pub async fn fetch_scenes(&self, video_id: i64) -> DbResult<Vec<VideoScene>> {
        debug!("Fetching scenes for video {}", video_id);

        let rows = sqlx::query(
            "SELECT id, video_id, image_url, index, prompt, status \
             FROM video_scenes WHERE video_id = $1 ORDER BY index ASC",
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(scene_from_row).collect()
    }

    /// Set the status of a video. Returns `false` when no row matched.
    pub async fn update_status(&self, video_id: i64, status: VideoStatus) -> DbResult<bool> {
        debug!("Updating video {} status to {}", video_id, status);

        let result = sqlx::query("UPDATE videos SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(video_id)
            .execute(&self.pool)
            .await?;

        let updated = result.rows_affected() > 0;
        if !updated {
            warn!("Video {} not found while updating status", video_id);
        }

        Ok(updated)
    }

    /// Record the rendered video URL and mark the video completed in a
    /// single statement.
    pub async fn update_video_url(&self, video_id: i64, video_url: &str) -> DbResult<bool> {
        debug!("Updating video {} url", video_id);

        let result = sqlx::query(
            "UPDATE videos SET video_url = $1, status = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(video_url)
        .bind(VideoStatus::Completed.as_str())
        .bind(video_id)
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected() > 0;
        if updated {
            info!("Video {} completed with url {}", video_id, video_url);
        } else {
            warn!("Video {} not found while recording url", video_id);
        }

        Ok(updated)
    }

    /// Check connectivity by running a trivial query.
    pub async fn check_connectivity(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn video_from_row(row: PgRow) -> DbResult<VideoRecord> {
    Ok(VideoRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        audio_url: row.try_get("audio_url")?,
        captions: row.try_get("captions")?,
        video_url: row.try_get("video_url")?,
        status: row.try_get("status")?,
    })
}

fn scene_from_row(row: PgRow) -> DbResult<VideoScene> {
    Ok(VideoScene {
        id: row.try_get("id")?,
        video_id: row.try_get("video_id")?,
        image_url: row.try_get("image_url")?,
        index: row.try_get("index")?,
        prompt: row.try_get("prompt")?,
        status: row.try_get("status")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_options_from_config() {
        let config = DbConfig {
            host: "db.internal".to_string(),
            port: 5433,
            database: "blueprint".to_string(),
            username: "render".to_string(),
            password: "secret".to_string(),
            max_connections: 5,
        };

        let options = config.connect_options();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_database(), Some("blueprint"));
        assert_eq!(options.get_username(), "render");
    }
}
