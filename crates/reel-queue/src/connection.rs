//! Redis connection management.
//!
//! Connection state is process-scoped and explicit: create on first use,
//! reuse until [`RedisConnections::close`], safe to recreate afterwards.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::QueueResult;

/// Queue transport configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_host: String,
    pub redis_port: u16,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_host: "localhost".to_string(),
            redis_port: 6379,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_host: std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string()),
            redis_port: std::env::var("REDIS_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6379),
        }
    }

    /// Connection URL for the redis client.
    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}", self.redis_host, self.redis_port)
    }
}

/// Reconnect delay for the given 1-based attempt: 50ms per attempt, capped at
/// two seconds.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis((u64::from(attempt) * 50).min(2000))
}

/// The two long-lived Redis connections this process holds: one for blocking
/// reads and queue writes, one reserved for pub/sub. Each is created lazily
/// on first access; accessors hand out cheap clones of the memoized handle.
pub struct RedisConnections {
    client: redis::Client,
    primary: Mutex<Option<MultiplexedConnection>>,
    subscriber: Mutex<Option<MultiplexedConnection>>,
}

impl RedisConnections {
    pub fn new(config: &QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url())?;
        Ok(Self {
            client,
            primary: Mutex::new(None),
            subscriber: Mutex::new(None),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(&QueueConfig::from_env())
    }

    /// Shared connection for queue commands, connecting on first call.
    pub async fn client(&self) -> QueueResult<MultiplexedConnection> {
        self.get_or_connect(&self.primary, "primary").await
    }

    /// Reserved pub/sub connection, connecting on first call.
    pub async fn subscriber(&self) -> QueueResult<MultiplexedConnection> {
        self.get_or_connect(&self.subscriber, "subscriber").await
    }

    /// Connect retries forever with a capped backoff; the queue has no useful
    /// degraded mode without Redis, so callers just wait.
    async fn get_or_connect(
        &self,
        slot: &Mutex<Option<MultiplexedConnection>>,
        name: &str,
    ) -> QueueResult<MultiplexedConnection> {
        let mut slot = slot.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let mut attempt = 0u32;
        loop {
            attempt = attempt.saturating_add(1);
            match self.client.get_multiplexed_async_connection().await {
                Ok(conn) => {
                    info!(connection = name, attempt, "Redis connected");
                    *slot = Some(conn.clone());
                    return Ok(conn);
                }
                Err(e) => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        connection = name,
                        attempt,
                        error = %e,
                        "Redis connection failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Drop the memoized primary handle so the next accessor call dials a
    /// fresh connection. Called after transport errors on a live handle.
    pub async fn invalidate(&self) {
        if self.primary.lock().await.take().is_some() {
            warn!("Redis primary connection invalidated");
        }
    }

    /// Release all held connections. No-op when none exist; accessors called
    /// afterwards create fresh handles.
    pub async fn close(&self) {
        let primary = self.primary.lock().await.take();
        let subscriber = self.subscriber.lock().await.take();
        if primary.is_some() || subscriber.is_some() {
            info!("Redis connections closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_grows_linearly() {
        assert_eq!(backoff_delay(1), Duration::from_millis(50));
        assert_eq!(backoff_delay(10), Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_delay_is_capped() {
        assert_eq!(backoff_delay(40), Duration::from_millis(2000));
        assert_eq!(backoff_delay(100), Duration::from_millis(2000));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_millis(2000));
    }

    #[test]
    fn test_redis_url_from_config() {
        let config = QueueConfig {
            redis_host: "queue.internal".to_string(),
            redis_port: 6380,
        };
        assert_eq!(config.redis_url(), "redis://queue.internal:6380");
    }

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.redis_url(), "redis://localhost:6379");
    }

    #[tokio::test]
    async fn test_close_without_connections_is_noop() {
        let connections = RedisConnections::new(&QueueConfig::default()).unwrap();
        connections.close().await;
        connections.close().await;
        connections.invalidate().await;
    }
}
