//! Video render worker binary.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_db::VideoStore;
use reel_queue::{listen_render_tasks, RedisConnections};
use reel_storage::StorageClient;
use reel_worker::{RenderWorker, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("reel_worker=info".parse().unwrap())
        .add_directive("reel_queue=info".parse().unwrap())
        .add_directive("reel_db=info".parse().unwrap())
        .add_directive("reel_storage=info".parse().unwrap())
        .add_directive("sqlx=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting reel-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Create queue connections
    let connections = match RedisConnections::from_env() {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to create Redis connections: {}", e);
            std::process::exit(1);
        }
    };

    // Connect to Postgres
    let store = match VideoStore::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to connect to Postgres: {}", e);
            std::process::exit(1);
        }
    };

    // Create storage client
    let storage = match StorageClient::from_env().await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create storage client: {}", e);
            std::process::exit(1);
        }
    };

    let worker = Arc::new(RenderWorker::new(
        config,
        Arc::clone(&connections),
        store.clone(),
        storage,
    ));

    // Setup signal handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    // Run the consumer loop
    let result = listen_render_tasks(&connections, shutdown_rx, move |payload| {
        let worker = Arc::clone(&worker);
        async move { worker.handle(payload).await }
    })
    .await;

    store.close().await;

    if let Err(e) = result {
        error!("Consumer error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
