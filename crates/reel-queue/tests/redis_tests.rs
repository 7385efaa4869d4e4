//! Redis integration tests for the queue client.
//!
//! These run against a live Redis instance (REDIS_HOST/REDIS_PORT) and
//! exercise the wire contract end to end.

use std::sync::Arc;
use std::time::Duration;

use redis::AsyncCommands;
use tokio::sync::{watch, Mutex};

use reel_queue::{
    decode_envelope, enqueue_video_complete, listen_render_tasks, QueueConfig, RedisConnections,
    RenderVideoPayload, VideoCompletePayload, PENDING_LIST_KEY, TYPE_VIDEO_COMPLETE,
};

async fn client_id(conn: &mut redis::aio::MultiplexedConnection) -> i64 {
    redis::cmd("CLIENT")
        .arg("ID")
        .query_async(conn)
        .await
        .expect("CLIENT ID")
}

async fn clear_pending_list(connections: &RedisConnections) {
    let mut conn = connections.client().await.expect("connect");
    let _: i64 = conn.del(PENDING_LIST_KEY).await.expect("DEL");
}

/// Connection accessor is idempotent: two calls share one underlying
/// connection, and close() followed by an accessor call dials a fresh one.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_idempotent_connection_creation() {
    dotenvy::dotenv().ok();

    let connections = RedisConnections::new(&QueueConfig::from_env()).expect("client");

    let mut first = connections.client().await.expect("connect");
    let mut second = connections.client().await.expect("connect");
    assert_eq!(client_id(&mut first).await, client_id(&mut second).await);

    let before_close = client_id(&mut first).await;
    connections.close().await;

    let mut fresh = connections.client().await.expect("reconnect");
    assert_ne!(before_close, client_id(&mut fresh).await);
}

/// The reserved subscriber connection is distinct from the primary.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_subscriber_is_separate_connection() {
    dotenvy::dotenv().ok();

    let connections = RedisConnections::new(&QueueConfig::from_env()).expect("client");

    let mut primary = connections.client().await.expect("connect");
    let mut subscriber = connections.subscriber().await.expect("connect");
    assert_ne!(
        client_id(&mut primary).await,
        client_id(&mut subscriber).await
    );

    connections.close().await;
}

/// End-to-end: a textual render envelope pushed by an external producer is
/// popped, dispatched exactly once with the right payload, and the completion
/// event this worker enqueues decodes back through the same codec.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_end_to_end_render_round_trip() {
    dotenvy::dotenv().ok();

    let connections = RedisConnections::new(&QueueConfig::from_env()).expect("client");
    clear_pending_list(&connections).await;

    // What the external producer writes, verbatim.
    let produced = br#"{"Type":"video:render","Payload":"{\"video_id\":7}","Timeout":0,"Retry":0,"Queue":"default"}"#;
    {
        let mut conn = connections.client().await.expect("connect");
        let _: i64 = conn
            .rpush(PENDING_LIST_KEY, produced.as_slice())
            .await
            .expect("RPUSH");
    }

    let (tx, rx) = watch::channel(false);
    let tx = Arc::new(tx);
    let seen: Arc<Mutex<Vec<RenderVideoPayload>>> = Arc::new(Mutex::new(Vec::new()));

    let handler_seen = seen.clone();
    let handler = move |payload: RenderVideoPayload| {
        let seen = handler_seen.clone();
        let tx = tx.clone();
        async move {
            seen.lock().await.push(payload);
            let _ = tx.send(true);
        }
    };

    tokio::time::timeout(
        Duration::from_secs(5),
        listen_render_tasks(&connections, rx, handler),
    )
    .await
    .expect("loop did not stop")
    .expect("loop failed");

    let seen = seen.lock().await;
    assert_eq!(seen.as_slice(), &[RenderVideoPayload { video_id: 7 }]);
    drop(seen);

    // The loop closed the connections on shutdown; enqueue reconnects.
    let completion = VideoCompletePayload {
        video_id: 7,
        video_url: "https://x/y.mp4".to_string(),
    };
    enqueue_video_complete(&connections, &completion)
        .await
        .expect("enqueue");

    let mut conn = connections.client().await.expect("connect");
    let raw: Vec<u8> = conn
        .lpop(PENDING_LIST_KEY, None)
        .await
        .expect("completion event present");

    let envelope = decode_envelope(&raw).expect("decodable");
    assert_eq!(envelope.task_type, TYPE_VIDEO_COMPLETE);
    assert_eq!(envelope.queue, "default");
    assert_eq!(
        envelope
            .payload
            .parse::<VideoCompletePayload>()
            .expect("payload"),
        completion
    );

    connections.close().await;
}

/// An undecodable item ahead of a valid one is dropped without stopping the
/// loop; only the valid item reaches the handler.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_malformed_item_is_dropped() {
    dotenvy::dotenv().ok();

    let connections = RedisConnections::new(&QueueConfig::from_env()).expect("client");
    clear_pending_list(&connections).await;

    {
        let mut conn = connections.client().await.expect("connect");
        let _: i64 = conn
            .rpush(PENDING_LIST_KEY, b"\x00\x01 not an envelope".as_slice())
            .await
            .expect("RPUSH");
        let _: i64 = conn
            .rpush(
                PENDING_LIST_KEY,
                br#"{"Type":"video:render","Payload":"{\"video_id\":9}"}"#.as_slice(),
            )
            .await
            .expect("RPUSH");
    }

    let (tx, rx) = watch::channel(false);
    let tx = Arc::new(tx);
    let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));

    let handler_seen = seen.clone();
    let handler = move |payload: RenderVideoPayload| {
        let seen = handler_seen.clone();
        let tx = tx.clone();
        async move {
            seen.lock().await.push(payload.video_id);
            let _ = tx.send(true);
        }
    };

    tokio::time::timeout(
        Duration::from_secs(5),
        listen_render_tasks(&connections, rx, handler),
    )
    .await
    .expect("loop did not stop")
    .expect("loop failed");

    assert_eq!(seen.lock().await.as_slice(), &[9]);

    let mut conn = connections.client().await.expect("connect");
    let remaining: i64 = conn.llen(PENDING_LIST_KEY).await.expect("LLEN");
    assert_eq!(remaining, 0);

    connections.close().await;
}
