//! Blocking consumer loop for render tasks.

use std::future::Future;
use std::time::Duration;

use redis::AsyncCommands;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::codec::decode_envelope;
use crate::connection::RedisConnections;
use crate::error::QueueResult;
use crate::task::{RenderVideoPayload, PENDING_LIST_KEY, TYPE_RENDER_VIDEO};

/// Pause after a transport error on the blocking pop.
const POP_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Consume render tasks until `shutdown` flips.
///
/// The loop cycles through three states: block on the pending list (no
/// timeout), decode the popped item, dispatch it to `handler` and await
/// completion. One task is in flight at a time; dispatch order is pop order.
///
/// Undecodable items and foreign task types are dropped: a popped item has
/// already left the queue and there is no redelivery. Transport errors pause
/// the loop for one second and never terminate it. The handler is responsible
/// for its own failures; the loop neither catches nor retries them.
///
/// On shutdown any in-flight pop is abandoned and the held connections are
/// closed.
pub async fn listen_render_tasks<F, Fut>(
    connections: &RedisConnections,
    mut shutdown: watch::Receiver<bool>,
    handler: F,
) -> QueueResult<()>
where
    F: Fn(RenderVideoPayload) -> Fut,
    Fut: Future<Output = ()>,
{
    info!(key = PENDING_LIST_KEY, "Listening for render tasks");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let popped = tokio::select! {
            _ = shutdown.changed() => break,
            result = pop_next(connections) => result,
        };

        let raw = match popped {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Blocking pop failed, pausing before retry");
                connections.invalidate().await;
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(POP_RETRY_PAUSE) => {}
                }
                continue;
            }
        };

        if let Some(payload) = accept(&raw) {
            handler(payload).await;
        }
    }

    info!("Render task loop stopped");
    connections.close().await;
    Ok(())
}

/// Pop the next raw item off the pending list, blocking until one exists.
async fn pop_next(connections: &RedisConnections) -> QueueResult<Vec<u8>> {
    let mut conn = connections.client().await?;
    let (_key, raw): (String, Vec<u8>) = conn.blpop(PENDING_LIST_KEY, 0.0).await?;
    Ok(raw)
}

/// Decode one popped item and decide whether it is dispatched.
///
/// Returns the parsed payload only for well-formed render-request envelopes.
/// The pending list multiplexes many task types; everything this worker does
/// not handle is discarded here.
fn accept(raw: &[u8]) -> Option<RenderVideoPayload> {
    let envelope = match decode_envelope(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Dropping undecodable queue item");
            return None;
        }
    };

    if envelope.task_type != TYPE_RENDER_VIDEO {
        debug!(task_type = %envelope.task_type, "Ignoring foreign task type");
        return None;
    }

    match envelope.payload.parse::<RenderVideoPayload>() {
        Ok(payload) => {
            info!(video_id = payload.video_id, "Render task received");
            Some(payload)
        }
        Err(e) => {
            warn!(error = %e, "Dropping render task with malformed payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_envelope;
    use crate::task::TYPE_VIDEO_COMPLETE;

    #[test]
    fn test_accept_textual_render_task() {
        let raw = br#"{"Type":"video:render","Payload":"{\"video_id\":7}","Timeout":0,"Retry":0,"Queue":"default"}"#;

        let payload = accept(raw).unwrap();
        assert_eq!(payload.video_id, 7);
    }

    #[test]
    fn test_accept_binary_render_task() {
        use rmpv::Value;

        let mut raw = Vec::new();
        rmpv::encode::write_value(
            &mut raw,
            &Value::Map(vec![
                (Value::from("Type"), Value::from("video:render")),
                (
                    Value::from("Payload"),
                    Value::Binary(br#"{"video_id":3}"#.to_vec()),
                ),
            ]),
        )
        .unwrap();

        let payload = accept(&raw).unwrap();
        assert_eq!(payload.video_id, 3);
    }

    #[test]
    fn test_accept_discards_foreign_task_types() {
        let raw = encode_envelope(
            TYPE_VIDEO_COMPLETE,
            &crate::task::VideoCompletePayload {
                video_id: 7,
                video_url: "https://x/y.mp4".to_string(),
            },
        )
        .unwrap();

        assert!(accept(&raw).is_none());
    }

    #[test]
    fn test_accept_discards_malformed_payload() {
        let raw = br#"{"Type":"video:render","Payload":"not json"}"#;
        assert!(accept(raw).is_none());
    }

    #[test]
    fn test_malformed_item_isolation() {
        // One undecodable item followed by one valid item: only the valid one
        // is dispatched.
        let garbage: &[u8] = b"\x00\x01\x02 junk";
        let valid = br#"{"Type":"video:render","Payload":"{\"video_id\":9}"}"#;

        let dispatched: Vec<_> = [garbage, valid.as_slice()]
            .into_iter()
            .filter_map(accept)
            .collect();

        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].video_id, 9);
    }
}
