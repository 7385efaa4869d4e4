//! Task envelope codec.
//!
//! The pending list is shared with an externally-maintained producer
//! ecosystem, so decoding is liberal: items arrive either in a compact binary
//! (MessagePack) form or a textual (JSON) form, and the inner payload may be
//! raw bytes, a UTF-8 string, or an already-structured value. Outbound
//! envelopes are always JSON, which every consumer of this contract accepts.
//!
//! Format selection is a prioritized list of decode attempts; all format
//! knowledge stays in this module.

use std::io::Cursor;

use rmpv::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{QueueError, QueueResult};

/// Logical queue name carried in every envelope this system emits.
pub const DEFAULT_QUEUE: &str = "default";

/// A task envelope as stored in the pending list.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEnvelope {
    /// Task type tag, e.g. `video:render`.
    pub task_type: String,
    /// Job-specific payload, normalized via [`TaskPayload::parse`].
    pub payload: TaskPayload,
    /// Required by the foreign schema; not interpreted here.
    pub timeout: i64,
    /// Required by the foreign schema; not interpreted here.
    pub retry: i64,
    /// Logical queue name.
    pub queue: String,
}

/// The payload field of an envelope, in whichever shape the producer used.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    /// Raw bytes (binary envelopes).
    Bytes(Vec<u8>),
    /// UTF-8 string, usually JSON text double-encoded by the producer.
    Text(String),
    /// Already-structured value.
    Structured(serde_json::Value),
}

impl TaskPayload {
    /// Normalize into a typed payload.
    ///
    /// Byte and string forms are treated as UTF-8 JSON text and parsed;
    /// structured values pass through unchanged. All three shapes of the same
    /// logical payload yield the same result.
    pub fn parse<T: DeserializeOwned>(&self) -> QueueResult<T> {
        match self {
            TaskPayload::Bytes(bytes) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| QueueError::shape(format!("payload is not UTF-8: {e}")))?;
                Ok(serde_json::from_str(text)?)
            }
            TaskPayload::Text(text) => Ok(serde_json::from_str(text)?),
            TaskPayload::Structured(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }
}

/// Decode a raw queue item into an envelope.
///
/// The binary form is attempted first, then the textual form. A shape error
/// from a format that did parse is final; if neither format parses, both
/// failures are reported. Either way the consumer loop drops the item.
pub fn decode_envelope(raw: &[u8]) -> QueueResult<TaskEnvelope> {
    let msgpack_err = match decode_msgpack(raw) {
        Ok(envelope) => return Ok(envelope),
        Err(QueueError::Shape(msg)) => return Err(QueueError::Shape(msg)),
        Err(e) => e,
    };

    match decode_json(raw) {
        Ok(envelope) => Ok(envelope),
        Err(QueueError::Shape(msg)) => Err(QueueError::Shape(msg)),
        Err(json_err) => Err(QueueError::decode(format!(
            "item is neither msgpack nor json (msgpack: {msgpack_err}; json: {json_err})"
        ))),
    }
}

/// Encode an outbound envelope in the textual form.
///
/// The payload is JSON-encoded into a string field, matching what the other
/// producers of this queue emit; timeout and retry are fixed at zero.
pub fn encode_envelope<T: Serialize>(task_type: &str, payload: &T) -> QueueResult<Vec<u8>> {
    let payload_json = serde_json::to_string(payload)?;
    let envelope = serde_json::json!({
        "Type": task_type,
        "Payload": payload_json,
        "Timeout": 0,
        "Retry": 0,
        "Queue": DEFAULT_QUEUE,
    });
    Ok(serde_json::to_vec(&envelope)?)
}

fn decode_msgpack(raw: &[u8]) -> QueueResult<TaskEnvelope> {
    let mut cursor = Cursor::new(raw);
    let value = rmpv::decode::read_value(&mut cursor)
        .map_err(|e| QueueError::decode(format!("msgpack: {e}")))?;
    if cursor.position() as usize != raw.len() {
        return Err(QueueError::decode("msgpack: trailing bytes after value"));
    }

    let entries = match value {
        Value::Map(entries) => entries,
        _ => return Err(QueueError::shape("envelope is not a map")),
    };

    let mut task_type = None;
    let mut payload = None;
    let mut timeout = 0;
    let mut retry = 0;
    let mut queue = None;

    for (key, value) in entries {
        let name = match key.as_str() {
            Some(name) => name.to_owned(),
            None => continue,
        };
        match name.as_str() {
            "Type" => {
                if let Value::String(s) = value {
                    task_type = s.into_str();
                }
            }
            "Payload" => payload = Some(msgpack_payload(value)?),
            "Timeout" => timeout = value.as_i64().unwrap_or(0),
            "Retry" => retry = value.as_i64().unwrap_or(0),
            "Queue" => {
                if let Value::String(s) = value {
                    queue = s.into_str();
                }
            }
            _ => {}
        }
    }

    Ok(TaskEnvelope {
        task_type: task_type.ok_or_else(|| QueueError::shape("envelope missing Type field"))?,
        payload: payload.ok_or_else(|| QueueError::shape("envelope missing Payload field"))?,
        timeout,
        retry,
        queue: queue.unwrap_or_else(|| DEFAULT_QUEUE.to_string()),
    })
}

fn msgpack_payload(value: Value) -> QueueResult<TaskPayload> {
    Ok(match value {
        Value::Binary(bytes) => TaskPayload::Bytes(bytes),
        Value::String(s) => match s.as_str() {
            Some(text) => TaskPayload::Text(text.to_owned()),
            None => TaskPayload::Bytes(s.as_bytes().to_vec()),
        },
        other => TaskPayload::Structured(msgpack_to_json(other)?),
    })
}

/// Convert a MessagePack value into its JSON equivalent. Only shapes that
/// have a JSON counterpart are accepted; anything else is a shape error.
fn msgpack_to_json(value: Value) -> QueueResult<serde_json::Value> {
    use serde_json::Value as Json;

    Ok(match value {
        Value::Nil => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::Integer(i) => {
            if let Some(n) = i.as_i64() {
                Json::from(n)
            } else if let Some(n) = i.as_u64() {
                Json::from(n)
            } else {
                return Err(QueueError::shape("integer out of range"));
            }
        }
        Value::F32(f) => Json::from(f as f64),
        Value::F64(f) => Json::from(f),
        Value::String(s) => match s.into_str() {
            Some(s) => Json::String(s),
            None => return Err(QueueError::shape("string field is not UTF-8")),
        },
        Value::Binary(bytes) => match String::from_utf8(bytes) {
            Ok(s) => Json::String(s),
            Err(_) => return Err(QueueError::shape("binary field is not UTF-8")),
        },
        Value::Array(items) => Json::Array(
            items
                .into_iter()
                .map(msgpack_to_json)
                .collect::<QueueResult<_>>()?,
        ),
        Value::Map(entries) => {
            let mut map = serde_json::Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    Value::String(s) => s
                        .into_str()
                        .ok_or_else(|| QueueError::shape("map key is not UTF-8"))?,
                    _ => return Err(QueueError::shape("map key is not a string")),
                };
                map.insert(key, msgpack_to_json(value)?);
            }
            Json::Object(map)
        }
        Value::Ext(..) => return Err(QueueError::shape("unsupported msgpack extension")),
    })
}

fn decode_json(raw: &[u8]) -> QueueResult<TaskEnvelope> {
    let mut map = match serde_json::from_slice::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => map,
        _ => return Err(QueueError::shape("envelope is not an object")),
    };

    let task_type = match map.remove("Type") {
        Some(serde_json::Value::String(s)) => s,
        Some(_) => return Err(QueueError::shape("Type field is not a string")),
        None => return Err(QueueError::shape("envelope missing Type field")),
    };

    let payload = match map.remove("Payload") {
        Some(serde_json::Value::String(s)) => TaskPayload::Text(s),
        Some(value) => TaskPayload::Structured(value),
        None => return Err(QueueError::shape("envelope missing Payload field")),
    };

    Ok(TaskEnvelope {
        task_type,
        payload,
        timeout: map.get("Timeout").and_then(|v| v.as_i64()).unwrap_or(0),
        retry: map.get("Retry").and_then(|v| v.as_i64()).unwrap_or(0),
        queue: match map.remove("Queue") {
            Some(serde_json::Value::String(s)) => s,
            _ => DEFAULT_QUEUE.to_string(),
        },
    })
}
