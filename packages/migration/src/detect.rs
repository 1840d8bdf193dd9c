//! Mode detection over persisted payloads.
//!
//! Payloads carry no mode marker (legacy documents predate the free editor),
//! so the mode is read off the shape every time a payload is loaded.

use invitation_model::{Content, ModelError, ModelResult, Mode};
use serde_json::Value;
use tracing::debug;

/// Classify a payload as linear or free.
///
/// Free when the payload is a non-empty array whose every entry carries
/// free-position geometry (an `elements` array whose members all have a
/// `position`). Everything else, including the empty payload, is linear.
pub fn detect_mode(payload: &Value) -> Mode {
    match payload {
        Value::Object(wrapper) if wrapper.contains_key("sections") => Mode::Free,
        Value::Object(wrapper) if wrapper.contains_key("blocks") => Mode::Linear,
        Value::Array(entries) if !entries.is_empty() && entries.iter().all(has_free_geometry) => {
            Mode::Free
        }
        _ => Mode::Linear,
    }
}

fn has_free_geometry(entry: &Value) -> bool {
    entry
        .get("elements")
        .and_then(Value::as_array)
        .map(|elements| {
            elements
                .iter()
                .all(|element| element.get("position").is_some_and(Value::is_object))
        })
        .unwrap_or(false)
}

/// Detect the mode and decode the payload into content
pub fn decode_payload(payload: Value) -> ModelResult<Content> {
    let mode = detect_mode(&payload);
    let collection = unwrap_collection(payload)?;
    debug!(%mode, "decoding payload");
    Content::from_payload_as(mode, collection)
}

/// Strip the `{"blocks": [...]}` / `{"sections": [...]}` wrappers
fn unwrap_collection(payload: Value) -> ModelResult<Value> {
    match payload {
        Value::Array(_) => Ok(payload),
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::Object(mut wrapper) => wrapper
            .remove("sections")
            .or_else(|| wrapper.remove("blocks"))
            .ok_or_else(|| {
                ModelError::MalformedPayload("expected an array, 'blocks' or 'sections'".into())
            }),
        other => Err(ModelError::MalformedPayload(format!(
            "expected an array, found {}",
            other
        ))),
    }
}
