//! Dirty hash: a deterministic fingerprint of a persisted collection.
//!
//! Hashes the canonical JSON bytes, so the result is sensitive to item order
//! and to every field value but not to map insertion order.

use crate::content::Content;
use crc32fast::Hasher;
use serde_json::Value;

pub type ContentHash = u32;

pub fn payload_hash(payload: &Value) -> ContentHash {
    let mut hasher = Hasher::new();
    hasher.update(&serde_json::to_vec(payload).unwrap_or_default());
    hasher.finalize()
}

pub fn content_hash(content: &Content) -> ContentHash {
    payload_hash(&content.to_payload())
}
