//! Deterministic record identifiers
//!
//! Every stored record is addressed by a hash of its stable identifying
//! fields, never by wall-clock time, so resubmitting the same logical event
//! collides to the same id and persistence stays idempotent.
//!
//! The field set and encoding behind each id are an external contract:
//! already-stored data is addressed by them. Identifiers are SHA-256 over a
//! canonical JSON object (serde_json emits map keys in sorted order), hex
//! encoded, 64 characters.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Hash a canonical JSON value into a fixed-width hex identifier
pub fn hash_value(value: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Timeline id: derived from the client-side event uuid and the submitter.
///
/// Also used for the `timelineId` an impression points at, so impressions
/// and their timeline land on the same identifier without coordination.
pub fn timeline_id(client_event_id: &str, user_id: i64) -> String {
    hash_value(&json!({ "uuid": client_event_id, "user": user_id }))
}

/// Impression id: the timeline fields plus the rendering order.
pub fn impression_id(client_timeline_id: &str, user_id: i64, impression_order: i64) -> String {
    hash_value(&json!({
        "uuid": client_timeline_id,
        "user": user_id,
        "order": impression_order,
    }))
}

/// Html snippet id: content-addressed on the raw html alone, so the same
/// rendered markup dedupes across users and submissions.
pub fn snippet_id(html: &str) -> String {
    hash_value(&json!({ "html": html }))
}

/// Supporter secret, derived once at TOFU bootstrap.
///
/// This is the one derivation that includes a timestamp: the secret must be
/// unpredictable across bootstraps, not reproducible.
pub fn supporter_secret(public_key: &str, user_id: i64, when: DateTime<Utc>) -> String {
    hash_value(&json!({
        "publicKey": public_key,
        "userId": user_id,
        "when": when.to_rfc3339(),
    }))
}
