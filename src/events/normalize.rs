//! Event normalization
//!
//! Folds the submitted event array into four buckets: timelines,
//! impressions, html snippets, and per-event classification failures. Each
//! output record is freshly built and typed; nothing is shared across
//! iterations beyond the batch itself.
//!
//! A malformed or unrecognized event lands in the failure bucket and the
//! fold continues: per-event problems never abort the batch. Only the
//! request-level stages (headers, identity, signature, storage) can do that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::db::schemas::{HtmlDoc, ImpressionDoc, TimelineDoc};
use crate::ids;

/// Visibility value that allows html capture
const VISIBILITY_PUBLIC: &str = "public";

/// Failure kind for an unrecognized `type` discriminator
pub const KIND_INVALID_TYPE: &str = "invalid type";

/// Failure kind for a recognized type with undecodable fields
pub const KIND_MALFORMED: &str = "malformed event";

/// Session metadata seeded into every record of a batch
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub geoip: String,
    pub user_id: i64,
    pub public_key: String,
    pub version: String,
}

/// One event that could not be classified, kept verbatim for diagnostics
#[derive(Debug, Clone, serde::Serialize)]
pub struct EventFailure {
    pub kind: &'static str,
    pub event: Value,
}

/// The four buckets a submission folds into
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub timelines: Vec<TimelineDoc>,
    pub impressions: Vec<ImpressionDoc>,
    pub htmls: Vec<HtmlDoc>,
    pub failures: Vec<EventFailure>,
}

/// Timeline event as submitted by the extension
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineSubmission {
    id: String,
    start_time: DateTime<Utc>,
    location: String,
    #[serde(default)]
    tag_id: Option<String>,
}

/// Impression event as submitted by the extension
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImpressionSubmission {
    timeline_id: String,
    visibility: String,
    #[serde(default)]
    html: Option<String>,
    #[serde(deserialize_with = "int_or_string")]
    impression_order: i64,
    impression_time: DateTime<Utc>,
}

/// Older extension builds send `impressionOrder` as a decimal string.
fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom("impressionOrder is not an integer")),
        Value::String(s) => s
            .parse()
            .map_err(|_| serde::de::Error::custom("impressionOrder is not an integer")),
        other => Err(serde::de::Error::custom(format!(
            "impressionOrder has unexpected type: {}",
            other
        ))),
    }
}

/// Fold submitted events into typed, deterministically-addressed records.
///
/// `feed_url` is the canonical feed root; a timeline observed anywhere else
/// is marked `nonfeed`.
pub fn parse_events(events: &[Value], session: &SessionInfo, feed_url: &str) -> ParsedBatch {
    let mut batch = ParsedBatch::default();

    for event in events {
        match event.get("type").and_then(Value::as_str) {
            Some("timeline") => parse_timeline(event, session, feed_url, &mut batch),
            Some("impression") => parse_impression(event, session, &mut batch),
            _ => {
                debug!("unexpected event type, collecting as failure");
                batch.failures.push(EventFailure {
                    kind: KIND_INVALID_TYPE,
                    event: event.clone(),
                });
            }
        }
    }

    batch
}

fn parse_timeline(event: &Value, session: &SessionInfo, feed_url: &str, batch: &mut ParsedBatch) {
    let submission: TimelineSubmission = match serde_json::from_value(event.clone()) {
        Ok(s) => s,
        Err(e) => {
            debug!("undecodable timeline event: {}", e);
            batch.failures.push(EventFailure {
                kind: KIND_MALFORMED,
                event: event.clone(),
            });
            return;
        }
    };

    batch.timelines.push(TimelineDoc {
        id: ids::timeline_id(&submission.id, session.user_id),
        start_time: submission.start_time,
        user_id: session.user_id,
        geoip: session.geoip.clone(),
        nonfeed: (submission.location != feed_url).then_some(true),
        tag_id: submission.tag_id,
    });
}

fn parse_impression(event: &Value, session: &SessionInfo, batch: &mut ParsedBatch) {
    let submission: ImpressionSubmission = match serde_json::from_value(event.clone()) {
        Ok(s) => s,
        Err(e) => {
            debug!("undecodable impression event: {}", e);
            batch.failures.push(EventFailure {
                kind: KIND_MALFORMED,
                event: event.clone(),
            });
            return;
        }
    };

    let timeline_id = ids::timeline_id(&submission.timeline_id, session.user_id);
    let impression_id = ids::impression_id(
        &submission.timeline_id,
        session.user_id,
        submission.impression_order,
    );

    let html_id = if submission.visibility == VISIBILITY_PUBLIC {
        let html = submission.html.unwrap_or_default();
        if html.is_empty() {
            debug!("public impression with zero-size html");
        }
        let html_id = ids::snippet_id(&html);
        batch.htmls.push(HtmlDoc {
            id: html_id.clone(),
            saving_time: Utc::now(),
            user_id: session.user_id,
            impression_id: impression_id.clone(),
            timeline_id: timeline_id.clone(),
            html,
        });
        Some(html_id)
    } else {
        // Html alongside a non-public post should not happen; if it does,
        // drop the bytes before they can reach storage and leave a trace.
        if let Some(html) = &submission.html {
            if !html.is_empty() {
                warn!(
                    "possible private post leakage: {} html bytes on {:?} impression, discarded",
                    html.len(),
                    submission.visibility
                );
            }
        }
        None
    };

    batch.impressions.push(ImpressionDoc {
        id: impression_id,
        timeline_id,
        user_id: session.user_id,
        visibility: submission.visibility,
        impression_order: submission.impression_order,
        impression_time: submission.impression_time,
        html_id,
    });
}
