//! Event submission pipeline
//!
//! Per request: header extraction, supporter resolution (TOFU bootstrap on
//! first contact), signature verification, normalization into typed records
//! with deterministic ids, and concurrent batch persistence. Each stage
//! returns a result; the first fatal failure short-circuits the chain and
//! is folded into the sanitized `error` response shape.
//!
//! Requests run on independent tasks with no shared state beyond the
//! supporter store; nothing here orders one request against another. The
//! deterministic ids make that safe: replays and races land on the same
//! documents.

pub mod headers;
pub mod normalize;
pub mod persist;
pub mod signature;
pub mod supporter;

pub use headers::{process_headers, RequestContext, REQUIRED_HEADERS};
pub use normalize::{parse_events, EventFailure, ParsedBatch, SessionInfo};
pub use persist::{write_batch, WriteSummary};
pub use signature::verify_submission;
pub use supporter::resolve_supporter;

use hyper::HeaderMap;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::alarms::Alarm;
use crate::geoip;
use crate::server::AppState;
use crate::types::{CollectorError, Result};

/// Header carrying the submitter's address when behind a proxy
const H_FORWARDED_FOR: &str = "x-forwarded-for";

/// Process one submission and produce the response payload.
///
/// Always returns a well-formed JSON value: `{"status":"OK","info":[...]}`
/// with the per-bucket write summaries, or `{"status":"error","info":...}`
/// with a sanitized message. Internal failures never escape as faults.
pub async fn process_submission(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Value {
    match run_pipeline(state, headers, body).await {
        Ok(summaries) => json!({ "status": "OK", "info": summaries }),
        Err(e) => {
            debug!("event submission ignored: {}", e);
            json!({ "status": "error", "info": e.public_message() })
        }
    }
}

async fn run_pipeline(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Vec<WriteSummary>> {
    let forwarded_for = headers.get(H_FORWARDED_FOR).and_then(|v| v.to_str().ok());
    let geoinfo = geoip::session_geo(state.geo.as_ref(), forwarded_for);

    // Header check runs before any I/O.
    let ctx = process_headers(headers)?;

    let store = state.store.as_ref();
    let alarms = state.alarms.as_ref();

    let resolved = resolve_supporter(store, alarms, &ctx).await?;
    let resolved = verify_submission(&ctx, resolved, body, alarms).await?;

    let submitted: Vec<Value> = serde_json::from_slice(body)
        .map_err(|e| CollectorError::Body(format!("expected a JSON event array: {}", e)))?;

    let session = SessionInfo {
        geoip: geoinfo,
        user_id: resolved.user_id,
        public_key: resolved.public_key.clone(),
        version: ctx.version.clone(),
    };

    let batch = parse_events(&submitted, &session, &state.args.feed_url);

    if !batch.failures.is_empty() {
        debug!("{} events failed classification", batch.failures.len());
        alarms
            .report(Alarm::events(
                "body parsing",
                serde_json::to_value(&batch.failures).unwrap_or_default(),
            ))
            .await?;
    }

    log_batch(&batch, &session);

    write_batch(store, &batch, resolved).await
}

/// Operational summary of an accepted batch.
fn log_batch(batch: &ParsedBatch, session: &SessionInfo) {
    if batch.timelines.first().is_some_and(|t| t.nonfeed == Some(true)) {
        debug!("non-feed navigation: no feed content received");
    } else {
        debug!(
            "{} timelines {} impressions {} htmls{}",
            batch.timelines.len(),
            batch.impressions.len(),
            batch.htmls.len(),
            batch
                .timelines
                .first()
                .and_then(|t| t.tag_id.as_deref())
                .map(|tag| format!(" tagId {}", tag))
                .unwrap_or_default()
        );
    }

    info!(
        "supporter {} [{}] batch accepted, client {}",
        session.user_id, session.geoip, session.version
    );

    if let (Some(first), Some(last)) = (batch.impressions.first(), batch.impressions.last()) {
        debug!(
            "impressionOrder first {} last {}",
            first.impression_order, last.impression_order
        );
    }
}
