//! Events route handler
//!
//! `POST /api/v1/events` - signed observation batch submission.
//!
//! The transport layer stays thin: collect the body, hand headers and raw
//! bytes to the pipeline, serialize whatever payload it produced. The
//! pipeline guarantees the payload is always a well-formed status object,
//! so this handler responds 200 for both accepted and rejected batches;
//! rejection is carried in `status: "error"`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::events;
use crate::server::AppState;

/// Handle a batch submission
pub async fn handle_events_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {}", e);
            return json_response(&json!({
                "status": "error",
                "info": "malformed request body",
            }));
        }
    };

    let payload = events::process_submission(&state, &parts.headers, &bytes).await;
    json_response(&payload)
}

/// Build the JSON response envelope
fn json_response(payload: &Value) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(payload)
        .unwrap_or_else(|_| br#"{"status":"error","info":"internal processing error"}"#.to_vec());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_response_shape() {
        let resp = json_response(&json!({"status": "OK", "info": []}));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("Content-Type").unwrap(),
            "application/json"
        );
    }
}
