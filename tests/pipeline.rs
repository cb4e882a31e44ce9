//! End-to-end pipeline tests
//!
//! Drives `process_submission` the way the HTTP layer does, against the
//! in-memory store, a recording alarm sink, and a fixed geo resolver.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::Parser;
use ed25519_dalek::{Signer, SigningKey};
use hyper::header::{HeaderName, HeaderValue};
use hyper::HeaderMap;
use rand::rngs::OsRng;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use collector::alarms::{Alarm, AlarmSink};
use collector::db::schemas::SupporterDoc;
use collector::db::{EventStore, MemoryEventStore};
use collector::events::process_submission;
use collector::geoip::{GeoInfo, GeoResolver};
use collector::{ids, Args, AppState, Result};

/// Alarm sink that remembers everything it was asked to deliver
#[derive(Default)]
struct RecordingSink(Mutex<Vec<Alarm>>);

impl RecordingSink {
    async fn whats(&self) -> Vec<String> {
        self.0.lock().await.iter().map(|a| a.what.clone()).collect()
    }
}

#[async_trait]
impl AlarmSink for RecordingSink {
    async fn report(&self, alarm: Alarm) -> Result<()> {
        self.0.lock().await.push(alarm);
        Ok(())
    }
}

/// Geo resolver that always resolves to the same country code
struct FixedGeo(&'static str);

impl GeoResolver for FixedGeo {
    fn resolve(&self, ip: &str) -> GeoInfo {
        GeoInfo {
            code: Some(self.0.to_string()),
            ip: ip.to_string(),
        }
    }
}

struct TestRig {
    state: AppState,
    store: Arc<MemoryEventStore>,
    alarms: Arc<RecordingSink>,
    signing_key: SigningKey,
    public_key: String,
}

fn rig() -> TestRig {
    let store = Arc::new(MemoryEventStore::new());
    let alarms = Arc::new(RecordingSink::default());
    let signing_key = SigningKey::generate(&mut OsRng);
    let public_key = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();

    let state = AppState::new(
        Args::parse_from(["collector"]),
        Arc::clone(&store) as Arc<dyn EventStore>,
        Arc::clone(&alarms) as Arc<dyn AlarmSink>,
        Arc::new(FixedGeo("IT")),
    );

    TestRig {
        state,
        store,
        alarms,
        signing_key,
        public_key,
    }
}

fn submission_headers(rig: &TestRig, user_id: &str, body: &[u8]) -> HeaderMap {
    let signature = bs58::encode(rig.signing_key.sign(body).to_bytes()).into_string();
    let mut headers = HeaderMap::new();
    for (name, value) in [
        ("content-length", body.len().to_string()),
        ("x-fbtrex-build", "build-7".to_string()),
        ("x-fbtrex-version", "2.1.0".to_string()),
        ("x-fbtrex-userid", user_id.to_string()),
        ("x-fbtrex-publickey", rig.public_key.clone()),
        ("x-fbtrex-signature", signature),
    ] {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(&value).unwrap(),
        );
    }
    headers
}

fn timeline_body() -> Vec<u8> {
    serde_json::to_vec(&json!([{
        "type": "timeline",
        "id": "abc",
        "startTime": "2024-01-01T00:00:00Z",
        "location": "https://www.facebook.com/",
    }]))
    .unwrap()
}

fn info_kinds(response: &Value) -> Vec<String> {
    response["info"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["kind"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn first_contact_bootstraps_exactly_one_supporter_with_one_tofu_alarm() {
    let rig = rig();
    let body = timeline_body();
    let headers = submission_headers(&rig, "42", &body);

    let response = process_submission(&rig.state, &headers, &body).await;

    assert_eq!(response["status"], "OK");
    assert_eq!(rig.store.supporter_count().await, 1);
    assert_eq!(rig.alarms.whats().await, vec!["TOFU".to_string()]);

    let supporter = rig.store.supporter(42, &rig.public_key).await.unwrap();
    assert!(supporter.tofu);
    assert!(!supporter.user_secret.is_empty());
}

#[tokio::test]
async fn resubmission_is_idempotent() {
    let rig = rig();
    let body = timeline_body();
    let headers = submission_headers(&rig, "42", &body);

    let first = process_submission(&rig.state, &headers, &body).await;
    let second = process_submission(&rig.state, &headers, &body).await;

    assert_eq!(first["status"], "OK");
    assert_eq!(second["status"], "OK");
    assert_eq!(rig.store.timeline_count(), 1);
    assert!(rig
        .store
        .timeline(&ids::timeline_id("abc", 42))
        .is_some());
}

#[tokio::test]
async fn end_to_end_example_batch() {
    let rig = rig();
    let body = timeline_body();

    // Known identity: the supporter row exists before the submission.
    let existing = SupporterDoc::bootstrap(42, &rig.public_key, Utc::now());
    rig.store.insert_supporter(&existing).await.unwrap();

    let headers = submission_headers(&rig, "42", &body);
    let response = process_submission(&rig.state, &headers, &body).await;

    assert_eq!(response["status"], "OK");
    let kinds = info_kinds(&response);
    assert!(kinds.contains(&"timelines".to_string()));
    assert!(kinds.contains(&"supporters".to_string()));

    let timeline = rig
        .store
        .timeline(&ids::timeline_id("abc", 42))
        .expect("timeline persisted");
    assert_eq!(timeline.user_id, 42);
    assert_eq!(timeline.geoip, "IT");
    // Location matched the feed root, so no nonfeed mark on the record.
    let stored = serde_json::to_value(&timeline).unwrap();
    assert!(stored.get("nonfeed").is_none());

    // Known identity means no TOFU; no alarms at all on the happy path.
    assert!(rig.alarms.whats().await.is_empty());
}

#[tokio::test]
async fn public_impression_produces_content_addressed_snippet() {
    let rig = rig();
    let html = "<div>public post</div>";
    let body = serde_json::to_vec(&json!([{
        "type": "impression",
        "timelineId": "tl-1",
        "visibility": "public",
        "html": html,
        "impressionOrder": 1,
        "impressionTime": "2024-01-01T00:00:05Z",
    }]))
    .unwrap();

    let headers = submission_headers(&rig, "42", &body);
    let response = process_submission(&rig.state, &headers, &body).await;

    assert_eq!(response["status"], "OK");
    assert_eq!(rig.store.html_count(), 1);

    let snippet = rig.store.html(&ids::snippet_id(html)).expect("snippet");
    assert_eq!(snippet.html, html);

    let impression = rig
        .store
        .impression(&ids::impression_id("tl-1", 42, 1))
        .expect("impression");
    assert_eq!(impression.html_id.as_deref(), Some(snippet.id.as_str()));
    let stored = serde_json::to_value(&impression).unwrap();
    assert!(stored.get("html").is_none());
}

#[tokio::test]
async fn private_impression_never_produces_a_snippet() {
    let rig = rig();
    let body = serde_json::to_vec(&json!([{
        "type": "impression",
        "timelineId": "tl-1",
        "visibility": "friends",
        "html": "<div>should never be stored</div>",
        "impressionOrder": 1,
        "impressionTime": "2024-01-01T00:00:05Z",
    }]))
    .unwrap();

    let headers = submission_headers(&rig, "42", &body);
    let response = process_submission(&rig.state, &headers, &body).await;

    assert_eq!(response["status"], "OK");
    assert_eq!(rig.store.html_count(), 0);
    assert_eq!(rig.store.impression_count(), 1);

    let impression = rig
        .store
        .impression(&ids::impression_id("tl-1", 42, 1))
        .unwrap();
    assert_eq!(impression.html_id, None);
}

#[tokio::test]
async fn unknown_event_type_does_not_abort_the_batch() {
    let rig = rig();
    let body = serde_json::to_vec(&json!([
        {
            "type": "timeline",
            "id": "abc",
            "startTime": "2024-01-01T00:00:00Z",
            "location": "https://www.facebook.com/",
        },
        { "type": "telepathy", "id": "zzz" },
    ]))
    .unwrap();

    let headers = submission_headers(&rig, "42", &body);
    let response = process_submission(&rig.state, &headers, &body).await;

    assert_eq!(response["status"], "OK");
    assert_eq!(rig.store.timeline_count(), 1);

    // TOFU for the fresh identity, plus the classification failure report.
    let whats = rig.alarms.whats().await;
    assert!(whats.contains(&"body parsing".to_string()));
}

#[tokio::test]
async fn missing_signature_header_rejects_before_any_write() {
    let rig = rig();
    let body = timeline_body();
    let mut headers = submission_headers(&rig, "42", &body);
    headers.remove("x-fbtrex-signature");

    let response = process_submission(&rig.state, &headers, &body).await;

    assert_eq!(response["status"], "error");
    assert_eq!(response["info"], "missing required headers");
    assert_eq!(rig.store.supporter_count().await, 0);
    assert_eq!(rig.store.timeline_count(), 0);
    assert!(rig.alarms.whats().await.is_empty());
}

#[tokio::test]
async fn tampered_body_rejects_and_leaves_activity_untouched() {
    let rig = rig();
    let body = timeline_body();

    let bootstrap_time: DateTime<Utc> = "2020-01-01T00:00:00Z".parse().unwrap();
    let existing = SupporterDoc::bootstrap(42, &rig.public_key, bootstrap_time);
    rig.store.insert_supporter(&existing).await.unwrap();

    // Sign the real body, then submit something else under that signature.
    let headers = submission_headers(&rig, "42", &body);
    let tampered = serde_json::to_vec(&json!([{
        "type": "timeline",
        "id": "evil",
        "startTime": "2024-01-01T00:00:00Z",
        "location": "https://www.facebook.com/",
    }]))
    .unwrap();

    let response = process_submission(&rig.state, &headers, &tampered).await;

    assert_eq!(response["status"], "error");
    assert_eq!(response["info"], "signature verification failed");
    assert_eq!(rig.store.timeline_count(), 0);
    assert_eq!(
        rig.alarms.whats().await,
        vec!["Signature verification failure".to_string()]
    );

    let supporter = rig.store.supporter(42, &rig.public_key).await.unwrap();
    assert_eq!(supporter.last_activity, bootstrap_time);
}

#[tokio::test]
async fn error_responses_never_leak_internal_text() {
    let rig = rig();
    // Valid signature over a body that is not an event array.
    let body = b"{\"not\": \"an array\"}".to_vec();
    let headers = submission_headers(&rig, "42", &body);

    let response = process_submission(&rig.state, &headers, &body).await;

    assert_eq!(response["status"], "error");
    assert_eq!(response["info"], "malformed request body");
}
