//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo; every accepted connection is served on
//! its own task, so requests run as independent pipeline instances with no
//! global lock.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::alarms::AlarmSink;
use crate::config::Args;
use crate::db::EventStore;
use crate::geoip::GeoResolver;
use crate::routes;
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Supporter and event record persistence
    pub store: Arc<dyn EventStore>,
    /// Out-of-band anomaly sink
    pub alarms: Arc<dyn AlarmSink>,
    /// External geo lookup
    pub geo: Arc<dyn GeoResolver>,
}

impl AppState {
    pub fn new(
        args: Args,
        store: Arc<dyn EventStore>,
        alarms: Arc<dyn AlarmSink>,
        geo: Arc<dyn GeoResolver>,
    ) -> Self {
        Self {
            args,
            store,
            alarms,
            geo,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Collector listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - in-memory store, log-only alarms");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("{} {}", method, path);

    let response = match (method, path.as_str()) {
        // Signed observation batches
        (Method::POST, "/api/v1/events") => {
            routes::handle_events_request(Arc::clone(&state), req).await
        }

        // Legacy path kept for extensions that predate the versioned API
        (Method::POST, "/events") => {
            debug!("Legacy events path used - consider migrating to /api/v1/events");
            routes::handle_events_request(Arc::clone(&state), req).await
        }

        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => preflight_response(),

        _ => not_found_response(&path),
    };

    Ok(response)
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header(
            "Access-Control-Allow-Headers",
            "content-type, x-fbtrex-build, x-fbtrex-version, x-fbtrex-userid, \
             x-fbtrex-publickey, x-fbtrex-signature",
        )
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// 404 response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    debug!("no route for {}", path);
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(r#"{"error":"not found"}"#)))
        .unwrap()
}
