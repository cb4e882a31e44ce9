//! Transport header extraction
//!
//! Every submission carries its credentials in `x-fbtrex-*` headers. The
//! extraction is a pure mapping from the header bag into a typed context;
//! all required names are checked before failing so the client gets the
//! complete list of what is missing, not just the first hit.

use hyper::HeaderMap;
use serde::Serialize;

use crate::types::{CollectorError, Result};

/// Content length of the signed body
pub const H_LENGTH: &str = "content-length";
/// Extension build identifier
pub const H_BUILD: &str = "x-fbtrex-build";
/// Extension version string
pub const H_VERSION: &str = "x-fbtrex-version";
/// Numeric supporter id
pub const H_USER_ID: &str = "x-fbtrex-userid";
/// Base58 Ed25519 public key
pub const H_PUBLIC_KEY: &str = "x-fbtrex-publickey";
/// Base58 Ed25519 signature over the request body
pub const H_SIGNATURE: &str = "x-fbtrex-signature";

/// Headers a submission must carry
pub const REQUIRED_HEADERS: [&str; 6] = [
    H_LENGTH,
    H_BUILD,
    H_VERSION,
    H_USER_ID,
    H_PUBLIC_KEY,
    H_SIGNATURE,
];

/// Normalized view of the required submission headers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub length: String,
    pub build: String,
    pub version: String,
    pub supporter_id: String,
    pub public_key: String,
    pub signature: String,
}

/// Extract the required headers into a [`RequestContext`].
///
/// A header that is present but not valid UTF-8 counts as missing; there is
/// nothing usable in it either way. Header name matching is case-insensitive
/// (hyper normalizes names to lowercase).
pub fn process_headers(headers: &HeaderMap) -> Result<RequestContext> {
    let mut missing = Vec::new();

    let mut grab = |name: &'static str| -> String {
        match headers.get(name).and_then(|v| v.to_str().ok()) {
            Some(value) => value.to_string(),
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    };

    let ctx = RequestContext {
        length: grab(H_LENGTH),
        build: grab(H_BUILD),
        version: grab(H_VERSION),
        supporter_id: grab(H_USER_ID),
        public_key: grab(H_PUBLIC_KEY),
        signature: grab(H_SIGNATURE),
    };

    if !missing.is_empty() {
        return Err(CollectorError::Headers(missing));
    }

    Ok(ctx)
}
