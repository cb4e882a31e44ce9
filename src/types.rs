//! Error types for the collector
//!
//! One error enum covers the whole pipeline. Fatal variants abort the
//! request; per-event classification failures are collected in the batch
//! instead and never surface here.

use thiserror::Error;

/// Collector error type
#[derive(Debug, Error)]
pub enum CollectorError {
    /// One or more required transport headers are absent
    #[error("missing required headers: {}", .0.join(", "))]
    Headers(Vec<String>),

    /// Request cannot be validated (missing signature/public key, bad user id)
    #[error("validation failed: {0}")]
    Validation(String),

    /// Cryptographic signature does not match the request body
    #[error("signature verification failed: {0}")]
    Signature(String),

    /// Request body is not a JSON array of events
    #[error("malformed request body: {0}")]
    Body(String),

    /// Storage lookup or write failed
    #[error("database error: {0}")]
    Database(String),

    /// Alarm could not be delivered to the notification sink
    #[error("alarm delivery failed: {0}")]
    Alarm(String),

    /// Anything else
    #[error("internal error: {0}")]
    Internal(String),
}

impl CollectorError {
    /// Message safe to return to the submitting client.
    ///
    /// Internal error text (driver messages, key material, header dumps)
    /// stays in the logs; the HTTP boundary only ever sees these strings.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Headers(_) => "missing required headers",
            Self::Validation(_) => "request validation failed",
            Self::Signature(_) => "signature verification failed",
            Self::Body(_) => "malformed request body",
            Self::Database(_) | Self::Alarm(_) | Self::Internal(_) => "internal processing error",
        }
    }
}

impl From<std::io::Error> for CollectorError {
    fn from(e: std::io::Error) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Collector result type
pub type Result<T> = std::result::Result<T, CollectorError>;
