//! Collector - event ingestion endpoint for the fbtrex observation network
//!
//! A browser extension observing a feed submits signed batches of observed
//! events. The collector authenticates the submitter, normalizes the
//! heterogeneous payloads into typed records with deterministic
//! content-addressed identifiers, and persists them.
//!
//! ## Pipeline
//!
//! - **Headers**: extract the required `x-fbtrex-*` transport headers
//! - **Supporter**: resolve the claimed identity, TOFU bootstrap on first
//!   contact
//! - **Signature**: bind the request body to the supporter's Ed25519 key
//! - **Normalize**: classify each event and derive its stable identifier
//! - **Persist**: concurrent grouped upserts plus the activity record

pub mod alarms;
pub mod config;
pub mod db;
pub mod events;
pub mod geoip;
pub mod ids;
pub mod nats;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{CollectorError, Result};
