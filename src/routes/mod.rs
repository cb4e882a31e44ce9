//! HTTP routes for the collector

pub mod events;
pub mod health;

pub use events::handle_events_request;
pub use health::{health_check, version_info};
