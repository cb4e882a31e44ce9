//! HTTP server for the collector

pub mod http;

pub use http::{run, AppState};
