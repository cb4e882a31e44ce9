//! Configuration for the collector
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Collector - event ingestion endpoint for the fbtrex observation network
#[derive(Parser, Debug, Clone)]
#[command(name = "collector")]
#[command(about = "Ingestion endpoint for signed observation batches")]
pub struct Args {
    /// Unique node identifier for this collector instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "collector")]
    pub mongodb_db: String,

    /// NATS configuration
    #[command(flatten)]
    pub nats: NatsArgs,

    /// Subject alarms are published to
    #[arg(long, env = "ALARM_SUBJECT", default_value = "alarms.events")]
    pub alarm_subject: String,

    /// Canonical feed root URL; timelines observed anywhere else are
    /// marked nonfeed
    #[arg(long, env = "FEED_URL", default_value = "https://www.facebook.com/")]
    pub feed_url: String,

    /// Enable development mode (runs without MongoDB/NATS, in-memory store
    /// and log-only alarms)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// NATS connection configuration
#[derive(Parser, Debug, Clone)]
pub struct NatsArgs {
    /// NATS server URL
    #[arg(long, env = "NATS_URL", default_value = "nats://127.0.0.1:4222")]
    pub nats_url: String,

    /// NATS username (optional)
    #[arg(long, env = "NATS_USER")]
    pub nats_user: Option<String>,

    /// NATS password (optional)
    #[arg(long, env = "NATS_PASSWORD")]
    pub nats_password: Option<String>,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.feed_url.is_empty() {
            return Err("FEED_URL must not be empty".to_string());
        }
        if !self.feed_url.starts_with("http://") && !self.feed_url.starts_with("https://") {
            return Err("FEED_URL must be an absolute http(s) URL".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let args = Args::parse_from(["collector"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.feed_url, "https://www.facebook.com/");
        assert_eq!(args.alarm_subject, "alarms.events");
    }

    #[test]
    fn test_relative_feed_url_is_rejected() {
        let args = Args::parse_from(["collector", "--feed-url", "www.facebook.com"]);
        assert!(args.validate().is_err());
    }
}
