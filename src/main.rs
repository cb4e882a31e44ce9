//! Collector - event ingestion endpoint for the fbtrex observation network

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use collector::{
    alarms::{AlarmSink, LogAlarmSink, NatsAlarmSink},
    config::Args,
    db::{EventStore, MemoryEventStore, MongoClient, MongoEventStore},
    geoip::PassthroughGeoResolver,
    nats::NatsClient,
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("collector={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Collector - fbtrex event ingestion");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Feed root: {}", args.feed_url);
    info!("MongoDB: {}", args.mongodb_uri);
    info!("NATS: {}", args.nats.nats_url);
    info!("Alarm subject: {}", args.alarm_subject);
    info!("======================================");

    // Connect to MongoDB (optional in dev mode)
    let store: Arc<dyn EventStore> = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db)
        .await
    {
        Ok(client) => match MongoEventStore::new(&client).await {
            Ok(store) => {
                info!("MongoDB connected, collections indexed");
                Arc::new(store)
            }
            Err(e) => {
                error!("MongoDB collection setup failed: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            if args.dev_mode {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                Arc::new(MemoryEventStore::new())
            } else {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        }
    };

    // Connect to NATS (optional in dev mode)
    let alarms: Arc<dyn AlarmSink> =
        match NatsClient::new(&args.nats, &format!("collector-{}", args.node_id)).await {
            Ok(client) => {
                info!("NATS connected, alarms on '{}'", args.alarm_subject);
                Arc::new(NatsAlarmSink::new(client, args.alarm_subject.clone()))
            }
            Err(e) => {
                if args.dev_mode {
                    warn!("NATS connection failed (dev mode, log-only alarms): {}", e);
                    Arc::new(LogAlarmSink)
                } else {
                    error!("NATS connection failed: {}", e);
                    std::process::exit(1);
                }
            }
        };

    // Geo lookup: external database, not wired in by default. Unresolved
    // non-loopback submitters are recorded redacted.
    let geo = Arc::new(PassthroughGeoResolver);

    let state = Arc::new(AppState::new(args, store, alarms, geo));

    server::run(state).await?;

    Ok(())
}
