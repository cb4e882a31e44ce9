//! Alarm reporting
//!
//! Anomalies detected by the pipeline (TOFU bootstraps, duplicate identity
//! rows, validation and signature failures) are pushed out-of-band to an
//! alarm sink. Delivery is consumed through the [`AlarmSink`] trait: NATS
//! in production, log-only when no NATS connection is configured.
//!
//! A sink failure is an I/O failure like any other and aborts the request
//! being processed; there is no buffering or retry here.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::nats::NatsClient;
use crate::types::{CollectorError, Result};

/// Alarm descriptor delivered to the sink
#[derive(Debug, Clone, Serialize)]
pub struct Alarm {
    /// Originating subsystem
    pub caller: &'static str,
    /// Anomaly class, e.g. `TOFU`, `duplicated user`
    pub what: String,
    /// Supporting detail for the operator
    pub info: Value,
}

impl Alarm {
    /// Alarm raised by the event-processing pipeline
    pub fn events(what: impl Into<String>, info: Value) -> Self {
        Self {
            caller: "events",
            what: what.into(),
            info,
        }
    }
}

/// Out-of-band notification sink
#[async_trait]
pub trait AlarmSink: Send + Sync {
    async fn report(&self, alarm: Alarm) -> Result<()>;
}

/// Alarm sink publishing JSON descriptors to a NATS subject
pub struct NatsAlarmSink {
    client: NatsClient,
    subject: String,
}

impl NatsAlarmSink {
    pub fn new(client: NatsClient, subject: impl Into<String>) -> Self {
        Self {
            client,
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl AlarmSink for NatsAlarmSink {
    async fn report(&self, alarm: Alarm) -> Result<()> {
        let payload = serde_json::to_vec(&alarm)
            .map_err(|e| CollectorError::Alarm(format!("Alarm encode failed: {}", e)))?;
        self.client.publish(&self.subject, Bytes::from(payload)).await
    }
}

/// Log-only sink for dev mode, when no NATS connection is configured
#[derive(Debug, Default)]
pub struct LogAlarmSink;

#[async_trait]
impl AlarmSink for LogAlarmSink {
    async fn report(&self, alarm: Alarm) -> Result<()> {
        warn!(caller = alarm.caller, what = %alarm.what, "alarm raised (log-only sink)");
        Ok(())
    }
}
