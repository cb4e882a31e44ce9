//! Supporter resolution
//!
//! Looks up the claimed identity by (userId, publicKey). First contact
//! bootstraps a record trust-on-first-use and raises a `TOFU` alarm;
//! duplicate rows are an integrity anomaly that gets alarmed and then
//! tolerated by taking the first match. The unique compound index on the
//! supporters collection is what keeps two racing bootstraps from both
//! committing; the resolver itself does not lock.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::alarms::{Alarm, AlarmSink};
use crate::db::schemas::SupporterDoc;
use crate::db::EventStore;
use crate::events::headers::RequestContext;
use crate::types::{CollectorError, Result};

/// Resolve the submitting supporter, bootstrapping on first contact.
pub async fn resolve_supporter(
    store: &dyn EventStore,
    alarms: &dyn AlarmSink,
    ctx: &RequestContext,
) -> Result<SupporterDoc> {
    let user_id = match ctx.supporter_id.parse::<i64>() {
        Ok(id) => id,
        Err(_) => {
            warn!("unparseable supporter id {:?}", ctx.supporter_id);
            alarms
                .report(Alarm::events("Validation fail", context_info(ctx)))
                .await?;
            return Err(CollectorError::Validation(format!(
                "supporter id {:?} is not an integer",
                ctx.supporter_id
            )));
        }
    };

    let matches = store.find_supporters(user_id, &ctx.public_key).await?;

    let Some(first) = matches.first().cloned() else {
        info!("unknown supporter {}: TOFU bootstrap", user_id);
        let supporter = SupporterDoc::bootstrap(user_id, &ctx.public_key, Utc::now());
        store.insert_supporter(&supporter).await?;
        alarms
            .report(Alarm::events(
                "TOFU",
                serde_json::to_value(&supporter).unwrap_or_default(),
            ))
            .await?;
        return Ok(supporter);
    };

    if matches.len() > 1 {
        warn!(
            "duplicated supporter rows: {} matches for ({}, {})",
            matches.len(),
            user_id,
            ctx.public_key
        );
        alarms
            .report(Alarm::events(
                "duplicated user",
                serde_json::to_value(&matches).unwrap_or_default(),
            ))
            .await?;
    }

    Ok(first)
}

/// Header context as alarm detail, with the signature value elided
fn context_info(ctx: &RequestContext) -> Value {
    json!({
        "supporterId": ctx.supporter_id,
        "publicKey": ctx.public_key,
        "version": ctx.version,
        "build": ctx.build,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryEventStore;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct RecordingSink(Mutex<Vec<Alarm>>);

    impl RecordingSink {
        fn new() -> Self {
            Self(Mutex::new(Vec::new()))
        }

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

    fn ctx(supporter_id: &str, public_key: &str) -> RequestContext {
        RequestContext {
            length: "10".to_string(),
            build: "b1".to_string(),
            version: "2.1.0".to_string(),
            supporter_id: supporter_id.to_string(),
            public_key: public_key.to_string(),
            signature: "SIG".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_contact_bootstraps_once_with_tofu_alarm() {
        let store = MemoryEventStore::new();
        let sink = RecordingSink::new();

        let supporter = resolve_supporter(&store, &sink, &ctx("42", "PK"))
            .await
            .unwrap();

        assert!(supporter.tofu);
        assert_eq!(store.supporter_count().await, 1);
        assert_eq!(sink.whats().await, vec!["TOFU".to_string()]);
    }

    #[tokio::test]
    async fn test_known_supporter_resolves_without_alarms() {
        let store = MemoryEventStore::new();
        let sink = RecordingSink::new();
        store
            .insert_supporter(&SupporterDoc::bootstrap(42, "PK", Utc::now()))
            .await
            .unwrap();

        let supporter = resolve_supporter(&store, &sink, &ctx("42", "PK"))
            .await
            .unwrap();

        assert_eq!(supporter.user_id, 42);
        assert!(sink.whats().await.is_empty());
        assert_eq!(store.supporter_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_rows_alarm_and_first_match_wins() {
        let store = MemoryEventStore::new();
        let sink = RecordingSink::new();
        let mut older = SupporterDoc::bootstrap(42, "PK", Utc::now());
        older.version = Some("first".to_string());
        store.insert_supporter(&older).await.unwrap();
        store
            .insert_supporter(&SupporterDoc::bootstrap(42, "PK", Utc::now()))
            .await
            .unwrap();

        let supporter = resolve_supporter(&store, &sink, &ctx("42", "PK"))
            .await
            .unwrap();

        assert_eq!(supporter.version.as_deref(), Some("first"));
        assert_eq!(sink.whats().await, vec!["duplicated user".to_string()]);
    }

    #[tokio::test]
    async fn test_non_numeric_supporter_id_fails_validation() {
        let store = MemoryEventStore::new();
        let sink = RecordingSink::new();

        let err = resolve_supporter(&store, &sink, &ctx("not-a-number", "PK"))
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::Validation(_)));
        assert_eq!(sink.whats().await, vec!["Validation fail".to_string()]);
        assert_eq!(store.supporter_count().await, 0);
    }
}
