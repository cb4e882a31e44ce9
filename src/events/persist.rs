//! Batch persistence
//!
//! One grouped upsert per non-empty bucket plus exactly one supporter
//! activity upsert, all issued concurrently and joined. Any failed
//! sub-write fails the whole batch; there is no rollback of writes that
//! already committed — each bucket write stands on the storage layer's own
//! per-call guarantee.

use chrono::Utc;
use futures::future::{try_join_all, BoxFuture};
use serde::Serialize;
use tracing::debug;

use crate::db::schemas::SupporterDoc;
use crate::db::EventStore;
use crate::events::normalize::ParsedBatch;
use crate::types::Result;

/// Per-bucket write outcome returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub kind: &'static str,
    pub amount: usize,
}

/// Persist a parsed batch and refresh the supporter's activity record.
pub async fn write_batch(
    store: &dyn EventStore,
    batch: &ParsedBatch,
    mut supporter: SupporterDoc,
) -> Result<Vec<WriteSummary>> {
    let mut writes: Vec<BoxFuture<'_, Result<WriteSummary>>> = Vec::new();

    if !batch.htmls.is_empty() {
        writes.push(Box::pin(async move {
            let amount = store.upsert_htmls(&batch.htmls).await?;
            Ok(WriteSummary {
                kind: "htmls",
                amount,
            })
        }));
    }

    if !batch.impressions.is_empty() {
        writes.push(Box::pin(async move {
            let amount = store.upsert_impressions(&batch.impressions).await?;
            Ok(WriteSummary {
                kind: "impressions",
                amount,
            })
        }));
    }

    if !batch.timelines.is_empty() {
        writes.push(Box::pin(async move {
            let amount = store.upsert_timelines(&batch.timelines).await?;
            Ok(WriteSummary {
                kind: "timelines",
                amount,
            })
        }));
    }

    supporter.last_activity = Utc::now();
    writes.push(Box::pin(async move {
        store.upsert_supporter(&supporter).await?;
        Ok(WriteSummary {
            kind: "supporters",
            amount: 1,
        })
    }));

    debug!("issuing {} grouped writes", writes.len());
    try_join_all(writes).await
}
