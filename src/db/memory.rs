//! In-memory event store
//!
//! Used in dev mode when MongoDB is not reachable, and by the test suite.
//! Event records live in maps keyed by their deterministic id, so upserts
//! behave like the MongoDB replace-with-upsert path. Supporters live in a
//! plain list: the memory store has no unique index, which keeps the
//! duplicate-identity anomaly representable.

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::db::schemas::{HtmlDoc, ImpressionDoc, SupporterDoc, TimelineDoc};
use crate::db::store::EventStore;
use crate::types::Result;

/// Memory-backed event store
#[derive(Default)]
pub struct MemoryEventStore {
    supporters: RwLock<Vec<SupporterDoc>>,
    timelines: DashMap<String, TimelineDoc>,
    impressions: DashMap<String, ImpressionDoc>,
    htmls: DashMap<String, HtmlDoc>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of supporter rows currently held
    pub async fn supporter_count(&self) -> usize {
        self.supporters.read().await.len()
    }

    /// Fetch a supporter row by identity key (first match)
    pub async fn supporter(&self, user_id: i64, public_key: &str) -> Option<SupporterDoc> {
        self.supporters
            .read()
            .await
            .iter()
            .find(|s| s.user_id == user_id && s.public_key == public_key)
            .cloned()
    }

    pub fn timeline_count(&self) -> usize {
        self.timelines.len()
    }

    pub fn impression_count(&self) -> usize {
        self.impressions.len()
    }

    pub fn html_count(&self) -> usize {
        self.htmls.len()
    }

    pub fn timeline(&self, id: &str) -> Option<TimelineDoc> {
        self.timelines.get(id).map(|t| t.value().clone())
    }

    pub fn impression(&self, id: &str) -> Option<ImpressionDoc> {
        self.impressions.get(id).map(|i| i.value().clone())
    }

    pub fn html(&self, id: &str) -> Option<HtmlDoc> {
        self.htmls.get(id).map(|h| h.value().clone())
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn find_supporters(&self, user_id: i64, public_key: &str) -> Result<Vec<SupporterDoc>> {
        Ok(self
            .supporters
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id && s.public_key == public_key)
            .cloned()
            .collect())
    }

    async fn insert_supporter(&self, supporter: &SupporterDoc) -> Result<()> {
        self.supporters.write().await.push(supporter.clone());
        Ok(())
    }

    async fn upsert_supporter(&self, supporter: &SupporterDoc) -> Result<()> {
        let mut rows = self.supporters.write().await;
        match rows
            .iter_mut()
            .find(|s| s.user_id == supporter.user_id && s.public_key == supporter.public_key)
        {
            Some(existing) => *existing = supporter.clone(),
            None => rows.push(supporter.clone()),
        }
        Ok(())
    }

    async fn upsert_timelines(&self, docs: &[TimelineDoc]) -> Result<usize> {
        for doc in docs {
            self.timelines.insert(doc.id.clone(), doc.clone());
        }
        Ok(docs.len())
    }

    async fn upsert_impressions(&self, docs: &[ImpressionDoc]) -> Result<usize> {
        for doc in docs {
            self.impressions.insert(doc.id.clone(), doc.clone());
        }
        Ok(docs.len())
    }

    async fn upsert_htmls(&self, docs: &[HtmlDoc]) -> Result<usize> {
        for doc in docs {
            self.htmls.insert(doc.id.clone(), doc.clone());
        }
        Ok(docs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_upsert_supporter_replaces_by_identity() {
        let store = MemoryEventStore::new();
        let mut supporter = SupporterDoc::bootstrap(42, "PK", Utc::now());
        store.insert_supporter(&supporter).await.unwrap();

        supporter.version = Some("2.1.0".to_string());
        store.upsert_supporter(&supporter).await.unwrap();

        assert_eq!(store.supporter_count().await, 1);
        let row = store.supporter(42, "PK").await.unwrap();
        assert_eq!(row.version.as_deref(), Some("2.1.0"));
    }

    #[tokio::test]
    async fn test_insert_allows_duplicate_rows() {
        // No unique index here: the duplicate anomaly stays representable.
        let store = MemoryEventStore::new();
        let supporter = SupporterDoc::bootstrap(42, "PK", Utc::now());
        store.insert_supporter(&supporter).await.unwrap();
        store.insert_supporter(&supporter).await.unwrap();
        assert_eq!(store.find_supporters(42, "PK").await.unwrap().len(), 2);
    }
}
