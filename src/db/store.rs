//! Event store seam
//!
//! The pipeline talks to persistence through [`EventStore`]: supporter
//! lookup/bootstrap plus one grouped upsert per record kind. The MongoDB
//! implementation backs production; [`super::MemoryEventStore`] backs dev
//! mode and the test suite.

use async_trait::async_trait;
use bson::doc;

use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    HtmlDoc, ImpressionDoc, SupporterDoc, TimelineDoc, HTML_COLLECTION, IMPRESSION_COLLECTION,
    SUPPORTER_COLLECTION, TIMELINE_COLLECTION,
};
use crate::types::Result;

/// Storage operations the pipeline needs
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All supporter rows matching the compound identity key.
    ///
    /// More than one row is an integrity anomaly the caller must flag;
    /// the store reports what is there without masking it.
    async fn find_supporters(&self, user_id: i64, public_key: &str) -> Result<Vec<SupporterDoc>>;

    /// Insert a freshly bootstrapped supporter (TOFU)
    async fn insert_supporter(&self, supporter: &SupporterDoc) -> Result<()>;

    /// Upsert a supporter at its identity key (activity/version updates)
    async fn upsert_supporter(&self, supporter: &SupporterDoc) -> Result<()>;

    /// Upsert one batch of timeline records, returns the count covered
    async fn upsert_timelines(&self, docs: &[TimelineDoc]) -> Result<usize>;

    /// Upsert one batch of impression records, returns the count covered
    async fn upsert_impressions(&self, docs: &[ImpressionDoc]) -> Result<usize>;

    /// Upsert one batch of html snippets, returns the count covered
    async fn upsert_htmls(&self, docs: &[HtmlDoc]) -> Result<usize>;
}

/// MongoDB-backed event store
#[derive(Clone)]
pub struct MongoEventStore {
    supporters: MongoCollection<SupporterDoc>,
    timelines: MongoCollection<TimelineDoc>,
    impressions: MongoCollection<ImpressionDoc>,
    htmls: MongoCollection<HtmlDoc>,
}

impl MongoEventStore {
    /// Open the four collections and apply their indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            supporters: client.collection(SUPPORTER_COLLECTION).await?,
            timelines: client.collection(TIMELINE_COLLECTION).await?,
            impressions: client.collection(IMPRESSION_COLLECTION).await?,
            htmls: client.collection(HTML_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    async fn find_supporters(&self, user_id: i64, public_key: &str) -> Result<Vec<SupporterDoc>> {
        self.supporters
            .find_many(doc! { "userId": user_id, "publicKey": public_key })
            .await
    }

    async fn insert_supporter(&self, supporter: &SupporterDoc) -> Result<()> {
        self.supporters.insert_one(supporter).await
    }

    async fn upsert_supporter(&self, supporter: &SupporterDoc) -> Result<()> {
        self.supporters.upsert_one(supporter).await
    }

    async fn upsert_timelines(&self, docs: &[TimelineDoc]) -> Result<usize> {
        self.timelines.upsert_many(docs).await
    }

    async fn upsert_impressions(&self, docs: &[ImpressionDoc]) -> Result<usize> {
        self.impressions.upsert_many(docs).await
    }

    async fn upsert_htmls(&self, docs: &[HtmlDoc]) -> Result<usize> {
        self.htmls.upsert_many(docs).await
    }
}
