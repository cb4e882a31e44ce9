//! Impression document schema
//!
//! One rendered feed item observed by the client. The stored record never
//! carries inline html; public impressions point at an html snippet through
//! `htmlId`.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, UpsertFilter};

/// Collection name for impressions
pub const IMPRESSION_COLLECTION: &str = "impressions";

/// Impression document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImpressionDoc {
    /// hash(clientTimelineId, userId, impressionOrder)
    pub id: String,

    /// hash(clientTimelineId, userId) - joins back to the timeline record
    pub timeline_id: String,

    /// Submitting supporter
    pub user_id: i64,

    /// Post visibility as observed by the client (`public` or other)
    pub visibility: String,

    /// Position within the timeline, used for ordering and dedup
    pub impression_order: i64,

    /// When the item was rendered, as reported by the client
    pub impression_time: DateTime<Utc>,

    /// Content-addressed id of the html snippet, set only for public posts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_id: Option<String>,
}

impl IntoIndexes for ImpressionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("impression_id_unique".to_string())
                        .build(),
                ),
            ),
            // Timeline reconstruction reads all impressions of a session
            // in order.
            (
                doc! { "timelineId": 1, "impressionOrder": 1 },
                Some(
                    IndexOptions::builder()
                        .name("impression_timeline_order".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl UpsertFilter for ImpressionDoc {
    fn upsert_filter(&self) -> Document {
        doc! { "id": &self.id }
    }
}
