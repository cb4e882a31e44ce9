//! Timeline document schema
//!
//! One browsing session on the observed feed.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, UpsertFilter};

/// Collection name for timelines
pub const TIMELINE_COLLECTION: &str = "timelines";

/// Timeline document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TimelineDoc {
    /// hash(clientEventId, userId) - resubmission collides to the same id
    pub id: String,

    /// Session start as reported by the client
    pub start_time: DateTime<Utc>,

    /// Submitting supporter
    pub user_id: i64,

    /// Coarse location code or redaction marker
    pub geoip: String,

    /// Present (true) only when the observed page is not the feed root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonfeed: Option<bool>,

    /// Experiment tag passed through from the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<String>,
}

impl IntoIndexes for TimelineDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("timeline_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl UpsertFilter for TimelineDoc {
    fn upsert_filter(&self) -> Document {
        doc! { "id": &self.id }
    }
}
