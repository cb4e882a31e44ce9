//! Html snippet document schema
//!
//! Raw markup captured from a public impression, content-addressed on the
//! html bytes. Snippets exist only for public posts; the normalizer
//! discards html attached to anything else before it can reach storage.

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, UpsertFilter};

/// Collection name for html snippets
pub const HTML_COLLECTION: &str = "htmls";

/// Html snippet document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HtmlDoc {
    /// hash(htmlContent) - identical markup dedupes across submissions
    pub id: String,

    /// When the collector accepted the snippet
    pub saving_time: DateTime<Utc>,

    /// Submitting supporter
    pub user_id: i64,

    /// Impression this snippet was captured from
    pub impression_id: String,

    /// Timeline the impression belongs to
    pub timeline_id: String,

    /// Raw markup
    pub html: String,
}

impl IntoIndexes for HtmlDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "id": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("html_id_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl UpsertFilter for HtmlDoc {
    fn upsert_filter(&self) -> Document {
        doc! { "id": &self.id }
    }
}
