//! Supporter document schema
//!
//! The authenticated submitting client, keyed by (userId, publicKey).

use bson::{doc, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, UpsertFilter};
use crate::ids;

/// Collection name for supporters
pub const SUPPORTER_COLLECTION: &str = "supporters";

/// Supporter document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SupporterDoc {
    /// Numeric identifier assigned by the browser extension
    pub user_id: i64,

    /// Base58-encoded Ed25519 public key
    pub public_key: String,

    /// Secret derived once at bootstrap
    pub user_secret: String,

    /// Last client software version seen for this supporter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// When the key pair was first recorded
    pub key_time: DateTime<Utc>,

    /// Last accepted submission
    pub last_activity: DateTime<Utc>,

    /// True when the record was bootstrapped on first contact rather than
    /// through registration
    #[serde(default)]
    pub tofu: bool,
}

impl SupporterDoc {
    /// Bootstrap a supporter from first-seen credentials (TOFU)
    pub fn bootstrap(user_id: i64, public_key: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            public_key: public_key.to_string(),
            user_secret: ids::supporter_secret(public_key, user_id, now),
            version: None,
            key_time: now,
            last_activity: now,
            tofu: true,
        }
    }
}

impl IntoIndexes for SupporterDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // The compound key the resolver looks up by. Unique, so two
            // racing TOFU bootstraps cannot both commit a row.
            (
                doc! { "userId": 1, "publicKey": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("supporter_identity_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl UpsertFilter for SupporterDoc {
    fn upsert_filter(&self) -> Document {
        doc! { "userId": self.user_id, "publicKey": &self.public_key }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_marks_tofu() {
        let now = Utc::now();
        let supporter = SupporterDoc::bootstrap(42, "PK", now);
        assert!(supporter.tofu);
        assert_eq!(supporter.key_time, now);
        assert_eq!(supporter.last_activity, now);
        assert!(supporter.version.is_none());
        assert!(!supporter.user_secret.is_empty());
    }

    #[test]
    fn test_wire_field_names() {
        let now = Utc::now();
        let value = serde_json::to_value(SupporterDoc::bootstrap(42, "PK", now)).unwrap();
        assert_eq!(value["userId"], 42);
        assert_eq!(value["publicKey"], "PK");
        assert!(value.get("userSecret").is_some());
        assert!(value.get("lastActivity").is_some());
    }
}
