//! MongoDB client and collection wrapper
//!
//! Typed collections with schema-declared indexes. Event records are
//! addressed by deterministic ids, so every write goes through
//! replace-with-upsert: resubmitting a batch lands on the same documents
//! instead of tripping duplicate-key errors.

use bson::{doc, Document};
use mongodb::{options::IndexOptions, Client, Collection, IndexModel};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::types::{CollectorError, Result};

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas that know their natural-key filter.
///
/// The filter identifies the one document a record may replace; paired with
/// deterministic ids this is what makes persistence idempotent.
pub trait UpsertFilter {
    fn upsert_filter(&self) -> Document;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| CollectorError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| CollectorError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + UpsertFilter,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + UpsertFilter,
{
    /// Create a new collection and apply indexes
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        // Apply indexes
        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<()> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| CollectorError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document
    pub async fn insert_one(&self, item: &T) -> Result<()> {
        self.inner
            .insert_one(item)
            .await
            .map_err(|e| CollectorError::Database(format!("Insert failed: {}", e)))?;

        Ok(())
    }

    /// Find documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>> {
        use futures_util::TryStreamExt;

        let cursor = self
            .inner
            .find(filter)
            .await
            .map_err(|e| CollectorError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| CollectorError::Database(format!("Cursor read failed: {}", e)))
    }

    /// Replace-with-upsert a single document at its natural key
    pub async fn upsert_one(&self, item: &T) -> Result<()> {
        self.inner
            .replace_one(item.upsert_filter(), item)
            .upsert(true)
            .await
            .map_err(|e| CollectorError::Database(format!("Upsert failed: {}", e)))?;

        Ok(())
    }

    /// Upsert a batch of documents, one replace per natural key.
    ///
    /// Returns how many documents the batch covered. The writes within one
    /// bucket are sequential; concurrency lives a level up, across buckets.
    pub async fn upsert_many(&self, items: &[T]) -> Result<usize> {
        for item in items {
            self.upsert_one(item).await?;
        }
        Ok(items.len())
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}
