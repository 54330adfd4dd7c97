use std::future::Future;

use anyhow::{Context, Result};
use log::warn;
use mongodb::bson::{self, doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

use super::document::SyncDocument;

pub const COLLECTION_NAME: &str = "activity_events";

/// Per-item result of an unordered batch upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub synced: usize,
    pub failed: usize,
}

/// Seam between the sync service and the remote store. The production
/// implementation talks to MongoDB Atlas; tests drive the service with an
/// in-memory store.
pub trait RemoteStore: Send + Sync + 'static {
    /// Liveness probe.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    /// Provision the indexes the analytics queries depend on. Idempotent.
    fn ensure_indexes(&self) -> impl Future<Output = Result<()>> + Send;

    /// Idempotent upsert keyed by `event_id`.
    fn upsert_one(&self, document: &SyncDocument) -> impl Future<Output = Result<()>> + Send;

    /// Unordered batch upsert. `Ok` carries per-item counts (one item
    /// failing must not abort the others); `Err` means the whole batch
    /// failed, e.g. the connection dropped mid-call.
    fn upsert_many(
        &self,
        documents: &[SyncDocument],
    ) -> impl Future<Output = Result<BulkOutcome>> + Send;
}

/// MongoDB-backed remote store for the shared analytics mirror.
pub struct MongoRemoteStore {
    client: Client,
    collection: Collection<Document>,
}

impl MongoRemoteStore {
    /// Build the client handle. The driver connects lazily, so reachability
    /// is only established by the first `ping`.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("invalid MongoDB connection string")?;
        let collection = client.database(db_name).collection::<Document>(COLLECTION_NAME);
        Ok(Self { client, collection })
    }

    async fn upsert(&self, document: &SyncDocument) -> Result<()> {
        let body = bson::to_document(document).context("failed to encode sync document")?;
        self.collection
            .update_one(
                doc! { "event_id": &document.event_id },
                doc! { "$set": body },
            )
            .upsert(true)
            .await
            .with_context(|| format!("upsert failed for event {}", document.event_id))?;
        Ok(())
    }
}

impl RemoteStore for MongoRemoteStore {
    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "event_id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder().keys(doc! { "user_id": 1 }).build(),
            IndexModel::builder().keys(doc! { "timestamp": 1 }).build(),
            IndexModel::builder().keys(doc! { "domain": 1 }).build(),
            IndexModel::builder().keys(doc! { "source": 1 }).build(),
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "timestamp": -1 })
                .build(),
        ];

        self.collection
            .create_indexes(indexes)
            .await
            .context("failed to create mirror indexes")?;
        Ok(())
    }

    async fn upsert_one(&self, document: &SyncDocument) -> Result<()> {
        self.upsert(document).await
    }

    async fn upsert_many(&self, documents: &[SyncDocument]) -> Result<BulkOutcome> {
        // The collection API has no unordered bulk helper compatible with
        // older servers, so the upserts go out one by one and per-item
        // failures are counted rather than aborting the batch.
        let mut outcome = BulkOutcome::default();
        for document in documents {
            match self.upsert(document).await {
                Ok(()) => outcome.synced += 1,
                Err(err) => {
                    warn!("Mirror upsert failed for event {}: {err:#}", document.event_id);
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }
}
