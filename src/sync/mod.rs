//! Best-effort replication of locally durable activity events to a shared
//! remote store.
//!
//! The local store is the source of truth; this service mirrors events to
//! the remote analytics store asynchronously. If the remote side is
//! unreachable, documents are parked in an in-memory retry queue and the
//! caller is never blocked or failed — durability to the local store is
//! the only guarantee the API gives out.

mod document;
mod remote;

pub use document::{build_document, SyncDocument, SyncEnrichment};
pub use remote::{BulkOutcome, MongoRemoteStore, RemoteStore, COLLECTION_NAME};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const RETRY_INTERVAL: Duration = Duration::from_secs(60);
pub const MAX_RETRY_BATCH: usize = 100;

/// What happened to a single document handed to the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Delivered to the remote store.
    Synced,
    /// Parked in the retry queue; the background loop will deliver it.
    Queued,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSyncResult {
    pub synced: usize,
    pub failed: usize,
}

struct SyncShared<S> {
    store: S,
    connected: AtomicBool,
    retry_queue: Mutex<VecDeque<SyncDocument>>,
}

impl<S: RemoteStore> SyncShared<S> {
    fn enqueue_back(&self, documents: impl IntoIterator<Item = SyncDocument>) {
        let mut queue = self.retry_queue.lock().unwrap();
        queue.extend(documents);
    }

    /// Return a dequeued batch to the head of the queue, order preserved,
    /// so retries stay strictly FIFO.
    fn requeue_front(&self, documents: Vec<SyncDocument>) {
        let mut queue = self.retry_queue.lock().unwrap();
        for document in documents.into_iter().rev() {
            queue.push_front(document);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn sync_batch(&self, documents: Vec<SyncDocument>) -> BatchSyncResult {
        if documents.is_empty() {
            return BatchSyncResult::default();
        }

        if !self.is_connected() {
            let failed = documents.len();
            self.enqueue_back(documents);
            return BatchSyncResult { synced: 0, failed };
        }

        match self.store.upsert_many(&documents).await {
            Ok(outcome) => {
                info!(
                    "Mirror batch synced: {} succeeded, {} failed",
                    outcome.synced, outcome.failed
                );
                BatchSyncResult {
                    synced: outcome.synced,
                    failed: outcome.failed,
                }
            }
            Err(err) => {
                warn!("Mirror batch sync error, queueing {} documents: {err:#}", documents.len());
                let failed = documents.len();
                self.enqueue_back(documents);
                BatchSyncResult { synced: 0, failed }
            }
        }
    }

    /// One pass of the retry loop. Skips when there is nothing to do or the
    /// service is disconnected; a failed probe puts the dequeued batch back
    /// at the front untouched. Items that fail again inside `sync_batch`
    /// are logged but not re-queued by this path.
    async fn run_retry_cycle(&self) {
        if !self.is_connected() {
            return;
        }

        let batch: Vec<SyncDocument> = {
            let mut queue = self.retry_queue.lock().unwrap();
            if queue.is_empty() {
                return;
            }
            let take = queue.len().min(MAX_RETRY_BATCH);
            queue.drain(..take).collect()
        };

        info!("Retrying {} queued mirror documents", batch.len());

        if let Err(err) = self.store.ping().await {
            warn!(
                "Remote store unreachable, requeueing {} documents: {err:#}",
                batch.len()
            );
            self.connected.store(false, Ordering::SeqCst);
            self.requeue_front(batch);
            return;
        }

        let result = self.sync_batch(batch).await;
        if result.failed > 0 {
            warn!("{} mirror documents still failing after retry", result.failed);
        }
    }
}

async fn retry_loop<S: RemoteStore>(shared: Arc<SyncShared<S>>, cancel: CancellationToken) {
    let mut ticker = interval(RETRY_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the first retry
    // happens a full interval after startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                shared.run_retry_cycle().await;
            }
            _ = cancel.cancelled() => {
                info!("Mirror retry loop shutting down");
                break;
            }
        }
    }
}

/// Mirrors activity documents into a remote store with at-least-once
/// delivery. Holds the retry queue and the background retry task.
pub struct SyncService<S: RemoteStore> {
    shared: Arc<SyncShared<S>>,
    cancel: CancellationToken,
    retry_task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: RemoteStore> SyncService<S> {
    /// Handshake with the remote store, provision indexes and start the
    /// retry loop. A failed handshake leaves the service disconnected and
    /// is not fatal to the host process: documents queue up locally.
    pub async fn connect(store: S) -> Arc<Self> {
        let service = Arc::new(Self {
            shared: Arc::new(SyncShared {
                store,
                connected: AtomicBool::new(false),
                retry_queue: Mutex::new(VecDeque::new()),
            }),
            cancel: CancellationToken::new(),
            retry_task: Mutex::new(None),
        });

        match service.handshake().await {
            Ok(()) => {
                service.shared.connected.store(true, Ordering::SeqCst);
                info!("Connected to remote activity mirror");

                let shared = service.shared.clone();
                let cancel = service.cancel.clone();
                let handle = tokio::spawn(retry_loop(shared, cancel));
                *service.retry_task.lock().unwrap() = Some(handle);
            }
            Err(err) => {
                warn!("Remote mirror unavailable, starting disconnected: {err:#}");
            }
        }

        service
    }

    async fn handshake(&self) -> Result<()> {
        self.shared.store.ping().await?;
        self.shared.store.ensure_indexes().await?;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Number of documents waiting in the retry queue.
    pub fn pending_count(&self) -> usize {
        self.shared.retry_queue.lock().unwrap().len()
    }

    /// Mirror a single document. Never fails: a disconnected service or a
    /// failed write parks the document in the retry queue.
    pub async fn sync_one(&self, document: SyncDocument) -> SyncOutcome {
        if !self.is_connected() {
            self.shared.enqueue_back([document]);
            return SyncOutcome::Queued;
        }

        match self.shared.store.upsert_one(&document).await {
            Ok(()) => SyncOutcome::Synced,
            Err(err) => {
                warn!(
                    "Failed to mirror event {}, queueing for retry: {err:#}",
                    document.event_id
                );
                self.shared.enqueue_back([document]);
                SyncOutcome::Queued
            }
        }
    }

    /// Mirror a batch of documents. Partial failures are reported in the
    /// result but only a total failure (or a disconnected service) parks
    /// the batch in the retry queue.
    pub async fn sync_batch(&self, documents: Vec<SyncDocument>) -> BatchSyncResult {
        self.shared.sync_batch(documents).await
    }

    /// Stop the retry loop (waiting for it to finish), drop the connection
    /// and mark the service disconnected. Safe to call when the handshake
    /// never succeeded.
    pub async fn close(&self) {
        self.cancel.cancel();

        let handle = self.retry_task.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!("Mirror retry task failed to join: {err}");
            }
        }

        self.shared.connected.store(false, Ordering::SeqCst);
        info!("Remote mirror connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivitySource;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct FakeInner {
        reachable: AtomicBool,
        failing_writes: AtomicBool,
        fail_batch_entirely: AtomicBool,
        documents: Mutex<HashMap<String, SyncDocument>>,
        write_attempts: AtomicUsize,
    }

    #[derive(Clone, Default)]
    struct FakeStore(Arc<FakeInner>);

    impl FakeStore {
        fn reachable() -> Self {
            let store = Self::default();
            store.0.reachable.store(true, Ordering::SeqCst);
            store
        }

        fn unreachable() -> Self {
            Self::default()
        }

        fn set_reachable(&self, value: bool) {
            self.0.reachable.store(value, Ordering::SeqCst);
        }

        fn set_failing_writes(&self, value: bool) {
            self.0.failing_writes.store(value, Ordering::SeqCst);
        }

        fn set_fail_batch_entirely(&self, value: bool) {
            self.0.fail_batch_entirely.store(value, Ordering::SeqCst);
        }

        fn stored(&self) -> usize {
            self.0.documents.lock().unwrap().len()
        }

        fn contains(&self, event_id: &str) -> bool {
            self.0.documents.lock().unwrap().contains_key(event_id)
        }
    }

    impl RemoteStore for FakeStore {
        async fn ping(&self) -> Result<()> {
            if self.0.reachable.load(Ordering::SeqCst) {
                Ok(())
            } else {
                anyhow::bail!("fake store unreachable")
            }
        }

        async fn ensure_indexes(&self) -> Result<()> {
            Ok(())
        }

        async fn upsert_one(&self, document: &SyncDocument) -> Result<()> {
            self.0.write_attempts.fetch_add(1, Ordering::SeqCst);
            if self.0.failing_writes.load(Ordering::SeqCst) {
                anyhow::bail!("fake write failure");
            }
            self.0
                .documents
                .lock()
                .unwrap()
                .insert(document.event_id.clone(), document.clone());
            Ok(())
        }

        async fn upsert_many(&self, documents: &[SyncDocument]) -> Result<BulkOutcome> {
            if self.0.fail_batch_entirely.load(Ordering::SeqCst) {
                anyhow::bail!("fake connection dropped mid-batch");
            }
            let mut outcome = BulkOutcome::default();
            for document in documents {
                match self.upsert_one(document).await {
                    Ok(()) => outcome.synced += 1,
                    Err(_) => outcome.failed += 1,
                }
            }
            Ok(outcome)
        }
    }

    fn doc(event_id: &str) -> SyncDocument {
        let now = Utc::now();
        SyncDocument {
            event_id: event_id.to_string(),
            user_id: "user-1".to_string(),
            session_id: None,
            source: ActivitySource::Browser,
            activity_type: "webpage".to_string(),
            timestamp: now,
            start_time: now,
            end_time: None,
            url: "https://example.org".to_string(),
            domain: "example.org".to_string(),
            path: String::new(),
            title: String::new(),
            app_name: None,
            app_path: None,
            window_title: None,
            active_time: 1,
            idle_time: 0,
            classification: None,
            enrichment: SyncEnrichment::default(),
            synced_at: now,
        }
    }

    #[tokio::test]
    async fn sync_one_is_idempotent_by_event_id() {
        let store = FakeStore::reachable();
        let service = SyncService::connect(store.clone()).await;

        assert_eq!(service.sync_one(doc("evt-1")).await, SyncOutcome::Synced);
        assert_eq!(service.sync_one(doc("evt-1")).await, SyncOutcome::Synced);

        assert_eq!(store.stored(), 1);
        service.close().await;
    }

    #[tokio::test]
    async fn unreachable_store_queues_instead_of_failing() {
        let store = FakeStore::unreachable();
        let service = SyncService::connect(store.clone()).await;

        assert!(!service.is_connected());
        assert_eq!(service.sync_one(doc("evt-1")).await, SyncOutcome::Queued);
        assert_eq!(service.pending_count(), 1);
        assert_eq!(store.stored(), 0);

        service.close().await;
    }

    #[tokio::test]
    async fn failed_write_queues_for_retry() {
        let store = FakeStore::reachable();
        let service = SyncService::connect(store.clone()).await;

        store.set_failing_writes(true);
        assert_eq!(service.sync_one(doc("evt-1")).await, SyncOutcome::Queued);
        assert_eq!(service.pending_count(), 1);

        service.close().await;
    }

    #[tokio::test]
    async fn empty_batch_is_trivial() {
        let store = FakeStore::reachable();
        let service = SyncService::connect(store).await;

        let result = service.sync_batch(Vec::new()).await;
        assert_eq!(result, BatchSyncResult { synced: 0, failed: 0 });

        service.close().await;
    }

    #[tokio::test]
    async fn disconnected_batch_is_fully_queued() {
        let store = FakeStore::unreachable();
        let service = SyncService::connect(store).await;

        let result = service
            .sync_batch(vec![doc("a"), doc("b"), doc("c")])
            .await;

        assert_eq!(result, BatchSyncResult { synced: 0, failed: 3 });
        assert_eq!(service.pending_count(), 3);

        service.close().await;
    }

    #[tokio::test]
    async fn total_batch_failure_requeues_everything() {
        let store = FakeStore::reachable();
        let service = SyncService::connect(store.clone()).await;

        store.set_fail_batch_entirely(true);
        let result = service.sync_batch(vec![doc("a"), doc("b")]).await;

        assert_eq!(result, BatchSyncResult { synced: 0, failed: 2 });
        assert_eq!(service.pending_count(), 2);

        service.close().await;
    }

    #[tokio::test]
    async fn partial_batch_failure_reports_counts_without_requeueing() {
        let store = FakeStore::reachable();
        let service = SyncService::connect(store.clone()).await;

        let mut batch = vec![doc("a"), doc("b")];
        // Make the second write fail by flipping the flag after seeding the
        // first document directly.
        service.sync_one(batch.remove(0)).await;
        store.set_failing_writes(true);

        let result = service.sync_batch(batch).await;
        assert_eq!(result, BatchSyncResult { synced: 0, failed: 1 });
        assert_eq!(service.pending_count(), 0);

        service.close().await;
    }

    #[tokio::test]
    async fn retry_cycle_delivers_queued_documents_in_order() {
        let store = FakeStore::reachable();
        let service = SyncService::connect(store.clone()).await;

        store.set_failing_writes(true);
        service.sync_one(doc("a")).await;
        service.sync_one(doc("b")).await;
        assert_eq!(service.pending_count(), 2);

        store.set_failing_writes(false);
        service.shared.run_retry_cycle().await;

        assert_eq!(service.pending_count(), 0);
        assert!(store.contains("a"));
        assert!(store.contains("b"));

        service.close().await;
    }

    #[tokio::test]
    async fn failed_probe_requeues_batch_at_front_and_disconnects() {
        let store = FakeStore::reachable();
        let service = SyncService::connect(store.clone()).await;

        store.set_failing_writes(true);
        service.sync_one(doc("a")).await;
        service.sync_one(doc("b")).await;
        service.sync_one(doc("c")).await;

        store.set_reachable(false);
        service.shared.run_retry_cycle().await;

        assert!(!service.is_connected());
        assert_eq!(service.pending_count(), 3);
        // Order is preserved for the next retry.
        let ids: Vec<String> = service
            .shared
            .retry_queue
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.event_id.clone())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        service.close().await;
    }

    #[tokio::test]
    async fn retry_cycle_skips_while_disconnected() {
        let store = FakeStore::unreachable();
        let service = SyncService::connect(store.clone()).await;

        service.sync_one(doc("a")).await;
        service.shared.run_retry_cycle().await;

        // Nothing drained, nothing attempted.
        assert_eq!(service.pending_count(), 1);
        assert_eq!(store.0.write_attempts.load(Ordering::SeqCst), 0);

        service.close().await;
    }

    #[tokio::test]
    async fn documents_failing_a_second_time_are_dropped_from_the_queue() {
        // Known gap: a successful probe followed by per-item write failures
        // reports the failures but does not re-queue them.
        let store = FakeStore::reachable();
        let service = SyncService::connect(store.clone()).await;

        store.set_failing_writes(true);
        service.sync_one(doc("a")).await;
        assert_eq!(service.pending_count(), 1);

        service.shared.run_retry_cycle().await;

        assert_eq!(service.pending_count(), 0);
        assert!(!store.contains("a"));

        service.close().await;
    }

    #[tokio::test]
    async fn queue_conserves_documents_across_failed_attempts() {
        let store = FakeStore::reachable();
        let service = SyncService::connect(store.clone()).await;

        store.set_failing_writes(true);
        for id in ["a", "b", "c", "d"] {
            service.sync_one(doc(id)).await;
        }

        // Probe failures bounce the batch back without losing anything.
        store.set_reachable(false);
        service.shared.run_retry_cycle().await;
        service.shared.run_retry_cycle().await;
        assert_eq!(store.stored() + service.pending_count(), 4);

        // Recovery drains the queue into the store.
        store.set_reachable(true);
        store.set_failing_writes(false);
        service.shared.connected.store(true, Ordering::SeqCst);
        service.shared.run_retry_cycle().await;
        assert_eq!(store.stored(), 4);
        assert_eq!(service.pending_count(), 0);

        service.close().await;
    }

    #[tokio::test]
    async fn close_is_safe_when_never_connected() {
        let store = FakeStore::unreachable();
        let service = SyncService::connect(store).await;
        service.close().await;
        assert!(!service.is_connected());
    }
}
