pub mod components;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod registry;
pub mod sync;
pub mod user;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde_json::{json, Value};

use crate::components::load_all_components;
use crate::config::Settings;
use crate::db::Database;
use crate::models::{ActivityBatch, ActivityEvent, BatchOutcome, Classification};
use crate::pipeline::Pipeline;
use crate::registry::ComponentRegistry;
use crate::sync::{build_document, MongoRemoteStore, SyncService};
use crate::user::UserManager;

pub const DB_FILE: &str = "focusapp.sqlite3";

/// Initialize logging (reads RUST_LOG env var).
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

/// Long-lived application state: local store, component registry, user
/// identity and the optional remote mirror.
pub struct Backend {
    settings: Settings,
    db: Database,
    registry: Arc<ComponentRegistry>,
    user: UserManager,
    sync: Option<Arc<SyncService<MongoRemoteStore>>>,
}

impl Backend {
    /// Brings up the full stack: data directory, SQLite store, component
    /// registry, user identity and (when enabled) the remote sync
    /// service. Sync connection failures are logged, never fatal.
    pub async fn start(settings: Settings) -> Result<Self> {
        std::fs::create_dir_all(&settings.data_dir).with_context(|| {
            format!(
                "failed to create data dir {}",
                settings.data_dir.display()
            )
        })?;

        let db = Database::new(settings.data_dir.join(DB_FILE))?;
        let user = UserManager::load_or_create(&settings.data_dir)?;

        let registry = Arc::new(ComponentRegistry::new());
        load_all_components(&registry, &settings.component_config)?;

        let sync = if settings.remote_sync.enabled {
            match MongoRemoteStore::connect(
                &settings.remote_sync.uri,
                &settings.remote_sync.database,
            )
            .await
            {
                Ok(store) => Some(SyncService::connect(store).await),
                Err(err) => {
                    warn!("Remote sync unavailable: {err:#}");
                    None
                }
            }
        } else {
            info!("Remote sync disabled");
            None
        };

        info!(
            "Backend started for user {} (data dir {})",
            user.user_id(),
            settings.data_dir.display()
        );

        Ok(Self {
            settings,
            db,
            registry,
            user,
            sync,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn user_id(&self) -> &str {
        self.user.user_id()
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(Arc::clone(&self.registry))
    }

    /// Ingests one batch from a collector: classify each event, persist
    /// the whole batch in one transaction, then mirror the newly inserted
    /// events to the remote store in the background.
    ///
    /// Classification failures degrade to storing the event without a
    /// classification; only a local persistence failure fails the batch.
    pub async fn handle_activity_batch(&self, batch: ActivityBatch) -> Result<BatchOutcome> {
        let mut errors: Vec<String> = Vec::new();
        let mut records: Vec<(ActivityEvent, Option<Classification>)> =
            Vec::with_capacity(batch.events.len());

        for event in batch.events {
            let classification = match self.classify_event(&event) {
                Ok(classification) => Some(classification),
                Err(err) => {
                    warn!("Classification failed for event {}: {err:#}", event.event_id);
                    errors.push(format!("{}: {err:#}", event.event_id));
                    None
                }
            };
            records.push((event, classification));
        }

        let summary = self
            .db
            .insert_activity_batch(records.clone(), Some(self.user.user_id().to_string()))
            .await
            .context("failed to persist activity batch")?;

        if let Some(sync) = &self.sync {
            let documents: Vec<_> = records
                .iter()
                .filter(|(event, _)| summary.inserted.contains(&event.event_id))
                .map(|(event, classification)| {
                    build_document(event, classification.as_ref(), self.user.user_id())
                })
                .collect();

            if !documents.is_empty() {
                let sync = Arc::clone(sync);
                tokio::spawn(async move {
                    let result = sync.sync_batch(documents).await;
                    if result.failed > 0 {
                        warn!(
                            "Remote mirror deferred {} of {} events",
                            result.failed,
                            result.synced + result.failed
                        );
                    }
                });
            }
        }

        Ok(BatchOutcome {
            success: true,
            received_count: summary.received_ids.len(),
            received_ids: summary.received_ids,
            errors: if errors.is_empty() {
                None
            } else {
                Some(errors)
            },
        })
    }

    fn classify_event(&self, event: &ActivityEvent) -> Result<Classification> {
        let input = json!({
            "domain": event.domain,
            "url": event.url,
            "title": event.title,
            "active_time": event.active_time,
            "path": event.path,
            "source": event.source,
            "activity_type": event.activity_type,
            "app_name": event.app_name,
            "app_path": event.app_path,
            "window_title": event.window_title,
            "youtube_context": event.youtube_context,
            "google_context": event.google_context,
            "social_context": event.social_context,
        });

        let output = self.registry.call("classification", &input)?;
        serde_json::from_value(output).context("classifier returned unexpected output shape")
    }

    /// Health snapshot for diagnostics: component statuses plus the sync
    /// service's view of the remote store.
    pub fn health(&self) -> Value {
        let statuses = self.registry.get_all_status();
        json!({
            "status": "healthy",
            "app": self.settings.app_name,
            "version": self.settings.app_version,
            "component_count": statuses.len(),
            "components": statuses,
            "sync": {
                "enabled": self.sync.is_some(),
                "connected": self.sync.as_ref().is_some_and(|s| s.is_connected()),
                "pending": self.sync.as_ref().map_or(0, |s| s.pending_count()),
            },
        })
    }

    /// Stops background work. The database worker thread is torn down when
    /// the last `Database` handle drops.
    pub async fn shutdown(&self) {
        if let Some(sync) = &self.sync {
            sync.close().await;
        }
        info!("Backend shut down");
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        if let Some(sync) = &self.sync {
            if sync.is_connected() {
                error!("Backend dropped while sync still connected; call shutdown() first");
            }
        }
    }
}
