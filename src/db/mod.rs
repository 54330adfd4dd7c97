//! Local embedded store for activity events.
//!
//! SQLite is the source of truth; all writes go through a dedicated worker
//! thread that owns the connection, with an async facade on top. The
//! remote mirror only ever sees events after they are durable here.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

mod migrations;

use crate::models::{
    ActivityEvent, Category, Classification, ClassificationSource,
};
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn category_from_str(value: &str) -> Result<Category> {
    match value {
        "academic" => Ok(Category::Academic),
        "productivity" => Ok(Category::Productivity),
        "neutral" => Ok(Category::Neutral),
        "non_academic" => Ok(Category::NonAcademic),
        _ => Err(anyhow!("unknown category '{value}'")),
    }
}

fn source_from_str(value: &str) -> Result<ClassificationSource> {
    match value {
        "stub" => Ok(ClassificationSource::Stub),
        "database" => Ok(ClassificationSource::Database),
        "rules" => Ok(ClassificationSource::Rules),
        "model" => Ok(ClassificationSource::Model),
        "user" => Ok(ClassificationSource::User),
        "api" => Ok(ClassificationSource::Api),
        _ => Err(anyhow!("unknown classification source '{value}'")),
    }
}

fn json_to_text(value: &Option<Value>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).context("failed to encode JSON column"))
        .transpose()
}

/// Outcome of persisting one inbound batch. `received_ids` covers both
/// newly inserted events and duplicates acknowledged by event_id;
/// `inserted` holds only the ids that were actually written (and therefore
/// need mirroring).
#[derive(Debug, Default, Clone)]
pub struct InsertSummary {
    pub received_ids: Vec<String>,
    pub inserted: HashSet<String>,
}

/// Activity event as read back from the store, classification joined in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredActivity {
    pub event_id: String,
    pub domain: String,
    pub title: String,
    pub active_time: i64,
    pub timestamp: DateTime<Utc>,
    pub classification: Option<Classification>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct CategoryStat {
    pub count: i64,
    pub time: i64,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ActivityStats {
    pub total_events: i64,
    pub total_active_time: i64,
    pub total_idle_time: i64,
    pub by_category: std::collections::HashMap<String, CategoryStat>,
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("focusd-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Persist one inbound batch in a single transaction. Events already
    /// present (by event_id) are acknowledged without re-insertion. Any
    /// insert failure rolls the whole batch back.
    pub async fn insert_activity_batch(
        &self,
        records: Vec<(ActivityEvent, Option<Classification>)>,
        user_id: Option<String>,
    ) -> Result<InsertSummary> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open batch transaction")?;

            let mut summary = InsertSummary::default();

            for (event, classification) in &records {
                let exists: bool = tx
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM activity_events WHERE event_id = ?1)",
                        params![event.event_id],
                        |row| row.get(0),
                    )
                    .with_context(|| {
                        format!("failed to check existing event {}", event.event_id)
                    })?;

                if exists {
                    summary.received_ids.push(event.event_id.clone());
                    continue;
                }

                let classification_id = match classification {
                    Some(c) => {
                        tx.execute(
                            "INSERT INTO classifications (category, confidence, source, created_at)
                             VALUES (?1, ?2, ?3, ?4)",
                            params![
                                c.category.as_str(),
                                c.confidence,
                                c.source.as_str(),
                                Utc::now().to_rfc3339(),
                            ],
                        )
                        .with_context(|| {
                            format!("failed to insert classification for {}", event.event_id)
                        })?;
                        Some(tx.last_insert_rowid())
                    }
                    None => None,
                };

                tx.execute(
                    "INSERT INTO activity_events (
                         event_id, user_id, session_id, source, activity_type,
                         timestamp, start_time, end_time,
                         url, domain, path, title,
                         app_name, app_path, window_title,
                         active_time, idle_time,
                         url_components, title_hints, engagement, context_data,
                         classification_id
                     ) VALUES (
                         ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                         ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22
                     )",
                    params![
                        event.event_id,
                        user_id,
                        event.session_id,
                        event.source.as_str(),
                        event.activity_type,
                        event.timestamp.to_rfc3339(),
                        event.start_time.to_rfc3339(),
                        event.end_time.as_ref().map(|dt| dt.to_rfc3339()),
                        event.url,
                        event.domain,
                        event.path,
                        event.title,
                        event.app_name,
                        event.app_path,
                        event.window_title,
                        event.active_time,
                        event.idle_time,
                        json_to_text(&event.url_components)?,
                        json_to_text(&event.title_hints)?,
                        json_to_text(&event.engagement)?,
                        json_to_text(&event.context_data())?,
                        classification_id,
                    ],
                )
                .with_context(|| format!("failed to insert event {}", event.event_id))?;

                summary.received_ids.push(event.event_id.clone());
                summary.inserted.insert(event.event_id.clone());
            }

            tx.commit().context("failed to commit activity batch")?;
            Ok(summary)
        })
        .await
    }

    /// Recent events, newest first, optionally filtered by session or a
    /// domain substring.
    pub async fn recent_events(
        &self,
        limit: i64,
        session_id: Option<String>,
        domain: Option<String>,
    ) -> Result<Vec<StoredActivity>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT e.event_id, e.domain, e.title, e.active_time, e.timestamp,
                        c.category, c.confidence, c.source
                 FROM activity_events e
                 LEFT JOIN classifications c ON c.id = e.classification_id
                 WHERE (?1 IS NULL OR e.session_id = ?1)
                   AND (?2 IS NULL OR instr(e.domain, ?2) > 0)
                 ORDER BY e.timestamp DESC
                 LIMIT ?3",
            )?;

            let mut rows = stmt.query(params![session_id, domain, limit])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(stored_activity_from_row(row)?);
            }
            Ok(events)
        })
        .await
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Option<StoredActivity>> {
        let event_id = event_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT e.event_id, e.domain, e.title, e.active_time, e.timestamp,
                        c.category, c.confidence, c.source
                 FROM activity_events e
                 LEFT JOIN classifications c ON c.id = e.classification_id
                 WHERE e.event_id = ?1",
            )?;

            let mut rows = stmt.query(params![event_id])?;
            if let Some(row) = rows.next()? {
                Ok(Some(stored_activity_from_row(row)?))
            } else {
                Ok(None)
            }
        })
        .await
    }

    /// Aggregate counts and active/idle time, with a per-category
    /// breakdown of classified events.
    pub async fn activity_stats(&self, session_id: Option<String>) -> Result<ActivityStats> {
        self.execute(move |conn| {
            let (total_events, total_active_time, total_idle_time) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(active_time), 0),
                        COALESCE(SUM(idle_time), 0)
                 FROM activity_events
                 WHERE (?1 IS NULL OR session_id = ?1)",
                params![session_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

            let mut stats = ActivityStats {
                total_events,
                total_active_time,
                total_idle_time,
                by_category: Default::default(),
            };

            let mut stmt = conn.prepare(
                "SELECT c.category, COUNT(*), COALESCE(SUM(e.active_time), 0)
                 FROM activity_events e
                 JOIN classifications c ON c.id = e.classification_id
                 WHERE (?1 IS NULL OR e.session_id = ?1)
                 GROUP BY c.category",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            while let Some(row) = rows.next()? {
                let category: String = row.get(0)?;
                stats.by_category.insert(
                    category,
                    CategoryStat {
                        count: row.get(1)?,
                        time: row.get(2)?,
                    },
                );
            }

            Ok(stats)
        })
        .await
    }
}

fn stored_activity_from_row(row: &rusqlite::Row<'_>) -> Result<StoredActivity> {
    let category: Option<String> = row.get(5)?;
    let classification = match category {
        Some(category) => Some(Classification {
            category: category_from_str(&category)?,
            confidence: row.get(6)?,
            source: source_from_str(&row.get::<_, String>(7)?)?,
        }),
        None => None,
    };

    Ok(StoredActivity {
        event_id: row.get(0)?,
        domain: row.get(1)?,
        title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        active_time: row.get(3)?,
        timestamp: parse_datetime(&row.get::<_, String>(4)?)?,
        classification,
    })
}
