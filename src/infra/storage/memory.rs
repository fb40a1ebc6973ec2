//! In-memory storage engine.
//!
//! Records are kept as JSON documents in a shared committed map; every
//! session layers a private overlay of pending writes (tombstones for
//! deletes) on top of it. Commit applies the overlay, rollback clears it,
//! and dropping a session discards it - uncommitted work is never persisted.
//!
//! Suited to tests and same-process use, mirroring how the SQL engine
//! behaves: session-local read-your-writes, durability only after commit.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{Filter, RecordStore, Session, SessionFactory, StoredRecord};
use crate::errors::{AppError, AppResult};

/// collection -> id -> stored document
type Collections = HashMap<String, BTreeMap<Uuid, Value>>;
/// id -> pending write (None = delete tombstone)
type Changes = HashMap<Uuid, Option<Value>>;
/// collection -> pending writes
type Overlay = HashMap<String, Changes>;

const SESSION_CLOSED: &str = "storage session already closed";

/// Shared engine state plus the session factory for it.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    committed: Arc<RwLock<Collections>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionFactory for MemoryEngine {
    type Session = MemorySession;

    async fn open_session(&self) -> AppResult<Arc<MemorySession>> {
        Ok(Arc::new(MemorySession {
            committed: self.committed.clone(),
            overlay: Mutex::new(Some(Overlay::new())),
        }))
    }
}

/// One transactional session over the shared committed state.
pub struct MemorySession {
    committed: Arc<RwLock<Collections>>,
    /// None once closed.
    overlay: Mutex<Option<Overlay>>,
}

impl std::fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySession").finish_non_exhaustive()
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn commit(&self) -> AppResult<()> {
        let mut overlay_guard = self.overlay.lock().await;
        let overlay = overlay_guard
            .as_mut()
            .ok_or(AppError::IllegalState(SESSION_CLOSED))?;

        let mut committed = self.committed.write().await;
        for (collection, changes) in overlay.drain() {
            let rows = committed.entry(collection).or_default();
            for (id, change) in changes {
                match change {
                    Some(document) => {
                        rows.insert(id, document);
                    }
                    None => {
                        rows.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }

    async fn rollback(&self) -> AppResult<()> {
        // Idempotent, including after close: cleanup paths call rollback
        // unconditionally.
        if let Some(overlay) = self.overlay.lock().await.as_mut() {
            overlay.clear();
        }
        Ok(())
    }

    async fn close(&self) -> AppResult<()> {
        let discarded = self.overlay.lock().await.take();
        if let Some(overlay) = discarded {
            let pending: usize = overlay.values().map(Changes::len).sum();
            if pending > 0 {
                tracing::debug!(pending, "session closed with uncommitted work discarded");
            }
        }
        Ok(())
    }
}

/// Typed record access bound to one [`MemorySession`].
pub struct MemoryStore<R> {
    session: Arc<MemorySession>,
    _record: PhantomData<fn() -> R>,
}

impl<R> MemoryStore<R>
where
    R: StoredRecord + Serialize + DeserializeOwned,
{
    pub fn new(session: Arc<MemorySession>) -> Self {
        Self {
            session,
            _record: PhantomData,
        }
    }

    /// Session-local view: committed rows with this session's overlay applied.
    async fn view(&self) -> AppResult<BTreeMap<Uuid, Value>> {
        let overlay_guard = self.session.overlay.lock().await;
        let overlay = overlay_guard
            .as_ref()
            .ok_or(AppError::IllegalState(SESSION_CLOSED))?;
        let committed = self.session.committed.read().await;

        Ok(merged_view(&committed, overlay, R::COLLECTION))
    }

    fn decode(document: Value) -> AppResult<R> {
        serde_json::from_value(document).map_err(AppError::from)
    }
}

fn merged_view(committed: &Collections, overlay: &Overlay, collection: &str) -> BTreeMap<Uuid, Value> {
    let mut view = committed.get(collection).cloned().unwrap_or_default();
    if let Some(changes) = overlay.get(collection) {
        for (id, change) in changes {
            match change {
                Some(document) => {
                    view.insert(*id, document.clone());
                }
                None => {
                    view.remove(id);
                }
            }
        }
    }
    view
}

fn matches(filter: &Filter, id: Uuid, document: &Value) -> AppResult<bool> {
    match filter {
        Filter::All => Ok(true),
        Filter::Id(want) => Ok(id == *want),
        Filter::Eq(field, want) => match document.get(field) {
            Some(found) => Ok(found == want),
            None => Err(AppError::unsupported_filter(format!(
                "field `{field}` does not exist on this record"
            ))),
        },
        Filter::AllOf(parts) => {
            for part in parts {
                if !matches(part, id, document)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}

#[async_trait]
impl<R> RecordStore<R> for MemoryStore<R>
where
    R: StoredRecord + Serialize + DeserializeOwned,
{
    async fn select_one(&self, filter: &Filter) -> AppResult<Option<R>> {
        let view = self.view().await?;
        for (id, document) in view {
            if matches(filter, id, &document)? {
                return Ok(Some(Self::decode(document)?));
            }
        }
        Ok(None)
    }

    async fn select_many(&self, filter: &Filter, limit: u64, offset: u64) -> AppResult<Vec<R>> {
        let view = self.view().await?;
        let mut records = Vec::new();
        let mut skipped = 0u64;
        // Key order is id order; v7 ids keep that close to insertion order.
        for (id, document) in view {
            if !matches(filter, id, &document)? {
                continue;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            if (records.len() as u64) >= limit {
                break;
            }
            records.push(Self::decode(document)?);
        }
        Ok(records)
    }

    async fn count(&self, filter: &Filter) -> AppResult<u64> {
        let view = self.view().await?;
        let mut total = 0u64;
        for (id, document) in view {
            if matches(filter, id, &document)? {
                total += 1;
            }
        }
        Ok(total)
    }

    async fn insert_or_replace(&self, record: R) -> AppResult<R> {
        let id = record.record_id();
        let document = serde_json::to_value(&record)?;

        let mut overlay_guard = self.session.overlay.lock().await;
        let overlay = overlay_guard
            .as_mut()
            .ok_or(AppError::IllegalState(SESSION_CLOSED))?;
        overlay
            .entry(R::COLLECTION.to_string())
            .or_default()
            .insert(id, Some(document.clone()));
        drop(overlay_guard);

        // Re-derive from the stored document, not the caller's input.
        Self::decode(document)
    }

    async fn delete(&self, filter: &Filter) -> AppResult<u64> {
        let mut overlay_guard = self.session.overlay.lock().await;
        let overlay = overlay_guard
            .as_mut()
            .ok_or(AppError::IllegalState(SESSION_CLOSED))?;
        let committed = self.session.committed.read().await;

        let view = merged_view(&committed, overlay, R::COLLECTION);
        let mut hits = Vec::new();
        for (id, document) in view {
            if matches(filter, id, &document)? {
                hits.push(id);
            }
        }
        drop(committed);

        let changes = overlay.entry(R::COLLECTION.to_string()).or_default();
        for id in &hits {
            changes.insert(*id, None);
        }
        Ok(hits.len() as u64)
    }

    async fn flush(&self) -> AppResult<()> {
        // Writes land in the overlay immediately; only the closed check
        // remains meaningful here.
        self.session
            .overlay
            .lock()
            .await
            .as_ref()
            .ok_or(AppError::IllegalState(SESSION_CLOSED))?;
        Ok(())
    }
}
