//! Storage ports - the contract between repositories and storage engines.
//!
//! A storage engine exposes two things: transactional sessions
//! ([`Session`] / [`SessionFactory`]) and per-record-type CRUD access bound
//! to a session ([`RecordStore`]). Repositories and the unit of work are
//! written against these ports only; engines plug in underneath.

pub mod memory;
pub mod sql;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

pub use memory::{MemoryEngine, MemorySession, MemoryStore};
pub use sql::{Database, SqlSession, SqlSessionFactory, SqlStore};

/// Storage-side projection of an entity.
pub trait StoredRecord: Clone + Send + Sync + 'static {
    /// Collection/table tag the engine files this record under.
    const COLLECTION: &'static str;

    fn record_id(&self) -> Uuid;
}

/// Predicate vocabulary for reads and deletes.
///
/// Engines honor what they can and reject the rest with
/// `AppError::UnsupportedFilter` - a predicate must never silently over- or
/// under-match.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Match every record.
    All,
    /// Match the record with this identifier.
    Id(Uuid),
    /// Match records whose named field equals the given scalar.
    Eq(String, Value),
    /// Match records satisfying every inner predicate.
    AllOf(Vec<Filter>),
}

impl Filter {
    /// Field-equality shorthand.
    pub fn field(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(name.into(), value.into())
    }
}

/// One transactional storage session.
///
/// A session is exclusively owned by the single unit-of-work scope that
/// created or borrowed it; sharing one session across tasks is prevented by
/// construction, not by locking.
#[async_trait]
pub trait Session: Send + Sync {
    /// Durably apply every operation performed through this session.
    async fn commit(&self) -> AppResult<()>;

    /// Discard uncommitted operations. Idempotent.
    async fn rollback(&self) -> AppResult<()>;

    /// Release the session. Uncommitted work is discarded, never persisted.
    async fn close(&self) -> AppResult<()>;
}

/// Opens fresh sessions for owned-session units of work.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: Session + 'static;

    async fn open_session(&self) -> AppResult<Arc<Self::Session>>;
}

/// CRUD access to one record type within one session.
///
/// All operations are potentially-blocking I/O and must be awaited.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RecordStore<R: Send + Sync + 'static>: Send + Sync {
    async fn select_one(&self, filter: &Filter) -> AppResult<Option<R>>;

    async fn select_many(&self, filter: &Filter, limit: u64, offset: u64) -> AppResult<Vec<R>>;

    async fn count(&self, filter: &Filter) -> AppResult<u64>;

    /// Upsert: overwrite the record with the same identifier or insert a new
    /// one. Returns the record as persisted, engine defaults included.
    async fn insert_or_replace(&self, record: R) -> AppResult<R>;

    /// Remove matching records, returning how many existed.
    async fn delete(&self, filter: &Filter) -> AppResult<u64>;

    /// Push pending writes to the engine within the open transaction.
    async fn flush(&self) -> AppResult<()>;
}
