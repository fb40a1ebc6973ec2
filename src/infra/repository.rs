//! Repository layer - Data access abstraction
//!
//! A repository adapts one entity type to one stored-record type through a
//! lossless bidirectional mapping, and speaks to the engine only through the
//! [`RecordStore`] port. It adds no failure modes of its own beyond mapping
//! errors; storage failures pass through unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::storage::{Filter, RecordStore};
use crate::domain::Entity;
use crate::errors::AppResult;
use crate::types::PageRequest;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Entity <-> stored-record pairing.
///
/// The converter pair must be lossless for every field the entity declares;
/// unknown extra record fields are ignored on read. `NAME` is the explicit
/// display name used in error messages and event tags.
pub trait Storable: Entity + Sized + Send + Sync + 'static {
    type Record: Send + Sync + 'static;

    const NAME: &'static str;

    fn to_record(&self) -> AppResult<Self::Record>;

    fn from_record(record: Self::Record) -> AppResult<Self>;
}

/// Repository contract exposed to application callers.
///
/// Absence is data, not an error: `get` returns `None` and `delete` returns
/// `false` for missing ids.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait Repository<E: Send + Sync + 'static>: Send + Sync {
    /// Fetch by identifier.
    async fn get(&self, id: Uuid) -> AppResult<Option<E>>;

    /// Upsert. The returned entity is re-derived from the persisted record,
    /// never the caller's input, so engine-defaulted fields are reflected.
    async fn save(&self, entity: E) -> AppResult<E>;

    /// Remove by identifier; true iff a record existed.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;

    /// Bounded page of results (default limit 100, offset 0).
    async fn list(&self, filter: &Filter, page: PageRequest) -> AppResult<Vec<E>>;

    /// Total matching records, independent of paging.
    async fn count(&self, filter: &Filter) -> AppResult<u64>;

    /// Batch upsert. Empty input returns empty with zero storage calls;
    /// any failure propagates rather than partially succeeding in silence.
    async fn save_all(&self, entities: Vec<E>) -> AppResult<Vec<E>>;
}

/// Generic repository over any [`RecordStore`] engine binding.
pub struct EntityStore<E: Storable> {
    store: Arc<dyn RecordStore<E::Record>>,
}

impl<E: Storable> EntityStore<E> {
    pub fn new(store: Arc<dyn RecordStore<E::Record>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<E: Storable> Repository<E> for EntityStore<E> {
    async fn get(&self, id: Uuid) -> AppResult<Option<E>> {
        match self.store.select_one(&Filter::Id(id)).await? {
            Some(record) => Ok(Some(E::from_record(record)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, entity: E) -> AppResult<E> {
        let record = entity.to_record()?;
        let persisted = self.store.insert_or_replace(record).await?;
        // Flush so engine-generated defaults are settled before re-deriving.
        self.store.flush().await?;
        E::from_record(persisted)
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let removed = self.store.delete(&Filter::Id(id)).await?;
        if removed > 0 {
            self.store.flush().await?;
        }
        Ok(removed > 0)
    }

    async fn list(&self, filter: &Filter, page: PageRequest) -> AppResult<Vec<E>> {
        let records = self
            .store
            .select_many(filter, page.limit, page.offset)
            .await?;
        records.into_iter().map(E::from_record).collect()
    }

    async fn count(&self, filter: &Filter) -> AppResult<u64> {
        self.store.count(filter).await
    }

    async fn save_all(&self, entities: Vec<E>) -> AppResult<Vec<E>> {
        // Fast path: nothing to write, nothing hits storage.
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        let mut persisted = Vec::with_capacity(entities.len());
        for entity in &entities {
            let record = entity.to_record()?;
            persisted.push(self.store.insert_or_replace(record).await?);
        }
        self.store.flush().await?;

        persisted.into_iter().map(E::from_record).collect()
    }
}
