//! Infrastructure layer - External systems integration
//!
//! This module handles all external system concerns:
//! - Storage ports and engines (in-memory, SQL)
//! - Generic repositories and the Unit of Work
//! - Caching and the event bus implementations (in-memory, Redis)
//! - Logging setup

pub mod cache;
pub mod events;
pub mod logging;
pub mod repository;
pub mod storage;
pub mod unit_of_work;

pub use cache::Cache;
pub use events::{EventBus, MemoryEventBus, RedisEventBus};
pub use repository::{EntityStore, Repository, Storable};
pub use storage::{
    Database, Filter, MemoryEngine, MemorySession, MemoryStore, RecordStore, Session,
    SessionFactory, SqlSession, SqlSessionFactory, SqlStore, StoredRecord,
};
pub use unit_of_work::{SessionUnitOfWork, TransactionContext, UnitOfWork, UowState};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use repository::MockRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use storage::MockRecordStore;
