//! Groundwork - backend application scaffolding
//!
//! This crate provides the persistence and eventing foundation for building
//! services: generic repositories over pluggable storage engines, a Unit of
//! Work transaction boundary, and a domain-event bus (in-memory and
//! Redis-backed).
//!
//! # Architecture Layers
//!
//! - **config**: Environment configuration and constants
//! - **domain**: Entity/value-object model and domain events
//! - **services**: Generic CRUD application service
//! - **infra**: Storage engines, repositories, unit of work, cache, event bus
//! - **types**: Shared types (pagination)
//! - **utils**: Time, masking, and retry helpers
//! - **errors**: Centralized error handling
//!
//! # Typical flow
//!
//! ```ignore
//! let factory: Arc<dyn SessionFactory<Session = MemorySession>> =
//!     Arc::new(MemoryEngine::new());
//! let outcome = SessionUnitOfWork::owned(factory)
//!     .run(|ctx| Box::pin(async move {
//!         let store = Arc::new(MemoryStore::<OrderRecord>::new(ctx.session()));
//!         let orders = EntityStore::<Order>::new(store);
//!         let saved = orders.save(order).await?;
//!         ctx.commit().await?;
//!         Ok(saved)
//!     }))
//!     .await?;
//! // publish events only after the scope has committed
//! bus.publish(&EntityCreated::new("Order", outcome.id(), payload)).await?;
//! ```

pub mod config;
pub mod domain;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use config::Config;
pub use domain::{DomainEvent, Entity, Event};
pub use errors::{AppError, AppResult};
pub use infra::{
    Cache, EntityStore, EventBus, Filter, MemoryEngine, MemoryEventBus, RedisEventBus,
    Repository, SessionUnitOfWork, Storable, UnitOfWork,
};
pub use types::{Paginated, PaginationParams};
