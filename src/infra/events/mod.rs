//! Event bus - decouples "fact happened" from "who reacts".
//!
//! Two implementations of one contract: a same-process bus with typed
//! subscriptions and a Redis-backed bus for cross-service delivery.
//!
//! Publishing inside an open unit-of-work scope, before `commit`, lets
//! subscribers observe a fact whose underlying write may still roll back.
//! Publish strictly after `commit` returns; the CRUD service does.

mod memory;
mod redis_bus;

use async_trait::async_trait;

use crate::domain::DomainEvent;
use crate::errors::AppResult;

pub use memory::MemoryEventBus;
pub use redis_bus::RedisEventBus;

/// Event bus contract.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Deliver one event to every consumer registered for its exact type.
    async fn publish(&self, event: &dyn DomainEvent) -> AppResult<()>;

    /// Deliver many events, preserving input order. No atomicity across the
    /// batch: partial delivery on failure is acceptable.
    async fn publish_batch(&self, events: &[&dyn DomainEvent]) -> AppResult<()>;
}
