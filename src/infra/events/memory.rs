//! In-memory event bus.
//!
//! Same-process pub/sub for tests and intra-service communication. Handlers
//! are registered per concrete event type; delivery order for one event is
//! subscription order. Each handler is dispatched with its own captured
//! result: one failing handler is logged and never prevents the others from
//! running, nor does it propagate to the publisher.

use std::any::TypeId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::EventBus;
use crate::domain::{DomainEvent, Event};
use crate::errors::AppResult;

type HandlerFuture = BoxFuture<'static, AppResult<()>>;
/// Erased handler: downcasts the published event to its concrete type and
/// returns None when the type does not match.
type Handler = Arc<dyn Fn(&dyn DomainEvent) -> Option<HandlerFuture> + Send + Sync>;

#[derive(Default)]
pub struct MemoryEventBus {
    subscribers: RwLock<HashMap<TypeId, Vec<Handler>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event type.
    ///
    /// Registration-time API: subscribe everything before publishing starts;
    /// it is not meant to race an in-flight publish.
    pub fn subscribe<E, F, Fut>(&self, handler: F)
    where
        E: Event,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        let wrapped: Handler = Arc::new(move |event: &dyn DomainEvent| {
            let concrete = event.as_any().downcast_ref::<E>()?.clone();
            let dispatch: HandlerFuture = Box::pin(handler(concrete));
            Some(dispatch)
        });

        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers.entry(TypeId::of::<E>()).or_default().push(wrapped);
    }

    fn handlers_for(&self, event: &dyn DomainEvent) -> Vec<Handler> {
        let subscribers = self
            .subscribers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        subscribers
            .get(&event.as_any().type_id())
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: &dyn DomainEvent) -> AppResult<()> {
        let handlers = self.handlers_for(event);
        if handlers.is_empty() {
            return Ok(());
        }

        tracing::info!(event_type = event.event_type(), "event published");
        for handler in handlers {
            let Some(dispatch) = handler(event) else {
                continue;
            };
            // Isolated failure capture: log per handler, keep delivering.
            if let Err(error) = dispatch.await {
                tracing::error!(
                    event_type = event.event_type(),
                    error = %error,
                    "event handler failed"
                );
            }
        }
        Ok(())
    }

    async fn publish_batch(&self, events: &[&dyn DomainEvent]) -> AppResult<()> {
        for event in events {
            self.publish(*event).await?;
        }
        Ok(())
    }
}
