//! Generic CRUD service.
//!
//! SOLID (SRP): standard create/read/update/delete use cases for one entity
//! type, each write wrapped in its own unit-of-work scope.
//! DDD: orchestrates domain operations via Unit of Work; publishes the
//! matching domain event strictly after the scope has committed, so
//! subscribers never observe facts that later roll back.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{DomainEvent, EntityCreated, EntityDeleted, EntityUpdated};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::events::EventBus;
use crate::infra::repository::{Repository, Storable};
use crate::infra::storage::{Filter, Session, SessionFactory};
use crate::infra::unit_of_work::SessionUnitOfWork;
use crate::types::{PageRequest, Paginated, PaginationParams};

/// Builds a repository bound to the scope's session, so every operation in
/// one scope shares one session.
type RepositoryBinder<E, S> = Arc<dyn Fn(Arc<S>) -> Arc<dyn Repository<E>> + Send + Sync>;

pub struct CrudService<E: Send + 'static, S: Session + 'static> {
    factory: Arc<dyn SessionFactory<Session = S>>,
    repositories: RepositoryBinder<E, S>,
    bus: Option<Arc<dyn EventBus>>,
}

impl<E, S> CrudService<E, S>
where
    E: Storable + Serialize,
    S: Session + 'static,
{
    pub fn new(
        factory: Arc<dyn SessionFactory<Session = S>>,
        repositories: impl Fn(Arc<S>) -> Arc<dyn Repository<E>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            factory,
            repositories: Arc::new(repositories),
            bus: None,
        }
    }

    /// Attach an event bus; CRUD events are published after each commit.
    pub fn with_events(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    fn unit_of_work(&self) -> SessionUnitOfWork<S> {
        SessionUnitOfWork::owned(self.factory.clone())
    }

    /// Fetch one entity; absence is an error carrying the entity name.
    pub async fn get(&self, id: Uuid) -> AppResult<E> {
        let repositories = self.repositories.clone();
        self.unit_of_work()
            .run(move |ctx| {
                Box::pin(async move {
                    let repo = repositories(ctx.session());
                    repo.get(id).await?.ok_or_not_found(E::NAME, id)
                })
            })
            .await
    }

    /// One page of entities plus the total count for pagination math.
    pub async fn list(
        &self,
        filter: Filter,
        params: PaginationParams,
    ) -> AppResult<Paginated<E>> {
        let repositories = self.repositories.clone();
        self.unit_of_work()
            .run(move |ctx| {
                Box::pin(async move {
                    let repo = repositories(ctx.session());
                    let bounds = PageRequest::new(params.limit(), params.offset());
                    let items = repo.list(&filter, bounds).await?;
                    let total = repo.count(&filter).await?;
                    Ok(Paginated::new(items, params.page, params.per_page, total))
                })
            })
            .await
    }

    pub async fn create(&self, entity: E) -> AppResult<E> {
        let repositories = self.repositories.clone();
        let saved = self
            .unit_of_work()
            .run(move |ctx| {
                Box::pin(async move {
                    let repo = repositories(ctx.session());
                    let saved = repo.save(entity).await?;
                    ctx.commit().await?;
                    Ok(saved)
                })
            })
            .await?;

        let event = EntityCreated::new(E::NAME, saved.id(), Self::entity_payload(&saved));
        self.emit(&event).await;
        Ok(saved)
    }

    /// Batch create in one atomic scope. Empty input touches nothing.
    pub async fn create_many(&self, entities: Vec<E>) -> AppResult<Vec<E>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        let repositories = self.repositories.clone();
        let saved = self
            .unit_of_work()
            .run(move |ctx| {
                Box::pin(async move {
                    let repo = repositories(ctx.session());
                    let saved = repo.save_all(entities).await?;
                    ctx.commit().await?;
                    Ok(saved)
                })
            })
            .await?;

        if let Some(bus) = &self.bus {
            let events: Vec<EntityCreated> = saved
                .iter()
                .map(|entity| {
                    EntityCreated::new(E::NAME, entity.id(), Self::entity_payload(entity))
                })
                .collect();
            let batch: Vec<&dyn DomainEvent> =
                events.iter().map(|event| event as &dyn DomainEvent).collect();
            if let Err(error) = bus.publish_batch(&batch).await {
                tracing::error!(
                    count = batch.len(),
                    error = %error,
                    "post-commit event batch publish failed"
                );
            }
        }
        Ok(saved)
    }

    /// Patch-style update: fetch, apply the closure, save, commit.
    pub async fn update<F>(&self, id: Uuid, patch: F) -> AppResult<E>
    where
        F: FnOnce(E) -> E + Send + 'static,
    {
        let repositories = self.repositories.clone();
        let updated = self
            .unit_of_work()
            .run(move |ctx| {
                Box::pin(async move {
                    let repo = repositories(ctx.session());
                    let current = repo.get(id).await?.ok_or_not_found(E::NAME, id)?;
                    let saved = repo.save(patch(current)).await?;
                    ctx.commit().await?;
                    Ok(saved)
                })
            })
            .await?;

        let event = EntityUpdated::new(E::NAME, updated.id(), Self::entity_payload(&updated));
        self.emit(&event).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let repositories = self.repositories.clone();
        self.unit_of_work()
            .run(move |ctx| {
                Box::pin(async move {
                    let repo = repositories(ctx.session());
                    if !repo.delete(id).await? {
                        return Err(AppError::EntityNotFound { entity: E::NAME, id });
                    }
                    ctx.commit().await
                })
            })
            .await?;

        let event = EntityDeleted::new(E::NAME, id);
        self.emit(&event).await;
        Ok(())
    }

    /// Post-commit publication: the write is already durable, so delivery
    /// failures are logged rather than failing the operation.
    async fn emit(&self, event: &dyn DomainEvent) {
        if let Some(bus) = &self.bus {
            if let Err(error) = bus.publish(event).await {
                tracing::error!(
                    event_type = event.event_type(),
                    error = %error,
                    "post-commit event publish failed"
                );
            }
        }
    }

    fn entity_payload(entity: &E) -> Value {
        match serde_json::to_value(entity) {
            Ok(value) => value,
            Err(error) => {
                tracing::error!(error = %error, "event payload serialization failed");
                Value::Null
            }
        }
    }
}
