//! Unit of Work pattern implementation.
//!
//! SOLID (SRP): Manages transaction lifecycle and session ownership.
//! DDD: Coordinates operations across multiple repositories atomically.
//!
//! One unit of work defines one atomic boundary: a session is acquired on
//! `begin`, repositories constructed against it share that session, and
//! nothing is durable until `commit`. The scope is single-use - terminal
//! states are final.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::storage::{Session, SessionFactory};
use crate::errors::{AppError, AppResult};

const SESSION_NOT_STARTED: &str = "session not started";

/// Lifecycle of a unit of work. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UowState {
    Idle,
    Active,
    Committed,
    RolledBack,
}

/// Unit of Work contract: scope entry/exit plus transaction control.
///
/// Note: services typically use [`SessionUnitOfWork::run`], which drives
/// these methods and guarantees `end` on every exit path.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Acquire the session and become Active. Re-entry is rejected.
    async fn begin(&mut self) -> AppResult<()>;

    /// Durably apply all work performed through this scope's session.
    /// Only valid while Active.
    async fn commit(&mut self) -> AppResult<()>;

    /// Discard uncommitted work. Safe to call with no session (no-op), so
    /// cleanup paths may call it unconditionally.
    async fn rollback(&mut self) -> AppResult<()>;

    /// Exit the scope. On a failed exit the rollback runs first; an owned
    /// session is then released, a borrowed one never is.
    async fn end(&mut self, failed: bool) -> AppResult<()>;

    fn state(&self) -> UowState;
}

enum SessionSource<S: Session + 'static> {
    /// The unit of work opens the session and must close it.
    Owned(Arc<dyn SessionFactory<Session = S>>),
    /// The caller supplied an already-open session; never closed here.
    Borrowed(Arc<S>),
}

/// Concrete unit of work over any storage engine session.
pub struct SessionUnitOfWork<S: Session + 'static> {
    source: SessionSource<S>,
    session: Option<Arc<S>>,
    state: UowState,
}

impl<S: Session + 'static> SessionUnitOfWork<S> {
    /// Unit of work that opens (and will close) its own session.
    pub fn owned(factory: Arc<dyn SessionFactory<Session = S>>) -> Self {
        Self {
            source: SessionSource::Owned(factory),
            session: None,
            state: UowState::Idle,
        }
    }

    /// Unit of work over a caller-supplied session. Usage discipline only:
    /// the session's lifecycle stays with the caller.
    pub fn borrowed(session: Arc<S>) -> Self {
        Self {
            source: SessionSource::Borrowed(session),
            session: None,
            state: UowState::Idle,
        }
    }

    /// The active session, for constructing repositories within this scope.
    pub fn session(&self) -> AppResult<Arc<S>> {
        match (&self.state, &self.session) {
            (UowState::Active, Some(session)) => Ok(session.clone()),
            _ => Err(AppError::IllegalState(SESSION_NOT_STARTED)),
        }
    }

    fn is_owned(&self) -> bool {
        matches!(self.source, SessionSource::Owned(_))
    }

    /// Run a closure inside this scope, guaranteeing cleanup on every exit
    /// path: a failed closure rolls back before the session is released, and
    /// a normal exit without commit discards the work (fail safe - never
    /// silently persists).
    ///
    /// There is no implicit commit: call [`TransactionContext::commit`]
    /// inside the closure to make the work durable.
    pub async fn run<T, F>(mut self, f: F) -> AppResult<T>
    where
        T: Send,
        F: FnOnce(TransactionContext<S>) -> BoxFuture<'static, AppResult<T>> + Send,
    {
        self.begin().await?;
        let committed = Arc::new(AtomicBool::new(false));
        let ctx = TransactionContext {
            session: self.session()?,
            committed: committed.clone(),
        };

        let outcome = f(ctx).await;
        if committed.load(Ordering::SeqCst) && self.state == UowState::Active {
            self.state = UowState::Committed;
        }

        match outcome {
            Ok(value) => {
                self.end(false).await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(cleanup) = self.end(true).await {
                    tracing::error!("unit of work cleanup failed: {}", cleanup);
                }
                Err(error)
            }
        }
    }
}

#[async_trait]
impl<S: Session + 'static> UnitOfWork for SessionUnitOfWork<S> {
    async fn begin(&mut self) -> AppResult<()> {
        if self.state != UowState::Idle {
            return Err(AppError::IllegalState("unit of work already entered"));
        }

        let session = match &self.source {
            SessionSource::Owned(factory) => {
                factory.open_session().await.map_err(|e| match e {
                    AppError::Initialization(_) => e,
                    other => AppError::Initialization(other.to_string()),
                })?
            }
            SessionSource::Borrowed(session) => session.clone(),
        };

        self.session = Some(session);
        self.state = UowState::Active;
        Ok(())
    }

    async fn commit(&mut self) -> AppResult<()> {
        if self.state != UowState::Active {
            return Err(AppError::IllegalState(SESSION_NOT_STARTED));
        }
        let session = self
            .session
            .as_ref()
            .ok_or(AppError::IllegalState(SESSION_NOT_STARTED))?;

        session.commit().await?;
        self.state = UowState::Committed;
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        match (self.state, self.session.as_ref()) {
            (UowState::Active, Some(session)) => {
                session.rollback().await?;
                self.state = UowState::RolledBack;
                Ok(())
            }
            // No active session: idempotent no-op.
            _ => Ok(()),
        }
    }

    async fn end(&mut self, failed: bool) -> AppResult<()> {
        if self.state == UowState::Idle {
            return Ok(());
        }

        if failed && self.state == UowState::Active {
            if let Err(e) = self.rollback().await {
                tracing::error!("rollback on error exit failed: {}", e);
            }
        }

        if let Some(session) = self.session.take() {
            if self.is_owned() {
                // Closing an owned session discards whatever was not
                // committed; a forgotten commit therefore loses work rather
                // than persisting it.
                session.close().await?;
            }
        }

        if self.state == UowState::Active {
            self.state = UowState::RolledBack;
        }
        Ok(())
    }

    fn state(&self) -> UowState {
        self.state
    }
}

/// Handle passed to [`SessionUnitOfWork::run`] closures.
///
/// Owns a clone of the scope's session, so closures and the futures they
/// build need no borrowed state.
pub struct TransactionContext<S: Session> {
    session: Arc<S>,
    committed: Arc<AtomicBool>,
}

impl<S: Session> TransactionContext<S> {
    /// The scope's session, for constructing repositories. All repositories
    /// built from it observe each other's uncommitted writes.
    pub fn session(&self) -> Arc<S> {
        self.session.clone()
    }

    /// Durably apply the scope's work. At most once per scope.
    pub async fn commit(&self) -> AppResult<()> {
        if self.committed.swap(true, Ordering::SeqCst) {
            return Err(AppError::IllegalState("unit of work already committed"));
        }
        match self.session.commit().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.committed.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Discard the scope's uncommitted work early.
    pub async fn rollback(&self) -> AppResult<()> {
        self.session.rollback().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::{MemoryEngine, MemorySession};

    fn factory() -> Arc<dyn SessionFactory<Session = MemorySession>> {
        Arc::new(MemoryEngine::new())
    }

    #[tokio::test]
    async fn test_commit_before_begin_is_rejected() {
        let mut uow = SessionUnitOfWork::owned(factory());

        let err = uow.commit().await.unwrap_err();
        assert!(matches!(err, AppError::IllegalState(SESSION_NOT_STARTED)));
        assert_eq!(uow.state(), UowState::Idle);
    }

    #[tokio::test]
    async fn test_rollback_without_session_is_a_no_op() {
        let mut uow = SessionUnitOfWork::owned(factory());

        uow.rollback().await.unwrap();
        assert_eq!(uow.state(), UowState::Idle);
    }

    #[tokio::test]
    async fn test_scope_is_single_use() {
        let mut uow = SessionUnitOfWork::owned(factory());

        uow.begin().await.unwrap();
        uow.commit().await.unwrap();
        uow.end(false).await.unwrap();
        assert_eq!(uow.state(), UowState::Committed);

        let err = uow.begin().await.unwrap_err();
        assert!(matches!(err, AppError::IllegalState(_)));
    }

    #[tokio::test]
    async fn test_double_begin_is_rejected() {
        let mut uow = SessionUnitOfWork::owned(factory());

        uow.begin().await.unwrap();
        assert!(matches!(
            uow.begin().await.unwrap_err(),
            AppError::IllegalState(_)
        ));
    }
}
