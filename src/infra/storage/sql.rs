//! SQL storage engine adapter (SeaORM).
//!
//! Binds the storage ports to a relational engine: one database transaction
//! per session, entity tables behind [`SqlStore`]. Predicate translation is
//! deliberately partial - anything that does not map onto a known column and
//! a scalar value is rejected instead of being ignored.

use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectOptions,
    ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel, Iterable, PaginatorTrait, PrimaryKeyToColumn,
    PrimaryKeyTrait, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Filter, RecordStore, Session, SessionFactory, StoredRecord};
use crate::config::Config;
use crate::errors::{AppError, AppResult};

const SESSION_CLOSED: &str = "storage session already closed";

/// Database wrapper for connection management
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Connect to the configured database.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let mut options = ConnectOptions::new(config.database_url.clone());
        options.sqlx_logging(config.sql_echo);

        let connection = SeaDatabase::connect(options).await?;
        tracing::info!("database connected");

        Ok(Self { connection })
    }

    /// Get a reference to the database connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Session factory handing out one transaction per unit-of-work scope.
    pub fn session_factory(&self) -> SqlSessionFactory {
        SqlSessionFactory::new(self.connection.clone())
    }

    /// Check database connectivity by executing a simple query.
    pub async fn ping(&self) -> AppResult<()> {
        self.connection
            .execute(Statement::from_string(
                self.connection.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}

/// Opens one database transaction per session.
pub struct SqlSessionFactory {
    db: DatabaseConnection,
}

impl SqlSessionFactory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionFactory for SqlSessionFactory {
    type Session = SqlSession;

    async fn open_session(&self) -> AppResult<Arc<SqlSession>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Initialization(e.to_string()))?;
        Ok(Arc::new(SqlSession {
            txn: Mutex::new(Some(txn)),
        }))
    }
}

/// One database transaction, exposed through the [`Session`] port.
///
/// Commit and rollback both finalize the underlying transaction; operations
/// issued afterwards are rejected. Dropping the session rolls the
/// transaction back, so cancellation discards uncommitted work.
pub struct SqlSession {
    txn: Mutex<Option<DatabaseTransaction>>,
}

#[async_trait]
impl Session for SqlSession {
    async fn commit(&self) -> AppResult<()> {
        let txn = self
            .txn
            .lock()
            .await
            .take()
            .ok_or(AppError::IllegalState(SESSION_CLOSED))?;
        txn.commit().await.map_err(AppError::from)
    }

    async fn rollback(&self) -> AppResult<()> {
        match self.txn.lock().await.take() {
            Some(txn) => txn.rollback().await.map_err(AppError::from),
            None => Ok(()),
        }
    }

    async fn close(&self) -> AppResult<()> {
        if let Some(txn) = self.txn.lock().await.take() {
            if let Err(e) = txn.rollback().await {
                tracing::error!("discarding uncommitted transaction failed: {}", e);
            }
        }
        Ok(())
    }
}

/// Typed table access bound to one [`SqlSession`].
pub struct SqlStore<E, A> {
    session: Arc<SqlSession>,
    _entity: PhantomData<fn() -> (E, A)>,
}

impl<E, A> SqlStore<E, A>
where
    E: EntityTrait,
    A: ActiveModelTrait<Entity = E>,
{
    pub fn new(session: Arc<SqlSession>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }
}

fn pk_column<E: EntityTrait>() -> AppResult<E::Column> {
    E::PrimaryKey::iter()
        .next()
        .map(PrimaryKeyToColumn::into_column)
        .ok_or_else(|| AppError::storage("entity has no primary key"))
}

fn scalar_value(value: &Value) -> AppResult<sea_orm::Value> {
    match value {
        Value::String(s) => Ok(s.clone().into()),
        Value::Bool(b) => Ok((*b).into()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.into())
            } else if let Some(f) = n.as_f64() {
                Ok(f.into())
            } else {
                Err(AppError::unsupported_filter(format!(
                    "numeric filter value out of range: {n}"
                )))
            }
        }
        other => Err(AppError::unsupported_filter(format!(
            "non-scalar filter value: {other}"
        ))),
    }
}

fn condition<E: EntityTrait>(filter: &Filter) -> AppResult<Condition> {
    match filter {
        Filter::All => Ok(Condition::all()),
        Filter::Id(id) => Ok(Condition::all().add(pk_column::<E>()?.eq(*id))),
        Filter::Eq(field, value) => {
            let column = E::Column::from_str(field).map_err(|_| {
                AppError::unsupported_filter(format!("unknown column `{field}`"))
            })?;
            Ok(Condition::all().add(column.eq(scalar_value(value)?)))
        }
        Filter::AllOf(parts) => {
            let mut cond = Condition::all();
            for part in parts {
                cond = cond.add(condition::<E>(part)?);
            }
            Ok(cond)
        }
    }
}

#[async_trait]
impl<E, A> RecordStore<E::Model> for SqlStore<E, A>
where
    E: EntityTrait,
    E::Model: StoredRecord + IntoActiveModel<A>,
    A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
    async fn select_one(&self, filter: &Filter) -> AppResult<Option<E::Model>> {
        let guard = self.session.txn.lock().await;
        let txn = guard.as_ref().ok_or(AppError::IllegalState(SESSION_CLOSED))?;

        E::find()
            .filter(condition::<E>(filter)?)
            .one(txn)
            .await
            .map_err(AppError::from)
    }

    async fn select_many(
        &self,
        filter: &Filter,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<E::Model>> {
        let guard = self.session.txn.lock().await;
        let txn = guard.as_ref().ok_or(AppError::IllegalState(SESSION_CLOSED))?;

        E::find()
            .filter(condition::<E>(filter)?)
            .order_by_asc(pk_column::<E>()?)
            .offset(offset)
            .limit(limit)
            .all(txn)
            .await
            .map_err(AppError::from)
    }

    async fn count(&self, filter: &Filter) -> AppResult<u64> {
        let guard = self.session.txn.lock().await;
        let txn = guard.as_ref().ok_or(AppError::IllegalState(SESSION_CLOSED))?;

        E::find()
            .filter(condition::<E>(filter)?)
            .count(txn)
            .await
            .map_err(AppError::from)
    }

    async fn insert_or_replace(&self, record: E::Model) -> AppResult<E::Model> {
        let guard = self.session.txn.lock().await;
        let txn = guard.as_ref().ok_or(AppError::IllegalState(SESSION_CLOSED))?;

        let id = record.record_id();
        let existing = E::find_by_id(id).one(txn).await.map_err(AppError::from)?;

        let active = record.into_active_model().reset_all();
        let persisted = if existing.is_some() {
            active.update(txn).await.map_err(AppError::from)?
        } else {
            active.insert(txn).await.map_err(AppError::from)?
        };
        Ok(persisted)
    }

    async fn delete(&self, filter: &Filter) -> AppResult<u64> {
        let guard = self.session.txn.lock().await;
        let txn = guard.as_ref().ok_or(AppError::IllegalState(SESSION_CLOSED))?;

        let result = E::delete_many()
            .filter(condition::<E>(filter)?)
            .exec(txn)
            .await
            .map_err(AppError::from)?;
        Ok(result.rows_affected)
    }

    async fn flush(&self) -> AppResult<()> {
        // Statements execute eagerly inside the transaction; only the
        // closed-session check remains meaningful here.
        self.session
            .txn
            .lock()
            .await
            .as_ref()
            .ok_or(AppError::IllegalState(SESSION_CLOSED))?;
        Ok(())
    }
}
