//! Centralized error handling.
//!
//! Provides a unified error type for the entire crate. Presentation-layer
//! translation (HTTP status codes etc.) is deliberately out of scope here:
//! every error surfaces to the direct caller unchanged.

use thiserror::Error;
use uuid::Uuid;

/// Crate-wide error type
/// SOLID - Open/Closed: Extend via new variants without modifying behavior
#[derive(Error, Debug)]
pub enum AppError {
    // Resource errors
    #[error("{entity} with id {id} not found")]
    EntityNotFound { entity: &'static str, id: Uuid },

    #[error("{0} already exists")]
    Conflict(String),

    // Lifecycle errors
    /// A unit-of-work method was invoked outside the Active state.
    /// Programmer error; fails loudly and immediately.
    #[error("{0}")]
    IllegalState(&'static str),

    /// No session could be acquired at scope entry.
    #[error("failed to initialize storage session: {0}")]
    Initialization(String),

    // Storage & transport errors, propagated unmodified
    #[error("database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("transport error")]
    Transport(#[from] redis::RedisError),

    #[error("storage error: {0}")]
    Storage(String),

    /// A filter the storage engine cannot honor. Failing fast here is what
    /// keeps unsupported predicates from silently over- or under-matching.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Entity <-> record conversion could not preserve all fields.
    #[error("mapping error: {0}")]
    Mapping(String),

    // Validation
    #[error("{0}")]
    Validation(String),
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Mapping(e.to_string())
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &'static str, id: Uuid) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &'static str, id: Uuid) -> AppResult<T> {
        self.ok_or(AppError::EntityNotFound { entity, id })
    }
}

/// Convenience constructors
impl AppError {
    pub fn conflict(entity: impl Into<String>) -> Self {
        AppError::Conflict(entity.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        AppError::Storage(msg.into())
    }

    pub fn mapping(msg: impl Into<String>) -> Self {
        AppError::Mapping(msg.into())
    }

    pub fn unsupported_filter(msg: impl Into<String>) -> Self {
        AppError::UnsupportedFilter(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_the_entity() {
        let id = Uuid::now_v7();
        let err: AppResult<()> = None.ok_or_not_found("Invoice", id);
        let msg = err.unwrap_err().to_string();
        assert!(msg.starts_with("Invoice with id"));
        assert!(msg.contains(&id.to_string()));
    }

    #[test]
    fn test_serde_errors_fold_into_mapping() {
        let bad = serde_json::from_str::<u32>("not-a-number").unwrap_err();
        let err = AppError::from(bad);
        assert!(matches!(err, AppError::Mapping(_)));
    }
}
