//! Entity contract and embeddable entity components.
//!
//! Entities carry a globally unique, time-sortable identifier generated
//! client-side (UUIDv7 for sequential index locality) plus UTC creation and
//! last-modified timestamps. Identity equality: two entities are the same
//! iff their identifiers match, regardless of other fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh, time-sortable entity identifier.
///
/// UUIDv7 keeps inserts roughly monotonic, which keeps database indexes
/// dense even under client-side id generation.
pub fn new_entity_id() -> Uuid {
    Uuid::now_v7()
}

/// Identity-bearing domain record.
///
/// The identifier is immutable after creation; timestamps are UTC.
pub trait Entity: Send + Sync {
    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    fn updated_at(&self) -> DateTime<Utc>;

    /// Identity equality: same entity iff identifiers match.
    fn same_identity(&self, other: &dyn Entity) -> bool {
        self.id() == other.id()
    }
}

/// Embeddable soft-delete component.
///
/// Domain data and behavior only; how (or whether) an engine filters
/// deleted rows is a repository concern.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftDelete {
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SoftDelete {
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.deleted_at = Some(Utc::now());
    }

    pub fn restore(&mut self) {
        self.is_deleted = false;
        self.deleted_at = None;
    }
}

/// Embeddable audit component recording who created/changed a record.
///
/// Strings rather than ids so the component stays agnostic to the user
/// identifier type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget {
        id: Uuid,
        name: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    }

    impl Entity for Widget {
        fn id(&self) -> Uuid {
            self.id
        }
        fn created_at(&self) -> DateTime<Utc> {
            self.created_at
        }
        fn updated_at(&self) -> DateTime<Utc> {
            self.updated_at
        }
    }

    fn widget(id: Uuid, name: &str) -> Widget {
        let now = Utc::now();
        Widget {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_identity_equality_ignores_other_fields() {
        let id = new_entity_id();
        let a = widget(id, "first");
        let b = widget(id, "renamed");
        let c = widget(new_entity_id(), "first");

        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&c));
        assert_ne!(a.name, b.name);
    }

    #[test]
    fn test_v7_ids_are_time_sortable() {
        let earlier = new_entity_id();
        // Sub-millisecond bits are random; order is only guaranteed across
        // millisecond boundaries.
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = new_entity_id();
        assert!(earlier < later);
    }

    #[test]
    fn test_soft_delete_round_trip() {
        let mut state = SoftDelete::default();
        assert!(!state.is_deleted);

        state.mark_deleted();
        assert!(state.is_deleted);
        assert!(state.deleted_at.is_some());

        state.restore();
        assert_eq!(state, SoftDelete::default());
    }
}
