//! Domain events.
//!
//! An event is an immutable record of something that already happened. It
//! carries its own identifier, its occurrence timestamp (UTC), and a type
//! tag used for routing. Events are never mutated after construction.

use std::any::Any;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppResult;

/// Metadata every domain event carries, flattened into its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMeta {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
}

impl EventMeta {
    pub fn new() -> Self {
        Self {
            event_id: Uuid::now_v7(),
            occurred_at: Utc::now(),
        }
    }
}

impl Default for EventMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// A concrete, serializable event kind.
///
/// The type tag is an explicit constant rather than something recovered from
/// the type name at runtime, so routing stays stable across renames.
pub trait Event: Serialize + Clone + Send + Sync + 'static {
    /// Routing tag; the remote bus derives its channel name from this.
    const TYPE: &'static str;

    fn meta(&self) -> &EventMeta;
}

/// Object-safe view of an event, usable behind `dyn` at the bus boundary.
///
/// Implemented for every [`Event`] via a blanket impl; the canonical payload
/// is the event's field-for-field serialization plus `event_id` and
/// `occurred_at` (contributed by the flattened [`EventMeta`]).
pub trait DomainEvent: Send + Sync {
    fn event_type(&self) -> &'static str;
    fn event_id(&self) -> Uuid;
    fn occurred_at(&self) -> DateTime<Utc>;
    fn payload(&self) -> AppResult<Value>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Event> DomainEvent for T {
    fn event_type(&self) -> &'static str {
        T::TYPE
    }

    fn event_id(&self) -> Uuid {
        self.meta().event_id
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.meta().occurred_at
    }

    fn payload(&self) -> AppResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ----- Standard CRUD events -------

/// An entity was created and committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCreated {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub entity_type: String,
    pub entity_id: Uuid,
    #[serde(default)]
    pub payload: Value,
}

impl EntityCreated {
    pub fn new(entity_type: impl Into<String>, entity_id: Uuid, payload: Value) -> Self {
        Self {
            meta: EventMeta::new(),
            entity_type: entity_type.into(),
            entity_id,
            payload,
        }
    }
}

impl Event for EntityCreated {
    const TYPE: &'static str = "EntityCreated";

    fn meta(&self) -> &EventMeta {
        &self.meta
    }
}

/// An entity was updated and committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityUpdated {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub changes: Value,
}

impl EntityUpdated {
    pub fn new(entity_type: impl Into<String>, entity_id: Uuid, changes: Value) -> Self {
        Self {
            meta: EventMeta::new(),
            entity_type: entity_type.into(),
            entity_id,
            changes,
        }
    }
}

impl Event for EntityUpdated {
    const TYPE: &'static str = "EntityUpdated";

    fn meta(&self) -> &EventMeta {
        &self.meta
    }
}

/// An entity was removed (hard or soft) and the removal committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDeleted {
    #[serde(flatten)]
    pub meta: EventMeta,
    pub entity_type: String,
    pub entity_id: Uuid,
}

impl EntityDeleted {
    pub fn new(entity_type: impl Into<String>, entity_id: Uuid) -> Self {
        Self {
            meta: EventMeta::new(),
            entity_type: entity_type.into(),
            entity_id,
        }
    }
}

impl Event for EntityDeleted {
    const TYPE: &'static str = "EntityDeleted";

    fn meta(&self) -> &EventMeta {
        &self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_meta_and_fields() {
        let event = EntityCreated::new(
            "Widget",
            Uuid::now_v7(),
            serde_json::json!({"name": "gear"}),
        );
        let payload = event.payload().unwrap();

        assert!(payload.get("event_id").is_some());
        assert!(payload.get("occurred_at").is_some());
        assert_eq!(payload["entity_type"], "Widget");
        assert_eq!(payload["payload"]["name"], "gear");
    }

    #[test]
    fn test_type_tags_are_distinct() {
        let id = Uuid::now_v7();
        let created = EntityCreated::new("Widget", id, Value::Null);
        let deleted = EntityDeleted::new("Widget", id);

        assert_eq!(created.event_type(), "EntityCreated");
        assert_eq!(deleted.event_type(), "EntityDeleted");
        assert_ne!(created.event_type(), deleted.event_type());
    }

    #[test]
    fn test_events_round_trip_through_json() {
        let event = EntityUpdated::new("Widget", Uuid::now_v7(), serde_json::json!({"n": 2}));
        let json = serde_json::to_string(&event).unwrap();
        let back: EntityUpdated = serde_json::from_str(&json).unwrap();

        assert_eq!(back.meta, event.meta);
        assert_eq!(back.entity_id, event.entity_id);
        assert_eq!(back.changes, event.changes);
    }
}
