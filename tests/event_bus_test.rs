//! In-memory event bus integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use groundwork::domain::{DomainEvent, EntityCreated, EntityDeleted, Event, EventMeta};
use groundwork::infra::{EventBus, MemoryEventBus};
use groundwork::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NoteArchived {
    #[serde(flatten)]
    meta: EventMeta,
    note_id: Uuid,
}

impl NoteArchived {
    fn new(note_id: Uuid) -> Self {
        Self {
            meta: EventMeta::new(),
            note_id,
        }
    }
}

impl Event for NoteArchived {
    const TYPE: &'static str = "NoteArchived";

    fn meta(&self) -> &EventMeta {
        &self.meta
    }
}

#[tokio::test]
async fn test_failing_handler_never_blocks_the_others() {
    let bus = MemoryEventBus::new();
    let successes = Arc::new(AtomicUsize::new(0));

    bus.subscribe::<NoteArchived, _, _>(|_event| async move {
        Err(AppError::validation("handler exploded"))
    });

    let counter = successes.clone();
    bus.subscribe::<NoteArchived, _, _>(move |_event| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    // publish itself must not raise
    bus.publish(&NoteArchived::new(Uuid::now_v7())).await.unwrap();

    assert_eq!(successes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_delivery_order_matches_subscription_order() {
    let bus = MemoryEventBus::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        let order = order.clone();
        bus.subscribe::<NoteArchived, _, _>(move |_event| {
            let order = order.clone();
            async move {
                order.lock().unwrap().push(tag);
                Ok(())
            }
        });
    }

    bus.publish(&NoteArchived::new(Uuid::now_v7())).await.unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_handlers_only_see_their_exact_event_type() {
    let bus = MemoryEventBus::new();
    let archived_seen = Arc::new(AtomicUsize::new(0));
    let created_seen = Arc::new(AtomicUsize::new(0));

    let counter = archived_seen.clone();
    bus.subscribe::<NoteArchived, _, _>(move |_event| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let counter = created_seen.clone();
    bus.subscribe::<EntityCreated, _, _>(move |_event| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    bus.publish(&NoteArchived::new(Uuid::now_v7())).await.unwrap();

    assert_eq!(archived_seen.load(Ordering::SeqCst), 1);
    assert_eq!(created_seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batch_delivery_preserves_input_order() {
    let bus = MemoryEventBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    bus.subscribe::<NoteArchived, _, _>(move |event: NoteArchived| {
        let sink = sink.clone();
        async move {
            sink.lock().unwrap().push(event.note_id);
            Ok(())
        }
    });

    let events: Vec<NoteArchived> = (0..3).map(|_| NoteArchived::new(Uuid::now_v7())).collect();
    let ids: Vec<Uuid> = events.iter().map(|e| e.note_id).collect();

    let batch: Vec<&dyn DomainEvent> = events.iter().map(|e| e as &dyn DomainEvent).collect();
    bus.publish_batch(&batch).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), ids);
}

#[tokio::test]
async fn test_handler_receives_the_event_fields() {
    let bus = MemoryEventBus::new();
    let received = Arc::new(Mutex::new(None));

    let sink = received.clone();
    bus.subscribe::<EntityDeleted, _, _>(move |event: EntityDeleted| {
        let sink = sink.clone();
        async move {
            *sink.lock().unwrap() = Some((event.entity_type.clone(), event.entity_id));
            Ok(())
        }
    });

    let id = Uuid::now_v7();
    bus.publish(&EntityDeleted::new("Note", id)).await.unwrap();

    assert_eq!(
        received.lock().unwrap().clone(),
        Some(("Note".to_string(), id))
    );
}
