//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use groundwork::domain::{new_entity_id, Entity};
use groundwork::infra::{
    EntityStore, MemoryEngine, MemorySession, MemoryStore, Repository, SessionFactory, Storable,
    StoredRecord,
};
use groundwork::services::CrudService;
use groundwork::AppResult;

/// Test entity: a note with a title and body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(title: &str, body: &str) -> Self {
        let now = Utc::now();
        Self {
            id: new_entity_id(),
            title: title.to_string(),
            body: body.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Note {
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

/// Storage-side projection of [`Note`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord for NoteRecord {
    const COLLECTION: &'static str = "notes";

    fn record_id(&self) -> Uuid {
        self.id
    }
}

impl Storable for Note {
    type Record = NoteRecord;

    const NAME: &'static str = "Note";

    fn to_record(&self) -> AppResult<NoteRecord> {
        Ok(NoteRecord {
            id: self.id,
            title: self.title.clone(),
            body: self.body.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn from_record(record: NoteRecord) -> AppResult<Note> {
        Ok(Note {
            id: record.id,
            title: record.title,
            body: record.body,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Repository over the given session.
pub fn note_repo(session: &Arc<MemorySession>) -> Arc<dyn Repository<Note>> {
    let store = Arc::new(MemoryStore::<NoteRecord>::new(session.clone()));
    Arc::new(EntityStore::<Note>::new(store))
}

pub fn factory(engine: &MemoryEngine) -> Arc<dyn SessionFactory<Session = MemorySession>> {
    Arc::new(engine.clone())
}

/// CRUD service wired to the engine.
pub fn note_service(engine: &MemoryEngine) -> CrudService<Note, MemorySession> {
    CrudService::new(factory(engine), |session: Arc<MemorySession>| {
        note_repo(&session)
    })
}
