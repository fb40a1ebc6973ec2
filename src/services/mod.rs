//! Services layer - Application use cases
//!
//! Generic CRUD orchestration over the repository and unit-of-work ports.

mod crud;

pub use crud::CrudService;
