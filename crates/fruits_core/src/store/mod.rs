//! Transactional persistence engine.
//!
//! # Responsibility
//! - Map models to tables ([`Entity`]).
//! - Provide the fetch / stage / commit unit of work ([`SqliteStore`]).
//! - Share one store between repositories ([`StoreManager`]).

pub mod entity;
pub mod manager;
pub mod request;
pub mod sqlite_store;

pub use entity::Entity;
pub use manager::StoreManager;
pub use request::{FetchRequest, SortKey};
pub use sqlite_store::{SqliteStore, StagedWrite};
