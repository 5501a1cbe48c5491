//! Core data-access layer for the fruit list and the business relationship
//! graph: SQLite stores, observable repositories and the commit-and-reload
//! protocol that keeps them consistent.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use config::AppConfig;
pub use db::{DbError, DbResult, Schema};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::fruit::{Fruit, FRUIT_UPDATE_MARKER};
pub use model::org::{
    Business, BusinessId, Department, DepartmentId, Employee, EmployeeId, NewEmployee,
};
pub use model::{now_epoch_ms, EntityId};
pub use repo::entity_repo::EntityRepository;
pub use repo::fruit_repo::FruitRepository;
pub use repo::relationship_repo::RelationshipRepository;
pub use repo::reload::{LoadState, ReloadHandle};
pub use repo::{RepoError, RepoResult};
pub use store::{Entity, FetchRequest, SortKey, SqliteStore, StagedWrite, StoreManager};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
