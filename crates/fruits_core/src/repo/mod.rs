//! Repository layer: observable in-memory collections kept in step with the
//! store through the commit-and-reload protocol.
//!
//! # Responsibility
//! - Expose command APIs (add/update/link/delete) to the presentation layer.
//! - Validate command targets against the current in-memory snapshot.
//! - Publish collections and load state through watch channels.
//!
//! # Invariants
//! - Every mutation clears the repository's collections, commits, then
//!   re-fetches them; the view never mixes pre- and post-mutation rows.
//! - Repository APIs return semantic errors (`NotFound`, `IndexOutOfRange`)
//!   before touching the store.

pub mod collection;
pub mod entity_repo;
pub mod fruit_repo;
pub mod relationship_repo;
pub mod reload;

use crate::db::DbError;
use crate::model::EntityId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for load, command and commit failures.
#[derive(Debug)]
pub enum RepoError {
    /// Query against the store failed.
    Fetch(DbError),
    /// Commit failed; nothing from the transaction was applied.
    Persistence(DbError),
    /// A write could not be queued.
    Staging(DbError),
    /// Command referenced an id absent from the in-memory snapshot.
    NotFound {
        entity: &'static str,
        id: EntityId,
    },
    /// Command referenced a position outside the in-memory snapshot.
    IndexOutOfRange { index: usize, len: usize },
    /// Commit-and-reload was requested outside a Tokio runtime.
    NoRuntime,
    /// Synchronous load refused while commit-and-reload tasks are in flight.
    ReloadPending {
        operation: &'static str,
        in_flight: usize,
    },
    /// The commit-and-reload task panicked or was aborted.
    TaskFailed(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "fetch failed: {err}"),
            Self::Persistence(err) => write!(f, "commit failed: {err}"),
            Self::Staging(err) => write!(f, "staging failed: {err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for {len} items")
            }
            Self::NoRuntime => write!(f, "commit-and-reload requires a Tokio runtime"),
            Self::ReloadPending {
                operation,
                in_flight,
            } => write!(
                f,
                "{operation} refused: {in_flight} commit-and-reload task(s) still running"
            ),
            Self::TaskFailed(message) => write!(f, "reload task failed: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) | Self::Persistence(err) | Self::Staging(err) => Some(err),
            Self::NotFound { .. }
            | Self::IndexOutOfRange { .. }
            | Self::NoRuntime
            | Self::ReloadPending { .. }
            | Self::TaskFailed(_) => None,
        }
    }
}

impl RepoError {
    /// Stable code for structured log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch_failed",
            Self::Persistence(_) => "commit_failed",
            Self::Staging(_) => "staging_failed",
            Self::NotFound { .. } => "not_found",
            Self::IndexOutOfRange { .. } => "index_out_of_range",
            Self::NoRuntime => "no_runtime",
            Self::ReloadPending { .. } => "reload_pending",
            Self::TaskFailed(_) => "task_failed",
        }
    }
}
