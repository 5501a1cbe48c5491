//! Domain model for the fruit list and the business relationship graph.
//!
//! # Responsibility
//! - Define plain data structures shared by store, repositories and callers.
//! - Keep storage details out of the model.
//!
//! # Invariants
//! - Every entity is identified by a stable `EntityId` assigned at
//!   construction and never reassigned.
//! - Relationship sets on read models are projections of persisted state.

pub mod fruit;
pub mod org;

use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier shared by every entity kind.
pub type EntityId = Uuid;

/// Current wall-clock time in Unix epoch milliseconds.
///
/// Clocks set before the epoch collapse to `0`.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
