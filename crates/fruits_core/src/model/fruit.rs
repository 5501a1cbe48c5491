//! Fruit domain model.

use crate::model::EntityId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Suffix appended by the quick-edit action on the fruit list.
pub const FRUIT_UPDATE_MARKER: &str = " {...}";

/// One row of the fruit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fruit {
    pub id: EntityId,
    pub name: String,
}

impl Fruit {
    /// Creates a fruit with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a fruit with a caller-provided stable ID.
    pub fn with_id(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Applies the quick-edit mutation: appends [`FRUIT_UPDATE_MARKER`].
    pub fn mark_updated(&mut self) {
        self.name.push_str(FRUIT_UPDATE_MARKER);
    }
}
