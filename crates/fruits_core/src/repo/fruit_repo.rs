//! Fruit list use-cases on top of the generic repository.
//!
//! # Responsibility
//! - Provide the commands issued by the fruit list screen.
//!
//! # Invariants
//! - `update_fruit` is the quick-edit action: it appends
//!   [`FRUIT_UPDATE_MARKER`](crate::model::fruit::FRUIT_UPDATE_MARKER) and
//!   takes no new content. `rename_fruit` is the real edit command.
//! - Names are not validated here; the caller rejects empty input.

use crate::model::fruit::Fruit;
use crate::model::EntityId;
use crate::repo::entity_repo::EntityRepository;
use crate::repo::reload::ReloadHandle;
use crate::repo::RepoResult;

pub type FruitRepository = EntityRepository<Fruit>;

impl EntityRepository<Fruit> {
    /// Creates a fruit named `name`.
    pub fn add_fruit(&self, name: impl Into<String>) -> RepoResult<(EntityId, ReloadHandle)> {
        let fruit = Fruit::new(name);
        let id = fruit.id;
        let reload = self.add(fruit)?;
        Ok((id, reload))
    }

    /// Applies the quick-edit marker to a loaded fruit.
    pub fn update_fruit(&self, id: EntityId) -> RepoResult<ReloadHandle> {
        let mut fruit = self.require(id)?;
        fruit.mark_updated();
        self.update(fruit)
    }

    /// Replaces the name of a loaded fruit.
    pub fn rename_fruit(&self, id: EntityId, name: impl Into<String>) -> RepoResult<ReloadHandle> {
        let mut fruit = self.require(id)?;
        fruit.name = name.into();
        self.update(fruit)
    }

    /// Deletes the fruit shown at the first position of `indexes`.
    ///
    /// Mirrors list swipe-to-delete, which reports a set of row positions of
    /// which only the first is honored. An empty set is a no-op.
    pub fn delete_fruit(&self, indexes: &[usize]) -> RepoResult<Option<ReloadHandle>> {
        match indexes.first() {
            Some(&index) => self.delete_at(index).map(Some),
            None => Ok(None),
        }
    }
}
