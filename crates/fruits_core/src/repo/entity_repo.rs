//! Generic single-collection repository.
//!
//! # Responsibility
//! - Provide load/add/update/delete over one [`Entity`] collection.
//! - Keep the observable collection consistent via commit-and-reload.
//!
//! # Invariants
//! - `update`/`delete` targets must be present in the current snapshot.
//! - Loaded items follow `E::DEFAULT_SORT`, then store insertion order.

use crate::db::DbResult;
use crate::model::EntityId;
use crate::repo::collection::Collection;
use crate::repo::reload::{LoadState, ReloadHandle, Reloader};
use crate::repo::{RepoError, RepoResult};
use crate::store::{Entity, FetchRequest, SqliteStore, StoreManager};
use tokio::sync::watch;

/// Observable CRUD repository over one entity schema.
pub struct EntityRepository<E: Entity> {
    reloader: Reloader,
    items: Collection<E>,
}

impl<E: Entity> EntityRepository<E> {
    /// Creates an empty repository; call [`load_all`](Self::load_all) to fill it.
    pub fn new(manager: StoreManager) -> Self {
        Self {
            reloader: Reloader::new(manager),
            items: Collection::new(),
        }
    }

    pub fn manager(&self) -> &StoreManager {
        self.reloader.manager()
    }

    /// Replaces the collection with every committed row.
    pub fn load_all(&self) -> RepoResult<()> {
        let items = self
            .reloader
            .load_now("load_all", |store| fetch_all::<E>(store))?;
        self.items.replace(items);
        Ok(())
    }

    pub fn items(&self) -> Vec<E> {
        self.items.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<E>> {
        self.items.subscribe()
    }

    pub fn load_state(&self) -> LoadState {
        self.reloader.load_state()
    }

    pub fn subscribe_load_state(&self) -> watch::Receiver<LoadState> {
        self.reloader.subscribe()
    }

    pub fn find(&self, id: EntityId) -> Option<E> {
        self.items.find(|item| item.id() == id)
    }

    /// Stages `entity` as a new row and schedules commit-and-reload.
    pub fn add(&self, entity: E) -> RepoResult<ReloadHandle> {
        self.schedule("add", move |store| store.insert(&entity))
    }

    /// Stages a full update of a loaded entity.
    pub fn update(&self, entity: E) -> RepoResult<ReloadHandle> {
        self.require(entity.id())?;
        self.schedule("update", move |store| store.update(&entity))
    }

    /// Stages removal of a loaded entity by id.
    pub fn delete(&self, id: EntityId) -> RepoResult<ReloadHandle> {
        self.require(id)?;
        self.schedule("delete", move |store| store.delete::<E>(id))
    }

    /// Stages removal of the entity at `index` of the current snapshot.
    pub fn delete_at(&self, index: usize) -> RepoResult<ReloadHandle> {
        let target = self.at(index)?;
        self.schedule("delete", move |store| store.delete::<E>(target.id()))
    }

    pub(crate) fn require(&self, id: EntityId) -> RepoResult<E> {
        self.find(id)
            .ok_or(RepoError::NotFound { entity: E::NAME, id })
    }

    pub(crate) fn at(&self, index: usize) -> RepoResult<E> {
        self.items.get(index).ok_or_else(|| RepoError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    fn schedule(
        &self,
        operation: &'static str,
        stage: impl FnOnce(&mut SqliteStore) -> DbResult<()>,
    ) -> RepoResult<ReloadHandle> {
        let cleared = self.items.clone();
        let reloaded = self.items.clone();
        self.reloader.commit_and_reload(
            operation,
            stage,
            move || cleared.clear(),
            move |store| {
                reloaded.replace(fetch_all::<E>(store)?);
                Ok(())
            },
        )
    }
}

fn fetch_all<E: Entity>(store: &SqliteStore) -> DbResult<Vec<E>> {
    store.fetch::<E>(&FetchRequest::all().sorted_by(E::DEFAULT_SORT))
}
