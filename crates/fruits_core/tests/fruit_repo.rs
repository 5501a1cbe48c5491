use fruits_core::{
    Fruit, FruitRepository, LoadState, RepoError, Schema, StoreManager, FRUIT_UPDATE_MARKER,
};
use uuid::Uuid;

fn setup_repo() -> FruitRepository {
    let manager = StoreManager::open_in_memory(Schema::Fruits).unwrap();
    let repo = FruitRepository::new(manager);
    repo.load_all().unwrap();
    repo
}

fn names(repo: &FruitRepository) -> Vec<String> {
    repo.items().into_iter().map(|fruit| fruit.name).collect()
}

#[tokio::test]
async fn load_all_on_empty_store_is_ready_and_empty() {
    let manager = StoreManager::open_in_memory(Schema::Fruits).unwrap();
    let repo = FruitRepository::new(manager);
    assert_eq!(repo.load_state(), LoadState::Idle);

    repo.load_all().unwrap();
    assert_eq!(repo.load_state(), LoadState::Ready);
    assert!(repo.items().is_empty());
}

#[tokio::test]
async fn add_fruit_clears_then_reloads_collection() {
    let repo = setup_repo();
    let (apple_id, reload) = repo.add_fruit("Apple").unwrap();
    reload.wait().await.unwrap();

    let (pear_id, reload) = repo.add_fruit("Pear").unwrap();
    assert!(repo.items().is_empty());
    assert_eq!(repo.load_state(), LoadState::Reloading);
    assert_eq!(reload.operation(), "add");

    reload.wait().await.unwrap();
    assert_eq!(repo.load_state(), LoadState::Ready);
    let ids: Vec<_> = repo.items().iter().map(|fruit| fruit.id).collect();
    assert_eq!(ids, vec![apple_id, pear_id]);
    assert_eq!(names(&repo), vec!["Apple", "Pear"]);
}

#[tokio::test]
async fn subscribers_observe_reloaded_collection() {
    let repo = setup_repo();
    let mut items = repo.subscribe();
    let mut state = repo.subscribe_load_state();

    let (_, reload) = repo.add_fruit("Kiwi").unwrap();
    reload.wait().await.unwrap();

    assert!(items.has_changed().unwrap());
    let latest = items.borrow_and_update().clone();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].name, "Kiwi");
    assert_eq!(*state.borrow_and_update(), LoadState::Ready);
}

#[tokio::test]
async fn update_fruit_appends_marker_each_time() {
    let repo = setup_repo();
    let (id, reload) = repo.add_fruit("Apple").unwrap();
    reload.wait().await.unwrap();

    repo.update_fruit(id).unwrap().wait().await.unwrap();
    assert_eq!(repo.find(id).unwrap().name, format!("Apple{FRUIT_UPDATE_MARKER}"));

    repo.update_fruit(id).unwrap().wait().await.unwrap();
    assert_eq!(
        repo.find(id).unwrap().name,
        format!("Apple{FRUIT_UPDATE_MARKER}{FRUIT_UPDATE_MARKER}")
    );
    assert_eq!(repo.items().len(), 1);
}

#[tokio::test]
async fn rename_fruit_replaces_name() {
    let repo = setup_repo();
    let (id, reload) = repo.add_fruit("Aple").unwrap();
    reload.wait().await.unwrap();

    repo.rename_fruit(id, "Apple").unwrap().wait().await.unwrap();
    assert_eq!(names(&repo), vec!["Apple"]);
}

#[tokio::test]
async fn delete_fruit_honors_only_first_index() {
    let repo = setup_repo();
    for name in ["Apple", "Pear", "Kiwi"] {
        let (_, reload) = repo.add_fruit(name).unwrap();
        reload.wait().await.unwrap();
    }

    let reload = repo.delete_fruit(&[1, 0, 2]).unwrap().unwrap();
    reload.wait().await.unwrap();
    assert_eq!(names(&repo), vec!["Apple", "Kiwi"]);

    assert!(repo.delete_fruit(&[]).unwrap().is_none());
    assert_eq!(names(&repo), vec!["Apple", "Kiwi"]);
}

#[tokio::test]
async fn delete_fruit_out_of_range_leaves_collection_untouched() {
    let repo = setup_repo();
    let (_, reload) = repo.add_fruit("Apple").unwrap();
    reload.wait().await.unwrap();

    let err = repo.delete_fruit(&[5]).unwrap_err();
    assert!(matches!(err, RepoError::IndexOutOfRange { index: 5, len: 1 }));
    assert_eq!(err.code(), "index_out_of_range");
    assert_eq!(names(&repo), vec!["Apple"]);
    assert_eq!(repo.load_state(), LoadState::Ready);
}

#[tokio::test]
async fn commands_on_unknown_ids_return_not_found() {
    let repo = setup_repo();
    let missing = Uuid::new_v4();

    let err = repo.update_fruit(missing).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "fruit", id } if id == missing));
    assert!(matches!(
        repo.delete(missing),
        Err(RepoError::NotFound { .. })
    ));
    assert!(matches!(
        repo.update(Fruit::new("Ghost")),
        Err(RepoError::NotFound { .. })
    ));
}

#[tokio::test]
async fn failed_commit_reports_persistence_and_recovers() {
    let repo = setup_repo();
    let (id, reload) = repo.add_fruit("Apple").unwrap();
    reload.wait().await.unwrap();

    // Row vanishes behind the repository's back.
    repo.manager()
        .with_store(|store| {
            store
                .connection()
                .execute("DELETE FROM fruits WHERE uuid = ?1;", [id.to_string()])
        })
        .unwrap()
        .unwrap();

    let err = repo.rename_fruit(id, "Pear").unwrap().wait().await.unwrap_err();
    assert!(matches!(err, RepoError::Persistence(_)));
    assert_eq!(err.code(), "commit_failed");
    assert!(matches!(repo.load_state(), LoadState::Failed(_)));
    assert!(repo.items().is_empty());

    repo.load_all().unwrap();
    assert!(repo.items().is_empty());
    let (_, reload) = repo.add_fruit("Kiwi").unwrap();
    reload.wait().await.unwrap();
    assert_eq!(names(&repo), vec!["Kiwi"]);
}

#[tokio::test]
async fn reopened_file_store_keeps_committed_fruits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fruits.sqlite3");

    {
        let repo = FruitRepository::new(StoreManager::open(&path, Schema::Fruits).unwrap());
        repo.load_all().unwrap();
        let (_, reload) = repo.add_fruit("Apple").unwrap();
        reload.wait().await.unwrap();
    }

    let repo = FruitRepository::new(StoreManager::open(&path, Schema::Fruits).unwrap());
    repo.load_all().unwrap();
    assert_eq!(names(&repo), vec!["Apple"]);
}

#[test]
fn commands_outside_runtime_fail_without_side_effects() {
    let repo = setup_repo();

    let err = repo.add_fruit("Apple").unwrap_err();
    assert!(matches!(err, RepoError::NoRuntime));
    assert_eq!(repo.load_state(), LoadState::Ready);
    assert!(!repo
        .manager()
        .with_store(|store| store.has_changes())
        .unwrap());
}
