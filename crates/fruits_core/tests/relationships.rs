use fruits_core::{
    now_epoch_ms, Business, DepartmentId, EmployeeId, LoadState, NewEmployee,
    RelationshipRepository, RepoError, Schema, StagedWrite, StoreManager,
};
use rusqlite::types::Value;
use uuid::Uuid;

fn setup_repo() -> RelationshipRepository {
    let manager = StoreManager::open_in_memory(Schema::Relationships).unwrap();
    let repo = RelationshipRepository::new(manager);
    repo.load_all().unwrap();
    repo
}

async fn add_business(repo: &RelationshipRepository, name: &str) -> Uuid {
    let (id, reload) = repo.add_business(name).unwrap();
    reload.wait().await.unwrap();
    id
}

async fn add_department(repo: &RelationshipRepository, name: &str) -> DepartmentId {
    let (id, reload) = repo.add_department(name).unwrap();
    reload.wait().await.unwrap();
    id
}

async fn add_employee(repo: &RelationshipRepository, request: NewEmployee) -> EmployeeId {
    let (id, reload) = repo.add_employee(request).unwrap();
    reload.wait().await.unwrap();
    id
}

fn business(repo: &RelationshipRepository, id: Uuid) -> Business {
    repo.businesses()
        .into_iter()
        .find(|business| business.id == id)
        .unwrap()
}

fn permutations(items: &[&'static str]) -> Vec<Vec<&'static str>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for index in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(index);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            result.push(tail);
        }
    }
    result
}

#[tokio::test]
async fn businesses_are_sorted_by_name_for_every_insertion_order() {
    let orders = permutations(&["Cherry", "Apple", "Banana", "Apple"]);
    assert_eq!(orders.len(), 24);

    for order in orders {
        let repo = setup_repo();
        let mut inserted = Vec::new();
        for name in &order {
            inserted.push((name.to_string(), add_business(&repo, name).await));
        }

        // Stable sort keeps insertion order among equal names.
        let mut expected = inserted.clone();
        expected.sort_by(|left, right| left.0.cmp(&right.0));

        let actual: Vec<_> = repo
            .businesses()
            .into_iter()
            .map(|business| (business.name, business.id))
            .collect();
        assert_eq!(actual, expected, "insertion order {order:?}");
    }
}

#[tokio::test]
async fn departments_and_employees_keep_insertion_order() {
    let repo = setup_repo();
    let sales = add_department(&repo, "Sales").await;
    let admin = add_department(&repo, "Admin").await;
    let zoe = add_employee(&repo, NewEmployee::new("Zoe", 30, now_epoch_ms())).await;
    let adam = add_employee(&repo, NewEmployee::new("Adam", 50, now_epoch_ms())).await;

    let departments: Vec<_> = repo.departments().iter().map(|d| d.id).collect();
    assert_eq!(departments, vec![sales, admin]);
    let employees: Vec<_> = repo.employees().iter().map(|e| e.id).collect();
    assert_eq!(employees, vec![zoe, adam]);
}

#[tokio::test]
async fn add_employee_records_both_sides_of_memberships() {
    let repo = setup_repo();
    let apple = add_business(&repo, "Apple").await;
    let engineering = add_department(&repo, "Engineering").await;
    let joined = now_epoch_ms();

    let dima = add_employee(
        &repo,
        NewEmployee::new("Dima", 40, joined)
            .in_business(apple)
            .in_department(engineering),
    )
    .await;

    let employee = repo.employees().into_iter().find(|e| e.id == dima).unwrap();
    assert_eq!(employee.name, "Dima");
    assert_eq!(employee.age, 40);
    assert_eq!(employee.date_joined, joined);
    assert_eq!(employee.business_id, Some(apple));
    assert_eq!(employee.department_id, Some(engineering));
    assert_eq!(business(&repo, apple).employee_ids, vec![dima]);
    let department = repo.departments().into_iter().next().unwrap();
    assert_eq!(department.employee_ids, vec![dima]);
}

#[tokio::test]
async fn add_employee_rejects_unknown_references_before_staging() {
    let repo = setup_repo();
    add_business(&repo, "Apple").await;

    let err = repo
        .add_employee(NewEmployee::new("Dima", 40, 0).in_department(Uuid::new_v4()))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "department", .. }));
    assert_eq!(repo.load_state(), LoadState::Ready);
    assert_eq!(repo.businesses().len(), 1);
    assert!(!repo
        .manager()
        .with_store(|store| store.has_changes())
        .unwrap());
}

#[tokio::test]
async fn linking_business_and_department_is_idempotent() {
    let repo = setup_repo();
    let apple = add_business(&repo, "Apple").await;
    let engineering = add_department(&repo, "Engineering").await;

    repo.link_business_to_department(apple, engineering)
        .unwrap()
        .wait()
        .await
        .unwrap();
    repo.link_business_to_department(apple, engineering)
        .unwrap()
        .wait()
        .await
        .unwrap();

    let linked = business(&repo, apple);
    assert_eq!(linked.department_ids, vec![engineering]);
    assert!(linked.has_department(engineering));
    let department = repo.departments().into_iter().next().unwrap();
    assert_eq!(department.business_ids, vec![apple]);
}

#[tokio::test]
async fn linking_employee_moves_it_between_departments() {
    let repo = setup_repo();
    let sales = add_department(&repo, "Sales").await;
    let admin = add_department(&repo, "Admin").await;
    let dima = add_employee(&repo, NewEmployee::new("Dima", 40, 0).in_department(sales)).await;

    repo.link_department_to_employee(admin, dima)
        .unwrap()
        .wait()
        .await
        .unwrap();

    let departments = repo.departments();
    let sales_dept = departments.iter().find(|d| d.id == sales).unwrap();
    let admin_dept = departments.iter().find(|d| d.id == admin).unwrap();
    assert!(sales_dept.employee_ids.is_empty());
    assert_eq!(admin_dept.employee_ids, vec![dima]);
    let employee = repo.employees().into_iter().next().unwrap();
    assert_eq!(employee.department_id, Some(admin));
}

#[tokio::test]
async fn assign_employee_to_business_updates_back_reference() {
    let repo = setup_repo();
    let apple = add_business(&repo, "Apple").await;
    let dima = add_employee(&repo, NewEmployee::new("Dima", 40, 0)).await;

    repo.assign_employee_to_business(apple, dima)
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(business(&repo, apple).employee_ids, vec![dima]);
    assert_eq!(repo.employees()[0].business_id, Some(apple));
}

#[tokio::test]
async fn rename_business_resorts_collection() {
    let repo = setup_repo();
    let apple = add_business(&repo, "Apple").await;
    let banana = add_business(&repo, "Banana").await;

    repo.rename_business(apple, "Cherry")
        .unwrap()
        .wait()
        .await
        .unwrap();

    let ids: Vec<_> = repo.businesses().iter().map(|business| business.id).collect();
    assert_eq!(ids, vec![banana, apple]);
    assert_eq!(business(&repo, apple).name, "Cherry");
}

#[tokio::test]
async fn deleting_department_cleans_up_relationships() {
    let repo = setup_repo();
    let apple = add_business(&repo, "Apple").await;
    let engineering = add_department(&repo, "Engineering").await;
    let dima = add_employee(
        &repo,
        NewEmployee::new("Dima", 40, 0)
            .in_business(apple)
            .in_department(engineering),
    )
    .await;
    repo.link_business_to_department(apple, engineering)
        .unwrap()
        .wait()
        .await
        .unwrap();

    repo.delete_department(engineering)
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert!(repo.departments().is_empty());
    assert!(business(&repo, apple).department_ids.is_empty());
    let employee = repo.employees().into_iter().find(|e| e.id == dima).unwrap();
    assert_eq!(employee.department_id, None);
    assert_eq!(employee.business_id, Some(apple));
}

#[tokio::test]
async fn deleting_business_and_employee_removes_them() {
    let repo = setup_repo();
    let apple = add_business(&repo, "Apple").await;
    let dima = add_employee(&repo, NewEmployee::new("Dima", 40, 0).in_business(apple)).await;

    repo.delete_business(apple).unwrap().wait().await.unwrap();
    assert!(repo.businesses().is_empty());
    assert_eq!(repo.employees()[0].business_id, None);

    repo.delete_employee(dima).unwrap().wait().await.unwrap();
    assert!(repo.employees().is_empty());

    let err = repo.delete_employee(dima).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "employee", .. }));
}

#[tokio::test]
async fn load_employees_narrows_to_one_business() {
    let repo = setup_repo();
    let apple = add_business(&repo, "Apple").await;
    let pear = add_business(&repo, "Pear").await;
    let dima = add_employee(&repo, NewEmployee::new("Dima", 40, 0).in_business(apple)).await;
    add_employee(&repo, NewEmployee::new("Olga", 35, 0).in_business(pear)).await;
    add_employee(&repo, NewEmployee::new("Ivan", 22, 0)).await;

    repo.load_employees(apple).unwrap();
    let narrowed: Vec<_> = repo.employees().iter().map(|e| e.id).collect();
    assert_eq!(narrowed, vec![dima]);
    assert_eq!(repo.businesses().len(), 2);

    repo.load_employees(Uuid::new_v4()).unwrap();
    assert!(repo.employees().is_empty());

    repo.load_all().unwrap();
    assert_eq!(repo.employees().len(), 3);
}

#[tokio::test]
async fn failed_commit_empties_collections_until_next_success() {
    let repo = setup_repo();
    let apple = add_business(&repo, "Apple").await;

    repo.manager()
        .with_store(|store| {
            store.stage(
                StagedWrite::new(
                    "business",
                    apple,
                    "UPDATE businesses SET name = 'Ghost' WHERE uuid = ?1;",
                    vec![Value::Text(Uuid::new_v4().to_string())],
                )
                .requiring_row(),
            )
        })
        .unwrap();

    let (_, reload) = repo.add_department("Engineering").unwrap();
    let err = reload.wait().await.unwrap_err();
    assert!(matches!(err, RepoError::Persistence(_)));
    assert!(matches!(repo.load_state(), LoadState::Failed(_)));
    assert!(repo.businesses().is_empty());
    assert!(repo.departments().is_empty());
    assert!(repo.employees().is_empty());

    repo.load_all().unwrap();
    assert_eq!(repo.businesses().len(), 1);
    assert!(repo.departments().is_empty());

    let engineering = add_department(&repo, "Engineering").await;
    assert_eq!(repo.departments()[0].id, engineering);
    assert_eq!(repo.load_state(), LoadState::Ready);
}

#[tokio::test]
async fn narrowing_is_refused_while_reload_is_in_flight() {
    let repo = setup_repo();
    let apple = add_business(&repo, "Apple").await;

    let (_, reload) = repo.add_business("Banana").unwrap();
    assert!(!reload.is_finished());
    assert_eq!(repo.load_state(), LoadState::Reloading);

    let err = repo.load_employees(apple).unwrap_err();
    assert!(matches!(
        err,
        RepoError::ReloadPending {
            operation: "load_employees",
            in_flight: 1
        }
    ));
    assert_eq!(err.code(), "reload_pending");
    assert_eq!(repo.load_state(), LoadState::Reloading);
    assert!(matches!(
        repo.load_all(),
        Err(RepoError::ReloadPending { .. })
    ));

    reload.wait().await.unwrap();
    assert_eq!(repo.load_state(), LoadState::Ready);
    assert_eq!(repo.businesses().len(), 2);

    repo.load_employees(apple).unwrap();
    assert_eq!(repo.load_state(), LoadState::Ready);
    assert!(repo.employees().is_empty());
}

#[tokio::test]
async fn ready_waits_for_last_in_flight_reload() {
    let repo = setup_repo();

    let (_, first) = repo.add_business("Apple").unwrap();
    let (_, second) = repo.add_department("Sales").unwrap();
    assert_eq!(first.operation(), "add_business");

    first.wait().await.unwrap();
    if !second.is_finished() {
        assert_eq!(repo.load_state(), LoadState::Reloading);
    }

    second.wait().await.unwrap();
    assert_eq!(repo.load_state(), LoadState::Ready);
    assert_eq!(repo.businesses().len(), 1);
    assert_eq!(repo.departments().len(), 1);
}

#[tokio::test]
async fn fruits_store_cannot_back_relationship_repository() {
    let manager = StoreManager::open_in_memory(Schema::Fruits).unwrap();
    let repo = RelationshipRepository::new(manager);

    let err = repo.load_all().unwrap_err();
    assert!(matches!(err, RepoError::Fetch(_)));
    assert!(matches!(repo.load_state(), LoadState::Failed(_)));

    let err = repo.add_business("Apple").unwrap_err();
    assert!(matches!(err, RepoError::Staging(_)));
}

#[test]
fn relationship_commands_need_a_runtime() {
    let repo = setup_repo();

    assert!(matches!(
        repo.add_business("Apple"),
        Err(RepoError::NoRuntime)
    ));
    assert_eq!(repo.load_state(), LoadState::Ready);
}
