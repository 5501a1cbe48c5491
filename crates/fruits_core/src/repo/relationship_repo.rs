//! Business / Department / Employee repository.
//!
//! # Responsibility
//! - Cache the three related collections and publish them to subscribers.
//! - Stage entity and relationship writes, then commit-and-reload all three
//!   collections together.
//!
//! # Invariants
//! - Businesses are ordered by name, ties by insertion order.
//! - Departments and employees keep store insertion order.
//! - Business↔Department links are additive and idempotent.
//! - An employee has one department: linking moves it (single foreign key).
//! - Deletes rely on store foreign keys to drop memberships and null
//!   employee back-references.

use crate::db::DbResult;
use crate::model::org::{
    Business, BusinessId, Department, DepartmentId, Employee, EmployeeId, NewEmployee,
};
use crate::repo::collection::Collection;
use crate::repo::reload::{LoadState, ReloadHandle, Reloader};
use crate::repo::{RepoError, RepoResult};
use crate::store::{Entity, FetchRequest, SqliteStore, StagedWrite, StoreManager};
use log::info;
use rusqlite::types::Value;
use tokio::sync::watch;

const LINK_BUSINESS_DEPARTMENT_SQL: &str = "INSERT OR IGNORE INTO business_departments (
    business_uuid,
    department_uuid
) VALUES (?1, ?2);";

const SET_EMPLOYEE_DEPARTMENT_SQL: &str = "UPDATE employees
 SET department_uuid = ?2
 WHERE uuid = ?1;";

const SET_EMPLOYEE_BUSINESS_SQL: &str = "UPDATE employees
 SET business_uuid = ?2
 WHERE uuid = ?1;";

/// All three collections fetched in one pass.
struct Snapshot {
    businesses: Vec<Business>,
    departments: Vec<Department>,
    employees: Vec<Employee>,
}

/// Observable repository over the relationship store.
pub struct RelationshipRepository {
    reloader: Reloader,
    businesses: Collection<Business>,
    departments: Collection<Department>,
    employees: Collection<Employee>,
}

impl RelationshipRepository {
    /// Creates an empty repository; call [`load_all`](Self::load_all) to fill it.
    pub fn new(manager: StoreManager) -> Self {
        Self {
            reloader: Reloader::new(manager),
            businesses: Collection::new(),
            departments: Collection::new(),
            employees: Collection::new(),
        }
    }

    pub fn manager(&self) -> &StoreManager {
        self.reloader.manager()
    }

    /// Replaces all three collections with committed rows.
    ///
    /// Collections are only replaced when every fetch succeeded. Refused with
    /// `ReloadPending` while a command's commit-and-reload is still running.
    pub fn load_all(&self) -> RepoResult<()> {
        let snapshot = self.reloader.load_now("load_all", |store| fetch_snapshot(store))?;
        publish(
            &self.businesses,
            &self.departments,
            &self.employees,
            snapshot,
        );
        Ok(())
    }

    /// Replaces the employee collection with employees of `business_id`.
    ///
    /// Call [`load_all`](Self::load_all) to get the full set back. Refused
    /// with `ReloadPending` while a command's commit-and-reload is running.
    pub fn load_employees(&self, business_id: BusinessId) -> RepoResult<()> {
        let employees = self.reloader.load_now("load_employees", move |store| {
            store.fetch::<Employee>(
                &FetchRequest::all().filter_id("business_uuid", business_id),
            )
        })?;
        info!(
            "event=repo_narrow module=repo status=ok entity=employee business={business_id} rows={}",
            employees.len()
        );
        self.employees.replace(employees);
        Ok(())
    }

    pub fn businesses(&self) -> Vec<Business> {
        self.businesses.snapshot()
    }

    pub fn departments(&self) -> Vec<Department> {
        self.departments.snapshot()
    }

    pub fn employees(&self) -> Vec<Employee> {
        self.employees.snapshot()
    }

    pub fn subscribe_businesses(&self) -> watch::Receiver<Vec<Business>> {
        self.businesses.subscribe()
    }

    pub fn subscribe_departments(&self) -> watch::Receiver<Vec<Department>> {
        self.departments.subscribe()
    }

    pub fn subscribe_employees(&self) -> watch::Receiver<Vec<Employee>> {
        self.employees.subscribe()
    }

    pub fn load_state(&self) -> LoadState {
        self.reloader.load_state()
    }

    pub fn subscribe_load_state(&self) -> watch::Receiver<LoadState> {
        self.reloader.subscribe()
    }

    pub fn add_business(&self, name: impl Into<String>) -> RepoResult<(BusinessId, ReloadHandle)> {
        let business = Business::new(name);
        let id = business.id;
        let reload = self.schedule("add_business", move |store| store.insert(&business))?;
        Ok((id, reload))
    }

    pub fn add_department(
        &self,
        name: impl Into<String>,
    ) -> RepoResult<(DepartmentId, ReloadHandle)> {
        let department = Department::new(name);
        let id = department.id;
        let reload = self.schedule("add_department", move |store| store.insert(&department))?;
        Ok((id, reload))
    }

    /// Creates an employee, optionally attached to a loaded business and
    /// department.
    pub fn add_employee(&self, request: NewEmployee) -> RepoResult<(EmployeeId, ReloadHandle)> {
        if let Some(business_id) = request.business_id {
            self.require_business(business_id)?;
        }
        if let Some(department_id) = request.department_id {
            self.require_department(department_id)?;
        }

        let employee = request.into_employee();
        let id = employee.id;
        let reload = self.schedule("add_employee", move |store| store.insert(&employee))?;
        Ok((id, reload))
    }

    pub fn rename_business(
        &self,
        business_id: BusinessId,
        name: impl Into<String>,
    ) -> RepoResult<ReloadHandle> {
        let mut business = self.require_business(business_id)?;
        business.name = name.into();
        self.schedule("rename_business", move |store| store.update(&business))
    }

    /// Adds `department_id` to the business's department set.
    pub fn link_business_to_department(
        &self,
        business_id: BusinessId,
        department_id: DepartmentId,
    ) -> RepoResult<ReloadHandle> {
        self.require_business(business_id)?;
        self.require_department(department_id)?;
        self.schedule("link_business_department", move |store| {
            store.stage(StagedWrite::new(
                Business::NAME,
                business_id,
                LINK_BUSINESS_DEPARTMENT_SQL,
                vec![
                    Value::Text(business_id.to_string()),
                    Value::Text(department_id.to_string()),
                ],
            ));
            Ok(())
        })
    }

    /// Adds the employee to the department's employee set.
    ///
    /// The employee leaves its previous department, if any.
    pub fn link_department_to_employee(
        &self,
        department_id: DepartmentId,
        employee_id: EmployeeId,
    ) -> RepoResult<ReloadHandle> {
        self.require_department(department_id)?;
        self.require_employee(employee_id)?;
        self.schedule("link_department_employee", move |store| {
            store.stage(
                StagedWrite::new(
                    Employee::NAME,
                    employee_id,
                    SET_EMPLOYEE_DEPARTMENT_SQL,
                    vec![
                        Value::Text(employee_id.to_string()),
                        Value::Text(department_id.to_string()),
                    ],
                )
                .requiring_row(),
            );
            Ok(())
        })
    }

    /// Makes `business_id` the employee's business.
    pub fn assign_employee_to_business(
        &self,
        business_id: BusinessId,
        employee_id: EmployeeId,
    ) -> RepoResult<ReloadHandle> {
        self.require_business(business_id)?;
        self.require_employee(employee_id)?;
        self.schedule("assign_employee_business", move |store| {
            store.stage(
                StagedWrite::new(
                    Employee::NAME,
                    employee_id,
                    SET_EMPLOYEE_BUSINESS_SQL,
                    vec![
                        Value::Text(employee_id.to_string()),
                        Value::Text(business_id.to_string()),
                    ],
                )
                .requiring_row(),
            );
            Ok(())
        })
    }

    pub fn delete_department(&self, department_id: DepartmentId) -> RepoResult<ReloadHandle> {
        self.require_department(department_id)?;
        self.schedule("delete_department", move |store| {
            store.delete::<Department>(department_id)
        })
    }

    pub fn delete_business(&self, business_id: BusinessId) -> RepoResult<ReloadHandle> {
        self.require_business(business_id)?;
        self.schedule("delete_business", move |store| {
            store.delete::<Business>(business_id)
        })
    }

    pub fn delete_employee(&self, employee_id: EmployeeId) -> RepoResult<ReloadHandle> {
        self.require_employee(employee_id)?;
        self.schedule("delete_employee", move |store| {
            store.delete::<Employee>(employee_id)
        })
    }

    fn require_business(&self, id: BusinessId) -> RepoResult<Business> {
        self.businesses
            .find(|business| business.id == id)
            .ok_or(RepoError::NotFound {
                entity: Business::NAME,
                id,
            })
    }

    fn require_department(&self, id: DepartmentId) -> RepoResult<Department> {
        self.departments
            .find(|department| department.id == id)
            .ok_or(RepoError::NotFound {
                entity: Department::NAME,
                id,
            })
    }

    fn require_employee(&self, id: EmployeeId) -> RepoResult<Employee> {
        self.employees
            .find(|employee| employee.id == id)
            .ok_or(RepoError::NotFound {
                entity: Employee::NAME,
                id,
            })
    }

    fn schedule(
        &self,
        operation: &'static str,
        stage: impl FnOnce(&mut SqliteStore) -> DbResult<()>,
    ) -> RepoResult<ReloadHandle> {
        let (businesses, departments, employees) = (
            self.businesses.clone(),
            self.departments.clone(),
            self.employees.clone(),
        );
        let cleared = (
            self.businesses.clone(),
            self.departments.clone(),
            self.employees.clone(),
        );
        self.reloader.commit_and_reload(
            operation,
            stage,
            move || {
                cleared.0.clear();
                cleared.1.clear();
                cleared.2.clear();
            },
            move |store| {
                let snapshot = fetch_snapshot(store)?;
                publish(&businesses, &departments, &employees, snapshot);
                Ok(())
            },
        )
    }
}

fn fetch_snapshot(store: &SqliteStore) -> DbResult<Snapshot> {
    Ok(Snapshot {
        businesses: store
            .fetch::<Business>(&FetchRequest::all().sorted_by(Business::DEFAULT_SORT))?,
        departments: store.fetch::<Department>(&FetchRequest::all())?,
        employees: store.fetch::<Employee>(&FetchRequest::all())?,
    })
}

fn publish(
    businesses: &Collection<Business>,
    departments: &Collection<Department>,
    employees: &Collection<Employee>,
    snapshot: Snapshot,
) {
    businesses.replace(snapshot.businesses);
    departments.replace(snapshot.departments);
    employees.replace(snapshot.employees);
}
