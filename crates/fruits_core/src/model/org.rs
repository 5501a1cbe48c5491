//! Business / Department / Employee domain model.
//!
//! # Responsibility
//! - Define the three related read models and the employee creation request.
//!
//! # Invariants
//! - Business↔Department membership is many-to-many and symmetric: a pair
//!   listed in `Business::department_ids` is listed in the matching
//!   `Department::business_ids` after the same fetch.
//! - An employee belongs to at most one business and one department.
//! - Relationship vectors keep store insertion order.

use crate::model::EntityId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BusinessId = EntityId;
pub type DepartmentId = EntityId;
pub type EmployeeId = EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    /// Departments this business is a member of.
    pub department_ids: Vec<DepartmentId>,
    /// Employees whose `business_id` points here.
    pub employee_ids: Vec<EmployeeId>,
}

impl Business {
    /// Creates a business with a generated stable ID and no relationships.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            department_ids: Vec::new(),
            employee_ids: Vec::new(),
        }
    }

    pub fn has_department(&self, department_id: DepartmentId) -> bool {
        self.department_ids.contains(&department_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    /// Businesses listing this department.
    pub business_ids: Vec<BusinessId>,
    /// Employees whose `department_id` points here.
    pub employee_ids: Vec<EmployeeId>,
}

impl Department {
    /// Creates a department with a generated stable ID and no relationships.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            business_ids: Vec::new(),
            employee_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    /// Free-form; not validated.
    pub age: i64,
    /// Unix epoch milliseconds.
    pub date_joined: i64,
    pub business_id: Option<BusinessId>,
    pub department_id: Option<DepartmentId>,
}

/// Creation request for [`Employee`].
///
/// Referenced business/department must be part of the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub age: i64,
    pub date_joined: i64,
    pub business_id: Option<BusinessId>,
    pub department_id: Option<DepartmentId>,
}

impl NewEmployee {
    /// Request without any relationship.
    pub fn new(name: impl Into<String>, age: i64, date_joined: i64) -> Self {
        Self {
            name: name.into(),
            age,
            date_joined,
            business_id: None,
            department_id: None,
        }
    }

    pub fn in_business(mut self, business_id: BusinessId) -> Self {
        self.business_id = Some(business_id);
        self
    }

    pub fn in_department(mut self, department_id: DepartmentId) -> Self {
        self.department_id = Some(department_id);
        self
    }

    /// Builds the employee with a generated stable ID.
    pub fn into_employee(self) -> Employee {
        Employee {
            id: Uuid::new_v4(),
            name: self.name,
            age: self.age,
            date_joined: self.date_joined,
            business_id: self.business_id,
            department_id: self.department_id,
        }
    }
}
