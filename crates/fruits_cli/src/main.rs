//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire both stores and repositories from environment settings.
//! - Run one scripted session per repository and print the projections.
//!
//! # Invariants
//! - Without `FRUITS_DATA_DIR` every run starts from empty in-memory stores.

use fruits_core::{
    core_version, init_logging, now_epoch_ms, AppConfig, FruitRepository, NewEmployee,
    RelationshipRepository, Schema, StoreManager,
};
use log::info;
use std::error::Error;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[tokio::main]
async fn main() -> CliResult<()> {
    let config = AppConfig::from_env();
    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(&config.log_level, log_dir)?;
    }

    println!("fruits_core version={}", core_version());
    info!("event=cli_start module=cli status=ok");

    let fruits = FruitRepository::new(open_manager(&config, Schema::Fruits)?);
    fruits.load_all()?;
    fruit_session(&fruits).await?;

    let relationships = RelationshipRepository::new(open_manager(&config, Schema::Relationships)?);
    relationships.load_all()?;
    relationship_session(&relationships).await?;

    info!("event=cli_finish module=cli status=ok");
    Ok(())
}

fn open_manager(config: &AppConfig, schema: Schema) -> CliResult<StoreManager> {
    let manager = match config.db_path(schema) {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            StoreManager::open(&path, schema)?
        }
        None => StoreManager::open_in_memory(schema)?,
    };
    Ok(manager)
}

async fn fruit_session(repo: &FruitRepository) -> CliResult<()> {
    let (apple, reload) = repo.add_fruit("Apple")?;
    reload.wait().await?;
    let (_, reload) = repo.add_fruit("Pear")?;
    reload.wait().await?;

    repo.update_fruit(apple)?.wait().await?;
    if let Some(reload) = repo.delete_fruit(&[1])? {
        reload.wait().await?;
    }

    for (index, fruit) in repo.items().iter().enumerate() {
        println!("fruit[{index}] id={} name={}", fruit.id, fruit.name);
    }
    Ok(())
}

async fn relationship_session(repo: &RelationshipRepository) -> CliResult<()> {
    let (business, reload) = repo.add_business("Apple")?;
    reload.wait().await?;
    let (department, reload) = repo.add_department("Engineering")?;
    reload.wait().await?;
    let (employee, reload) = repo.add_employee(
        NewEmployee::new("Dima", 40, now_epoch_ms()).in_business(business),
    )?;
    reload.wait().await?;

    repo.link_business_to_department(business, department)?
        .wait()
        .await?;
    repo.link_department_to_employee(department, employee)?
        .wait()
        .await?;
    print_relationships(repo);

    repo.delete_department(department)?.wait().await?;
    print_relationships(repo);
    Ok(())
}

fn print_relationships(repo: &RelationshipRepository) {
    for business in repo.businesses() {
        println!(
            "business id={} name={} departments={} employees={}",
            business.id,
            business.name,
            business.department_ids.len(),
            business.employee_ids.len()
        );
    }
    for department in repo.departments() {
        println!(
            "department id={} name={} businesses={} employees={}",
            department.id,
            department.name,
            department.business_ids.len(),
            department.employee_ids.len()
        );
    }
    for employee in repo.employees() {
        let department = employee
            .department_id
            .map_or_else(|| "none".to_string(), |id| id.to_string());
        println!(
            "employee id={} name={} age={} department={department}",
            employee.id, employee.name, employee.age
        );
    }
}
