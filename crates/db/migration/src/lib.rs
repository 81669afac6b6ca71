use sea_orm_migration::prelude::*;

mod m20250815000000_baseline;
mod m20260110000000_task_extras;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250815000000_baseline::Migration),
            Box::new(m20260110000000_task_extras::Migration),
        ]
    }
}
