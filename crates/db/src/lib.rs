use std::time::Duration;

use db_migration::Migrator;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub mod entities;
pub mod models;

pub use sea_orm::DbErr;

#[derive(Clone)]
pub struct DBService {
    pub db: DatabaseConnection,
}

impl DBService {
    /// Connects and brings the schema up to date. `database_url` is typically
    /// `sqlite://<path>?mode=rwc`; anything sea-orm understands works.
    pub async fn connect(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_owned());
        options
            .max_connections(5)
            .connect_timeout(Duration::from_secs(5))
            .acquire_timeout(Duration::from_secs(30))
            .sqlx_logging(false);

        let db = Database::connect(options).await?;
        Migrator::up(&db, None).await?;
        Ok(DBService { db })
    }

    /// Explicit shutdown counterpart to [`DBService::connect`].
    pub async fn close(self) -> Result<(), DbErr> {
        self.db.close().await
    }
}
