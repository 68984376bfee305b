use std::{str::FromStr, time::Duration};

use sqlx::{
    Error, SqlitePool,
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
};
use thiserror::Error;
use tracing::info;

pub mod models;

#[derive(Debug, Error)]
pub enum DBError {
    #[error("database error: {0}")]
    Database(#[from] Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] MigrateError),
}

/// Process-wide handle to the lead store. Cloning shares the pool.
#[derive(Clone)]
pub struct DBService {
    pub pool: SqlitePool,
}

impl DBService {
    /// Connect to `database_url`, creating the file if needed, and apply
    /// pending migrations.
    pub async fn new(database_url: &str) -> Result<DBService, DBError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Single-connection in-memory store. Every call yields a fresh database.
    pub async fn new_in_memory() -> Result<DBService, DBError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // Each connection to :memory: is its own database, so pin one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<DBService, DBError> {
        let migrator = sqlx::migrate!("./migrations");
        migrator.run(&pool).await?;
        info!(
            migrations = migrator.iter().count(),
            "Lead store ready"
        );
        Ok(DBService { pool })
    }
}
