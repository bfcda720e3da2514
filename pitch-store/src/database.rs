use pitch_core::RepositoryError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

// Postgres error code for exclusion constraint violations
const EXCLUSION_VIOLATION: &str = "23P01";

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Maps constraint violations to `Conflict`, everything else to `Database`.
pub(crate) fn db_error(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() || db.is_foreign_key_violation() || db.code().as_deref() == Some(EXCLUSION_VIOLATION) {
            return RepositoryError::Conflict(db.message().to_string());
        }
    }
    RepositoryError::Database(err.to_string())
}

pub(crate) fn corrupt(what: &str, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Corrupt(format!("{}: {}", what, err))
}
