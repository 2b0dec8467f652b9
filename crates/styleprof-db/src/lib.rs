//! Postgres persistence for job records.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use styleprof_core::AppConfig;
use thiserror::Error;
use uuid::Uuid;

pub mod jobs;

pub use jobs::{
    complete_job, create_job, create_running_job, fail_job, get_job, list_jobs, list_stale_jobs,
    set_notification_state, start_job, JobRow,
};

// Relative to this crate's manifest.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Pool sizing used when no environment overrides are given.
impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }

    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("record not found")]
    NotFound,
    #[error("job {id} is not in expected state '{expected_state}'")]
    InvalidJobTransition {
        id: Uuid,
        expected_state: &'static str,
    },
    #[error("project '{project_id}' already has an active job")]
    ActiveJobExists { project_id: String },
    #[error("stored job {id} could not be decoded: {reason}")]
    Decode { id: Uuid, reason: String },
    #[error("value out of range for column '{column}'")]
    OutOfRange { column: &'static str },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Open a Postgres pool sized by `config`.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if no connection can be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(config.acquire_timeout())
        .connect(database_url)
        .await?;
    tracing::debug!(
        max_connections = config.max_connections,
        "postgres pool connected"
    );
    Ok(pool)
}

/// Open the pool described by `config.database_url` and the `db_*` settings.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] if no URL is configured, or
/// [`DbError::Sqlx`] if the connection fails.
pub async fn connect_from_app_config(config: &AppConfig) -> Result<PgPool, DbError> {
    let Some(database_url) = config.database_url.as_deref() else {
        return Err(DbError::MissingDatabaseUrl);
    };
    Ok(connect_pool(database_url, PoolConfig::from_app_config(config)).await?)
}

/// Apply pending migrations and return how many were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // Missing bookkeeping table means a fresh database.
    let applied: Vec<i64> =
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .unwrap_or_default();

    let pending = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .count();

    MIGRATOR.run(pool).await?;
    Ok(pending)
}

/// Round-trip a trivial query.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the database does not answer.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_: i32| ())
        .map_err(DbError::from)
}
