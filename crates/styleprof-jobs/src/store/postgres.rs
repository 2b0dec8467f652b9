use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use styleprof_core::{ChunkScores, Job, JobFailure, NewJob, NotificationState, StyleProfile};
use styleprof_db::{DbError, JobRow};
use uuid::Uuid;

use super::JobStore;
use crate::error::StoreError;

/// [`JobStore`] backed by the `jobs` table.
#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn store_error(err: DbError, id: Option<Uuid>) -> StoreError {
    match err {
        DbError::InvalidJobTransition { id, expected_state } => StoreError::InvalidTransition {
            id,
            expected: expected_state,
        },
        DbError::ActiveJobExists { project_id } => StoreError::Conflict { project_id },
        DbError::NotFound => StoreError::NotFound(id.unwrap_or_else(Uuid::nil)),
        other => StoreError::Backend(other.to_string()),
    }
}

fn decode(row: JobRow) -> Result<Job, StoreError> {
    row.into_job().map_err(|e| store_error(e, None))
}

fn decode_all(rows: Vec<JobRow>) -> Result<Vec<Job>, StoreError> {
    rows.into_iter().map(decode).collect()
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_job(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let row = styleprof_db::create_job(&self.pool, &new_job)
            .await
            .map_err(|e| store_error(e, None))?;
        decode(row)
    }

    async fn start_job(&self, id: Uuid) -> Result<Job, StoreError> {
        let row = styleprof_db::start_job(&self.pool, id)
            .await
            .map_err(|e| store_error(e, Some(id)))?;
        decode(row)
    }

    async fn create_running_job(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let row = styleprof_db::create_running_job(&self.pool, &new_job)
            .await
            .map_err(|e| store_error(e, None))?;
        decode(row)
    }

    async fn complete_job(
        &self,
        id: Uuid,
        profile: &StyleProfile,
        scores: &ChunkScores,
    ) -> Result<Job, StoreError> {
        let row = styleprof_db::complete_job(&self.pool, id, profile, scores)
            .await
            .map_err(|e| store_error(e, Some(id)))?;
        decode(row)
    }

    async fn fail_job(&self, id: Uuid, failure: &JobFailure) -> Result<Job, StoreError> {
        let row = styleprof_db::fail_job(&self.pool, id, failure)
            .await
            .map_err(|e| store_error(e, Some(id)))?;
        decode(row)
    }

    async fn set_notification_state(
        &self,
        id: Uuid,
        state: NotificationState,
    ) -> Result<Job, StoreError> {
        let row = styleprof_db::set_notification_state(&self.pool, id, state)
            .await
            .map_err(|e| store_error(e, Some(id)))?;
        decode(row)
    }

    async fn get_job(&self, id: Uuid) -> Result<Job, StoreError> {
        let row = styleprof_db::get_job(&self.pool, id)
            .await
            .map_err(|e| store_error(e, Some(id)))?;
        decode(row)
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = styleprof_db::list_jobs(&self.pool, limit)
            .await
            .map_err(|e| store_error(e, None))?;
        decode_all(rows)
    }

    async fn list_stale_jobs(&self, cutoff: DateTime<Utc>) -> Result<Vec<Job>, StoreError> {
        let rows = styleprof_db::list_stale_jobs(&self.pool, cutoff)
            .await
            .map_err(|e| store_error(e, None))?;
        decode_all(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_map_to_store_errors() {
        let id = Uuid::new_v4();
        assert!(matches!(
            store_error(DbError::NotFound, Some(id)),
            StoreError::NotFound(found) if found == id
        ));
        assert!(matches!(
            store_error(
                DbError::ActiveJobExists {
                    project_id: "p".to_string()
                },
                None
            ),
            StoreError::Conflict { .. }
        ));
        assert!(matches!(
            store_error(
                DbError::InvalidJobTransition {
                    id,
                    expected_state: "pending"
                },
                Some(id)
            ),
            StoreError::InvalidTransition {
                expected: "pending",
                ..
            }
        ));
        assert!(matches!(
            store_error(DbError::MissingDatabaseUrl, None),
            StoreError::Backend(_)
        ));
    }
}
