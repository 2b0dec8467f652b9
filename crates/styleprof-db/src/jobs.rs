//! Database operations for the `jobs` table.
//!
//! Every state change is a conditional `UPDATE ... WHERE state = <expected>`;
//! zero affected rows means the transition was illegal.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use styleprof_core::{
    ChunkScores, FailureKind, Job, JobFailure, JobState, NewJob, NotificationState, StyleProfile,
};
use uuid::Uuid;

use crate::DbError;

const ACTIVE_JOB_INDEX: &str = "jobs_one_active_per_project";

const JOB_COLUMNS: &str = "id, project_id, client_id, display_name, transcript_ref, state, \
     notification_state, attempt, retry_of, error_kind, error_message, profile, scores, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub project_id: String,
    pub client_id: String,
    pub display_name: Option<String>,
    pub transcript_ref: String,
    pub state: String,
    pub notification_state: String,
    pub attempt: i32,
    pub retry_of: Option<Uuid>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
    pub profile: Option<serde_json::Value>,
    pub scores: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRow {
    /// Decode the row into the domain [`Job`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if a text or JSONB column holds a value
    /// the domain types do not recognise.
    pub fn into_job(self) -> Result<Job, DbError> {
        let id = self.id;
        let decode = |reason: String| DbError::Decode { id, reason };

        let state: JobState = self.state.parse().map_err(decode)?;
        let notification_state: NotificationState =
            self.notification_state.parse().map_err(decode)?;
        let attempt = u32::try_from(self.attempt).map_err(|e| decode(e.to_string()))?;

        let error = match self.error_kind {
            Some(kind) => Some(JobFailure::new(
                kind.parse::<FailureKind>().map_err(decode)?,
                self.error_message.unwrap_or_default(),
            )),
            None => None,
        };
        let profile = self
            .profile
            .map(serde_json::from_value::<StyleProfile>)
            .transpose()
            .map_err(|e| decode(format!("profile: {e}")))?;
        let scores = self
            .scores
            .map(serde_json::from_value::<ChunkScores>)
            .transpose()
            .map_err(|e| decode(format!("scores: {e}")))?;

        Ok(Job {
            id,
            project_id: self.project_id,
            client_id: self.client_id,
            display_name: self.display_name,
            transcript_ref: self.transcript_ref,
            state,
            notification_state,
            attempt,
            retry_of: self.retry_of,
            error,
            profile,
            scores,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a new job in `pending` state.
///
/// Generates the UUID in Rust. The partial unique index on `project_id`
/// rejects the insert while another job for the project is pending or
/// running.
///
/// # Errors
///
/// - [`DbError::ActiveJobExists`] if the project already holds an active job.
/// - [`DbError::Sqlx`] if the insert fails for any other reason.
pub async fn create_job(pool: &PgPool, new_job: &NewJob) -> Result<JobRow, DbError> {
    insert_pending(pool, new_job).await
}

/// Marks a `pending` job as `running`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not pending, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_job(pool: &PgPool, id: Uuid) -> Result<JobRow, DbError> {
    mark_running(pool, id).await
}

/// Inserts a job and moves it to `running` in one transaction.
///
/// A failure rolls back the insert, so no `pending` row is left holding the
/// project's slot.
///
/// # Errors
///
/// Same as [`create_job`] and [`start_job`].
pub async fn create_running_job(pool: &PgPool, new_job: &NewJob) -> Result<JobRow, DbError> {
    let mut tx = pool.begin().await?;
    let pending = insert_pending(&mut *tx, new_job).await?;
    let running = mark_running(&mut *tx, pending.id).await?;
    tx.commit().await?;
    Ok(running)
}

async fn insert_pending<'e, E>(executor: E, new_job: &NewJob) -> Result<JobRow, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let attempt = i32::try_from(new_job.attempt).map_err(|_| DbError::OutOfRange {
        column: "attempt",
    })?;

    let result = sqlx::query_as::<_, JobRow>(&format!(
        "INSERT INTO jobs \
             (id, project_id, client_id, display_name, transcript_ref, attempt, retry_of) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(&new_job.project_id)
    .bind(&new_job.client_id)
    .bind(new_job.display_name.as_deref())
    .bind(&new_job.transcript_ref)
    .bind(attempt)
    .bind(new_job.retry_of)
    .fetch_one(executor)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some(ACTIVE_JOB_INDEX) => {
            Err(DbError::ActiveJobExists {
                project_id: new_job.project_id.clone(),
            })
        }
        Err(e) => Err(DbError::Sqlx(e)),
    }
}

async fn mark_running<'e, E>(executor: E, id: Uuid) -> Result<JobRow, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as::<_, JobRow>(&format!(
        "UPDATE jobs \
         SET state = 'running', updated_at = NOW() \
         WHERE id = $1 AND state = 'pending' \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::InvalidJobTransition {
        id,
        expected_state: "pending",
    })
}

/// Marks a `running` job as `completed`, storing profile and scores in the
/// same statement.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_job(
    pool: &PgPool,
    id: Uuid,
    profile: &StyleProfile,
    scores: &ChunkScores,
) -> Result<JobRow, DbError> {
    sqlx::query_as::<_, JobRow>(&format!(
        "UPDATE jobs \
         SET state = 'completed', profile = $1, scores = $2, updated_at = NOW() \
         WHERE id = $3 AND state = 'running' \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(Json(profile))
    .bind(Json(scores))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::InvalidJobTransition {
        id,
        expected_state: "running",
    })
}

/// Marks a `running` job as `failed` with a structured cause.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_job(pool: &PgPool, id: Uuid, failure: &JobFailure) -> Result<JobRow, DbError> {
    sqlx::query_as::<_, JobRow>(&format!(
        "UPDATE jobs \
         SET state = 'failed', error_kind = $1, error_message = $2, updated_at = NOW() \
         WHERE id = $3 AND state = 'running' \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(failure.kind.as_str())
    .bind(&failure.message)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::InvalidJobTransition {
        id,
        expected_state: "running",
    })
}

/// Records the notification outcome of a `completed` job.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not completed, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_notification_state(
    pool: &PgPool,
    id: Uuid,
    state: NotificationState,
) -> Result<JobRow, DbError> {
    sqlx::query_as::<_, JobRow>(&format!(
        "UPDATE jobs \
         SET notification_state = $1, updated_at = NOW() \
         WHERE id = $2 AND state = 'completed' \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(state.as_str())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::InvalidJobTransition {
        id,
        expected_state: "completed",
    })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetches a single job by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_job(pool: &PgPool, id: Uuid) -> Result<JobRow, DbError> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` jobs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_jobs(pool: &PgPool, limit: i64) -> Result<Vec<JobRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns `running` jobs whose last update is older than `cutoff`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stale_jobs(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<Vec<JobRow>, DbError> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs \
         WHERE state = 'running' AND updated_at < $1 \
         ORDER BY updated_at ASC"
    ))
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
