use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use styleprof_core::{
    Job, JobFailure, JobOutcome, JobState, MissingSection, NotificationState, TriggerRequest,
};
use styleprof_jobs::StartedJob;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_job_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AcceptedJob {
    job_id: Uuid,
    project_id: String,
    state: JobState,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JobStatus {
    job_id: Uuid,
    project_id: String,
    client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<String>,
    state: JobState,
    notification_state: NotificationState,
    outcome: JobOutcome,
    attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_of: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JobFailure>,
    partial: bool,
    missing_sections: Vec<MissingSection>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Job> for JobStatus {
    fn from(job: Job) -> Self {
        Self {
            outcome: job.outcome(),
            partial: job.is_partial(),
            missing_sections: job.missing_sections().to_vec(),
            job_id: job.id,
            project_id: job.project_id,
            client_id: job.client_id,
            display_name: job.display_name,
            state: job.state,
            notification_state: job.notification_state,
            attempt: job.attempt,
            retry_of: job.retry_of,
            error: job.error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RetryQuery {
    pub transcript_ref: Option<String>,
}

/// Validate the trigger, persist a running job, and execute it in the
/// background. Responds before analysis starts.
pub(super) async fn process_transcript(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    payload: Result<Json<TriggerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<AcceptedJob>>), ApiError> {
    let Json(trigger) =
        payload.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;

    let started = state
        .manager
        .start(trigger)
        .await
        .map_err(|e| map_job_error(req_id.0.clone(), &e))?;

    Ok(accept(&state, started, req_id))
}

pub(super) async fn retry_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    Query(query): Query<RetryQuery>,
) -> Result<(StatusCode, Json<ApiResponse<AcceptedJob>>), ApiError> {
    let id = parse_job_id(&req_id, &id)?;
    let started = state
        .manager
        .retry_job(id, query.transcript_ref)
        .await
        .map_err(|e| map_job_error(req_id.0.clone(), &e))?;

    Ok(accept(&state, started, req_id))
}

pub(super) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<JobStatus>>, ApiError> {
    let id = parse_job_id(&req_id, &id)?;
    let job = state
        .manager
        .get(id)
        .await
        .map_err(|e| map_job_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: JobStatus::from(job),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<JobStatus>>>, ApiError> {
    // normalize_limit clamps to [1, 200].
    let limit = usize::try_from(normalize_limit(query.limit)).unwrap_or(50);
    let jobs = state
        .manager
        .list(limit)
        .await
        .map_err(|e| map_job_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: jobs.into_iter().map(JobStatus::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn accept(
    state: &AppState,
    started: StartedJob,
    req_id: RequestId,
) -> (StatusCode, Json<ApiResponse<AcceptedJob>>) {
    let data = AcceptedJob {
        job_id: started.job.id,
        project_id: started.job.project_id.clone(),
        state: started.job.state,
    };
    // The manager tracks the task for shutdown; status comes from the store.
    let _handle = state.manager.spawn(started, state.shutdown.child_token());

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(req_id.0),
        }),
    )
}

fn parse_job_id(req_id: &RequestId, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::new(
            req_id.0.clone(),
            "bad_request",
            format!("'{raw}' is not a valid job id"),
        )
    })
}
