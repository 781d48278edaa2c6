use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use arena_core::{JobId, ParticipantId};
use arena_infra::jobs::{BattleJob, DocumentStore, JobStatus};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

const DEFAULT_LIST_LIMIT: usize = 50;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_battle).get(list_battles))
        .route("/:id", get(get_battle))
        .route("/:id/artifact/retry", post(retry_artifact))
        .route("/:id/artifact/release", post(release_artifact_lock))
}

/// Insert a queued job. Dispatch happens off the change feed, so the
/// response only reflects the initial document.
pub async fn create_battle(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateBattleRequest>,
) -> axum::response::Response {
    let (a, b) = match (
        body.participant_a.parse::<ParticipantId>(),
        body.participant_b.parse::<ParticipantId>(),
    ) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(e), _) | (_, Err(e)) => return ApiError::from(e).into_response(),
    };

    let store = services.store();
    for id in [a, b] {
        match store.get_participant(id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return ApiError::BadRequest(format!("unknown participant: {id}")).into_response();
            }
            Err(e) => return ApiError::from(e).into_response(),
        }
    }

    let job = match BattleJob::new(a, b) {
        Ok(job) => job.with_artifact_eligible(body.artifact_eligible),
        Err(e) => return ApiError::from(e).into_response(),
    };

    match store.insert_job(job.clone()).await {
        Ok(_) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_battle(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(id) => id,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match services.store().get_job(id).await {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => ApiError::NotFound(format!("job not found: {id}")).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Oldest first. Without `status`, every status is listed in pipeline order.
pub async fn list_battles(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListBattlesQuery>,
) -> axum::response::Response {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let statuses = match query.status.as_deref() {
        Some(raw) => match raw.parse::<JobStatus>() {
            Ok(status) => vec![status],
            Err(e) => return ApiError::from(e).into_response(),
        },
        None => vec![
            JobStatus::Queued,
            JobStatus::Processing,
            JobStatus::Done,
            JobStatus::Error,
        ],
    };

    let mut jobs = Vec::new();
    for status in statuses {
        let remaining = limit.saturating_sub(jobs.len());
        if remaining == 0 {
            break;
        }
        match services.store().query_jobs(status, remaining).await {
            Ok(batch) => jobs.extend(batch),
            Err(e) => return ApiError::from(e).into_response(),
        }
    }

    Json(jobs).into_response()
}

pub async fn retry_artifact(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(id) => id,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match services.pipeline().artifact().retry_artifact(id).await {
        Ok(job) => Json(job).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn release_artifact_lock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(id) => id,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match services.pipeline().artifact().release_stuck_lock(id).await {
        Ok(job) => Json(job).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
