use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use arena_infra::jobs::{DocumentStore, JobStatus};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Job counts per status plus the admission ceiling.
pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let store = services.store();
    let mut counts = serde_json::Map::new();
    for status in [
        JobStatus::Queued,
        JobStatus::Processing,
        JobStatus::Done,
        JobStatus::Error,
    ] {
        match store.count_jobs_by_status(status).await {
            Ok(n) => {
                counts.insert(status.as_str().to_string(), n.into());
            }
            Err(e) => return ApiError::from(e).into_response(),
        }
    }

    Json(serde_json::json!({
        "jobs": counts,
        "admissionCeiling": services.pipeline().config().admission_ceiling,
    }))
    .into_response()
}
