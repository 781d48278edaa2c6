use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use arena_core::ParticipantId;
use arena_infra::jobs::DocumentStore;

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_participant))
        .route("/:id", get(get_participant))
}

pub async fn register_participant(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterParticipantRequest>,
) -> axum::response::Response {
    let participant = body.into_participant();
    if let Err(e) = participant.validate() {
        return ApiError::from(e).into_response();
    }

    match services.store().insert_participant(participant.clone()).await {
        Ok(_) => (StatusCode::CREATED, Json(participant)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn get_participant(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ParticipantId = match id.parse() {
        Ok(id) => id,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match services.store().get_participant(id).await {
        Ok(Some(p)) => Json(p).into_response(),
        Ok(None) => ApiError::NotFound(format!("participant not found: {id}")).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}
