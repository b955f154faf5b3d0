use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use taskswipe_db::swipes::SwipeOutcome;
use taskswipe_types::api::{Claims, SwipeListResponse, SwipeRequest, SwipeResponse, SwipeStatusResponse};
use taskswipe_types::events::DomainEvent;
use taskswipe_types::models::SwipeDirection;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::{AppState, run_db};

pub async fn create_swipe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SwipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let direction: SwipeDirection = req
        .direction
        .parse()
        .map_err(|_| ApiError::InvalidArgument("Invalid direction. Must be left or right".into()))?;

    let task_id = req.task_id.to_string();
    let swiper = claims.sub.to_string();
    let outcome = run_db(&state, move |db| db.record_swipe(&task_id, &swiper, direction)).await?;

    let (swipe, matched) = match outcome {
        SwipeOutcome::Recorded { swipe, matched } => (swipe.into_model(), matched.map(|m| m.into_model())),
        SwipeOutcome::TaskNotFound => return Err(ApiError::NotFound("Task not found")),
        SwipeOutcome::TaskClosed => return Err(ApiError::Conflict("Task is no longer open")),
        SwipeOutcome::AlreadySwiped => return Err(ApiError::Conflict("Already swiped on this task")),
    };

    // Published only after the match has committed.
    if let Some(m) = &matched {
        state.dispatcher.publish(DomainEvent::MatchCreated {
            match_id: m.id,
            task_id: m.task_id,
            worker_id: m.worker_id,
            client_id: m.client_id,
        });
    }

    Ok((StatusCode::CREATED, Json(SwipeResponse { swipe, matched })))
}

pub async fn list_swipes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<SwipeListResponse>, ApiError> {
    let worker = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_swipes_for_worker(&worker)).await?;

    Ok(Json(SwipeListResponse {
        swipes: rows.into_iter().map(|r| r.into_model()).collect(),
    }))
}

/// The caller's swipe on a task, or `null`.
pub async fn swipe_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<Json<SwipeStatusResponse>, ApiError> {
    let task_id = task_id.to_string();
    let worker = claims.sub.to_string();
    let row = run_db(&state, move |db| db.get_swipe(&task_id, &worker)).await?;

    Ok(Json(SwipeStatusResponse {
        swipe: row.map(|r| r.into_model()),
    }))
}
