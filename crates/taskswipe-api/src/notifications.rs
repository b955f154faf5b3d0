use axum::{Extension, Json, extract::State};
use uuid::Uuid;

use taskswipe_db::notifications::OwnedOutcome;
use taskswipe_types::api::{
    Ack, Claims, MarkAllReadResponse, NotificationListResponse, PageQuery, Pagination,
};

use crate::error::ApiError;
use crate::extract::{ApiQuery, OwnedPath};
use crate::tasks::page_window;
use crate::{AppState, run_db};

fn owned(outcome: OwnedOutcome, done: &'static str) -> Result<Json<Ack>, ApiError> {
    match outcome {
        OwnedOutcome::Done => Ok(Json(Ack::new(done))),
        OwnedOutcome::NotFound => Err(ApiError::NotFound("Notification not found")),
        OwnedOutcome::Forbidden => Err(ApiError::Forbidden),
    }
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let (page, limit, offset) = page_window(query.page, query.limit);
    let user = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_notifications(&user, limit, offset)).await?;

    let pagination = Pagination::for_page(page, limit, rows.len());
    Ok(Json(NotificationListResponse {
        notifications: rows.into_iter().map(|r| r.into_model()).collect(),
        pagination,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OwnedPath(notification_id): OwnedPath<Uuid>,
) -> Result<Json<Ack>, ApiError> {
    let id = notification_id.to_string();
    let user = claims.sub.to_string();
    let outcome = run_db(&state, move |db| db.mark_notification_read(&id, &user)).await?;
    owned(outcome, "Notification marked as read")
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let user = claims.sub.to_string();
    let updated = run_db(&state, move |db| db.mark_all_notifications_read(&user)).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OwnedPath(notification_id): OwnedPath<Uuid>,
) -> Result<Json<Ack>, ApiError> {
    let id = notification_id.to_string();
    let user = claims.sub.to_string();
    let outcome = run_db(&state, move |db| db.delete_notification(&id, &user)).await?;
    owned(outcome, "Notification deleted")
}
