pub mod auth;
pub mod error;
pub mod extract;
pub mod matches;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod swipes;
pub mod tasks;

use std::sync::Arc;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tracing::error;

use taskswipe_db::Database;
use taskswipe_notify::Dispatcher;
use taskswipe_types::api::HealthResponse;

use crate::auth::AuthKeys;
use crate::error::ApiError;
use crate::middleware::require_auth;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub keys: AuthKeys,
    pub dispatcher: Dispatcher,
}

/// Every route of the HTTP API. Transport layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me).put(auth::update_me))
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/tasks/my-tasks", get(tasks::my_tasks))
        .route(
            "/tasks/{task_id}",
            get(tasks::get_task).put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/swipes", post(swipes::create_swipe).get(swipes::list_swipes))
        .route("/swipes/task/{task_id}", get(swipes::swipe_status))
        .route("/matches", get(matches::list_matches))
        .route("/matches/{match_id}", get(matches::get_match).put(matches::update_match))
        .route(
            "/matches/{match_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", put(notifications::mark_all_read))
        .route("/notifications/{notification_id}/read", put(notifications::mark_read))
        .route(
            "/notifications/{notification_id}",
            delete(notifications::delete_notification),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now(),
    })
}

/// Run blocking store work off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::from)
}
