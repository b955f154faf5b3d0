use axum::{Extension, Json, extract::State};
use uuid::Uuid;

use taskswipe_db::Database;
use taskswipe_db::matches::MatchUpdateOutcome;
use taskswipe_db::models::MatchRow;
use taskswipe_types::api::{Claims, MatchDetail, MatchListResponse, UpdateMatchRequest};
use taskswipe_types::models::{Match, MatchStatus};

use crate::error::ApiError;
use crate::extract::{ApiJson, OwnedPath};
use crate::{AppState, run_db};

/// Joins a match with its task and the counterparty seen from `viewer`.
fn detail(db: &Database, row: MatchRow, viewer: &str) -> anyhow::Result<MatchDetail> {
    let other_id = if row.worker_id == viewer { &row.client_id } else { &row.worker_id };
    let other_user = db.get_user_by_id(other_id)?.map(|u| u.into_public());
    let task = db.get_task(&row.task_id)?.map(|t| t.into_model());

    Ok(MatchDetail {
        inner: row.into_model(),
        task,
        other_user,
    })
}

pub async fn list_matches(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MatchListResponse>, ApiError> {
    let user = claims.sub.to_string();
    let matches = run_db(&state, move |db| {
        db.list_active_matches(&user)?
            .into_iter()
            .map(|row| detail(db, row, &user))
            .collect::<anyhow::Result<Vec<_>>>()
    })
    .await?;

    Ok(Json(MatchListResponse { matches }))
}

pub async fn get_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OwnedPath(match_id): OwnedPath<Uuid>,
) -> Result<Json<MatchDetail>, ApiError> {
    let id = match_id.to_string();
    let user = claims.sub.to_string();

    let found = run_db(&state, move |db| {
        let Some(row) = db.get_match(&id)? else {
            return Ok(None);
        };
        if !row.is_participant(&user) {
            return Ok(Some(Err(ApiError::Forbidden)));
        }
        Ok(Some(Ok(detail(db, row, &user)?)))
    })
    .await?;

    match found {
        Some(result) => Ok(Json(result?)),
        None => Err(ApiError::NotFound("Match not found")),
    }
}

pub async fn update_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OwnedPath(match_id): OwnedPath<Uuid>,
    ApiJson(req): ApiJson<UpdateMatchRequest>,
) -> Result<Json<Match>, ApiError> {
    let status: MatchStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::InvalidArgument("Invalid status".into()))?;

    let id = match_id.to_string();
    let user = claims.sub.to_string();
    match run_db(&state, move |db| db.update_match_status(&id, &user, status)).await? {
        MatchUpdateOutcome::Updated(row) => Ok(Json(row.into_model())),
        MatchUpdateOutcome::NotFound => Err(ApiError::NotFound("Match not found")),
        MatchUpdateOutcome::Forbidden => Err(ApiError::Forbidden),
        MatchUpdateOutcome::Finished => Err(ApiError::Conflict("Match is already finished")),
    }
}
