use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::debug;
use uuid::Uuid;

use taskswipe_db::messages::{AppendOutcome, NewMessage};
use taskswipe_types::api::{Claims, MessageListResponse, SendMessageRequest};
use taskswipe_types::events::DomainEvent;
use taskswipe_types::models::MessageKind;

use crate::error::ApiError;
use crate::extract::{ApiJson, OwnedPath};
use crate::{AppState, run_db};

const MAX_CONTENT_CHARS: usize = 4000;
const MAX_CLIENT_ID_LEN: usize = 128;

fn validate(req: &SendMessageRequest) -> Result<MessageKind, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::InvalidArgument("Message content is required".into()));
    }
    if req.content.chars().count() > MAX_CONTENT_CHARS {
        return Err(ApiError::InvalidArgument(format!(
            "Message content cannot exceed {MAX_CONTENT_CHARS} characters"
        )));
    }
    if req
        .client_message_id
        .as_deref()
        .is_some_and(|key| key.is_empty() || key.len() > MAX_CLIENT_ID_LEN)
    {
        return Err(ApiError::InvalidArgument("Invalid clientMessageId".into()));
    }

    match req.message_type.as_deref() {
        None => Ok(MessageKind::Text),
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::InvalidArgument("Message type must be text, image or file".into())),
    }
}

/// Participants only. A repeated `clientMessageId` returns the stored message
/// with 200 and does not notify again.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OwnedPath(match_id): OwnedPath<Uuid>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = validate(&req)?;

    let mid = match_id.to_string();
    let sender = claims.sub.to_string();
    let outcome = run_db(&state, move |db| {
        db.append_message(&NewMessage {
            match_id: &mid,
            sender_id: &sender,
            content: &req.content,
            kind,
            client_message_id: req.client_message_id.as_deref(),
        })
    })
    .await?;

    match outcome {
        AppendOutcome::Appended(row) => {
            let message = row.into_model();
            state.dispatcher.publish(DomainEvent::MessageCreated {
                message_id: message.id,
                match_id,
                sender_id: claims.sub,
            });
            Ok((StatusCode::CREATED, Json(message)))
        }
        AppendOutcome::Replayed(row) => {
            debug!("Replayed message {} in match {}", row.id, match_id);
            Ok((StatusCode::OK, Json(row.into_model())))
        }
        AppendOutcome::MatchNotFound => Err(ApiError::NotFound("Match not found")),
        AppendOutcome::Forbidden => Err(ApiError::Forbidden),
    }
}

/// Full history, oldest first.
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OwnedPath(match_id): OwnedPath<Uuid>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let mid = match_id.to_string();
    let user = claims.sub.to_string();

    let rows = run_db(&state, move |db| {
        let Some(m) = db.get_match(&mid)? else {
            return Ok(Err(ApiError::NotFound("Match not found")));
        };
        if !m.is_participant(&user) {
            return Ok(Err(ApiError::Forbidden));
        }
        Ok(Ok(db.list_messages(&mid)?))
    })
    .await??;

    Ok(Json(MessageListResponse {
        messages: rows.into_iter().map(|r| r.into_model()).collect(),
    }))
}
