use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use taskswipe_types::api::TokenKind;

use crate::AppState;
use crate::auth::verify_token;
use crate::error::ApiError;

/// Validates the bearer access token and stores its [`Claims`] in request
/// extensions for handlers to pick up with `Extension<Claims>`.
///
/// [`Claims`]: taskswipe_types::api::Claims
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) =
        bearer.map_err(|_| ApiError::Unauthorized("No token provided"))?;

    let claims = verify_token(&state.keys, bearer.token(), TokenKind::Access)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
