//! Extractor wrappers whose rejections render as [`ApiError`], so malformed
//! bodies, queries and ids get the same `{"error": ...}` shape as everything else.
//! Plain path ids that fail to parse are a 400; see [`OwnedPath`] for the exception.

use axum::extract::{FromRequest, FromRequestParts, Path};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path id on a route guarded by ownership or participation. A malformed id
/// answers 403, the same as an id the caller does not own.
pub struct OwnedPath<T>(pub T);

impl<S, T> FromRequestParts<S> for OwnedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                debug!("Rejected owned path: {}", rejection.body_text());
                Err(ApiError::Forbidden)
            }
        }
    }
}
