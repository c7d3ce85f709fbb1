use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::domain::principal::Principal;
use crate::http::AppError;
use crate::AppState;

/// Resolves the request's [`Principal`].
///
/// No `Authorization` header means anonymous; whether that is enough is up to
/// the operation. A header that is present but does not verify is rejected.
#[axum::async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
            return Ok(Principal::Anonymous);
        };

        let token = auth_header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let session = state
            .auth
            .authenticate_access_token(token)
            .map_err(|err| {
                tracing::warn!(error = ?err, "malformed access token claims");
                AppError::unauthorized("invalid token")
            })?
            .ok_or_else(|| AppError::unauthorized("invalid token"))?;

        let user = state.store.get_user(session.user_id).await.map_err(|err| {
            tracing::error!(error = ?err, user_id = %session.user_id, "failed to load token subject");
            AppError::internal("failed to authenticate")
        })?;

        match user {
            Some(user) => Ok(Principal::user(user.id)),
            None => Err(AppError::unauthorized("invalid token")),
        }
    }
}
