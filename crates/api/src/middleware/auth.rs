//! Authentication extractors.
//!
//! Handlers opt into protection by taking one of these extractors as an
//! argument; there is no route-level auth layer. Both resolve the bearer
//! token to a live user row, so a deleted user's outstanding tokens stop
//! working immediately.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::models::User;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// Rejects with `401 Unauthorized` when the `Authorization` header is
/// missing, malformed, or carries an invalid or expired token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub User);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        Ok(Self(user))
    }
}

/// Extractor that requires a valid bearer token belonging to an admin.
///
/// Rejects with `401 Unauthorized` for token problems and
/// `403 Forbidden` for authenticated non-admins.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;

        if !user.is_admin {
            return Err(AppError::Forbidden("Not authorized as an admin".to_string()));
        }

        Ok(Self(user))
    }
}

/// Resolve the request's bearer token to a user.
async fn authenticate(parts: &Parts, state: &AppState) -> Result<User, AppError> {
    let token = bearer_token(parts)
        .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;

    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    let user = auth.authenticate(token).await.map_err(auth_failure)?;

    Ok(user)
}

/// Map an authentication failure to a response error.
///
/// Only genuine credential problems become a 401; a repository failure while
/// resolving the user is a server fault and must surface (and be captured)
/// as one.
fn auth_failure(err: AuthError) -> AppError {
    match err {
        AuthError::Repository(db_err) => AppError::Database(db_err),
        _ => AppError::Unauthorized("Not authorized, token failed".to_string()),
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
