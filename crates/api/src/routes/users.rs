//! User and auth route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use bazaar_core::{Email, UserId};

use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::User;
use crate::routes::parse_id;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Admin update of another user's account.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

/// A user plus a freshly minted bearer token.
#[derive(Debug, Serialize)]
pub struct UserWithToken {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

/// `POST /users/login`
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<UserWithToken>> {
    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    let (user, token) = auth.login(&body.email, &body.password).await?;

    Ok(Json(UserWithToken { user, token }))
}

/// `POST /users`
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let auth = AuthService::new(state.pool(), &state.config().jwt_secret);
    let (user, token) = auth.register(&body.name, &body.email, &body.password).await?;

    Ok((StatusCode::CREATED, Json(UserWithToken { user, token })))
}

/// `GET /users/profile`
pub async fn profile(RequireAuth(user): RequireAuth) -> Json<User> {
    Json(user)
}

/// `GET /users`
#[instrument(skip_all)]
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(users))
}

/// `GET /users/{id}`
#[instrument(skip(state, _admin))]
pub async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let id: UserId = parse_id(&id, "User")?;

    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    Ok(Json(user))
}

/// `PUT /users/{id}`
#[instrument(skip(state, body, _admin))]
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<User>> {
    let id: UserId = parse_id(&id, "User")?;
    let email =
        Email::parse(&body.email).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = UserRepository::new(state.pool())
        .update(id, &body.name, &email, body.is_admin)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    Ok(Json(user))
}

/// `DELETE /users/{id}`
///
/// Admins cannot delete their own account; demote first, then have another
/// admin remove it.
#[instrument(skip(state, admin))]
pub async fn destroy(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let id: UserId = parse_id(&id, "User")?;

    if id == admin.id {
        return Err(AppError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    let deleted = UserRepository::new(state.pool()).delete(id).await?;
    if !deleted {
        return Err(AppError::NotFound("User".to_string()));
    }

    Ok(Json(json!({ "message": "User removed" })))
}
