//! Image upload route handler.

use axum::{Json, extract::Multipart, extract::State};
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// `POST /upload`
///
/// Forwards the multipart `image` field to the third-party media host and
/// returns the hosted URL. Nothing is stored locally.
#[instrument(skip_all)]
pub async fn upload(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let url = state
            .media()
            .upload_image(&file_name, &content_type, bytes.to_vec())
            .await?;

        return Ok(Json(json!({ "image": url })));
    }

    Err(AppError::BadRequest("No image file provided".to_string()))
}
