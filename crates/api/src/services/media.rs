//! Third-party media host client.
//!
//! Uploaded product images are not stored locally; they are streamed to the
//! configured media host, which responds with a public URL the catalog then
//! references.

use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::MediaConfig;

/// Errors from the media host integration.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Transport-level failure talking to the host.
    #[error("media host request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The host answered with a non-success status.
    #[error("media host rejected upload: {0}")]
    Rejected(reqwest::StatusCode),

    /// The host's response did not contain a URL.
    #[error("media host response missing url")]
    MissingUrl,
}

/// The media host's upload response.
#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

/// Client for the third-party media host.
#[derive(Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    config: MediaConfig,
}

impl MediaClient {
    /// Create a new media client.
    #[must_use]
    pub fn new(config: MediaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Upload an image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::Rejected` on a non-success response and
    /// `MediaError::MissingUrl` when the host's body carries no URL.
    pub async fn upload_image(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, MediaError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str(content_type)?;
        let form = Form::new().part("image", part);

        let response = self
            .http
            .post(self.config.upload_url.clone())
            .bearer_auth(self.config.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MediaError::Rejected(response.status()));
        }

        let body: UploadResponse = response.json().await?;
        body.url.ok_or(MediaError::MissingUrl)
    }
}
