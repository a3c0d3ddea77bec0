//! Upload service client.

use crate::{CoreResult, EncodedClip, RecorderError};

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Body,
    multipart::{Form, Part},
};
use serde_json::Value;
use tracing::{info, instrument, warn};

/// Multipart field carrying the clip.
pub const UPLOAD_FIELD: &str = "file";

/// Remote service that accepts a finished clip.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Sends the clip and returns the parsed JSON response body.
    ///
    /// Transport failures and non-JSON bodies are
    /// [`RecorderError::UploadFailed`]. The shape of the JSON is not checked
    /// here; see [`download_link`].
    async fn upload(&self, clip: &EncodedClip) -> CoreResult<Value>;
}

/// Extracts `data.downloadLink` from an upload response.
///
/// An empty string counts as no link.
pub fn download_link(response: &Value) -> Option<&str> {
    response
        .get("data")?
        .get("downloadLink")?
        .as_str()
        .filter(|link| !link.is_empty())
}

/// [`Uploader`] posting a multipart form over HTTP.
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpUploader {
    /// Creates an uploader for `endpoint` with a whole-request timeout.
    #[track_caller]
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecorderError::upload_failed(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Endpoint the clip is posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    #[instrument(skip(self, clip), fields(clip_id = %clip.id, bytes = clip.len(), endpoint = %self.endpoint))]
    async fn upload(&self, clip: &EncodedClip) -> CoreResult<Value> {
        let part = Part::stream_with_length(Body::from(clip.data.clone()), clip.len() as u64)
            .file_name(clip.file_name())
            .mime_str(clip.format.mime_type())?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // The body still decides the outcome; a JSON error body is
            // surfaced to the user as-is.
            warn!(status = %status, "Upload service returned an error status");
        }

        let body: Value = response.json().await?;

        info!(status = %status, "Upload response received");

        Ok(body)
    }
}
