use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

/// Recorder errors with source location tracking.
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Camera or microphone could not be opened (permission denied,
    /// device missing or busy).
    #[error("Device access failed: {reason} {location}")]
    DeviceAccess {
        /// Description of the device failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The encoder failed to start, stop, or produce output.
    #[error("Encoder error: {reason} {location}")]
    Encoder {
        /// Description of the encoder failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The upload request failed or the response body was not JSON.
    #[error("Upload failed: {reason} {location}")]
    UploadFailed {
        /// Description of the upload failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Opening the download link failed.
    #[error("Navigation failed: {reason} {location}")]
    Navigation {
        /// Description of the navigation failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The session controller is no longer running.
    #[error("Session closed {location}")]
    SessionClosed {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl RecorderError {
    /// Builds a [`RecorderError::DeviceAccess`] at the caller's location.
    #[track_caller]
    pub fn device_access(reason: impl Into<String>) -> Self {
        RecorderError::DeviceAccess {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Builds a [`RecorderError::Encoder`] at the caller's location.
    #[track_caller]
    pub fn encoder(reason: impl Into<String>) -> Self {
        RecorderError::Encoder {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Builds a [`RecorderError::UploadFailed`] at the caller's location.
    #[track_caller]
    pub fn upload_failed(reason: impl Into<String>) -> Self {
        RecorderError::UploadFailed {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for RecorderError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        let reason = if source.is_connect() {
            format!("Upload service unreachable: {}", source)
        } else if source.is_timeout() {
            format!("Upload timed out: {}", source)
        } else if source.is_decode() {
            format!("Upload response was not valid JSON: {}", source)
        } else {
            format!("Upload request failed: {}", source)
        };

        RecorderError::UploadFailed {
            reason,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`RecorderError`].
pub type Result<T> = std::result::Result<T, RecorderError>;
