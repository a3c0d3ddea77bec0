//! User-facing surface driven by the session controller.

use crate::{CoreResult, EncodedClip, SessionSnapshot, capture::StreamInfo};

use std::time::Duration;

use serde_json::Value;

/// Category of a user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Camera or microphone could not be opened.
    DeviceAccess,
    /// The capture hit the maximum duration and was stopped.
    RecordingLimit,
    /// The upload request failed.
    UploadFailed,
    /// The upload response carried no download link.
    MissingDownloadLink,
    /// The download link could not be opened.
    NavigationFailed,
}

/// A blocking notice shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Category.
    pub kind: NoticeKind,
    /// Text shown to the user.
    pub message: String,
}

impl Notice {
    /// Camera could not be opened.
    pub fn device_access() -> Self {
        Self {
            kind: NoticeKind::DeviceAccess,
            message: "Error accessing camera. Ensure camera permissions are allowed.".to_string(),
        }
    }

    /// Capture was cut at `limit`.
    pub fn recording_limit(limit: Duration) -> Self {
        Self {
            kind: NoticeKind::RecordingLimit,
            message: format!(
                "Recording stopped automatically after {} seconds.",
                limit.as_secs()
            ),
        }
    }

    /// Upload request failed.
    pub fn upload_failed() -> Self {
        Self {
            kind: NoticeKind::UploadFailed,
            message: "An error occurred during the upload.".to_string(),
        }
    }

    /// Response had no `data.downloadLink`; the compact JSON is included.
    pub fn missing_download_link(response: &Value) -> Self {
        Self {
            kind: NoticeKind::MissingDownloadLink,
            message: format!("Download link not found. Response: {}", response),
        }
    }

    /// Opening `url` failed.
    pub fn navigation_failed(url: &str) -> Self {
        Self {
            kind: NoticeKind::NavigationFailed,
            message: format!("Could not open the download link: {}", url),
        }
    }
}

/// Rendering, notification, and navigation for one session.
///
/// Calls arrive from the controller task one at a time. `notify` blocks
/// the controller until it returns.
pub trait Presenter: Send + Sync {
    /// The published session state changed.
    fn phase_changed(&self, snapshot: &SessionSnapshot);

    /// A stream was granted and is being recorded.
    fn show_live_preview(&self, stream: &StreamInfo);

    /// A clip is ready for review.
    fn show_recorded_clip(&self, clip: &EncodedClip);

    /// Shows a notice to the user.
    fn notify(&self, notice: &Notice);

    /// Leaves the session for `url`.
    fn navigate(&self, url: &str) -> CoreResult<()>;
}
