use crate::config::{
    default_finalize_timeout_secs, default_max_duration_secs, default_open_previews,
    default_prefer_rear_camera, default_record_audio,
};

use std::time::Duration;

use clip_recorder_core::{CaptureConstraints, FacingMode, SessionSettings};
use serde::{Deserialize, Serialize};

/// Recording behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Capture stops automatically after this many seconds.
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
    /// How long to wait for the encoder to flush after stop.
    #[serde(default = "default_finalize_timeout_secs")]
    pub finalize_timeout_secs: u64,
    /// Ask for the rear camera instead of the front one.
    #[serde(default = "default_prefer_rear_camera")]
    pub prefer_rear_camera: bool,
    /// Record the microphone along with the camera.
    #[serde(default = "default_record_audio")]
    pub record_audio: bool,
    /// Open each recorded clip in the system video player.
    #[serde(default = "default_open_previews")]
    pub open_previews: bool,
}

impl RecordingConfig {
    /// Session tunables derived from this section.
    pub(crate) fn session_settings(&self) -> SessionSettings {
        let facing = if self.prefer_rear_camera {
            FacingMode::Environment
        } else {
            FacingMode::User
        };

        SessionSettings {
            max_duration: Duration::from_secs(self.max_duration_secs),
            finalize_timeout: Duration::from_secs(self.finalize_timeout_secs),
            constraints: CaptureConstraints {
                facing,
                audio: self.record_audio,
            },
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: default_max_duration_secs(),
            finalize_timeout_secs: default_finalize_timeout_secs(),
            prefer_rear_camera: default_prefer_rear_camera(),
            record_audio: default_record_audio(),
            open_previews: default_open_previews(),
        }
    }
}
