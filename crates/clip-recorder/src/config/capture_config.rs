use crate::config::{default_camera, default_ffmpeg_path, default_microphone};

use std::path::PathBuf;

use clip_recorder_core::FfmpegSettings;
use serde::{Deserialize, Serialize};

/// Capture device configuration.
///
/// Device names use the platform's ffmpeg input syntax: a `/dev/video*`
/// path on Linux, an AVFoundation index on macOS, a DirectShow name on
/// Windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Path or name of the ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// Default camera.
    #[serde(default = "default_camera")]
    pub camera: String,
    /// Rear camera, if the machine has one.
    #[serde(default)]
    pub rear_camera: Option<String>,
    /// Microphone.
    #[serde(default = "default_microphone")]
    pub microphone: String,
}

impl CaptureConfig {
    pub(crate) fn ffmpeg_settings(&self) -> FfmpegSettings {
        FfmpegSettings {
            ffmpeg_path: self.ffmpeg_path.clone(),
            camera: self.camera.clone(),
            rear_camera: self.rear_camera.clone(),
            microphone: self.microphone.clone(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let FfmpegSettings {
            ffmpeg_path,
            camera,
            rear_camera,
            microphone,
        } = FfmpegSettings::default();

        Self {
            ffmpeg_path,
            camera,
            rear_camera,
            microphone,
        }
    }
}
