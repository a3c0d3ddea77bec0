mod capture_config;
#[allow(clippy::module_inception)]
mod config;
mod recording_config;
mod upload_config;

use std::path::PathBuf;

use clip_recorder_core::FfmpegSettings;

pub(crate) use {
    capture_config::CaptureConfig, config::Config, recording_config::RecordingConfig,
    upload_config::UploadConfig,
};

pub(crate) const DEFAULT_UPLOAD_ENDPOINT: &str =
    "https://latest-mapper-2o69ujbm5-zawarkhanns-projects.vercel.app/api/v1/upload";
pub(crate) const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;
pub(crate) const DEFAULT_MAX_DURATION_SECS: u64 = 30;
pub(crate) const DEFAULT_FINALIZE_TIMEOUT_SECS: u64 = 5;
pub(crate) const DEFAULT_PREFER_REAR_CAMERA: bool = true;
pub(crate) const DEFAULT_RECORD_AUDIO: bool = true;
pub(crate) const DEFAULT_OPEN_PREVIEWS: bool = true;

pub(crate) fn default_upload_endpoint() -> String {
    DEFAULT_UPLOAD_ENDPOINT.to_string()
}

pub(crate) fn default_upload_timeout_secs() -> u64 {
    DEFAULT_UPLOAD_TIMEOUT_SECS
}

pub(crate) fn default_max_duration_secs() -> u64 {
    DEFAULT_MAX_DURATION_SECS
}

pub(crate) fn default_finalize_timeout_secs() -> u64 {
    DEFAULT_FINALIZE_TIMEOUT_SECS
}

pub(crate) fn default_prefer_rear_camera() -> bool {
    DEFAULT_PREFER_REAR_CAMERA
}

pub(crate) fn default_record_audio() -> bool {
    DEFAULT_RECORD_AUDIO
}

pub(crate) fn default_open_previews() -> bool {
    DEFAULT_OPEN_PREVIEWS
}

pub(crate) fn default_ffmpeg_path() -> PathBuf {
    FfmpegSettings::default().ffmpeg_path
}

pub(crate) fn default_camera() -> String {
    FfmpegSettings::default().camera
}

pub(crate) fn default_microphone() -> String {
    FfmpegSettings::default().microphone
}
