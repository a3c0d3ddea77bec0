//! Capture device abstraction.
//!
//! A [`CaptureDevice`] grants a live [`MediaStream`] for camera and
//! microphone. The stream records into an [`Encoder`] which reports its
//! output as [`EncoderEvent`]s on a channel owned by a single capture.

pub(crate) mod ffmpeg;

pub use ffmpeg::{FfmpegCaptureDevice, FfmpegSettings};

use crate::{ClipFormat, CoreResult};

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Capacity of the per-capture encoder event channel.
pub const ENCODER_CHANNEL_CAPACITY: usize = 64;

/// Sending half handed to an encoder.
pub type EncoderSender = mpsc::Sender<EncoderEvent>;

/// Receiving half owned by the capture. Dropping it unsubscribes.
pub type EncoderReceiver = mpsc::Receiver<EncoderEvent>;

/// Creates the event channel for one capture.
pub fn encoder_channel() -> (EncoderSender, EncoderReceiver) {
    mpsc::channel(ENCODER_CHANNEL_CAPACITY)
}

/// Which camera the caller would like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Rear camera, facing away from the user.
    #[default]
    Environment,
    /// Front camera, facing the user.
    User,
}

/// Constraints passed to [`CaptureDevice::request_stream`].
///
/// `facing` is a preference: devices without a matching camera fall back
/// to their default one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    /// Preferred camera.
    pub facing: FacingMode,
    /// Whether to capture the microphone too.
    pub audio: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            audio: true,
        }
    }
}

/// Kind of a track inside a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    /// Camera track.
    Video,
    /// Microphone track.
    Audio,
}

/// Description of a granted stream, used for live preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Stream identity.
    pub id: Uuid,
    /// Camera the stream was opened on.
    pub camera: String,
    /// Microphone the stream was opened on, if audio was requested.
    pub microphone: Option<String>,
}

/// Event emitted by an encoder during one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// A piece of encoded output. Chunks arrive in container order.
    Chunk(Bytes),
    /// The encoder flushed everything and will emit nothing more.
    Finished,
    /// The encoder stopped abnormally.
    Failed(String),
}

/// Host camera/microphone access.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Whether the platform can encode into `format`.
    async fn supports_format(&self, format: ClipFormat) -> bool;

    /// Requests a live stream. Denial or an unavailable device is reported
    /// as [`crate::RecorderError::DeviceAccess`].
    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> CoreResult<Box<dyn MediaStream>>;
}

/// A live stream holding camera and microphone open.
#[async_trait]
pub trait MediaStream: Send {
    /// Description for preview.
    fn info(&self) -> &StreamInfo;

    /// Tracks currently carried by the stream.
    fn tracks(&self) -> &[TrackKind];

    /// Starts encoding the stream into `format`, reporting on `events`.
    async fn record(
        &mut self,
        format: ClipFormat,
        events: EncoderSender,
    ) -> CoreResult<Box<dyn Encoder>>;

    /// Stops every track and releases the device. Safe to call repeatedly.
    fn stop_tracks(&mut self);

    /// Whether any track is still holding the device.
    fn is_live(&self) -> bool;
}

/// An encoder attached to a stream.
#[async_trait]
pub trait Encoder: Send {
    /// Asks the encoder to finalize. Remaining chunks are emitted, followed
    /// by [`EncoderEvent::Finished`].
    async fn stop(&mut self) -> CoreResult<()>;
}
