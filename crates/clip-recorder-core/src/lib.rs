//! Clip-recorder Core Library
//!
//! Records a short camera clip, holds it for review, and uploads it to a
//! remote service that answers with a download link.
//!
//! # Example
//!
//! ```no_run
//! use clip_recorder_core::{
//!     CoreResult, FfmpegCaptureDevice, FfmpegSettings, HttpUploader, Presenter,
//!     SessionController, SessionSettings,
//! };
//!
//! use std::{sync::Arc, time::Duration};
//!
//! async fn record(presenter: Arc<dyn Presenter>) -> CoreResult<()> {
//!     let device = Arc::new(FfmpegCaptureDevice::new(FfmpegSettings::default()));
//!     let uploader = Arc::new(HttpUploader::new(
//!         "https://example.com/api/v1/upload",
//!         Duration::from_secs(120),
//!     )?);
//!
//!     let (controller, handle) =
//!         SessionController::new(device, uploader, presenter, SessionSettings::default());
//!     let session = tokio::spawn(controller.run());
//!
//!     handle.start().await?;
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     handle.stop().await?;
//!     handle.upload().await?;
//!
//!     let _ = session.await;
//!     Ok(())
//! }
//! ```

mod capture;
mod clip;
mod error;
mod presenter;
mod session;
mod upload;

pub use {
    capture::{
        CaptureConstraints, CaptureDevice, ENCODER_CHANNEL_CAPACITY, Encoder, EncoderEvent,
        EncoderReceiver, EncoderSender, FacingMode, FfmpegCaptureDevice, FfmpegSettings,
        MediaStream, StreamInfo, TrackKind, encoder_channel,
    },
    clip::{CLIP_FILE_STEM, ClipAssembler, ClipFormat, EncodedClip},
    error::{RecorderError, Result as CoreResult},
    presenter::{Notice, NoticeKind, Presenter},
    session::{
        Phase, SessionCommand, SessionController, SessionHandle, SessionOutcome,
        SessionSettings, SessionSnapshot, Step, Trigger,
    },
    upload::{HttpUploader, UPLOAD_FIELD, Uploader, download_link},
};

#[cfg(test)]
mod tests;
