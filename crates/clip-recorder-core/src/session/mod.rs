//! Recording session state and its controller.

mod active_capture;
mod controller;
mod handle;

pub(crate) use active_capture::ActiveCapture;

pub use {
    controller::{SessionCommand, SessionController, SessionOutcome, SessionSettings},
    handle::SessionHandle,
};

use crate::{EncodedClip, capture::StreamInfo};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Externally visible phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing captured or held.
    #[default]
    Idle,
    /// Camera open and encoding.
    Capturing,
    /// A finished clip is held for review and upload.
    Previewing,
}

/// Something that happened to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The user asked to (re)start. Whatever is held is discarded first.
    StartRequested,
    /// The device granted the stream for the latest start request.
    StartGranted,
    /// The device refused or failed the latest start request.
    StartFailed,
    /// Manual stop, or the encoder finishing on its own.
    Stop,
    /// The maximum capture duration elapsed.
    CeilingReached,
    /// The encoder broke mid-capture.
    EncoderFailed,
    /// Upload succeeded and returned a download link.
    UploadLinked,
    /// Upload failed in transport.
    UploadFailed,
    /// Upload succeeded but the response had no download link.
    LinkMissing,
}

/// Result of applying a [`Trigger`] to a [`Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Move to (or stay in) the phase.
    Enter(Phase),
    /// The trigger does not apply in this phase.
    Ignore,
    /// The session ends; the host navigates away.
    Terminate,
}

impl Phase {
    /// Transition table of the recording lifecycle.
    pub fn on(self, trigger: Trigger) -> Step {
        use {Phase::*, Trigger::*};

        match (self, trigger) {
            (_, StartRequested) => Step::Enter(Idle),
            (Idle, StartGranted) => Step::Enter(Capturing),
            (Idle, StartFailed) => Step::Enter(Idle),
            (Capturing, Stop | CeilingReached) => Step::Enter(Previewing),
            (Capturing, EncoderFailed) => Step::Enter(Idle),
            (Previewing, UploadLinked) => Step::Terminate,
            (Previewing, UploadFailed | LinkMissing) => Step::Enter(Previewing),
            _ => Step::Ignore,
        }
    }
}

/// Phase-tagged session state. The active capture exists only while
/// capturing and the clip only while previewing.
#[derive(Default)]
pub(crate) enum Session {
    #[default]
    Idle,
    Capturing(ActiveCapture),
    Previewing(Arc<EncodedClip>),
}

impl Session {
    pub(crate) fn phase(&self) -> Phase {
        match self {
            Session::Idle => Phase::Idle,
            Session::Capturing(_) => Phase::Capturing,
            Session::Previewing(_) => Phase::Previewing,
        }
    }

    pub(crate) fn clip(&self) -> Option<&Arc<EncodedClip>> {
        match self {
            Session::Previewing(clip) => Some(clip),
            _ => None,
        }
    }

    pub(crate) fn capture_mut(&mut self) -> Option<&mut ActiveCapture> {
        match self {
            Session::Capturing(capture) => Some(capture),
            _ => None,
        }
    }
}

/// Published view of the session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// Stream being recorded, while capturing.
    pub stream: Option<StreamInfo>,
    /// Clip under review, while previewing.
    pub clip: Option<Arc<EncodedClip>>,
    /// Whether an upload of the clip is in flight.
    pub uploading: bool,
}
