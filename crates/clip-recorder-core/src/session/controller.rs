//! The recording session controller.
//!
//! One task owns the [`Session`] and reacts to user commands, device
//! grants, encoder events, the auto-stop timer, and upload completions, one
//! at a time. Device requests and uploads run as spawned tasks that report
//! back tagged with the attempt that started them, so a result for a
//! superseded attempt is recognised and discarded.

use crate::{
    ClipFormat, CoreResult, Notice, Presenter,
    capture::{CaptureConstraints, CaptureDevice, EncoderEvent, MediaStream, encoder_channel},
    session::{ActiveCapture, Phase, Session, SessionHandle, SessionSnapshot, Step, Trigger},
    upload::{Uploader, download_link},
};

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Maximum length of one capture.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(30);

/// How long a stopping encoder may take to hand over its last chunks.
pub const DEFAULT_FINALIZE_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the user command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Tunables for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Capture is stopped automatically after this long.
    pub max_duration: Duration,
    /// Upper bound on waiting for the encoder after stop.
    pub finalize_timeout: Duration,
    /// Constraints for every stream request.
    pub constraints: CaptureConstraints,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_duration: DEFAULT_MAX_DURATION,
            finalize_timeout: DEFAULT_FINALIZE_TIMEOUT,
            constraints: CaptureConstraints::default(),
        }
    }
}

/// User actions accepted by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Start or restart capturing.
    Start,
    /// Stop capturing and keep the clip.
    Stop,
    /// Upload the clip under review.
    Upload,
    /// End the session without navigating.
    Shutdown,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The host was sent to the download link.
    Navigated(String),
    /// Shut down on request, or every handle was dropped.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Manual,
    Ceiling,
    EncoderEnded,
}

enum Completion {
    StreamGranted {
        request_id: Uuid,
        format: ClipFormat,
        result: CoreResult<Box<dyn MediaStream>>,
    },
    CeilingReached {
        capture_id: Uuid,
    },
    UploadFinished {
        clip_id: Uuid,
        result: CoreResult<Value>,
    },
}

/// Drives one recording session.
pub struct SessionController {
    device: Arc<dyn CaptureDevice>,
    uploader: Arc<dyn Uploader>,
    presenter: Arc<dyn Presenter>,
    settings: SessionSettings,
    session: Session,
    pending_request: Option<Uuid>,
    upload_in_flight: Option<Uuid>,
    command_rx: mpsc::Receiver<SessionCommand>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionController {
    /// Creates an idle controller and the handle used to drive it.
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        uploader: Arc<dyn Uploader>,
        presenter: Arc<dyn Presenter>,
        settings: SessionSettings,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let controller = Self {
            device,
            uploader,
            presenter,
            settings,
            session: Session::Idle,
            pending_request: None,
            upload_in_flight: None,
            command_rx,
            completion_tx,
            completion_rx,
            snapshot_tx,
        };

        (controller, SessionHandle::new(command_tx, snapshot_rx))
    }

    /// Runs until the session navigates away or is shut down.
    ///
    /// Results still in flight when this returns are dropped with the
    /// controller.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> CoreResult<SessionOutcome> {
        info!(
            max_duration_secs = self.settings.max_duration.as_secs(),
            "Session controller started"
        );
        self.publish();

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(SessionCommand::Start) => self.start(),
                    Some(SessionCommand::Stop) => self.stop(StopReason::Manual).await,
                    Some(SessionCommand::Upload) => self.upload_current(),
                    Some(SessionCommand::Shutdown) | None => {
                        info!("Session shutting down");
                        return Ok(SessionOutcome::Shutdown);
                    }
                },

                Some(completion) = self.completion_rx.recv() => {
                    if let Some(outcome) = self.handle_completion(completion).await {
                        return Ok(outcome);
                    }
                }

                event = next_encoder_event(&mut self.session) => {
                    self.handle_encoder_event(event).await;
                }
            }
        }
    }

    fn phase(&self) -> Phase {
        self.session.phase()
    }

    fn step(&self, trigger: Trigger) -> Step {
        let step = self.phase().on(trigger);
        if step == Step::Ignore {
            debug!(phase = ?self.phase(), trigger = ?trigger, "Trigger ignored");
        }
        step
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            stream: match &self.session {
                Session::Capturing(capture) => Some(capture.stream_info().clone()),
                _ => None,
            },
            clip: self.session.clip().cloned(),
            uploading: self.upload_in_flight.is_some(),
        }
    }

    fn publish(&self) {
        let snapshot = self.snapshot();
        self.presenter.phase_changed(&snapshot);
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Discards whatever the session holds and requests a new stream.
    #[instrument(skip(self))]
    fn start(&mut self) {
        self.step(Trigger::StartRequested);

        if let Session::Capturing(capture) = &self.session {
            info!(capture_id = %capture.id, "Restarting, discarding current capture");
        }
        // Dropping the capture stops its tracks before the new request goes
        // out; dropping the clip releases it.
        self.session = Session::Idle;
        self.upload_in_flight = None;

        let request_id = Uuid::new_v4();
        self.pending_request = Some(request_id);
        self.publish();

        let device = Arc::clone(&self.device);
        let constraints = self.settings.constraints;
        let completion_tx = self.completion_tx.clone();

        tokio::spawn(async move {
            let mut supported = Vec::with_capacity(ClipFormat::PREFERENCE.len());
            for format in ClipFormat::PREFERENCE {
                if device.supports_format(format).await {
                    supported.push(format);
                }
            }
            let format = ClipFormat::negotiate(&supported);
            let result = device.request_stream(&constraints).await;

            let _ = completion_tx.send(Completion::StreamGranted {
                request_id,
                format,
                result,
            });
        });

        info!(request_id = %request_id, "Capture stream requested");
    }

    async fn handle_completion(&mut self, completion: Completion) -> Option<SessionOutcome> {
        match completion {
            Completion::StreamGranted {
                request_id,
                format,
                result,
            } => {
                self.on_stream_result(request_id, format, result).await;
                None
            }
            Completion::CeilingReached { capture_id } => {
                let current = self.session.capture_mut().map(|capture| capture.id);
                if current == Some(capture_id) {
                    self.stop(StopReason::Ceiling).await;
                } else {
                    debug!(capture_id = %capture_id, "Stale auto-stop ignored");
                }
                None
            }
            Completion::UploadFinished { clip_id, result } => {
                self.on_upload_result(clip_id, result)
            }
        }
    }

    #[instrument(skip(self, result))]
    async fn on_stream_result(
        &mut self,
        request_id: Uuid,
        format: ClipFormat,
        result: CoreResult<Box<dyn MediaStream>>,
    ) {
        if self.pending_request != Some(request_id) {
            // A newer start superseded this one; release what it got.
            if let Ok(mut stream) = result {
                stream.stop_tracks();
            }
            debug!("Superseded stream result discarded");
            return;
        }
        self.pending_request = None;

        let mut stream = match result {
            Ok(stream) => stream,
            Err(e) => {
                self.fail_start(Trigger::StartFailed, e.to_string());
                return;
            }
        };

        if self.step(Trigger::StartGranted) != Step::Enter(Phase::Capturing) {
            stream.stop_tracks();
            return;
        }

        let (events_tx, events_rx) = encoder_channel();
        let encoder = match stream.record(format, events_tx).await {
            Ok(encoder) => encoder,
            Err(e) => {
                stream.stop_tracks();
                self.fail_start(Trigger::StartFailed, e.to_string());
                return;
            }
        };

        let capture_id = Uuid::new_v4();
        let ceiling = {
            let completion_tx = self.completion_tx.clone();
            let max_duration = self.settings.max_duration;
            tokio::spawn(async move {
                tokio::time::sleep(max_duration).await;
                let _ = completion_tx.send(Completion::CeilingReached { capture_id });
            })
        };

        let capture = ActiveCapture::new(capture_id, stream, encoder, events_rx, format, ceiling);
        self.presenter.show_live_preview(capture.stream_info());
        self.session = Session::Capturing(capture);
        self.publish();

        info!(capture_id = %capture_id, format = %format, "Capture started");
    }

    fn fail_start(&mut self, trigger: Trigger, reason: String) {
        error!(trigger = ?trigger, reason = %reason, "Capture could not run");
        self.step(trigger);
        self.session = Session::Idle;
        self.publish();
        self.presenter.notify(&Notice::device_access());
    }

    async fn handle_encoder_event(&mut self, event: Option<EncoderEvent>) {
        let Some(capture) = self.session.capture_mut() else {
            return;
        };

        match event {
            Some(EncoderEvent::Chunk(chunk)) => capture.push_chunk(chunk),
            Some(EncoderEvent::Finished) | None => {
                warn!(capture_id = %capture.id, "Encoder ended on its own, stopping capture");
                capture.mark_encoder_done();
                self.stop(StopReason::EncoderEnded).await;
            }
            Some(EncoderEvent::Failed(reason)) => {
                self.fail_start(Trigger::EncoderFailed, reason);
            }
        }
    }

    /// Finalizes the capture into a clip. A no-op unless capturing.
    #[instrument(skip(self))]
    async fn stop(&mut self, reason: StopReason) {
        let trigger = match reason {
            StopReason::Ceiling => Trigger::CeilingReached,
            StopReason::Manual | StopReason::EncoderEnded => Trigger::Stop,
        };
        if self.step(trigger) != Step::Enter(Phase::Previewing) {
            return;
        }

        let Session::Capturing(capture) = std::mem::take(&mut self.session) else {
            return;
        };

        let capture_id = capture.id;
        let clip = capture.finalize(self.settings.finalize_timeout).await;
        if clip.is_empty() {
            warn!(capture_id = %capture_id, "Encoder produced no data");
        }

        info!(
            capture_id = %capture_id,
            clip_id = %clip.id,
            format = %clip.format,
            bytes = clip.len(),
            recorded_ms = clip.recorded_for.as_millis(),
            "Capture stopped"
        );

        self.presenter.show_recorded_clip(&clip);
        self.session = Session::Previewing(Arc::new(clip));
        self.publish();

        if reason == StopReason::Ceiling {
            self.presenter
                .notify(&Notice::recording_limit(self.settings.max_duration));
        }
    }

    /// Uploads the clip under review. A no-op without a clip or while an
    /// upload of it is already in flight.
    #[instrument(skip(self))]
    fn upload_current(&mut self) {
        let Some(clip) = self.session.clip().cloned() else {
            debug!(phase = ?self.phase(), "No clip to upload");
            return;
        };

        if self.upload_in_flight.is_some() {
            debug!(clip_id = %clip.id, "Upload already in flight");
            return;
        }

        self.upload_in_flight = Some(clip.id);
        self.publish();

        let uploader = Arc::clone(&self.uploader);
        let completion_tx = self.completion_tx.clone();

        tokio::spawn(async move {
            let result = uploader.upload(&clip).await;
            let _ = completion_tx.send(Completion::UploadFinished {
                clip_id: clip.id,
                result,
            });
        });

        info!("Upload started");
    }

    #[instrument(skip(self, result))]
    fn on_upload_result(
        &mut self,
        clip_id: Uuid,
        result: CoreResult<Value>,
    ) -> Option<SessionOutcome> {
        let current = self.session.clip().map(|clip| clip.id);
        if self.upload_in_flight != Some(clip_id) || current != Some(clip_id) {
            debug!("Upload result for a discarded clip ignored");
            return None;
        }
        self.upload_in_flight = None;

        let (trigger, link, notice) = match &result {
            Ok(body) => match download_link(body) {
                Some(link) => (Trigger::UploadLinked, Some(link.to_string()), None),
                None => {
                    warn!(response = %body, "Upload response missing download link");
                    (
                        Trigger::LinkMissing,
                        None,
                        Some(Notice::missing_download_link(body)),
                    )
                }
            },
            Err(e) => {
                error!(error = ?e, "Upload failed");
                (Trigger::UploadFailed, None, Some(Notice::upload_failed()))
            }
        };

        match (self.step(trigger), link) {
            (Step::Terminate, Some(link)) => match self.presenter.navigate(&link) {
                Ok(()) => {
                    info!(link = %link, "Navigated to download link");
                    self.session = Session::Idle;
                    return Some(SessionOutcome::Navigated(link));
                }
                Err(e) => {
                    error!(error = ?e, link = %link, "Navigation failed");
                    self.publish();
                    self.presenter.notify(&Notice::navigation_failed(&link));
                }
            },
            _ => {
                self.publish();
                if let Some(notice) = notice {
                    self.presenter.notify(&notice);
                }
            }
        }

        None
    }
}

async fn next_encoder_event(session: &mut Session) -> Option<EncoderEvent> {
    match session.capture_mut() {
        Some(capture) => capture.next_event().await,
        None => std::future::pending().await,
    }
}
