use crate::{
    ClipAssembler, ClipFormat, EncodedClip,
    capture::{Encoder, EncoderEvent, EncoderReceiver, MediaStream, StreamInfo},
};

use std::time::Duration;

use bytes::Bytes;
use tokio::{task::JoinHandle, time::Instant};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Everything a session owns while capturing.
///
/// Dropping it cancels the auto-stop timer, stops every track, and
/// unsubscribes from encoder events, so a discarded capture can never hold
/// the device or feed a later session.
pub(crate) struct ActiveCapture {
    pub(crate) id: Uuid,
    stream: Box<dyn MediaStream>,
    encoder: Box<dyn Encoder>,
    events: EncoderReceiver,
    assembler: ClipAssembler,
    started_at: Instant,
    ceiling: JoinHandle<()>,
    encoder_done: bool,
}

impl ActiveCapture {
    pub(crate) fn new(
        id: Uuid,
        stream: Box<dyn MediaStream>,
        encoder: Box<dyn Encoder>,
        events: EncoderReceiver,
        format: ClipFormat,
        ceiling: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            stream,
            encoder,
            events,
            assembler: ClipAssembler::new(format),
            started_at: Instant::now(),
            ceiling,
            encoder_done: false,
        }
    }

    pub(crate) fn stream_info(&self) -> &StreamInfo {
        self.stream.info()
    }

    pub(crate) async fn next_event(&mut self) -> Option<EncoderEvent> {
        self.events.recv().await
    }

    pub(crate) fn push_chunk(&mut self, chunk: Bytes) {
        self.assembler.push(chunk);
    }

    /// The encoder reported its end without being asked to stop.
    pub(crate) fn mark_encoder_done(&mut self) {
        self.encoder_done = true;
    }

    /// Stops the encoder, collects its remaining output, releases the
    /// stream, and assembles the clip.
    ///
    /// Waits at most `timeout` for the encoder to finish; whatever arrived
    /// by then becomes the clip.
    #[instrument(skip(self), fields(capture_id = %self.id))]
    pub(crate) async fn finalize(mut self, timeout: Duration) -> EncodedClip {
        if !self.encoder_done {
            if let Err(e) = self.encoder.stop().await {
                warn!(error = ?e, "Encoder stop request failed");
            }

            match tokio::time::timeout(timeout, self.drain()).await {
                Ok(true) => debug!("Encoder finished"),
                Ok(false) => warn!("Encoder ended without finishing cleanly"),
                Err(_) => warn!(
                    timeout_ms = timeout.as_millis(),
                    "Encoder did not finish in time, keeping partial output"
                ),
            }
        }

        self.ceiling.abort();
        self.stream.stop_tracks();

        let format = self.assembler.format();
        let assembler = std::mem::replace(&mut self.assembler, ClipAssembler::new(format));
        assembler.finish(self.started_at.elapsed())
    }

    async fn drain(&mut self) -> bool {
        while let Some(event) = self.events.recv().await {
            match event {
                EncoderEvent::Chunk(chunk) => self.assembler.push(chunk),
                EncoderEvent::Finished => return true,
                EncoderEvent::Failed(reason) => {
                    warn!(reason = %reason, "Encoder failed while finalizing");
                    return false;
                }
            }
        }
        false
    }
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        self.ceiling.abort();
        self.stream.stop_tracks();
    }
}
