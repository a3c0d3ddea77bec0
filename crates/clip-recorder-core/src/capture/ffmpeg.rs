//! Camera capture through an `ffmpeg` child process.
//!
//! The stream owns the device description; recording spawns `ffmpeg`,
//! which writes a streamable container to stdout. A pump task forwards
//! stdout as [`EncoderEvent::Chunk`]s and reports the exit as
//! [`EncoderEvent::Finished`] or [`EncoderEvent::Failed`].

use crate::{
    ClipFormat, CoreResult, RecorderError,
    capture::{
        CaptureConstraints, CaptureDevice, Encoder, EncoderEvent, EncoderSender, FacingMode,
        MediaStream, StreamInfo, TrackKind,
    },
};

use std::{
    io::ErrorKind,
    path::PathBuf,
    process::Stdio,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStderr, ChildStdin, ChildStdout, Command},
    sync::{OnceCell, watch},
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Size of each stdout read, and so the upper bound of one chunk.
const READ_CHUNK_BYTES: usize = 64 * 1024;

/// How much of ffmpeg's stderr is kept for failure reports.
const STDERR_TAIL_BYTES: usize = 2048;

const MP4_VIDEO_ENCODER: &str = "libx264";
const MP4_AUDIO_ENCODER: &str = "aac";
const WEBM_VIDEO_ENCODER: &str = "libvpx";
const WEBM_AUDIO_ENCODER: &str = "libopus";

/// Where ffmpeg lives and which devices it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegSettings {
    /// Path or name of the ffmpeg binary.
    pub ffmpeg_path: PathBuf,
    /// Default camera, in the platform's input syntax.
    pub camera: String,
    /// Rear camera used when [`FacingMode::Environment`] is requested.
    pub rear_camera: Option<String>,
    /// Microphone, in the platform's input syntax.
    pub microphone: String,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        #[cfg(target_os = "macos")]
        let (camera, microphone) = ("0", "0");
        #[cfg(target_os = "windows")]
        let (camera, microphone) = ("Integrated Camera", "Microphone");
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let (camera, microphone) = ("/dev/video0", "default");

        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            camera: camera.to_string(),
            rear_camera: None,
            microphone: microphone.to_string(),
        }
    }
}

/// [`CaptureDevice`] backed by the ffmpeg command line tool.
pub struct FfmpegCaptureDevice {
    settings: FfmpegSettings,
    formats: OnceCell<Vec<ClipFormat>>,
}

impl FfmpegCaptureDevice {
    /// Creates a device. Nothing is spawned until a stream is requested.
    pub fn new(settings: FfmpegSettings) -> Self {
        Self {
            settings,
            formats: OnceCell::new(),
        }
    }

    fn camera_for(&self, facing: FacingMode) -> &str {
        match (facing, &self.settings.rear_camera) {
            (FacingMode::Environment, Some(rear)) => rear,
            _ => &self.settings.camera,
        }
    }

    /// Formats whose muxer and both encoders the local ffmpeg provides.
    #[instrument(skip(self))]
    async fn probe_formats(&self) -> Vec<ClipFormat> {
        let (Some(muxers), Some(encoders)) = (
            self.listing("-muxers").await,
            self.listing("-encoders").await,
        ) else {
            return Vec::new();
        };

        let formats = supported_formats(&parse_muxers(&muxers), &parse_encoders(&encoders));
        info!(formats = ?formats, "ffmpeg formats probed");
        formats
    }

    async fn listing(&self, flag: &str) -> Option<String> {
        let output = Command::new(&self.settings.ffmpeg_path)
            .args(["-hide_banner", flag])
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                Some(String::from_utf8_lossy(&out.stdout).into_owned())
            }
            Ok(out) => {
                warn!(flag, status = %out.status, "ffmpeg probe failed");
                None
            }
            Err(e) => {
                warn!(flag, error = %e, "ffmpeg not runnable for probe");
                None
            }
        }
    }
}

#[async_trait]
impl CaptureDevice for FfmpegCaptureDevice {
    async fn supports_format(&self, format: ClipFormat) -> bool {
        self.formats
            .get_or_init(|| self.probe_formats())
            .await
            .contains(&format)
    }

    #[instrument(skip(self))]
    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> CoreResult<Box<dyn MediaStream>> {
        let camera = self.camera_for(constraints.facing).to_string();

        check_camera_present(&camera)?;

        let status = Command::new(&self.settings.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                RecorderError::device_access(format!(
                    "ffmpeg unavailable at {:?}: {}",
                    self.settings.ffmpeg_path, e
                ))
            })?;

        if !status.success() {
            return Err(RecorderError::device_access(format!(
                "ffmpeg at {:?} exited with {}",
                self.settings.ffmpeg_path, status
            )));
        }

        let microphone = constraints
            .audio
            .then(|| self.settings.microphone.clone());
        let tracks = if microphone.is_some() {
            vec![TrackKind::Video, TrackKind::Audio]
        } else {
            vec![TrackKind::Video]
        };
        let input_args = input_args(&camera, microphone.as_deref());

        let info = StreamInfo {
            id: Uuid::new_v4(),
            camera,
            microphone,
        };

        info!(stream_id = %info.id, camera = %info.camera, "Capture stream granted");

        Ok(Box::new(FfmpegStream {
            info,
            ffmpeg_path: self.settings.ffmpeg_path.clone(),
            input_args,
            tracks,
            kill_tx: None,
        }))
    }
}

struct FfmpegStream {
    info: StreamInfo,
    ffmpeg_path: PathBuf,
    input_args: Vec<String>,
    tracks: Vec<TrackKind>,
    kill_tx: Option<watch::Sender<bool>>,
}

#[async_trait]
impl MediaStream for FfmpegStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn tracks(&self) -> &[TrackKind] {
        &self.tracks
    }

    #[instrument(skip(self, events), fields(stream_id = %self.info.id))]
    async fn record(
        &mut self,
        format: ClipFormat,
        events: EncoderSender,
    ) -> CoreResult<Box<dyn Encoder>> {
        if self.tracks.is_empty() {
            return Err(RecorderError::encoder("Stream already stopped"));
        }

        let mut child = Command::new(&self.ffmpeg_path)
            .args(["-hide_banner", "-loglevel", "error"])
            .args(&self.input_args)
            .args(output_args(format))
            .arg("pipe:1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RecorderError::device_access(format!("Failed to spawn ffmpeg: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecorderError::encoder("ffmpeg stdin not captured"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RecorderError::encoder("ffmpeg stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RecorderError::encoder("ffmpeg stderr not captured"))?;

        let stopping = Arc::new(AtomicBool::new(false));
        let (kill_tx, kill_rx) = watch::channel(false);
        self.kill_tx = Some(kill_tx);

        tokio::spawn(pump_output(
            child,
            stdout,
            stderr,
            events,
            Arc::clone(&stopping),
            kill_rx,
        ));

        info!(format = %format, "ffmpeg encoder started");

        Ok(Box::new(FfmpegEncoder {
            stdin: Some(stdin),
            stopping,
        }))
    }

    fn stop_tracks(&mut self) {
        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(true);
        }
        if !self.tracks.is_empty() {
            self.tracks.clear();
            debug!(stream_id = %self.info.id, "Capture tracks stopped");
        }
    }

    fn is_live(&self) -> bool {
        !self.tracks.is_empty()
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

struct FfmpegEncoder {
    stdin: Option<ChildStdin>,
    stopping: Arc<AtomicBool>,
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn stop(&mut self) -> CoreResult<()> {
        self.stopping.store(true, Ordering::Release);

        // `q` on stdin makes ffmpeg flush the container trailer and exit.
        if let Some(mut stdin) = self.stdin.take() {
            match stdin.write_all(b"q").await {
                Ok(()) => debug!("ffmpeg asked to finalize"),
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!("ffmpeg already exited before finalize request");
                }
                Err(e) => {
                    return Err(RecorderError::encoder(format!(
                        "Failed to signal ffmpeg: {}",
                        e
                    )));
                }
            }
        }

        Ok(())
    }
}

async fn pump_output(
    mut child: Child,
    mut stdout: ChildStdout,
    stderr: ChildStderr,
    events: EncoderSender,
    stopping: Arc<AtomicBool>,
    mut kill_rx: watch::Receiver<bool>,
) {
    let stderr_task = tokio::spawn(read_tail(stderr));
    let mut buf = vec![0u8; READ_CHUNK_BYTES];
    let mut killed = false;
    let mut read_error = None;

    loop {
        tokio::select! {
            read = stdout.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = EncoderEvent::Chunk(Bytes::copy_from_slice(&buf[..n]));
                    if events.send(chunk).await.is_err() && !killed {
                        debug!("Encoder events unsubscribed, killing ffmpeg");
                        killed = true;
                        let _ = child.start_kill();
                    }
                }
                Err(e) => {
                    read_error = Some(e.to_string());
                    break;
                }
            },
            // Fires on an explicit kill and when the stream is dropped.
            _ = kill_rx.changed(), if !killed => {
                killed = true;
                if let Err(e) = child.start_kill() {
                    debug!(error = %e, "ffmpeg already gone");
                }
            }
        }
    }

    let status = child.wait().await;
    let stderr_tail = stderr_task.await.unwrap_or_default();
    let expected_exit = killed || stopping.load(Ordering::Acquire);

    let event = match (status, read_error) {
        (_, Some(reason)) => EncoderEvent::Failed(format!("Reading ffmpeg output failed: {}", reason)),
        (Ok(status), None) if status.success() || expected_exit => EncoderEvent::Finished,
        (Ok(status), None) => EncoderEvent::Failed(format!(
            "ffmpeg exited with {}: {}",
            status,
            stderr_tail.trim()
        )),
        (Err(_), None) if expected_exit => EncoderEvent::Finished,
        (Err(e), None) => EncoderEvent::Failed(format!("Waiting for ffmpeg failed: {}", e)),
    };

    if let EncoderEvent::Failed(reason) = &event {
        error!(reason = %reason, "ffmpeg encoder failed");
    }

    let _ = events.send(event).await;
}

async fn read_tail(mut stderr: ChildStderr) -> String {
    let mut collected = Vec::new();
    if let Err(e) = stderr.read_to_end(&mut collected).await {
        debug!(error = %e, "Reading ffmpeg stderr failed");
    }
    let start = collected.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&collected[start..]).into_owned()
}

/// Fails early for a V4L2 camera node that does not exist.
#[track_caller]
fn check_camera_present(camera: &str) -> CoreResult<()> {
    if cfg!(not(any(target_os = "macos", target_os = "windows")))
        && camera.starts_with("/dev/")
        && !std::path::Path::new(camera).exists()
    {
        return Err(RecorderError::device_access(format!(
            "Camera {} not found",
            camera
        )));
    }
    Ok(())
}

/// Formats listed as muxable in `ffmpeg -muxers` output.
pub(crate) fn parse_muxers(listing: &str) -> Vec<ClipFormat> {
    let mut formats: Vec<ClipFormat> = listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            if !flags.contains('E') || flags.contains('=') {
                return None;
            }
            fields.next()?.split(',').find_map(|name| match name {
                "mp4" => Some(ClipFormat::Mp4),
                "webm" => Some(ClipFormat::Webm),
                _ => None,
            })
        })
        .collect();
    formats.dedup();
    formats
}

/// Encoder names listed in `ffmpeg -encoders` output.
pub(crate) fn parse_encoders(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let flags = fields.next()?;
            let name = fields.next()?;
            let is_entry =
                flags.len() == 6 && flags.starts_with(['V', 'A', 'S']) && name != "=";
            is_entry.then(|| name.to_string())
        })
        .collect()
}

/// Video and audio encoders [`output_args`] selects for `format`.
pub(crate) fn required_encoders(format: ClipFormat) -> [&'static str; 2] {
    match format {
        ClipFormat::Mp4 => [MP4_VIDEO_ENCODER, MP4_AUDIO_ENCODER],
        ClipFormat::Webm => [WEBM_VIDEO_ENCODER, WEBM_AUDIO_ENCODER],
    }
}

/// Muxable formats whose encoders are all present.
pub(crate) fn supported_formats(muxers: &[ClipFormat], encoders: &[String]) -> Vec<ClipFormat> {
    muxers
        .iter()
        .copied()
        .filter(|format| {
            required_encoders(*format)
                .iter()
                .all(|needed| encoders.iter().any(|name| name == needed))
        })
        .collect()
}

/// Input arguments for the platform's capture backend.
pub(crate) fn input_args(camera: &str, microphone: Option<&str>) -> Vec<String> {
    #[cfg(target_os = "macos")]
    let args = {
        let input = match microphone {
            Some(mic) => format!("{}:{}", camera, mic),
            None => format!("{}:none", camera),
        };
        vec![
            "-f".to_string(),
            "avfoundation".to_string(),
            "-framerate".to_string(),
            "30".to_string(),
            "-i".to_string(),
            input,
        ]
    };

    #[cfg(target_os = "windows")]
    let args = {
        let input = match microphone {
            Some(mic) => format!("video={}:audio={}", camera, mic),
            None => format!("video={}", camera),
        };
        vec!["-f".to_string(), "dshow".to_string(), "-i".to_string(), input]
    };

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let args = {
        let mut args: Vec<String> = ["-f", "v4l2", "-i", camera]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(mic) = microphone {
            args.extend(["-f", "pulse", "-i", mic].iter().map(|s| s.to_string()));
        }
        args
    };

    args
}

/// Codec and muxer arguments producing a container readable from a pipe.
pub(crate) fn output_args(format: ClipFormat) -> &'static [&'static str] {
    match format {
        ClipFormat::Mp4 => &[
            "-c:v",
            MP4_VIDEO_ENCODER,
            "-preset",
            "veryfast",
            "-pix_fmt",
            "yuv420p",
            "-c:a",
            MP4_AUDIO_ENCODER,
            "-movflags",
            "frag_keyframe+empty_moov+default_base_moof",
            "-f",
            "mp4",
        ],
        ClipFormat::Webm => &[
            "-c:v",
            WEBM_VIDEO_ENCODER,
            "-deadline",
            "realtime",
            "-c:a",
            WEBM_AUDIO_ENCODER,
            "-f",
            "webm",
        ],
    }
}
