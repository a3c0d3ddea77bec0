//! Desktop rendering of the session.
//!
//! Notices become desktop notifications. The recorded clip is written to
//! the cache directory and opened in the system video player, and the
//! download link is opened in the system browser.

use crate::AppResult;

use std::{
    fs,
    panic::Location,
    path::{Path, PathBuf},
    sync::Mutex,
};

use clip_recorder_core::{
    CoreResult, EncodedClip, Notice, Presenter, RecorderError, SessionSnapshot, StreamInfo,
};
use error_location::ErrorLocation;
use notify_rust::Notification;
use tracing::{debug, error, info, instrument, warn};

const NOTIFICATION_SUMMARY: &str = "Clip Recorder";

/// [`Presenter`] for a desktop session.
pub struct DesktopPresenter {
    cache_dir: PathBuf,
    open_previews: bool,
    last_preview: Mutex<Option<PathBuf>>,
}

impl DesktopPresenter {
    /// Creates a presenter writing previews under `cache_dir`.
    ///
    /// With `open_previews` off, clips are still written but not opened.
    /// Previews left behind by earlier runs are removed.
    pub fn new(cache_dir: PathBuf, open_previews: bool) -> Self {
        let removed = remove_stale_previews(&cache_dir);
        if removed > 0 {
            info!(removed, cache_dir = ?cache_dir, "Removed previews from earlier runs");
        }

        Self {
            cache_dir,
            open_previews,
            last_preview: Mutex::new(None),
        }
    }

    /// Replaces the previous preview file with one for `clip`.
    fn replace_preview(&self, clip: &EncodedClip) -> AppResult<PathBuf> {
        let path = write_preview(&self.cache_dir, clip)?;

        let previous = match self.last_preview.lock() {
            Ok(mut last) => last.replace(path.clone()),
            Err(_) => None,
        };

        if let Some(previous) = previous.filter(|previous| *previous != path) {
            if let Err(e) = fs::remove_file(&previous) {
                warn!(path = ?previous, error = ?e, "Failed to remove previous preview");
            }
        }

        Ok(path)
    }
}

impl Presenter for DesktopPresenter {
    fn phase_changed(&self, snapshot: &SessionSnapshot) {
        debug!(
            phase = ?snapshot.phase,
            uploading = snapshot.uploading,
            "Session state published"
        );
    }

    fn show_live_preview(&self, stream: &StreamInfo) {
        info!(
            stream_id = %stream.id,
            camera = %stream.camera,
            microphone = ?stream.microphone,
            "Recording live"
        );
    }

    #[instrument(skip(self, clip), fields(clip_id = %clip.id, bytes = clip.len()))]
    fn show_recorded_clip(&self, clip: &EncodedClip) {
        let path = match self.replace_preview(clip) {
            Ok(path) => path,
            Err(e) => {
                error!(error = ?e, "Failed to write clip preview");
                return;
            }
        };

        if !self.open_previews {
            info!(path = ?path, "Clip preview written");
            return;
        }

        match open::that(&path) {
            Ok(()) => info!(path = ?path, "Clip preview opened"),
            Err(e) => warn!(path = ?path, error = ?e, "Failed to open clip preview"),
        }
    }

    #[instrument(skip(self), fields(kind = ?notice.kind))]
    fn notify(&self, notice: &Notice) {
        let shown = Notification::new()
            .summary(NOTIFICATION_SUMMARY)
            .body(&notice.message)
            .show();

        if let Err(e) = shown {
            // Logged so the notice is not lost when no notification daemon runs.
            error!(error = ?e, message = %notice.message, "Failed to show notification");
        }
    }

    #[instrument(skip(self))]
    fn navigate(&self, url: &str) -> CoreResult<()> {
        open::that(url).map_err(|e| RecorderError::Navigation {
            reason: format!("Failed to open {}: {}", url, e),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Writes `clip` as `recorded-video-<id>.<ext>` under `dir`.
#[track_caller]
pub(crate) fn write_preview(dir: &Path, clip: &EncodedClip) -> AppResult<PathBuf> {
    let path = dir.join(preview_file_name(clip));
    fs::write(&path, &clip.data)?;
    debug!(path = ?path, bytes = clip.len(), "Clip preview written to cache");
    Ok(path)
}

/// Deletes every preview file under `dir` and returns how many went.
pub(crate) fn remove_stale_previews(dir: &Path) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = ?dir, error = ?e, "Clip cache not readable");
            return 0;
        }
    };

    let prefix = format!("{}-", clip_recorder_core::CLIP_FILE_STEM);
    let mut removed = 0;
    for path in entries.flatten().map(|entry| entry.path()) {
        let is_preview = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&prefix));
        if !is_preview || !path.is_file() {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = ?path, error = ?e, "Failed to remove stale preview"),
        }
    }
    removed
}

pub(crate) fn preview_file_name(clip: &EncodedClip) -> String {
    format!(
        "{}-{}.{}",
        clip_recorder_core::CLIP_FILE_STEM,
        clip.id,
        clip.format.extension()
    )
}
