//! Encoded clip model and chunk assembly.

use std::{fmt, time::Duration};

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Base name of the uploaded file; the extension follows the clip format.
pub const CLIP_FILE_STEM: &str = "recorded-video";

/// Container format of an encoded clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipFormat {
    /// MPEG-4 container (`video/mp4`).
    Mp4,
    /// WebM container (`video/webm`).
    Webm,
}

impl ClipFormat {
    /// Formats in order of preference.
    pub const PREFERENCE: [ClipFormat; 2] = [ClipFormat::Mp4, ClipFormat::Webm];

    /// MIME type sent with the upload.
    pub fn mime_type(self) -> &'static str {
        match self {
            ClipFormat::Mp4 => "video/mp4",
            ClipFormat::Webm => "video/webm",
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ClipFormat::Mp4 => "mp4",
            ClipFormat::Webm => "webm",
        }
    }

    /// Picks the first preferred format found in `supported`.
    ///
    /// Falls back to [`ClipFormat::Webm`] when nothing is reported as
    /// supported, so the encoder always gets a concrete format.
    pub fn negotiate(supported: &[ClipFormat]) -> ClipFormat {
        Self::PREFERENCE
            .into_iter()
            .find(|format| supported.contains(format))
            .unwrap_or(ClipFormat::Webm)
    }
}

impl fmt::Display for ClipFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// A finished recording. Never mutated after assembly; re-recording
/// replaces it with a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedClip {
    /// Identity of this clip, used to match upload results.
    pub id: Uuid,
    /// Container format chosen when the capture started.
    pub format: ClipFormat,
    /// Concatenated encoder output.
    pub data: Bytes,
    /// Wall time between capture start and stop.
    pub recorded_for: Duration,
}

impl EncodedClip {
    /// File name used for the multipart upload, e.g. `recorded-video.mp4`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", CLIP_FILE_STEM, self.format.extension())
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the encoder produced no data at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Collects encoder chunks for one capture in emission order.
#[derive(Debug)]
pub struct ClipAssembler {
    format: ClipFormat,
    chunks: Vec<Bytes>,
    total: usize,
}

impl ClipAssembler {
    /// Creates an empty assembler for the given format.
    pub fn new(format: ClipFormat) -> Self {
        Self {
            format,
            chunks: Vec::new(),
            total: 0,
        }
    }

    /// Format every chunk is tagged with.
    pub fn format(&self) -> ClipFormat {
        self.format
    }

    /// Appends a chunk. Empty chunks carry nothing and are dropped.
    pub fn push(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.total += chunk.len();
        self.chunks.push(chunk);
    }

    /// Number of non-empty chunks received so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Bytes received so far.
    pub fn byte_count(&self) -> usize {
        self.total
    }

    /// Concatenates all chunks into one clip.
    pub fn finish(self, recorded_for: Duration) -> EncodedClip {
        let mut data = BytesMut::with_capacity(self.total);
        for chunk in &self.chunks {
            data.extend_from_slice(chunk);
        }

        let clip = EncodedClip {
            id: Uuid::new_v4(),
            format: self.format,
            data: data.freeze(),
            recorded_for,
        };

        debug!(
            clip_id = %clip.id,
            format = %clip.format,
            chunk_count = self.chunks.len(),
            bytes = clip.len(),
            "Clip assembled"
        );

        clip
    }
}
