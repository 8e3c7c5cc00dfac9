//! Media provider contracts and source classification.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use clipforge_common::{ClipforgeError, ClipforgeResult};

use crate::encode::{EncoderConfig, EncoderSession};
use crate::frame::FrameBuffer;
use crate::metadata::{AudioMetadata, AudioSegment, VideoMetadata, Waveform};
use crate::waveform::peak_waveform;

/// Random-access video frames from one source file.
///
/// Methods take `&self`; implementations that keep decoder state must
/// synchronize internally so handles can be shared between the live store
/// and history snapshots.
pub trait VideoProvider: Send + Sync {
    fn path(&self) -> &Path;

    fn metadata(&self) -> &VideoMetadata;

    fn duration_ms(&self) -> i64 {
        self.metadata().duration_ms
    }

    /// Decode the frame shown at `source_ms` on the source's own time axis.
    fn frame_at(&self, source_ms: i64) -> ClipforgeResult<FrameBuffer>;
}

/// Random-access audio samples from one source file.
pub trait AudioProvider: Send + Sync {
    fn path(&self) -> &Path;

    fn metadata(&self) -> ClipforgeResult<AudioMetadata>;

    /// Interleaved stereo samples covering `[start_ms, end_ms)` of the source,
    /// resampled to `sample_rate`. Ranges past the end yield fewer samples.
    fn segment(&self, start_ms: f64, end_ms: f64, sample_rate: u32)
        -> ClipforgeResult<AudioSegment>;

    /// Peak-amplitude waveform over the whole source.
    ///
    /// A source without audible samples returns an empty waveform.
    fn waveform(&self, bins: usize) -> ClipforgeResult<Waveform> {
        if bins == 0 {
            return Err(ClipforgeError::invalid_parameter(
                "waveform bin count must be non-zero",
            ));
        }
        let duration_ms = self.metadata()?.duration_ms;
        if duration_ms <= 0 {
            return Ok(Waveform::default());
        }
        let segment = self.segment(0.0, duration_ms as f64, crate::MIX_SAMPLE_RATE)?;
        if segment.is_empty() {
            return Ok(Waveform::default());
        }
        peak_waveform(&segment.samples, segment.channels, bins)
    }
}

/// Factory for providers and encoding sessions.
pub trait MediaBackend: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Bind a video provider; fails if the file has no decodable video stream.
    fn open_video(&self, path: &Path) -> ClipforgeResult<Arc<dyn VideoProvider>>;

    /// Bind an audio provider; fails if the file has no decodable audio stream.
    fn open_audio(&self, path: &Path) -> ClipforgeResult<Arc<dyn AudioProvider>>;

    fn create_encoder(&self, config: &EncoderConfig) -> ClipforgeResult<Box<dyn EncoderSession>>;

    /// Copy the audio track of `video_path` into a standalone audio file.
    fn extract_audio(&self, video_path: &Path, output_path: &Path) -> ClipforgeResult<()>;
}

/// Outcome of classifying a source file.
#[derive(Clone)]
pub enum MediaKind {
    Video(Arc<dyn VideoProvider>),
    Audio(Arc<dyn AudioProvider>),
    Unrecognized,
}

impl MediaKind {
    pub fn is_audio_only(&self) -> bool {
        matches!(self, Self::Audio(_))
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

impl fmt::Debug for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video(p) => f.debug_tuple("Video").field(&p.path()).finish(),
            Self::Audio(p) => f.debug_tuple("Audio").field(&p.path()).finish(),
            Self::Unrecognized => f.write_str("Unrecognized"),
        }
    }
}

/// Classify a file by binding a video provider first, then an audio provider.
pub fn classify(backend: &dyn MediaBackend, path: &Path) -> MediaKind {
    match backend.open_video(path) {
        Ok(video) => return MediaKind::Video(video),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Not a video source");
        }
    }
    match backend.open_audio(path) {
        Ok(audio) => MediaKind::Audio(audio),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Not an audio source");
            MediaKind::Unrecognized
        }
    }
}

/// Whether the file classifies as audio-only.
pub fn is_audio_only(backend: &dyn MediaBackend, path: &Path) -> bool {
    classify(backend, path).is_audio_only()
}

/// File metadata in the host-facing record shape.
///
/// Audio-only sources report zero dimensions and frame rate.
pub fn probe_metadata(backend: &dyn MediaBackend, path: &Path) -> ClipforgeResult<VideoMetadata> {
    match classify(backend, path) {
        MediaKind::Video(video) => Ok(video.metadata().clone()),
        MediaKind::Audio(audio) => Ok(audio.metadata()?.to_video_metadata("audio")),
        MediaKind::Unrecognized => Err(ClipforgeError::invalid_file(
            path,
            "no decodable video or audio stream",
        )),
    }
}

/// Audio metadata of any source with an audio stream.
pub fn probe_audio_metadata(
    backend: &dyn MediaBackend,
    path: &Path,
) -> ClipforgeResult<AudioMetadata> {
    backend.open_audio(path)?.metadata()
}

/// Waveform of a file's audio; files without audio yield an empty waveform.
pub fn generate_waveform(
    backend: &dyn MediaBackend,
    path: &Path,
    bins: usize,
) -> ClipforgeResult<Waveform> {
    if bins == 0 {
        return Err(ClipforgeError::invalid_parameter(
            "waveform bin count must be non-zero",
        ));
    }
    if !classify(backend, path).is_recognized() {
        return Err(ClipforgeError::invalid_file(path, "unreadable media file"));
    }
    match backend.open_audio(path) {
        Ok(audio) => audio.waveform(bins),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No audio for waveform");
            Ok(Waveform::default())
        }
    }
}
