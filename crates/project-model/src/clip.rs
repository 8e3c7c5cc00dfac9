//! Media clips and their source bindings.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clipforge_media_core::{AudioProvider, MediaKind, VideoProvider};
use serde::{Deserialize, Serialize};

use crate::ids::{ClipId, TrackId};

pub const MIN_CLIP_SCALE: f32 = 0.01;
pub const MAX_CLIP_SCALE: f32 = 5.0;

/// Duration assumed for audio sources whose length cannot be read.
pub const AUDIO_FALLBACK_DURATION_MS: i64 = 60_000;

/// What a clip's source turned out to be when it was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipType {
    Video,
    AudioOnly,
}

/// A placed reference to a source file.
///
/// Timeline placement is `[start_ms, end_ms)`; the source plays from
/// `trim_start_ms` at `speed` source milliseconds per timeline millisecond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub kind: ClipType,
    pub path: PathBuf,
    pub track: TrackId,
    pub start_ms: i64,
    pub end_ms: i64,
    pub trim_start_ms: i64,
    pub trim_end_ms: i64,
    pub speed: f64,
    pub volume: f32,
    pub muted: bool,
    pub scale_x: f32,
    pub scale_y: f32,
    pub lock_aspect_ratio: bool,
}

impl Clip {
    /// A clip playing `source_duration_ms` of its source from `start_ms`.
    pub fn new(
        id: ClipId,
        kind: ClipType,
        path: impl Into<PathBuf>,
        track: TrackId,
        start_ms: i64,
        source_duration_ms: i64,
    ) -> Self {
        let duration = source_duration_ms.max(0);
        Self {
            id,
            kind,
            path: path.into(),
            track,
            start_ms,
            end_ms: start_ms + duration,
            trim_start_ms: 0,
            trim_end_ms: duration,
            speed: 1.0,
            volume: 1.0,
            muted: false,
            scale_x: 1.0,
            scale_y: 1.0,
            lock_aspect_ratio: true,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Whether the clip covers `timestamp_ms` (end exclusive).
    pub fn is_active_at(&self, timestamp_ms: i64) -> bool {
        self.start_ms <= timestamp_ms && timestamp_ms < self.end_ms
    }

    /// Map a timeline timestamp onto the source's time axis.
    pub fn source_time_ms(&self, timestamp_ms: i64) -> i64 {
        self.trim_start_ms + ((timestamp_ms - self.start_ms) as f64 * self.speed) as i64
    }

    /// Fractional variant of [`Clip::source_time_ms`] used for sample addressing.
    pub fn source_time_precise_ms(&self, timestamp_ms: f64) -> f64 {
        self.trim_start_ms as f64 + (timestamp_ms - self.start_ms as f64) * self.speed
    }

    pub fn set_scale(&mut self, scale_x: f32, scale_y: f32) {
        self.scale_x = clamp_scale(scale_x);
        self.scale_y = clamp_scale(scale_y);
    }

    /// Lock or unlock the aspect ratio; locking averages the two scales.
    pub fn set_aspect_lock(&mut self, locked: bool) {
        self.lock_aspect_ratio = locked;
        if locked {
            let avg = clamp_scale((self.scale_x + self.scale_y) / 2.0);
            self.scale_x = avg;
            self.scale_y = avg;
        }
    }
}

/// Clamp a scale factor into `[MIN_CLIP_SCALE, MAX_CLIP_SCALE]`; NaN maps to 1.
pub fn clamp_scale(v: f32) -> f32 {
    if v.is_nan() {
        return 1.0;
    }
    v.clamp(MIN_CLIP_SCALE, MAX_CLIP_SCALE)
}

/// Provider handle bound to a clip.
///
/// Handles are shared between the live store and history snapshots.
#[derive(Clone, Default)]
pub enum ClipMedia {
    Video(Arc<dyn VideoProvider>),
    Audio(Arc<dyn AudioProvider>),
    /// The source could not be reopened (e.g. after loading a project file).
    #[default]
    Detached,
}

impl ClipMedia {
    pub fn from_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Video(v) => Self::Video(v),
            MediaKind::Audio(a) => Self::Audio(a),
            MediaKind::Unrecognized => Self::Detached,
        }
    }

    pub fn video(&self) -> Option<&Arc<dyn VideoProvider>> {
        match self {
            Self::Video(v) => Some(v),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&Arc<dyn AudioProvider>> {
        match self {
            Self::Audio(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Detached)
    }

    fn addr(&self) -> Option<*const ()> {
        match self {
            Self::Video(v) => Some(Arc::as_ptr(v) as *const ()),
            Self::Audio(a) => Some(Arc::as_ptr(a) as *const ()),
            Self::Detached => None,
        }
    }
}

/// Two bindings are equal when they share the same provider instance.
impl PartialEq for ClipMedia {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl fmt::Debug for ClipMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video(v) => f.debug_tuple("Video").field(&v.path()).finish(),
            Self::Audio(a) => f.debug_tuple("Audio").field(&a.path()).finish(),
            Self::Detached => f.write_str("Detached"),
        }
    }
}

/// A clip record together with its provider binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipEntry {
    pub clip: Clip,
    pub media: ClipMedia,
}
