//! Encoding session contract used by export.

use std::path::PathBuf;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use serde::{Deserialize, Serialize};

/// Codec used when a requested codec is unknown or unavailable.
pub const DEFAULT_VIDEO_CODEC: &str = "h264";

/// Pixel layout an encoder expects for video frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Packed RGBA8.
    Rgba,
    /// Planar 8-bit Y, U, V with 2x2 chroma subsampling.
    Yuv420p,
}

impl PixelFormat {
    /// Bytes needed for one `width x height` frame.
    pub fn frame_len(self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            Self::Rgba => w * h * 4,
            Self::Yuv420p => w * h + 2 * (w.div_ceil(2) * h.div_ceil(2)),
        }
    }
}

/// Audio stream parameters for an encoding session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEncoderConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Bits per second.
    pub bitrate: u64,
    /// Samples per channel in one encoded frame.
    pub frame_size: usize,
}

impl Default for AudioEncoderConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::MIX_SAMPLE_RATE,
            channels: crate::MIX_CHANNELS,
            bitrate: 256_000,
            frame_size: 1024,
        }
    }
}

/// Parameters for opening an encoding session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Video bits per second.
    pub bitrate: u64,
    /// Requested codec name; backends fall back to [`DEFAULT_VIDEO_CODEC`].
    pub codec: String,
    /// Container format name ("mp4", "mkv", ...).
    pub format: String,
    /// Keyframe interval in frames.
    pub gop_size: u32,
    pub audio: Option<AudioEncoderConfig>,
}

impl EncoderConfig {
    pub fn validate(&self) -> ClipforgeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ClipforgeError::invalid_parameter(
                "encoder width/height must be non-zero",
            ));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ClipforgeError::invalid_parameter(
                "encoder width/height must be even (required for yuv420p output)",
            ));
        }
        if self.fps == 0 {
            return Err(ClipforgeError::invalid_parameter("encoder fps must be non-zero"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ClipforgeError::invalid_parameter("output path is empty"));
        }
        if let Some(audio) = &self.audio {
            if audio.sample_rate == 0 || audio.channels == 0 || audio.frame_size == 0 {
                return Err(ClipforgeError::invalid_parameter(
                    "audio sample rate, channels and frame size must be non-zero",
                ));
            }
        }
        Ok(())
    }
}

/// One video frame in the encoder's pixel format.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Zero-based index in output frame units.
    pub index: u64,
    /// Presentation timestamp on the timeline.
    pub pts_ms: i64,
}

/// One block of interleaved audio samples.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
    /// Presentation timestamp in samples per channel.
    pub pts_samples: u64,
}

/// An open encoding session for a single export.
///
/// Frames are written in presentation order. `finish` flushes pending output
/// and finalizes the container; `abort` releases everything without
/// producing a usable file.
pub trait EncoderSession: Send {
    /// Pixel format `write_video` expects.
    fn pixel_format(&self) -> PixelFormat;

    /// Samples per channel per audio frame, or `None` without an audio stream.
    fn audio_frame_size(&self) -> Option<usize>;

    fn write_video(&mut self, frame: &VideoFrame) -> ClipforgeResult<()>;

    fn write_audio(&mut self, frame: &AudioFrame) -> ClipforgeResult<()>;

    fn finish(self: Box<Self>) -> ClipforgeResult<()>;

    fn abort(self: Box<Self>);
}
