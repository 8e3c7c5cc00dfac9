//! Metadata and sample records returned by media providers.

use serde::{Deserialize, Serialize};

/// Metadata of a source file with a video stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VideoMetadata {
    pub duration_ms: i64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    /// Container bitrate in bits per second (0 if unknown).
    pub bitrate: u64,
    pub codec: String,
    /// Channel count of the first audio stream (0 if none).
    pub audio_channels: u16,
    /// Sample rate of the first audio stream (0 if none).
    pub audio_sample_rate: u32,
}

impl VideoMetadata {
    pub fn has_audio(&self) -> bool {
        self.audio_channels > 0
    }
}

/// Metadata of an audio source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AudioMetadata {
    pub duration_ms: i64,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioMetadata {
    /// Projection used by host-facing probes that report one record shape.
    pub fn to_video_metadata(&self, codec: impl Into<String>) -> VideoMetadata {
        VideoMetadata {
            duration_ms: self.duration_ms,
            width: 0,
            height: 0,
            frame_rate: 0.0,
            bitrate: 0,
            codec: codec.into(),
            audio_channels: self.channels,
            audio_sample_rate: self.sample_rate,
        }
    }
}

/// Interleaved floating-point PCM.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioSegment {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples, nominally within [-1, 1].
    pub samples: Vec<f32>,
}

impl AudioSegment {
    pub fn empty(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            samples: Vec::new(),
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Peak amplitude per bin, each within [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Waveform {
    pub bins: Vec<f32>,
}

impl Waveform {
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }
}
