//! Frame and sample clocks for timeline rendering and export.
//!
//! Timeline positions are integer milliseconds. Export walks the timeline in
//! two independent cadences:
//! - Video frames at a fixed frame rate
//! - Audio frames of a fixed number of samples at a fixed sample rate
//!
//! Both clocks derive every position from the frame index instead of
//! accumulating a rounded step, so long exports never drift.

use crate::error::{ClipforgeError, ClipforgeResult};

/// Video frame cadence for a fixed frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    fps: u32,
}

impl FrameClock {
    /// Create a clock for the given frame rate.
    pub fn new(fps: u32) -> ClipforgeResult<Self> {
        if fps == 0 {
            return Err(ClipforgeError::invalid_parameter("fps must be non-zero"));
        }
        Ok(Self { fps })
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Nominal frame duration in milliseconds.
    pub fn frame_duration_ms(&self) -> f64 {
        1000.0 / self.fps as f64
    }

    /// Number of frames whose timestamp falls inside `[0, duration_ms)`.
    pub fn frame_count(&self, duration_ms: i64) -> u64 {
        if duration_ms <= 0 {
            return 0;
        }
        let scaled = duration_ms as u128 * self.fps as u128;
        scaled.div_ceil(1000) as u64
    }

    /// Timeline timestamp of frame `index`, floored to whole milliseconds.
    pub fn timestamp_ms(&self, index: u64) -> i64 {
        (index as u128 * 1000 / self.fps as u128) as i64
    }

    /// Iterate all frame timestamps inside `[0, duration_ms)`.
    pub fn timestamps(&self, duration_ms: i64) -> impl Iterator<Item = i64> + '_ {
        (0..self.frame_count(duration_ms)).map(move |i| self.timestamp_ms(i))
    }
}

/// Audio frame cadence: `frame_size` samples per channel at `sample_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleClock {
    sample_rate: u32,
    frame_size: usize,
}

impl SampleClock {
    pub fn new(sample_rate: u32, frame_size: usize) -> ClipforgeResult<Self> {
        if sample_rate == 0 || frame_size == 0 {
            return Err(ClipforgeError::invalid_parameter(
                "sample rate and frame size must be non-zero",
            ));
        }
        Ok(Self {
            sample_rate,
            frame_size,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Duration of one audio frame in milliseconds.
    pub fn frame_duration_ms(&self) -> f64 {
        self.samples_to_ms(self.frame_size)
    }

    /// Number of audio frames needed to cover `[0, duration_ms)`.
    pub fn frame_count(&self, duration_ms: i64) -> u64 {
        if duration_ms <= 0 {
            return 0;
        }
        let samples = duration_ms as u128 * self.sample_rate as u128;
        let per_frame = 1000 * self.frame_size as u128;
        samples.div_ceil(per_frame) as u64
    }

    /// Timeline position of the first sample of frame `index`.
    pub fn frame_start_ms(&self, index: u64) -> f64 {
        (index as f64 * self.frame_size as f64 * 1000.0) / self.sample_rate as f64
    }

    /// Convert milliseconds to a whole number of samples per channel.
    pub fn ms_to_samples(&self, ms: f64) -> usize {
        if ms <= 0.0 {
            return 0;
        }
        (ms * self.sample_rate as f64 / 1000.0).round() as usize
    }

    pub fn samples_to_ms(&self, samples: usize) -> f64 {
        samples as f64 * 1000.0 / self.sample_rate as f64
    }
}
