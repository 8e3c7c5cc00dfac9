//! Render and export settings records.

use std::path::PathBuf;

use clipforge_common::{ClipforgeError, ClipforgeResult, ExportDefaults, RenderDefaults};
use serde::{Deserialize, Serialize};

/// Reference frame that text layout and default canvases are designed for.
pub const REFERENCE_WIDTH: u32 = 1920;
pub const REFERENCE_HEIGHT: u32 = 1080;

/// Largest accepted text supersample factor.
pub const MAX_SUPERSAMPLE: u32 = 16;

/// Parameters for rendering a single frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Integer supersample factor for text, within `1..=MAX_SUPERSAMPLE`.
    pub supersample: u32,
    pub dpi_scale: f32,
    /// Request GPU compositing; the CPU path is used when unavailable.
    pub use_gpu: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: REFERENCE_WIDTH,
            height: REFERENCE_HEIGHT,
            supersample: 1,
            dpi_scale: 1.0,
            use_gpu: false,
        }
    }
}

impl RenderSettings {
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn from_defaults(defaults: &RenderDefaults) -> Self {
        Self {
            width: defaults.width,
            height: defaults.height,
            supersample: defaults.supersample.clamp(1, MAX_SUPERSAMPLE),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ClipforgeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ClipforgeError::invalid_parameter(format!(
                "render size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(1..=MAX_SUPERSAMPLE).contains(&self.supersample) {
            return Err(ClipforgeError::invalid_parameter(format!(
                "supersample must be within 1..={MAX_SUPERSAMPLE}, got {}",
                self.supersample
            )));
        }
        Ok(())
    }
}

/// Parameters for a full export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub output_path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Video bits per second.
    pub bitrate: u64,
    pub fps: u32,
    /// Container format name.
    pub format: String,
    /// Requested video codec name.
    pub codec: String,
    /// Audio bits per second.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: u64,
    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,
}

fn default_audio_bitrate() -> u64 {
    256_000
}

fn default_audio_sample_rate() -> u32 {
    clipforge_media_core::MIX_SAMPLE_RATE
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("output.mp4"),
            width: REFERENCE_WIDTH,
            height: REFERENCE_HEIGHT,
            bitrate: 5_000_000,
            fps: 30,
            format: "mp4".to_string(),
            codec: "h264".to_string(),
            audio_bitrate: default_audio_bitrate(),
            audio_sample_rate: default_audio_sample_rate(),
        }
    }
}

impl ExportSettings {
    pub fn from_defaults(output_path: impl Into<PathBuf>, defaults: &ExportDefaults) -> Self {
        Self {
            output_path: output_path.into(),
            bitrate: defaults.bitrate,
            fps: defaults.fps,
            codec: defaults.video_codec.clone(),
            audio_bitrate: defaults.audio_bitrate,
            audio_sample_rate: defaults.audio_sample_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ClipforgeResult<()> {
        if self.width == 0 || self.height == 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(ClipforgeError::invalid_parameter(format!(
                "export size must be non-zero and even, got {}x{}",
                self.width, self.height
            )));
        }
        if !(1..=240).contains(&self.fps) {
            return Err(ClipforgeError::invalid_parameter(format!(
                "export fps must be within 1..=240, got {}",
                self.fps
            )));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ClipforgeError::invalid_parameter("export output path is empty"));
        }
        if self.audio_sample_rate == 0 {
            return Err(ClipforgeError::invalid_parameter(
                "audio sample rate must be non-zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let r = RenderSettings::default();
        assert_eq!((r.width, r.height, r.supersample), (1920, 1080, 1));
        assert!(!r.use_gpu);

        let e = ExportSettings::default();
        assert_eq!((e.width, e.height, e.fps), (1920, 1080, 30));
        assert_eq!(e.bitrate, 5_000_000);
        assert!(e.validate().is_ok());
    }

    #[test]
    fn test_render_validation() {
        assert!(RenderSettings::default().validate().is_ok());

        let mut r = RenderSettings::default();
        r.supersample = MAX_SUPERSAMPLE;
        assert!(r.validate().is_ok());

        for bad in [0, MAX_SUPERSAMPLE + 1, u32::MAX] {
            r.supersample = bad;
            let err = r.validate().unwrap_err();
            assert_eq!(err.code(), clipforge_common::ErrorCode::InvalidParameter);
        }

        let defaults = RenderDefaults {
            supersample: 1_000,
            ..RenderDefaults::default()
        };
        assert_eq!(RenderSettings::from_defaults(&defaults).supersample, MAX_SUPERSAMPLE);
    }

    #[test]
    fn test_export_validation() {
        let mut e = ExportSettings::default();
        e.width = 1279;
        assert!(e.validate().is_err());

        let mut e = ExportSettings::default();
        e.fps = 0;
        assert!(e.validate().is_err());

        let mut e = ExportSettings::default();
        e.output_path = PathBuf::new();
        assert!(e.validate().is_err());
    }

    #[test]
    fn test_from_config_defaults() {
        let defaults = ExportDefaults::default();
        let e = ExportSettings::from_defaults("out.mkv", &defaults);
        assert_eq!(e.output_path, PathBuf::from("out.mkv"));
        assert_eq!(e.codec, "h264");
        assert_eq!(e.audio_bitrate, 256_000);
    }
}
