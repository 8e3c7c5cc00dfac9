//! ffmpeg-backed implementation of the Clipforge media contracts.
//!
//! Every operation shells out to the `ffmpeg`/`ffprobe` executables found on
//! `PATH`:
//! - `ffprobe -print_format json` for metadata
//! - `ffmpeg ... -f rawvideo -pix_fmt rgba pipe:1` for single video frames
//! - `ffmpeg ... -f f32le -ac 2 pipe:1` for audio PCM
//! - raw YUV420P piped into `ffmpeg` stdin for encoding

pub mod decode;
pub mod encode;
pub mod probe;

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_media_core::{
    AudioProvider, EncoderConfig, EncoderSession, MediaBackend, VideoProvider,
};

pub use decode::{FfmpegAudio, FfmpegVideo};
pub use encode::{resolve_video_codec, FfmpegEncoder};
pub use probe::{probe, ProbeInfo};

/// Media backend using the system ffmpeg tools.
#[derive(Debug, Default, Clone)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }

    /// Whether both `ffmpeg` and `ffprobe` can be spawned.
    pub fn is_available(&self) -> bool {
        is_ffmpeg_on_path() && is_ffprobe_on_path()
    }
}

impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn open_video(&self, path: &Path) -> ClipforgeResult<Arc<dyn VideoProvider>> {
        Ok(Arc::new(FfmpegVideo::open(path)?))
    }

    fn open_audio(&self, path: &Path) -> ClipforgeResult<Arc<dyn AudioProvider>> {
        Ok(Arc::new(FfmpegAudio::open(path)?))
    }

    fn create_encoder(&self, config: &EncoderConfig) -> ClipforgeResult<Box<dyn EncoderSession>> {
        Ok(Box::new(FfmpegEncoder::start(config)?))
    }

    fn extract_audio(&self, video_path: &Path, output_path: &Path) -> ClipforgeResult<()> {
        let info = probe(video_path)?;
        if info.audio.is_none() {
            return Err(ClipforgeError::invalid_file(video_path, "no audio stream"));
        }
        encode::ensure_parent_dir(output_path)?;

        let codec = audio_codec_for_extension(output_path);
        tracing::info!(
            input = %video_path.display(),
            output = %output_path.display(),
            codec,
            "Extracting audio"
        );

        let out = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-i"])
            .arg(video_path)
            .args(["-vn", "-c:a", codec])
            .arg(output_path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ClipforgeError::encode(format!("failed to run ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(ClipforgeError::encode(format!(
                "audio extraction failed for '{}': {}",
                video_path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Audio encoder matching the output file extension.
fn audio_codec_for_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("wav") => "pcm_s16le",
        Some("mp3") => "libmp3lame",
        Some("aac") | Some("m4a") => "aac",
        Some("flac") => "flac",
        Some("ogg") | Some("opus") => "libopus",
        _ => "copy",
    }
}

pub fn is_ffmpeg_on_path() -> bool {
    tool_runs("ffmpeg")
}

pub fn is_ffprobe_on_path() -> bool {
    tool_runs("ffprobe")
}

fn tool_runs(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
