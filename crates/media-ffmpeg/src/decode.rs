//! Video frame and audio sample providers backed by `ffmpeg`.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_media_core::{
    AudioMetadata, AudioProvider, AudioSegment, FrameBuffer, VideoMetadata, VideoProvider,
};

use crate::probe::probe;

/// Video provider decoding one frame per request.
///
/// The most recently decoded frame is kept so repeated requests for the same
/// source timestamp (still frames, slow-motion clips) skip the decode.
pub struct FfmpegVideo {
    path: PathBuf,
    metadata: VideoMetadata,
    last_frame: Mutex<Option<FrameBuffer>>,
}

impl FfmpegVideo {
    pub fn open(path: &Path) -> ClipforgeResult<Self> {
        let info = probe(path)?;
        let metadata = info
            .video
            .ok_or_else(|| ClipforgeError::invalid_file(path, "no video stream"))?;
        tracing::debug!(
            path = %path.display(),
            width = metadata.width,
            height = metadata.height,
            duration_ms = metadata.duration_ms,
            "Opened video source"
        );
        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            last_frame: Mutex::new(None),
        })
    }

    fn decode(&self, source_ms: i64) -> ClipforgeResult<FrameBuffer> {
        let seek = format!("{:.3}", source_ms.max(0) as f64 / 1000.0);
        let out = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &seek, "-i"])
            .arg(&self.path)
            .args([
                "-frames:v",
                "1",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ClipforgeError::decode(format!("failed to run ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(ClipforgeError::decode(format!(
                "video decode failed for '{}' at {source_ms}ms: {}",
                self.path.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let expected = FrameBuffer::byte_len(self.metadata.width, self.metadata.height)?;
        if out.stdout.len() < expected {
            return Err(ClipforgeError::decode(format!(
                "no frame at {source_ms}ms in '{}' (got {} bytes, expected {expected})",
                self.path.display(),
                out.stdout.len()
            )));
        }
        let mut data = out.stdout;
        data.truncate(expected);
        Ok(
            FrameBuffer::from_rgba(self.metadata.width, self.metadata.height, data)?
                .with_timestamp(source_ms),
        )
    }
}

impl VideoProvider for FfmpegVideo {
    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn frame_at(&self, source_ms: i64) -> ClipforgeResult<FrameBuffer> {
        let mut last = self
            .last_frame
            .lock()
            .map_err(|_| ClipforgeError::decode("frame cache lock poisoned"))?;
        if let Some(frame) = last.as_ref().filter(|f| f.timestamp_ms == source_ms) {
            return Ok(frame.clone());
        }
        let frame = self.decode(source_ms)?;
        *last = Some(frame.clone());
        Ok(frame)
    }
}

struct DecodedPcm {
    sample_rate: u32,
    samples: Arc<Vec<f32>>,
}

/// Audio provider that decodes the whole stream once per sample rate and
/// serves segments from memory.
pub struct FfmpegAudio {
    path: PathBuf,
    metadata: AudioMetadata,
    pcm: Mutex<Option<DecodedPcm>>,
}

impl FfmpegAudio {
    pub fn open(path: &Path) -> ClipforgeResult<Self> {
        let info = probe(path)?;
        let metadata = info
            .audio
            .ok_or_else(|| ClipforgeError::invalid_file(path, "no audio stream"))?;
        tracing::debug!(
            path = %path.display(),
            channels = metadata.channels,
            sample_rate = metadata.sample_rate,
            duration_ms = metadata.duration_ms,
            "Opened audio source"
        );
        Ok(Self {
            path: path.to_path_buf(),
            metadata,
            pcm: Mutex::new(None),
        })
    }

    fn pcm(&self, sample_rate: u32) -> ClipforgeResult<Arc<Vec<f32>>> {
        let mut cached = self
            .pcm
            .lock()
            .map_err(|_| ClipforgeError::decode("pcm cache lock poisoned"))?;
        if let Some(pcm) = cached.as_ref().filter(|p| p.sample_rate == sample_rate) {
            return Ok(Arc::clone(&pcm.samples));
        }
        let samples = Arc::new(decode_f32_stereo(&self.path, sample_rate)?);
        *cached = Some(DecodedPcm {
            sample_rate,
            samples: Arc::clone(&samples),
        });
        Ok(samples)
    }
}

impl AudioProvider for FfmpegAudio {
    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> ClipforgeResult<AudioMetadata> {
        if self.metadata.duration_ms <= 0 {
            return Err(ClipforgeError::decode(format!(
                "'{}' does not report an audio duration",
                self.path.display()
            )));
        }
        Ok(self.metadata.clone())
    }

    fn segment(
        &self,
        start_ms: f64,
        end_ms: f64,
        sample_rate: u32,
    ) -> ClipforgeResult<AudioSegment> {
        if sample_rate == 0 {
            return Err(ClipforgeError::invalid_parameter("sample rate must be non-zero"));
        }
        let pcm = self.pcm(sample_rate)?;
        let total_frames = pcm.len() / 2;
        let to_frame = |ms: f64| ((ms.max(0.0) * sample_rate as f64 / 1000.0).round() as usize).min(total_frames);
        let (first, last) = (to_frame(start_ms), to_frame(end_ms));
        if last <= first {
            return Ok(AudioSegment::empty(sample_rate, 2));
        }
        Ok(AudioSegment {
            sample_rate,
            channels: 2,
            samples: pcm[first * 2..last * 2].to_vec(),
        })
    }
}

/// Decode the first audio stream of `path` to interleaved stereo f32.
///
/// A file without an audio stream decodes to empty PCM.
fn decode_f32_stereo(path: &Path, sample_rate: u32) -> ClipforgeResult<Vec<f32>> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ClipforgeError::decode(format!("failed to run ffmpeg: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("does not contain any stream")
        {
            return Ok(Vec::new());
        }
        return Err(ClipforgeError::decode(format!(
            "audio decode failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if out.stdout.len() % 4 != 0 {
        return Err(ClipforgeError::decode(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let samples = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(samples)
}
