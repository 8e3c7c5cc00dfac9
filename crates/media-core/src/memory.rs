//! In-memory media backend with synthetic sources.
//!
//! Sources are registered under a path and never touch the filesystem:
//! solid-color videos and sine/constant tones. Encoding sessions record every
//! frame they receive into [`EncodedOutput`]. Used for dry runs and tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use clipforge_common::{ClipforgeError, ClipforgeResult};

use crate::encode::{AudioFrame, EncoderConfig, EncoderSession, PixelFormat, VideoFrame};
use crate::frame::FrameBuffer;
use crate::metadata::{AudioMetadata, AudioSegment, VideoMetadata};
use crate::provider::{AudioProvider, MediaBackend, VideoProvider};

/// A video source that decodes to one solid color.
#[derive(Debug, Clone)]
pub struct SolidVideo {
    pub width: u32,
    pub height: u32,
    pub duration_ms: i64,
    pub color: [u8; 4],
    /// When set, every `frame_at` call fails with `DecodeFailed`.
    pub fail_decode: bool,
}

impl SolidVideo {
    pub fn new(width: u32, height: u32, duration_ms: i64, color: [u8; 4]) -> Self {
        Self {
            width,
            height,
            duration_ms,
            color,
            fail_decode: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail_decode = true;
        self
    }
}

/// An audio source producing a sine tone, or a constant level at 0 Hz.
#[derive(Debug, Clone)]
pub struct ToneAudio {
    pub duration_ms: i64,
    pub amplitude: f32,
    pub frequency_hz: f32,
    /// When false, `metadata` fails as if the container had no duration.
    pub metadata_available: bool,
}

impl ToneAudio {
    pub fn constant(duration_ms: i64, amplitude: f32) -> Self {
        Self {
            duration_ms,
            amplitude,
            frequency_hz: 0.0,
            metadata_available: true,
        }
    }

    pub fn sine(duration_ms: i64, amplitude: f32, frequency_hz: f32) -> Self {
        Self {
            duration_ms,
            amplitude,
            frequency_hz,
            metadata_available: true,
        }
    }

    pub fn without_metadata(mut self) -> Self {
        self.metadata_available = false;
        self
    }

    fn sample_at(&self, t_secs: f64) -> f32 {
        if self.frequency_hz == 0.0 {
            self.amplitude
        } else {
            self.amplitude * (2.0 * std::f64::consts::PI * self.frequency_hz as f64 * t_secs).sin() as f32
        }
    }
}

#[derive(Debug, Clone)]
enum Source {
    Video(SolidVideo),
    Audio(ToneAudio),
}

/// Everything an in-memory encoding session received.
#[derive(Debug, Default, Clone)]
pub struct EncodedOutput {
    pub config: Option<EncoderConfig>,
    pub video_frames: Vec<VideoFrame>,
    pub audio_frames: Vec<AudioFrame>,
    pub finished: bool,
    pub aborted: bool,
}

impl EncodedOutput {
    /// All audio samples written, concatenated.
    pub fn audio_samples(&self) -> Vec<f32> {
        self.audio_frames
            .iter()
            .flat_map(|f| f.samples.iter().copied())
            .collect()
    }
}

/// Media backend over registered synthetic sources.
pub struct MemoryBackend {
    sources: RwLock<HashMap<PathBuf, Source>>,
    output: Arc<Mutex<EncodedOutput>>,
    frame_requests: Arc<Mutex<Vec<(PathBuf, i64)>>>,
    pixel_format: PixelFormat,
    frame_delay: Option<Duration>,
    fail_encoder: bool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            output: Arc::new(Mutex::new(EncodedOutput::default())),
            frame_requests: Arc::new(Mutex::new(Vec::new())),
            pixel_format: PixelFormat::Yuv420p,
            frame_delay: None,
            fail_encoder: false,
        }
    }

    /// Encoders created by this backend expect `format`.
    pub fn with_pixel_format(mut self, format: PixelFormat) -> Self {
        self.pixel_format = format;
        self
    }

    /// Sleep for `delay` on every video frame written.
    pub fn with_frame_delay(mut self, delay: Duration) -> Self {
        self.frame_delay = Some(delay);
        self
    }

    /// Make `create_encoder` fail.
    pub fn with_failing_encoder(mut self) -> Self {
        self.fail_encoder = true;
        self
    }

    pub fn add_video(&self, path: impl Into<PathBuf>, video: SolidVideo) {
        if let Ok(mut sources) = self.sources.write() {
            sources.insert(path.into(), Source::Video(video));
        }
    }

    pub fn add_audio(&self, path: impl Into<PathBuf>, audio: ToneAudio) {
        if let Ok(mut sources) = self.sources.write() {
            sources.insert(path.into(), Source::Audio(audio));
        }
    }

    pub fn remove_source(&self, path: &Path) {
        if let Ok(mut sources) = self.sources.write() {
            sources.remove(path);
        }
    }

    /// Snapshot of the most recent encoding session's output.
    pub fn output(&self) -> EncodedOutput {
        self.output.lock().map(|o| o.clone()).unwrap_or_default()
    }

    /// Every `(path, source_ms)` pair requested through `frame_at`.
    pub fn frame_requests(&self) -> Vec<(PathBuf, i64)> {
        self.frame_requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn source(&self, path: &Path) -> Option<Source> {
        self.sources.read().ok()?.get(path).cloned()
    }
}

impl MediaBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn open_video(&self, path: &Path) -> ClipforgeResult<Arc<dyn VideoProvider>> {
        match self.source(path) {
            Some(Source::Video(video)) => Ok(Arc::new(MemoryVideo {
                metadata: VideoMetadata {
                    duration_ms: video.duration_ms,
                    width: video.width,
                    height: video.height,
                    frame_rate: 30.0,
                    bitrate: 0,
                    codec: "rawvideo".to_string(),
                    audio_channels: 0,
                    audio_sample_rate: 0,
                },
                path: path.to_path_buf(),
                source: video,
                requests: Arc::clone(&self.frame_requests),
            })),
            Some(Source::Audio(_)) => Err(ClipforgeError::invalid_file(path, "no video stream")),
            None => Err(ClipforgeError::invalid_file(path, "no such source")),
        }
    }

    fn open_audio(&self, path: &Path) -> ClipforgeResult<Arc<dyn AudioProvider>> {
        match self.source(path) {
            Some(Source::Audio(audio)) => Ok(Arc::new(MemoryAudio {
                path: path.to_path_buf(),
                source: audio,
            })),
            Some(Source::Video(_)) => Err(ClipforgeError::invalid_file(path, "no audio stream")),
            None => Err(ClipforgeError::invalid_file(path, "no such source")),
        }
    }

    fn create_encoder(&self, config: &EncoderConfig) -> ClipforgeResult<Box<dyn EncoderSession>> {
        config.validate()?;
        if self.fail_encoder {
            return Err(ClipforgeError::encode("memory encoder disabled"));
        }
        if let Ok(mut out) = self.output.lock() {
            *out = EncodedOutput {
                config: Some(config.clone()),
                ..EncodedOutput::default()
            };
        }
        Ok(Box::new(MemoryEncoder {
            output: Arc::clone(&self.output),
            pixel_format: self.pixel_format,
            audio_frame_size: config.audio.as_ref().map(|a| a.frame_size),
            frame_delay: self.frame_delay,
        }))
    }

    fn extract_audio(&self, video_path: &Path, output_path: &Path) -> ClipforgeResult<()> {
        let audio = self.open_audio(video_path)?;
        let duration = audio.metadata()?.duration_ms;
        let segment = audio.segment(0.0, duration as f64, crate::MIX_SAMPLE_RATE)?;
        let bytes: Vec<u8> = segment
            .samples
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        std::fs::write(output_path, bytes)?;
        Ok(())
    }
}

struct MemoryVideo {
    path: PathBuf,
    metadata: VideoMetadata,
    source: SolidVideo,
    requests: Arc<Mutex<Vec<(PathBuf, i64)>>>,
}

impl VideoProvider for MemoryVideo {
    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn frame_at(&self, source_ms: i64) -> ClipforgeResult<FrameBuffer> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((self.path.clone(), source_ms));
        }
        if self.source.fail_decode {
            return Err(ClipforgeError::decode(format!(
                "synthetic decode failure at {source_ms}ms"
            )));
        }
        Ok(
            FrameBuffer::filled(self.source.width, self.source.height, self.source.color)?
                .with_timestamp(source_ms),
        )
    }
}

struct MemoryAudio {
    path: PathBuf,
    source: ToneAudio,
}

impl AudioProvider for MemoryAudio {
    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> ClipforgeResult<AudioMetadata> {
        if !self.source.metadata_available {
            return Err(ClipforgeError::decode("duration unavailable"));
        }
        Ok(AudioMetadata {
            duration_ms: self.source.duration_ms,
            channels: 2,
            sample_rate: crate::MIX_SAMPLE_RATE,
        })
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
        let start = start_ms.max(0.0);
        let end = end_ms.min(self.source.duration_ms as f64);
        if end <= start {
            return Ok(AudioSegment::empty(sample_rate, 2));
        }
        let first = (start * sample_rate as f64 / 1000.0).round() as u64;
        let frames = ((end - start) * sample_rate as f64 / 1000.0).round() as u64;
        let mut samples = Vec::with_capacity(frames as usize * 2);
        for i in first..first + frames {
            let v = self.source.sample_at(i as f64 / sample_rate as f64);
            samples.push(v);
            samples.push(v);
        }
        Ok(AudioSegment {
            sample_rate,
            channels: 2,
            samples,
        })
    }
}

struct MemoryEncoder {
    output: Arc<Mutex<EncodedOutput>>,
    pixel_format: PixelFormat,
    audio_frame_size: Option<usize>,
    frame_delay: Option<Duration>,
}

impl MemoryEncoder {
    fn with_output<T>(&self, f: impl FnOnce(&mut EncodedOutput) -> T) -> ClipforgeResult<T> {
        let mut out = self
            .output
            .lock()
            .map_err(|_| ClipforgeError::encode("encoder output lock poisoned"))?;
        Ok(f(&mut out))
    }
}

impl EncoderSession for MemoryEncoder {
    fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    fn audio_frame_size(&self) -> Option<usize> {
        self.audio_frame_size
    }

    fn write_video(&mut self, frame: &VideoFrame) -> ClipforgeResult<()> {
        if frame.format != self.pixel_format {
            return Err(ClipforgeError::encode(format!(
                "expected {:?} frame, got {:?}",
                self.pixel_format, frame.format
            )));
        }
        if frame.data.len() != frame.format.frame_len(frame.width, frame.height) {
            return Err(ClipforgeError::encode("video frame size mismatch"));
        }
        if let Some(delay) = self.frame_delay {
            std::thread::sleep(delay);
        }
        self.with_output(|out| out.video_frames.push(frame.clone()))
    }

    fn write_audio(&mut self, frame: &AudioFrame) -> ClipforgeResult<()> {
        if self.audio_frame_size.is_none() {
            return Err(ClipforgeError::encode("session has no audio stream"));
        }
        self.with_output(|out| out.audio_frames.push(frame.clone()))
    }

    fn finish(self: Box<Self>) -> ClipforgeResult<()> {
        self.with_output(|out| out.finished = true)
    }

    fn abort(self: Box<Self>) {
        let _ = self.with_output(|out| out.aborted = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{classify, generate_waveform, probe_metadata, MediaKind};

    #[test]
    fn test_classify_video_then_audio() {
        let backend = MemoryBackend::new();
        backend.add_video("a.mp4", SolidVideo::new(8, 8, 1000, [255, 0, 0, 255]));
        backend.add_audio("b.wav", ToneAudio::constant(2000, 0.5));

        assert!(matches!(classify(&backend, Path::new("a.mp4")), MediaKind::Video(_)));
        assert!(matches!(classify(&backend, Path::new("b.wav")), MediaKind::Audio(_)));
        assert!(matches!(classify(&backend, Path::new("c.txt")), MediaKind::Unrecognized));
    }

    #[test]
    fn test_solid_frames() {
        let backend = MemoryBackend::new();
        backend.add_video("a.mp4", SolidVideo::new(4, 2, 1000, [1, 2, 3, 255]));
        let video = backend.open_video(Path::new("a.mp4")).unwrap();
        let frame = video.frame_at(250).unwrap();
        assert_eq!((frame.width, frame.height), (4, 2));
        assert_eq!(frame.pixel(3, 1), Some([1, 2, 3, 255]));
        assert_eq!(frame.timestamp_ms, 250);
        assert_eq!(backend.frame_requests(), vec![(PathBuf::from("a.mp4"), 250)]);
    }

    #[test]
    fn test_tone_segment_length_and_bounds() {
        let backend = MemoryBackend::new();
        backend.add_audio("t.wav", ToneAudio::constant(1000, 0.25));
        let audio = backend.open_audio(Path::new("t.wav")).unwrap();

        let seg = audio.segment(0.0, 10.0, 48_000).unwrap();
        assert_eq!(seg.frames(), 480);
        assert!(seg.samples.iter().all(|&s| (s - 0.25).abs() < 1e-6));

        let past_end = audio.segment(990.0, 1500.0, 48_000).unwrap();
        assert_eq!(past_end.frames(), 480);
    }

    #[test]
    fn test_probe_audio_only_metadata() {
        let backend = MemoryBackend::new();
        backend.add_audio("t.wav", ToneAudio::constant(1500, 0.25));
        let meta = probe_metadata(&backend, Path::new("t.wav")).unwrap();
        assert_eq!(meta.duration_ms, 1500);
        assert_eq!(meta.width, 0);
        assert_eq!(meta.audio_channels, 2);
    }

    #[test]
    fn test_waveform_for_video_without_audio_is_empty() {
        let backend = MemoryBackend::new();
        backend.add_video("a.mp4", SolidVideo::new(4, 4, 1000, [0, 0, 0, 255]));
        let wf = generate_waveform(&backend, Path::new("a.mp4"), 32).unwrap();
        assert!(wf.is_empty());
    }

    #[test]
    fn test_waveform_of_tone() {
        let backend = MemoryBackend::new();
        backend.add_audio("t.wav", ToneAudio::constant(1000, 0.5));
        let wf = generate_waveform(&backend, Path::new("t.wav"), 10).unwrap();
        assert_eq!(wf.len(), 10);
        assert!(wf.bins.iter().all(|&b| (b - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_waveform_of_missing_file_is_error() {
        let backend = MemoryBackend::new();
        assert!(generate_waveform(&backend, Path::new("nope.wav"), 10).is_err());
    }
}
