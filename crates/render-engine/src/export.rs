//! Export orchestration: render every frame, mix audio, encode.
//!
//! [`Exporter::export`] is a blocking call. Hosts run it on a worker thread
//! and poll [`Exporter::progress`] / [`Exporter::status`] from elsewhere;
//! [`Exporter::cancel`] is observed once per video frame and once per audio
//! frame.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clipforge_common::{ClipforgeError, ClipforgeResult, FrameClock, SampleClock};
use clipforge_media_core::convert::{convert_frame, placeholder_frame};
use clipforge_media_core::{
    AudioEncoderConfig, AudioFrame, AudioProvider, EncoderConfig, EncoderSession, MediaBackend,
    VideoFrame, MIX_CHANNELS,
};
use clipforge_project_model::{
    ClipEntry, ClipType, ExportSettings, RenderSettings, Timeline, MAX_SUPERSAMPLE,
};
use serde::{Deserialize, Serialize};

use crate::compositor::Compositor;
use crate::mix::{clamp_mix, mix_segment, CLIP_ATTENUATION};

/// Supersample factor used for exported frames.
pub const EXPORT_SUPERSAMPLE: u32 = 2;

/// Share of the progress bar covered by the video loop when audio follows.
const VIDEO_PROGRESS_SHARE: f32 = 0.8;

const EXPORT_GOP_SIZE: u32 = 12;

/// Shared cancellation flag for one exporter.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ExportStage {
    Idle = 0,
    Preparing = 1,
    Video = 2,
    Audio = 3,
    Finalizing = 4,
    Complete = 5,
    Cancelled = 6,
    Failed = 7,
}

impl ExportStage {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Preparing,
            2 => Self::Video,
            3 => Self::Audio,
            4 => Self::Finalizing,
            5 => Self::Complete,
            6 => Self::Cancelled,
            7 => Self::Failed,
            _ => Self::Idle,
        }
    }
}

/// Point-in-time view of a running or finished export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProgress {
    /// Fraction complete in [0, 1].
    pub progress: f32,
    pub frames_rendered: u64,
    pub total_frames: u64,
    pub stage: ExportStage,
}

/// Runs exports against one media backend, one at a time.
pub struct Exporter {
    backend: Arc<dyn MediaBackend>,
    supersample: u32,
    exporting: AtomicBool,
    progress: AtomicU32,
    frames_rendered: AtomicU64,
    total_frames: AtomicU64,
    stage: AtomicU8,
    cancel: CancellationToken,
}

impl Exporter {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            supersample: EXPORT_SUPERSAMPLE,
            exporting: AtomicBool::new(false),
            progress: AtomicU32::new(0f32.to_bits()),
            frames_rendered: AtomicU64::new(0),
            total_frames: AtomicU64::new(0),
            stage: AtomicU8::new(ExportStage::Idle as u8),
            cancel: CancellationToken::new(),
        }
    }

    /// Override the text supersample factor used for exported frames,
    /// clamped to `1..=MAX_SUPERSAMPLE`.
    pub fn with_supersample(mut self, supersample: u32) -> Self {
        self.supersample = supersample.clamp(1, MAX_SUPERSAMPLE);
        self
    }

    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::SeqCst))
    }

    pub fn status(&self) -> ExportProgress {
        ExportProgress {
            progress: self.progress(),
            frames_rendered: self.frames_rendered.load(Ordering::SeqCst),
            total_frames: self.total_frames.load(Ordering::SeqCst),
            stage: ExportStage::from_u8(self.stage.load(Ordering::SeqCst)),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::SeqCst)
    }

    /// Request cancellation of the export in flight.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Render and encode the whole timeline. Blocks until done.
    pub fn export(&self, timeline: &Timeline, settings: &ExportSettings) -> ClipforgeResult<()> {
        if self
            .exporting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ClipforgeError::invalid_parameter(
                "an export is already running on this exporter",
            ));
        }
        let _in_flight = InFlight(&self.exporting);

        self.cancel.reset();
        self.set_progress(0.0);
        self.frames_rendered.store(0, Ordering::SeqCst);
        self.total_frames.store(0, Ordering::SeqCst);
        self.set_stage(ExportStage::Preparing);

        let started = Instant::now();
        let result = self.run(timeline, settings);
        match &result {
            Ok(()) => {
                self.set_progress(1.0);
                self.set_stage(ExportStage::Complete);
                tracing::info!(
                    output = %settings.output_path.display(),
                    frames = self.frames_rendered.load(Ordering::SeqCst),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Export finished"
                );
            }
            Err(ClipforgeError::Cancelled) => {
                self.set_stage(ExportStage::Cancelled);
                tracing::info!(progress = self.progress(), "Export cancelled");
            }
            Err(e) => {
                self.set_stage(ExportStage::Failed);
                tracing::error!(error = %e, "Export failed");
            }
        }
        result
    }

    fn run(&self, timeline: &Timeline, settings: &ExportSettings) -> ClipforgeResult<()> {
        settings.validate()?;
        let total_ms = timeline.total_duration_ms();
        if total_ms <= 0 {
            return Err(ClipforgeError::invalid_parameter("timeline is empty"));
        }
        let frame_clock = FrameClock::new(settings.fps)?;
        let total_frames = frame_clock.frame_count(total_ms);
        self.total_frames.store(total_frames, Ordering::SeqCst);

        tracing::info!(
            output = %settings.output_path.display(),
            width = settings.width,
            height = settings.height,
            fps = settings.fps,
            codec = %settings.codec,
            duration_ms = total_ms,
            total_frames,
            backend = self.backend.name(),
            "Starting export"
        );

        let config = encoder_config(settings);
        let mut session = SessionGuard(Some(self.backend.create_encoder(&config)?));
        let has_audio = session.get()?.audio_frame_size().is_some();
        let video_share = if has_audio { VIDEO_PROGRESS_SHARE } else { 1.0 };

        self.set_stage(ExportStage::Video);
        self.encode_video(timeline, settings, &frame_clock, total_ms, video_share, &mut session)?;

        if has_audio {
            self.set_progress(video_share);
            self.set_stage(ExportStage::Audio);
            self.encode_audio(timeline, settings, total_ms, video_share, &mut session)?;
        } else {
            tracing::warn!("Encoder has no audio stream, exporting video only");
        }

        self.set_stage(ExportStage::Finalizing);
        session.finish()
    }

    fn encode_video(
        &self,
        timeline: &Timeline,
        settings: &ExportSettings,
        clock: &FrameClock,
        total_ms: i64,
        share: f32,
        session: &mut SessionGuard,
    ) -> ClipforgeResult<()> {
        let render = RenderSettings {
            width: settings.width,
            height: settings.height,
            supersample: self.supersample,
            ..RenderSettings::default()
        };
        let mut compositor = Compositor::new();
        let session = session.get()?;
        let format = session.pixel_format();

        for (index, ts) in clock.timestamps(total_ms).enumerate() {
            if self.cancel.is_cancelled() {
                return Err(ClipforgeError::Cancelled);
            }

            let data = match compositor.render_frame_at(timeline, ts, Some(&render)) {
                Ok(frame) => convert_frame(&frame, format)?,
                Err(e) => {
                    tracing::warn!(timestamp_ms = ts, error = %e, "Using placeholder frame");
                    placeholder_frame(format, settings.width, settings.height)
                }
            };
            session.write_video(&VideoFrame {
                format,
                width: settings.width,
                height: settings.height,
                data,
                index: index as u64,
                pts_ms: ts,
            })?;

            self.frames_rendered.store(index as u64 + 1, Ordering::SeqCst);
            self.set_progress(share * ts as f32 / total_ms as f32);
            tracing::trace!(frame = index, timestamp_ms = ts, "Frame encoded");
        }
        Ok(())
    }

    fn encode_audio(
        &self,
        timeline: &Timeline,
        settings: &ExportSettings,
        total_ms: i64,
        video_share: f32,
        session: &mut SessionGuard,
    ) -> ClipforgeResult<()> {
        let session = session.get()?;
        let frame_size = session
            .audio_frame_size()
            .unwrap_or(AudioEncoderConfig::default().frame_size);
        let rate = settings.audio_sample_rate;
        let clock = SampleClock::new(rate, frame_size)?;
        let frame_ms = clock.frame_duration_ms();
        let frame_count = clock.frame_count(total_ms);
        let channels = MIX_CHANNELS as usize;

        let audio_clips: Vec<&ClipEntry> = timeline
            .clip_entries()
            .filter(|e| e.clip.kind == ClipType::AudioOnly)
            .collect();
        let mut providers = ProviderCache::new(Arc::clone(&self.backend));

        for n in 0..frame_count {
            if self.cancel.is_cancelled() {
                return Err(ClipforgeError::Cancelled);
            }

            let t = clock.frame_start_ms(n);
            let mut mix = vec![0.0f32; frame_size * channels];
            for entry in &audio_clips {
                let clip = &entry.clip;
                if clip.muted || t < clip.start_ms as f64 || t >= clip.end_ms as f64 {
                    continue;
                }
                let src = clip.source_time_precise_ms(t);
                let trim_end = clip.trim_end_ms as f64;
                if src < clip.trim_start_ms as f64 || src >= trim_end {
                    continue;
                }
                let Some(provider) = providers.resolve(entry) else {
                    continue;
                };
                let end = (src + frame_ms * clip.speed).min(trim_end);
                match provider.segment(src, end, rate) {
                    Ok(segment) => {
                        mix_segment(&mut mix, &segment, clip.speed, CLIP_ATTENUATION * clip.volume)
                    }
                    Err(e) => {
                        tracing::warn!(clip_id = %clip.id, error = %e, "Audio segment unavailable");
                    }
                }
            }
            clamp_mix(&mut mix);

            session.write_audio(&AudioFrame {
                sample_rate: rate,
                channels: MIX_CHANNELS,
                samples: mix,
                pts_samples: n * frame_size as u64,
            })?;

            let audio_progress = (n + 1) as f32 / frame_count as f32;
            self.set_progress(video_share + (1.0 - video_share) * audio_progress.min(0.999));
        }
        Ok(())
    }

    fn set_progress(&self, value: f32) {
        self.progress
            .store(value.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
    }

    fn set_stage(&self, stage: ExportStage) {
        self.stage.store(stage as u8, Ordering::SeqCst);
    }
}

fn encoder_config(settings: &ExportSettings) -> EncoderConfig {
    EncoderConfig {
        output_path: settings.output_path.clone(),
        width: settings.width,
        height: settings.height,
        fps: settings.fps,
        bitrate: settings.bitrate,
        codec: settings.codec.clone(),
        format: settings.format.clone(),
        gop_size: EXPORT_GOP_SIZE,
        audio: Some(AudioEncoderConfig {
            sample_rate: settings.audio_sample_rate,
            channels: MIX_CHANNELS,
            bitrate: settings.audio_bitrate,
            ..AudioEncoderConfig::default()
        }),
    }
}

/// Clears the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the encoder session; aborts it unless it was finished.
struct SessionGuard(Option<Box<dyn EncoderSession>>);

impl SessionGuard {
    fn get(&mut self) -> ClipforgeResult<&mut (dyn EncoderSession + 'static)> {
        self.0
            .as_deref_mut()
            .ok_or_else(|| ClipforgeError::export("encoder session already closed"))
    }

    fn finish(&mut self) -> ClipforgeResult<()> {
        match self.0.take() {
            Some(session) => session.finish(),
            None => Err(ClipforgeError::export("encoder session already closed")),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(session) = self.0.take() {
            tracing::debug!("Aborting unfinished encoder session");
            session.abort();
        }
    }
}

/// Audio providers for clips that do not carry one, opened once per path.
struct ProviderCache {
    backend: Arc<dyn MediaBackend>,
    by_path: HashMap<PathBuf, Option<Arc<dyn AudioProvider>>>,
}

impl ProviderCache {
    fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            by_path: HashMap::new(),
        }
    }

    fn resolve(&mut self, entry: &ClipEntry) -> Option<Arc<dyn AudioProvider>> {
        if let Some(provider) = entry.media.audio() {
            return Some(Arc::clone(provider));
        }
        let backend = &self.backend;
        self.by_path
            .entry(entry.clip.path.clone())
            .or_insert_with(|| match backend.open_audio(&entry.clip.path) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    tracing::warn!(
                        path = %entry.clip.path.display(),
                        error = %e,
                        "Audio source unavailable for export"
                    );
                    None
                }
            })
            .clone()
    }
}
