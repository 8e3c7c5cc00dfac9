//! Frame compositor: clips, then text, onto one RGBA canvas.
//!
//! Video clips active at the timestamp are drawn back to front in ascending
//! track order. Each source frame is scaled relative to its own native size,
//! centered, and blended with straight alpha. Active text layers go on top.

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_media_core::FrameBuffer;
use clipforge_project_model::{Clip, ClipEntry, ClipType, RenderSettings, TextLayer, Timeline};

use crate::blend::{blend_at, scale_bilinear};
use crate::text::TextRenderer;

/// Upper bound on a scaled clip, as a multiple of the canvas size.
pub const MAX_CANVAS_MULTIPLE: u32 = 5;

const CANVAS_CLEAR: [u8; 4] = [0, 0, 0, 255];

#[derive(Debug, Default)]
pub struct Compositor {
    text: TextRenderer,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_renderer(&self) -> &TextRenderer {
        &self.text
    }

    /// Clear cached glyphs.
    pub fn reset(&mut self) {
        self.text.reset();
    }

    /// Render the timeline at `timestamp_ms`.
    ///
    /// Fails with `InvalidParameter` when no video clip is active and with
    /// `DecodeFailed` when none of the active clips produced a frame. A clip
    /// whose provider fails is skipped.
    pub fn render_frame_at(
        &mut self,
        timeline: &Timeline,
        timestamp_ms: i64,
        settings: Option<&RenderSettings>,
    ) -> ClipforgeResult<FrameBuffer> {
        let default_settings;
        let settings = match settings {
            Some(s) => s,
            None => {
                default_settings = RenderSettings::default();
                &default_settings
            }
        };
        settings.validate()?;
        if settings.use_gpu {
            tracing::debug!("GPU compositing requested, using CPU path");
        }

        let active = active_video_clips(timeline, timestamp_ms);
        if active.is_empty() {
            return Err(ClipforgeError::invalid_parameter(format!(
                "no video clip active at {timestamp_ms}ms"
            )));
        }

        let mut canvas = FrameBuffer::filled(settings.width, settings.height, CANVAS_CLEAR)?;
        let mut contributed = 0usize;
        for entry in active {
            match self.draw_clip(&mut canvas, entry, timestamp_ms) {
                Ok(()) => contributed += 1,
                Err(e) => {
                    tracing::warn!(
                        clip_id = %entry.clip.id,
                        timestamp_ms,
                        error = %e,
                        "Skipping clip in composition"
                    );
                }
            }
        }
        if contributed == 0 {
            return Err(ClipforgeError::decode(format!(
                "no clip produced a frame at {timestamp_ms}ms"
            )));
        }

        let supersample = settings.supersample.max(1);
        for layer in active_text_layers(timeline, timestamp_ms) {
            self.text.render(layer, &mut canvas, supersample)?;
        }

        Ok(canvas.with_timestamp(timestamp_ms))
    }

    fn draw_clip(
        &self,
        canvas: &mut FrameBuffer,
        entry: &ClipEntry,
        timestamp_ms: i64,
    ) -> ClipforgeResult<()> {
        let clip = &entry.clip;
        let provider = entry.media.video().ok_or_else(|| {
            ClipforgeError::not_initialized(format!("clip {} has no video provider", clip.id))
        })?;
        let source_ms = clip.source_time_ms(timestamp_ms);
        let frame = provider.frame_at(source_ms)?;

        let (w, h) = scaled_size(&frame, clip, canvas);
        let placed = if (w, h) == (frame.width, frame.height) {
            frame
        } else {
            scale_bilinear(&frame, w, h)?
        };
        let x = (canvas.width as i64 - w as i64) / 2;
        let y = (canvas.height as i64 - h as i64) / 2;
        blend_at(canvas, &placed, x, y, 1.0);
        Ok(())
    }
}

/// Native size times scale, truncated, within `[1, 5 * canvas]` per axis.
pub fn scaled_size(frame: &FrameBuffer, clip: &Clip, canvas: &FrameBuffer) -> (u32, u32) {
    let axis = |native: u32, scale: f32, limit: u32| -> u32 {
        let max = limit.saturating_mul(MAX_CANVAS_MULTIPLE).max(1);
        ((native as f64 * scale as f64).floor() as u64).clamp(1, max as u64) as u32
    };
    (
        axis(frame.width, clip.scale_x, canvas.width),
        axis(frame.height, clip.scale_y, canvas.height),
    )
}

/// Video clips covering `timestamp_ms`, back to front.
pub fn active_video_clips(timeline: &Timeline, timestamp_ms: i64) -> Vec<&ClipEntry> {
    let mut active: Vec<&ClipEntry> = timeline
        .clip_entries()
        .filter(|e| e.clip.kind == ClipType::Video && e.clip.is_active_at(timestamp_ms))
        .collect();
    active.sort_by_key(|e| (e.clip.track, e.clip.id));
    active
}

/// Text layers covering `timestamp_ms`, by owning track display order and
/// then layer id. Layers on tracks that do not exist draw last.
pub fn active_text_layers(timeline: &Timeline, timestamp_ms: i64) -> Vec<&TextLayer> {
    let mut layers: Vec<&TextLayer> = timeline
        .text_layers()
        .filter(|l| l.is_active_at(timestamp_ms))
        .collect();
    layers.sort_by_key(|l| {
        let rank = timeline
            .track(l.track)
            .map(|t| t.display_order)
            .unwrap_or(u32::MAX);
        (rank, l.id)
    });
    layers
}
