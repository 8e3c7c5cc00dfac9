//! Text overlay rendering with the built-in bitmap font.
//!
//! Layout is resolution independent: positions and font sizes are designed
//! against the 1920x1080 reference frame and scaled uniformly to the target.
//! Glyphs are rasterized at `base_scale * supersample` into a coverage buffer
//! and box-filtered back down to device pixels.

use std::collections::HashMap;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_media_core::FrameBuffer;
use clipforge_project_model::{TextLayer, REFERENCE_HEIGHT, REFERENCE_WIDTH};

use crate::blend::{blend_pixel, fill_rect};
use crate::font::{self, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};

pub const MIN_FONT_SIZE: u32 = 12;
pub const MAX_FONT_SIZE: u32 = 400;

/// Padding around the text inside a background box.
const BACKGROUND_PAD_X: i64 = 8;
const BACKGROUND_PAD_Y: i64 = 4;

const UNDERLINE_GAP: i64 = 2;
const UNDERLINE_THICKNESS: i64 = 2;

/// Cache key for one rasterized glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub ch: char,
    pub font_size: u32,
    pub supersample: u32,
}

/// Glyph coverage (0 or 255) at supersampled resolution.
#[derive(Debug, Clone)]
pub struct Glyph {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

/// Rasterized glyphs keyed by (character, font size, supersample factor).
#[derive(Debug, Default)]
pub struct GlyphCache {
    glyphs: HashMap<GlyphKey, Glyph>,
    hits: u64,
    misses: u64,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or rasterize the glyph for `ch`; `None` if the font lacks it.
    pub fn get(&mut self, ch: char, font_size: u32, supersample: u32) -> Option<&Glyph> {
        let key = GlyphKey {
            ch: font::fold(ch),
            font_size,
            supersample,
        };
        let rows = font::glyph(key.ch)?;
        if self.glyphs.contains_key(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let scale = base_scale(font_size) * supersample.max(1);
            self.glyphs.insert(key, rasterize(rows, scale));
        }
        self.glyphs.get(&key)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop every glyph and reset the counters.
    pub fn clear(&mut self) {
        self.glyphs.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

fn rasterize(rows: &[u8; 7], scale: u32) -> Glyph {
    let width = GLYPH_WIDTH * scale;
    let height = GLYPH_HEIGHT * scale;
    let mut coverage = vec![0u8; (width * height) as usize];
    for row in 0..GLYPH_HEIGHT {
        for col in 0..GLYPH_WIDTH {
            if !font::is_set(rows, col, row) {
                continue;
            }
            for sy in 0..scale {
                let y = row * scale + sy;
                let start = (y * width + col * scale) as usize;
                coverage[start..start + scale as usize].fill(255);
            }
        }
    }
    Glyph {
        width,
        height,
        coverage,
    }
}

/// Integer pixel scale of a 5x7 cell at `font_size`.
pub fn base_scale(font_size: u32) -> u32 {
    (font_size / GLYPH_HEIGHT).max(1)
}

/// Width in pixels of `text` at `font_size`, one cell per character.
pub fn measure(text: &str, font_size: u32) -> u32 {
    text.chars().count() as u32 * GLYPH_ADVANCE * base_scale(font_size)
}

/// Device-space placement of one text layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextLayout {
    /// Font size after resolution scaling and clamping.
    pub font_size: u32,
    pub base_scale: u32,
    pub text_width: i64,
    pub text_height: i64,
    pub center_x: i64,
    pub center_y: i64,
    /// Top-left corner of the text box.
    pub origin_x: i64,
    pub origin_y: i64,
}

impl TextLayout {
    pub fn compute(layer: &TextLayer, frame_width: u32, frame_height: u32) -> Self {
        let scale_x = frame_width as f32 / REFERENCE_WIDTH as f32;
        let scale_y = frame_height as f32 / REFERENCE_HEIGHT as f32;
        let uniform = scale_x.min(scale_y);

        let font_size = ((layer.font_size as f32 * uniform) as u32).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        let base_scale = base_scale(font_size);
        let text_width = measure(&layer.text, font_size) as i64;
        let text_height = (GLYPH_HEIGHT * base_scale) as i64;

        let center_x = (layer.x * REFERENCE_WIDTH as f32 * scale_x) as i64;
        let center_y = (layer.y * REFERENCE_HEIGHT as f32 * scale_y) as i64;
        Self {
            font_size,
            base_scale,
            text_width,
            text_height,
            center_x,
            center_y,
            origin_x: center_x - text_width / 2,
            origin_y: center_y - text_height / 2,
        }
    }
}

/// Draws text layers onto frames. Owns its glyph cache.
#[derive(Debug, Default)]
pub struct TextRenderer {
    cache: GlyphCache,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &GlyphCache {
        &self.cache
    }

    /// Forget every cached glyph.
    pub fn reset(&mut self) {
        self.cache.clear();
    }

    /// Draw `layer` onto `frame`, supersampling glyphs by `supersample`.
    pub fn render(
        &mut self,
        layer: &TextLayer,
        frame: &mut FrameBuffer,
        supersample: u32,
    ) -> ClipforgeResult<()> {
        if layer.text.is_empty() {
            return Ok(());
        }
        let ss = supersample.max(1);
        let layout = TextLayout::compute(layer, frame.width, frame.height);

        if let Some(bg) = layer.background {
            fill_rect(
                frame,
                layout.center_x - layout.text_width / 2 - BACKGROUND_PAD_X,
                layout.center_y - layout.text_height / 2 - BACKGROUND_PAD_Y,
                (layout.text_width as f32 * layer.scale) as i64 + 2 * BACKGROUND_PAD_X,
                (layout.text_height as f32 * layer.scale) as i64 + 2 * BACKGROUND_PAD_Y,
                bg.to_array(),
            );
        }

        let hi_w = (layout.text_width as usize) * ss as usize;
        let hi_h = (layout.text_height as usize) * ss as usize;
        if hi_w == 0 || hi_h == 0 {
            return Ok(());
        }
        let coverage = self.rasterize_line(&layer.text, layout.font_size, ss, hi_w, hi_h)?;

        let [r, g, b, a] = layer.color.to_array();
        let samples = ss * ss;
        for ty in 0..layout.text_height {
            let fy = layout.origin_y + ty;
            if fy < 0 || fy >= frame.height as i64 {
                continue;
            }
            for tx in 0..layout.text_width {
                let fx = layout.origin_x + tx;
                if fx < 0 || fx >= frame.width as i64 {
                    continue;
                }
                let mut acc = 0u32;
                for sy in 0..ss as usize {
                    let row = (ty as usize * ss as usize + sy) * hi_w;
                    for sx in 0..ss as usize {
                        acc += coverage[row + tx as usize * ss as usize + sx] as u32;
                    }
                }
                let cov = acc / samples;
                if cov == 0 {
                    continue;
                }
                let alpha = (cov * a as u32 / 255) as u8;
                let (px, py) = (fx as u32, fy as u32);
                if let Some(bottom) = frame.pixel(px, py) {
                    frame.set_pixel(px, py, blend_pixel(bottom, [r, g, b, alpha], 1.0));
                }
            }
        }

        if layer.underline {
            fill_rect(
                frame,
                layout.origin_x,
                layout.origin_y + (layout.text_height as f32 * layer.scale) as i64 + UNDERLINE_GAP,
                (layout.text_width as f32 * layer.scale) as i64,
                UNDERLINE_THICKNESS,
                layer.color.to_array(),
            );
        }
        Ok(())
    }

    /// Single-line coverage buffer; `\n` returns the cursor to the left edge.
    fn rasterize_line(
        &mut self,
        text: &str,
        font_size: u32,
        ss: u32,
        hi_w: usize,
        hi_h: usize,
    ) -> ClipforgeResult<Vec<u8>> {
        let mut coverage = Vec::new();
        coverage.try_reserve_exact(hi_w * hi_h).map_err(|_| {
            ClipforgeError::out_of_memory(format!("text buffer {hi_w}x{hi_h}"))
        })?;
        coverage.resize(hi_w * hi_h, 0u8);

        let missing_advance = (GLYPH_ADVANCE * base_scale(font_size) * ss) as usize;
        let mut cursor = 0usize;
        for ch in text.chars() {
            if ch == '\n' {
                cursor = 0;
                continue;
            }
            let Some(glyph) = self.cache.get(ch, font_size, ss) else {
                cursor += missing_advance;
                continue;
            };
            let gw = glyph.width as usize;
            let visible = gw.min(hi_w.saturating_sub(cursor));
            for gy in 0..(glyph.height as usize).min(hi_h) {
                let src = &glyph.coverage[gy * gw..gy * gw + visible];
                let dst = &mut coverage[gy * hi_w + cursor..gy * hi_w + cursor + visible];
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = (*d).max(*s);
                }
            }
            cursor += gw + ss as usize;
        }
        Ok(coverage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipforge_project_model::{Rgba, TrackId};

    fn layer(text: &str) -> TextLayer {
        TextLayer::new(TrackId(1), text, 0, 1_000)
    }

    #[test]
    fn test_measure() {
        assert_eq!(measure("HELLO", 48), 5 * 6 * 6);
        assert_eq!(measure("", 48), 0);
        assert_eq!(base_scale(3), 1);
    }

    #[test]
    fn test_layout_at_reference_size() {
        let layout = TextLayout::compute(&layer("HELLO"), 1920, 1080);
        assert_eq!(layout.font_size, 48);
        assert_eq!(layout.base_scale, 6);
        assert_eq!(layout.text_width, 180);
        assert_eq!(layout.text_height, 42);
        assert_eq!((layout.center_x, layout.center_y), (960, 540));
        assert_eq!((layout.origin_x, layout.origin_y), (870, 519));
    }

    #[test]
    fn test_font_size_clamped() {
        let layout = TextLayout::compute(&layer("A"), 192, 108);
        assert_eq!(layout.font_size, MIN_FONT_SIZE);

        let mut big = layer("A");
        big.font_size = 10_000;
        assert_eq!(TextLayout::compute(&big, 1920, 1080).font_size, MAX_FONT_SIZE);
    }

    #[test]
    fn test_renders_glyph_pixels() {
        let mut frame = FrameBuffer::filled(1920, 1080, [0, 0, 0, 255]).unwrap();
        let mut renderer = TextRenderer::new();
        renderer.render(&layer("HELLO"), &mut frame, 1).unwrap();

        // Top-left cell of 'H' is lit, the gap column after it is not.
        assert_eq!(frame.pixel(870, 519), Some([255, 255, 255, 255]));
        assert_eq!(frame.pixel(870 + 5 * 6, 519), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_supersampled_matches_plain_for_integer_glyphs() {
        let mut plain = FrameBuffer::filled(640, 360, [0, 0, 0, 255]).unwrap();
        let mut ss = plain.clone();
        let mut renderer = TextRenderer::new();
        renderer.render(&layer("AB"), &mut plain, 1).unwrap();
        renderer.render(&layer("AB"), &mut ss, 3).unwrap();
        assert_eq!(plain.data, ss.data);
    }

    #[test]
    fn test_repeated_glyphs_rasterized_once() {
        let mut frame = FrameBuffer::filled(640, 360, [0, 0, 0, 255]).unwrap();
        let mut renderer = TextRenderer::new();
        renderer.render(&layer("ABABA~"), &mut frame, 2).unwrap();

        assert_eq!(renderer.cache().misses(), 2);
        assert_eq!(renderer.cache().hits(), 3);
        assert_eq!(renderer.cache().len(), 2);

        renderer.reset();
        assert!(renderer.cache().is_empty());
        assert_eq!(renderer.cache().misses(), 0);
    }

    #[test]
    fn test_lowercase_shares_uppercase_glyph() {
        let mut cache = GlyphCache::new();
        cache.get('a', 48, 1);
        cache.get('A', 48, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_background_and_underline() {
        let mut frame = FrameBuffer::filled(1920, 1080, [0, 0, 0, 255]).unwrap();
        let mut l = layer("HI");
        l.background = Some(Rgba::new(0, 0, 255, 255));
        l.underline = true;
        let layout = TextLayout::compute(&l, 1920, 1080);
        TextRenderer::new().render(&l, &mut frame, 1).unwrap();

        let bg = frame
            .pixel((layout.origin_x - 4) as u32, (layout.origin_y - 2) as u32)
            .unwrap();
        assert_eq!(bg, [0, 0, 255, 255]);

        let underline_y = (layout.origin_y + layout.text_height + 2) as u32;
        assert_eq!(
            frame.pixel(layout.origin_x as u32, underline_y),
            Some([255, 255, 255, 255])
        );
    }

    #[test]
    fn test_empty_text_is_noop() {
        let mut frame = FrameBuffer::filled(64, 64, [1, 2, 3, 255]).unwrap();
        let before = frame.clone();
        TextRenderer::new().render(&layer(""), &mut frame, 2).unwrap();
        assert_eq!(frame, before);
    }
}
