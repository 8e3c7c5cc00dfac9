//! Text overlay layers.

use serde::{Deserialize, Serialize};

use crate::ids::{LayerId, TrackId};

/// Maximum text length in characters.
pub const MAX_TEXT_LEN: usize = 511;

/// Maximum font family name length in characters.
pub const MAX_FONT_FAMILY_LEN: usize = 63;

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextAlignment {
    Left,
    #[default]
    Center,
    Right,
}

/// A styled text overlay shown during `[start_ms, end_ms)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLayer {
    pub id: LayerId,
    pub track: TrackId,
    pub text: String,
    pub start_ms: i64,
    pub end_ms: i64,
    /// Horizontal center, normalized to the 1920x1080 reference frame.
    pub x: f32,
    /// Vertical center, normalized to the 1920x1080 reference frame.
    pub y: f32,
    /// Font size in reference-frame pixels.
    pub font_size: u32,
    pub font_family: String,
    pub color: Rgba,
    pub background: Option<Rgba>,
    /// Degrees; stored but not applied by the bitmap renderer.
    pub rotation: f32,
    pub scale: f32,
    pub alignment: TextAlignment,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Default for TextLayer {
    fn default() -> Self {
        Self {
            id: LayerId(0),
            track: TrackId(0),
            text: String::new(),
            start_ms: 0,
            end_ms: 0,
            x: 0.5,
            y: 0.5,
            font_size: 48,
            font_family: "Arial".to_string(),
            color: Rgba::WHITE,
            background: None,
            rotation: 0.0,
            scale: 1.0,
            alignment: TextAlignment::Center,
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

impl TextLayer {
    pub fn new(track: TrackId, text: impl Into<String>, start_ms: i64, end_ms: i64) -> Self {
        Self {
            track,
            text: text.into(),
            start_ms,
            end_ms,
            ..Self::default()
        }
    }

    pub fn is_active_at(&self, timestamp_ms: i64) -> bool {
        self.start_ms <= timestamp_ms && timestamp_ms < self.end_ms
    }

    /// Truncate the bounded string fields in place.
    pub(crate) fn bound_strings(&mut self) {
        self.text = crate::track::bounded(std::mem::take(&mut self.text), MAX_TEXT_LEN);
        self.font_family =
            crate::track::bounded(std::mem::take(&mut self.font_family), MAX_FONT_FAMILY_LEN);
    }
}
