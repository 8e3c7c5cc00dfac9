//! Clipforge Render Engine
//!
//! Turns a timeline into pixels and samples.
//!
//! # Pipeline Architecture
//!
//! ```text
//! timeline ──► active clips (by track) ──► frame_at(source time)
//!                                              │
//!                                        scale + center
//!                                              │
//!                                      blend onto canvas
//!                                              │
//! text layers ──► glyph cache ──► supersampled text
//!                                              │
//!                                              ▼
//!                                        RGBA canvas ──► YUV420P ──┐
//!                                                                  ├──► encoder session
//! audio-only clips ──► segments ──► resample + gain ──► clamp ─────┘
//! ```

pub mod blend;
pub mod compositor;
pub mod export;
pub mod font;
pub mod gpu;
pub mod mix;
pub mod text;

pub use compositor::*;
pub use export::*;
pub use text::{GlyphCache, TextRenderer};
