//! Clipforge media contracts.
//!
//! This crate defines what the editing core needs from a multimedia engine
//! without coupling to a concrete one:
//! - RGBA frame buffers and metadata records
//! - Video/audio provider traits bound to one source file
//! - The encoding session trait used by export
//! - Media classification (video first, then audio)
//! - Waveform peak binning and RGBA to YUV420P conversion
//!
//! `clipforge-media-ffmpeg` implements the contracts on top of the system
//! ffmpeg tools; [`memory`] implements them with synthetic in-memory sources.

pub mod convert;
pub mod encode;
pub mod frame;
pub mod memory;
pub mod metadata;
pub mod provider;
pub mod waveform;

pub use encode::*;
pub use frame::*;
pub use metadata::*;
pub use provider::*;
pub use waveform::peak_waveform;

/// Sample rate every audio segment is delivered at for mixing.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

/// Channel count every audio segment is delivered with for mixing.
pub const MIX_CHANNELS: u16 = 2;
