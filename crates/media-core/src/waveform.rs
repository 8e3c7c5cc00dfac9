//! Peak-amplitude waveform downsampling.

use clipforge_common::{ClipforgeError, ClipforgeResult};

use crate::metadata::Waveform;

/// Reduce interleaved PCM to `bins` peak amplitudes.
///
/// Each sample frame is averaged across channels before taking its absolute
/// value; a bin keeps the largest such value, capped at 1.0. Empty input
/// yields an empty waveform.
pub fn peak_waveform(samples: &[f32], channels: u16, bins: usize) -> ClipforgeResult<Waveform> {
    if bins == 0 {
        return Err(ClipforgeError::invalid_parameter(
            "waveform bin count must be non-zero",
        ));
    }
    if channels == 0 {
        return Err(ClipforgeError::invalid_parameter(
            "waveform channel count must be non-zero",
        ));
    }

    let channels = channels as usize;
    let frames = samples.len() / channels;
    if frames == 0 {
        return Ok(Waveform::default());
    }

    let mut peaks = vec![0.0f32; bins];
    for (frame_idx, frame) in samples.chunks_exact(channels).enumerate() {
        let mono = frame.iter().sum::<f32>() / channels as f32;
        let bin = (frame_idx * bins / frames).min(bins - 1);
        let amp = mono.abs().min(1.0);
        if amp > peaks[bin] {
            peaks[bin] = amp;
        }
    }

    Ok(Waveform { bins: peaks })
}
