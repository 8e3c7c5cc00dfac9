//! Additive stereo mixing for export.

use clipforge_media_core::{AudioSegment, MIX_CHANNELS};

/// Fixed attenuation applied to every contributing clip.
pub const CLIP_ATTENUATION: f32 = 0.9;

/// Add `segment` into the interleaved stereo `mix`, reading the segment at
/// `step` source frames per output frame with linear interpolation.
///
/// Mono segments are spread to both channels. Output frames past the end of
/// the segment are left untouched.
pub fn mix_segment(mix: &mut [f32], segment: &AudioSegment, step: f64, gain: f32) {
    let src_frames = segment.frames();
    if src_frames == 0 || gain == 0.0 || !(step > 0.0) {
        return;
    }
    let src_channels = segment.channels as usize;
    let channels = MIX_CHANNELS as usize;
    let sample = |frame: usize, channel: usize| -> f32 {
        segment.samples[frame * src_channels + channel.min(src_channels - 1)]
    };

    for (i, out) in mix.chunks_exact_mut(channels).enumerate() {
        let pos = i as f64 * step;
        let idx = pos as usize;
        if idx >= src_frames {
            break;
        }
        let next = (idx + 1).min(src_frames - 1);
        let frac = (pos - idx as f64) as f32;
        for (c, o) in out.iter_mut().enumerate() {
            let a = sample(idx, c);
            let b = sample(next, c);
            *o += (a + (b - a) * frac) * gain;
        }
    }
}

/// Hard-clamp every sample to [-1, 1].
pub fn clamp_mix(mix: &mut [f32]) {
    for s in mix.iter_mut() {
        *s = if s.is_nan() { 0.0 } else { s.clamp(-1.0, 1.0) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn stereo(samples: Vec<f32>) -> AudioSegment {
        AudioSegment {
            sample_rate: 48_000,
            channels: 2,
            samples,
        }
    }

    #[test]
    fn test_unit_step_copies_with_gain() {
        let mut mix = vec![0.0; 4];
        mix_segment(&mut mix, &stereo(vec![0.5, -0.5, 0.25, -0.25]), 1.0, 0.9);
        assert_eq!(mix, vec![0.45, -0.45, 0.225, -0.225]);
    }

    #[test]
    fn test_double_speed_skips_frames() {
        let mut mix = vec![0.0; 4];
        let seg = stereo(vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.4, 0.4]);
        mix_segment(&mut mix, &seg, 2.0, 1.0);
        assert_eq!(mix, vec![0.1, 0.1, 0.3, 0.3]);
    }

    #[test]
    fn test_half_speed_interpolates() {
        let mut mix = vec![0.0; 6];
        let seg = stereo(vec![0.0, 0.0, 1.0, 1.0]);
        mix_segment(&mut mix, &seg, 0.5, 1.0);
        assert_eq!(mix, vec![0.0, 0.0, 0.5, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_short_segment_leaves_tail() {
        let mut mix = vec![0.0; 6];
        mix_segment(&mut mix, &stereo(vec![0.5, 0.5]), 1.0, 1.0);
        assert_eq!(mix, vec![0.5, 0.5, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_mono_spreads() {
        let mut mix = vec![0.0; 2];
        let seg = AudioSegment {
            sample_rate: 48_000,
            channels: 1,
            samples: vec![0.5],
        };
        mix_segment(&mut mix, &seg, 1.0, 1.0);
        assert_eq!(mix, vec![0.5, 0.5]);
    }

    #[test]
    fn test_clamp() {
        let mut mix = vec![1.7, -3.0, 0.2, f32::NAN];
        clamp_mix(&mut mix);
        assert_eq!(mix, vec![1.0, -1.0, 0.2, 0.0]);
    }

    proptest! {
        #[test]
        fn test_mix_always_clamped(
            clips in proptest::collection::vec(
                (proptest::collection::vec(-4.0f32..4.0, 2..64), 0.0f32..4.0),
                1..8,
            )
        ) {
            let mut mix = vec![0.0; 32];
            for (samples, volume) in clips {
                let mut samples = samples;
                if samples.len() % 2 == 1 {
                    samples.pop();
                }
                mix_segment(&mut mix, &stereo(samples), 1.0, CLIP_ATTENUATION * volume);
            }
            clamp_mix(&mut mix);
            prop_assert!(mix.iter().all(|s| (-1.0..=1.0).contains(s)));
        }
    }
}
