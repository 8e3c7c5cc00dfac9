//! Media file inspection and audio extraction.

use std::path::PathBuf;

use clipforge_media_core::{classify, generate_waveform, probe_metadata, MediaBackend, MediaKind};
use clipforge_media_ffmpeg::FfmpegBackend;

pub fn probe(path: PathBuf) -> anyhow::Result<()> {
    let backend = FfmpegBackend::new();
    let meta = probe_metadata(&backend, &path)?;
    let kind = match classify(&backend, &path) {
        MediaKind::Video(_) => "video",
        MediaKind::Audio(_) => "audio only",
        MediaKind::Unrecognized => "unrecognized",
    };

    println!("{} ({kind})", path.display());
    println!("  Duration: {:.3}s", meta.duration_ms as f64 / 1000.0);
    if meta.width > 0 {
        println!(
            "  Video: {}x{} @ {:.2}fps ({})",
            meta.width, meta.height, meta.frame_rate, meta.codec
        );
    }
    if meta.has_audio() {
        println!(
            "  Audio: {} channel(s) at {} Hz",
            meta.audio_channels, meta.audio_sample_rate
        );
    }
    if meta.bitrate > 0 {
        println!("  Bitrate: {} kbps", meta.bitrate / 1000);
    }
    Ok(())
}

pub fn waveform(path: PathBuf, bins: usize, plot: bool) -> anyhow::Result<()> {
    let backend = FfmpegBackend::new();
    let waveform = generate_waveform(&backend, &path, bins)?;

    if !plot {
        println!("{}", serde_json::to_string(&waveform.bins)?);
        return Ok(());
    }
    if waveform.is_empty() {
        println!("{} has no audio", path.display());
        return Ok(());
    }

    const HEIGHT: usize = 8;
    for level in (1..=HEIGHT).rev() {
        let row: String = waveform
            .bins
            .iter()
            .map(|&peak| {
                if peak * HEIGHT as f32 + 0.5 >= level as f32 {
                    '#'
                } else {
                    ' '
                }
            })
            .collect();
        println!("|{row}|");
    }
    Ok(())
}

pub fn extract_audio(video: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let backend = FfmpegBackend::new();
    backend.extract_audio(&video, &output)?;
    println!("Audio written to {}", output.display());
    Ok(())
}
