//! End-to-end checks against a real ffmpeg install.
//!
//! Each test returns early when ffmpeg/ffprobe are not on PATH.

use std::path::{Path, PathBuf};
use std::process::Command;

use clipforge_media_core::{
    classify, generate_waveform, AudioEncoderConfig, AudioFrame, EncoderConfig, MediaBackend,
    MediaKind, PixelFormat, VideoFrame,
};
use clipforge_media_ffmpeg::FfmpegBackend;

fn tools_available() -> bool {
    FfmpegBackend::new().is_available()
}

fn lavfi(args: &[&str], out: &Path) {
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error"])
        .args(args)
        .arg(out)
        .status()
        .unwrap();
    assert!(status.success());
}

fn make_sources(dir: &Path) -> (PathBuf, PathBuf) {
    let video = dir.join("clip.mkv");
    lavfi(
        &[
            "-f", "lavfi", "-i", "color=c=red:s=64x36:d=2:r=10",
            "-f", "lavfi", "-i", "sine=frequency=440:duration=2",
            "-c:v", "mpeg4", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest",
        ],
        &video,
    );
    let audio = dir.join("tone.wav");
    lavfi(&["-f", "lavfi", "-i", "sine=frequency=220:duration=1"], &audio);
    (video, audio)
}

#[test]
fn test_probe_and_decode() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let (video, audio) = make_sources(dir.path());
    let backend = FfmpegBackend::new();

    match classify(&backend, &video) {
        MediaKind::Video(provider) => {
            assert_eq!(provider.metadata().width, 64);
            assert_eq!(provider.metadata().height, 36);
            let frame = provider.frame_at(500).unwrap();
            let [r, g, b, a] = frame.pixel(32, 18).unwrap();
            assert!(r > 200 && g < 60 && b < 60 && a == 255);
        }
        other => panic!("expected video, got {other:?}"),
    }

    match classify(&backend, &audio) {
        MediaKind::Audio(provider) => {
            let meta = provider.metadata().unwrap();
            assert!((meta.duration_ms - 1000).abs() < 50);
            let seg = provider.segment(0.0, 100.0, 48_000).unwrap();
            assert_eq!(seg.channels, 2);
            assert_eq!(seg.frames(), 4800);
        }
        other => panic!("expected audio, got {other:?}"),
    }

    let wf = generate_waveform(&backend, &audio, 20).unwrap();
    assert_eq!(wf.len(), 20);
    assert!(wf.bins.iter().any(|&b| b > 0.1));
}

#[test]
fn test_encode_with_audio() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out").join("export.mp4");
    let backend = FfmpegBackend::new();
    let config = EncoderConfig {
        output_path: output.clone(),
        width: 64,
        height: 36,
        fps: 10,
        bitrate: 500_000,
        codec: "h264".into(),
        format: "mp4".into(),
        gop_size: 12,
        audio: Some(AudioEncoderConfig::default()),
    };

    let mut session = backend.create_encoder(&config).unwrap();
    assert_eq!(session.pixel_format(), PixelFormat::Yuv420p);
    for i in 0..10u64 {
        session
            .write_video(&VideoFrame {
                format: PixelFormat::Yuv420p,
                width: 64,
                height: 36,
                data: clipforge_media_core::convert::yuv420p_placeholder(64, 36),
                index: i,
                pts_ms: i as i64 * 100,
            })
            .unwrap();
    }
    for i in 0..47u64 {
        session
            .write_audio(&AudioFrame {
                sample_rate: 48_000,
                channels: 2,
                samples: vec![0.1; 2048],
                pts_samples: i * 1024,
            })
            .unwrap();
    }
    session.finish().unwrap();

    assert!(output.exists());
    assert!(matches!(classify(&backend, &output), MediaKind::Video(_)));
}

#[test]
fn test_extract_audio() {
    if !tools_available() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let (video, _) = make_sources(dir.path());
    let out = dir.path().join("extracted.wav");
    FfmpegBackend::new().extract_audio(&video, &out).unwrap();
    assert!(out.exists());
    assert!(FfmpegBackend::new().open_audio(&out).is_ok());
}
