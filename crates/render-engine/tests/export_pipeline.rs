use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clipforge_common::{ClipforgeError, ErrorCode};
use clipforge_media_core::convert::placeholder_frame;
use clipforge_media_core::memory::{MemoryBackend, SolidVideo, ToneAudio};
use clipforge_media_core::PixelFormat;
use clipforge_project_model::{ExportSettings, Timeline, TrackId, TrackType};
use clipforge_render_engine::{ExportStage, Exporter};

fn settings() -> ExportSettings {
    ExportSettings {
        output_path: "out.mp4".into(),
        width: 64,
        height: 36,
        fps: 10,
        ..ExportSettings::default()
    }
}

fn backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.add_video("red.mp4", SolidVideo::new(64, 36, 1_000, [255, 0, 0, 255]));
    backend.add_video("broken.mp4", SolidVideo::new(64, 36, 1_000, [255, 0, 0, 255]).failing());
    backend.add_audio("half.wav", ToneAudio::constant(1_000, 0.5));
    backend.add_audio("loud.wav", ToneAudio::constant(1_000, 1.0));
    backend
}

fn wait_for_frames(exporter: &Exporter) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while exporter.status().frames_rendered == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn exports_every_frame_and_audio() {
    let backend = Arc::new(backend());
    let mut timeline = Timeline::new(backend.clone());
    let video = timeline.add_track(TrackType::Video, None).unwrap();
    let audio = timeline.add_track(TrackType::Audio, None).unwrap();
    timeline.add_clip("red.mp4", video, 0).unwrap();
    timeline.add_clip("half.wav", audio, 0).unwrap();

    let exporter = Exporter::new(backend.clone());
    exporter.export(&timeline, &settings()).unwrap();

    let out = backend.output();
    assert!(out.finished);
    assert!(!out.aborted);
    let config = out.config.unwrap();
    assert_eq!(config.gop_size, 12);
    assert_eq!((config.width, config.height), (64, 36));

    let pts: Vec<i64> = out.video_frames.iter().map(|f| f.pts_ms).collect();
    assert_eq!(pts, (0..10).map(|i| i * 100).collect::<Vec<_>>());
    assert!(out.video_frames.iter().all(|f| f.format == PixelFormat::Yuv420p));

    // 1000 ms at 48 kHz in 1024-sample frames.
    assert_eq!(out.audio_frames.len(), 47);
    assert_eq!(out.audio_frames[1].pts_samples, 1024);
    assert!(out.audio_frames[0]
        .samples
        .iter()
        .all(|s| (s - 0.45).abs() < 1e-6));

    assert_eq!(exporter.progress(), 1.0);
    assert!(!exporter.is_exporting());
    let status = exporter.status();
    assert_eq!(status.stage, ExportStage::Complete);
    assert_eq!(status.frames_rendered, 10);
    assert_eq!(status.total_frames, 10);
}

#[test]
fn empty_timeline_is_rejected_before_encoding() {
    let backend = Arc::new(backend());
    let timeline = Timeline::new(backend.clone());
    let exporter = Exporter::new(backend.clone());

    let result = exporter.export(&timeline, &settings());
    assert_eq!(ErrorCode::of(&result), ErrorCode::InvalidParameter);
    assert!(backend.output().config.is_none());
    assert!(!exporter.is_exporting());
    assert_eq!(exporter.status().stage, ExportStage::Failed);
}

#[test]
fn invalid_settings_are_rejected() {
    let backend = Arc::new(backend());
    let mut timeline = Timeline::new(backend.clone());
    timeline.add_clip("red.mp4", TrackId(0), 0).unwrap();
    let exporter = Exporter::new(backend);

    let mut odd = settings();
    odd.width = 63;
    assert_eq!(
        ErrorCode::of(&exporter.export(&timeline, &odd)),
        ErrorCode::InvalidParameter
    );
}

#[test]
fn failed_frames_become_placeholders() {
    let backend = Arc::new(backend());
    let mut timeline = Timeline::new(backend.clone());
    let video = timeline.add_track(TrackType::Video, None).unwrap();
    let audio = timeline.add_track(TrackType::Audio, None).unwrap();
    timeline.add_clip("broken.mp4", video, 0).unwrap();
    // Audio runs past the video, leaving frames with no active clip.
    timeline.add_clip("half.wav", audio, 500).unwrap();

    Exporter::new(backend.clone())
        .export(&timeline, &settings())
        .unwrap();

    let out = backend.output();
    assert_eq!(out.video_frames.len(), 15);
    let placeholder = placeholder_frame(PixelFormat::Yuv420p, 64, 36);
    assert!(out.video_frames.iter().all(|f| f.data == placeholder));
    assert!(out.finished);
}

#[test]
fn rgba_sessions_receive_rgba_frames() {
    let backend = Arc::new(backend().with_pixel_format(PixelFormat::Rgba));
    let mut timeline = Timeline::new(backend.clone());
    timeline.add_clip("red.mp4", TrackId(0), 0).unwrap();

    Exporter::new(backend.clone())
        .export(&timeline, &settings())
        .unwrap();

    let out = backend.output();
    let first = &out.video_frames[0];
    assert_eq!(first.format, PixelFormat::Rgba);
    assert_eq!(&first.data[..4], &[255, 0, 0, 255]);
}

#[test]
fn overlapping_loud_clips_stay_in_range() {
    let backend = Arc::new(backend());
    let mut timeline = Timeline::new(backend.clone());
    let a = timeline.add_track(TrackType::Audio, None).unwrap();
    let b = timeline.add_track(TrackType::Audio, None).unwrap();
    timeline.add_clip("loud.wav", a, 0).unwrap();
    timeline.add_clip("loud.wav", b, 0).unwrap();

    Exporter::new(backend.clone())
        .export(&timeline, &settings())
        .unwrap();

    let samples = backend.output().audio_samples();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    assert_eq!(samples[0], 1.0);
}

#[test]
fn muted_clip_is_silent() {
    let backend = Arc::new(backend());
    let mut timeline = Timeline::new(backend.clone());
    let audio = timeline.add_track(TrackType::Audio, None).unwrap();
    let id = timeline.add_clip("loud.wav", audio, 0).unwrap();
    timeline.mute_clip(id, true).unwrap();

    Exporter::new(backend.clone())
        .export(&timeline, &settings())
        .unwrap();

    let samples = backend.output().audio_samples();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| *s == 0.0));
}

#[test]
fn detached_audio_clip_is_opened_by_path() {
    let backend = Arc::new(backend());
    let mut timeline = Timeline::new(backend.clone());
    let audio = timeline.add_track(TrackType::Audio, None).unwrap();
    timeline.add_clip("half.wav", audio, 0).unwrap();
    let project = timeline.to_project_file("detached");

    backend.remove_source(Path::new("half.wav"));
    let rebuilt = Timeline::from_project_file(&project, backend.clone()).unwrap();
    assert!(rebuilt.audio_provider(clipforge_project_model::ClipId(1)).is_none());
    backend.add_audio("half.wav", ToneAudio::constant(1_000, 0.5));

    Exporter::new(backend.clone())
        .export(&rebuilt, &settings())
        .unwrap();
    let samples = backend.output().audio_samples();
    assert!((samples[0] - 0.45).abs() < 1e-6);
}

#[test]
fn encoder_failure_is_reported() {
    let backend = Arc::new(backend().with_failing_encoder());
    let mut timeline = Timeline::new(backend.clone());
    timeline.add_clip("red.mp4", TrackId(0), 0).unwrap();
    let exporter = Exporter::new(backend);

    let result = exporter.export(&timeline, &settings());
    assert_eq!(ErrorCode::of(&result), ErrorCode::EncodeFailed);
    assert!(!exporter.is_exporting());
}

#[test]
fn cancel_from_another_thread() {
    let backend = Arc::new(backend().with_frame_delay(Duration::from_millis(5)));
    backend.add_video("long.mp4", SolidVideo::new(64, 36, 60_000, [0, 255, 0, 255]));
    let mut timeline = Timeline::new(backend.clone());
    timeline.add_clip("long.mp4", TrackId(0), 0).unwrap();
    let exporter = Exporter::new(backend.clone());

    let result = std::thread::scope(|s| {
        let worker = s.spawn(|| exporter.export(&timeline, &settings()));
        wait_for_frames(&exporter);
        assert!(exporter.is_exporting());
        exporter.cancel();
        worker.join().unwrap()
    });

    assert!(matches!(result, Err(ClipforgeError::Cancelled)));
    assert_eq!(ErrorCode::of(&result), ErrorCode::ExportFailed);
    assert!(!exporter.is_exporting());
    let status = exporter.status();
    assert_eq!(status.stage, ExportStage::Cancelled);
    assert!(status.progress < 1.0);
    assert!(status.frames_rendered < status.total_frames);

    let out = backend.output();
    assert!(out.aborted);
    assert!(!out.finished);
}

#[test]
fn concurrent_export_is_rejected() {
    let backend = Arc::new(backend().with_frame_delay(Duration::from_millis(5)));
    backend.add_video("long.mp4", SolidVideo::new(64, 36, 60_000, [0, 255, 0, 255]));
    let mut timeline = Timeline::new(backend.clone());
    timeline.add_clip("long.mp4", TrackId(0), 0).unwrap();
    let exporter = Exporter::new(backend);

    std::thread::scope(|s| {
        let worker = s.spawn(|| exporter.export(&timeline, &settings()));
        wait_for_frames(&exporter);

        let second = exporter.export(&timeline, &settings());
        assert_eq!(ErrorCode::of(&second), ErrorCode::InvalidParameter);
        assert!(exporter.is_exporting());

        exporter.cancellation_token().cancel();
        assert!(matches!(worker.join().unwrap(), Err(ClipforgeError::Cancelled)));
    });
}
