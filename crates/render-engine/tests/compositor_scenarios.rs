use std::path::PathBuf;
use std::sync::Arc;

use clipforge_common::ErrorCode;
use clipforge_media_core::memory::{MemoryBackend, SolidVideo};
use clipforge_project_model::{
    RenderSettings, TextLayer, Timeline, TrackId, TrackType, MAX_SUPERSAMPLE,
};
use clipforge_render_engine::text::TextLayout;
use clipforge_render_engine::Compositor;

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

fn backend() -> Arc<MemoryBackend> {
    let backend = MemoryBackend::new();
    backend.add_video("red.mp4", SolidVideo::new(320, 180, 5_000, RED));
    backend.add_video("blue_small.mp4", SolidVideo::new(160, 90, 5_000, BLUE));
    backend.add_video("black.mp4", SolidVideo::new(640, 360, 5_000, BLACK));
    backend.add_video("broken.mp4", SolidVideo::new(320, 180, 5_000, RED).failing());
    Arc::new(backend)
}

fn settings(width: u32, height: u32) -> RenderSettings {
    RenderSettings::with_size(width, height)
}

#[test]
fn empty_timeline_reports_no_active_clips() {
    let timeline = Timeline::new(backend());
    assert_eq!(timeline.total_duration_ms(), 0);

    let result = Compositor::new().render_frame_at(&timeline, 0, None);
    assert_eq!(ErrorCode::of(&result), ErrorCode::InvalidParameter);
}

#[test]
fn single_clip_matches_requested_size() {
    let mut timeline = Timeline::new(backend());
    timeline.add_clip("red.mp4", TrackId(0), 0).unwrap();

    let frame = Compositor::new()
        .render_frame_at(&timeline, 2_500, Some(&settings(1280, 720)))
        .unwrap();
    assert_eq!((frame.width, frame.height), (1280, 720));
    assert_eq!(frame.timestamp_ms, 2_500);
    // Native 320x180 centered on a black canvas.
    assert_eq!(frame.pixel(640, 360), Some(RED));
    assert_eq!(frame.pixel(0, 0), Some(BLACK));
}

#[test]
fn default_canvas_is_reference_size() {
    let mut timeline = Timeline::new(backend());
    timeline.add_clip("red.mp4", TrackId(0), 0).unwrap();

    let frame = Compositor::new().render_frame_at(&timeline, 0, None).unwrap();
    assert_eq!((frame.width, frame.height), (1920, 1080));
}

#[test]
fn higher_track_draws_on_top() {
    let b = backend();
    let mut timeline = Timeline::new(b);
    let back = timeline.add_track(TrackType::Video, None).unwrap();
    let front = timeline.add_track(TrackType::Video, None).unwrap();
    // Insert the front clip first so identity order disagrees with track order.
    timeline.add_clip("blue_small.mp4", front, 0).unwrap();
    timeline.add_clip("red.mp4", back, 0).unwrap();

    let frame = Compositor::new()
        .render_frame_at(&timeline, 1_000, Some(&settings(320, 180)))
        .unwrap();
    assert_eq!(frame.pixel(160, 90), Some(BLUE));
    assert_eq!(frame.pixel(5, 5), Some(RED));
}

#[test]
fn clip_time_maps_through_trim_and_speed() {
    let b = backend();
    let mut timeline = Timeline::new(b.clone());
    let id = timeline.add_clip("red.mp4", TrackId(0), 1_000).unwrap();
    timeline.trim_clip(id, 500, 3_000).unwrap();
    timeline.set_clip_speed(id, 2.0).unwrap();

    Compositor::new()
        .render_frame_at(&timeline, 1_500, Some(&settings(320, 180)))
        .unwrap();
    assert_eq!(
        b.frame_requests().last(),
        Some(&(PathBuf::from("red.mp4"), 1_500))
    );
}

#[test]
fn scaled_clip_is_centered() {
    let mut timeline = Timeline::new(backend());
    let id = timeline.add_clip("red.mp4", TrackId(0), 0).unwrap();
    timeline.set_clip_scale(id, 0.5, 0.5).unwrap();

    let frame = Compositor::new()
        .render_frame_at(&timeline, 0, Some(&settings(320, 180)))
        .unwrap();
    assert_eq!(frame.pixel(160, 90), Some(RED));
    assert_eq!(frame.pixel(79, 44), Some(BLACK));
    assert_eq!(frame.pixel(80, 45), Some(RED));
    assert_eq!(frame.pixel(240, 135), Some(BLACK));
}

#[test]
fn failing_clip_is_skipped() {
    let mut timeline = Timeline::new(backend());
    let back = timeline.add_track(TrackType::Video, None).unwrap();
    let front = timeline.add_track(TrackType::Video, None).unwrap();
    timeline.add_clip("blue_small.mp4", back, 0).unwrap();
    timeline.add_clip("broken.mp4", front, 0).unwrap();

    let frame = Compositor::new()
        .render_frame_at(&timeline, 0, Some(&settings(320, 180)))
        .unwrap();
    assert_eq!(frame.pixel(160, 90), Some(BLUE));
}

#[test]
fn all_clips_failing_is_decode_error() {
    let mut timeline = Timeline::new(backend());
    timeline.add_clip("broken.mp4", TrackId(0), 0).unwrap();

    let result = Compositor::new().render_frame_at(&timeline, 0, Some(&settings(320, 180)));
    assert_eq!(ErrorCode::of(&result), ErrorCode::DecodeFailed);
}

#[test]
fn clip_end_is_exclusive() {
    let mut timeline = Timeline::new(backend());
    timeline.add_clip("red.mp4", TrackId(0), 0).unwrap();

    let result = Compositor::new().render_frame_at(&timeline, 5_000, Some(&settings(320, 180)));
    assert_eq!(ErrorCode::of(&result), ErrorCode::InvalidParameter);
}

#[test]
fn text_layer_drawn_over_video() {
    let mut timeline = Timeline::new(backend());
    let video = timeline.add_track(TrackType::Video, None).unwrap();
    let text = timeline.add_track(TrackType::Text, None).unwrap();
    timeline.add_clip("black.mp4", video, 0).unwrap();
    let layer = TextLayer::new(text, "HELLO", 0, 1_000);
    timeline.add_text_layer(layer.clone()).unwrap();

    let mut compositor = Compositor::new();
    let frame = compositor
        .render_frame_at(&timeline, 500, Some(&settings(640, 360)))
        .unwrap();

    let layout = TextLayout::compute(&layer, 640, 360);
    let (x, y) = (layout.origin_x as u32, layout.origin_y as u32);
    assert_ne!(frame.pixel(x, y), Some(BLACK));
    assert_eq!(frame.pixel(x, y), Some([255, 255, 255, 255]));
    assert!(!compositor.text_renderer().cache().is_empty());

    // Outside the layer's window the canvas stays untouched.
    let frame = compositor
        .render_frame_at(&timeline, 1_000, Some(&settings(640, 360)))
        .unwrap();
    assert_eq!(frame.pixel(x, y), Some(BLACK));
}

#[test]
fn gpu_request_falls_back_to_cpu() {
    let mut timeline = Timeline::new(backend());
    timeline.add_clip("red.mp4", TrackId(0), 0).unwrap();

    let mut s = settings(320, 180);
    s.use_gpu = true;
    let frame = Compositor::new().render_frame_at(&timeline, 0, Some(&s)).unwrap();
    assert_eq!(frame.pixel(160, 90), Some(RED));
}

#[test]
fn oversized_supersample_is_rejected() {
    let mut timeline = Timeline::new(backend());
    let video = timeline.add_track(TrackType::Video, None).unwrap();
    let text = timeline.add_track(TrackType::Text, None).unwrap();
    timeline.add_clip("black.mp4", video, 0).unwrap();
    timeline
        .add_text_layer(TextLayer::new(text, "HELLO", 0, 1_000))
        .unwrap();

    let mut compositor = Compositor::new();
    let mut s = settings(640, 360);
    s.supersample = u32::MAX;
    let result = compositor.render_frame_at(&timeline, 500, Some(&s));
    assert_eq!(ErrorCode::of(&result), ErrorCode::InvalidParameter);
    assert!(compositor.text_renderer().cache().is_empty());

    s.supersample = MAX_SUPERSAMPLE;
    assert!(compositor.render_frame_at(&timeline, 500, Some(&s)).is_ok());
}
