//! Timeline edits that load, modify and save a project file.

use std::path::PathBuf;

use clipforge_media_core::classify;
use clipforge_project_model::{Rgba, TextLayer, TrackId, TrackType};

use super::{open_project, save_project};
use crate::TrackKindArg;

pub fn add_clip(
    project_path: PathBuf,
    media: PathBuf,
    track: Option<u32>,
    start_ms: i64,
) -> anyhow::Result<()> {
    let (mut project, mut timeline) = open_project(&project_path)?;

    let track = match track {
        Some(id) => TrackId(id),
        None => {
            let kind = if classify(timeline.backend().as_ref(), &media).is_audio_only() {
                TrackType::Audio
            } else {
                TrackType::Video
            };
            let name = media.file_stem().and_then(|s| s.to_str());
            timeline.add_track(kind, name)?
        }
    };

    let id = timeline.add_clip(&media, track, start_ms)?;
    save_project(&project_path, &mut project, &timeline)?;

    if let Some(clip) = timeline.clip(id) {
        println!(
            "Added clip {} on track {}: {} [{}ms, {}ms) {:?}",
            id,
            clip.track,
            clip.path.display(),
            clip.start_ms,
            clip.end_ms,
            clip.kind
        );
    }
    Ok(())
}

/// Options for a new text overlay.
pub struct TextArgs {
    pub text: String,
    pub track: Option<u32>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub x: f32,
    pub y: f32,
    pub font_size: u32,
    pub color: String,
    pub background: Option<String>,
    pub underline: bool,
}

pub fn add_text(project_path: PathBuf, args: TextArgs) -> anyhow::Result<()> {
    let (mut project, mut timeline) = open_project(&project_path)?;

    let track = match args.track {
        Some(id) => TrackId(id),
        None => timeline.add_track(TrackType::Text, None)?,
    };

    let mut layer = TextLayer::new(track, args.text, args.start_ms, args.end_ms);
    layer.x = args.x;
    layer.y = args.y;
    layer.font_size = args.font_size;
    layer.color = parse_color(&args.color)?;
    layer.background = args.background.as_deref().map(parse_color).transpose()?;
    layer.underline = args.underline;

    let id = timeline.add_text_layer(layer)?;
    save_project(&project_path, &mut project, &timeline)?;

    println!(
        "Added text layer {} on track {} [{}ms, {}ms)",
        id, track, args.start_ms, args.end_ms
    );
    Ok(())
}

pub fn add_track(
    project_path: PathBuf,
    kind: TrackKindArg,
    name: Option<String>,
) -> anyhow::Result<()> {
    let (mut project, mut timeline) = open_project(&project_path)?;

    let kind = match kind {
        TrackKindArg::Video => TrackType::Video,
        TrackKindArg::Audio => TrackType::Audio,
        TrackKindArg::Text => TrackType::Text,
        TrackKindArg::Overlay => TrackType::Overlay,
    };
    let id = timeline.add_track(kind, name.as_deref())?;
    save_project(&project_path, &mut project, &timeline)?;

    if let Some(track) = timeline.track(id) {
        println!("Added track {}: {} ({:?})", id, track.name, track.kind);
    }
    Ok(())
}

/// Parse `RRGGBB` or `RRGGBBAA`, with an optional leading `#`.
fn parse_color(s: &str) -> anyhow::Result<Rgba> {
    let hex = s.trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(anyhow::anyhow!("Invalid color '{s}': expected RRGGBB or RRGGBBAA"));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|e| anyhow::anyhow!("Invalid color '{s}': {e}"))
    };
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba::new(channel(0)?, channel(2)?, channel(4)?, a))
}
