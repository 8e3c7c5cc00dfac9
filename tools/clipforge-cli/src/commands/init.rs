//! Create a new Clipforge project file.

use std::path::PathBuf;
use std::sync::Arc;

use clipforge_common::config::AppConfig;
use clipforge_media_ffmpeg::FfmpegBackend;
use clipforge_project_model::{
    ExportSettings, ProjectFile, RenderSettings, Timeline, TrackType,
};

pub fn run(
    config: &AppConfig,
    name: String,
    output: PathBuf,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
) -> anyhow::Result<()> {
    let path = output.join(format!("{name}.clipforge.json"));
    if path.exists() {
        return Err(anyhow::anyhow!("Project already exists: {}", path.display()));
    }

    let mut project = ProjectFile::new(&name);
    project.render = RenderSettings::from_defaults(&config.render);
    project.export = ExportSettings::from_defaults(output.join(format!("{name}.mp4")), &config.export);
    if let Some(width) = width {
        project.export.width = width;
    }
    if let Some(height) = height {
        project.export.height = height;
    }
    if let Some(fps) = fps {
        project.export.fps = fps;
    }
    project.export.validate()?;

    let mut timeline = Timeline::with_history_capacity(
        Arc::new(FfmpegBackend::new()),
        config.history.capacity,
    );
    for kind in [TrackType::Video, TrackType::Audio, TrackType::Text] {
        timeline.add_track(kind, None)?;
    }
    project.update_from(&timeline);

    project
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    println!("Project created: {}", path.display());
    println!(
        "  Export: {}x{} @ {}fps ({})",
        project.export.width, project.export.height, project.export.fps, project.export.codec
    );
    println!("  Output: {}", project.export.output_path.display());
    println!("  Tracks:");
    for track in timeline.tracks_in_display_order() {
        println!("    [{}] {} ({:?})", track.id, track.name, track.kind);
    }

    Ok(())
}
