pub mod check;
pub mod edit;
pub mod export;
pub mod info;
pub mod init;
pub mod media;
pub mod render;

use std::path::Path;
use std::sync::Arc;

use clipforge_media_ffmpeg::FfmpegBackend;
use clipforge_project_model::{ProjectFile, Timeline};

/// Load a project file and bind its clips against the ffmpeg backend.
pub fn open_project(path: &Path) -> anyhow::Result<(ProjectFile, Timeline)> {
    let project = ProjectFile::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load project {}: {e}", path.display()))?;
    let timeline = Timeline::from_project_file(&project, Arc::new(FfmpegBackend::new()))?;
    tracing::debug!(
        path = %path.display(),
        tracks = timeline.track_count(),
        clips = timeline.clip_count(),
        text_layers = timeline.text_layer_count(),
        "Project opened"
    );
    Ok((project, timeline))
}

/// Write the timeline back into `project` and save it to `path`.
pub fn save_project(
    path: &Path,
    project: &mut ProjectFile,
    timeline: &Timeline,
) -> anyhow::Result<()> {
    project.update_from(timeline);
    project
        .save(path)
        .map_err(|e| anyhow::anyhow!("Failed to save project {}: {e}", path.display()))
}
