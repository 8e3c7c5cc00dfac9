//! Render a single timeline frame to PNG.

use std::path::PathBuf;

use clipforge_render_engine::Compositor;

use super::open_project;

pub fn run(
    project_path: PathBuf,
    at_ms: i64,
    output: PathBuf,
    width: Option<u32>,
    height: Option<u32>,
    supersample: Option<u32>,
) -> anyhow::Result<()> {
    let (project, timeline) = open_project(&project_path)?;

    let mut settings = project.render.clone();
    settings.width = width.unwrap_or(settings.width);
    settings.height = height.unwrap_or(settings.height);
    settings.supersample = supersample.unwrap_or(settings.supersample).max(1);

    let mut compositor = Compositor::new();
    let frame = compositor.render_frame_at(&timeline, at_ms, Some(&settings))?;

    let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.data)
        .ok_or_else(|| anyhow::anyhow!("Rendered frame has an unexpected size"))?;
    image
        .save(&output)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", output.display()))?;

    tracing::info!(
        output = %output.display(),
        timestamp_ms = at_ms,
        width = settings.width,
        height = settings.height,
        "Frame rendered"
    );
    println!("Rendered {}ms to {}", at_ms, output.display());
    Ok(())
}
