//! Export a project to video.

use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clipforge_common::config::AppConfig;
use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_render_engine::{ExportProgress, Exporter};
use tokio::task::JoinHandle;

use super::open_project;

/// Command-line overrides of the project's export settings.
pub struct Overrides {
    pub output: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub codec: Option<String>,
    pub bitrate: Option<u64>,
}

pub async fn run(
    config: &AppConfig,
    project_path: PathBuf,
    overrides: Overrides,
) -> anyhow::Result<()> {
    println!("Exporting project: {}", project_path.display());
    let (project, timeline) = open_project(&project_path)?;

    let mut settings = project.export.clone();
    if let Some(output) = overrides.output {
        settings.output_path = output;
    }
    settings.width = overrides.width.unwrap_or(settings.width);
    settings.height = overrides.height.unwrap_or(settings.height);
    settings.fps = overrides.fps.unwrap_or(settings.fps);
    settings.bitrate = overrides.bitrate.unwrap_or(settings.bitrate);
    if let Some(codec) = overrides.codec {
        settings.codec = codec;
    }
    settings.validate()?;

    println!("  Output: {}", settings.output_path.display());
    println!(
        "  Video: {}x{} @ {}fps ({})",
        settings.width, settings.height, settings.fps, settings.codec
    );
    println!(
        "  Duration: {:.2}s",
        timeline.total_duration_ms() as f64 / 1000.0
    );

    let exporter = Arc::new(
        Exporter::new(Arc::clone(timeline.backend()))
            .with_supersample(config.export.export_supersample),
    );
    let worker = {
        let exporter = Arc::clone(&exporter);
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || exporter.export(&timeline, &settings))
    };

    let started = Instant::now();
    let result = supervise(&exporter, worker, tokio::signal::ctrl_c(), |p| {
        print_progress(p, started.elapsed())
    })
    .await?;

    match result {
        Ok(()) => {
            print_progress(&exporter.status(), started.elapsed());
            println!("\nExport complete: {}", settings.output_path.display());
            Ok(())
        }
        Err(ClipforgeError::Cancelled) => {
            println!("\nExport cancelled");
            Ok(())
        }
        Err(e) => {
            println!();
            Err(anyhow::anyhow!("Export failed ({:?}): {e}", e.code()))
        }
    }
}

/// Wait for the export worker, reporting progress every 250 ms.
///
/// The first completion of `interrupt` cancels the export; it is not polled
/// again afterwards.
async fn supervise(
    exporter: &Exporter,
    mut worker: JoinHandle<ClipforgeResult<()>>,
    interrupt: impl Future<Output = std::io::Result<()>>,
    report: impl Fn(&ExportProgress),
) -> anyhow::Result<ClipforgeResult<()>> {
    tokio::pin!(interrupt);
    let mut interrupted = false;
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            joined = &mut worker => return Ok(joined?),
            signal = &mut interrupt, if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        println!("\n  Cancelling...");
                        exporter.cancel();
                    }
                    Err(e) => tracing::warn!(error = %e, "Interrupt handler unavailable"),
                }
            }
            _ = ticker.tick() => report(&exporter.status()),
        }
    }
}

fn print_progress(p: &ExportProgress, elapsed: Duration) {
    let eta = if p.progress > 0.0 {
        elapsed.as_secs_f64() * f64::from(1.0 - p.progress) / f64::from(p.progress)
    } else {
        0.0
    };
    print!(
        "\r  {:?}: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
        p.stage,
        p.progress * 100.0,
        p.frames_rendered,
        p.total_frames,
        eta,
    );
    std::io::stdout().flush().ok();
}
