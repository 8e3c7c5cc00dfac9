//! Show project contents.

use std::path::PathBuf;

use super::open_project;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let (project, timeline) = open_project(&path)?;

    println!("Project: {}", project.name);
    println!("  Version: {}", project.version);
    println!("  Created: {}", project.created_at);
    println!("  Modified: {}", project.modified_at);
    println!(
        "  Duration: {:.2}s",
        timeline.total_duration_ms() as f64 / 1000.0
    );
    println!();

    println!("Export:");
    let e = &project.export;
    println!("  Output: {}", e.output_path.display());
    println!(
        "  Video: {}x{} @ {}fps, {} at {} kbps",
        e.width,
        e.height,
        e.fps,
        e.codec,
        e.bitrate / 1000
    );
    println!(
        "  Audio: {} Hz at {} kbps",
        e.audio_sample_rate,
        e.audio_bitrate / 1000
    );
    println!();

    println!("Tracks:");
    if timeline.track_count() == 0 {
        println!("  (none)");
    }
    for track in timeline.tracks_in_display_order() {
        let mut flags = Vec::new();
        if track.locked {
            flags.push("locked");
        }
        if !track.visible {
            flags.push("hidden");
        }
        println!(
            "  [{}] {} ({:?}, opacity {:.2}) {}",
            track.id,
            track.name,
            track.kind,
            track.opacity,
            flags.join(" ")
        );

        for entry in timeline.clip_entries().filter(|e| e.clip.track == track.id) {
            let c = &entry.clip;
            println!(
                "      clip {}: {} [{}ms, {}ms) trim [{}ms, {}ms) speed {}x volume {:.2}{}{}",
                c.id,
                c.path.display(),
                c.start_ms,
                c.end_ms,
                c.trim_start_ms,
                c.trim_end_ms,
                c.speed,
                c.volume,
                if c.muted { " muted" } else { "" },
                if entry.media.is_detached() { " (source missing)" } else { "" },
            );
        }
        for layer in timeline.text_layers().filter(|l| l.track == track.id) {
            println!(
                "      text {}: {:?} [{}ms, {}ms) at ({:.2}, {:.2}) size {}",
                layer.id, layer.text, layer.start_ms, layer.end_ms, layer.x, layer.y, layer.font_size
            );
        }
    }

    let orphans = timeline
        .clip_entries()
        .filter(|e| timeline.track(e.clip.track).is_none())
        .count();
    if orphans > 0 {
        println!();
        println!("  {orphans} clip(s) reference missing tracks");
    }

    Ok(())
}
