//! Check tool and backend availability.

use clipforge_common::config::{config_file_path, AppConfig};
use clipforge_media_ffmpeg::{is_ffmpeg_on_path, is_ffprobe_on_path};
use clipforge_render_engine::gpu;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Clipforge System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = is_ffmpeg_on_path();
    let ffprobe = is_ffprobe_on_path();
    report(ffmpeg, "ffmpeg", "install ffmpeg and make sure it is on PATH");
    report(ffprobe, "ffprobe", "ffprobe ships with ffmpeg");

    if gpu::is_available() {
        println!("[OK] GPU compositing available");
    } else {
        println!("[INFO] GPU compositing unavailable, CPU compositor in use");
    }

    println!();
    println!("Configuration:");
    println!("  Config file: {}", config_file_path().display());
    println!("  Projects: {}", config.projects_dir.display());
    println!(
        "  Export defaults: {}fps {} at {} kbps, text supersample {}x",
        config.export.fps,
        config.export.video_codec,
        config.export.bitrate / 1000,
        config.export.export_supersample
    );
    println!("  Undo history: {} steps", config.history.capacity);

    println!();
    if ffmpeg && ffprobe {
        println!("All required tools are available. Clipforge is ready.");
    } else {
        println!("Some required tools are missing. See above for fixes.");
    }
    Ok(())
}

fn report(ok: bool, name: &str, fix: &str) {
    if ok {
        println!("[OK] {name} found");
    } else {
        println!("[MISSING] {name}: {fix}");
    }
}
