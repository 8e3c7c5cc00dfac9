//! Clipforge CLI: build projects, render frames, and export video.
//!
//! Usage:
//!   clipforge init <NAME>                    Create a project file
//!   clipforge add-clip <PROJECT> <MEDIA>     Place a media file on the timeline
//!   clipforge add-text <PROJECT> <TEXT>      Add a text overlay
//!   clipforge add-track <PROJECT> <KIND>     Add an empty track
//!   clipforge info <PROJECT>                 Show project contents
//!   clipforge render <PROJECT> --at <MS>     Render one frame to PNG
//!   clipforge export <PROJECT>               Export the timeline to video
//!   clipforge probe <MEDIA>                  Show media metadata
//!   clipforge waveform <MEDIA>               Print a peak waveform
//!   clipforge extract-audio <VIDEO> <OUT>    Extract a video's audio track
//!   clipforge check                          Check tool availability

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clipforge_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "clipforge",
    about = "Non-linear video editing from the command line",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Track kinds selectable from the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TrackKindArg {
    Video,
    Audio,
    Text,
    Overlay,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project file
    Init {
        /// Project name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Export width
        #[arg(long)]
        width: Option<u32>,

        /// Export height
        #[arg(long)]
        height: Option<u32>,

        /// Export frame rate
        #[arg(long)]
        fps: Option<u32>,
    },

    /// Place a media file on the timeline
    AddClip {
        /// Path to the project file
        project: PathBuf,

        /// Media file to add
        media: PathBuf,

        /// Target track id (a new matching track is created when omitted)
        #[arg(short, long)]
        track: Option<u32>,

        /// Timeline start in milliseconds
        #[arg(short, long = "start", default_value = "0")]
        start_ms: i64,
    },

    /// Add a text overlay
    AddText {
        /// Path to the project file
        project: PathBuf,

        /// Text content
        text: String,

        /// Target track id (a new text track is created when omitted)
        #[arg(short, long)]
        track: Option<u32>,

        /// Start in milliseconds
        #[arg(long = "start", default_value = "0")]
        start_ms: i64,

        /// End in milliseconds (exclusive)
        #[arg(long = "end", default_value = "3000")]
        end_ms: i64,

        /// Horizontal center in [0, 1]
        #[arg(long, default_value = "0.5")]
        x: f32,

        /// Vertical center in [0, 1]
        #[arg(long, default_value = "0.5")]
        y: f32,

        /// Font size in 1080p pixels
        #[arg(long = "size", default_value = "48")]
        font_size: u32,

        /// Text color as RRGGBB or RRGGBBAA hex
        #[arg(long, default_value = "ffffff")]
        color: String,

        /// Background color as RRGGBB or RRGGBBAA hex
        #[arg(long)]
        background: Option<String>,

        #[arg(long)]
        underline: bool,
    },

    /// Add an empty track
    AddTrack {
        /// Path to the project file
        project: PathBuf,

        #[arg(value_enum)]
        kind: TrackKindArg,

        /// Track name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show project contents
    Info {
        /// Path to the project file
        project: PathBuf,
    },

    /// Render one timeline frame to a PNG file
    Render {
        /// Path to the project file
        project: PathBuf,

        /// Timeline position in milliseconds
        #[arg(long = "at", default_value = "0")]
        at_ms: i64,

        /// Output PNG path
        #[arg(short, long, default_value = "frame.png")]
        output: PathBuf,

        /// Canvas width (project render width when omitted)
        #[arg(long)]
        width: Option<u32>,

        /// Canvas height (project render height when omitted)
        #[arg(long)]
        height: Option<u32>,

        /// Text supersample factor
        #[arg(long)]
        supersample: Option<u32>,
    },

    /// Export the timeline to a video file
    Export {
        /// Path to the project file
        project: PathBuf,

        /// Output file path (project export path when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        #[arg(long)]
        fps: Option<u32>,

        /// Video codec: h264, h265, vp9, ...
        #[arg(long)]
        codec: Option<String>,

        /// Video bitrate in bits per second
        #[arg(long)]
        bitrate: Option<u64>,
    },

    /// Show media file metadata
    Probe {
        /// Media file
        media: PathBuf,
    },

    /// Print a peak waveform of a media file's audio
    Waveform {
        /// Media file
        media: PathBuf,

        /// Number of bins
        #[arg(short, long, default_value = "64")]
        bins: usize,

        /// Draw the bins as a text plot instead of JSON
        #[arg(long)]
        plot: bool,
    },

    /// Extract the audio track of a video file
    ExtractAudio {
        /// Source video
        video: PathBuf,

        /// Output audio file
        output: PathBuf,
    },

    /// Check tool and backend availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load();

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    clipforge_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init {
            name,
            output,
            width,
            height,
            fps,
        } => commands::init::run(&config, name, output, width, height, fps),
        Commands::AddClip {
            project,
            media,
            track,
            start_ms,
        } => commands::edit::add_clip(project, media, track, start_ms),
        Commands::AddText {
            project,
            text,
            track,
            start_ms,
            end_ms,
            x,
            y,
            font_size,
            color,
            background,
            underline,
        } => commands::edit::add_text(
            project,
            commands::edit::TextArgs {
                text,
                track,
                start_ms,
                end_ms,
                x,
                y,
                font_size,
                color,
                background,
                underline,
            },
        ),
        Commands::AddTrack {
            project,
            kind,
            name,
        } => commands::edit::add_track(project, kind, name),
        Commands::Info { project } => commands::info::run(project),
        Commands::Render {
            project,
            at_ms,
            output,
            width,
            height,
            supersample,
        } => commands::render::run(project, at_ms, output, width, height, supersample),
        Commands::Export {
            project,
            output,
            width,
            height,
            fps,
            codec,
            bitrate,
        } => {
            let overrides = commands::export::Overrides {
                output,
                width,
                height,
                fps,
                codec,
                bitrate,
            };
            commands::export::run(&config, project, overrides).await
        }
        Commands::Probe { media } => commands::media::probe(media),
        Commands::Waveform { media, bins, plot } => commands::media::waveform(media, bins, plot),
        Commands::ExtractAudio { video, output } => commands::media::extract_audio(video, output),
        Commands::Check => commands::check::run(&config),
    }
}
