//! Encoding sessions that stream raw frames into an `ffmpeg` child process.
//!
//! Video is encoded into an intermediate Matroska file while the export runs.
//! Audio arrives after video, so it is buffered as raw `f32le` in the same
//! temporary directory and muxed with the video on `finish`.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_media_core::{
    AudioEncoderConfig, AudioFrame, EncoderConfig, EncoderSession, PixelFormat, VideoFrame,
    DEFAULT_VIDEO_CODEC,
};

/// ffmpeg encoder used when the requested codec is unknown or unavailable.
const FALLBACK_ENCODER: &str = "libx264";

/// Native encoder present in every ffmpeg build.
const BUILTIN_ENCODER: &str = "mpeg4";

/// Map a codec name to an ffmpeg encoder that this ffmpeg build provides.
pub fn resolve_video_codec(requested: &str) -> &'static str {
    if let Some(encoder) = encoder_for_codec(requested).filter(|e| encoder_available(e)) {
        return encoder;
    }
    let fallback = if encoder_available(FALLBACK_ENCODER) {
        FALLBACK_ENCODER
    } else {
        BUILTIN_ENCODER
    };
    tracing::warn!(
        requested,
        default_codec = DEFAULT_VIDEO_CODEC,
        fallback,
        "Requested video codec unavailable, falling back"
    );
    fallback
}

fn encoder_for_codec(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "h264" | "avc" | "libx264" => Some("libx264"),
        "h265" | "hevc" | "libx265" => Some("libx265"),
        "vp9" | "libvpx-vp9" => Some("libvpx-vp9"),
        "vp8" | "libvpx" => Some("libvpx"),
        "mpeg4" => Some("mpeg4"),
        "prores" | "prores_ks" => Some("prores_ks"),
        _ => None,
    }
}

fn encoder_available(encoder: &str) -> bool {
    let Ok(out) = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .output()
    else {
        return false;
    };
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(encoder))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> ClipforgeResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// A running ffmpeg encode.
pub struct FfmpegEncoder {
    config: EncoderConfig,
    workdir: tempfile::TempDir,
    video_path: PathBuf,
    audio_path: PathBuf,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    audio_out: Option<BufWriter<File>>,
    audio_samples_written: u64,
    frames_written: u64,
}

impl FfmpegEncoder {
    /// Validate `config` and spawn the video encoder process.
    pub fn start(config: &EncoderConfig) -> ClipforgeResult<Self> {
        config.validate()?;
        ensure_parent_dir(&config.output_path)?;

        let encoder = resolve_video_codec(&config.codec);
        let workdir = tempfile::Builder::new().prefix("clipforge-export-").tempdir()?;
        let video_path = workdir.path().join("video.mkv");
        let audio_path = workdir.path().join("audio.f32le");

        tracing::info!(
            output = %config.output_path.display(),
            width = config.width,
            height = config.height,
            fps = config.fps,
            encoder,
            "Starting ffmpeg encoder"
        );

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args([
                "-y",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "yuv420p",
                "-s",
                &format!("{}x{}", config.width, config.height),
                "-r",
                &config.fps.to_string(),
                "-i",
                "pipe:0",
                "-an",
                "-c:v",
                encoder,
                "-b:v",
                &config.bitrate.to_string(),
                "-g",
                &config.gop_size.max(1).to_string(),
                "-pix_fmt",
                "yuv420p",
            ])
            .arg(&video_path);

        let mut child = cmd.spawn().map_err(|e| {
            ClipforgeError::encode(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClipforgeError::encode("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClipforgeError::encode("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            config: config.clone(),
            workdir,
            video_path,
            audio_path,
            child: Some(child),
            stdin: Some(stdin),
            stderr_drain: Some(stderr_drain),
            audio_out: None,
            audio_samples_written: 0,
            frames_written: 0,
        })
    }

    /// Close stdin and wait for the video encoder to exit.
    fn finish_video(&mut self) -> ClipforgeResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ClipforgeError::encode("ffmpeg encoder already finished"))?;
        let status = child
            .wait()
            .map_err(|e| ClipforgeError::encode(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ClipforgeError::encode("ffmpeg stderr drain thread panicked"))??,
            None => Vec::new(),
        };
        if !status.success() {
            return Err(ClipforgeError::encode(format!(
                "ffmpeg exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }

    /// Remux the intermediate video (and buffered audio) into the output.
    fn mux(&self, audio: Option<&AudioEncoderConfig>) -> ClipforgeResult<()> {
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(&self.video_path);

        match audio {
            Some(audio) if self.audio_samples_written > 0 => {
                cmd.args([
                    "-f",
                    "f32le",
                    "-ar",
                    &audio.sample_rate.to_string(),
                    "-ac",
                    &audio.channels.to_string(),
                    "-i",
                ])
                .arg(&self.audio_path)
                .args([
                    "-map",
                    "0:v:0",
                    "-map",
                    "1:a:0",
                    "-c:v",
                    "copy",
                    "-c:a",
                    "aac",
                    "-b:a",
                    &audio.bitrate.to_string(),
                    "-shortest",
                ]);
            }
            _ => {
                cmd.args(["-c:v", "copy"]);
            }
        }

        let format = self.config.format.to_ascii_lowercase();
        if matches!(format.as_str(), "mp4" | "mov" | "m4v") {
            cmd.args(["-movflags", "+faststart"]);
        }
        if !format.is_empty() {
            cmd.args(["-f", &format]);
        }
        cmd.arg(&self.config.output_path);

        let out = cmd
            .output()
            .map_err(|e| ClipforgeError::encode(format!("failed to run ffmpeg mux: {e}")))?;
        if !out.status.success() {
            return Err(ClipforgeError::encode(format!(
                "ffmpeg mux failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl EncoderSession for FfmpegEncoder {
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Yuv420p
    }

    fn audio_frame_size(&self) -> Option<usize> {
        self.config.audio.as_ref().map(|a| a.frame_size)
    }

    fn write_video(&mut self, frame: &VideoFrame) -> ClipforgeResult<()> {
        if frame.format != PixelFormat::Yuv420p
            || frame.width != self.config.width
            || frame.height != self.config.height
        {
            return Err(ClipforgeError::encode(format!(
                "unexpected {:?} {}x{} frame for a {}x{} yuv420p stream",
                frame.format, frame.width, frame.height, self.config.width, self.config.height
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ClipforgeError::encode("ffmpeg encoder is already finalized"))?;
        stdin.write_all(&frame.data).map_err(|e| {
            ClipforgeError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    fn write_audio(&mut self, frame: &AudioFrame) -> ClipforgeResult<()> {
        if self.config.audio.is_none() {
            return Err(ClipforgeError::encode("session has no audio stream"));
        }
        if self.audio_out.is_none() {
            self.audio_out = Some(BufWriter::new(File::create(&self.audio_path)?));
        }
        if let Some(out) = self.audio_out.as_mut() {
            for sample in &frame.samples {
                out.write_all(&sample.to_le_bytes())?;
            }
        }
        self.audio_samples_written += frame.samples.len() as u64;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> ClipforgeResult<()> {
        if let Some(mut out) = self.audio_out.take() {
            out.flush()?;
        }
        self.finish_video()?;
        let audio = self.config.audio.clone();
        self.mux(audio.as_ref())?;
        tracing::info!(
            output = %self.config.output_path.display(),
            frames = self.frames_written,
            audio_samples = self.audio_samples_written,
            workdir = %self.workdir.path().display(),
            "Encoding finished"
        );
        Ok(())
    }

    fn abort(mut self: Box<Self>) {
        drop(self.audio_out.take());
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(handle) = self.stderr_drain.take() {
            let _ = handle.join();
        }
        tracing::debug!(
            output = %self.config.output_path.display(),
            "Encoder aborted"
        );
    }
}
