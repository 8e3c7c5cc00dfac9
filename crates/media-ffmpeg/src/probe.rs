//! Source inspection through `ffprobe`.

use std::path::Path;
use std::process::{Command, Stdio};

use clipforge_common::{ClipforgeError, ClipforgeResult};
use clipforge_media_core::{AudioMetadata, VideoMetadata};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    channels: Option<u16>,
    sample_rate: Option<String>,
    duration: Option<String>,
    /// Attached pictures (cover art) show up as video streams.
    disposition: Option<ProbeDisposition>,
}

#[derive(Debug, Deserialize)]
struct ProbeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// What `ffprobe` reported about a source.
#[derive(Debug, Clone, Default)]
pub struct ProbeInfo {
    /// Present when the file has a real video stream.
    pub video: Option<VideoMetadata>,
    /// Present when the file has an audio stream. `duration_ms` is 0 when
    /// the container does not report one.
    pub audio: Option<AudioMetadata>,
}

/// Run `ffprobe` on `path`.
pub fn probe(path: &Path) -> ClipforgeResult<ProbeInfo> {
    if !path.exists() {
        return Err(ClipforgeError::invalid_file(path, "file does not exist"));
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ClipforgeError::not_initialized(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ClipforgeError::invalid_file(
            path,
            format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| ClipforgeError::invalid_file(path, format!("ffprobe json parse failed: {e}")))?;
    Ok(parse_probe(parsed))
}

fn parse_probe(parsed: ProbeOut) -> ProbeInfo {
    let format_duration_ms = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_secs_to_ms);
    let bitrate = parsed
        .format
        .as_ref()
        .and_then(|f| f.bit_rate.as_deref())
        .and_then(|b| b.parse::<u64>().ok())
        .unwrap_or(0);

    let audio_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));
    let audio = audio_stream.map(|s| AudioMetadata {
        duration_ms: s
            .duration
            .as_deref()
            .and_then(parse_secs_to_ms)
            .or(format_duration_ms)
            .unwrap_or(0),
        channels: s.channels.unwrap_or(0),
        sample_rate: s
            .sample_rate
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or(0),
    });

    let video = parsed
        .streams
        .iter()
        .find(|s| {
            s.codec_type.as_deref() == Some("video")
                && s.disposition.as_ref().map_or(true, |d| d.attached_pic == 0)
        })
        .and_then(|s| {
            let width = s.width.filter(|w| *w > 0)?;
            let height = s.height.filter(|h| *h > 0)?;
            let frame_rate = s
                .avg_frame_rate
                .as_deref()
                .and_then(parse_ff_ratio)
                .or_else(|| s.r_frame_rate.as_deref().and_then(parse_ff_ratio))
                .unwrap_or(0.0);
            Some(VideoMetadata {
                duration_ms: format_duration_ms
                    .or_else(|| s.duration.as_deref().and_then(parse_secs_to_ms))
                    .unwrap_or(0),
                width,
                height,
                frame_rate,
                bitrate,
                codec: s.codec_name.clone().unwrap_or_default(),
                audio_channels: audio.as_ref().map_or(0, |a| a.channels),
                audio_sample_rate: audio.as_ref().map_or(0, |a| a.sample_rate),
            })
        });

    ProbeInfo { video, audio }
}

fn parse_secs_to_ms(s: &str) -> Option<i64> {
    let secs = s.parse::<f64>().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as i64)
}

/// Parse an ffmpeg rational such as `30000/1001`.
fn parse_ff_ratio(s: &str) -> Option<f64> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if a == 0 || b == 0 {
        return None;
    }
    Some(a as f64 / b as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_JSON: &str = r#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
             "r_frame_rate": "30/1", "avg_frame_rate": "30000/1001"},
            {"codec_type": "audio", "codec_name": "aac", "channels": 2, "sample_rate": "44100"}
        ],
        "format": {"duration": "12.345000", "bit_rate": "2500000"}
    }"#;

    const AUDIO_JSON: &str = r#"{
        "streams": [
            {"codec_type": "audio", "codec_name": "mp3", "channels": 1, "sample_rate": "48000",
             "duration": "3.5"},
            {"codec_type": "video", "codec_name": "mjpeg", "width": 500, "height": 500,
             "disposition": {"attached_pic": 1}}
        ],
        "format": {"duration": "3.5"}
    }"#;

    #[test]
    fn test_parse_video_probe() {
        let info = parse_probe(serde_json::from_str(VIDEO_JSON).unwrap());
        let video = info.video.unwrap();
        assert_eq!(video.duration_ms, 12_345);
        assert_eq!((video.width, video.height), (1280, 720));
        assert!((video.frame_rate - 29.97).abs() < 0.01);
        assert_eq!(video.bitrate, 2_500_000);
        assert_eq!(video.codec, "h264");
        assert_eq!(video.audio_channels, 2);
        assert_eq!(video.audio_sample_rate, 44_100);
    }

    #[test]
    fn test_cover_art_is_not_video() {
        let info = parse_probe(serde_json::from_str(AUDIO_JSON).unwrap());
        assert!(info.video.is_none());
        let audio = info.audio.unwrap();
        assert_eq!(audio.duration_ms, 3_500);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 48_000);
    }

    #[test]
    fn test_parse_ff_ratio() {
        assert_eq!(parse_ff_ratio("25/1"), Some(25.0));
        assert_eq!(parse_ff_ratio("0/0"), None);
        assert_eq!(parse_ff_ratio("abc"), None);
    }

    #[test]
    fn test_missing_file_is_invalid_file() {
        let err = probe(Path::new("/definitely/not/here.mp4")).unwrap_err();
        assert!(matches!(err, ClipforgeError::InvalidFile { .. }));
    }
}
