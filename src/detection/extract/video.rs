//! Video metadata and middle-frame extraction (ffprobe / ffmpeg)

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::detection::features::{ExtractError, FeatureMap};

/// Longest a single ffprobe or ffmpeg invocation may run
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u64>,
    height: Option<u64>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Container facts needed to pick and describe the middle frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub frames: u64,
    pub width: u64,
    pub height: u64,
    pub fps: f64,
    pub duration: f64,
}

impl VideoInfo {
    /// Timestamp of frame `frames / 2`
    pub fn middle_timestamp(&self) -> f64 {
        if self.fps > 0.0 && self.frames > 0 {
            (self.frames / 2) as f64 / self.fps
        } else {
            self.duration / 2.0
        }
    }
}

/// "30000/1001" → 29.97
fn parse_rate(rate: &str) -> f64 {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().unwrap_or(0.0);
            let den: f64 = den.parse().unwrap_or(0.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => rate.parse().unwrap_or(0.0),
    }
}

fn parse_probe(json: &[u8]) -> Result<VideoInfo, ExtractError> {
    let probe: ProbeOutput =
        serde_json::from_slice(json).map_err(|_| ExtractError::CannotOpenVideo)?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(ExtractError::CannotOpenVideo)?;

    let fps = stream.r_frame_rate.as_deref().map(parse_rate).unwrap_or(0.0);
    let duration = stream
        .duration
        .as_deref()
        .or_else(|| probe.format.as_ref().and_then(|f| f.duration.as_deref()))
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);
    let frames = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or_else(|| (duration * fps).round() as u64);

    Ok(VideoInfo {
        frames,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps,
        duration,
    })
}

/// Run `command` to completion within `limit`; the child is killed otherwise
async fn output_within(mut command: Command, limit: Duration) -> Result<Output, ExtractError> {
    command.stdin(Stdio::null()).kill_on_drop(true);
    let program = command.as_std().get_program().to_string_lossy().into_owned();

    match tokio::time::timeout(limit, command.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => {
            tracing::warn!("Failed to execute {}: {}", program, e);
            Err(ExtractError::CannotOpenVideo)
        }
        Err(_) => {
            tracing::warn!("{} did not finish within {:?}, killed", program, limit);
            Err(ExtractError::CannotOpenVideo)
        }
    }
}

async fn probe(path: &Path) -> Result<VideoInfo, ExtractError> {
    let mut command = Command::new("ffprobe");
    command
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path);

    let output = output_within(command, COMMAND_TIMEOUT).await?;
    if !output.status.success() {
        return Err(ExtractError::CannotOpenVideo);
    }
    parse_probe(&output.stdout)
}

/// `<dir>/<stem>_frame.jpg` next to the upload
pub fn frame_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    path.with_file_name(format!("{}_frame.jpg", stem))
}

/// Write the frame at `timestamp` seconds; `None` when ffmpeg cannot
async fn grab_frame(path: &Path, timestamp: f64) -> Option<PathBuf> {
    let target = frame_path(path);
    let mut command = Command::new("ffmpeg");
    command
        .args(["-hide_banner", "-loglevel", "error", "-y", "-ss"])
        .arg(format!("{:.3}", timestamp))
        .arg("-i")
        .arg(path)
        .args(["-frames:v", "1", "-q:v", "2"])
        .arg(&target);

    match output_within(command, COMMAND_TIMEOUT).await {
        Ok(output) if output.status.success() && target.is_file() => Some(target),
        Ok(output) => {
            tracing::debug!("ffmpeg frame grab exited with {}", output.status);
            None
        }
        Err(_) => None,
    }
}

/// Probe the container and save its middle frame as the derived medium.
/// A failed frame grab is not an error; the video itself is submitted.
pub async fn extract(path: &Path) -> Result<FeatureMap, ExtractError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(ExtractError::FileNotFound);
    }

    let info = probe(path).await?;
    let mut features = FeatureMap::new()
        .with_scalar("frames", info.frames as f64)
        .with_scalar("width", info.width as f64)
        .with_scalar("height", info.height as f64)
        .with_scalar("fps", info.fps)
        .with_scalar("duration", info.duration);

    if let Some(frame) = grab_frame(path, info.middle_timestamp()).await {
        tracing::debug!(frame = %frame.display(), "Extracted middle frame");
        features.set_derived_media(frame);
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {"codec_type": "audio", "sample_rate": "48000"},
            {"codec_type": "video", "width": 1920, "height": 1080,
             "r_frame_rate": "30000/1001", "nb_frames": "300", "duration": "10.01"}
        ],
        "format": {"duration": "10.05"}
    }"#;

    #[test]
    fn test_parse_probe() {
        let info = parse_probe(PROBE_JSON.as_bytes()).unwrap();
        assert_eq!(info.frames, 300);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.fps - 29.97).abs() < 0.01);
        assert!((info.middle_timestamp() - 150.0 / info.fps).abs() < 1e-9);
    }

    #[test]
    fn test_frame_count_from_duration() {
        let json = r#"{"streams": [{"codec_type": "video", "r_frame_rate": "25/1"}],
                       "format": {"duration": "4.0"}}"#;
        let info = parse_probe(json.as_bytes()).unwrap();
        assert_eq!(info.frames, 100);
        assert_eq!(info.middle_timestamp(), 2.0);
    }

    #[test]
    fn test_no_video_stream() {
        let json = r#"{"streams": [{"codec_type": "audio"}]}"#;
        assert_eq!(parse_probe(json.as_bytes()).unwrap_err(), ExtractError::CannotOpenVideo);
        assert_eq!(parse_probe(b"not json").unwrap_err(), ExtractError::CannotOpenVideo);
    }

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate("25/1"), 25.0);
        assert_eq!(parse_rate("0/0"), 0.0);
        assert_eq!(parse_rate("24"), 24.0);
    }

    #[test]
    fn test_frame_path_next_to_upload() {
        assert_eq!(
            frame_path(Path::new("/uploads/abc_clip.mp4")),
            PathBuf::from("/uploads/abc_clip_frame.jpg")
        );
    }

    #[tokio::test]
    async fn test_stuck_command_is_cut_off() {
        let mut command = Command::new("sleep");
        command.arg("5");

        let started = std::time::Instant::now();
        let err = output_within(command, Duration::from_millis(100)).await.unwrap_err();
        assert_eq!(err, ExtractError::CannotOpenVideo);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_missing_program_cannot_open() {
        let command = Command::new("definitely-not-an-installed-ffprobe");
        let err = output_within(command, COMMAND_TIMEOUT).await.unwrap_err();
        assert_eq!(err, ExtractError::CannotOpenVideo);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = extract(Path::new("/no/such/clip.mp4")).await.unwrap_err();
        assert_eq!(err.to_string(), "File not found");
    }

    #[tokio::test]
    async fn test_unreadable_video() {
        let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
        file.write_all(b"this is not a video container").unwrap();
        let err = extract(file.path()).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not open video file");
    }
}
