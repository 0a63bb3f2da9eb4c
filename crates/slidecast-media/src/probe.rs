//! FFprobe audio duration.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::warn;

use crate::error::{MediaError, MediaResult};

/// Duration used for slides without audio and whenever probing fails.
pub const DEFAULT_SLIDE_DURATION_SECS: f64 = 3.0;

/// Probe an audio file for its playback duration in seconds.
pub async fn probe_audio_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "FFprobe failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    parse_duration_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse ffprobe's single-value duration output.
pub fn parse_duration_output(raw: &str) -> MediaResult<f64> {
    let value = raw
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| MediaError::InvalidDuration(raw.to_string()))?;

    match value.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs > 0.0 => Ok(secs),
        _ => Err(MediaError::InvalidDuration(value.to_string())),
    }
}

/// Collapse a probe result to a usable duration.
pub fn duration_or_default(result: MediaResult<f64>, path: &Path) -> f64 {
    match result {
        Ok(secs) => secs,
        Err(e) => {
            warn!(
                "Duration probe failed for {}, using {:.1}s: {}",
                path.display(),
                DEFAULT_SLIDE_DURATION_SECS,
                e
            );
            DEFAULT_SLIDE_DURATION_SECS
        }
    }
}
