use layercut_core::timecode::{format_time, TimeFormat};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{RenderError, Result};
use crate::export::spawn_error;

/// Default name for a still of `frame`: `{video_stem}_{hh-mm-ss.sss}[{frame}].png`.
pub fn snapshot_file_name(video_path: &Path, frame: i64, frame_rate: f64) -> String {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let time = format_time(frame as f64 / frame_rate, TimeFormat::HoursDash);
    format!("{stem}_{time}[{frame}].png")
}

/// Write a single frame of `video_path` to `output_path` as an image.
pub fn extract_snapshot(
    video_path: &Path,
    frame: i64,
    frame_rate: f64,
    output_path: &Path,
) -> Result<PathBuf> {
    if !video_path.exists() {
        return Err(RenderError::FileNotFound(video_path.to_path_buf()));
    }
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).map_err(RenderError::Io)?;
    }

    let seconds = frame as f64 / frame_rate;
    let status = std::process::Command::new("ffmpeg")
        .args([
            "-y",
            "-ss",
            &format!("{seconds:.3}"),
            "-i",
            &video_path.to_string_lossy(),
            "-frames:v",
            "1",
            &output_path.to_string_lossy(),
        ])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map_err(spawn_error)?;

    if !status.success() {
        return Err(RenderError::FfmpegFailed(
            "snapshot extraction failed".into(),
        ));
    }
    info!(output = %output_path.display(), frame, "snapshot saved");
    Ok(output_path.to_path_buf())
}
