use layercut_core::error::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to execute ffprobe: {0}")]
    FfprobeExec(String),

    #[error("ffprobe failed: {0}")]
    FfprobeFailed(String),

    #[error("ffmpeg not found")]
    FfmpegNotFound,

    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),

    #[error("no segments to export")]
    NoSegments,

    #[error("no video stream with a usable frame rate: {0}")]
    InvalidMedia(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for CoreError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Io(e) => CoreError::Io(e),
            RenderError::Json(e) => CoreError::Json(e),
            e @ (RenderError::FileNotFound(_)
            | RenderError::FfprobeExec(_)
            | RenderError::FfprobeFailed(_)
            | RenderError::InvalidMedia(_)) => CoreError::Media(e.to_string()),
            e => CoreError::Export(e.to_string()),
        }
    }
}
