use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Segment not found: {0}")]
    SegmentNotFound(u32),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Time out of range: {0}")]
    TimeOutOfRange(f64),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
