//! Editor settings.
//!
//! Loaded once at startup and handed to the editor and the exporter; nothing
//! reads settings from a global.

use crate::error::Result;
use crate::timecode::TimeFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const MAX_LAYERS: u32 = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Number of layers offered, 1..=MAX_LAYERS.
    pub layer_count: u32,
    /// Whether boundary edits drag a touching neighbour along.
    pub link_boundaries: bool,
    /// ffmpeg video encoder for exports.
    pub codec: String,
    pub output_extension: String,
    #[serde(with = "time_format_serde")]
    pub time_format: TimeFormat,
    /// Step used by the rewind / fast-forward commands.
    pub seek_step_seconds: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            layer_count: 3,
            link_boundaries: false,
            codec: "libx264".to_string(),
            output_extension: "mp4".to_string(),
            time_format: TimeFormat::default(),
            seek_step_seconds: 10.0,
        }
    }
}

impl EditorConfig {
    /// Load from a TOML file, falling back to defaults when it does not
    /// exist. Missing keys take their default values.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: EditorConfig = toml::from_str(&content)?;
        Ok(config.normalized())
    }

    /// Write as TOML, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Layer numbers currently offered, starting at 1.
    pub fn layers(&self) -> Vec<u32> {
        (1..=self.layer_count).collect()
    }

    pub fn normalized(mut self) -> Self {
        self.layer_count = self.layer_count.clamp(1, MAX_LAYERS);
        if !(self.seek_step_seconds.is_finite() && self.seek_step_seconds > 0.0) {
            self.seek_step_seconds = EditorConfig::default().seek_step_seconds;
        }
        if self.output_extension.is_empty() {
            self.output_extension = EditorConfig::default().output_extension;
        }
        self
    }
}

mod time_format_serde {
    use crate::timecode::TimeFormat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(format: &TimeFormat, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(format.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TimeFormat, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
