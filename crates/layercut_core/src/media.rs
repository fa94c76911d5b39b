//! Interfaces to the media collaborators: something that can report a
//! video's frame rate and length, and something that can write segments out
//! as separate files.

use crate::error::Result;
use crate::types::Segment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What the timeline needs to know about the loaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub frame_rate: f64,
    pub total_frames: i64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
}

impl MediaInfo {
    pub fn new(frame_rate: f64, total_frames: i64) -> Self {
        Self {
            frame_rate,
            total_frames,
            width: 0,
            height: 0,
            codec: String::new(),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.frame_rate > 0.0 {
            self.total_frames as f64 / self.frame_rate
        } else {
            0.0
        }
    }
}

/// Reads [`MediaInfo`] from a media file.
pub trait MediaProbe {
    fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// An owned copy of a segment taken when an export starts, so the timeline
/// can keep changing while the export runs elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSegment {
    pub id: u32,
    pub layer: u32,
    pub title: String,
    pub start_frame: i64,
    pub end_frame: i64,
    pub frame_rate: f64,
}

impl ExportSegment {
    pub fn start_seconds(&self) -> f64 {
        self.start_frame as f64 / self.frame_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.end_frame - self.start_frame) as f64 / self.frame_rate
    }
}

impl From<&Segment> for ExportSegment {
    fn from(segment: &Segment) -> Self {
        Self {
            id: segment.id,
            layer: segment.layer,
            title: segment.title.clone(),
            start_frame: segment.start_frame,
            end_frame: segment.end_frame,
            frame_rate: segment.frame_rate,
        }
    }
}

/// Writes one output file per segment.
///
/// `progress` is called with `(completed, total)`. Files already written
/// when a later one fails are left on disk.
pub trait ExportSink {
    fn export(
        &self,
        video_path: &Path,
        segments: &[ExportSegment],
        output_dir: &Path,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<PathBuf>>;
}
