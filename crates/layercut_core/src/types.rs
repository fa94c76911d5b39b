use crate::error::CoreError;
use crate::media::MediaInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// A labeled `[start_frame, end_frame)` span on one layer.
///
/// The frame rate is copied from the owning [`SegmentManager`] so the
/// seconds accessors work without a back reference. No validation happens
/// here; `start_frame < end_frame` is kept by the editing layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: u32,
    pub layer: u32,
    pub title: String,
    pub start_frame: i64,
    pub end_frame: i64,
    pub frame_rate: f64,
}

impl Segment {
    pub fn new(
        frame_rate: f64,
        id: u32,
        layer: u32,
        title: impl Into<String>,
        start_frame: i64,
        end_frame: i64,
    ) -> Self {
        Self {
            id,
            layer,
            title: title.into(),
            start_frame,
            end_frame,
            frame_rate,
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_frame as f64 / self.frame_rate
    }

    pub fn end_time(&self) -> f64 {
        self.end_frame as f64 / self.frame_rate
    }

    /// Stores `round(seconds * frame_rate)`. Reading back is only exact up to
    /// half a frame.
    pub fn set_start_time(&mut self, seconds: f64) {
        self.start_frame = seconds_to_frame(seconds, self.frame_rate);
    }

    pub fn set_end_time(&mut self, seconds: f64) {
        self.end_frame = seconds_to_frame(seconds, self.frame_rate);
    }

    /// Real-time length in seconds.
    pub fn duration(&self) -> f64 {
        (self.end_frame - self.start_frame) as f64 / self.frame_rate
    }

    /// Whether `time` falls inside the span, with each edge's inclusivity
    /// chosen by the caller.
    pub fn contains(&self, time: f64, include_start: bool, include_end: bool) -> bool {
        let start = self.start_time();
        let end = self.end_time();
        let after_start = if include_start { start <= time } else { start < time };
        let before_end = if include_end { time <= end } else { time < end };
        after_start && before_end
    }

    /// Frame the playhead lands on when jumping to this segment.
    pub fn frame_at(&self, position: JumpPosition) -> i64 {
        match position {
            JumpPosition::Start => self.start_frame,
            JumpPosition::End => self.end_frame,
            JumpPosition::Middle => {
                let mid = (self.start_time() + self.end_time()) / 2.0;
                seconds_to_frame(mid, self.frame_rate)
            }
        }
    }

    pub fn to_record(&self) -> SegmentRecord {
        SegmentRecord {
            id: Some(self.id),
            layer: self.layer,
            title: self.title.clone(),
            start: self.start_time(),
            end: self.end_time(),
        }
    }
}

pub fn seconds_to_frame(seconds: f64, frame_rate: f64) -> i64 {
    (seconds * frame_rate).round() as i64
}

// ---------------------------------------------------------------------------
// JumpPosition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpPosition {
    Start,
    End,
    Middle,
}

impl FromStr for JumpPosition {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "start" | "s" => Ok(JumpPosition::Start),
            "end" | "e" => Ok(JumpPosition::End),
            "middle" | "m" => Ok(JumpPosition::Middle),
            other => Err(CoreError::InvalidOperation(format!(
                "unknown jump position: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Boundary
// ---------------------------------------------------------------------------

/// Which edge of a segment an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Start => write!(f, "start"),
            Boundary::End => write!(f, "end"),
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentManager
// ---------------------------------------------------------------------------

/// Ordered collection of segments for one media item.
///
/// Iteration order is insertion order until one of the explicit sort
/// operations is called. Overlap within a layer is not prevented here.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentManager {
    pub frame_rate: f64,
    pub total_frames: i64,
    pub(crate) items: Vec<Segment>,
}

// ---------------------------------------------------------------------------
// Project file records
// ---------------------------------------------------------------------------

/// One entry of `segment_list` in a saved project.
///
/// Older files used `segment_id`, `start_time` and `end_time`; those keys
/// are still accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    #[serde(default, alias = "segment_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default = "default_layer")]
    pub layer: u32,
    #[serde(default)]
    pub title: String,
    #[serde(alias = "start_time")]
    pub start: f64,
    #[serde(alias = "end_time")]
    pub end: f64,
}

fn default_layer() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub video_path: PathBuf,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    #[serde(default, alias = "segments")]
    pub segment_list: Vec<SegmentRecord>,
}

// ---------------------------------------------------------------------------
// VideoProject
// ---------------------------------------------------------------------------

/// A loaded media file, its output folder and its segments.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoProject {
    pub video_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub media: MediaInfo,
    pub segments: SegmentManager,
    pub file_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
