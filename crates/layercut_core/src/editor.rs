//! The Edit Controller: an Add/Edit state machine over a [`SegmentManager`].
//!
//! The editor owns the playhead, the active layer, the pending start point
//! and the selection. The timeline is passed into every call; the editor never
//! stores it. Every rejected operation returns an [`EditWarning`] and leaves
//! the timeline untouched.

use crate::config::EditorConfig;
use crate::error::CoreError;
use crate::media::ExportSegment;
use crate::navigation::{clamp_frame, next_section_frame, prev_section_frame};
use crate::timecode::parse_time;
use crate::types::*;
use thiserror::Error;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Mode / outcome / warning
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Add,
    Edit,
}

/// What a successful editor operation did.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    StartPointSet { frame: i64, moved: bool },
    StartPointCleared,
    SegmentAdded { id: u32, moved: bool },
    /// `linked` is the neighbour whose touching edge moved along.
    BoundaryMoved {
        id: u32,
        boundary: Boundary,
        frame: i64,
        linked: Option<u32>,
    },
    Seeked { frame: i64 },
    ModeChanged(Mode),
    Selected(Option<u32>),
    LayerChanged(u32),
    Renamed { id: u32, title: String },
    Deleted(u32),
    Cleared { removed: usize },
    Reindexed,
    Sorted,
}

/// Recoverable conditions reported to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditWarning {
    #[error("no free space available to set a start point")]
    NoFreeSpaceForStart,

    #[error("no free space available to set an end point")]
    NoFreeSpaceForEnd,

    #[error("start point must be set first")]
    StartNotSet,

    #[error("end point must be after start point")]
    EndBeforeStart,

    #[error("start point must be after segment {neighbour} begins")]
    CrossesPrevious { neighbour: u32 },

    #[error("end point must be before segment {neighbour} ends")]
    CrossesNext { neighbour: u32 },

    #[error("segment {0} not found")]
    SegmentNotFound(u32),

    #[error("no segment available to edit")]
    NoSegmentToEdit,

    #[error("invalid time format: {0}")]
    InvalidTime(String),

    #[error("time out of range: {0}")]
    TimeOutOfRange(f64),

    #[error("invalid boundary: {0}")]
    InvalidBoundary(String),

    #[error("no segments to export")]
    NothingToExport,
}

impl From<CoreError> for EditWarning {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SegmentNotFound(id) => EditWarning::SegmentNotFound(id),
            CoreError::InvalidTime(s) => EditWarning::InvalidTime(s),
            CoreError::TimeOutOfRange(t) => EditWarning::TimeOutOfRange(t),
            CoreError::InvalidOperation(msg) => EditWarning::InvalidBoundary(msg),
            other => EditWarning::InvalidBoundary(other.to_string()),
        }
    }
}

pub type EditResult = std::result::Result<EditOutcome, EditWarning>;

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Editor {
    config: EditorConfig,
    mode: Mode,
    current_frame: i64,
    layer: u32,
    pending_start: Option<i64>,
    selected: Option<u32>,
    link_boundaries: bool,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        let config = config.normalized();
        Self {
            link_boundaries: config.link_boundaries,
            config,
            mode: Mode::Add,
            current_frame: 0,
            layer: 1,
            pending_start: None,
            selected: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_frame(&self) -> i64 {
        self.current_frame
    }

    pub fn current_time(&self, timeline: &SegmentManager) -> f64 {
        self.current_frame as f64 / timeline.frame_rate
    }

    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn pending_start(&self) -> Option<i64> {
        self.pending_start
    }

    pub fn selected(&self) -> Option<u32> {
        self.selected
    }

    pub fn link_boundaries(&self) -> bool {
        self.link_boundaries
    }

    pub fn set_link_boundaries(&mut self, enabled: bool) {
        self.link_boundaries = enabled;
    }

    /// Signed seconds from the pending start to the playhead.
    pub fn pending_length(&self, timeline: &SegmentManager) -> Option<f64> {
        self.pending_start
            .map(|start| (self.current_frame - start) as f64 / timeline.frame_rate)
    }

    // -----------------------------------------------------------------------
    // Playhead
    // -----------------------------------------------------------------------

    pub fn seek_frame(&mut self, timeline: &SegmentManager, frame: i64) -> i64 {
        self.current_frame = clamp_frame(frame, timeline.total_frames);
        self.current_frame
    }

    pub fn seek_time(&mut self, timeline: &SegmentManager, seconds: f64) -> i64 {
        self.seek_frame(timeline, seconds_to_frame(seconds, timeline.frame_rate))
    }

    pub fn step_frames(&mut self, timeline: &SegmentManager, delta: i64) -> i64 {
        self.seek_frame(timeline, self.current_frame + delta)
    }

    pub fn seek_by_seconds(&mut self, timeline: &SegmentManager, delta: f64) -> i64 {
        let frames = seconds_to_frame(delta, timeline.frame_rate);
        self.step_frames(timeline, frames)
    }

    /// Move by the configured seek step, forward or back.
    pub fn seek_step(&mut self, timeline: &SegmentManager, forward: bool) -> i64 {
        let step = self.config.seek_step_seconds;
        self.seek_by_seconds(timeline, if forward { step } else { -step })
    }

    pub fn next_section(&mut self, timeline: &SegmentManager) -> Option<i64> {
        let frame = next_section_frame(timeline, self.current_frame, self.layer)?;
        self.current_frame = frame;
        Some(frame)
    }

    pub fn prev_section(&mut self, timeline: &SegmentManager) -> Option<i64> {
        let frame = prev_section_frame(timeline, self.current_frame, self.layer)?;
        self.current_frame = frame;
        Some(frame)
    }

    /// Jump to a segment edge. Without a position the start is used, or the
    /// end when the playhead already sits on the start.
    pub fn jump_to_segment(
        &mut self,
        timeline: &SegmentManager,
        id: u32,
        position: Option<JumpPosition>,
    ) -> EditResult {
        let Some(segment) = timeline.get_by_id(id) else {
            return self.stale(id);
        };
        let position = position.unwrap_or(if self.current_frame == segment.start_frame {
            JumpPosition::End
        } else {
            JumpPosition::Start
        });
        self.layer = segment.layer;
        let frame = self.seek_frame(timeline, segment.frame_at(position));
        Ok(EditOutcome::Seeked { frame })
    }

    // -----------------------------------------------------------------------
    // Layers and modes
    // -----------------------------------------------------------------------

    /// Switch the active layer, clamped to the configured count. A selection
    /// and a pending start belong to the old layer and are dropped.
    pub fn set_layer(&mut self, layer: u32) -> EditResult {
        let layer = layer.clamp(1, self.config.layer_count);
        if layer != self.layer {
            self.layer = layer;
            self.pending_start = None;
            self.deselect();
        }
        Ok(EditOutcome::LayerChanged(self.layer))
    }

    pub fn layer_up(&mut self) -> EditResult {
        self.set_layer(self.layer.saturating_sub(1))
    }

    pub fn layer_down(&mut self) -> EditResult {
        self.set_layer(self.layer + 1)
    }

    /// Enter Edit mode on the selected segment or the one under the playhead;
    /// with neither, stay in Add mode and warn.
    pub fn set_mode(&mut self, timeline: &SegmentManager, mode: Mode) -> EditResult {
        match mode {
            Mode::Add => {
                self.deselect();
                Ok(EditOutcome::ModeChanged(Mode::Add))
            }
            Mode::Edit => {
                let target = self
                    .selected
                    .and_then(|id| timeline.get_by_id(id))
                    .or_else(|| self.segment_under_playhead(timeline))
                    .map(|s| s.id);
                match target {
                    Some(id) => {
                        self.select(timeline, Some(id))?;
                        Ok(EditOutcome::ModeChanged(Mode::Edit))
                    }
                    None => {
                        self.deselect();
                        self.reject(EditWarning::NoSegmentToEdit)
                    }
                }
            }
        }
    }

    pub fn toggle_mode(&mut self, timeline: &SegmentManager) -> EditResult {
        let next = match self.mode {
            Mode::Add => Mode::Edit,
            Mode::Edit => Mode::Add,
        };
        self.set_mode(timeline, next)
    }

    /// Selecting a segment enters Edit mode on its layer; `None` returns to
    /// Add mode.
    pub fn select(&mut self, timeline: &SegmentManager, id: Option<u32>) -> EditResult {
        let Some(id) = id else {
            self.deselect();
            return Ok(EditOutcome::Selected(None));
        };
        let Some(segment) = timeline.get_by_id(id) else {
            self.deselect();
            return self.reject(EditWarning::SegmentNotFound(id));
        };
        self.layer = segment.layer;
        self.selected = Some(id);
        self.pending_start = None;
        self.mode = Mode::Edit;
        Ok(EditOutcome::Selected(Some(id)))
    }

    // -----------------------------------------------------------------------
    // Start / end points
    // -----------------------------------------------------------------------

    /// Add mode: set or clear the pending start. Edit mode: move the selected
    /// segment's start to the playhead.
    pub fn set_start_point(&mut self, timeline: &mut SegmentManager) -> EditResult {
        match self.mode {
            Mode::Add => self.set_new_start_point(timeline),
            Mode::Edit => {
                let id = self.edit_target()?;
                self.edit_start_point(timeline, id)
            }
        }
    }

    /// Add mode: close the pending start into a new segment. Edit mode: move
    /// the selected segment's end to the playhead.
    pub fn set_end_point(&mut self, timeline: &mut SegmentManager) -> EditResult {
        match self.mode {
            Mode::Add => self.set_new_end_point(timeline),
            Mode::Edit => {
                let id = self.edit_target()?;
                self.edit_end_point(timeline, id)
            }
        }
    }

    fn set_new_start_point(&mut self, timeline: &SegmentManager) -> EditResult {
        if self.pending_start.take().is_some() {
            info!("start point cleared");
            return Ok(EditOutcome::StartPointCleared);
        }

        let time = self.current_time(timeline);
        let Some(free) = timeline.get_next_free_time(time, self.layer) else {
            return self.reject(EditWarning::NoFreeSpaceForStart);
        };

        let frame = seconds_to_frame(free, timeline.frame_rate);
        let moved = frame != self.current_frame;
        if moved {
            self.current_frame = frame;
        }
        self.pending_start = Some(frame);
        info!(frame, layer = self.layer, moved, "start point set");
        Ok(EditOutcome::StartPointSet { frame, moved })
    }

    fn set_new_end_point(&mut self, timeline: &mut SegmentManager) -> EditResult {
        let Some(start_frame) = self.pending_start else {
            return self.reject(EditWarning::StartNotSet);
        };
        if self.current_frame <= start_frame {
            return self.reject(EditWarning::EndBeforeStart);
        }

        let time = self.current_time(timeline);
        let Some(free) = timeline.get_previous_free_time(time, self.layer) else {
            return self.reject(EditWarning::NoFreeSpaceForEnd);
        };
        let mut end_frame = seconds_to_frame(free, timeline.frame_rate);

        // Never span a segment that lies between the start and the playhead.
        if let Some(blocking) = timeline
            .iter()
            .filter(|s| s.layer == self.layer && s.start_frame >= start_frame)
            .map(|s| s.start_frame)
            .min()
        {
            end_frame = end_frame.min(blocking);
        }
        if end_frame <= start_frame {
            return self.reject(EditWarning::EndBeforeStart);
        }

        let id = timeline.append(self.layer, start_frame, end_frame, None).id;
        self.pending_start = None;
        let moved = end_frame != self.current_frame;
        if moved {
            self.current_frame = end_frame;
        }
        info!(id, layer = self.layer, start_frame, end_frame, "segment added");
        Ok(EditOutcome::SegmentAdded { id, moved })
    }

    /// Move segment `id`'s start to the playhead.
    ///
    /// The nearest segment ending at or before the old start may not be
    /// crossed. If it now overlaps, or it touched the old start while linked
    /// boundaries are on, its end follows the new start.
    pub fn edit_start_point(&mut self, timeline: &mut SegmentManager, id: u32) -> EditResult {
        let Some(segment) = timeline.get_by_id(id) else {
            return self.stale(id);
        };
        let old_start = segment.start_frame;
        let frame = self.current_frame;
        let neighbour = timeline
            .get_segments_before_time(segment.start_time(), segment.layer)
            .into_iter()
            .rev()
            .find(|s| s.id != id)
            .map(|s| (s.id, s.start_frame, s.end_frame));

        if let Some((neighbour, n_start, _)) = neighbour {
            if frame <= n_start {
                return self.reject(EditWarning::CrossesPrevious { neighbour });
            }
        }
        if let Err(err) = timeline.set_start_frame(id, frame) {
            return self.reject(err.into());
        }

        let mut linked = None;
        if let Some((n_id, _, n_end)) = neighbour {
            if n_end > frame || (self.link_boundaries && n_end == old_start) {
                timeline.set_end_frame(n_id, frame)?;
                linked = Some(n_id);
            }
        }
        info!(id, frame, ?linked, "start point moved");
        Ok(EditOutcome::BoundaryMoved {
            id,
            boundary: Boundary::Start,
            frame,
            linked,
        })
    }

    /// Move segment `id`'s end to the playhead. Mirror of
    /// [`Editor::edit_start_point`] against the nearest segment starting at
    /// or after the old end.
    pub fn edit_end_point(&mut self, timeline: &mut SegmentManager, id: u32) -> EditResult {
        let Some(segment) = timeline.get_by_id(id) else {
            return self.stale(id);
        };
        let old_end = segment.end_frame;
        let frame = self.current_frame;
        let neighbour = timeline
            .get_segments_after_time(segment.end_time(), segment.layer)
            .into_iter()
            .find(|s| s.id != id)
            .map(|s| (s.id, s.start_frame, s.end_frame));

        if let Some((neighbour, _, n_end)) = neighbour {
            if frame >= n_end {
                return self.reject(EditWarning::CrossesNext { neighbour });
            }
        }
        if let Err(err) = timeline.set_end_frame(id, frame) {
            return self.reject(err.into());
        }

        let mut linked = None;
        if let Some((n_id, n_start, _)) = neighbour {
            if n_start < frame || (self.link_boundaries && n_start == old_end) {
                timeline.set_start_frame(n_id, frame)?;
                linked = Some(n_id);
            }
        }
        info!(id, frame, ?linked, "end point moved");
        Ok(EditOutcome::BoundaryMoved {
            id,
            boundary: Boundary::End,
            frame,
            linked,
        })
    }

    // -----------------------------------------------------------------------
    // Segment list operations
    // -----------------------------------------------------------------------

    /// Retime one boundary from user-entered text.
    pub fn update_segment_time(
        &mut self,
        timeline: &mut SegmentManager,
        id: u32,
        boundary: Boundary,
        input: &str,
    ) -> EditResult {
        if timeline.get_by_id(id).is_none() {
            return self.stale(id);
        }
        let seconds = match parse_time(input) {
            Ok(seconds) => seconds,
            Err(err) => return self.reject(err.into()),
        };
        let result = match boundary {
            Boundary::Start => timeline.set_start_time(id, seconds),
            Boundary::End => timeline.set_end_time(id, seconds),
        };
        if let Err(err) = result {
            return self.reject(err.into());
        }
        let frame = seconds_to_frame(seconds, timeline.frame_rate);
        info!(id, %boundary, frame, "segment retimed");
        Ok(EditOutcome::BoundaryMoved {
            id,
            boundary,
            frame,
            linked: None,
        })
    }

    pub fn rename_segment(&mut self, timeline: &mut SegmentManager, id: u32, title: &str) -> EditResult {
        if timeline.get_by_id(id).is_none() {
            return self.stale(id);
        }
        let title = timeline.rename(id, title)?.to_string();
        info!(id, %title, "segment renamed");
        Ok(EditOutcome::Renamed { id, title })
    }

    pub fn delete_segment(&mut self, timeline: &mut SegmentManager, id: u32) -> EditResult {
        if timeline.remove_by_id(id).is_none() {
            return self.stale(id);
        }
        if self.selected == Some(id) {
            self.deselect();
        }
        info!(id, "segment deleted");
        Ok(EditOutcome::Deleted(id))
    }

    /// Remove every segment, or only those on `layers`.
    pub fn clear(&mut self, timeline: &mut SegmentManager, layers: Option<&[u32]>) -> EditResult {
        let before = timeline.len();
        timeline.clear(layers);
        let removed = before - timeline.len();

        self.pending_start = None;
        if let Some(id) = self.selected {
            if timeline.get_by_id(id).is_none() {
                self.deselect();
            }
        }
        info!(removed, "segments cleared");
        Ok(EditOutcome::Cleared { removed })
    }

    /// Renumber ids. Old ids go stale, so the selection is dropped.
    pub fn reindex(&mut self, timeline: &mut SegmentManager) -> EditResult {
        timeline.reindex();
        self.deselect();
        info!(count = timeline.len(), "segments reindexed");
        Ok(EditOutcome::Reindexed)
    }

    pub fn sort_by_title(&mut self, timeline: &mut SegmentManager) -> EditResult {
        timeline.sort_by_title();
        Ok(EditOutcome::Sorted)
    }

    pub fn sort_by_start_time(&mut self, timeline: &mut SegmentManager) -> EditResult {
        timeline.sort_by_start_time();
        Ok(EditOutcome::Sorted)
    }

    // -----------------------------------------------------------------------
    // Export targets
    // -----------------------------------------------------------------------

    /// Owned copies of the segments to export: the active layer, or every
    /// configured layer.
    pub fn export_targets(
        &self,
        timeline: &SegmentManager,
        all_layers: bool,
    ) -> std::result::Result<Vec<ExportSegment>, EditWarning> {
        let layers = if all_layers {
            self.config.layers()
        } else {
            vec![self.layer]
        };
        let targets: Vec<ExportSegment> = timeline
            .filter_by_layers(&layers)
            .into_iter()
            .map(ExportSegment::from)
            .collect();
        if targets.is_empty() {
            return self.reject(EditWarning::NothingToExport);
        }
        Ok(targets)
    }

    /// The selected segment, or the one under the playhead.
    pub fn export_single_target(
        &self,
        timeline: &SegmentManager,
    ) -> std::result::Result<ExportSegment, EditWarning> {
        let segment = match self.selected {
            Some(id) => timeline.get_by_id(id),
            None => self.segment_under_playhead(timeline),
        };
        match segment {
            Some(segment) => Ok(ExportSegment::from(segment)),
            None => self.reject(EditWarning::NothingToExport),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn segment_under_playhead<'a>(&self, timeline: &'a SegmentManager) -> Option<&'a Segment> {
        let time = self.current_time(timeline);
        timeline
            .get_by_time(time, self.layer, true, false)
            .or_else(|| timeline.get_by_time(time, self.layer, false, true))
    }

    fn edit_target(&mut self) -> std::result::Result<u32, EditWarning> {
        match self.selected {
            Some(id) => Ok(id),
            None => {
                self.mode = Mode::Add;
                self.reject(EditWarning::NoSegmentToEdit)
            }
        }
    }

    fn deselect(&mut self) {
        self.selected = None;
        self.mode = Mode::Add;
    }

    /// Lookup failure; a stale selection is cleared.
    fn stale<T>(&mut self, id: u32) -> std::result::Result<T, EditWarning> {
        if self.selected == Some(id) {
            warn!(id, "selected segment no longer exists");
            self.deselect();
        }
        self.reject(EditWarning::SegmentNotFound(id))
    }

    fn reject<T>(&self, warning: EditWarning) -> std::result::Result<T, EditWarning> {
        warn!(%warning, "edit rejected");
        Err(warning)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_editor() -> Editor {
        Editor::new(EditorConfig::default())
    }

    /// 30 fps, 10 s. Layer 1: #1 [30, 90), #2 [90, 150), #3 [200, 250).
    fn make_timeline() -> SegmentManager {
        let mut tl = SegmentManager::new(30.0, 300);
        tl.append(1, 30, 90, None);
        tl.append(1, 90, 150, None);
        tl.append(1, 200, 250, None);
        tl
    }

    fn frames(tl: &SegmentManager, id: u32) -> (i64, i64) {
        let seg = tl.get_by_id(id).unwrap();
        (seg.start_frame, seg.end_frame)
    }

    // -----------------------------------------------------------------------
    // Add mode
    // -----------------------------------------------------------------------

    #[test]
    fn add_mode_creates_segment() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);

        ed.seek_frame(&tl, 30);
        assert_eq!(
            ed.set_start_point(&mut tl),
            Ok(EditOutcome::StartPointSet { frame: 30, moved: false })
        );
        assert_eq!(ed.pending_start(), Some(30));

        ed.seek_frame(&tl, 90);
        assert_eq!(
            ed.set_end_point(&mut tl),
            Ok(EditOutcome::SegmentAdded { id: 1, moved: false })
        );
        assert_eq!(ed.pending_start(), None);
        assert_eq!(tl.len(), 1);
        assert_eq!(frames(&tl, 1), (30, 90));
        assert_eq!(tl.get_by_id(1).unwrap().title, "part001");
    }

    #[test]
    fn start_point_snaps_to_next_free_time() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);
        tl.append(1, 0, 60, None);

        ed.seek_frame(&tl, 30);
        assert_eq!(
            ed.set_start_point(&mut tl),
            Ok(EditOutcome::StartPointSet { frame: 60, moved: true })
        );
        assert_eq!(ed.current_frame(), 60);
    }

    #[test]
    fn start_point_toggles_off() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);
        ed.set_start_point(&mut tl).unwrap();
        assert_eq!(ed.set_start_point(&mut tl), Ok(EditOutcome::StartPointCleared));
        assert_eq!(ed.pending_start(), None);
    }

    #[test]
    fn start_point_without_free_space() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);
        tl.append(1, 0, 300, None);

        ed.seek_frame(&tl, 100);
        assert_eq!(
            ed.set_start_point(&mut tl),
            Err(EditWarning::NoFreeSpaceForStart)
        );
        assert_eq!(ed.pending_start(), None);
        assert_eq!(ed.current_frame(), 100);
    }

    #[test]
    fn end_point_requires_start_before_playhead() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);
        assert_eq!(ed.set_end_point(&mut tl), Err(EditWarning::StartNotSet));

        ed.seek_frame(&tl, 90);
        ed.set_start_point(&mut tl).unwrap();
        ed.seek_frame(&tl, 60);
        assert_eq!(ed.set_end_point(&mut tl), Err(EditWarning::EndBeforeStart));
        ed.seek_frame(&tl, 90);
        assert_eq!(ed.set_end_point(&mut tl), Err(EditWarning::EndBeforeStart));
        assert_eq!(ed.pending_start(), Some(90));
        assert!(tl.is_empty());
    }

    #[test]
    fn end_point_snaps_back_to_previous_free_time() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);
        tl.append(1, 150, 200, None);

        ed.seek_frame(&tl, 30);
        ed.set_start_point(&mut tl).unwrap();
        ed.seek_frame(&tl, 170);
        assert_eq!(
            ed.set_end_point(&mut tl),
            Ok(EditOutcome::SegmentAdded { id: 2, moved: true })
        );
        assert_eq!(frames(&tl, 2), (30, 150));
        assert_eq!(ed.current_frame(), 150);
    }

    #[test]
    fn end_point_never_spans_existing_segment() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);
        tl.append(1, 100, 120, None);

        ed.seek_frame(&tl, 30);
        ed.set_start_point(&mut tl).unwrap();
        ed.seek_frame(&tl, 200);
        ed.set_end_point(&mut tl).unwrap();
        assert_eq!(frames(&tl, 2), (30, 100));
        assert_eq!(ed.current_frame(), 100);
    }

    #[test]
    fn other_layers_do_not_block() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);
        tl.append(2, 0, 300, None);

        ed.seek_frame(&tl, 30);
        ed.set_start_point(&mut tl).unwrap();
        ed.seek_frame(&tl, 60);
        ed.set_end_point(&mut tl).unwrap();
        assert_eq!(tl.filter_by_layers(&[1]).len(), 1);
    }

    // -----------------------------------------------------------------------
    // Edit mode
    // -----------------------------------------------------------------------

    #[test]
    fn edit_end_shrinks_without_link() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        ed.select(&tl, Some(1)).unwrap();
        ed.seek_frame(&tl, 60);

        let outcome = ed.set_end_point(&mut tl).unwrap();
        assert_eq!(
            outcome,
            EditOutcome::BoundaryMoved {
                id: 1,
                boundary: Boundary::End,
                frame: 60,
                linked: None
            }
        );
        assert_eq!(frames(&tl, 1), (30, 60));
        assert_eq!(frames(&tl, 2), (90, 150));
    }

    #[test]
    fn edit_end_with_link_drags_touching_neighbour() {
        let mut ed = make_editor();
        ed.set_link_boundaries(true);
        let mut tl = make_timeline();
        ed.select(&tl, Some(1)).unwrap();
        ed.seek_frame(&tl, 60);

        let outcome = ed.set_end_point(&mut tl).unwrap();
        assert!(matches!(
            outcome,
            EditOutcome::BoundaryMoved { linked: Some(2), .. }
        ));
        assert_eq!(frames(&tl, 1), (30, 60));
        assert_eq!(frames(&tl, 2), (60, 150));
    }

    #[test]
    fn edit_end_into_neighbour_pushes_its_start() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        ed.select(&tl, Some(1)).unwrap();
        ed.seek_frame(&tl, 120);

        ed.set_end_point(&mut tl).unwrap();
        assert_eq!(frames(&tl, 1), (30, 120));
        assert_eq!(frames(&tl, 2), (120, 150));
    }

    #[test]
    fn edit_end_cannot_cross_next_segment() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        ed.select(&tl, Some(1)).unwrap();
        ed.seek_frame(&tl, 150);

        assert_eq!(
            ed.set_end_point(&mut tl),
            Err(EditWarning::CrossesNext { neighbour: 2 })
        );
        assert_eq!(tl, make_timeline());
    }

    #[test]
    fn edit_start_into_neighbour_pulls_its_end() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        ed.select(&tl, Some(2)).unwrap();
        ed.seek_frame(&tl, 60);

        let outcome = ed.set_start_point(&mut tl).unwrap();
        assert!(matches!(
            outcome,
            EditOutcome::BoundaryMoved { id: 2, boundary: Boundary::Start, frame: 60, linked: Some(1) }
        ));
        assert_eq!(frames(&tl, 2), (60, 150));
        assert_eq!(frames(&tl, 1), (30, 60));
    }

    #[test]
    fn edit_start_cannot_cross_previous_segment() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        ed.select(&tl, Some(2)).unwrap();
        ed.seek_frame(&tl, 30);

        assert_eq!(
            ed.set_start_point(&mut tl),
            Err(EditWarning::CrossesPrevious { neighbour: 1 })
        );
        assert_eq!(tl, make_timeline());
    }

    #[test]
    fn edit_start_forward_follows_link_setting() {
        let mut tl = make_timeline();
        let mut ed = make_editor();
        ed.select(&tl, Some(2)).unwrap();
        ed.seek_frame(&tl, 120);
        ed.set_start_point(&mut tl).unwrap();
        assert_eq!(frames(&tl, 2), (120, 150));
        assert_eq!(frames(&tl, 1), (30, 90));

        let mut tl = make_timeline();
        ed.set_link_boundaries(true);
        ed.select(&tl, Some(2)).unwrap();
        ed.set_start_point(&mut tl).unwrap();
        assert_eq!(frames(&tl, 2), (120, 150));
        assert_eq!(frames(&tl, 1), (30, 120));
    }

    #[test]
    fn link_only_reaches_immediate_neighbour() {
        let mut tl = SegmentManager::new(30.0, 300);
        tl.append(1, 0, 30, None);
        tl.append(1, 30, 60, None);
        tl.append(1, 60, 90, None);
        let mut ed = make_editor();
        ed.set_link_boundaries(true);
        ed.select(&tl, Some(3)).unwrap();
        ed.seek_frame(&tl, 45);

        ed.set_start_point(&mut tl).unwrap();
        assert_eq!(frames(&tl, 3), (45, 90));
        assert_eq!(frames(&tl, 2), (30, 45));
        assert_eq!(frames(&tl, 1), (0, 30));
    }

    #[test]
    fn edit_start_past_own_end_is_rejected() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        ed.select(&tl, Some(3)).unwrap();
        ed.seek_frame(&tl, 260);

        assert!(matches!(
            ed.set_start_point(&mut tl),
            Err(EditWarning::InvalidBoundary(_))
        ));
        assert_eq!(tl, make_timeline());
    }

    #[test]
    fn stale_selection_is_cleared() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        ed.select(&tl, Some(2)).unwrap();
        tl.remove_by_id(2);

        assert_eq!(
            ed.set_start_point(&mut tl),
            Err(EditWarning::SegmentNotFound(2))
        );
        assert_eq!(ed.selected(), None);
        assert_eq!(ed.mode(), Mode::Add);
    }

    // -----------------------------------------------------------------------
    // Mode transitions
    // -----------------------------------------------------------------------

    #[test]
    fn edit_mode_picks_segment_under_playhead() {
        let mut ed = make_editor();
        let tl = make_timeline();
        ed.seek_frame(&tl, 100);
        assert_eq!(
            ed.set_mode(&tl, Mode::Edit),
            Ok(EditOutcome::ModeChanged(Mode::Edit))
        );
        assert_eq!(ed.selected(), Some(2));

        // On a shared boundary the segment starting there wins.
        ed.set_mode(&tl, Mode::Add).unwrap();
        ed.seek_frame(&tl, 90);
        ed.set_mode(&tl, Mode::Edit).unwrap();
        assert_eq!(ed.selected(), Some(2));
    }

    #[test]
    fn edit_mode_without_segment_falls_back_to_add() {
        let mut ed = make_editor();
        let tl = make_timeline();
        ed.seek_frame(&tl, 170);
        assert_eq!(ed.set_mode(&tl, Mode::Edit), Err(EditWarning::NoSegmentToEdit));
        assert_eq!(ed.mode(), Mode::Add);
    }

    #[test]
    fn selecting_switches_modes() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        tl.append(2, 0, 30, None);

        ed.select(&tl, Some(4)).unwrap();
        assert_eq!(ed.mode(), Mode::Edit);
        assert_eq!(ed.layer(), 2);

        ed.select(&tl, None).unwrap();
        assert_eq!(ed.mode(), Mode::Add);

        assert_eq!(ed.select(&tl, Some(99)), Err(EditWarning::SegmentNotFound(99)));
        assert_eq!(ed.mode(), Mode::Add);
        assert_eq!(ed.selected(), None);
    }

    #[test]
    fn toggle_mode_round_trip() {
        let mut ed = make_editor();
        let tl = make_timeline();
        ed.seek_frame(&tl, 40);
        assert_eq!(ed.toggle_mode(&tl), Ok(EditOutcome::ModeChanged(Mode::Edit)));
        assert_eq!(ed.toggle_mode(&tl), Ok(EditOutcome::ModeChanged(Mode::Add)));
        assert_eq!(ed.selected(), None);
    }

    #[test]
    fn deleting_selected_returns_to_add_mode() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        ed.select(&tl, Some(2)).unwrap();
        assert_eq!(ed.delete_segment(&mut tl, 2), Ok(EditOutcome::Deleted(2)));
        assert_eq!(ed.selected(), None);
        assert_eq!(ed.mode(), Mode::Add);
        assert_eq!(ed.delete_segment(&mut tl, 2), Err(EditWarning::SegmentNotFound(2)));
    }

    #[test]
    fn reindex_forces_add_mode() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        tl.remove_by_id(1);
        ed.select(&tl, Some(3)).unwrap();

        assert_eq!(ed.reindex(&mut tl), Ok(EditOutcome::Reindexed));
        assert_eq!(ed.mode(), Mode::Add);
        assert_eq!(ed.selected(), None);
        assert_eq!(frames(&tl, 2), (200, 250));
    }

    #[test]
    fn clear_drops_removed_selection() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        tl.append(2, 0, 30, None);
        ed.select(&tl, Some(4)).unwrap();

        assert_eq!(ed.clear(&mut tl, Some(&[1])), Ok(EditOutcome::Cleared { removed: 3 }));
        assert_eq!(ed.selected(), Some(4));

        ed.clear(&mut tl, None).unwrap();
        assert_eq!(ed.selected(), None);
        assert!(tl.is_empty());
    }

    // -----------------------------------------------------------------------
    // Layers
    // -----------------------------------------------------------------------

    #[test]
    fn layer_changes_are_clamped_and_drop_selection() {
        let mut ed = make_editor();
        let tl = make_timeline();
        ed.select(&tl, Some(1)).unwrap();

        assert_eq!(ed.set_layer(7), Ok(EditOutcome::LayerChanged(3)));
        assert_eq!(ed.selected(), None);
        assert_eq!(ed.mode(), Mode::Add);

        ed.layer_down().unwrap();
        assert_eq!(ed.layer(), 3);
        ed.layer_up().unwrap();
        assert_eq!(ed.layer(), 2);
        ed.set_layer(0).unwrap();
        assert_eq!(ed.layer(), 1);
        ed.layer_up().unwrap();
        assert_eq!(ed.layer(), 1);
    }

    #[test]
    fn layer_change_clears_pending_start() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);
        ed.set_start_point(&mut tl).unwrap();
        ed.layer_down().unwrap();
        assert_eq!(ed.pending_start(), None);
    }

    // -----------------------------------------------------------------------
    // Playhead
    // -----------------------------------------------------------------------

    #[test]
    fn seeking_is_clamped() {
        let mut ed = make_editor();
        let tl = make_timeline();
        assert_eq!(ed.seek_frame(&tl, 500), 299);
        assert_eq!(ed.seek_frame(&tl, -3), 0);
        assert_eq!(ed.seek_time(&tl, 2.5), 75);
        assert_eq!(ed.step_frames(&tl, -5), 70);
        assert_eq!(ed.seek_by_seconds(&tl, 1.0), 100);
        assert_eq!(ed.seek_step(&tl, true), 299);
        assert_eq!(ed.seek_step(&tl, false), 0);
    }

    #[test]
    fn section_navigation_moves_playhead() {
        let mut ed = make_editor();
        let tl = make_timeline();
        assert_eq!(ed.next_section(&tl), Some(30));
        assert_eq!(ed.next_section(&tl), Some(90));
        assert_eq!(ed.prev_section(&tl), Some(30));
        assert_eq!(ed.current_frame(), 30);
    }

    #[test]
    fn jump_to_segment_positions() {
        let mut ed = make_editor();
        let tl = make_timeline();
        assert_eq!(
            ed.jump_to_segment(&tl, 2, None),
            Ok(EditOutcome::Seeked { frame: 90 })
        );
        assert_eq!(
            ed.jump_to_segment(&tl, 2, None),
            Ok(EditOutcome::Seeked { frame: 150 })
        );
        assert_eq!(
            ed.jump_to_segment(&tl, 2, Some(JumpPosition::Middle)),
            Ok(EditOutcome::Seeked { frame: 120 })
        );
        assert_eq!(
            ed.jump_to_segment(&tl, 9, None),
            Err(EditWarning::SegmentNotFound(9))
        );
    }

    #[test]
    fn pending_length_is_signed() {
        let mut ed = make_editor();
        let mut tl = SegmentManager::new(30.0, 300);
        assert_eq!(ed.pending_length(&tl), None);
        ed.seek_frame(&tl, 60);
        ed.set_start_point(&mut tl).unwrap();
        ed.seek_frame(&tl, 120);
        assert_eq!(ed.pending_length(&tl), Some(2.0));
        ed.seek_frame(&tl, 30);
        assert_eq!(ed.pending_length(&tl), Some(-1.0));
    }

    // -----------------------------------------------------------------------
    // Retime / rename
    // -----------------------------------------------------------------------

    #[test]
    fn update_segment_time_parses_and_validates() {
        let mut ed = make_editor();
        let mut tl = make_timeline();

        ed.update_segment_time(&mut tl, 1, Boundary::Start, "00:00:00.5")
            .unwrap();
        assert_eq!(frames(&tl, 1), (15, 90));

        assert!(matches!(
            ed.update_segment_time(&mut tl, 1, Boundary::End, "abc"),
            Err(EditWarning::InvalidTime(_))
        ));
        assert!(matches!(
            ed.update_segment_time(&mut tl, 1, Boundary::End, "00:20"),
            Err(EditWarning::TimeOutOfRange(_))
        ));
        assert!(matches!(
            ed.update_segment_time(&mut tl, 1, Boundary::End, "0.2"),
            Err(EditWarning::InvalidBoundary(_))
        ));
        assert_eq!(
            ed.update_segment_time(&mut tl, 42, Boundary::End, "1"),
            Err(EditWarning::SegmentNotFound(42))
        );
        assert_eq!(frames(&tl, 1), (15, 90));
    }

    #[test]
    fn rename_segment_sanitizes() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        assert_eq!(
            ed.rename_segment(&mut tl, 2, "verse: one"),
            Ok(EditOutcome::Renamed { id: 2, title: "verse one".into() })
        );
        assert_eq!(
            ed.rename_segment(&mut tl, 2, "?"),
            Ok(EditOutcome::Renamed { id: 2, title: "part002".into() })
        );
    }

    #[test]
    fn sorting_keeps_ids() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        tl.rename(1, "z").unwrap();
        ed.sort_by_title(&mut tl).unwrap();
        assert_eq!(tl.items()[2].id, 1);
        ed.sort_by_start_time(&mut tl).unwrap();
        assert_eq!(tl.items()[0].id, 1);
    }

    // -----------------------------------------------------------------------
    // Export targets
    // -----------------------------------------------------------------------

    #[test]
    fn export_targets_by_layer() {
        let mut ed = make_editor();
        let mut tl = make_timeline();
        tl.append(2, 0, 30, None);
        tl.append(5, 0, 30, None);

        assert_eq!(ed.export_targets(&tl, false).unwrap().len(), 3);
        // Layer 5 is outside the configured three layers.
        assert_eq!(ed.export_targets(&tl, true).unwrap().len(), 4);

        ed.set_layer(3).unwrap();
        assert_eq!(ed.export_targets(&tl, false), Err(EditWarning::NothingToExport));
    }

    #[test]
    fn export_single_target_uses_selection_then_playhead() {
        let mut ed = make_editor();
        let tl = make_timeline();

        ed.seek_frame(&tl, 210);
        assert_eq!(ed.export_single_target(&tl).unwrap().id, 3);

        ed.select(&tl, Some(1)).unwrap();
        assert_eq!(ed.export_single_target(&tl).unwrap().id, 1);

        ed.select(&tl, None).unwrap();
        ed.seek_frame(&tl, 170);
        assert_eq!(ed.export_single_target(&tl), Err(EditWarning::NothingToExport));
    }

    #[test]
    fn config_sets_initial_link_state() {
        let config = EditorConfig {
            link_boundaries: true,
            ..EditorConfig::default()
        };
        assert!(Editor::new(config).link_boundaries());
        assert!(!make_editor().link_boundaries());
    }
}
