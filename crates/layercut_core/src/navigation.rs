//! Section navigation: jumping the playhead between segment edges on one
//! layer.

use crate::types::{Segment, SegmentManager};

/// Frame for the "next section" command, or `None` when the playhead is
/// already on the last frame.
pub fn next_section_frame(timeline: &SegmentManager, current_frame: i64, layer: u32) -> Option<i64> {
    let last = timeline.total_frames - 1;
    if current_frame >= last {
        return None;
    }
    let time = current_frame as f64 / timeline.frame_rate;

    let next = match latest_start(timeline.get_all_by_time(time, layer, true, true)) {
        Some(current) if current_frame < current.end_frame => {
            return Some(clamp_frame(current.end_frame, timeline.total_frames));
        }
        Some(current) => timeline.get_next_segment(current),
        None => timeline.get_next_segment_by_time(time, layer),
    };

    let target = match next {
        None => last,
        Some(seg) if seg.start_frame > current_frame => seg.start_frame,
        Some(seg) => seg.end_frame,
    };
    Some(clamp_frame(target, timeline.total_frames))
}

/// Frame for the "previous section" command, or `None` at frame 0.
pub fn prev_section_frame(timeline: &SegmentManager, current_frame: i64, layer: u32) -> Option<i64> {
    if current_frame <= 0 {
        return None;
    }
    let time = current_frame as f64 / timeline.frame_rate;

    let prev = match earliest_start(timeline.get_all_by_time(time, layer, true, true)) {
        Some(current) if current_frame > current.start_frame => {
            return Some(clamp_frame(current.start_frame, timeline.total_frames));
        }
        Some(current) => timeline.get_prev_segment(current),
        None => timeline.get_prev_segment_by_time(time, layer),
    };

    let target = match prev {
        None => 0,
        Some(seg) if seg.end_frame < current_frame => seg.end_frame,
        Some(seg) => seg.start_frame,
    };
    Some(clamp_frame(target, timeline.total_frames))
}

/// Clamp to `[0, total_frames - 1]`.
pub fn clamp_frame(frame: i64, total_frames: i64) -> i64 {
    frame.clamp(0, (total_frames - 1).max(0))
}

// Ties keep the first segment in list order.
fn latest_start(segments: Vec<&Segment>) -> Option<&Segment> {
    let mut best: Option<&Segment> = None;
    for seg in segments {
        if best.map_or(true, |b| seg.start_frame > b.start_frame) {
            best = Some(seg);
        }
    }
    best
}

fn earliest_start(segments: Vec<&Segment>) -> Option<&Segment> {
    let mut best: Option<&Segment> = None;
    for seg in segments {
        if best.map_or(true, |b| seg.start_frame < b.start_frame) {
            best = Some(seg);
        }
    }
    best
}
