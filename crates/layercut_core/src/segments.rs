use crate::error::{CoreError, Result};
use crate::timecode::sanitize_title;
use crate::types::*;
use std::cmp::Ordering;
use tracing::debug;

/// Largest id a loaded project may carry. Keeps `max + 1` in `append` from
/// overflowing.
pub const MAX_SEGMENT_ID: u32 = i32::MAX as u32;

/// Auto-generated title for the `position`-th segment of a layer (1-based).
pub fn default_title(position: usize) -> String {
    format!("part{position:03}")
}

impl SegmentManager {
    pub fn new(frame_rate: f64, total_frames: i64) -> Self {
        Self {
            frame_rate,
            total_frames,
            items: Vec::new(),
        }
    }

    /// Rebuild a manager from saved records. Records without an id get
    /// `max + 1`, records without a title get `partNNN`. Ids above
    /// [`MAX_SEGMENT_ID`] are rejected.
    pub fn from_records(
        frame_rate: f64,
        total_frames: i64,
        records: Vec<SegmentRecord>,
    ) -> Result<Self> {
        let mut manager = Self::new(frame_rate, total_frames);
        for record in records {
            let id = match record.id {
                Some(id) if id > MAX_SEGMENT_ID => {
                    return Err(CoreError::InvalidOperation(format!(
                        "segment id {id} exceeds {MAX_SEGMENT_ID}"
                    )));
                }
                Some(id) => id,
                None => manager.get_max_list_index() + 1,
            };
            let title = if record.title.is_empty() {
                default_title(manager.count_in_layer(record.layer) + 1)
            } else {
                record.title
            };
            manager.items.push(Segment::new(
                frame_rate,
                id,
                record.layer,
                title,
                seconds_to_frame(record.start, frame_rate),
                seconds_to_frame(record.end, frame_rate),
            ));
        }
        Ok(manager)
    }

    pub fn to_records(&self) -> Vec<SegmentRecord> {
        self.items.iter().map(Segment::to_record).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.items.iter()
    }

    pub fn items(&self) -> &[Segment] {
        &self.items
    }

    /// Length of the media in seconds.
    pub fn duration(&self) -> f64 {
        self.total_frames as f64 / self.frame_rate
    }

    /// Largest id currently in the list, 0 when empty.
    pub fn get_max_list_index(&self) -> u32 {
        self.items.iter().map(|s| s.id).max().unwrap_or(0)
    }

    /// Append a segment with id `max + 1`. No overlap check.
    pub fn append(
        &mut self,
        layer: u32,
        start_frame: i64,
        end_frame: i64,
        title: Option<String>,
    ) -> &Segment {
        let title = title.unwrap_or_else(|| default_title(self.count_in_layer(layer) + 1));
        let id = self.get_max_list_index() + 1;
        self.items.push(Segment::new(
            self.frame_rate,
            id,
            layer,
            title,
            start_frame,
            end_frame,
        ));
        debug!(id, layer, start_frame, end_frame, "segment appended");
        &self.items[self.items.len() - 1]
    }

    pub fn get_by_id(&self, id: u32) -> Option<&Segment> {
        self.items.iter().find(|s| s.id == id)
    }

    pub fn get_mut_by_id(&mut self, id: u32) -> Option<&mut Segment> {
        self.items.iter_mut().find(|s| s.id == id)
    }

    /// First segment in list order on `layer` containing `time`.
    ///
    /// When segments overlap the answer depends on insertion order, not on
    /// which one starts first.
    pub fn get_by_time(
        &self,
        time: f64,
        layer: u32,
        include_start: bool,
        include_end: bool,
    ) -> Option<&Segment> {
        self.items
            .iter()
            .find(|s| s.layer == layer && s.contains(time, include_start, include_end))
    }

    pub fn get_all_by_time(
        &self,
        time: f64,
        layer: u32,
        include_start: bool,
        include_end: bool,
    ) -> Vec<&Segment> {
        self.items
            .iter()
            .filter(|s| s.layer == layer && s.contains(time, include_start, include_end))
            .collect()
    }

    /// Position of a segment within its own layer, in list order.
    pub fn index_in_layer(&self, id: u32) -> Option<usize> {
        let layer = self.get_by_id(id)?.layer;
        self.items
            .iter()
            .filter(|s| s.layer == layer)
            .position(|s| s.id == id)
    }

    pub fn filter_by_layers(&self, layers: &[u32]) -> Vec<&Segment> {
        self.items
            .iter()
            .filter(|s| layers.contains(&s.layer))
            .collect()
    }

    /// Remove every segment, or only those on `layers`.
    pub fn clear(&mut self, layers: Option<&[u32]>) {
        match layers {
            None => self.items.clear(),
            Some(layers) => self.items.retain(|s| !layers.contains(&s.layer)),
        }
    }

    pub fn remove_by_id(&mut self, id: u32) -> Option<Segment> {
        let pos = self.items.iter().position(|s| s.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Earliest time at or after `start_time` on `layer` that no segment
    /// covers. A segment's end is free (half-open). `None` once the search
    /// runs past the end of the media.
    pub fn get_next_free_time(&self, start_time: f64, layer: u32) -> Option<f64> {
        let mut on_layer: Vec<&Segment> = self.items.iter().filter(|s| s.layer == layer).collect();
        on_layer.sort_by(|a, b| cmp_f64(a.start_time(), b.start_time()));

        let mut time = start_time;
        for segment in on_layer {
            if segment.start_time() > time {
                break;
            }
            if segment.contains(time, true, false) {
                time = segment.end_time();
            }
        }
        debug!(start_time, layer, free = time, "next free time");

        if time >= self.duration() {
            None
        } else {
            Some(time)
        }
    }

    /// Latest time at or before `end_time` on `layer` that no segment covers.
    /// A segment's start is free. `None` when the search reaches 0.
    pub fn get_previous_free_time(&self, end_time: f64, layer: u32) -> Option<f64> {
        let mut on_layer: Vec<&Segment> = self.items.iter().filter(|s| s.layer == layer).collect();
        on_layer.sort_by(|a, b| cmp_f64(b.end_time(), a.end_time()));

        let mut time = end_time;
        for segment in on_layer {
            if segment.end_time() < time {
                break;
            }
            if segment.contains(time, false, true) {
                time = segment.start_time();
            }
        }
        debug!(end_time, layer, free = time, "previous free time");

        if time <= 0.0 {
            None
        } else {
            Some(time)
        }
    }

    /// Nearest segment on the same layer starting after `current` starts.
    pub fn get_next_segment(&self, current: &Segment) -> Option<&Segment> {
        let start = current.start_time();
        let mut candidates: Vec<&Segment> = self
            .items
            .iter()
            .filter(|s| s.layer == current.layer && s.start_time() > start)
            .collect();
        candidates.sort_by(|a, b| cmp_f64(a.start_time(), b.start_time()));
        candidates.into_iter().next()
    }

    /// Nearest segment on the same layer ending before `current` ends.
    pub fn get_prev_segment(&self, current: &Segment) -> Option<&Segment> {
        let end = current.end_time();
        let mut candidates: Vec<&Segment> = self
            .items
            .iter()
            .filter(|s| s.layer == current.layer && s.end_time() < end)
            .collect();
        candidates.sort_by(|a, b| cmp_f64(b.end_time(), a.end_time()));
        candidates.into_iter().next()
    }

    /// Earliest-starting segment on `layer` that starts after `time`.
    pub fn get_next_segment_by_time(&self, time: f64, layer: u32) -> Option<&Segment> {
        let mut candidates: Vec<&Segment> = self
            .items
            .iter()
            .filter(|s| s.layer == layer && s.start_time() > time)
            .collect();
        candidates.sort_by(|a, b| cmp_f64(a.start_time(), b.start_time()));
        candidates.into_iter().next()
    }

    /// Among segments on `layer` ending before `time`, the one starting last.
    pub fn get_prev_segment_by_time(&self, time: f64, layer: u32) -> Option<&Segment> {
        let mut candidates: Vec<&Segment> = self
            .items
            .iter()
            .filter(|s| s.layer == layer && s.end_time() < time)
            .collect();
        candidates.sort_by(|a, b| cmp_f64(b.start_time(), a.start_time()));
        candidates.into_iter().next()
    }

    /// Segments on `layer` ending at or before `time`, by ascending end.
    pub fn get_segments_before_time(&self, time: f64, layer: u32) -> Vec<&Segment> {
        let mut found: Vec<&Segment> = self
            .items
            .iter()
            .filter(|s| s.layer == layer && s.end_time() <= time)
            .collect();
        found.sort_by(|a, b| cmp_f64(a.end_time(), b.end_time()));
        found
    }

    /// Segments on `layer` starting at or after `time`, by ascending start.
    pub fn get_segments_after_time(&self, time: f64, layer: u32) -> Vec<&Segment> {
        let mut found: Vec<&Segment> = self
            .items
            .iter()
            .filter(|s| s.layer == layer && s.start_time() >= time)
            .collect();
        found.sort_by(|a, b| cmp_f64(a.start_time(), b.start_time()));
        found
    }

    pub fn sort_by_title(&mut self) {
        self.items.sort_by(|a, b| a.title.cmp(&b.title));
    }

    pub fn sort_by_start_time(&mut self) {
        self.items.sort_by_key(|s| s.start_frame);
    }

    /// Renumber ids 1..=N in current list order. Ids held elsewhere become
    /// stale.
    pub fn reindex(&mut self) {
        for (i, segment) in self.items.iter_mut().enumerate() {
            segment.id = i as u32 + 1;
        }
    }

    /// Move a segment's start to `frame`, keeping it inside the media and
    /// before the segment's end.
    pub fn set_start_frame(&mut self, id: u32, frame: i64) -> Result<()> {
        let total_frames = self.total_frames;
        let frame_rate = self.frame_rate;
        let segment = self
            .get_mut_by_id(id)
            .ok_or(CoreError::SegmentNotFound(id))?;
        if frame < 0 || frame > total_frames {
            return Err(CoreError::TimeOutOfRange(frame as f64 / frame_rate));
        }
        if frame >= segment.end_frame {
            return Err(CoreError::InvalidOperation(
                "start must be before end".into(),
            ));
        }
        segment.start_frame = frame;
        Ok(())
    }

    /// Move a segment's end to `frame`, keeping it inside the media and
    /// after the segment's start.
    pub fn set_end_frame(&mut self, id: u32, frame: i64) -> Result<()> {
        let total_frames = self.total_frames;
        let frame_rate = self.frame_rate;
        let segment = self
            .get_mut_by_id(id)
            .ok_or(CoreError::SegmentNotFound(id))?;
        if frame < 0 || frame > total_frames {
            return Err(CoreError::TimeOutOfRange(frame as f64 / frame_rate));
        }
        if frame <= segment.start_frame {
            return Err(CoreError::InvalidOperation(
                "end must be after start".into(),
            ));
        }
        segment.end_frame = frame;
        Ok(())
    }

    pub fn set_start_time(&mut self, id: u32, seconds: f64) -> Result<()> {
        self.check_in_range(seconds)?;
        self.set_start_frame(id, seconds_to_frame(seconds, self.frame_rate))
    }

    pub fn set_end_time(&mut self, id: u32, seconds: f64) -> Result<()> {
        self.check_in_range(seconds)?;
        self.set_end_frame(id, seconds_to_frame(seconds, self.frame_rate))
    }

    /// Set a sanitized title. An empty result falls back to `partNNN` by the
    /// segment's position in its layer.
    pub fn rename(&mut self, id: u32, title: &str) -> Result<&str> {
        let position = self
            .index_in_layer(id)
            .ok_or(CoreError::SegmentNotFound(id))?;
        let mut title = sanitize_title(title);
        if title.is_empty() {
            title = default_title(position + 1);
        }
        let segment = self
            .get_mut_by_id(id)
            .ok_or(CoreError::SegmentNotFound(id))?;
        segment.title = title;
        Ok(&segment.title)
    }

    fn count_in_layer(&self, layer: u32) -> usize {
        self.items.iter().filter(|s| s.layer == layer).count()
    }

    fn check_in_range(&self, seconds: f64) -> Result<()> {
        if !(0.0..=self.duration()).contains(&seconds) {
            return Err(CoreError::TimeOutOfRange(seconds));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a SegmentManager {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}
