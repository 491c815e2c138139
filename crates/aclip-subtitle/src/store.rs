//! Cue index and span snapping.

use aclip_models::{SrtCue, SrtTime, SubtitleChunk};
use tracing::warn;

use crate::chunk::chunk_cues;
use crate::error::SubtitleResult;

/// An ordered cue sequence with timestamp lookup and span snapping.
pub struct SubtitleStore {
    cues: Vec<SrtCue>,
}

impl SubtitleStore {
    /// Build a store from parsed cues. Cues are assumed sorted by start
    /// time, as `parse_srt` produces them.
    pub fn new(cues: Vec<SrtCue>) -> Self {
        Self { cues }
    }

    pub fn cues(&self) -> &[SrtCue] {
        &self.cues
    }

    /// Chunk the cue stream by character budget.
    pub fn chunk(&self, chunk_size: usize) -> SubtitleResult<Vec<SubtitleChunk>> {
        chunk_cues(&self.cues, chunk_size)
    }

    /// Index of the cue whose display window contains `t`, if any.
    pub fn cue_at(&self, t: SrtTime) -> Option<usize> {
        // Cues are sorted by start; find the last cue starting at or before t.
        let candidate = self.cues.partition_point(|c| c.start <= t);
        candidate
            .checked_sub(1)
            .filter(|&i| self.cues[i].contains(t))
    }

    /// Snap a free-form `[start, end]` span onto cue boundaries.
    ///
    /// The start snaps outward to the start of the cue containing it. The
    /// end snaps to the nearest cue end: a proposal spilling only slightly
    /// into the next cue comes back to the boundary it overshot rather than
    /// swallowing that whole cue. A timestamp falling in a gap between cues
    /// (or outside the subtitle stream entirely) snaps to the closest cue
    /// edge with a warning; the caller keeps going.
    pub fn snap_span(&self, start: SrtTime, end: SrtTime) -> (SrtTime, SrtTime) {
        let snapped_start = match self.cue_at(start) {
            Some(i) => self.cues[i].start,
            None => {
                let nearest = self.nearest_boundary(start);
                warn!(
                    proposed = %start,
                    snapped = %nearest,
                    "span start falls outside all cues, snapping to nearest boundary"
                );
                nearest
            }
        };

        let snapped_end = match self.cue_at(end) {
            Some(i) => self.snap_end_within(i, end),
            None => {
                let nearest = self.nearest_boundary(end);
                warn!(
                    proposed = %end,
                    snapped = %nearest,
                    "span end falls outside all cues, snapping to nearest boundary"
                );
                nearest
            }
        };

        if snapped_start < snapped_end {
            (snapped_start, snapped_end)
        } else if let Some(i) = self.cue_at(end) {
            // The nearest-end choice collapsed the span; take the containing
            // cue's full end instead.
            (snapped_start.min(self.cues[i].end), self.cues[i].end.max(snapped_start))
        } else {
            (
                snapped_start.min(snapped_end),
                snapped_start.max(snapped_end),
            )
        }
    }

    /// Snap an end falling inside cue `i` to the nearer of that cue's end
    /// and the previous cue's end.
    fn snap_end_within(&self, i: usize, end: SrtTime) -> SrtTime {
        let cue_end = self.cues[i].end;
        let Some(prev_end) = i.checked_sub(1).map(|p| self.cues[p].end) else {
            return cue_end;
        };
        if prev_end <= end && end.saturating_sub(prev_end) < cue_end.saturating_sub(end) {
            prev_end
        } else {
            cue_end
        }
    }

    /// The cue boundary (start or end) closest to `t`.
    fn nearest_boundary(&self, t: SrtTime) -> SrtTime {
        self.cues
            .iter()
            .flat_map(|c| [c.start, c.end])
            .min_by_key(|b| b.saturating_sub(t).max(t.saturating_sub(*b)))
            .unwrap_or_default()
    }
}
