//! Sparse line index
//!
//! A [`SparseIndex`] records the byte offset of every Nth line within one
//! segment (N = compression factor), plus the exact line count. A head
//! segment may temporarily hold an *estimate* - a line count inferred from
//! the tail's average line length, with no offsets - until the background
//! worker replaces it with an exact scan.
//!
//! [`IndexCollection`] is the arena of per-segment indexes addressed by
//! segment id. It is a value-like snapshot: the engine clones it, applies an
//! update, bumps the generation, and republishes.

use crate::index::scanner::ScanPass;
use crate::segment::SegmentId;
use std::collections::BTreeMap;

/// Kind of sparse index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Index of a closed head segment
    Page,
    /// Index of the open-ended tail segment; grows by merging
    Tail,
}

/// Sparse index of one segment's line structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseIndex {
    /// First byte covered
    pub start: u64,
    /// One past the last byte covered
    pub end: u64,
    /// One offset recorded per this many lines
    pub compression: usize,
    /// Exact (or, for estimates, inferred) number of lines in `[start, end)`
    pub line_count: usize,
    /// End offset of line `(i+1)*compression`, strictly increasing
    pub offsets: Vec<u64>,
    /// Page or tail
    pub kind: IndexKind,
    /// True while `line_count` is inferred rather than scanned
    estimate: bool,
}

impl SparseIndex {
    /// Build an exact index from a scan pass over `[start, end)`
    pub fn exact(start: u64, end: u64, compression: usize, pass: ScanPass, kind: IndexKind) -> Self {
        debug_assert!(pass.offsets.windows(2).all(|w| w[0] < w[1]));
        Self {
            start,
            end,
            compression,
            line_count: pass.line_count,
            offsets: pass.offsets,
            kind,
            estimate: false,
        }
    }

    /// Build an estimate for a head segment pending its exact scan
    ///
    /// `line_count` is `(end - start) / avg_line_len` rounded to at least 1;
    /// no offsets are recorded, so lookups inside the segment interpolate.
    pub fn estimate(start: u64, end: u64, avg_line_len: f64) -> Self {
        let bytes = (end - start) as f64;
        let line_count = if avg_line_len > 0.0 {
            (bytes / avg_line_len).round().max(1.0) as usize
        } else {
            1
        };
        Self {
            start,
            end,
            compression: 1,
            line_count,
            offsets: Vec::new(),
            kind: IndexKind::Page,
            estimate: true,
        }
    }

    /// An empty tail index starting at `start`
    pub fn empty_tail(start: u64, compression: usize) -> Self {
        Self {
            start,
            end: start,
            compression,
            line_count: 0,
            offsets: Vec::new(),
            kind: IndexKind::Tail,
            estimate: false,
        }
    }

    /// True while the line count is inferred, not scanned
    pub fn is_estimate(&self) -> bool {
        self.estimate
    }

    /// Average bytes per line over the covered range
    pub fn avg_line_len(&self) -> f64 {
        if self.line_count == 0 {
            0.0
        } else {
            (self.end - self.start) as f64 / self.line_count as f64
        }
    }

    /// Merge a newer tail pass into this tail index
    ///
    /// The only merge operation: offsets concatenate, line counts sum. The
    /// newer pass must have been scanned with `phase = line_count %
    /// compression` so the combined offsets match a one-shot scan of the
    /// whole range.
    pub fn merge_tail(&self, newer: ScanPass) -> Self {
        debug_assert_eq!(self.kind, IndexKind::Tail);
        debug_assert!(newer.offsets.first().map_or(true, |&o| {
            self.offsets.last().map_or(true, |&last| o > last)
        }));
        let mut offsets = self.offsets.clone();
        offsets.extend_from_slice(&newer.offsets);
        Self {
            start: self.start,
            end: newer.end_pos.max(self.end),
            compression: self.compression,
            line_count: self.line_count + newer.line_count,
            offsets,
            kind: IndexKind::Tail,
            estimate: false,
        }
    }
}

/// Byte location resolved for a requested line index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineLocation {
    /// Byte offset to seek to (a known line start, or an interpolation)
    pub byte_start: u64,
    /// Lines to skip after seeking before the requested line begins
    pub skip_lines: usize,
    /// True if `byte_start` came from an estimate and the reader must
    /// resynchronize to the next real line boundary
    pub approximate: bool,
}

/// Arena of per-segment sparse indexes, ordered by segment id
#[derive(Debug, Clone, Default)]
pub struct IndexCollection {
    entries: BTreeMap<SegmentId, SparseIndex>,
    total_line_count: usize,
    generation: u64,
}

impl IndexCollection {
    /// An empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the index for `segment`, updating the cached total
    pub fn insert(&mut self, segment: SegmentId, index: SparseIndex) {
        if let Some(old) = self.entries.insert(segment, index) {
            self.total_line_count -= old.line_count;
        }
        self.total_line_count += self.entries[&segment].line_count;
    }

    /// Remove the index for `segment`, if present
    pub fn remove(&mut self, segment: SegmentId) {
        if let Some(old) = self.entries.remove(&segment) {
            self.total_line_count -= old.line_count;
        }
    }

    /// The index for `segment`, if present
    pub fn get(&self, segment: SegmentId) -> Option<&SparseIndex> {
        self.entries.get(&segment)
    }

    /// Iterate entries in segment order
    pub fn entries(&self) -> impl Iterator<Item = (SegmentId, &SparseIndex)> {
        self.entries.iter().map(|(&id, idx)| (id, idx))
    }

    /// Sum of line counts across all segments (estimates included)
    pub fn total_line_count(&self) -> usize {
        self.total_line_count
    }

    /// True if any segment still holds an estimate
    pub fn has_estimates(&self) -> bool {
        self.entries.values().any(|e| e.is_estimate())
    }

    /// True if nothing has been indexed yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Change-detection marker
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stamp this snapshot with a new generation
    pub fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Resolve a global line index to a byte location
    ///
    /// Walks segments in order accumulating line counts until the covering
    /// segment is found, then uses that segment's offsets (or interpolates
    /// for an estimate). Returns `None` past the last known line.
    pub fn locate_line(&self, line_index: usize) -> Option<LineLocation> {
        let mut first = 0usize;
        for index in self.entries.values() {
            let next = first + index.line_count;
            if line_index < next {
                let relative = line_index - first;
                return Some(Self::locate_in(index, relative));
            }
            first = next;
        }
        None
    }

    /// Translate a byte position to the index of the line containing it
    ///
    /// Sparse, so the answer is accurate to within one compression block
    /// (exact materialization later removes the error for returned lines).
    pub fn line_index_at_byte(&self, pos: u64) -> usize {
        let mut first = 0usize;
        for index in self.entries.values() {
            if pos >= index.end {
                first += index.line_count;
                continue;
            }
            if pos < index.start {
                break;
            }
            if index.is_estimate() {
                let bpl = index.avg_line_len();
                let relative = if bpl > 0.0 {
                    ((pos - index.start) as f64 / bpl) as usize
                } else {
                    0
                };
                return first + relative.min(index.line_count.saturating_sub(1));
            }
            let blocks = index.offsets.partition_point(|&o| o <= pos);
            return first + (blocks * index.compression).min(index.line_count.saturating_sub(1));
        }
        first
    }

    fn locate_in(index: &SparseIndex, relative: usize) -> LineLocation {
        if index.is_estimate() {
            let byte = index.start + (relative as f64 * index.avg_line_len()) as u64;
            return LineLocation {
                byte_start: byte.min(index.end.saturating_sub(1)).max(index.start),
                skip_lines: 0,
                approximate: true,
            };
        }
        let block = relative / index.compression;
        if block == 0 || index.offsets.is_empty() {
            return LineLocation {
                byte_start: index.start,
                skip_lines: relative,
                approximate: false,
            };
        }
        let known = block.min(index.offsets.len());
        LineLocation {
            byte_start: index.offsets[known - 1],
            skip_lines: relative - known * index.compression,
            approximate: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(line_count: usize, offsets: Vec<u64>, end_pos: u64) -> ScanPass {
        ScanPass {
            line_count,
            offsets,
            end_pos,
        }
    }

    #[test]
    fn test_merge_tail_concatenates() {
        let tail = SparseIndex::exact(0, 60, 3, pass(10, vec![18, 36, 54], 60), IndexKind::Tail);
        let merged = tail.merge_tail(pass(5, vec![78, 96], 96));
        assert_eq!(merged.line_count, 15);
        assert_eq!(merged.offsets, vec![18, 36, 54, 78, 96]);
        assert_eq!(merged.end, 96);
        assert_eq!(merged.start, 0);
    }

    #[test]
    fn test_estimate_line_count() {
        let est = SparseIndex::estimate(0, 1000, 10.0);
        assert!(est.is_estimate());
        assert_eq!(est.line_count, 100);
        assert!(est.offsets.is_empty());
    }

    #[test]
    fn test_collection_total_tracks_replacement() {
        let mut c = IndexCollection::new();
        c.insert(0, SparseIndex::estimate(0, 1000, 10.0));
        assert_eq!(c.total_line_count(), 100);
        assert!(c.has_estimates());

        // Exact scan found 80 lines, not 100
        c.insert(
            0,
            SparseIndex::exact(0, 1000, 10, pass(80, vec![120, 250], 1000), IndexKind::Page),
        );
        assert_eq!(c.total_line_count(), 80);
        assert!(!c.has_estimates());
    }

    #[test]
    fn test_locate_line_in_first_block() {
        let mut c = IndexCollection::new();
        c.insert(
            0,
            SparseIndex::exact(0, 60, 3, pass(10, vec![18, 36, 54], 60), IndexKind::Tail),
        );
        let loc = c.locate_line(2).unwrap();
        assert_eq!(loc.byte_start, 0);
        assert_eq!(loc.skip_lines, 2);
        assert!(!loc.approximate);
    }

    #[test]
    fn test_locate_line_uses_nearest_offset() {
        let mut c = IndexCollection::new();
        c.insert(
            0,
            SparseIndex::exact(0, 60, 3, pass(10, vec![18, 36, 54], 60), IndexKind::Tail),
        );
        // line 7: block 2, seek to offsets[1]=36 (start of line 6), skip 1
        let loc = c.locate_line(7).unwrap();
        assert_eq!(loc.byte_start, 36);
        assert_eq!(loc.skip_lines, 1);
    }

    #[test]
    fn test_locate_line_across_segments() {
        let mut c = IndexCollection::new();
        c.insert(
            0,
            SparseIndex::exact(0, 100, 5, pass(20, vec![25, 50, 75, 100], 100), IndexKind::Page),
        );
        c.insert(
            1,
            SparseIndex::exact(100, 160, 5, pass(10, vec![130, 160], 160), IndexKind::Tail),
        );
        // line 23 lives in segment 1 at relative 3
        let loc = c.locate_line(23).unwrap();
        assert_eq!(loc.byte_start, 100);
        assert_eq!(loc.skip_lines, 3);
        assert!(c.locate_line(30).is_none());
    }

    #[test]
    fn test_locate_line_in_estimate_is_approximate() {
        let mut c = IndexCollection::new();
        c.insert(0, SparseIndex::estimate(0, 1000, 10.0));
        let loc = c.locate_line(50).unwrap();
        assert!(loc.approximate);
        assert_eq!(loc.byte_start, 500);
        assert_eq!(loc.skip_lines, 0);
    }

    #[test]
    fn test_line_index_at_byte() {
        let mut c = IndexCollection::new();
        c.insert(
            0,
            SparseIndex::exact(0, 60, 3, pass(10, vec![18, 36, 54], 60), IndexKind::Tail),
        );
        assert_eq!(c.line_index_at_byte(0), 0);
        assert_eq!(c.line_index_at_byte(17), 0);
        assert_eq!(c.line_index_at_byte(18), 3);
        assert_eq!(c.line_index_at_byte(40), 6);
    }
}
