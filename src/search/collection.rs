//! Search result state
//!
//! [`SearchCollection`] mirrors the index collection: one entry per segment,
//! but holding the byte offsets of matching lines instead of every-Nth-line
//! offsets. Head segments move `Pending -> Searching -> Complete` as the
//! background worker gets to them; the tail has no pending state because it
//! is rescanned inline on every growth.

use crate::segment::{SegmentCollection, SegmentId, SegmentKind};
use serde::Serialize;
use std::collections::BTreeMap;

/// Progress of one segment's match scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchStatus {
    /// Queued, not yet scanned
    Pending,
    /// Scan in flight
    Searching,
    /// Scan finished (or skipped after the match cap was reached)
    Complete,
}

/// Matches found in one segment
#[derive(Debug, Clone)]
pub struct SegmentMatches {
    /// Scan progress
    pub status: SearchStatus,
    /// Start offsets of matching lines, ascending
    pub offsets: Vec<u64>,
}

/// Value-like snapshot of all match state for one file
#[derive(Debug, Clone, Default)]
pub struct SearchCollection {
    entries: BTreeMap<SegmentId, SegmentMatches>,
    total: usize,
    capped: bool,
    generation: u64,
}

impl SearchCollection {
    /// Fresh state for a segment layout: heads pending, tail complete-empty
    pub fn for_layout(segments: &SegmentCollection) -> Self {
        let mut entries = BTreeMap::new();
        for segment in segments.segments() {
            let status = match segment.kind {
                SegmentKind::Head => SearchStatus::Pending,
                SegmentKind::Tail => SearchStatus::Complete,
            };
            entries.insert(
                segment.id,
                SegmentMatches {
                    status,
                    offsets: Vec::new(),
                },
            );
        }
        Self {
            entries,
            total: 0,
            capped: false,
            generation: 0,
        }
    }

    /// Total matches across all segments
    pub fn total_matches(&self) -> usize {
        self.total
    }

    /// True while any segment is not yet `Complete`
    pub fn is_searching(&self) -> bool {
        self.entries
            .values()
            .any(|e| e.status != SearchStatus::Complete)
    }

    /// Number of segments participating in the search
    pub fn segments_total(&self) -> usize {
        self.entries.len()
    }

    /// Number of segments whose scan has finished
    pub fn segments_completed(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.status == SearchStatus::Complete)
            .count()
    }

    /// True once the match cap stopped further scanning
    pub fn is_capped(&self) -> bool {
        self.capped
    }

    /// Change-detection marker
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stamp this snapshot with a new generation
    pub fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    /// Status of one segment, if known
    pub fn status(&self, segment: SegmentId) -> Option<SearchStatus> {
        self.entries.get(&segment).map(|e| e.status)
    }

    /// Next pending head segment in most-recent-first order
    pub fn next_pending(&self) -> Option<SegmentId> {
        self.entries
            .iter()
            .rev()
            .find(|(_, e)| e.status == SearchStatus::Pending)
            .map(|(&id, _)| id)
    }

    /// Mark a segment's scan as in flight
    ///
    /// Only a `Pending` segment can move to `Searching`; a segment already
    /// completed (by its scan, or by the cap) stays `Complete`.
    pub fn mark_searching(&mut self, segment: SegmentId) {
        if let Some(entry) = self.entries.get_mut(&segment) {
            if entry.status == SearchStatus::Pending {
                entry.status = SearchStatus::Searching;
            }
        }
    }

    /// Install a finished segment scan
    pub fn complete_segment(&mut self, segment: SegmentId, offsets: Vec<u64>) {
        let entry = self.entries.entry(segment).or_insert(SegmentMatches {
            status: SearchStatus::Pending,
            offsets: Vec::new(),
        });
        self.total -= entry.offsets.len();
        self.total += offsets.len();
        entry.offsets = offsets;
        entry.status = SearchStatus::Complete;
    }

    /// Append matches found in newly grown tail bytes
    pub fn append_tail(&mut self, segment: SegmentId, offsets: &[u64]) {
        let entry = self.entries.entry(segment).or_insert(SegmentMatches {
            status: SearchStatus::Complete,
            offsets: Vec::new(),
        });
        debug_assert!(
            offsets
                .first()
                .zip(entry.offsets.last())
                .map_or(true, |(&new, &last)| new > last)
        );
        entry.offsets.extend_from_slice(offsets);
        self.total += offsets.len();
    }

    /// Stop further scanning: every still-pending segment completes with
    /// zero matches
    ///
    /// A deliberate precision/memory trade-off, not an error state.
    pub fn cap(&mut self) {
        for entry in self.entries.values_mut() {
            if entry.status != SearchStatus::Complete {
                entry.status = SearchStatus::Complete;
            }
        }
        self.capped = true;
    }

    /// Byte offset of match `i` in ascending file order
    pub fn match_at(&self, i: usize) -> Option<u64> {
        let mut first = 0usize;
        for entry in self.entries.values() {
            let next = first + entry.offsets.len();
            if i < next {
                return Some(entry.offsets[i - first]);
            }
            first = next;
        }
        None
    }

    /// All match offsets merged in ascending file order
    pub fn merged_offsets(&self) -> Vec<u64> {
        let mut merged = Vec::with_capacity(self.total);
        for entry in self.entries.values() {
            merged.extend_from_slice(&entry.offsets);
        }
        merged
    }
}
