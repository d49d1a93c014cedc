//! File segmentation
//!
//! A file is split into a run of fixed-size, closed `Head` byte ranges plus
//! exactly one open-ended `Tail` range that always ends at the current file
//! length. Head segments are immutable once emitted; only the tail's `end`
//! moves on growth. Any shrink, recreation, or identity change discards the
//! whole layout and rebuilds it from scratch, because byte offsets from the
//! old file are meaningless once truncation occurs.

use crate::watch::notifier::FileStatus;
use serde::Serialize;

/// Segment identifier (position in file order)
pub type SegmentId = u32;

/// Kind of segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SegmentKind {
    /// Closed, immutable byte range
    Head,
    /// Open-ended range ending at the current file length
    Tail,
}

/// A contiguous byte range of the file scanned and indexed as a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Position of this segment in file order
    pub id: SegmentId,
    /// First byte covered (inclusive)
    pub start: u64,
    /// One past the last byte covered
    pub end: u64,
    /// Head or tail
    pub kind: SegmentKind,
}

impl Segment {
    /// Length of the segment in bytes
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// True if the segment covers no bytes
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `pos` falls inside this segment
    pub fn contains(&self, pos: u64) -> bool {
        pos >= self.start && pos < self.end
    }
}

/// Immutable snapshot of the current segment layout
///
/// Invariants: segments are ordered by `id`, contiguous
/// (`segments[i].end == segments[i+1].start`), and exactly one segment has
/// kind [`SegmentKind::Tail`] - always the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCollection {
    segments: Vec<Segment>,
    generation: u64,
}

impl SegmentCollection {
    /// Build a fresh layout for a file of `length` bytes
    ///
    /// The tail covers at least `tail_segment_size` trailing bytes; the
    /// remaining prefix is cut into `head_segment_size` chunks (the last one
    /// possibly short).
    pub fn layout(
        length: u64,
        head_segment_size: u64,
        tail_segment_size: u64,
        generation: u64,
    ) -> Self {
        let tail_start = length.saturating_sub(tail_segment_size);
        let mut segments = Vec::new();
        let mut start = 0u64;
        while start < tail_start {
            let end = (start + head_segment_size).min(tail_start);
            segments.push(Segment {
                id: segments.len() as SegmentId,
                start,
                end,
                kind: SegmentKind::Head,
            });
            start = end;
        }
        segments.push(Segment {
            id: segments.len() as SegmentId,
            start: tail_start,
            end: length,
            kind: SegmentKind::Tail,
        });
        Self {
            segments,
            generation,
        }
    }

    /// An empty layout (missing file): a single zero-length tail
    pub fn empty(generation: u64) -> Self {
        Self::layout(0, 1, 1, generation)
    }

    /// The same layout with the tail extended to `new_len`
    ///
    /// Head segments are carried over untouched.
    pub fn extended(&self, new_len: u64, generation: u64) -> Self {
        let mut segments = self.segments.clone();
        let tail = segments.last_mut().unwrap();
        debug_assert_eq!(tail.kind, SegmentKind::Tail);
        debug_assert!(new_len >= tail.end);
        tail.end = new_len;
        Self {
            segments,
            generation,
        }
    }

    /// All segments in file order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The head segments (everything but the last)
    pub fn heads(&self) -> &[Segment] {
        &self.segments[..self.segments.len() - 1]
    }

    /// The tail segment
    pub fn tail(&self) -> &Segment {
        self.segments.last().unwrap()
    }

    /// Current file length covered by the layout
    pub fn file_len(&self) -> u64 {
        self.tail().end
    }

    /// True if the layout covers no bytes (missing or empty file)
    pub fn is_empty(&self) -> bool {
        self.file_len() == 0
    }

    /// Change-detection marker; strictly increases across emissions
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The segment containing byte `pos`, if any
    pub fn segment_at(&self, pos: u64) -> Option<&Segment> {
        self.segments.iter().find(|s| s.contains(pos))
    }
}

/// Turns a stream of file-status notifications into segment layouts
///
/// Emits a fresh collection on first sight, identity change, or shrink;
/// extends only the tail on pure growth; emits an empty collection when the
/// file disappears. Returns `None` when nothing changed.
#[derive(Debug)]
pub struct Segmenter {
    head_segment_size: u64,
    tail_segment_size: u64,
    previous: Option<(bool, u64)>,
    generation: u64,
    current: Option<SegmentCollection>,
}

impl Segmenter {
    /// Create a segmenter with the given segment sizing
    pub fn new(head_segment_size: u64, tail_segment_size: u64) -> Self {
        Self {
            head_segment_size,
            tail_segment_size,
            previous: None,
            generation: 0,
            current: None,
        }
    }

    /// Apply one file-status notification
    ///
    /// Returns the new layout if it changed, along with whether the change
    /// was a rebuild (all previous offsets are stale) or a pure tail growth.
    pub fn apply(&mut self, status: &FileStatus) -> Option<SegmentChange> {
        let prev = self.previous;
        self.previous = Some((status.exists, status.length));

        if !status.exists {
            // Collapse repeated "missing" notifications
            if matches!(prev, Some((false, _))) {
                return None;
            }
            let collection = SegmentCollection::empty(self.next_generation());
            self.current = Some(collection.clone());
            return Some(SegmentChange {
                collection,
                rebuilt: true,
            });
        }

        let rebuild = match prev {
            None => true,
            Some((false, _)) => true,
            Some((true, prev_len)) => status.identity_changed || status.length < prev_len,
        };

        if rebuild {
            let collection = SegmentCollection::layout(
                status.length,
                self.head_segment_size,
                self.tail_segment_size,
                self.next_generation(),
            );
            self.current = Some(collection.clone());
            return Some(SegmentChange {
                collection,
                rebuilt: true,
            });
        }

        let current = self.current.as_ref()?;
        if status.length == current.file_len() {
            return None;
        }
        let generation = self.next_generation();
        let collection = self.current.as_ref()?.extended(status.length, generation);
        self.current = Some(collection.clone());
        Some(SegmentChange {
            collection,
            rebuilt: false,
        })
    }

    /// The most recently emitted layout
    pub fn current(&self) -> Option<&SegmentCollection> {
        self.current.as_ref()
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

/// A layout emission from the [`Segmenter`]
#[derive(Debug, Clone)]
pub struct SegmentChange {
    /// The new layout
    pub collection: SegmentCollection,
    /// True if previous segments and offsets are stale and must be discarded
    pub rebuilt: bool,
}
