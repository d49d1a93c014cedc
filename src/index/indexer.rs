//! Indexing protocols
//!
//! Thin orchestration over [`scan_range`]: the tail-first incremental scan,
//! the exact head-segment scan, and the estimate that stands in for a head
//! segment until its exact scan lands. Each call opens its own scanner
//! handle; nothing here holds locks or shares seek positions.

use crate::index::scanner::{LineScanner, ScanPass, scan_range};
use crate::index::sparse::{IndexKind, SparseIndex};
use crate::segment::Segment;
use anyhow::{Context, Result};
use std::path::Path;

/// Scan newly appended tail bytes `[from, EOF)`
///
/// `phase` is `existing_tail.line_count % compression`, so the merged result
/// is identical to scanning the whole tail in one shot.
pub fn scan_tail_growth(
    path: &Path,
    from: u64,
    compression: usize,
    phase: usize,
) -> Result<ScanPass> {
    let mut scanner = LineScanner::open(path)
        .with_context(|| format!("opening {} for tail scan", path.display()))?;
    scan_range(&mut scanner, from, None, compression, phase)
        .with_context(|| format!("scanning tail of {} from {}", path.display(), from))
}

/// Scan one head segment exactly, producing its page index
///
/// The index `end` is clamped to the segment's byte range regardless of where
/// the last line actually ended (the straddling line belongs to the next
/// segment).
pub fn scan_head_segment(path: &Path, segment: &Segment, compression: usize) -> Result<SparseIndex> {
    let mut scanner = LineScanner::open(path)
        .with_context(|| format!("opening {} for head scan", path.display()))?;
    let pass = scan_range(
        &mut scanner,
        segment.start,
        Some(segment.end),
        compression,
        0,
    )
    .with_context(|| {
        format!(
            "scanning segment {} [{}, {}) of {}",
            segment.id,
            segment.start,
            segment.end,
            path.display()
        )
    })?;
    Ok(SparseIndex::exact(
        segment.start,
        segment.end,
        compression,
        pass,
        IndexKind::Page,
    ))
}

/// Build the estimate index for a head segment from the tail's average line
/// length
///
/// Published immediately so consumers see an approximate total; replaced by
/// [`scan_head_segment`]'s result when the background worker gets to it. The
/// estimate can be arbitrarily wrong for files with highly variable line
/// lengths - it only has to be good enough for scrollbar positioning.
pub fn estimate_head_segment(segment: &Segment, avg_line_len: f64) -> SparseIndex {
    SparseIndex::estimate(segment.start, segment.end, avg_line_len)
}

/// Head segments in scan-priority order: most recent byte range first,
/// oldest last
pub fn head_scan_order(heads: &[Segment]) -> Vec<Segment> {
    let mut order: Vec<Segment> = heads.to_vec();
    order.reverse();
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SegmentKind;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn write_temp(content: &[u8]) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tailview_indexer_{}_{}.log",
            std::process::id(),
            n
        ));
        fs::write(&path, content).unwrap();
        path
    }

    fn numbered_lines(range: std::ops::Range<usize>) -> String {
        range.map(|i| format!("line {:04}\n", i)).collect()
    }

    #[test]
    fn test_reindexing_is_idempotent() {
        let path = write_temp(numbered_lines(0..100).as_bytes());
        let a = scan_tail_growth(&path, 0, 10, 0).unwrap();
        let b = scan_tail_growth(&path, 0, 10, 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.line_count, 100);
        assert_eq!(a.offsets.len(), 10);
    }

    #[test]
    fn test_incremental_tail_matches_one_shot() {
        let path = write_temp(numbered_lines(0..37).as_bytes());
        let one_shot = scan_tail_growth(&path, 0, 10, 0).unwrap();

        // Scan in two increments split mid-block, then merge
        let cut = 10 * 13; // after 13 lines of 10 bytes each
        let mut scanner = LineScanner::open(&path).unwrap();
        let first = scan_range(&mut scanner, 0, Some(cut), 10, 0).unwrap();
        assert_eq!(first.line_count, 13);
        let tail = SparseIndex::exact(0, first.end_pos, 10, first.clone(), IndexKind::Tail);
        let second = scan_tail_growth(&path, tail.end, 10, tail.line_count % 10).unwrap();
        let merged = tail.merge_tail(second);

        assert_eq!(merged.line_count, one_shot.line_count);
        assert_eq!(merged.offsets, one_shot.offsets);
        assert_eq!(merged.end, one_shot.end_pos);
    }

    #[test]
    fn test_head_segment_index_clamps_end() {
        let path = write_temp(numbered_lines(0..50).as_bytes());
        let segment = Segment {
            id: 0,
            start: 0,
            end: 105, // mid-line cut
            kind: SegmentKind::Head,
        };
        let index = scan_head_segment(&path, &segment, 10).unwrap();
        assert_eq!(index.end, 105);
        assert_eq!(index.line_count, 10); // line 11 straddles the cut, dropped
        assert_eq!(index.offsets, vec![100]);
    }

    #[test]
    fn test_estimate_replaced_by_exact_scan() {
        let path = write_temp(numbered_lines(0..40).as_bytes());
        let segment = Segment {
            id: 0,
            start: 0,
            end: 200,
            kind: SegmentKind::Head,
        };
        let estimate = estimate_head_segment(&segment, 8.0);
        assert!(estimate.is_estimate());
        assert_eq!(estimate.line_count, 25);

        let exact = scan_head_segment(&path, &segment, 10).unwrap();
        assert!(!exact.is_estimate());
        assert_eq!(exact.line_count, 20);
    }

    #[test]
    fn test_head_scan_order_is_most_recent_first() {
        let heads = [
            Segment {
                id: 0,
                start: 0,
                end: 10,
                kind: SegmentKind::Head,
            },
            Segment {
                id: 1,
                start: 10,
                end: 20,
                kind: SegmentKind::Head,
            },
        ];
        let order = head_scan_order(&heads);
        assert_eq!(order[0].id, 1);
        assert_eq!(order[1].id, 0);
    }
}
