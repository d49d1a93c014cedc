//! Line providers
//!
//! A uniform capability - `count()` plus `read_window()` - implemented by
//! the sparse index, the search results, and two composable decorators: an
//! exclusion filter (drops matching lines and backfills the deficit by
//! walking further back through the inner provider) and an offset shift
//! (presents a suffix of a file as if it were the whole file).
//!
//! Reads never fail loudly: an unreadable file yields an empty page and any
//! mid-page I/O error truncates the page. Stale results self-correct on the
//! next notification.

use crate::index::scanner::LineScanner;
use crate::index::sparse::IndexCollection;
use crate::search::collection::SearchCollection;
use crate::search::matcher::Matcher;
use crate::search::searcher::decode_line;
use crate::view::line::Line;
use crate::view::window::{Anchor, Page, ScrollRequest, resolve_page};
use std::path::PathBuf;
use std::sync::Arc;

/// A source of numbered, byte-addressed lines
#[derive(Debug, Clone)]
pub enum LineProvider {
    /// All lines of the file, numbered by the sparse index
    Index(IndexProvider),
    /// Only matching lines, numbered by match rank
    Search(SearchProvider),
    /// Inner provider minus lines matching an exclusion predicate
    Exclude(Box<ExcludeProvider>),
    /// Inner provider rebased by a fixed byte/line offset
    Shifted(Box<ShiftedProvider>),
}

impl LineProvider {
    /// Provider over a sparse index snapshot
    pub fn index(path: PathBuf, index: Arc<IndexCollection>, tail_start: u64) -> Self {
        Self::Index(IndexProvider {
            path,
            index,
            tail_start,
        })
    }

    /// Provider over a search snapshot
    pub fn search(path: PathBuf, matches: Arc<SearchCollection>, tail_start: u64) -> Self {
        Self::Search(SearchProvider {
            path,
            matches,
            tail_start,
        })
    }

    /// Wrap with an exclusion filter
    pub fn exclude(self, predicate: Matcher) -> Self {
        Self::Exclude(Box::new(ExcludeProvider {
            inner: self,
            predicate,
        }))
    }

    /// Wrap with a fixed rebase: the first `line_base` lines (and the first
    /// `byte_base` bytes) disappear from the presented numbering
    pub fn shifted(self, byte_base: u64, line_base: usize) -> Self {
        Self::Shifted(Box::new(ShiftedProvider {
            inner: self,
            byte_base,
            line_base,
        }))
    }

    /// Number of lines the provider can currently address
    pub fn count(&self) -> usize {
        match self {
            Self::Index(p) => p.index.total_line_count(),
            Self::Search(p) => p.matches.total_matches(),
            // Decorators forward the count they decorate
            Self::Exclude(p) => p.inner.count(),
            Self::Shifted(p) => p.inner.count().saturating_sub(p.line_base),
        }
    }

    /// Materialize the lines visible through `request`
    pub fn read_window(&self, request: &ScrollRequest) -> Vec<Line> {
        match self {
            Self::Index(p) => p.read_window(request),
            Self::Search(p) => p.read_window(request),
            Self::Exclude(p) => p.read_window(request),
            Self::Shifted(p) => p.read_window(request),
        }
    }

    /// Translate an anchor into a first-line index in this provider's
    /// numbering
    fn anchor_index(&self, anchor: Anchor) -> usize {
        match (self, anchor) {
            (_, Anchor::FirstIndex(i)) => i,
            (Self::Index(p), Anchor::BytePosition(pos)) => p.index.line_index_at_byte(pos),
            (Self::Search(p), Anchor::BytePosition(pos)) => {
                p.matches.merged_offsets().partition_point(|&o| o < pos)
            }
            (Self::Exclude(p), anchor) => p.inner.anchor_index(anchor),
            (Self::Shifted(p), Anchor::BytePosition(pos)) => p
                .inner
                .anchor_index(Anchor::BytePosition(pos + p.byte_base))
                .saturating_sub(p.line_base),
        }
    }

    fn resolve(&self, request: &ScrollRequest) -> Page {
        let first = self.anchor_index(request.anchor);
        resolve_page(request.mode, first, request.page_size, self.count())
    }
}

/// Provider backed by a sparse index snapshot
#[derive(Debug, Clone)]
pub struct IndexProvider {
    path: PathBuf,
    index: Arc<IndexCollection>,
    tail_start: u64,
}

impl IndexProvider {
    fn read_window(&self, request: &ScrollRequest) -> Vec<Line> {
        let first = self.anchor_first(request);
        let page = resolve_page(
            request.mode,
            first,
            request.page_size,
            self.index.total_line_count(),
        );
        if page.size == 0 {
            return Vec::new();
        }
        let Some(location) = self.index.locate_line(page.first_line) else {
            return Vec::new();
        };
        let Ok(mut scanner) = LineScanner::open(&self.path) else {
            return Vec::new();
        };
        if scanner.seek(location.byte_start).is_err() {
            return Vec::new();
        }
        if location.approximate {
            // Estimated position: never return a line starting mid-line
            if scanner.resync().is_err() {
                return Vec::new();
            }
        } else if scanner.skip_lines(location.skip_lines).is_err() {
            return Vec::new();
        }

        let mut lines = Vec::with_capacity(page.size);
        for i in 0..page.size {
            match scanner.read_line() {
                Ok(Some(record)) => {
                    let terminated = record.terminated;
                    lines.push(Line {
                        ordinal: page.first_line + i,
                        window_index: i,
                        start: record.start,
                        end: record.end,
                        is_in_tail_window: record.start >= self.tail_start,
                        text: decode_line(&record.bytes),
                    });
                    if !terminated {
                        break;
                    }
                }
                // Short page rather than an error
                Ok(None) | Err(_) => break,
            }
        }
        lines
    }

    fn anchor_first(&self, request: &ScrollRequest) -> usize {
        match request.anchor {
            Anchor::FirstIndex(i) => i,
            Anchor::BytePosition(pos) => self.index.line_index_at_byte(pos),
        }
    }
}

/// Provider backed by a search snapshot; line `i` is the `i`-th match
#[derive(Debug, Clone)]
pub struct SearchProvider {
    path: PathBuf,
    matches: Arc<SearchCollection>,
    tail_start: u64,
}

impl SearchProvider {
    fn read_window(&self, request: &ScrollRequest) -> Vec<Line> {
        let first = match request.anchor {
            Anchor::FirstIndex(i) => i,
            Anchor::BytePosition(pos) => {
                self.matches.merged_offsets().partition_point(|&o| o < pos)
            }
        };
        let page = resolve_page(
            request.mode,
            first,
            request.page_size,
            self.matches.total_matches(),
        );
        if page.size == 0 {
            return Vec::new();
        }
        let Ok(mut scanner) = LineScanner::open(&self.path) else {
            return Vec::new();
        };
        let mut lines = Vec::with_capacity(page.size);
        for i in 0..page.size {
            let ordinal = page.first_line + i;
            let Some(offset) = self.matches.match_at(ordinal) else {
                break;
            };
            if scanner.seek(offset).is_err() {
                break;
            }
            match scanner.read_line() {
                Ok(Some(record)) => lines.push(Line {
                    ordinal,
                    window_index: i,
                    start: record.start,
                    end: record.end,
                    is_in_tail_window: record.start >= self.tail_start,
                    text: decode_line(&record.bytes),
                }),
                Ok(None) | Err(_) => break,
            }
        }
        lines
    }
}

/// Exclusion-filter decorator
///
/// Reads the requested window from the inner provider, drops lines the
/// predicate matches, and walks further backward until the deficit is made
/// up or the file start is reached.
#[derive(Debug, Clone)]
pub struct ExcludeProvider {
    inner: LineProvider,
    predicate: Matcher,
}

impl ExcludeProvider {
    fn read_window(&self, request: &ScrollRequest) -> Vec<Line> {
        let page = self.inner.resolve(request);
        if page.size == 0 {
            return Vec::new();
        }
        let mut kept: Vec<Line> = self
            .inner
            .read_window(&ScrollRequest::at_line(page.first_line, page.size))
            .into_iter()
            .filter(|l| !self.predicate.is_match(&l.text))
            .collect();

        let mut lo = page.first_line;
        while kept.len() < request.page_size && lo > 0 {
            let step = request.page_size.max(kept.len() + 1) - kept.len();
            let new_lo = lo.saturating_sub(step.max(request.page_size));
            let earlier = self
                .inner
                .read_window(&ScrollRequest::at_line(new_lo, lo - new_lo));
            let mut block: Vec<Line> = earlier
                .into_iter()
                .filter(|l| l.ordinal < lo && !self.predicate.is_match(&l.text))
                .collect();
            block.extend(kept);
            kept = block;
            lo = new_lo;
        }

        // Keep the last page_size lines so the window still ends where the
        // caller asked
        if kept.len() > request.page_size {
            kept.drain(..kept.len() - request.page_size);
        }
        for (i, line) in kept.iter_mut().enumerate() {
            line.window_index = i;
        }
        kept
    }
}

/// Offset-shift decorator: presents a suffix of the inner provider as if it
/// were the whole file
#[derive(Debug, Clone)]
pub struct ShiftedProvider {
    inner: LineProvider,
    byte_base: u64,
    line_base: usize,
}

impl ShiftedProvider {
    fn read_window(&self, request: &ScrollRequest) -> Vec<Line> {
        let translated = ScrollRequest {
            mode: request.mode,
            page_size: request.page_size,
            anchor: match request.anchor {
                Anchor::FirstIndex(i) => Anchor::FirstIndex(i + self.line_base),
                Anchor::BytePosition(pos) => Anchor::BytePosition(pos + self.byte_base),
            },
        };
        let mut lines: Vec<Line> = self
            .inner
            .read_window(&translated)
            .into_iter()
            .filter(|l| l.ordinal >= self.line_base && l.start >= self.byte_base)
            .collect();
        for (i, line) in lines.iter_mut().enumerate() {
            line.ordinal -= self.line_base;
            line.start -= self.byte_base;
            line.end -= self.byte_base;
            line.window_index = i;
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::indexer::scan_tail_growth;
    use crate::index::sparse::{IndexKind, SparseIndex};
    use crate::search::searcher::scan_matches;
    use crate::view::window::ScrollRequest;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn write_temp(content: &[u8]) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tailview_provider_{}_{}.log",
            std::process::id(),
            n
        ));
        fs::write(&path, content).unwrap();
        path
    }

    fn indexed(path: &PathBuf, compression: usize) -> LineProvider {
        let pass = scan_tail_growth(path, 0, compression, 0).unwrap();
        let end = pass.end_pos;
        let mut collection = IndexCollection::new();
        collection.insert(
            0,
            SparseIndex::exact(0, end, compression, pass, IndexKind::Tail),
        );
        LineProvider::index(path.clone(), Arc::new(collection), 0)
    }

    fn numbered(range: std::ops::Range<usize>) -> String {
        range.map(|i| format!("line {:03}\n", i)).collect()
    }

    #[test]
    fn test_index_window_exact_lines() {
        let path = write_temp(numbered(0..100).as_bytes());
        let provider = indexed(&path, 10);
        assert_eq!(provider.count(), 100);

        let lines = provider.read_window(&ScrollRequest::at_line(42, 3));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "line 042");
        assert_eq!(lines[0].ordinal, 42);
        assert_eq!(lines[0].start, 42 * 9);
        assert_eq!(lines[0].end, 43 * 9);
        assert_eq!(lines[2].text, "line 044");
        assert_eq!(lines[2].window_index, 2);
    }

    #[test]
    fn test_tail_window_returns_last_lines() {
        let path = write_temp(numbered(0..100).as_bytes());
        let provider = indexed(&path, 10);
        let lines = provider.read_window(&ScrollRequest::tail(10));
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0].text, "line 090");
        assert_eq!(lines[9].text, "line 099");
    }

    #[test]
    fn test_byte_anchor_resolves_to_containing_region() {
        let path = write_temp(numbered(0..100).as_bytes());
        let provider = indexed(&path, 10);
        // byte 450 = start of line 50
        let lines = provider.read_window(&ScrollRequest::at_byte(450, 2));
        assert!(!lines.is_empty());
        // sparse translation is block-accurate
        let ord = lines[0].ordinal;
        assert!((40..=50).contains(&ord), "got ordinal {}", ord);
    }

    #[test]
    fn test_estimate_segment_windows_start_on_line_boundaries() {
        // Variable-width lines so the interpolated seek never happens to
        // land on a boundary by accident
        let mut content = String::new();
        let mut starts = Vec::new();
        for i in 0..200 {
            starts.push(content.len() as u64);
            content.push_str(&format!("{}{}\n", "x".repeat(i % 17), i));
        }
        let path = write_temp(content.as_bytes());

        // Estimate head over [0, start of line 120), exact tail after it
        let cut = starts[120];
        let pass = scan_tail_growth(&path, cut, 10, 0).unwrap();
        let end = pass.end_pos;
        let mut collection = IndexCollection::new();
        collection.insert(0, SparseIndex::estimate(0, cut, cut as f64 / 120.0));
        collection.insert(1, SparseIndex::exact(cut, end, 10, pass, IndexKind::Tail));
        let provider = LineProvider::index(path.clone(), Arc::new(collection), cut);

        let texts: Vec<&str> = content.lines().collect();
        for &first in &[3usize, 17, 40, 77] {
            let window = provider.read_window(&ScrollRequest::at_line(first, 5));
            assert!(!window.is_empty(), "empty window at line {}", first);
            for line in &window {
                // Approximate seeks must resynchronize: every returned line
                // starts on a real boundary and carries that line's text
                let slot = match starts.binary_search(&line.start) {
                    Ok(slot) => slot,
                    Err(_) => panic!("line start {} is not a real boundary", line.start),
                };
                assert_eq!(line.text, texts[slot]);
            }
        }
    }

    #[test]
    fn test_missing_file_yields_empty_page() {
        let path = write_temp(numbered(0..10).as_bytes());
        let provider = indexed(&path, 10);
        fs::remove_file(&path).unwrap();
        assert!(
            provider
                .read_window(&ScrollRequest::at_line(0, 5))
                .is_empty()
        );
    }

    #[test]
    fn test_search_provider_numbers_by_match_rank() {
        let path = write_temp(b"ok\nerror a\nok\nerror b\nerror c\n");
        let pass = scan_matches(
            &path,
            0,
            None,
            &Matcher::substring("error", false),
            usize::MAX,
        )
        .unwrap();
        let layout = crate::segment::SegmentCollection::layout(30, 100, 100, 1);
        let mut matches = SearchCollection::for_layout(&layout);
        matches.append_tail(0, &pass.offsets);
        let provider = LineProvider::search(path.clone(), Arc::new(matches), 0);

        assert_eq!(provider.count(), 3);
        let lines = provider.read_window(&ScrollRequest::at_line(1, 2));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "error b");
        assert_eq!(lines[0].ordinal, 1);
        assert_eq!(lines[1].text, "error c");
    }

    #[test]
    fn test_exclude_backfills_deficit() {
        // lines 0..20; exclude even lines; window over the last 5
        let content: String = (0..20)
            .map(|i| {
                if i % 2 == 0 {
                    format!("even {:02}\n", i)
                } else {
                    format!("odd {:02}\n", i)
                }
            })
            .collect();
        let path = write_temp(content.as_bytes());
        let provider = indexed(&path, 5).exclude(Matcher::substring("even", false));

        let lines = provider.read_window(&ScrollRequest::tail(5));
        assert_eq!(lines.len(), 5);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["odd 11", "odd 13", "odd 15", "odd 17", "odd 19"]);
        assert_eq!(lines[0].window_index, 0);
    }

    #[test]
    fn test_exclude_returns_all_when_fewer_remain() {
        let path = write_temp(b"keep\ndrop\ndrop\ndrop\n");
        let provider = indexed(&path, 10).exclude(Matcher::substring("drop", false));
        let lines = provider.read_window(&ScrollRequest::tail(5));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "keep");
    }

    #[test]
    fn test_shifted_rebases_offsets_and_ordinals() {
        let path = write_temp(numbered(0..10).as_bytes());
        // Present the file from line 4 (byte 36) onward as the whole file
        let provider = indexed(&path, 10).shifted(36, 4);
        assert_eq!(provider.count(), 6);

        let lines = provider.read_window(&ScrollRequest::at_line(0, 2));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "line 004");
        assert_eq!(lines[0].ordinal, 0);
        assert_eq!(lines[0].start, 0);
        assert_eq!(lines[1].start, 9);
    }
}
