//! Per-file session
//!
//! A [`Session`] coordinates everything for one open file: it feeds
//! file-status notifications through the segmenter, keeps the sparse index
//! and any active search consistent with the current layout, and hands out
//! provider snapshots for window resolution.
//!
//! Concurrency model: tail growth and window resolution run inline on the
//! calling thread under one advisory lock, so a window is always resolved
//! against a self-consistent `(segments, index)` pair; head-segment indexing
//! and searching run on a single background worker that processes segments
//! most-recent-first. A worker result is installed only if the session is
//! still on the same file identity epoch it was enqueued under - rotation
//! cancels in-flight head work by making it stale.
//!
//! Driving a session: call [`Session::refresh`] (or wire a
//! [`crate::watch::StatusPoller`] into [`Session::apply_status`]) whenever
//! the file may have changed, then re-read the window. Every failure mode
//! degrades to empty or partial data and self-corrects on the next
//! notification.

use crate::config::ViewConfig;
use crate::index::indexer::{
    estimate_head_segment, head_scan_order, scan_head_segment, scan_tail_growth,
};
use crate::index::sparse::{IndexCollection, IndexKind, SparseIndex};
use crate::search::collection::SearchCollection;
use crate::search::matcher::Matcher;
use crate::search::searcher::scan_matches;
use crate::segment::{Segment, SegmentCollection, Segmenter};
use crate::utils::encoding::{TextFormat, detect_format};
use crate::view::cache::{PageDelta, VirtualizationCache};
use crate::view::provider::LineProvider;
use crate::view::window::ScrollRequest;
use crate::watch::notifier::{FileIdentity, FileStatus, probe};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// Background work item for one head segment
enum Work {
    IndexHead { epoch: u64, segment: Segment },
    SearchHead { epoch: u64, segment: Segment },
}

/// Search bookkeeping while a predicate is active
struct SearchState {
    matcher: Matcher,
    collection: Arc<SearchCollection>,
    tail_scanned_to: u64,
}

/// Everything guarded by the session lock
struct State {
    segmenter: Segmenter,
    segments: Option<SegmentCollection>,
    index: Arc<IndexCollection>,
    tail_scanned_to: u64,
    search: Option<SearchState>,
    identity: Option<FileIdentity>,
    format: Option<TextFormat>,
    /// File identity epoch; bumped on every rebuild
    epoch: u64,
    /// Published snapshot counter
    generation: u64,
    /// Outstanding background work items
    pending_work: usize,
}

struct Shared {
    path: PathBuf,
    config: ViewConfig,
    state: Mutex<State>,
    idle: Condvar,
}

/// One open file being viewed
pub struct Session {
    shared: Arc<Shared>,
    work_tx: Option<Sender<Work>>,
    worker: Option<JoinHandle<()>>,
}

/// Search progress snapshot
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SearchProgress {
    /// True while any segment's scan has not finished
    pub is_searching: bool,
    /// Segments participating in the search
    pub segments_total: usize,
    /// Segments whose scan has finished
    pub segments_completed: usize,
    /// Matches found so far
    pub total_matches: usize,
    /// True if the match cap stopped scanning early
    pub capped: bool,
}

/// Index summary for one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Whether the file currently exists
    pub exists: bool,
    /// File length covered by the current layout
    pub file_len: u64,
    /// Total line count (approximate while estimates are active)
    pub line_count: usize,
    /// True while any head segment is still an estimate
    pub approximate: bool,
    /// Number of segments in the layout
    pub segments_total: usize,
    /// Head segments with an exact index
    pub heads_indexed: usize,
    /// Head segments still estimated
    pub heads_estimated: usize,
    /// Detected text shape, once known
    pub format: Option<TextFormat>,
}

impl Session {
    /// Open `path` and apply the first status notification
    ///
    /// A missing file is not an error: the session starts with an empty
    /// provider and picks the file up when it appears.
    pub fn open(path: &Path, config: ViewConfig) -> Result<Self> {
        let config = config.sanitize();
        let (work_tx, work_rx) = channel();
        let shared = Arc::new(Shared {
            path: path.to_path_buf(),
            config: config.clone(),
            state: Mutex::new(State {
                segmenter: Segmenter::new(config.head_segment_size, config.tail_segment_size),
                segments: None,
                index: Arc::new(IndexCollection::new()),
                tail_scanned_to: 0,
                search: None,
                identity: None,
                format: None,
                epoch: 0,
                generation: 0,
                pending_work: 0,
            }),
            idle: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::spawn(move || worker_loop(worker_shared, work_rx));

        let session = Self {
            shared,
            work_tx: Some(work_tx),
            worker: Some(worker),
        };
        session.refresh();
        Ok(session)
    }

    /// The file this session views
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Stat the file now and apply whatever changed
    pub fn refresh(&self) {
        let status = {
            let mut state = self.shared.state.lock().unwrap();
            let (status, identity) = probe(&self.shared.path, state.identity);
            state.identity = identity;
            status
        };
        self.apply_status(status);
    }

    /// Apply one file-status notification
    pub fn apply_status(&self, status: FileStatus) {
        let mut queue = Vec::new();
        {
            let mut state = self.shared.state.lock().unwrap();
            let Some(change) = state.segmenter.apply(&status) else {
                return;
            };
            if change.rebuilt {
                self.rebuild(&mut state, change.collection, &mut queue);
            } else {
                self.grow_tail(&mut state, change.collection);
            }
        }
        self.submit(queue);
    }

    /// Provider over the current index snapshot
    pub fn provider(&self) -> LineProvider {
        let state = self.shared.state.lock().unwrap();
        let tail_start = state
            .segments
            .as_ref()
            .map(|s| s.tail().start)
            .unwrap_or(0);
        LineProvider::index(
            self.shared.path.clone(),
            Arc::clone(&state.index),
            tail_start,
        )
    }

    /// Provider over the current search snapshot, if a search is active
    pub fn search_provider(&self) -> Option<LineProvider> {
        let state = self.shared.state.lock().unwrap();
        let search = state.search.as_ref()?;
        let tail_start = state
            .segments
            .as_ref()
            .map(|s| s.tail().start)
            .unwrap_or(0);
        Some(LineProvider::search(
            self.shared.path.clone(),
            Arc::clone(&search.collection),
            tail_start,
        ))
    }

    /// Materialize one window against the index provider
    pub fn read_window(&self, request: &ScrollRequest) -> Vec<crate::view::line::Line> {
        self.provider().read_window(request)
    }

    /// Update a virtualization cache from the index provider
    pub fn update_window(
        &self,
        cache: &mut VirtualizationCache,
        request: &ScrollRequest,
    ) -> PageDelta {
        cache.update(Some(&self.provider()), request)
    }

    /// Start (or restart) a search with `matcher`
    ///
    /// The tail is scanned inline; head segments are queued for the
    /// background worker, most recent first.
    pub fn start_search(&self, matcher: Matcher) {
        let mut queue = Vec::new();
        {
            let mut state = self.shared.state.lock().unwrap();
            let Some(segments) = state.segments.clone() else {
                state.search = Some(SearchState {
                    matcher,
                    collection: Arc::new(SearchCollection::default()),
                    tail_scanned_to: 0,
                });
                return;
            };
            let epoch = state.epoch;
            state.search = Some(SearchState {
                matcher,
                collection: Arc::new(SearchCollection::for_layout(&segments)),
                tail_scanned_to: segments.tail().start,
            });
            self.scan_tail_matches(&mut state, &segments);
            for segment in head_scan_order(segments.heads()) {
                state.pending_work += 1;
                queue.push(Work::SearchHead { epoch, segment });
            }
        }
        self.submit(queue);
    }

    /// Drop any active search
    pub fn clear_search(&self) {
        let mut state = self.shared.state.lock().unwrap();
        state.search = None;
    }

    /// Current search progress, if a search is active
    pub fn search_progress(&self) -> Option<SearchProgress> {
        let state = self.shared.state.lock().unwrap();
        let search = state.search.as_ref()?;
        Some(SearchProgress {
            is_searching: search.collection.is_searching(),
            segments_total: search.collection.segments_total(),
            segments_completed: search.collection.segments_completed(),
            total_matches: search.collection.total_matches(),
            capped: search.collection.is_capped(),
        })
    }

    /// Live total line count (approximate while head estimates are active)
    pub fn total_count(&self) -> usize {
        self.shared.state.lock().unwrap().index.total_line_count()
    }

    /// True while the count still contains estimates
    pub fn is_approximate(&self) -> bool {
        self.shared.state.lock().unwrap().index.has_estimates()
    }

    /// Index summary for status displays
    pub fn stats(&self) -> SessionStats {
        let state = self.shared.state.lock().unwrap();
        let (exists, file_len, segments_total) = match state.segments.as_ref() {
            Some(segments) => (!segments.is_empty(), segments.file_len(), segments.segments().len()),
            None => (false, 0, 0),
        };
        let heads_indexed = state
            .index
            .entries()
            .filter(|(_, e)| e.kind == IndexKind::Page && !e.is_estimate())
            .count();
        let heads_estimated = state
            .index
            .entries()
            .filter(|(_, e)| e.is_estimate())
            .count();
        SessionStats {
            exists,
            file_len,
            line_count: state.index.total_line_count(),
            approximate: state.index.has_estimates(),
            segments_total,
            heads_indexed,
            heads_estimated,
            format: state.format,
        }
    }

    /// Detected text shape, once known
    pub fn format(&self) -> Option<TextFormat> {
        self.shared.state.lock().unwrap().format
    }

    /// Block until all queued head work has drained
    pub fn wait_idle(&self) {
        let mut state = self.shared.state.lock().unwrap();
        while state.pending_work > 0 {
            state = self.shared.idle.wait(state).unwrap();
        }
    }

    /// Discard everything and rebuild for a fresh layout
    fn rebuild(&self, state: &mut State, collection: SegmentCollection, queue: &mut Vec<Work>) {
        state.epoch += 1;
        let epoch = state.epoch;
        let tail = *collection.tail();
        let file_len = collection.file_len();

        let mut index = IndexCollection::new();
        state.tail_scanned_to = tail.start;
        state.format = None;

        if file_len > 0 {
            state.format = detect_format(&self.shared.path).ok();

            // Tail first: newest lines indexed with the lowest latency
            if let Ok(pass) =
                scan_tail_growth(&self.shared.path, tail.start, self.shared.config.compression, 0)
            {
                state.tail_scanned_to = pass.end_pos;
                index.insert(
                    tail.id,
                    SparseIndex::exact(
                        tail.start,
                        pass.end_pos,
                        self.shared.config.compression,
                        pass,
                        IndexKind::Tail,
                    ),
                );
            }

            // Heads: publish estimates now, queue exact scans unless the
            // file is too large to index exactly
            let avg = index
                .get(tail.id)
                .map(|t| t.avg_line_len())
                .unwrap_or(0.0);
            let scan_exactly = file_len <= self.shared.config.no_index_above_bytes;
            for head in collection.heads() {
                if avg > 0.0 {
                    index.insert(head.id, estimate_head_segment(head, avg));
                }
                if scan_exactly {
                    state.pending_work += 1;
                    queue.push(Work::IndexHead {
                        epoch,
                        segment: *head,
                    });
                }
            }
        }

        state.generation += 1;
        index.set_generation(state.generation);
        state.index = Arc::new(index);

        // An active search restarts from empty state on the new layout
        if let Some(active) = state.search.take() {
            state.search = Some(SearchState {
                matcher: active.matcher,
                collection: Arc::new(SearchCollection::for_layout(&collection)),
                tail_scanned_to: tail.start,
            });
            if file_len > 0 {
                self.scan_tail_matches(state, &collection);
                for segment in head_scan_order(collection.heads()) {
                    state.pending_work += 1;
                    queue.push(Work::SearchHead { epoch, segment });
                }
            }
        }

        state.segments = Some(collection);
    }

    /// Pure growth: scan only the newly appended bytes
    fn grow_tail(&self, state: &mut State, collection: SegmentCollection) {
        let tail = *collection.tail();
        let compression = self.shared.config.compression;

        let existing = state.index.get(tail.id).cloned();
        let (merged, scanned_to) = match existing {
            Some(tail_index) => {
                let phase = tail_index.line_count % compression;
                match scan_tail_growth(&self.shared.path, state.tail_scanned_to, compression, phase)
                {
                    Ok(pass) => {
                        let scanned_to = pass.end_pos.max(state.tail_scanned_to);
                        (tail_index.merge_tail(pass), scanned_to)
                    }
                    Err(_) => (tail_index, state.tail_scanned_to),
                }
            }
            None => match scan_tail_growth(&self.shared.path, tail.start, compression, 0) {
                Ok(pass) => {
                    let scanned_to = pass.end_pos;
                    (
                        SparseIndex::exact(tail.start, pass.end_pos, compression, pass, IndexKind::Tail),
                        scanned_to,
                    )
                }
                Err(_) => return,
            },
        };
        state.tail_scanned_to = scanned_to;

        let mut index = (*state.index).clone();
        index.insert(tail.id, merged);
        state.generation += 1;
        index.set_generation(state.generation);
        state.index = Arc::new(index);

        if state.search.is_some() {
            self.scan_tail_matches(state, &collection);
        }

        state.segments = Some(collection);
    }

    /// Scan `[search.tail_scanned_to, EOF)` for matches and append them
    fn scan_tail_matches(&self, state: &mut State, segments: &SegmentCollection) {
        let max_matches = self.shared.config.max_matches;
        let tail_id = segments.tail().id;
        let Some(search) = state.search.as_mut() else {
            return;
        };
        if search.collection.is_capped() {
            return;
        }
        let budget = max_matches.saturating_sub(search.collection.total_matches());
        let from = search.tail_scanned_to;
        match scan_matches(&self.shared.path, from, None, &search.matcher, budget) {
            Ok(pass) => {
                search.tail_scanned_to = pass.end_pos.max(from);
                let mut collection = (*search.collection).clone();
                collection.append_tail(tail_id, &pass.offsets);
                if pass.hit_budget || collection.total_matches() >= max_matches {
                    collection.cap();
                }
                search.collection = Arc::new(collection);
            }
            Err(_) => {
                // Stale read; the next notification re-drives us
            }
        }
    }

    fn submit(&self, queue: Vec<Work>) {
        let Some(tx) = self.work_tx.as_ref() else {
            return;
        };
        for work in queue {
            if tx.send(work).is_err() {
                let mut state = self.shared.state.lock().unwrap();
                state.pending_work = state.pending_work.saturating_sub(1);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop
        self.work_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Single background worker: drains head-segment work, most recent first by
/// queue order, and installs results only when still on the right epoch
fn worker_loop(shared: Arc<Shared>, work_rx: Receiver<Work>) {
    while let Ok(work) = work_rx.recv() {
        match work {
            Work::IndexHead { epoch, segment } => {
                let stale = { shared.state.lock().unwrap().epoch != epoch };
                if !stale {
                    let result =
                        scan_head_segment(&shared.path, &segment, shared.config.compression);
                    let mut state = shared.state.lock().unwrap();
                    if state.epoch == epoch {
                        if let Ok(exact) = result {
                            let mut index = (*state.index).clone();
                            index.insert(segment.id, exact);
                            state.generation += 1;
                            index.set_generation(state.generation);
                            state.index = Arc::new(index);
                        }
                        // On error the estimate stays; the next rebuild retries
                    }
                }
            }
            Work::SearchHead { epoch, segment } => {
                let job = {
                    let mut state = shared.state.lock().unwrap();
                    let epoch_now = state.epoch;
                    match state.search.as_mut() {
                        // A capped search never scans further; the queued
                        // segment was already completed with zero matches
                        Some(search) if epoch_now == epoch && !search.collection.is_capped() => {
                            let mut collection = (*search.collection).clone();
                            collection.mark_searching(segment.id);
                            let budget = shared
                                .config
                                .max_matches
                                .saturating_sub(collection.total_matches());
                            search.collection = Arc::new(collection);
                            Some((search.matcher.clone(), budget))
                        }
                        _ => None,
                    }
                };
                if let Some((matcher, budget)) = job {
                    let result = scan_matches(
                        &shared.path,
                        segment.start,
                        Some(segment.end),
                        &matcher,
                        budget,
                    );
                    let mut state = shared.state.lock().unwrap();
                    if state.epoch == epoch {
                        if let Some(search) = state.search.as_mut() {
                            if let Ok(pass) = result {
                                let mut collection = (*search.collection).clone();
                                collection.complete_segment(segment.id, pass.offsets);
                                if pass.hit_budget
                                    || collection.total_matches() >= shared.config.max_matches
                                {
                                    collection.cap();
                                }
                                search.collection = Arc::new(collection);
                            }
                        }
                    }
                }
            }
        }

        let mut state = shared.state.lock().unwrap();
        state.pending_work = state.pending_work.saturating_sub(1);
        if state.pending_work == 0 {
            shared.idle.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::window::ScrollRequest;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("tailview_engine_{}_{}.log", std::process::id(), n))
    }

    fn small_config() -> ViewConfig {
        ViewConfig {
            compression: 4,
            head_segment_size: 128,
            tail_segment_size: 64,
            ..Default::default()
        }
    }

    fn append(path: &PathBuf, content: &str) {
        let mut f = OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    fn numbered(range: std::ops::Range<usize>) -> String {
        range.map(|i| format!("line {:04}\n", i)).collect()
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let path = temp_path();
        let session = Session::open(&path, small_config()).unwrap();
        assert_eq!(session.total_count(), 0);
        assert!(session.read_window(&ScrollRequest::tail(10)).is_empty());
    }

    #[test]
    fn test_indexes_whole_file_after_idle() {
        let path = temp_path();
        fs::write(&path, numbered(0..200)).unwrap();
        let session = Session::open(&path, small_config()).unwrap();
        session.wait_idle();
        assert_eq!(session.total_count(), 200);
        assert!(!session.is_approximate());

        let lines = session.read_window(&ScrollRequest::at_line(50, 3));
        assert_eq!(lines[0].text, "line 0050");
        assert_eq!(lines[0].start, 50 * 10);
    }

    #[test]
    fn test_growth_extends_count() {
        let path = temp_path();
        fs::write(&path, numbered(0..100)).unwrap();
        let session = Session::open(&path, small_config()).unwrap();
        session.wait_idle();
        assert_eq!(session.total_count(), 100);

        append(&path, &numbered(100..105));
        session.refresh();
        assert_eq!(session.total_count(), 105);

        let lines = session.read_window(&ScrollRequest::tail(10));
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0].text, "line 0095");
        assert_eq!(lines[9].text, "line 0104");
    }

    #[test]
    fn test_truncation_discards_old_state() {
        let path = temp_path();
        fs::write(&path, numbered(0..1000)).unwrap();
        let session = Session::open(&path, small_config()).unwrap();
        session.wait_idle();
        assert_eq!(session.total_count(), 1000);

        fs::write(&path, numbered(0..5)).unwrap();
        session.refresh();
        session.wait_idle();
        assert_eq!(session.total_count(), 5);

        let lines = session.read_window(&ScrollRequest::tail(10));
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[4].text, "line 0004");
    }

    #[test]
    fn test_search_finds_matches_across_segments() {
        let path = temp_path();
        // 8-byte lines so segment cuts land on line boundaries
        let content: String = (0..300)
            .map(|i| {
                if i % 3 == 0 {
                    format!("mm{:05}\n", i)
                } else {
                    format!("oo{:05}\n", i)
                }
            })
            .collect();
        fs::write(&path, content).unwrap();
        let session = Session::open(&path, small_config()).unwrap();
        session.wait_idle();

        session.start_search(Matcher::substring("mm", false));
        session.wait_idle();
        let progress = session.search_progress().unwrap();
        assert!(!progress.is_searching);
        assert_eq!(progress.total_matches, 100);

        let provider = session.search_provider().unwrap();
        assert_eq!(provider.count(), 100);
        let lines = provider.read_window(&ScrollRequest::at_line(0, 3));
        assert_eq!(lines[0].text, "mm00000");
        assert_eq!(lines[1].text, "mm00003");
    }

    #[test]
    fn test_search_cap_stops_scanning() {
        let path = temp_path();
        fs::write(&path, numbered(0..500)).unwrap();
        let config = ViewConfig {
            max_matches: 50,
            ..small_config()
        };
        let session = Session::open(&path, config).unwrap();
        session.wait_idle();

        // Every line matches; cap must stop us at exactly 50
        session.start_search(Matcher::substring("line", false));
        session.wait_idle();
        let progress = session.search_progress().unwrap();
        assert!(!progress.is_searching);
        assert!(progress.capped);
        assert_eq!(progress.total_matches, 50);
    }

    #[test]
    fn test_search_survives_growth() {
        let path = temp_path();
        fs::write(&path, "noise\nmatch one\n").unwrap();
        let session = Session::open(&path, small_config()).unwrap();
        session.wait_idle();
        session.start_search(Matcher::substring("match", false));
        session.wait_idle();
        assert_eq!(session.search_progress().unwrap().total_matches, 1);

        append(&path, "noise\nmatch two\n");
        session.refresh();
        assert_eq!(session.search_progress().unwrap().total_matches, 2);
    }

    #[test]
    fn test_stats_reflect_layout() {
        let path = temp_path();
        fs::write(&path, numbered(0..200)).unwrap();
        let session = Session::open(&path, small_config()).unwrap();
        session.wait_idle();
        let stats = session.stats();
        assert!(stats.exists);
        assert_eq!(stats.file_len, 2000);
        assert_eq!(stats.line_count, 200);
        assert!(!stats.approximate);
        assert!(stats.segments_total > 1);
        assert_eq!(stats.heads_estimated, 0);
        assert!(stats.format.is_some());
    }
}
