//! Virtualization cache
//!
//! Holds the one currently visible page and, on every update, diffs the new
//! page against it using `(text, start)` identity so downstream consumers
//! receive minimal add/remove deltas instead of whole pages. Memory is
//! bounded by the page size regardless of total file size.

use crate::view::line::Line;
use crate::view::provider::LineProvider;
use crate::view::window::ScrollRequest;
use ahash::AHashSet;

/// Minimal delta between two visible pages
#[derive(Debug, Clone, Default)]
pub struct PageDelta {
    /// Lines that became visible
    pub added: Vec<Line>,
    /// Lines that stopped being visible
    pub removed: Vec<Line>,
}

impl PageDelta {
    /// True if nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The one materialized page and its diffing state
#[derive(Debug, Default)]
pub struct VirtualizationCache {
    visible: Vec<Line>,
}

impl VirtualizationCache {
    /// An empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently visible lines, in window order
    pub fn visible(&self) -> &[Line] {
        &self.visible
    }

    /// Recompute the visible page and emit the delta against the previous one
    ///
    /// A `page_size` of 0 or a missing provider clears the cache (everything
    /// is removed) rather than erroring.
    pub fn update(&mut self, provider: Option<&LineProvider>, request: &ScrollRequest) -> PageDelta {
        let next = match provider {
            Some(provider) if request.page_size > 0 => provider.read_window(request),
            _ => Vec::new(),
        };
        let delta = diff(&self.visible, &next);
        self.visible = next;
        delta
    }

    /// Drop everything, emitting removals for all visible lines
    pub fn clear(&mut self) -> PageDelta {
        let removed = std::mem::take(&mut self.visible);
        PageDelta {
            added: Vec::new(),
            removed,
        }
    }
}

fn diff(old: &[Line], new: &[Line]) -> PageDelta {
    let old_keys: AHashSet<_> = old.iter().map(|l| l.key()).collect();
    let new_keys: AHashSet<_> = new.iter().map(|l| l.key()).collect();
    PageDelta {
        added: new
            .iter()
            .filter(|l| !old_keys.contains(&l.key()))
            .cloned()
            .collect(),
        removed: old
            .iter()
            .filter(|l| !new_keys.contains(&l.key()))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ordinal: usize, start: u64, text: &str) -> Line {
        Line {
            ordinal,
            window_index: 0,
            start,
            end: start + text.len() as u64 + 1,
            is_in_tail_window: true,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_diff_overlapping_pages() {
        let old = vec![line(0, 0, "a"), line(1, 2, "b"), line(2, 4, "c")];
        let new = vec![line(1, 2, "b"), line(2, 4, "c"), line(3, 6, "d")];
        let delta = diff(&old, &new);
        assert_eq!(delta.added.len(), 1);
        assert_eq!(delta.added[0].text, "d");
        assert_eq!(delta.removed.len(), 1);
        assert_eq!(delta.removed[0].text, "a");
    }

    #[test]
    fn test_diff_ignores_ordinal_shift() {
        // Same (text, start) under new ordinals: no delta
        let old = vec![line(5, 100, "x")];
        let new = vec![line(9, 100, "x")];
        assert!(diff(&old, &new).is_empty());
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut cache = VirtualizationCache::new();
        cache.visible = vec![line(0, 0, "a")];
        let delta = cache.clear();
        assert_eq!(delta.removed.len(), 1);
        assert!(cache.visible().is_empty());
    }

    #[test]
    fn test_update_with_no_provider_clears() {
        let mut cache = VirtualizationCache::new();
        cache.visible = vec![line(0, 0, "a")];
        let delta = cache.update(None, &ScrollRequest::tail(10));
        assert_eq!(delta.removed.len(), 1);
        assert!(delta.added.is_empty());
        assert!(cache.visible().is_empty());
    }
}
