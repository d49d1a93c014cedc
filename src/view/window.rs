//! Window requests and page resolution
//!
//! A [`ScrollRequest`] names what the consumer wants to see - the tail, an
//! absolute line index, or a byte position. Resolution against a line count
//! produces a concrete [`Page`] clamped to `[0, total]`; the provider then
//! materializes the page's lines.

use serde::Serialize;

/// How the window tracks the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollMode {
    /// Pin the window to the end of the file; follows growth
    Tail,
    /// Hold an absolute position
    Random,
}

/// Where a random-mode window is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// First visible line by absolute index
    FirstIndex(usize),
    /// A byte position to translate into a line index
    BytePosition(u64),
}

/// One window request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRequest {
    /// Tail-following or absolute
    pub mode: ScrollMode,
    /// Number of lines to materialize
    pub page_size: usize,
    /// Anchor for random mode (ignored in tail mode)
    pub anchor: Anchor,
}

impl ScrollRequest {
    /// A tail-following window of `page_size` lines
    pub fn tail(page_size: usize) -> Self {
        Self {
            mode: ScrollMode::Tail,
            page_size,
            anchor: Anchor::FirstIndex(0),
        }
    }

    /// An absolute window starting at line `first`
    pub fn at_line(first: usize, page_size: usize) -> Self {
        Self {
            mode: ScrollMode::Random,
            page_size,
            anchor: Anchor::FirstIndex(first),
        }
    }

    /// An absolute window anchored at a byte position
    pub fn at_byte(pos: u64, page_size: usize) -> Self {
        Self {
            mode: ScrollMode::Random,
            page_size,
            anchor: Anchor::BytePosition(pos),
        }
    }
}

/// A resolved window: concrete first line and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Absolute index of the first materialized line
    pub first_line: usize,
    /// Number of lines to materialize
    pub size: usize,
}

/// Resolve a request against a total line count
///
/// `first_index` is the anchor line (already translated from a byte position
/// if needed). The window never starts past `total - page_size` and never
/// extends past `total`.
pub fn resolve_page(mode: ScrollMode, first_index: usize, page_size: usize, total: usize) -> Page {
    if page_size == 0 || total == 0 {
        return Page {
            first_line: 0,
            size: 0,
        };
    }
    let first_line = match mode {
        ScrollMode::Tail => total.saturating_sub(page_size),
        ScrollMode::Random => first_index.min(total.saturating_sub(page_size)),
    };
    Page {
        first_line,
        size: page_size.min(total - first_line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_mode_pins_to_end() {
        let page = resolve_page(ScrollMode::Tail, 0, 10, 100);
        assert_eq!(page.first_line, 90);
        assert_eq!(page.size, 10);
    }

    #[test]
    fn test_tail_mode_short_file() {
        let page = resolve_page(ScrollMode::Tail, 0, 10, 4);
        assert_eq!(page.first_line, 0);
        assert_eq!(page.size, 4);
    }

    #[test]
    fn test_random_mode_clamps_to_last_page() {
        let page = resolve_page(ScrollMode::Random, 95, 10, 100);
        assert_eq!(page.first_line, 90);
        assert_eq!(page.size, 10);
    }

    #[test]
    fn test_zero_page_size_is_empty() {
        let page = resolve_page(ScrollMode::Random, 5, 0, 100);
        assert_eq!(page.size, 0);
    }

    #[test]
    fn test_empty_total_is_empty() {
        let page = resolve_page(ScrollMode::Tail, 0, 10, 0);
        assert_eq!(page.size, 0);
    }
}
