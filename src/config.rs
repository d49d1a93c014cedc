//! Engine configuration
//!
//! All tuning knobs live in a single [`ViewConfig`] passed at session-open
//! time. Environment variables override the built-in defaults so the CLI and
//! tests can adjust behavior without plumbing flags everywhere.

use serde::Serialize;
use std::time::Duration;

/// Default sparse-index compression factor (record every Nth line offset)
pub const DEFAULT_COMPRESSION: usize = 10;

/// Default head segment size in bytes (16 MiB)
pub const DEFAULT_HEAD_SEGMENT_SIZE: u64 = 16 * 1024 * 1024;

/// Default tail segment size in bytes (256 KiB)
///
/// The tail covers at least this many trailing bytes so that recent writes
/// are always indexed by the cheap inline scan path.
pub const DEFAULT_TAIL_SEGMENT_SIZE: u64 = 256 * 1024;

/// Default cap on the total number of search matches kept in memory
pub const DEFAULT_MAX_MATCHES: usize = 50_000;

/// Default file size above which head segments are never scanned exactly
/// (250 MB); the line-count estimate is kept indefinitely instead.
pub const DEFAULT_NO_INDEX_ABOVE_BYTES: u64 = 250 * 1000 * 1000;

/// Default file-status poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Default debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Configuration for an open file session
#[derive(Debug, Clone, Serialize)]
pub struct ViewConfig {
    /// Sparse-index compression factor: one offset recorded per N lines
    pub compression: usize,
    /// Size of each closed head segment in bytes
    pub head_segment_size: u64,
    /// Minimum number of trailing bytes covered by the tail segment
    pub tail_segment_size: u64,
    /// Total search matches across all segments before scanning stops
    pub max_matches: usize,
    /// Files larger than this keep head estimates forever (no exact scan)
    pub no_index_above_bytes: u64,
    /// File-status poll interval in milliseconds
    pub poll_interval_ms: u64,
    /// Debounce window for file-status events in milliseconds
    pub debounce_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION,
            head_segment_size: DEFAULT_HEAD_SEGMENT_SIZE,
            tail_segment_size: DEFAULT_TAIL_SEGMENT_SIZE,
            max_matches: DEFAULT_MAX_MATCHES,
            no_index_above_bytes: DEFAULT_NO_INDEX_ABOVE_BYTES,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl ViewConfig {
    /// Load config with priority: environment variables > defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TAILVIEW_COMPRESSION") {
            if let Ok(n) = val.parse() {
                config.compression = n;
            }
        }

        if let Ok(val) = std::env::var("TAILVIEW_HEAD_SEGMENT_SIZE") {
            if let Ok(n) = val.parse() {
                config.head_segment_size = n;
            }
        }

        if let Ok(val) = std::env::var("TAILVIEW_TAIL_SEGMENT_SIZE") {
            if let Ok(n) = val.parse() {
                config.tail_segment_size = n;
            }
        }

        if let Ok(val) = std::env::var("TAILVIEW_MAX_MATCHES") {
            if let Ok(n) = val.parse() {
                config.max_matches = n;
            }
        }

        if let Ok(val) = std::env::var("TAILVIEW_NO_INDEX_ABOVE") {
            if let Ok(n) = val.parse() {
                config.no_index_above_bytes = n;
            }
        }

        if let Ok(val) = std::env::var("TAILVIEW_POLL_MS") {
            if let Ok(n) = val.parse() {
                config.poll_interval_ms = n;
            }
        }

        if let Ok(val) = std::env::var("TAILVIEW_DEBOUNCE_MS") {
            if let Ok(n) = val.parse() {
                config.debounce_ms = n;
            }
        }

        config.sanitize()
    }

    /// Clamp nonsensical values back to safe minimums
    pub fn sanitize(mut self) -> Self {
        if self.compression == 0 {
            self.compression = 1;
        }
        if self.head_segment_size == 0 {
            self.head_segment_size = DEFAULT_HEAD_SEGMENT_SIZE;
        }
        self
    }

    /// Get the poll interval duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Get the debounce window duration
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
