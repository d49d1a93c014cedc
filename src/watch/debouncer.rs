//! Status debouncer
//!
//! Accumulates file-status changes within a configurable time window and
//! produces one merged notification. This collapses rapid write bursts (an
//! external writer flushing many small appends, or a rotate-then-write) into
//! a single engine update.

use crate::watch::notifier::FileStatus;
use std::time::{Duration, Instant};

/// Debouncer that merges statuses arriving within a time window
#[derive(Debug)]
pub struct StatusDebouncer {
    window: Duration,
    pending: Option<FileStatus>,
    last_event: Option<Instant>,
}

impl StatusDebouncer {
    /// Create a debouncer with the given window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
            last_event: None,
        }
    }

    /// Merge one status into the pending batch
    ///
    /// The newest `exists`/`length` win; `identity_changed` is sticky for
    /// the batch, so a rotation inside the window is never lost.
    pub fn add(&mut self, status: FileStatus) {
        self.last_event = Some(Instant::now());
        self.pending = Some(match self.pending {
            Some(pending) => FileStatus {
                exists: status.exists,
                length: status.length,
                identity_changed: pending.identity_changed || status.identity_changed,
            },
            None => status,
        });
    }

    /// True once the window has elapsed since the last event
    pub fn is_ready(&self) -> bool {
        self.last_event
            .is_some_and(|last| last.elapsed() >= self.window)
    }

    /// True if a batch is waiting
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time until the pending batch is ready (`None` if nothing pending)
    pub fn time_until_ready(&self) -> Option<Duration> {
        self.last_event.map(|last| {
            let elapsed = last.elapsed();
            if elapsed >= self.window {
                Duration::ZERO
            } else {
                self.window - elapsed
            }
        })
    }

    /// Take the pending batch
    pub fn flush(&mut self) -> Option<FileStatus> {
        self.last_event = None;
        self.pending.take()
    }
}
