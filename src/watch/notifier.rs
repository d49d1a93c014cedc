//! File-status notification
//!
//! The engine consumes a stream of [`FileStatus`] values: does the file
//! exist, how long is it, and is it still the *same* file. Identity is
//! tracked by device/inode on Unix (creation time elsewhere) so a
//! rotate-and-recreate at the same path is distinguishable from pure growth.
//!
//! [`StatusPoller`] is the built-in producer: a background thread that stats
//! the file on an interval, debounces rapid changes, and sends batched
//! statuses down a channel. Anything that can produce `FileStatus` values
//! (inotify, kqueue, a test harness) can drive the engine the same way.

use crate::config::ViewConfig;
use crate::watch::debouncer::StatusDebouncer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// One file-state notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    /// File exists at the path
    pub exists: bool,
    /// Current length in bytes (0 when missing)
    pub length: u64,
    /// The path now refers to a different file than before
    pub identity_changed: bool,
}

/// Stable identity of a file independent of its path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
    #[cfg(not(unix))]
    created: Option<std::time::SystemTime>,
    #[cfg(not(unix))]
    len_at_first_sight: u64,
}

impl FileIdentity {
    fn of(metadata: &std::fs::Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            Self {
                dev: metadata.dev(),
                ino: metadata.ino(),
            }
        }
        #[cfg(not(unix))]
        {
            Self {
                created: metadata.created().ok(),
                len_at_first_sight: metadata.len(),
            }
        }
    }
}

/// Stat the file once and compare against the previously seen identity
///
/// Returns the status plus the identity to carry forward (unchanged while
/// the file is missing, so a recreation is still detected).
pub fn probe(path: &Path, previous: Option<FileIdentity>) -> (FileStatus, Option<FileIdentity>) {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => {
            let identity = FileIdentity::of(&metadata);
            let identity_changed = previous.is_some_and(|prev| prev != identity);
            (
                FileStatus {
                    exists: true,
                    length: metadata.len(),
                    identity_changed,
                },
                Some(identity),
            )
        }
        _ => (
            FileStatus {
                exists: false,
                length: 0,
                identity_changed: false,
            },
            previous,
        ),
    }
}

/// Background stat-polling thread feeding debounced statuses into a channel
pub struct StatusPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    /// Start polling `path`; statuses arrive on `tx`
    ///
    /// The thread exits when [`StatusPoller::stop`] is called or the
    /// receiver is dropped.
    pub fn spawn(path: PathBuf, config: &ViewConfig, tx: Sender<FileStatus>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let poll_interval = config.poll_interval();
        let debounce = config.debounce_duration();

        let handle = thread::spawn(move || {
            let mut debouncer = StatusDebouncer::new(debounce);
            let mut identity = None;
            let mut last_seen: Option<(bool, u64)> = None;

            while !stop_flag.load(Ordering::Relaxed) {
                let (status, next_identity) = probe(&path, identity);
                identity = next_identity;

                let changed = status.identity_changed
                    || last_seen != Some((status.exists, status.length));
                if changed {
                    debouncer.add(status);
                    last_seen = Some((status.exists, status.length));
                }

                if debouncer.has_pending() && debouncer.is_ready() {
                    if let Some(batched) = debouncer.flush() {
                        if tx.send(batched).is_err() {
                            break;
                        }
                    }
                }

                thread::sleep(poll_interval);
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the thread to exit and wait for it
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
