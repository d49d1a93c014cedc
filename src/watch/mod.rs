//! File-status watching
//!
//! Polling-based change notification for a single file, debounced into
//! batched [`notifier::FileStatus`] updates.

pub mod debouncer;
pub mod notifier;

pub use debouncer::StatusDebouncer;
pub use notifier::{FileIdentity, FileStatus, StatusPoller, probe};
