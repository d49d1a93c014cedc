//! # tailview - Memory-bounded viewer engine for huge, live-growing text files
//!
//! tailview provides random-access, windowed viewing of arbitrarily large,
//! continuously-appended (and occasionally rotated) text files without ever
//! loading a full file into memory.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`segment`] - Splitting a file into independently scannable byte ranges
//! - [`index`] - Sparse line-start indexing (every Nth line) per segment
//! - [`search`] - Grep-like line matching with the same segment machinery
//! - [`view`] - Window resolution, line providers, and the virtualization cache
//! - [`watch`] - File-status polling and change debouncing
//! - [`engine`] - Per-file session coordinating indexing, search, and windows
//! - [`output`] - Terminal result formatting
//! - [`utils`] - Utility functions (newline/encoding detection)
//!
//! ## Quick Start
//!
//! ```ignore
//! use tailview::config::ViewConfig;
//! use tailview::engine::Session;
//! use tailview::view::window::ScrollRequest;
//!
//! // Open a file and wait for the sparse index to settle
//! let session = Session::open("/var/log/syslog".as_ref(), ViewConfig::default()).unwrap();
//! session.wait_idle();
//!
//! // Materialize the last 25 lines
//! let lines = session.read_window(&ScrollRequest::tail(25));
//! for line in lines {
//!     println!("{:>8}  {}", line.ordinal, line.text);
//! }
//! ```
//!
//! ## Design
//!
//! Files are split into fixed-size head segments plus one open-ended tail
//! segment. The tail is re-scanned on every growth so the newest lines are
//! indexed with the lowest latency; head segments are first *estimated* from
//! the tail's average line length and then scanned exactly by a single
//! background worker, most recent first. A window request resolves against
//! whichever index is current, then performs a bounded re-scan from the
//! nearest known offset, so materialized lines always carry exact byte
//! positions even when the index itself is approximate.

pub mod config;
pub mod engine;
pub mod index;
pub mod output;
pub mod search;
pub mod segment;
pub mod utils;
pub mod view;
pub mod watch;
