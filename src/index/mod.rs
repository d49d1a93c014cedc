//! Sparse line indexing
//!
//! Splits indexing into three pieces:
//!
//! - [`scanner`] - the buffered line-read primitive and range scans
//! - [`sparse`] - per-segment sparse indexes and the ordered collection
//! - [`indexer`] - the tail-first and estimate-then-exact protocols

pub mod indexer;
pub mod scanner;
pub mod sparse;

pub use indexer::*;
pub use scanner::{LineScanner, ScanPass, scan_range};
pub use sparse::{IndexCollection, IndexKind, LineLocation, SparseIndex};
