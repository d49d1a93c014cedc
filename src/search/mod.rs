//! Grep-like search over segmented files
//!
//! Structurally a twin of the [`crate::index`] module: the same segments,
//! the same boundary rules, the same tail-first incremental behavior - but
//! recording matching-line offsets instead of every-Nth-line offsets, with a
//! global match cap to bound memory.

pub mod collection;
pub mod matcher;
pub mod searcher;

pub use collection::{SearchCollection, SearchStatus, SegmentMatches};
pub use matcher::Matcher;
pub use searcher::{MatchPass, decode_line, scan_matches};
