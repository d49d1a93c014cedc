//! Materialized lines
//!
//! A [`Line`] is one decoded, byte-addressed line handed to consumers. Its
//! `ordinal` is relative to the provider's numbering and shifts as the file
//! grows, so dedup identity is `(text, start)` instead - stable for any
//! unmodified region of the file.

use serde::Serialize;

/// One visible line with its exact byte range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    /// Line index within the provider's numbering
    pub ordinal: usize,
    /// Position within the materialized window
    pub window_index: usize,
    /// Byte offset of the first byte of the line
    pub start: u64,
    /// Offset one past the line's terminator
    pub end: u64,
    /// True if the line lives inside the tail segment
    pub is_in_tail_window: bool,
    /// Decoded text without the trailing delimiter
    pub text: String,
}

impl Line {
    /// Stable identity for diffing: `(text, start)`, not `ordinal`
    pub fn key(&self) -> LineKey<'_> {
        LineKey {
            start: self.start,
            text: &self.text,
        }
    }
}

/// Borrowed dedup identity of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineKey<'a> {
    /// Byte offset of the line
    pub start: u64,
    /// Line text
    pub text: &'a str,
}
