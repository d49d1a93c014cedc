//! Utility functions
//!
//! - [`encoding`] - one-shot newline/encoding detection

pub mod encoding;

pub use encoding::*;
