//! Window resolution and line delivery
//!
//! - [`window`] - scroll requests and page clamping
//! - [`line`] - materialized lines and their dedup identity
//! - [`provider`] - index/search providers and decorators
//! - [`cache`] - the single-page virtualization cache and its diffs

pub mod cache;
pub mod line;
pub mod provider;
pub mod window;

pub use cache::{PageDelta, VirtualizationCache};
pub use line::{Line, LineKey};
pub use provider::LineProvider;
pub use window::{Anchor, Page, ScrollMode, ScrollRequest, resolve_page};
