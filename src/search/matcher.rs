//! Line-match predicates
//!
//! A [`Matcher`] decides whether one decoded line is a hit. Plain substring
//! matching is the default; regex is opt-in. The same type doubles as the
//! exclusion predicate for filtered providers.

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};

/// Predicate applied to each line's text
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Literal substring match
    Substring {
        /// The needle; lowercased when `case_insensitive`
        needle: String,
        /// Case-insensitive comparison
        case_insensitive: bool,
    },
    /// Regular expression match
    Regex(Regex),
}

impl Matcher {
    /// Literal substring matcher
    pub fn substring(needle: &str, case_insensitive: bool) -> Self {
        let needle = if case_insensitive {
            needle.to_lowercase()
        } else {
            needle.to_string()
        };
        Self::Substring {
            needle,
            case_insensitive,
        }
    }

    /// Regex matcher
    pub fn regex(pattern: &str, case_insensitive: bool) -> Result<Self> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .with_context(|| format!("invalid pattern: {}", pattern))?;
        Ok(Self::Regex(re))
    }

    /// Build from a CLI-style pattern
    pub fn from_pattern(pattern: &str, use_regex: bool, case_insensitive: bool) -> Result<Self> {
        if use_regex {
            Self::regex(pattern, case_insensitive)
        } else {
            Ok(Self::substring(pattern, case_insensitive))
        }
    }

    /// True if `line` matches
    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Self::Substring {
                needle,
                case_insensitive,
            } => {
                if *case_insensitive {
                    line.to_lowercase().contains(needle.as_str())
                } else {
                    line.contains(needle.as_str())
                }
            }
            Self::Regex(re) => re.is_match(line),
        }
    }

    /// Byte span of the first match within `line`, for highlighting
    pub fn find(&self, line: &str) -> Option<(usize, usize)> {
        match self {
            Self::Substring {
                needle,
                case_insensitive,
            } => {
                if *case_insensitive {
                    let lower = line.to_lowercase();
                    lower.find(needle.as_str()).map(|s| (s, s + needle.len()))
                } else {
                    line.find(needle.as_str()).map(|s| (s, s + needle.len()))
                }
            }
            Self::Regex(re) => re.find(line).map(|m| (m.start(), m.end())),
        }
    }
}
