//! Match scanning
//!
//! The search analogue of the sparse range scan: walk a byte range line by
//! line and record the start offset of every line the predicate accepts,
//! up to a caller-supplied budget. The same boundary rule as indexing
//! applies, so a line straddling a segment cut is tested by exactly one
//! segment's scan.

use crate::index::scanner::LineScanner;
use crate::search::matcher::Matcher;
use anyhow::{Context, Result};
use std::path::Path;

/// Result of one match scan over a byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPass {
    /// Start offsets of matching lines, ascending
    pub offsets: Vec<u64>,
    /// End offset of the last scanned line
    pub end_pos: u64,
    /// True if the scan stopped because the budget ran out
    pub hit_budget: bool,
}

/// Scan `[start, bound)` (or to EOF) for lines matching `matcher`
///
/// At most `budget` offsets are recorded; a zero budget returns immediately
/// with `hit_budget` set.
pub fn scan_matches(
    path: &Path,
    start: u64,
    bound: Option<u64>,
    matcher: &Matcher,
    budget: usize,
) -> Result<MatchPass> {
    let mut pass = MatchPass {
        offsets: Vec::new(),
        end_pos: start,
        hit_budget: budget == 0,
    };
    if budget == 0 {
        return Ok(pass);
    }
    let mut scanner = LineScanner::open(path)
        .with_context(|| format!("opening {} for match scan", path.display()))?;
    scanner.seek(start)?;
    while let Some(line) = scanner.read_line()? {
        if !line.terminated {
            break;
        }
        if let Some(bound) = bound {
            if line.end > bound {
                break;
            }
        }
        let text = decode_line(&line.bytes);
        if matcher.is_match(&text) {
            pass.offsets.push(line.start);
            if pass.offsets.len() >= budget {
                pass.end_pos = line.end;
                pass.hit_budget = true;
                return Ok(pass);
            }
        }
        pass.end_pos = line.end;
        if let Some(bound) = bound {
            if line.end >= bound {
                break;
            }
        }
    }
    Ok(pass)
}

/// Decode raw line bytes to text, dropping the trailing delimiter
pub fn decode_line(bytes: &[u8]) -> String {
    let mut end = bytes.len();
    if end > 0 && bytes[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && bytes[end - 1] == b'\r' {
        end -= 1;
    }
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn write_temp(content: &[u8]) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "tailview_searcher_{}_{}.log",
            std::process::id(),
            n
        ));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_scan_matches_records_line_starts() {
        let path = write_temp(b"ok\nerror one\nok\nerror two\n");
        let m = Matcher::substring("error", false);
        let pass = scan_matches(&path, 0, None, &m, usize::MAX).unwrap();
        assert_eq!(pass.offsets, vec![3, 16]);
        assert!(!pass.hit_budget);
    }

    #[test]
    fn test_scan_matches_respects_budget() {
        let content: String = (0..20).map(|i| format!("error {}\n", i)).collect();
        let path = write_temp(content.as_bytes());
        let m = Matcher::substring("error", false);
        let pass = scan_matches(&path, 0, None, &m, 5).unwrap();
        assert_eq!(pass.offsets.len(), 5);
        assert!(pass.hit_budget);
    }

    #[test]
    fn test_scan_matches_drops_straddling_line() {
        // cut at byte 8, inside "error one\n"
        let path = write_temp(b"ok\nerror one\nok\n");
        let m = Matcher::substring("error", false);
        let left = scan_matches(&path, 0, Some(8), &m, usize::MAX).unwrap();
        assert!(left.offsets.is_empty());
        // The right-hand scan starting at the cut tests the remainder
        let right = scan_matches(&path, 8, None, &m, usize::MAX).unwrap();
        assert_eq!(right.offsets, vec![8]);
    }

    #[test]
    fn test_decode_line_strips_delimiters() {
        assert_eq!(decode_line(b"plain\n"), "plain");
        assert_eq!(decode_line(b"crlf\r\n"), "crlf");
        assert_eq!(decode_line(b"unterminated"), "unterminated");
        assert_eq!(decode_line(b""), "");
    }

    #[test]
    fn test_unterminated_line_not_matched() {
        let path = write_temp(b"error one\nerror tw");
        let m = Matcher::substring("error", false);
        let pass = scan_matches(&path, 0, None, &m, usize::MAX).unwrap();
        assert_eq!(pass.offsets, vec![0]);
        assert_eq!(pass.end_pos, 10);
    }
}
