//! Line-oriented byte scanning
//!
//! [`LineScanner`] is the one read primitive everything else is built on: a
//! buffered, seekable cursor over a read-only file handle that advances one
//! line at a time using `memchr` for newline detection. Each component
//! (indexer, searcher, window resolver) opens its own scanner, so no seek
//! position is ever shared across threads.
//!
//! Only lines terminated by `\n` are *counted*; a trailing unterminated
//! partial line is left for the next scan after further growth, which keeps
//! incremental tail scans from double-counting a line that arrives in two
//! writes.

use memchr::memchr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// End of one scanned line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEnd {
    /// Offset one past the line's terminator (or EOF if unterminated)
    pub end: u64,
    /// True if the line ended with `\n`, false if it ran into EOF
    pub terminated: bool,
}

/// One materialized line including its byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// Byte offset of the first byte of the line
    pub start: u64,
    /// Offset one past the terminator
    pub end: u64,
    /// True if the line ended with `\n`
    pub terminated: bool,
    /// Raw line bytes including the terminator
    pub bytes: Vec<u8>,
}

/// Buffered line cursor over a read-only file handle
pub struct LineScanner {
    reader: BufReader<File>,
    pos: u64,
}

impl LineScanner {
    /// Open `path` for shared read
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::with_capacity(64 * 1024, file),
            pos: 0,
        })
    }

    /// Current byte position
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Reposition the cursor to an absolute byte offset
    pub fn seek(&mut self, pos: u64) -> io::Result<()> {
        if pos == self.pos {
            return Ok(());
        }
        self.reader.seek(SeekFrom::Start(pos))?;
        self.pos = pos;
        Ok(())
    }

    /// Advance past the next line without materializing it
    ///
    /// Returns `None` when the cursor is already at EOF.
    pub fn skip_line(&mut self) -> io::Result<Option<LineEnd>> {
        let mut read_any = false;
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(read_any.then_some(LineEnd {
                    end: self.pos,
                    terminated: false,
                }));
            }
            match memchr(b'\n', available) {
                Some(i) => {
                    self.reader.consume(i + 1);
                    self.pos += (i + 1) as u64;
                    return Ok(Some(LineEnd {
                        end: self.pos,
                        terminated: true,
                    }));
                }
                None => {
                    let n = available.len();
                    self.reader.consume(n);
                    self.pos += n as u64;
                    read_any = true;
                }
            }
        }
    }

    /// Skip up to `n` lines; returns how many were actually skipped
    pub fn skip_lines(&mut self, n: usize) -> io::Result<usize> {
        for skipped in 0..n {
            if self.skip_line()?.is_none() {
                return Ok(skipped);
            }
        }
        Ok(n)
    }

    /// After seeking to an arbitrary byte, drop the partial line under the
    /// cursor so the next read starts on a real line boundary
    pub fn resync(&mut self) -> io::Result<()> {
        if self.pos > 0 {
            self.skip_line()?;
        }
        Ok(())
    }

    /// Read the next line, including its terminator, into a fresh record
    ///
    /// Returns `None` at EOF. An unterminated final line *is* returned (with
    /// `terminated=false`); callers that only deal in counted lines must
    /// check the flag.
    pub fn read_line(&mut self) -> io::Result<Option<LineRecord>> {
        let start = self.pos;
        let mut bytes = Vec::new();
        loop {
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                if bytes.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(LineRecord {
                    start,
                    end: self.pos,
                    terminated: false,
                    bytes,
                }));
            }
            match memchr(b'\n', available) {
                Some(i) => {
                    bytes.extend_from_slice(&available[..=i]);
                    self.reader.consume(i + 1);
                    self.pos += (i + 1) as u64;
                    return Ok(Some(LineRecord {
                        start,
                        end: self.pos,
                        terminated: true,
                        bytes,
                    }));
                }
                None => {
                    bytes.extend_from_slice(available);
                    let n = available.len();
                    self.reader.consume(n);
                    self.pos += n as u64;
                }
            }
        }
    }
}

/// Result of one sparse scan pass over a byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPass {
    /// Number of complete lines counted in the range
    pub line_count: usize,
    /// End offset of every `compression`-th counted line, strictly increasing
    pub offsets: Vec<u64>,
    /// End offset of the last counted line (never past the requested bound)
    pub end_pos: u64,
}

/// Scan `[start, bound)` (or to EOF when `bound` is `None`), recording every
/// `compression`-th line's end offset
///
/// `phase` is the number of lines (mod `compression`) already counted by the
/// index this pass extends; passing it keeps offsets landing on the same
/// global every-Nth lines whether a range is scanned in one shot or in
/// increments, so concatenating incremental passes reproduces the one-shot
/// result exactly.
///
/// Boundary rule: a line that starts before `bound` but ends past it is
/// dropped from this pass and left to the scan of the following range, so no
/// line is ever counted by two adjacent segments.
pub fn scan_range(
    scanner: &mut LineScanner,
    start: u64,
    bound: Option<u64>,
    compression: usize,
    phase: usize,
) -> io::Result<ScanPass> {
    debug_assert!(compression >= 1);
    scanner.seek(start)?;
    let mut pass = ScanPass {
        line_count: 0,
        offsets: Vec::new(),
        end_pos: start,
    };
    while let Some(line) = scanner.skip_line()? {
        if !line.terminated {
            break;
        }
        if let Some(bound) = bound {
            if line.end > bound {
                break;
            }
        }
        pass.line_count += 1;
        pass.end_pos = line.end;
        if (phase + pass.line_count) % compression == 0 {
            pass.offsets.push(line.end);
        }
        if let Some(bound) = bound {
            if line.end >= bound {
                break;
            }
        }
    }
    Ok(pass)
}
