//! Newline and encoding detection
//!
//! One-shot sniffing of a file's text shape: BOM-based encoding and the
//! newline delimiter length (`\n` vs `\r\n`). The result is treated as
//! immutable for the file's lifetime and re-detected only after an identity
//! change. Scanning itself always keys on the `0x0A` byte; the delimiter
//! length only affects how much is stripped from displayed text.

use memchr::memchr;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// How many leading bytes are sniffed
const SNIFF_BYTES: usize = 4096;

/// Detected text encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum TextEncoding {
    /// UTF-8 (or any ASCII-compatible single-byte encoding)
    Utf8,
    /// UTF-8 with a byte-order mark
    Utf8Bom,
    /// UTF-16 little-endian (BOM present)
    Utf16Le,
    /// UTF-16 big-endian (BOM present)
    Utf16Be,
}

/// Immutable text shape of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TextFormat {
    /// Detected encoding
    pub encoding: TextEncoding,
    /// Bytes per line delimiter (1 for `\n`, 2 for `\r\n`)
    pub delimiter_len: u8,
    /// Leading BOM bytes to skip
    pub bom_len: u8,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::Utf8,
            delimiter_len: 1,
            bom_len: 0,
        }
    }
}

/// Sniff the leading bytes of `path`
pub fn detect_format(path: &Path) -> io::Result<TextFormat> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; SNIFF_BYTES];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(detect_in(&buf[..filled]))
}

/// Detect format from a byte sample
pub fn detect_in(sample: &[u8]) -> TextFormat {
    let (encoding, bom_len) = match sample {
        [0xEF, 0xBB, 0xBF, ..] => (TextEncoding::Utf8Bom, 3),
        [0xFF, 0xFE, ..] => (TextEncoding::Utf16Le, 2),
        [0xFE, 0xFF, ..] => (TextEncoding::Utf16Be, 2),
        _ => (TextEncoding::Utf8, 0),
    };
    let delimiter_len = match memchr(b'\n', sample) {
        Some(i) if i > 0 && sample[i - 1] == b'\r' => 2,
        _ => 1,
    };
    TextFormat {
        encoding,
        delimiter_len,
        bom_len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_utf8_lf() {
        let f = detect_in(b"alpha\nbeta\n");
        assert_eq!(f.encoding, TextEncoding::Utf8);
        assert_eq!(f.delimiter_len, 1);
        assert_eq!(f.bom_len, 0);
    }

    #[test]
    fn test_crlf() {
        let f = detect_in(b"alpha\r\nbeta\r\n");
        assert_eq!(f.delimiter_len, 2);
    }

    #[test]
    fn test_utf8_bom() {
        let f = detect_in(b"\xEF\xBB\xBFalpha\n");
        assert_eq!(f.encoding, TextEncoding::Utf8Bom);
        assert_eq!(f.bom_len, 3);
    }

    #[test]
    fn test_utf16_le_bom() {
        let f = detect_in(b"\xFF\xFEa\0\n\0");
        assert_eq!(f.encoding, TextEncoding::Utf16Le);
        assert_eq!(f.bom_len, 2);
    }

    #[test]
    fn test_empty_sample_defaults() {
        assert_eq!(detect_in(b""), TextFormat::default());
    }
}
