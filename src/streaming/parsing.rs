//! Zero-allocation field parsing for tab-delimited call files.
//!
//! These helpers work on raw line bytes and never allocate; the reader
//! turns their `None` results into positioned `Malformed` errors.

use memchr::memchr;

/// Fast u64 parsing - no allocation, no error formatting.
///
/// Returns None if the input is empty or contains non-digit characters.
#[inline(always)]
pub fn parse_u64_fast(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for &b in bytes {
        let d = b.wrapping_sub(b'0');
        if d > 9 {
            return None;
        }
        n = n.checked_mul(10)?.checked_add(d as u64)?;
    }
    Some(n)
}

/// Parse a methylation percentage in `[0, 100]`.
#[inline]
pub fn parse_percent(bytes: &[u8]) -> Option<f64> {
    let text = std::str::from_utf8(bytes).ok()?;
    let value: f64 = text.trim().parse().ok()?;
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Some(value)
    } else {
        None
    }
}

/// Split a line on tabs into `fields`, reusing its allocation.
///
/// A trailing `\r` or `\n` is stripped first.
#[inline]
pub fn split_fields<'a>(line: &'a [u8], fields: &mut Vec<&'a [u8]>) {
    fields.clear();
    let line = trim_line_end(line);
    let mut rest = line;
    while let Some(tab) = memchr(b'\t', rest) {
        fields.push(&rest[..tab]);
        rest = &rest[tab + 1..];
    }
    fields.push(rest);
}

/// Strip trailing line terminators.
#[inline(always)]
pub fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Check if a line carries no record (blank or comment).
#[inline(always)]
pub fn should_skip_line(line: &[u8]) -> bool {
    let line = trim_line_end(line);
    line.iter().all(|b| b.is_ascii_whitespace()) || line[0] == b'#'
}
