//! Utility macros and byte helpers for the parser crate.
//!
//! The helpers here are shared by the codecs, the strategy implementations and
//! the connection parser. They work on raw bytes because traffic is not
//! guaranteed to be valid UTF-8, or even valid HTTP.

/// A macro for early returns with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
///
/// # Example
///
/// ```ignore
/// ensure!(line.len() <= limit, ParseError::too_large_line(line.len(), limit));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Linear whitespace: SP or HT.
#[inline]
pub(crate) fn is_lws(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Whitespace as the tolerant grammar sees it, which includes the
/// control characters some servers treat as separators.
#[inline]
pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c)
}

/// Removes every trailing CR and LF from a line.
pub(crate) fn chomp(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    &line[..end]
}

/// True when the line holds nothing but its terminator.
pub(crate) fn is_line_empty(line: &[u8]) -> bool {
    chomp(line).is_empty()
}

/// True when the line holds only whitespace (an empty line included).
pub(crate) fn is_line_whitespace(line: &[u8]) -> bool {
    line.iter().all(|b| is_space(*b))
}

/// True when a header line continues the previous one.
#[inline]
pub(crate) fn is_line_folded(line: &[u8]) -> bool {
    line.first().is_some_and(|b| is_lws(*b))
}

/// Trims linear whitespace from both ends.
pub(crate) fn trim_lws(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| !is_lws(*b)).unwrap_or(data.len());
    let end = data.iter().rposition(|b| !is_lws(*b)).map_or(start, |pos| pos + 1);
    &data[start..end]
}

/// Parses a content-length value, tolerating surrounding whitespace only.
pub(crate) fn parse_content_length(value: &[u8]) -> Option<u64> {
    let digits = trim_lws(value);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    digits.iter().try_fold(0u64, |acc, b| acc.checked_mul(10)?.checked_add(u64::from(b - b'0')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chomp_strips_any_mix_of_terminators() {
        assert_eq!(chomp(b"GET / HTTP/1.1\r\n"), b"GET / HTTP/1.1");
        assert_eq!(chomp(b"Host: a\n"), b"Host: a");
        assert_eq!(chomp(b"x\r\r\n"), b"x");
        assert_eq!(chomp(b"\r\n"), b"");
        assert_eq!(chomp(b""), b"");
    }

    #[test]
    fn line_classification() {
        assert!(is_line_empty(b"\r\n"));
        assert!(is_line_empty(b"\n"));
        assert!(!is_line_empty(b" \r\n"));

        assert!(is_line_whitespace(b" \t\r\n"));
        assert!(is_line_whitespace(b"\r\n"));
        assert!(!is_line_whitespace(b" a\r\n"));

        assert!(is_line_folded(b" continued\r\n"));
        assert!(is_line_folded(b"\tcontinued\r\n"));
        assert!(!is_line_folded(b"Host: a\r\n"));
        assert!(!is_line_folded(b""));
    }

    #[test]
    fn trim_lws_keeps_inner_whitespace() {
        assert_eq!(trim_lws(b"  a b \t"), b"a b");
        assert_eq!(trim_lws(b"   "), b"");
        assert_eq!(trim_lws(b""), b"");
    }

    #[test]
    fn content_length_values() {
        assert_eq!(parse_content_length(b"10"), Some(10));
        assert_eq!(parse_content_length(b" 42\t"), Some(42));
        assert_eq!(parse_content_length(b""), None);
        assert_eq!(parse_content_length(b"1 0"), None);
        assert_eq!(parse_content_length(b"-1"), None);
        assert_eq!(parse_content_length(b"0x10"), None);
        assert_eq!(parse_content_length(b"99999999999999999999999"), None);
    }
}
