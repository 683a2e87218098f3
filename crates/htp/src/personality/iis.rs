//! Microsoft IIS quirks.

use crate::utils::is_line_whitespace;

/// IIS 5.1 ends the header block at a line holding only whitespace.
pub fn is_headers_terminator_5_1(line: &[u8]) -> bool {
    is_line_whitespace(line)
}
