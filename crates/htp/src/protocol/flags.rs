//! Anomaly flags raised while parsing.
//!
//! The tolerant grammar never rejects odd input it can interpret. It records
//! what it saw instead, so inspection callbacks can reason about evasion
//! attempts. The same flag type is used on transactions and on single headers.

use bitflags::bitflags;

bitflags! {
    /// A set of anomaly flags.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u64 {
        /// A header line had no colon; it was kept with an empty name.
        const FIELD_UNPARSEABLE = 1;
        /// A header name was empty or followed by whitespace.
        const FIELD_INVALID = 1 << 1;
        /// A header spanned several lines.
        const FIELD_FOLDED = 1 << 2;
        /// The same header name appeared more than once.
        const FIELD_REPEATED = 1 << 3;
        /// A folded continuation line had no header to continue.
        const INVALID_FOLDING = 1 << 4;
        /// A strict HTTP parser would reject the request line.
        const REQUEST_LINE_INVALID = 1 << 5;
        /// Whitespace preceded the request method.
        const REQUEST_LINE_LEADING_WHITESPACE = 1 << 6;
        /// A NUL byte cut the request line short.
        const REQUEST_LINE_NUL_TERMINATED = 1 << 7;
        /// The method is not one the emulated server recognises.
        const METHOD_UNKNOWN = 1 << 8;
        /// The protocol string is not a recognisable HTTP version.
        const PROTOCOL_INVALID = 1 << 9;
        /// The response status line could not be interpreted.
        const STATUS_LINE_INVALID = 1 << 10;
        /// Repeated Content-Length headers disagree.
        const AMBIGUOUS_CONTENT_LENGTH = 1 << 11;
        /// Both Transfer-Encoding and Content-Length were present.
        const REQUEST_SMUGGLING = 1 << 12;
        /// The path contained an encoded separator (`%2f` or `%5c`).
        const PATH_ENCODED_SEPARATOR = 1 << 13;
        /// The path contained an invalid percent encoding.
        const PATH_INVALID_ENCODING = 1 << 14;
        /// The path used `%uXXXX` encoding.
        const PATH_U_ENCODING = 1 << 15;
        /// The path contained a raw or encoded NUL byte.
        const PATH_NUL_BYTE = 1 << 16;
        /// Headers were terminated by a line that was not empty.
        const HEADERS_WHITESPACE_TERMINATED = 1 << 17;
        /// A line grew past the soft field limit.
        const FIELD_LONG = 1 << 18;
        /// The decoded path contained a control character.
        const PATH_CONTROL_CHAR = 1 << 19;
    }
}

impl Flags {
    /// Raises `flag` and returns true if it was not raised before.
    ///
    /// Used to log an anomaly once per transaction.
    pub fn set_once(&mut self, flag: Flags) -> bool {
        let first = !self.contains(flag);
        self.insert(flag);
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_query() {
        let mut flags = Flags::empty();
        assert!(flags.is_empty());

        flags.insert(Flags::FIELD_INVALID);
        assert!(flags.contains(Flags::FIELD_INVALID));
        assert!(!flags.contains(Flags::FIELD_REPEATED));
        assert!(!flags.contains(Flags::FIELD_INVALID | Flags::FIELD_REPEATED));

        flags.insert(Flags::FIELD_REPEATED);
        assert!(flags.contains(Flags::FIELD_INVALID | Flags::FIELD_REPEATED));

        flags.remove(Flags::FIELD_INVALID);
        assert!(!flags.contains(Flags::FIELD_INVALID));
    }

    #[test]
    fn set_once_reports_first_occurrence() {
        let mut flags = Flags::empty();
        assert!(flags.set_once(Flags::FIELD_UNPARSEABLE));
        assert!(!flags.set_once(Flags::FIELD_UNPARSEABLE));
        assert!(flags.set_once(Flags::FIELD_LONG));
    }

    #[test]
    fn debug_lists_names() {
        let flags = Flags::METHOD_UNKNOWN | Flags::PATH_U_ENCODING;
        assert_eq!(format!("{flags:?}"), "Flags(METHOD_UNKNOWN | PATH_U_ENCODING)");
    }
}
