//! The generic parsing rules every personality falls back to.
//!
//! The grammar is tolerant: odd input is interpreted the way most servers
//! would and recorded with anomaly flags, never rejected.

use http::{Method, Version};
use tracing::{debug, warn};

use crate::personality::path::PathDecoder;
use crate::protocol::{Flags, Header, HeaderAddition, Headers, ParseError, Transaction};
use crate::utils::{is_line_empty, is_lws, is_space, trim_lws};

/// Request line rules that differ between servers.
#[derive(Debug, Copy, Clone, Default)]
pub(crate) struct RequestLineRules {
    /// A NUL byte ends the line.
    pub nul_terminates: bool,
    /// Status the server answers a line starting with whitespace with. The
    /// whitespace then becomes part of the method. `None` skips it.
    pub leading_whitespace_status: Option<u16>,
}

/// An empty line ends the header block.
pub fn is_headers_terminator(line: &[u8]) -> bool {
    is_line_empty(line)
}

pub fn parse_request_line(tx: &mut Transaction, line: &[u8]) -> Result<(), ParseError> {
    parse_request_line_with(tx, line, RequestLineRules::default())
}

pub fn process_request_header(tx: &mut Transaction, line: &[u8]) -> Result<(), ParseError> {
    let header = parse_header(&mut tx.flags, line);
    store_header(&mut tx.request_headers, &mut tx.flags, header);
    Ok(())
}

/// Parses `PROTOCOL SP STATUS SP MESSAGE`.
///
/// Missing parts are left unset; a status that is not a three digit number is
/// kept raw and flagged.
pub fn parse_response_line(tx: &mut Transaction, line: &[u8]) -> Result<(), ParseError> {
    tx.response_protocol = None;
    tx.response_protocol_number = None;
    tx.response_status = None;
    tx.response_status_number = None;
    tx.response_message = None;

    let len = line.len();
    let mut pos = skip(line, 0, is_space);

    let start = pos;
    pos = skip(line, pos, |b| !is_space(b));
    if pos == start {
        raise_once(&mut tx.flags, Flags::STATUS_LINE_INVALID, "response line is empty");
        return Ok(());
    }

    let protocol = &line[start..pos];
    tx.response_protocol = Some(protocol.to_vec());
    tx.response_protocol_number = parse_protocol(protocol);
    if tx.response_protocol_number.is_none() {
        raise_once(&mut tx.flags, Flags::PROTOCOL_INVALID, "response protocol is invalid");
    }

    pos = skip(line, pos, is_space);
    if pos == len {
        raise_once(&mut tx.flags, Flags::STATUS_LINE_INVALID, "response status is missing");
        return Ok(());
    }

    let start = pos;
    pos = skip(line, pos, |b| !is_space(b));
    let status = &line[start..pos];
    tx.response_status = Some(status.to_vec());
    tx.response_status_number = parse_status(status);
    if tx.response_status_number.is_none() {
        raise_once(&mut tx.flags, Flags::STATUS_LINE_INVALID, "response status is not a number");
    }

    pos = skip(line, pos, is_space);
    if pos < len {
        tx.response_message = Some(line[pos..].to_vec());
    }

    Ok(())
}

pub fn process_response_header(tx: &mut Transaction, line: &[u8]) -> Result<(), ParseError> {
    let header = parse_header(&mut tx.flags, line);
    store_header(&mut tx.response_headers, &mut tx.flags, header);
    Ok(())
}

pub fn normalize_path(path: &[u8], flags: &mut Flags, status_expected: &mut Option<u16>) -> Vec<u8> {
    PathDecoder::GENERIC.decode(path, flags, status_expected)
}

/// Parses `METHOD SP URI SP PROTOCOL` under the given rules.
///
/// Any run of whitespace separates the parts. A line without a protocol is an
/// HTTP/0.9 request.
pub(crate) fn parse_request_line_with(
    tx: &mut Transaction,
    line: &[u8],
    rules: RequestLineRules,
) -> Result<(), ParseError> {
    let mut data = line;
    if rules.nul_terminates {
        if let Some(nul) = data.iter().position(|b| *b == 0) {
            data = &data[..nul];
            raise_once(&mut tx.flags, Flags::REQUEST_LINE_NUL_TERMINATED, "request line terminated by NUL");
        }
    }

    let len = data.len();
    let mut pos = skip(data, 0, is_space);
    let mut method_start = pos;
    if pos > 0 {
        raise_once(&mut tx.flags, Flags::REQUEST_LINE_LEADING_WHITESPACE, "request line has leading whitespace");
        if let Some(status) = rules.leading_whitespace_status {
            method_start = 0;
            tx.response_status_expected = Some(status);
        }
    }

    pos = skip(data, pos, |b| !is_space(b));
    let method = &data[method_start..pos];
    tx.request_method = Some(method.to_vec());
    tx.request_method_number = recognise_method(method);
    if tx.request_method_number.is_none() {
        raise_once(&mut tx.flags, Flags::METHOD_UNKNOWN, "request method is unknown");
    }

    let delimiter_start = pos;
    pos = skip(data, pos, is_space);
    if data[delimiter_start..pos].iter().any(|b| *b != b' ') {
        debug!("non-compliant delimiter between method and URI");
    }

    if pos == len {
        tx.request_protocol_number = Some(Version::HTTP_09);
        return Ok(());
    }

    // the URI ends at the first SP, unless other whitespace is all there is
    let start = pos;
    pos = skip(data, pos, |b| b != b' ');
    if pos == len && data[start..].iter().any(|b| is_space(*b)) {
        debug!("non-compliant delimiter after URI");
        pos = skip(data, start, |b| !is_space(b));
    }
    tx.request_uri = Some(data[start..pos].to_vec());

    pos = skip(data, pos, is_space);
    if pos == len {
        tx.request_protocol_number = Some(Version::HTTP_09);
        return Ok(());
    }

    let protocol = &data[pos..];
    tx.request_protocol = Some(protocol.to_vec());
    tx.request_protocol_number = parse_protocol(protocol);
    if tx.request_protocol_number.is_none() {
        raise_once(&mut tx.flags, Flags::PROTOCOL_INVALID, "request protocol is invalid");
    }

    Ok(())
}

/// Splits a header line into name and value.
///
/// A line without a colon becomes a header with an empty name whose value is
/// the whole line. The value ends at the first NUL byte.
pub(crate) fn parse_header(tx_flags: &mut Flags, line: &[u8]) -> Header {
    let Some(colon) = line.iter().position(|b| *b == b':' || *b == 0).filter(|pos| line[*pos] == b':') else {
        raise_once(tx_flags, Flags::FIELD_UNPARSEABLE, "header field has no colon");
        return Header::with_flags(Vec::new(), line, Flags::FIELD_UNPARSEABLE);
    };

    let mut flags = Flags::empty();
    if colon == 0 {
        flags.insert(Flags::FIELD_INVALID);
        raise_once(tx_flags, Flags::FIELD_INVALID, "header field has an empty name");
    }

    let mut name_end = colon;
    while name_end > 0 && is_lws(line[name_end - 1]) {
        name_end -= 1;
    }
    if name_end < colon {
        flags.insert(Flags::FIELD_INVALID);
        raise_once(tx_flags, Flags::FIELD_INVALID, "header field has whitespace after the name");
    }

    let name = &line[..name_end];
    if !name.iter().all(|b| is_token(*b)) {
        flags.insert(Flags::FIELD_INVALID);
        raise_once(tx_flags, Flags::FIELD_INVALID, "header field name is not a token");
    }

    let value = &line[colon + 1..];
    let value_end = value.iter().position(|b| *b == 0).unwrap_or(value.len());

    Header::with_flags(name, trim_lws(&value[..value_end]), flags)
}

/// Adds `header` to `headers`, recording repetitions on the transaction.
pub(crate) fn store_header(headers: &mut Headers, tx_flags: &mut Flags, header: Header) {
    match headers.add(header) {
        HeaderAddition::Inserted => {}
        HeaderAddition::Folded | HeaderAddition::ContentLengthRepeated { ambiguous: false } => {
            if tx_flags.set_once(Flags::FIELD_REPEATED) {
                debug!("header field repeated");
            }
        }
        HeaderAddition::ContentLengthRepeated { ambiguous: true } => {
            tx_flags.insert(Flags::FIELD_REPEATED);
            raise_once(tx_flags, Flags::AMBIGUOUS_CONTENT_LENGTH, "ambiguous content-length values");
        }
        HeaderAddition::Dropped => debug!("header field repeated too often, value dropped"),
    }
}

/// Maps a method to the ones the server knows. Methods are case-sensitive.
pub(crate) fn recognise_method(method: &[u8]) -> Option<Method> {
    match method {
        b"GET" => Some(Method::GET),
        b"HEAD" => Some(Method::HEAD),
        b"POST" => Some(Method::POST),
        b"PUT" => Some(Method::PUT),
        b"DELETE" => Some(Method::DELETE),
        b"CONNECT" => Some(Method::CONNECT),
        b"OPTIONS" => Some(Method::OPTIONS),
        b"TRACE" => Some(Method::TRACE),
        b"PATCH" => Some(Method::PATCH),
        b"PROPFIND" | b"PROPPATCH" | b"MKCOL" | b"COPY" | b"MOVE" | b"LOCK" | b"UNLOCK" | b"VERSION-CONTROL"
        | b"CHECKOUT" | b"UNCHECKOUT" | b"CHECKIN" | b"UPDATE" | b"LABEL" | b"REPORT" | b"MKWORKSPACE"
        | b"MKACTIVITY" | b"BASELINE-CONTROL" | b"MERGE" | b"ACL" | b"SEARCH" => Method::from_bytes(method).ok(),
        _ => None,
    }
}

/// Recognises `HTTP/1.0` and `HTTP/1.1`.
pub(crate) fn parse_protocol(protocol: &[u8]) -> Option<Version> {
    match trim_lws(protocol) {
        b"HTTP/1.0" => Some(Version::HTTP_10),
        b"HTTP/1.1" => Some(Version::HTTP_11),
        _ => None,
    }
}

/// Parses a three digit status code.
pub(crate) fn parse_status(status: &[u8]) -> Option<u16> {
    match trim_lws(status) {
        digits @ [_, _, _] if digits.iter().all(u8::is_ascii_digit) => {
            let code = digits.iter().fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0'));
            (code >= 100).then_some(code)
        }
        _ => None,
    }
}

/// Raises `flag` on the transaction, logging only the first occurrence.
pub(crate) fn raise_once(tx_flags: &mut Flags, flag: Flags, message: &'static str) {
    if tx_flags.set_once(flag) {
        warn!(flag = ?flag, "{message}");
    }
}

fn skip(data: &[u8], from: usize, predicate: impl Fn(u8) -> bool) -> usize {
    data[from..].iter().position(|b| !predicate(*b)).map_or(data.len(), |offset| from + offset)
}

fn is_token(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_line(line: &[u8]) -> Transaction {
        let mut tx = Transaction::new(0);
        parse_request_line(&mut tx, line).unwrap();
        tx
    }

    #[test]
    fn regular_request_line() {
        let tx = request_line(b"GET /index.html HTTP/1.1");

        assert_eq!(tx.request_method.as_deref(), Some(&b"GET"[..]));
        assert_eq!(tx.request_method_number, Some(Method::GET));
        assert_eq!(tx.request_uri.as_deref(), Some(&b"/index.html"[..]));
        assert_eq!(tx.request_protocol_number, Some(Version::HTTP_11));
        assert!(tx.flags.is_empty());
    }

    #[test]
    fn missing_protocol_is_http_0_9() {
        let tx = request_line(b"GET /");
        assert_eq!(tx.request_uri.as_deref(), Some(&b"/"[..]));
        assert!(tx.is_protocol_0_9());
        assert!(tx.request_protocol.is_none());

        let tx = request_line(b"GET");
        assert!(tx.is_protocol_0_9());
        assert!(tx.request_uri.is_none());
    }

    #[test]
    fn leading_whitespace_is_skipped_and_flagged() {
        let tx = request_line(b"  GET / HTTP/1.0");
        assert_eq!(tx.request_method.as_deref(), Some(&b"GET"[..]));
        assert!(tx.flags.contains(Flags::REQUEST_LINE_LEADING_WHITESPACE));
        assert_eq!(tx.response_status_expected, None);
    }

    #[test]
    fn tabs_separate_parts() {
        let tx = request_line(b"GET\t/a\tHTTP/1.0");
        assert_eq!(tx.request_uri.as_deref(), Some(&b"/a"[..]));
        assert_eq!(tx.request_protocol_number, Some(Version::HTTP_10));
    }

    #[test]
    fn nul_is_data_in_generic_request_line() {
        let tx = request_line(b"GET /a\0b HTTP/1.1");
        assert_eq!(tx.request_uri.as_deref(), Some(&b"/a\0b"[..]));
        assert!(!tx.flags.contains(Flags::REQUEST_LINE_NUL_TERMINATED));
    }

    #[test]
    fn unknown_method_and_protocol_are_flagged() {
        let tx = request_line(b"BREW /pot HTCPCP/1.0");
        assert_eq!(tx.request_method_number, None);
        assert_eq!(tx.request_protocol_number, None);
        assert!(tx.flags.contains(Flags::METHOD_UNKNOWN | Flags::PROTOCOL_INVALID));

        let tx = request_line(b"get / HTTP/1.1");
        assert!(tx.flags.contains(Flags::METHOD_UNKNOWN));

        let tx = request_line(b"PROPFIND /dav HTTP/1.1");
        assert_eq!(tx.request_method_number.as_ref().map(Method::as_str), Some("PROPFIND"));
    }

    #[test]
    fn header_name_and_value() {
        let mut flags = Flags::empty();
        let header = parse_header(&mut flags, b"Host:   example.com  ");
        assert_eq!(header.name, b"Host");
        assert_eq!(header.value, b"example.com");
        assert!(header.flags.is_empty());
        assert!(flags.is_empty());
    }

    #[test]
    fn header_without_colon() {
        let mut flags = Flags::empty();
        let header = parse_header(&mut flags, b"no colon here");
        assert!(header.name.is_empty());
        assert_eq!(header.value, b"no colon here");
        assert!(header.flags.contains(Flags::FIELD_UNPARSEABLE));
        assert!(flags.contains(Flags::FIELD_UNPARSEABLE));

        // a NUL before the colon hides it
        let header = parse_header(&mut flags, b"Name\0: value");
        assert!(header.name.is_empty());
    }

    #[test]
    fn invalid_header_names() {
        let mut flags = Flags::empty();
        let header = parse_header(&mut flags, b": value");
        assert!(header.name.is_empty());
        assert!(header.flags.contains(Flags::FIELD_INVALID));

        let header = parse_header(&mut flags, b"Host : example.com");
        assert_eq!(header.name, b"Host");
        assert!(header.flags.contains(Flags::FIELD_INVALID));

        let header = parse_header(&mut flags, b"Bad Name: x");
        assert_eq!(header.name, b"Bad Name");
        assert!(header.flags.contains(Flags::FIELD_INVALID));
        assert!(flags.contains(Flags::FIELD_INVALID));
    }

    #[test]
    fn header_value_ends_at_nul() {
        let mut flags = Flags::empty();
        let header = parse_header(&mut flags, b"X: abc\0def");
        assert_eq!(header.value, b"abc");
    }

    #[test]
    fn repeated_request_headers() {
        let mut tx = Transaction::new(0);
        process_request_header(&mut tx, b"Accept: a").unwrap();
        process_request_header(&mut tx, b"accept: b").unwrap();
        process_request_header(&mut tx, b"Content-Length: 1").unwrap();
        process_request_header(&mut tx, b"Content-Length: 2").unwrap();

        assert_eq!(tx.request_headers.value("Accept"), Some(&b"a, b"[..]));
        assert_eq!(tx.request_headers.value("Content-Length"), Some(&b"1"[..]));
        assert!(tx.flags.contains(Flags::FIELD_REPEATED | Flags::AMBIGUOUS_CONTENT_LENGTH));
    }

    #[test]
    fn regular_response_line() {
        let mut tx = Transaction::new(0);
        parse_response_line(&mut tx, b"HTTP/1.1 404 Not Found").unwrap();

        assert_eq!(tx.response_protocol_number, Some(Version::HTTP_11));
        assert_eq!(tx.response_status_number, Some(404));
        assert_eq!(tx.response_message.as_deref(), Some(&b"Not Found"[..]));
        assert!(tx.flags.is_empty());
    }

    #[test]
    fn odd_response_lines() {
        let mut tx = Transaction::new(0);
        parse_response_line(&mut tx, b"HTTP/1.0 2xx OK").unwrap();
        assert_eq!(tx.response_status.as_deref(), Some(&b"2xx"[..]));
        assert_eq!(tx.response_status_number, None);
        assert!(tx.flags.contains(Flags::STATUS_LINE_INVALID));

        let mut tx = Transaction::new(0);
        parse_response_line(&mut tx, b"HTTP/1.1 200").unwrap();
        assert_eq!(tx.response_status_number, Some(200));
        assert_eq!(tx.response_message, None);

        let mut tx = Transaction::new(0);
        parse_response_line(&mut tx, b"HTTP/1.1").unwrap();
        assert!(tx.flags.contains(Flags::STATUS_LINE_INVALID));
    }

    #[test]
    fn status_codes() {
        assert_eq!(parse_status(b"200"), Some(200));
        assert_eq!(parse_status(b"999"), Some(999));
        assert_eq!(parse_status(b"099"), None);
        assert_eq!(parse_status(b"20"), None);
        assert_eq!(parse_status(b"2000"), None);
    }

    #[test]
    fn terminator_is_empty_line() {
        assert!(is_headers_terminator(b"\r\n"));
        assert!(is_headers_terminator(b"\n"));
        assert!(!is_headers_terminator(b" \r\n"));
    }
}
