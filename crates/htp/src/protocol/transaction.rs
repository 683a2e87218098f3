//! The transaction context threaded through every hook.
//!
//! A [`Transaction`] is one request/response pair seen on a connection. The
//! parser owns it and fills it in as milestones pass; callbacks read it and may
//! write into it, including their own state through [`Transaction::set_user_data`].

use std::any::Any;
use std::fmt;

use bytes::Bytes;
use http::{Method, Version};

use crate::protocol::Flags;

/// Repetitions of one header name beyond which further values are dropped.
const MAX_HEADER_REPETITIONS: usize = 64;

/// A single header field as the tolerant grammar interpreted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub flags: Flags,
}

impl Header {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self::with_flags(name, value, Flags::empty())
    }

    pub fn with_flags(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>, flags: Flags) -> Self {
        Self { name: name.into(), value: value.into(), flags }
    }
}

/// What happened when a header was added to a [`Headers`] block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HeaderAddition {
    /// The name was seen for the first time.
    Inserted,
    /// The value was appended to an earlier header of the same name.
    Folded,
    /// A repeated `Content-Length` kept its first value; `ambiguous` is set
    /// when the values disagree.
    ContentLengthRepeated { ambiguous: bool },
    /// The name repeated too often and the value was dropped.
    Dropped,
}

/// An ordered header block with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    elements: Vec<Header>,
    repetitions: usize,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Header> {
        self.elements.iter().find(|h| h.name.eq_ignore_ascii_case(name.as_bytes()))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Header> {
        self.elements.iter_mut().find(|h| h.name.eq_ignore_ascii_case(name.as_bytes()))
    }

    /// The value of the named header, if present.
    pub fn value(&self, name: &str) -> Option<&[u8]> {
        self.get(name).map(|h| h.value.as_slice())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Adds a header, folding repetitions of the same name into the first
    /// occurrence with `", "` as separator.
    ///
    /// `Content-Length` is never folded, because a folded value would no longer
    /// parse as a length.
    pub fn add(&mut self, header: Header) -> HeaderAddition {
        let repetitions = self.repetitions;
        let Some(existing) = self.elements.iter_mut().find(|h| h.name.eq_ignore_ascii_case(&header.name)) else {
            self.elements.push(header);
            return HeaderAddition::Inserted;
        };

        if existing.flags.contains(Flags::FIELD_REPEATED) {
            if repetitions >= MAX_HEADER_REPETITIONS {
                return HeaderAddition::Dropped;
            }
            self.repetitions += 1;
        }
        existing.flags.insert(Flags::FIELD_REPEATED);

        if existing.name.eq_ignore_ascii_case(b"content-length") {
            let first = crate::utils::parse_content_length(&existing.value);
            let ambiguous = first.is_none() || first != crate::utils::parse_content_length(&header.value);
            return HeaderAddition::ContentLengthRepeated { ambiguous };
        }

        existing.value.extend_from_slice(b", ");
        existing.value.extend_from_slice(&header.value);
        HeaderAddition::Folded
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.elements.iter()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// How far the request side of a transaction got.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum RequestProgress {
    #[default]
    NotStarted,
    Line,
    Headers,
    Body,
    Complete,
    Failed,
}

/// How far the response side of a transaction got.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResponseProgress {
    #[default]
    NotStarted,
    Line,
    Headers,
    Body,
    Complete,
    Failed,
}

/// One request/response pair.
#[derive(Default)]
pub struct Transaction {
    /// Position of this transaction on its connection, starting at zero.
    pub index: usize,

    pub request_line: Option<Vec<u8>>,
    pub request_method: Option<Vec<u8>>,
    /// The method, when the emulated server recognises it.
    pub request_method_number: Option<Method>,
    pub request_uri: Option<Vec<u8>>,
    pub request_protocol: Option<Vec<u8>>,
    /// The protocol version, when recognisable. A missing protocol means HTTP/0.9.
    pub request_protocol_number: Option<Version>,
    /// The request path after the personality's normalization.
    pub normalized_path: Option<Vec<u8>>,
    pub request_headers: Headers,
    /// Body bytes seen so far, after removal of any transfer coding.
    pub request_body_len: u64,
    /// Lines before the request line that were skipped.
    pub request_ignored_lines: u32,
    pub request_progress: RequestProgress,

    pub response_line: Option<Vec<u8>>,
    pub response_protocol: Option<Vec<u8>>,
    pub response_protocol_number: Option<Version>,
    pub response_status: Option<Vec<u8>>,
    pub response_status_number: Option<u16>,
    pub response_message: Option<Vec<u8>>,
    pub response_headers: Headers,
    pub response_body_len: u64,
    pub response_progress: ResponseProgress,

    pub flags: Flags,
    /// The status the emulated server would answer this request with, when
    /// its parsing rules reject the request.
    pub response_status_expected: Option<u16>,

    /// The body chunk being delivered. Set only while a body-data hook runs;
    /// `None` on the call that marks the end of the body.
    pub body_chunk: Option<Bytes>,

    user_data: Option<Box<dyn Any + Send>>,
}

impl Transaction {
    pub fn new(index: usize) -> Self {
        Self { index, ..Self::default() }
    }

    /// Whether the request used HTTP/0.9, which has no headers and no response line.
    pub fn is_protocol_0_9(&self) -> bool {
        self.request_protocol_number == Some(Version::HTTP_09)
    }

    pub fn is_complete(&self) -> bool {
        self.request_progress == RequestProgress::Complete && self.response_progress == ResponseProgress::Complete
    }

    /// Whether neither direction will touch the transaction again, because
    /// each side either completed or failed.
    pub fn is_finished(&self) -> bool {
        matches!(self.request_progress, RequestProgress::Complete | RequestProgress::Failed)
            && matches!(self.response_progress, ResponseProgress::Complete | ResponseProgress::Failed)
    }

    /// Attaches callback state to the transaction, replacing any earlier value.
    pub fn set_user_data<T: Any + Send>(&mut self, data: T) {
        self.user_data = Some(Box::new(data));
    }

    pub fn user_data<T: Any + Send>(&self) -> Option<&T> {
        self.user_data.as_ref().and_then(|data| data.downcast_ref())
    }

    pub fn user_data_mut<T: Any + Send>(&mut self) -> Option<&mut T> {
        self.user_data.as_mut().and_then(|data| data.downcast_mut())
    }

    pub fn take_user_data(&mut self) -> Option<Box<dyn Any + Send>> {
        self.user_data.take()
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("index", &self.index)
            .field("request_line", &self.request_line.as_deref().map(String::from_utf8_lossy))
            .field("request_method_number", &self.request_method_number)
            .field("request_protocol_number", &self.request_protocol_number)
            .field("request_progress", &self.request_progress)
            .field("response_status_number", &self.response_status_number)
            .field("response_progress", &self.response_progress)
            .field("flags", &self.flags)
            .field("has_user_data", &self.user_data.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.add(Header::new("Content-Type", "text/plain"));

        assert_eq!(headers.value("content-type"), Some(&b"text/plain"[..]));
        assert_eq!(headers.value("CONTENT-TYPE"), Some(&b"text/plain"[..]));
        assert!(!headers.contains("host"));
    }

    #[test]
    fn repeated_names_fold_into_first() {
        let mut headers = Headers::new();
        assert_eq!(headers.add(Header::new("Accept", "a")), HeaderAddition::Inserted);
        assert_eq!(headers.add(Header::new("accept", "b")), HeaderAddition::Folded);

        let accept = headers.get("Accept").unwrap();
        assert_eq!(accept.value, b"a, b");
        assert!(accept.flags.contains(Flags::FIELD_REPEATED));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn repeated_content_length_is_not_folded() {
        let mut headers = Headers::new();
        headers.add(Header::new("Content-Length", "10"));

        assert_eq!(
            headers.add(Header::new("Content-Length", " 10")),
            HeaderAddition::ContentLengthRepeated { ambiguous: false }
        );
        assert_eq!(
            headers.add(Header::new("Content-Length", "11")),
            HeaderAddition::ContentLengthRepeated { ambiguous: true }
        );
        assert_eq!(headers.value("content-length"), Some(&b"10"[..]));
    }

    #[test]
    fn repetitions_are_capped() {
        let mut headers = Headers::new();
        headers.add(Header::new("X", "0"));
        for _ in 0..=MAX_HEADER_REPETITIONS {
            headers.add(Header::new("X", "1"));
        }
        assert_eq!(headers.add(Header::new("X", "2")), HeaderAddition::Dropped);
    }

    #[test]
    fn failed_sides_count_as_finished() {
        let mut tx = Transaction::new(0);
        tx.request_progress = RequestProgress::Failed;
        assert!(!tx.is_finished());

        tx.response_progress = ResponseProgress::Body;
        assert!(!tx.is_finished());

        tx.response_progress = ResponseProgress::Complete;
        assert!(tx.is_finished());
        assert!(!tx.is_complete());
    }

    #[test]
    fn user_data_round_trip() {
        let mut tx = Transaction::new(0);
        assert!(tx.user_data::<Vec<u32>>().is_none());

        tx.set_user_data(vec![1u32]);
        tx.user_data_mut::<Vec<u32>>().unwrap().push(2);

        assert_eq!(tx.user_data::<Vec<u32>>(), Some(&vec![1, 2]));
        assert!(tx.user_data::<String>().is_none());
        assert!(tx.take_user_data().is_some());
        assert!(tx.user_data::<Vec<u32>>().is_none());
    }
}
