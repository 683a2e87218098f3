//! Splits a byte stream into LF-terminated lines.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::ParseError;
use crate::utils::ensure;

/// Default upper bound on a buffered line, terminator included.
pub const DEFAULT_FIELD_LIMIT: usize = 18000;

/// Default length past which a line is flagged as unusually long.
pub const DEFAULT_FIELD_LIMIT_SOFT: usize = 9000;

/// A decoder yielding one line at a time, terminator included.
///
/// Only LF ends a line; a preceding CR stays part of it. Partial lines stay in
/// the buffer until their LF arrives, and a partial line longer than the limit
/// is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDecoder {
    max_length: usize,
    /// Where to resume the LF search, so partial lines are not rescanned.
    next_index: usize,
}

impl LineDecoder {
    pub fn new(max_length: usize) -> Self {
        Self { max_length, next_index: 0 }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_FIELD_LIMIT)
    }
}

impl Decoder for LineDecoder {
    type Item = Bytes;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let start = self.next_index.min(src.len());

        let Some(offset) = src[start..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            ensure!(src.len() <= self.max_length, ParseError::too_large_line(src.len(), self.max_length));
            return Ok(None);
        };

        let end = start + offset + 1;
        self.next_index = 0;
        ensure!(end <= self.max_length, ParseError::too_large_line(end, self.max_length));

        trace!(len = end, "decoded line");
        Ok(Some(src.split_to(end).freeze()))
    }
}
