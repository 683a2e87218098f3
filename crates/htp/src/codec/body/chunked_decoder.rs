//! Decoder for the chunked transfer coding.
//!
//! Observed traffic is decoded, not validated, so the decoder accepts a bare
//! LF wherever CRLF is expected. Chunk extensions are skipped; trailer fields
//! are handed out line by line as [`PayloadItem::Trailer`].

use std::task::Poll;

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::LineDecoder;
use crate::protocol::{ParseError, PayloadItem};
use ChunkedState::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    /// Chunk data seen so far, for diagnostics.
    decoded: u64,
    trailer_lines: LineDecoder,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self::with_trailer_lines(LineDecoder::default())
    }

    /// A decoder whose trailer lines may not exceed `field_limit` bytes.
    pub fn with_field_limit(field_limit: usize) -> Self {
        Self::with_trailer_lines(LineDecoder::new(field_limit))
    }

    fn with_trailer_lines(trailer_lines: LineDecoder) -> Self {
        Self { state: Size, remaining_size: 0, decoded: 0, trailer_lines }
    }

    /// Total chunk data bytes decoded.
    pub fn decoded(&self) -> u64 {
        self.decoded
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Hex digits of the chunk size
    Size,
    /// Whitespace after the size
    SizeLws,
    /// Ignored chunk extension
    Extension,
    /// LF closing the size line
    SizeLf,
    /// Chunk data
    Body,
    /// CR or LF after the data
    BodyCr,
    /// LF after the data
    BodyLf,
    /// Lines after the last chunk, up to the empty one
    Trailers,
    End,
}

type Step = Poll<Result<ChunkedState, ParseError>>;

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!(decoded = self.decoded, "finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if self.state == Trailers {
                let Some(line) = self.trailer_lines.decode(src)? else {
                    return Ok(None);
                };
                if matches!(&line[..], b"\r\n" | b"\n") {
                    self.state = End;
                    continue;
                }
                trace!(len = line.len(), "read trailer line");
                return Ok(Some(PayloadItem::Trailer(line)));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut buf = None;

            self.state = match self.state.step(src, &mut self.remaining_size, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(bytes) = buf {
                self.decoded += bytes.len() as u64;
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            None => Err(ParseError::invalid_body("connection closed inside chunked body")),
            item => Ok(item),
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if $src.is_empty() {
            return Poll::Pending;
        }
        $src.get_u8()
    }};
}

impl ChunkedState {
    fn step(&self, src: &mut BytesMut, remaining_size: &mut u64, buf: &mut Option<Bytes>) -> Step {
        match self {
            Size => ChunkedState::read_size(src, remaining_size),
            SizeLws => ChunkedState::read_size_lws(src, *remaining_size),
            Extension => ChunkedState::read_extension(src, *remaining_size),
            SizeLf => ChunkedState::read_size_lf(src, *remaining_size),
            Body => ChunkedState::read_body(src, remaining_size, buf),
            BodyCr => ChunkedState::read_body_cr(src),
            BodyLf => ChunkedState::read_body_lf(src),
            Trailers | End => Poll::Ready(Ok(*self)),
        }
    }

    /// State after a complete size line.
    fn after_size_line(size: u64) -> Step {
        if size == 0 { Poll::Ready(Ok(Trailers)) } else { Poll::Ready(Ok(Body)) }
    }

    fn read_size(src: &mut BytesMut, size: &mut u64) -> Step {
        let digit = match try_next_byte!(src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            b'\t' | b' ' => return Poll::Ready(Ok(SizeLws)),
            b';' => return Poll::Ready(Ok(Extension)),
            b'\r' => return Poll::Ready(Ok(SizeLf)),
            b'\n' => return ChunkedState::after_size_line(*size),
            b => return Poll::Ready(Err(ParseError::invalid_body(format!("invalid chunk size byte 0x{b:02x}")))),
        };

        *size = match size.checked_mul(16).and_then(|s| s.checked_add(u64::from(digit))) {
            Some(size) => size,
            None => return Poll::Ready(Err(ParseError::invalid_body("chunk size overflow"))),
        };
        Poll::Ready(Ok(Size))
    }

    fn read_size_lws(src: &mut BytesMut, size: u64) -> Step {
        match try_next_byte!(src) {
            b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
            b';' => Poll::Ready(Ok(Extension)),
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => ChunkedState::after_size_line(size),
            _ => Poll::Ready(Err(ParseError::invalid_body("invalid chunk size whitespace"))),
        }
    }

    fn read_extension(src: &mut BytesMut, size: u64) -> Step {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(SizeLf)),
            b'\n' => ChunkedState::after_size_line(size),
            _ => Poll::Ready(Ok(Extension)),
        }
    }

    fn read_size_lf(src: &mut BytesMut, size: u64) -> Step {
        match try_next_byte!(src) {
            b'\n' => ChunkedState::after_size_line(size),
            _ => Poll::Ready(Err(ParseError::invalid_body("missing LF after chunk size"))),
        }
    }

    fn read_body(src: &mut BytesMut, size: &mut u64, buf: &mut Option<Bytes>) -> Step {
        if *size == 0 {
            return Poll::Ready(Ok(BodyCr));
        }

        let read_size = usize::try_from(*size).map_or(src.len(), |remaining| remaining.min(src.len()));
        *size -= read_size as u64;
        *buf = Some(src.split_to(read_size).freeze());

        if *size > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
    }

    fn read_body_cr(src: &mut BytesMut) -> Step {
        match try_next_byte!(src) {
            b'\r' => Poll::Ready(Ok(BodyLf)),
            b'\n' => Poll::Ready(Ok(Size)),
            _ => Poll::Ready(Err(ParseError::invalid_body("chunk data longer than its size"))),
        }
    }

    fn read_body_lf(src: &mut BytesMut) -> Step {
        match try_next_byte!(src) {
            b'\n' => Poll::Ready(Ok(Size)),
            _ => Poll::Ready(Err(ParseError::invalid_body("missing LF after chunk data"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut ChunkedDecoder, buffer: &mut BytesMut) -> Result<Vec<u8>, ParseError> {
        let mut body = Vec::new();
        loop {
            match decoder.decode(buffer)? {
                Some(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
                Some(PayloadItem::Trailer(_)) => {}
                Some(PayloadItem::Eof) => return Ok(body),
                None => panic!("decoder wants more data"),
            }
        }
    }

    #[test]
    fn multiple_chunks() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(collect(&mut decoder, &mut buffer).unwrap(), b"hello, world");
        assert_eq!(decoder.decoded(), 12);
        assert!(buffer.is_empty());
    }

    #[test]
    fn extensions_are_skipped() {
        let mut buffer = BytesMut::from(&b"5;name=value\r\nhello\r\n0\r\n\r\nnext"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(collect(&mut decoder, &mut buffer).unwrap(), b"hello");
        assert_eq!(&buffer[..], b"next");
    }

    #[test]
    fn trailer_lines_follow_the_last_chunk() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n0\r\nX-Sum: 1\r\nX-Tail: 2\n\r\nnext"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Chunk(Bytes::from_static(b"hello"))));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Trailer(Bytes::from_static(b"X-Sum: 1\r\n"))));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Trailer(Bytes::from_static(b"X-Tail: 2\n"))));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
        assert_eq!(&buffer[..], b"next");
    }

    #[test]
    fn split_trailer_line_resumes() {
        let mut buffer = BytesMut::from(&b"0\r\nX-Sum"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b": 1\r\n\r\n");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Trailer(Bytes::from_static(b"X-Sum: 1\r\n"))));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }

    #[test]
    fn overlong_trailer_line_is_rejected() {
        let mut buffer = BytesMut::from(&b"0\r\nX-Padding: aaaaaaaaaaaaaaaa\r\n\r\n"[..]);
        let result = ChunkedDecoder::with_field_limit(16).decode(&mut buffer);
        assert!(matches!(result, Err(ParseError::TooLargeLine { .. })));
    }

    #[test]
    fn bare_lf_is_tolerated() {
        let mut buffer = BytesMut::from(&b"3\nabc\nA; x\n0123456789\n0\n\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(collect(&mut decoder, &mut buffer).unwrap(), b"abc0123456789");
    }

    #[test]
    fn split_chunk_resumes() {
        let mut buffer = BytesMut::from(&b"5\r\nhel"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hel"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"lo\r\n0\r\n\r\n");
        assert_eq!(collect(&mut decoder, &mut buffer).unwrap(), b"lo");
    }

    #[test]
    fn invalid_size() {
        let mut buffer = BytesMut::from(&b"xyz\r\n"[..]);
        let result = ChunkedDecoder::new().decode(&mut buffer);
        assert!(matches!(result, Err(ParseError::InvalidBody { .. })));
    }

    #[test]
    fn size_overflow() {
        let mut buffer = BytesMut::from(&b"fffffffffffffffff\r\n"[..]);
        let result = ChunkedDecoder::new().decode(&mut buffer);
        assert_eq!(result, Err(ParseError::invalid_body("chunk size overflow")));
    }

    #[test]
    fn data_longer_than_size() {
        let mut buffer = BytesMut::from(&b"5\r\nhelloBad"[..]);
        let mut decoder = ChunkedDecoder::new();

        decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(decoder.decode(&mut buffer).is_err());
    }

    #[test]
    fn truncated_at_close() {
        let mut buffer = BytesMut::from(&b"5\r\nhel"[..]);
        let mut decoder = ChunkedDecoder::new();

        decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(decoder.decode_eof(&mut buffer).is_err());
    }
}
