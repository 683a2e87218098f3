//! Byte-level decoders driving the connection parser.
//!
//! Both directions of a connection arrive in arbitrary slices. The decoders
//! here implement [`tokio_util::codec::Decoder`] over a [`bytes::BytesMut`]
//! buffer so partial input stays buffered until it can be framed:
//!
//! - [`LineDecoder`]: request, status and header lines
//! - [`PayloadDecoder`]: message bodies
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_htp::codec::LineDecoder;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = LineDecoder::default();
//! let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\nHost: exa"[..]);
//!
//! let line = decoder.decode(&mut buffer).unwrap().unwrap();
//! assert_eq!(&line[..], b"GET / HTTP/1.1\r\n");
//!
//! // the partial header line waits for more data
//! assert!(decoder.decode(&mut buffer).unwrap().is_none());
//! ```

mod body;
mod line_decoder;

pub use body::PayloadDecoder;
pub use line_decoder::{DEFAULT_FIELD_LIMIT, DEFAULT_FIELD_LIMIT_SOFT, LineDecoder};
