//! Body decoders.
//!
//! - [`PayloadDecoder`]: picks the strategy from a [`PayloadSize`](crate::protocol::PayloadSize)
//! - `LengthDecoder`: bodies delimited by `Content-Length`
//! - `ChunkedDecoder`: the chunked transfer coding, tolerant of bare LF
//!
//! Every decoder yields [`PayloadItem::Chunk`](crate::protocol::PayloadItem::Chunk)
//! pieces followed by a single `Eof`; chunked bodies may put trailer lines
//! before it.

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;
