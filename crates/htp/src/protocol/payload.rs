use bytes::Bytes;

/// An item produced by the body decoders.
///
/// A body is a stream of chunks closed by a single `Eof` marker. A chunked
/// body may carry trailer lines between its last chunk and `Eof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A piece of body data
    Chunk(Bytes),
    /// A trailer field line of a chunked body, terminator included
    Trailer(Bytes),
    /// Marks the end of the body
    Eof,
}

/// How the body of a message is delimited.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// A body of a known length in bytes
    Length(u64),
    /// A body using chunked transfer coding
    Chunked,
    /// A body that lasts until the connection closes
    UntilClose,
    /// No body at all
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty | PayloadSize::Length(0))
    }
}

impl PayloadItem {
    /// Returns true if this item represents the end of the body
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Returns a reference to the contained bytes if this is a Chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Trailer(_) | PayloadItem::Eof => None,
        }
    }

    /// Consumes the item and returns the contained bytes if this is a Chunk
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Trailer(_) | PayloadItem::Eof => None,
        }
    }
}
