//! Request path normalization.
//!
//! Servers disagree on how a path maps to a resource: whether `\` separates
//! segments, whether `%2f` is a separator or data, whether `%u0041` means `A`.
//! Each personality picks a [`PathDecoder`] that reproduces its server.

use tracing::warn;

use crate::protocol::Flags;

/// Byte substituted for `%u` code points that do not fit a single byte.
const REPLACEMENT_BYTE: u8 = b'?';

/// How a server turns the raw request path into the path it serves.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct PathDecoder {
    /// Treat a backslash, raw or decoded, as a path separator.
    pub backslash_separators: bool,
    /// Decode `%2f` (and `%5c`) into separators instead of keeping them encoded.
    pub decode_separators: bool,
    /// Collapse runs of separators into one.
    pub compress_separators: bool,
    /// Decode the non-standard `%uXXXX` form.
    pub u_encoding: bool,
    /// Lowercase the result, as a case-insensitive filesystem would.
    pub lowercase: bool,
    /// Status the server answers a path with an invalid percent encoding.
    pub invalid_encoding_status: Option<u16>,
    /// Status the server answers a path using `%u` encoding.
    pub u_encoding_status: Option<u16>,
    /// Status the server answers a path that decodes to a control character.
    pub control_chars_status: Option<u16>,
}

impl PathDecoder {
    /// Percent-decoding only.
    pub const MINIMAL: PathDecoder = PathDecoder {
        backslash_separators: false,
        decode_separators: false,
        compress_separators: false,
        u_encoding: false,
        lowercase: false,
        invalid_encoding_status: None,
        u_encoding_status: None,
        control_chars_status: None,
    };

    pub const GENERIC: PathDecoder = PathDecoder {
        backslash_separators: true,
        decode_separators: true,
        compress_separators: true,
        ..PathDecoder::MINIMAL
    };

    pub const APACHE_2: PathDecoder = PathDecoder {
        compress_separators: true,
        invalid_encoding_status: Some(400),
        ..PathDecoder::MINIMAL
    };

    pub const IIS_6_0: PathDecoder = PathDecoder {
        u_encoding: true,
        u_encoding_status: Some(400),
        control_chars_status: Some(400),
        ..PathDecoder::GENERIC
    };

    /// IIS 7.0 and 7.5.
    pub const IIS_7: PathDecoder = PathDecoder {
        u_encoding: true,
        invalid_encoding_status: Some(400),
        control_chars_status: Some(400),
        ..PathDecoder::GENERIC
    };

    pub const IDS: PathDecoder = PathDecoder { u_encoding: true, lowercase: true, ..PathDecoder::GENERIC };

    /// Decodes `path`, raising anomaly flags into `flags`.
    ///
    /// Invalid percent encodings are preserved as they are. When the path uses
    /// an encoding this server refuses, `status_expected` receives the status
    /// it answers with.
    pub fn decode(&self, path: &[u8], flags: &mut Flags, status_expected: &mut Option<u16>) -> Vec<u8> {
        let mut out = Vec::with_capacity(path.len());
        let mut pos = 0;

        while pos < path.len() {
            let b = path[pos];

            if b == b'%' {
                if self.is_u_encoded(&path[pos..]) {
                    expect(status_expected, self.u_encoding_status);
                    if let Some(c) = decode_u(&path[pos..]) {
                        flags.insert(Flags::PATH_U_ENCODING);
                        self.push_decoded(&mut out, c, &path[pos..pos + 6], flags);
                        pos += 6;
                        continue;
                    }
                }

                if let Some(c) = decode_hex_pair(path.get(pos + 1..pos + 3)) {
                    self.push_decoded(&mut out, c, &path[pos..pos + 3], flags);
                    pos += 3;
                    continue;
                }

                if flags.set_once(Flags::PATH_INVALID_ENCODING) {
                    warn!("path contains invalid percent encoding");
                }
                expect(status_expected, self.invalid_encoding_status);
                out.push(b'%');
                pos += 1;
                continue;
            }

            match b {
                0 => {
                    flags.insert(Flags::PATH_NUL_BYTE);
                    out.push(0);
                }
                b'\\' if self.backslash_separators => out.push(b'/'),
                _ => out.push(b),
            }
            pos += 1;
        }

        if out.iter().any(|c| *c < 0x20) {
            flags.insert(Flags::PATH_CONTROL_CHAR);
            expect(status_expected, self.control_chars_status);
        }

        if self.lowercase {
            out.make_ascii_lowercase();
        }

        if self.compress_separators {
            out.dedup_by(|current, previous| *current == b'/' && *previous == b'/');
        }

        out
    }

    fn is_u_encoded(&self, encoded: &[u8]) -> bool {
        self.u_encoding && matches!(encoded.get(1), Some(b'u' | b'U'))
    }

    fn push_decoded(&self, out: &mut Vec<u8>, c: u8, raw: &[u8], flags: &mut Flags) {
        match c {
            b'/' | b'\\' => {
                flags.insert(Flags::PATH_ENCODED_SEPARATOR);
                if !self.decode_separators {
                    out.extend_from_slice(raw);
                } else if c == b'\\' && !self.backslash_separators {
                    out.push(b'\\');
                } else {
                    out.push(b'/');
                }
            }
            0 => {
                flags.insert(Flags::PATH_NUL_BYTE);
                out.push(0);
            }
            _ => out.push(c),
        }
    }
}

/// Decodes `%uXXXX`; code points above a byte become [`REPLACEMENT_BYTE`].
fn decode_u(encoded: &[u8]) -> Option<u8> {
    let high = decode_hex_pair(encoded.get(2..4))?;
    let low = decode_hex_pair(encoded.get(4..6))?;
    Some(if high == 0 { low } else { REPLACEMENT_BYTE })
}

fn expect(status_expected: &mut Option<u16>, status: Option<u16>) {
    if status.is_some() {
        *status_expected = status;
    }
}

pub fn normalize_minimal(path: &[u8], flags: &mut Flags, status_expected: &mut Option<u16>) -> Vec<u8> {
    PathDecoder::MINIMAL.decode(path, flags, status_expected)
}

pub fn normalize_ids(path: &[u8], flags: &mut Flags, status_expected: &mut Option<u16>) -> Vec<u8> {
    PathDecoder::IDS.decode(path, flags, status_expected)
}

pub fn normalize_apache_2(path: &[u8], flags: &mut Flags, status_expected: &mut Option<u16>) -> Vec<u8> {
    PathDecoder::APACHE_2.decode(path, flags, status_expected)
}

pub fn normalize_iis_6_0(path: &[u8], flags: &mut Flags, status_expected: &mut Option<u16>) -> Vec<u8> {
    PathDecoder::IIS_6_0.decode(path, flags, status_expected)
}

pub fn normalize_iis_7(path: &[u8], flags: &mut Flags, status_expected: &mut Option<u16>) -> Vec<u8> {
    PathDecoder::IIS_7.decode(path, flags, status_expected)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn decode_hex_pair(pair: Option<&[u8]>) -> Option<u8> {
    match pair? {
        [high, low] => Some((hex_value(*high)? << 4) | hex_value(*low)?),
        _ => None,
    }
}

/// Extracts the path component of a request URI.
///
/// Absolute-form URIs lose their scheme and authority; the query and fragment
/// are cut off.
pub fn split_path(uri: &[u8]) -> &[u8] {
    let mut path = uri;

    let scheme_end = uri.windows(3).position(|w| w == b"://");
    if let Some(end) = scheme_end.filter(|end| uri[..*end].iter().all(u8::is_ascii_alphabetic)) {
        let authority = &uri[end + 3..];
        path = authority.iter().position(|b| *b == b'/').map_or(&[][..], |start| &authority[start..]);
    }

    let end = path.iter().position(|b| *b == b'?' || *b == b'#').unwrap_or(path.len());
    &path[..end]
}
