use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

use crate::hook::Milestone;
use crate::personality::ServerPersonality;

/// Why a direction of a connection stopped.
///
/// A veto and malformed traffic call for different operator responses, so they
/// are kept apart: see [`HtpError::is_veto`].
#[derive(Debug, Error)]
pub enum HtpError {
    #[error("transaction vetoed by a {milestone} callback")]
    Veto { milestone: Milestone },

    #[error("malformed traffic: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("stream stopped after an earlier failure")]
    Stopped,
}

impl HtpError {
    pub fn veto(milestone: Milestone) -> Self {
        Self::Veto { milestone }
    }

    /// True when an inspection callback, not the traffic, failed the transaction.
    pub fn is_veto(&self) -> bool {
        matches!(self, Self::Veto { .. })
    }

    /// The parse error behind this failure, if the traffic was at fault.
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            Self::Parse { source } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown server personality: {name}")]
    UnknownPersonality { name: String },

    #[error("server personality {0} has no registered adapter")]
    UnregisteredPersonality(ServerPersonality),

    #[error("hook allocation failed: {source}")]
    Allocation {
        #[from]
        source: TryReserveError,
    },
}

impl ConfigError {
    pub fn unknown_personality<S: ToString>(name: S) -> Self {
        Self::UnknownPersonality { name: name.to_string() }
    }
}

/// Traffic the tolerant grammar cannot make sense of.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeLine { current_size: usize, max_size: usize },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("response data without a matching request")]
    UnexpectedResponse,

    /// Only reachable when a codec is driven by a framed reader.
    #[error("io error: {reason}")]
    Io { reason: String },
}

impl ParseError {
    pub fn too_large_line(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeLine { current_size, max_size }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }
}

// `tokio_util::codec::Decoder` requires its error to absorb I/O errors.
impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        Self::Io { reason: e.to_string() }
    }
}
