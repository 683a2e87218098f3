use std::fmt;

use crate::personality::generic;
use crate::protocol::{Flags, ParseError, Transaction};

/// Decides whether a header line (terminator included) ends the header block.
/// The same decision tells which lines before a request line can be ignored.
pub type HeadersTerminatorFn = fn(line: &[u8]) -> bool;

/// Splits a request line (terminator removed) into the transaction's method,
/// URI and protocol fields.
pub type RequestLineFn = fn(tx: &mut Transaction, line: &[u8]) -> Result<(), ParseError>;

/// Interprets one complete header (folded lines already joined, terminator
/// removed) and stores it on the transaction.
pub type HeaderFn = fn(tx: &mut Transaction, line: &[u8]) -> Result<(), ParseError>;

/// Splits a response status line (terminator removed) into the transaction's
/// protocol, status and message fields.
pub type ResponseLineFn = fn(tx: &mut Transaction, line: &[u8]) -> Result<(), ParseError>;

/// Turns the raw request path into the form the emulated server would use to
/// locate a resource, raising anomaly flags on the way. Encodings the server
/// refuses set the status it is expected to answer with.
pub type NormalizePathFn = fn(path: &[u8], flags: &mut Flags, status_expected: &mut Option<u16>) -> Vec<u8>;

/// A parsing step whose behaviour varies between server personalities.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    HeadersTerminator,
    ParseRequestLine,
    ProcessRequestHeader,
    ParseResponseLine,
    ProcessResponseHeader,
    NormalizePath,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::HeadersTerminator,
        Step::ParseRequestLine,
        Step::ProcessRequestHeader,
        Step::ParseResponseLine,
        Step::ProcessResponseHeader,
        Step::NormalizePath,
    ];
}

/// The implementation of one step.
#[derive(Copy, Clone)]
pub enum Strategy {
    HeadersTerminator(HeadersTerminatorFn),
    ParseRequestLine(RequestLineFn),
    ProcessRequestHeader(HeaderFn),
    ParseResponseLine(ResponseLineFn),
    ProcessResponseHeader(HeaderFn),
    NormalizePath(NormalizePathFn),
}

impl Strategy {
    /// The step this strategy implements.
    pub fn step(&self) -> Step {
        match self {
            Strategy::HeadersTerminator(_) => Step::HeadersTerminator,
            Strategy::ParseRequestLine(_) => Step::ParseRequestLine,
            Strategy::ProcessRequestHeader(_) => Step::ProcessRequestHeader,
            Strategy::ParseResponseLine(_) => Step::ParseResponseLine,
            Strategy::ProcessResponseHeader(_) => Step::ProcessResponseHeader,
            Strategy::NormalizePath(_) => Step::NormalizePath,
        }
    }
}

/// Two strategies are equal when they implement the same step with the same function.
impl PartialEq for Strategy {
    fn eq(&self, other: &Self) -> bool {
        use std::ptr::fn_addr_eq;

        match (self, other) {
            (Strategy::HeadersTerminator(a), Strategy::HeadersTerminator(b)) => fn_addr_eq(*a, *b),
            (Strategy::ParseRequestLine(a), Strategy::ParseRequestLine(b))
            | (Strategy::ProcessRequestHeader(a), Strategy::ProcessRequestHeader(b))
            | (Strategy::ParseResponseLine(a), Strategy::ParseResponseLine(b))
            | (Strategy::ProcessResponseHeader(a), Strategy::ProcessResponseHeader(b)) => fn_addr_eq(*a, *b),
            (Strategy::NormalizePath(a), Strategy::NormalizePath(b)) => fn_addr_eq(*a, *b),
            _ => false,
        }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = if StrategySet::GENERIC.get(self.step()) == *self { "generic" } else { "override" };
        write!(f, "{:?}({origin})", self.step())
    }
}

/// A total mapping from [`Step`] to implementation.
///
/// A set is never partially resolved: every step has a function. Personality
/// sets are built from [`StrategySet::GENERIC`] by replacing the steps the
/// personality overrides.
#[derive(Copy, Clone)]
pub struct StrategySet {
    headers_terminator: HeadersTerminatorFn,
    parse_request_line: RequestLineFn,
    process_request_header: HeaderFn,
    parse_response_line: ResponseLineFn,
    process_response_header: HeaderFn,
    normalize_path: NormalizePathFn,
}

impl StrategySet {
    /// The generic behaviour every personality falls back to.
    pub const GENERIC: StrategySet = StrategySet {
        headers_terminator: generic::is_headers_terminator,
        parse_request_line: generic::parse_request_line,
        process_request_header: generic::process_request_header,
        parse_response_line: generic::parse_response_line,
        process_response_header: generic::process_response_header,
        normalize_path: generic::normalize_path,
    };

    pub fn generic() -> Self {
        Self::GENERIC
    }

    /// Replaces the implementation of the step `strategy` belongs to.
    #[must_use]
    pub fn with(mut self, strategy: Strategy) -> Self {
        match strategy {
            Strategy::HeadersTerminator(f) => self.headers_terminator = f,
            Strategy::ParseRequestLine(f) => self.parse_request_line = f,
            Strategy::ProcessRequestHeader(f) => self.process_request_header = f,
            Strategy::ParseResponseLine(f) => self.parse_response_line = f,
            Strategy::ProcessResponseHeader(f) => self.process_response_header = f,
            Strategy::NormalizePath(f) => self.normalize_path = f,
        }
        self
    }

    pub fn get(&self, step: Step) -> Strategy {
        match step {
            Step::HeadersTerminator => Strategy::HeadersTerminator(self.headers_terminator),
            Step::ParseRequestLine => Strategy::ParseRequestLine(self.parse_request_line),
            Step::ProcessRequestHeader => Strategy::ProcessRequestHeader(self.process_request_header),
            Step::ParseResponseLine => Strategy::ParseResponseLine(self.parse_response_line),
            Step::ProcessResponseHeader => Strategy::ProcessResponseHeader(self.process_response_header),
            Step::NormalizePath => Strategy::NormalizePath(self.normalize_path),
        }
    }

    #[inline]
    pub fn headers_terminator(&self) -> HeadersTerminatorFn {
        self.headers_terminator
    }

    #[inline]
    pub fn parse_request_line(&self) -> RequestLineFn {
        self.parse_request_line
    }

    #[inline]
    pub fn process_request_header(&self) -> HeaderFn {
        self.process_request_header
    }

    #[inline]
    pub fn parse_response_line(&self) -> ResponseLineFn {
        self.parse_response_line
    }

    #[inline]
    pub fn process_response_header(&self) -> HeaderFn {
        self.process_response_header
    }

    #[inline]
    pub fn normalize_path(&self) -> NormalizePathFn {
        self.normalize_path
    }
}

impl Default for StrategySet {
    fn default() -> Self {
        Self::GENERIC
    }
}

impl PartialEq for StrategySet {
    fn eq(&self, other: &Self) -> bool {
        Step::ALL.iter().all(|step| self.get(*step) == other.get(*step))
    }
}

impl fmt::Debug for StrategySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(Step::ALL.iter().map(|step| self.get(*step))).finish()
    }
}
