use std::fmt;

use crate::personality::{
    HeaderFn, HeadersTerminatorFn, NormalizePathFn, RequestLineFn, ResponseLineFn, Step, Strategy, StrategySet,
};

/// The steps where one server's parsing diverges from the generic rules.
///
/// An adapter lists overrides only; [`PersonalityAdapter::resolve`] answers the
/// generic implementation for every step it leaves alone.
#[derive(Copy, Clone, Default)]
pub struct PersonalityAdapter {
    headers_terminator: Option<HeadersTerminatorFn>,
    parse_request_line: Option<RequestLineFn>,
    process_request_header: Option<HeaderFn>,
    parse_response_line: Option<ResponseLineFn>,
    process_response_header: Option<HeaderFn>,
    normalize_path: Option<NormalizePathFn>,
}

impl PersonalityAdapter {
    /// An adapter overriding nothing.
    pub const fn new() -> Self {
        Self {
            headers_terminator: None,
            parse_request_line: None,
            process_request_header: None,
            parse_response_line: None,
            process_response_header: None,
            normalize_path: None,
        }
    }

    #[must_use]
    pub const fn with_headers_terminator(mut self, f: HeadersTerminatorFn) -> Self {
        self.headers_terminator = Some(f);
        self
    }

    #[must_use]
    pub const fn with_request_line(mut self, f: RequestLineFn) -> Self {
        self.parse_request_line = Some(f);
        self
    }

    #[must_use]
    pub const fn with_request_header(mut self, f: HeaderFn) -> Self {
        self.process_request_header = Some(f);
        self
    }

    #[must_use]
    pub const fn with_response_line(mut self, f: ResponseLineFn) -> Self {
        self.parse_response_line = Some(f);
        self
    }

    #[must_use]
    pub const fn with_response_header(mut self, f: HeaderFn) -> Self {
        self.process_response_header = Some(f);
        self
    }

    #[must_use]
    pub const fn with_path_normalizer(mut self, f: NormalizePathFn) -> Self {
        self.normalize_path = Some(f);
        self
    }

    /// The adapter's own implementation of `step`, if it overrides it.
    pub fn overrides(&self, step: Step) -> Option<Strategy> {
        match step {
            Step::HeadersTerminator => self.headers_terminator.map(Strategy::HeadersTerminator),
            Step::ParseRequestLine => self.parse_request_line.map(Strategy::ParseRequestLine),
            Step::ProcessRequestHeader => self.process_request_header.map(Strategy::ProcessRequestHeader),
            Step::ParseResponseLine => self.parse_response_line.map(Strategy::ParseResponseLine),
            Step::ProcessResponseHeader => self.process_response_header.map(Strategy::ProcessResponseHeader),
            Step::NormalizePath => self.normalize_path.map(Strategy::NormalizePath),
        }
    }

    /// The number of steps this adapter overrides.
    pub fn override_count(&self) -> usize {
        Step::ALL.iter().filter(|step| self.overrides(**step).is_some()).count()
    }

    /// The implementation of `step`: the override if there is one, the generic
    /// implementation otherwise.
    pub fn resolve(&self, step: Step) -> Strategy {
        self.overrides(step).unwrap_or_else(|| StrategySet::GENERIC.get(step))
    }

    /// Resolves every step at once.
    pub fn strategy_set(&self) -> StrategySet {
        Step::ALL
            .iter()
            .filter_map(|step| self.overrides(*step))
            .fold(StrategySet::GENERIC, StrategySet::with)
    }
}

impl fmt::Debug for PersonalityAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(Step::ALL.iter().filter_map(|step| self.overrides(*step))).finish()
    }
}
