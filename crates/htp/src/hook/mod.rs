//! Priority-ordered extension points.
//!
//! A [`Hook`] is an ordered list of [`Callback`]s. Callbacks run in ascending
//! priority, ties in registration order, and share one mutable context. The
//! aggregated [`HookStatus`](crate::protocol::HookStatus) of a run tells the
//! parser whether to continue with the transaction.
//!
//! [`HookRegistry`] holds one lazily created hook per parsing [`Milestone`].
//!
//! # Example
//!
//! ```
//! use micro_htp::hook::{fn_callback, Hook, PRIORITY_EARLY, PRIORITY_LATE};
//! use micro_htp::protocol::HookStatus;
//!
//! let mut hook = Hook::<Vec<&'static str>>::create().unwrap();
//! hook.register(fn_callback(|seen: &mut Vec<&'static str>| { seen.push("late"); HookStatus::Ok }), PRIORITY_LATE).unwrap();
//! hook.register(fn_callback(|seen: &mut Vec<&'static str>| { seen.push("early"); HookStatus::Declined }), PRIORITY_EARLY).unwrap();
//!
//! let mut seen = Vec::new();
//! assert_eq!(hook.run_all(&mut seen), HookStatus::Ok);
//! assert_eq!(seen, ["early", "late"]);
//! ```

mod callback;
#[allow(clippy::module_inception, reason = "the hook type lives in hook::hook")]
mod hook;
mod registry;

use std::fmt;

pub use callback::Callback;
pub use callback::FnCallback;
pub use callback::fn_callback;
pub use hook::Hook;
pub use registry::HookRegistry;

/// Conventional priority for callbacks that must see a milestone first.
pub const PRIORITY_EARLY: i32 = 1000;
/// Conventional priority for ordinary callbacks.
pub const PRIORITY_MIDDLE: i32 = 5000;
/// Conventional priority for callbacks that must see a milestone last.
pub const PRIORITY_LATE: i32 = 9000;

/// The points in a transaction's life at which hooks fire.
///
/// The parser fires them in declaration order for each direction: the request
/// line milestone always precedes the request headers milestone of the same
/// transaction, and so on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Milestone {
    TransactionStart,
    RequestLine,
    RequestHeader,
    RequestHeaders,
    RequestBodyData,
    /// The trailer block of a chunked request body ended.
    RequestTrailer,
    RequestComplete,
    ResponseStart,
    ResponseLine,
    ResponseHeader,
    ResponseHeaders,
    ResponseBodyData,
    /// The trailer block of a chunked response body ended.
    ResponseTrailer,
    ResponseComplete,
    TransactionComplete,
}

impl Milestone {
    pub const COUNT: usize = 15;

    pub const ALL: [Milestone; Milestone::COUNT] = [
        Milestone::TransactionStart,
        Milestone::RequestLine,
        Milestone::RequestHeader,
        Milestone::RequestHeaders,
        Milestone::RequestBodyData,
        Milestone::RequestTrailer,
        Milestone::RequestComplete,
        Milestone::ResponseStart,
        Milestone::ResponseLine,
        Milestone::ResponseHeader,
        Milestone::ResponseHeaders,
        Milestone::ResponseBodyData,
        Milestone::ResponseTrailer,
        Milestone::ResponseComplete,
        Milestone::TransactionComplete,
    ];

    /// Slot of this milestone in a [`HookRegistry`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Milestone::TransactionStart => "transaction_start",
            Milestone::RequestLine => "request_line",
            Milestone::RequestHeader => "request_header",
            Milestone::RequestHeaders => "request_headers",
            Milestone::RequestBodyData => "request_body_data",
            Milestone::RequestTrailer => "request_trailer",
            Milestone::RequestComplete => "request_complete",
            Milestone::ResponseStart => "response_start",
            Milestone::ResponseLine => "response_line",
            Milestone::ResponseHeader => "response_header",
            Milestone::ResponseHeaders => "response_headers",
            Milestone::ResponseBodyData => "response_body_data",
            Milestone::ResponseTrailer => "response_trailer",
            Milestone::ResponseComplete => "response_complete",
            Milestone::TransactionComplete => "transaction_complete",
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
