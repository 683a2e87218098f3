//! Connection-level parsing.
//!
//! A [`ConnectionParser`] owns the transactions of one connection. It frames
//! request and response bytes, asks the configured personality how to read
//! each ambiguous construct and fires the configured hooks at every milestone.
//! Hook status is authoritative: a veto fails the current transaction.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use micro_htp::config::Config;
//! use micro_htp::connection::ConnectionParser;
//! use micro_htp::hook::{fn_callback, Milestone, PRIORITY_MIDDLE};
//! use micro_htp::protocol::{HookStatus, HtpStatus, Transaction};
//!
//! let mut config = Config::new();
//! config
//!     .register(
//!         Milestone::RequestLine,
//!         fn_callback(|tx: &mut Transaction| match tx.request_method.as_deref() {
//!             Some(b"TRACE") => HookStatus::Error,
//!             _ => HookStatus::Ok,
//!         }),
//!         PRIORITY_MIDDLE,
//!     )
//!     .unwrap();
//!
//! let mut parser = ConnectionParser::new(Arc::new(config));
//! assert_eq!(parser.request_data(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n"), HtpStatus::Data);
//! assert_eq!(parser.response_data(b"HTTP/1.1 204 No Content\r\n\r\n"), HtpStatus::Data);
//! assert!(parser.transactions()[0].is_complete());
//!
//! assert_eq!(parser.request_data(b"TRACE / HTTP/1.1\r\n\r\n"), HtpStatus::Error);
//! assert!(parser.last_error().unwrap().is_veto());
//! ```

mod connection_parser;
mod transactions;

pub use connection_parser::ConnectionParser;
pub use transactions::Transactions;
