//! An embeddable, evasion-aware HTTP traffic parser
//!
//! This crate reconstructs HTTP transactions from the two byte streams of an
//! observed connection, so that inspection code can see requests and responses
//! the way the protected web server sees them. Attackers exploit the points
//! where servers disagree on ambiguous bytes; the parser resolves those points
//! according to a configurable server personality instead of a single
//! "correct" reading.
//!
//! # Features
//!
//! - Priority-ordered hooks at every parsing milestone, with veto semantics
//! - Server personalities overriding only the steps where a server diverges
//! - Tolerant parsing: malformed input is interpreted and flagged, not rejected
//! - Header folding, chunked and length-delimited bodies, HTTP/0.9, 100-continue
//! - Path normalization per personality (separators, `%u` encoding, case)
//! - Streaming input: data may arrive in slices of any size
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use micro_htp::config::Config;
//! use micro_htp::connection::ConnectionParser;
//! use micro_htp::hook::{fn_callback, Milestone, PRIORITY_EARLY};
//! use micro_htp::personality::ServerPersonality;
//! use micro_htp::protocol::{Flags, HookStatus, HtpStatus, Transaction};
//!
//! let mut config = Config::new();
//! config.set_server_personality(ServerPersonality::Ids).unwrap();
//! config
//!     .register(
//!         Milestone::RequestLine,
//!         fn_callback(|tx: &mut Transaction| match tx.normalized_path.as_deref() {
//!             Some(path) if path.starts_with(b"/admin") => HookStatus::Error,
//!             _ => HookStatus::Declined,
//!         }),
//!         PRIORITY_EARLY,
//!     )
//!     .unwrap();
//!
//! let mut parser = ConnectionParser::new(Arc::new(config));
//!
//! // `%u0041` and the case games do not hide the path from the ids personality
//! assert_eq!(parser.request_data(b"GET /%u0041DMIN//panel HTTP/1.1\r\n"), HtpStatus::Error);
//!
//! let tx = &parser.transactions()[0];
//! assert_eq!(tx.normalized_path.as_deref(), Some(&b"/admin/panel"[..]));
//! assert!(tx.flags.contains(Flags::PATH_U_ENCODING));
//! assert!(parser.last_error().unwrap().is_veto());
//! ```
//!
//! # Architecture
//!
//! - [`hook`]: callbacks, priority-ordered hooks and the per-milestone registry
//! - [`personality`]: parsing steps, strategy sets and the personality table
//! - [`config`]: hooks, personality and limits shared by connection parsers
//! - [`connection`]: the connection parser driving both directions
//! - [`codec`]: line and body decoders over buffered bytes
//! - [`protocol`]: transactions, status vocabularies, flags and errors
//!
//! # Status Vocabularies
//!
//! Callbacks answer with [`protocol::HookStatus`], the connection parser with
//! [`protocol::HtpStatus`]. The two share names but not values; the only
//! conversion is [`protocol::HtpStatus::from_hook`].
//!
//! # Error Handling
//!
//! - [`protocol::ConfigError`]: rejected configuration, reported at setup time
//! - [`protocol::HtpError`]: why a direction of a connection stopped, either a
//!   callback veto or malformed traffic
//! - [`protocol::ParseError`]: traffic the tolerant grammar cannot recover from
//!
//! # Threading
//!
//! A [`connection::ConnectionParser`] is driven by one thread at a time and
//! runs callbacks synchronously on it. Many parsers may share one
//! [`config::Config`] across threads once setup is over.

pub mod codec;
pub mod config;
pub mod connection;
pub mod hook;
pub mod personality;
pub mod protocol;

mod utils;
