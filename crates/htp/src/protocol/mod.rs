//! Core types shared by every layer of the parser.
//!
//! - [`Transaction`]: the context passed to every hook
//! - [`HookStatus`] / [`HtpStatus`]: the two status vocabularies and their translation
//! - [`HtpError`], [`ParseError`], [`ConfigError`]: failures
//! - [`Flags`]: anomalies the tolerant grammar records instead of rejecting input

mod error;
mod flags;
mod payload;
mod status;
mod transaction;

pub use error::ConfigError;
pub use error::HtpError;
pub use error::ParseError;
pub use flags::Flags;
pub use payload::PayloadItem;
pub use payload::PayloadSize;
pub use status::HookStatus;
pub use status::HtpStatus;
pub use transaction::Header;
pub use transaction::HeaderAddition;
pub use transaction::Headers;
pub use transaction::RequestProgress;
pub use transaction::ResponseProgress;
pub use transaction::Transaction;
