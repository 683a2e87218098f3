//! Server personalities and the strategies they select.
//!
//! Web servers disagree on ambiguous bytes: which line ends the headers,
//! whether a NUL ends the request line, how `%2f` in a path is treated. A
//! parser that resolves them differently from the protected server can be
//! evaded. A [`ServerPersonality`] names the server to emulate, and its
//! [`PersonalityAdapter`] overrides only the [`Step`]s where that server
//! differs from the generic rules. Every other step falls back to
//! [`StrategySet::GENERIC`].
//!
//! # Example
//!
//! ```
//! use micro_htp::personality::{PersonalityTable, ServerPersonality, Step, StrategySet};
//!
//! let table = PersonalityTable::builtin();
//!
//! // Generic overrides nothing
//! let generic = table.strategy_set(ServerPersonality::Generic).unwrap();
//! assert_eq!(generic, StrategySet::GENERIC);
//!
//! // Apache replaces the request line parser only where it differs
//! let apache = table.resolve(ServerPersonality::Apache2, Step::ParseRequestLine).unwrap();
//! assert_ne!(apache, StrategySet::GENERIC.get(Step::ParseRequestLine));
//! ```

mod adapter;
pub mod apache;
pub mod generic;
pub mod iis;
pub mod path;
mod strategy;
mod table;

use std::fmt;
use std::str::FromStr;

pub use adapter::PersonalityAdapter;
pub use strategy::HeaderFn;
pub use strategy::HeadersTerminatorFn;
pub use strategy::NormalizePathFn;
pub use strategy::RequestLineFn;
pub use strategy::ResponseLineFn;
pub use strategy::Step;
pub use strategy::Strategy;
pub use strategy::StrategySet;
pub use table::PersonalityTable;

use crate::protocol::ConfigError;

/// The web server whose parsing rules are emulated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ServerPersonality {
    /// Percent-decoding only, no path separator handling.
    Minimal,
    /// The generic rules, overriding nothing.
    Generic,
    /// Aggressive normalization for intrusion detection.
    Ids,
    /// Apache httpd 2.x.
    Apache2,
    Iis4_0,
    Iis5_0,
    Iis5_1,
    Iis6_0,
    Iis7_0,
    Iis7_5,
    Tomcat6_0,
}

impl ServerPersonality {
    pub const ALL: [ServerPersonality; 11] = [
        ServerPersonality::Minimal,
        ServerPersonality::Generic,
        ServerPersonality::Ids,
        ServerPersonality::Apache2,
        ServerPersonality::Iis4_0,
        ServerPersonality::Iis5_0,
        ServerPersonality::Iis5_1,
        ServerPersonality::Iis6_0,
        ServerPersonality::Iis7_0,
        ServerPersonality::Iis7_5,
        ServerPersonality::Tomcat6_0,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ServerPersonality::Minimal => "minimal",
            ServerPersonality::Generic => "generic",
            ServerPersonality::Ids => "ids",
            ServerPersonality::Apache2 => "apache_2",
            ServerPersonality::Iis4_0 => "iis_4_0",
            ServerPersonality::Iis5_0 => "iis_5_0",
            ServerPersonality::Iis5_1 => "iis_5_1",
            ServerPersonality::Iis6_0 => "iis_6_0",
            ServerPersonality::Iis7_0 => "iis_7_0",
            ServerPersonality::Iis7_5 => "iis_7_5",
            ServerPersonality::Tomcat6_0 => "tomcat_6_0",
        }
    }
}

impl fmt::Display for ServerPersonality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the textual names used by configuration, ignoring case.
/// `apache_2_2` and `apache` are accepted for [`ServerPersonality::Apache2`].
impl FromStr for ServerPersonality {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("apache_2_2") || name.eq_ignore_ascii_case("apache") {
            return Ok(ServerPersonality::Apache2);
        }

        ServerPersonality::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::unknown_personality(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for personality in ServerPersonality::ALL {
            assert_eq!(personality.to_string().parse::<ServerPersonality>().unwrap(), personality);
        }
    }

    #[test]
    fn parse_is_case_insensitive_with_aliases() {
        assert_eq!("IDS".parse::<ServerPersonality>().unwrap(), ServerPersonality::Ids);
        assert_eq!("Apache_2_2".parse::<ServerPersonality>().unwrap(), ServerPersonality::Apache2);
        assert_eq!(" apache ".parse::<ServerPersonality>().unwrap(), ServerPersonality::Apache2);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "nginx".parse::<ServerPersonality>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPersonality { ref name } if name == "nginx"));
    }
}
