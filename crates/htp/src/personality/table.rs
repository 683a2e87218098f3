use std::collections::HashMap;

use tracing::debug;

use crate::personality::{PersonalityAdapter, ServerPersonality, Step, Strategy, StrategySet, apache, iis, path};
use crate::protocol::ConfigError;

/// Maps a [`ServerPersonality`] to its [`PersonalityAdapter`].
///
/// Only registered personalities can be selected. Asking for any other one is
/// a configuration error, never a silent fallback to generic rules.
#[derive(Debug, Clone)]
pub struct PersonalityTable {
    adapters: HashMap<ServerPersonality, PersonalityAdapter>,
}

impl PersonalityTable {
    /// A table with no personality registered.
    pub fn new() -> Self {
        Self { adapters: HashMap::new() }
    }

    /// A table with every built-in personality registered.
    ///
    /// IIS 4.0, IIS 5.0 and Tomcat 6.0 are known names without an adapter.
    pub fn builtin() -> Self {
        let iis_7 = PersonalityAdapter::new().with_path_normalizer(path::normalize_iis_7);

        let mut table = Self::new();
        table.register(ServerPersonality::Minimal, PersonalityAdapter::new().with_path_normalizer(path::normalize_minimal));
        table.register(ServerPersonality::Generic, PersonalityAdapter::new());
        table.register(ServerPersonality::Ids, PersonalityAdapter::new().with_path_normalizer(path::normalize_ids));
        table.register(
            ServerPersonality::Apache2,
            PersonalityAdapter::new()
                .with_request_line(apache::parse_request_line)
                .with_request_header(apache::process_request_header)
                .with_path_normalizer(path::normalize_apache_2),
        );
        table.register(
            ServerPersonality::Iis5_1,
            PersonalityAdapter::new().with_headers_terminator(iis::is_headers_terminator_5_1),
        );
        table.register(ServerPersonality::Iis6_0, PersonalityAdapter::new().with_path_normalizer(path::normalize_iis_6_0));
        table.register(ServerPersonality::Iis7_0, iis_7);
        table.register(ServerPersonality::Iis7_5, iis_7);
        table
    }

    /// Registers `adapter` for `personality`, returning the adapter it replaces.
    pub fn register(
        &mut self,
        personality: ServerPersonality,
        adapter: PersonalityAdapter,
    ) -> Option<PersonalityAdapter> {
        debug!(%personality, overrides = adapter.override_count(), "registered personality");
        self.adapters.insert(personality, adapter)
    }

    pub fn is_registered(&self, personality: ServerPersonality) -> bool {
        self.adapters.contains_key(&personality)
    }

    /// The adapter of `personality`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnregisteredPersonality`] when no adapter was registered.
    pub fn adapter(&self, personality: ServerPersonality) -> Result<&PersonalityAdapter, ConfigError> {
        self.adapters.get(&personality).ok_or(ConfigError::UnregisteredPersonality(personality))
    }

    /// The implementation `personality` uses for `step`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnregisteredPersonality`] when no adapter was registered.
    pub fn resolve(&self, personality: ServerPersonality, step: Step) -> Result<Strategy, ConfigError> {
        self.adapter(personality).map(|adapter| adapter.resolve(step))
    }

    /// Every step of `personality`, resolved.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnregisteredPersonality`] when no adapter was registered.
    pub fn strategy_set(&self, personality: ServerPersonality) -> Result<StrategySet, ConfigError> {
        self.adapter(personality).map(PersonalityAdapter::strategy_set)
    }
}

impl Default for PersonalityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personality::generic;

    #[test]
    fn builtin_registrations() {
        let table = PersonalityTable::builtin();

        for registered in [
            ServerPersonality::Minimal,
            ServerPersonality::Generic,
            ServerPersonality::Ids,
            ServerPersonality::Apache2,
            ServerPersonality::Iis5_1,
            ServerPersonality::Iis6_0,
            ServerPersonality::Iis7_0,
            ServerPersonality::Iis7_5,
        ] {
            assert!(table.is_registered(registered), "{registered} should be registered");
        }

        for unregistered in [ServerPersonality::Iis4_0, ServerPersonality::Iis5_0, ServerPersonality::Tomcat6_0] {
            assert!(matches!(
                table.strategy_set(unregistered),
                Err(ConfigError::UnregisteredPersonality(p)) if p == unregistered
            ));
        }
    }

    #[test]
    fn generic_personality_resolves_everything_to_generic() {
        let table = PersonalityTable::builtin();
        for step in Step::ALL {
            assert_eq!(table.resolve(ServerPersonality::Generic, step).unwrap(), StrategySet::GENERIC.get(step));
        }
    }

    #[test]
    fn apache_overrides_only_its_quirks() {
        let table = PersonalityTable::builtin();
        let apache = table.strategy_set(ServerPersonality::Apache2).unwrap();

        assert_eq!(apache.get(Step::ParseRequestLine), Strategy::ParseRequestLine(apache::parse_request_line));
        assert_eq!(apache.get(Step::ParseResponseLine), Strategy::ParseResponseLine(generic::parse_response_line));
        assert_eq!(apache.get(Step::HeadersTerminator), StrategySet::GENERIC.get(Step::HeadersTerminator));
    }

    #[test]
    fn iis_versions_refuse_different_path_encodings() {
        let table = PersonalityTable::builtin();

        assert_eq!(
            table.resolve(ServerPersonality::Iis6_0, Step::NormalizePath).unwrap(),
            Strategy::NormalizePath(path::normalize_iis_6_0)
        );
        for personality in [ServerPersonality::Iis7_0, ServerPersonality::Iis7_5] {
            assert_eq!(
                table.resolve(personality, Step::NormalizePath).unwrap(),
                Strategy::NormalizePath(path::normalize_iis_7)
            );
        }
        assert_eq!(
            table.resolve(ServerPersonality::Iis5_1, Step::NormalizePath).unwrap(),
            StrategySet::GENERIC.get(Step::NormalizePath)
        );
    }

    #[test]
    fn empty_table_rejects_everything() {
        let table = PersonalityTable::new();
        for personality in ServerPersonality::ALL {
            assert!(table.resolve(personality, Step::NormalizePath).is_err());
        }
    }

    #[test]
    fn registration_replaces_previous_adapter() {
        let mut table = PersonalityTable::new();
        assert!(table.register(ServerPersonality::Tomcat6_0, PersonalityAdapter::new()).is_none());

        let replaced = table.register(
            ServerPersonality::Tomcat6_0,
            PersonalityAdapter::new().with_path_normalizer(path::normalize_minimal),
        );
        assert_eq!(replaced.map(|adapter| adapter.override_count()), Some(0));
        assert_eq!(
            table.resolve(ServerPersonality::Tomcat6_0, Step::NormalizePath).unwrap(),
            Strategy::NormalizePath(path::normalize_minimal)
        );
    }
}
