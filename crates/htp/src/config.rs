//! Parser configuration.
//!
//! A [`Config`] is assembled during single-threaded setup: hooks are
//! registered, a personality is selected, limits are tuned. It is then frozen
//! in an [`Arc`](std::sync::Arc) and shared by every
//! [`ConnectionParser`](crate::connection::ConnectionParser) built from it.
//!
//! ```
//! use std::sync::Arc;
//!
//! use micro_htp::config::Config;
//! use micro_htp::hook::{fn_callback, Milestone, PRIORITY_MIDDLE};
//! use micro_htp::personality::ServerPersonality;
//! use micro_htp::protocol::{HookStatus, Transaction};
//!
//! let mut config = Config::new();
//! config.set_server_personality(ServerPersonality::Apache2).unwrap();
//! config
//!     .register(Milestone::RequestHeaders, fn_callback(|_: &mut Transaction| HookStatus::Ok), PRIORITY_MIDDLE)
//!     .unwrap();
//!
//! // unknown identifiers are rejected, never defaulted
//! assert!(config.set_server_personality_name("nginx").is_err());
//! assert_eq!(config.server_personality(), ServerPersonality::Apache2);
//!
//! let config = Arc::new(config);
//! ```

use tracing::info;

use crate::codec::{DEFAULT_FIELD_LIMIT, DEFAULT_FIELD_LIMIT_SOFT};
use crate::hook::{Callback, HookRegistry, Milestone};
use crate::personality::{PersonalityAdapter, PersonalityTable, ServerPersonality, StrategySet, path};
use crate::protocol::{ConfigError, Transaction};

pub struct Config {
    hooks: HookRegistry<Transaction>,
    server_personality: ServerPersonality,
    strategies: StrategySet,
    field_limit: usize,
    field_limit_soft: usize,
    tx_auto_destroy: bool,
}

impl Config {
    /// A configuration with no hooks, the minimal personality and default limits.
    pub fn new() -> Self {
        Self {
            hooks: HookRegistry::new(),
            server_personality: ServerPersonality::Minimal,
            strategies: PersonalityAdapter::new().with_path_normalizer(path::normalize_minimal).strategy_set(),
            field_limit: DEFAULT_FIELD_LIMIT,
            field_limit_soft: DEFAULT_FIELD_LIMIT_SOFT,
            tx_auto_destroy: false,
        }
    }

    /// Selects a personality from the built-in table.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnregisteredPersonality`] when the personality has
    /// no adapter. The previous selection stays in place.
    pub fn set_server_personality(&mut self, personality: ServerPersonality) -> Result<(), ConfigError> {
        self.set_server_personality_from(&PersonalityTable::builtin(), personality)
    }

    /// Selects a personality from `table`, which may carry custom adapters.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnregisteredPersonality`] when `table` has no
    /// adapter for the personality.
    pub fn set_server_personality_from(
        &mut self,
        table: &PersonalityTable,
        personality: ServerPersonality,
    ) -> Result<(), ConfigError> {
        self.strategies = table.strategy_set(personality)?;
        self.server_personality = personality;
        info!(%personality, "server personality selected");
        Ok(())
    }

    /// Selects a personality by its textual name, like `apache_2` or `IIS_7_5`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownPersonality`] for a name that matches no
    /// personality and [`ConfigError::UnregisteredPersonality`] for one without
    /// an adapter.
    pub fn set_server_personality_name(&mut self, name: &str) -> Result<(), ConfigError> {
        self.set_server_personality(name.parse()?)
    }

    /// Registers a callback on the hook of `milestone`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Allocation`] when the hook cannot grow.
    pub fn register<C>(&mut self, milestone: Milestone, callback: C, priority: i32) -> Result<(), ConfigError>
    where
        C: Callback<Transaction> + 'static,
    {
        self.hooks.register(milestone, callback, priority)
    }

    /// Sets the maximum length of a buffered line, terminator included.
    pub fn set_field_limit(&mut self, field_limit: usize) {
        self.field_limit = field_limit;
    }

    /// Sets the line length past which [`Flags::FIELD_LONG`](crate::protocol::Flags::FIELD_LONG)
    /// is raised. Such lines are still parsed.
    pub fn set_field_limit_soft(&mut self, field_limit_soft: usize) {
        self.field_limit_soft = field_limit_soft;
    }

    /// When enabled, a transaction is dropped from its connection parser as
    /// soon as its transaction complete hooks accept it.
    pub fn set_tx_auto_destroy(&mut self, tx_auto_destroy: bool) {
        self.tx_auto_destroy = tx_auto_destroy;
    }

    pub fn hooks(&self) -> &HookRegistry<Transaction> {
        &self.hooks
    }

    pub fn server_personality(&self) -> ServerPersonality {
        self.server_personality
    }

    /// The strategies of the selected personality, fully resolved.
    pub fn strategies(&self) -> &StrategySet {
        &self.strategies
    }

    pub fn field_limit(&self) -> usize {
        self.field_limit
    }

    pub fn field_limit_soft(&self) -> usize {
        self.field_limit_soft
    }

    pub fn tx_auto_destroy(&self) -> bool {
        self.tx_auto_destroy
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_personality", &self.server_personality)
            .field("field_limit", &self.field_limit)
            .field("field_limit_soft", &self.field_limit_soft)
            .field("tx_auto_destroy", &self.tx_auto_destroy)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
