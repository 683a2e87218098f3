use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, trace};

use crate::hook::Callback;
use crate::protocol::{ConfigError, HookStatus};

const INITIAL_CAPACITY: usize = 4;

struct CallbackEntry<D: ?Sized> {
    priority: i32,
    callback: Box<dyn Callback<D>>,
}

/// An ordered list of callbacks sharing one context type.
///
/// The list is kept sorted by ascending priority at every point; callbacks of
/// equal priority stay in registration order. Hooks are append-only: there is
/// no way to remove or replace a registered callback.
pub struct Hook<D: ?Sized> {
    callbacks: Vec<CallbackEntry<D>>,
}

impl<D: ?Sized> Hook<D> {
    /// Allocates an empty hook.
    ///
    /// # Errors
    /// Returns [`ConfigError::Allocation`] when memory for the list cannot be reserved.
    pub fn create() -> Result<Self, ConfigError> {
        let mut callbacks = Vec::new();
        callbacks.try_reserve(INITIAL_CAPACITY)?;
        Ok(Self { callbacks })
    }

    /// Inserts `callback` after every callback whose priority is lower than or
    /// equal to `priority`.
    ///
    /// Registration is not idempotent: the same callback registered twice runs twice.
    ///
    /// # Errors
    /// Returns [`ConfigError::Allocation`] when the list cannot grow.
    pub fn register<C>(&mut self, callback: C, priority: i32) -> Result<(), ConfigError>
    where
        C: Callback<D> + 'static,
    {
        self.callbacks.try_reserve(1)?;
        let position = self.callbacks.partition_point(|entry| entry.priority <= priority);
        self.callbacks.insert(position, CallbackEntry { priority, callback: Box::new(callback) });
        trace!(priority, position, total = self.callbacks.len(), "registered callback");
        Ok(())
    }

    /// Runs every callback in order against `data` and aggregates the result.
    ///
    /// - a callback returning [`HookStatus::Error`] stops the run, and the hook
    ///   answers `Error`
    /// - otherwise the hook answers `Ok` when at least one callback did
    /// - otherwise, including for an empty hook, it answers `Declined`
    ///
    /// A callback that panics is treated as a veto. Whatever it wrote into
    /// `data` before panicking stays there.
    pub fn run_all(&self, data: &mut D) -> HookStatus {
        let mut status = HookStatus::Declined;

        for (position, entry) in self.callbacks.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| entry.callback.invoke(data))) {
                Ok(HookStatus::Ok) => status = HookStatus::Ok,
                Ok(HookStatus::Declined) => {}
                Ok(HookStatus::Error) => {
                    debug!(position, priority = entry.priority, "callback vetoed, skipping the rest");
                    return HookStatus::Error;
                }
                Err(_) => {
                    error!(position, priority = entry.priority, "callback panicked, treated as veto");
                    return HookStatus::Error;
                }
            }
        }

        status
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Priorities of the registered callbacks, in execution order.
    pub fn priorities(&self) -> impl Iterator<Item = i32> + '_ {
        self.callbacks.iter().map(|entry| entry.priority)
    }
}

impl<D: ?Sized> fmt::Debug for Hook<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").field("priorities", &self.priorities().collect::<Vec<_>>()).finish()
    }
}
