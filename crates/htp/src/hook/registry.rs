use std::fmt;

use crate::hook::{Callback, Hook, Milestone};
use crate::protocol::{ConfigError, HookStatus};

/// One hook slot per [`Milestone`].
///
/// Slots start empty. A hook is created the first time a callback is
/// registered for its milestone; running an empty slot declines.
pub struct HookRegistry<D: ?Sized> {
    hooks: [Option<Hook<D>>; Milestone::COUNT],
}

impl<D: ?Sized> HookRegistry<D> {
    pub fn new() -> Self {
        Self { hooks: std::array::from_fn(|_| None) }
    }

    /// Registers a callback on the hook of `milestone`, creating the hook if needed.
    ///
    /// # Errors
    /// Returns [`ConfigError::Allocation`] when the hook cannot be created or grown.
    pub fn register<C>(&mut self, milestone: Milestone, callback: C, priority: i32) -> Result<(), ConfigError>
    where
        C: Callback<D> + 'static,
    {
        let slot = &mut self.hooks[milestone.index()];
        let hook = match slot {
            Some(hook) => hook,
            None => slot.insert(Hook::create()?),
        };
        hook.register(callback, priority)
    }

    /// Runs the hook of `milestone`. A milestone without a hook declines.
    pub fn run_all(&self, milestone: Milestone, data: &mut D) -> HookStatus {
        self.hooks[milestone.index()].as_ref().map_or(HookStatus::Declined, |hook| hook.run_all(data))
    }

    /// The hook of `milestone`, if one was created.
    pub fn hook(&self, milestone: Milestone) -> Option<&Hook<D>> {
        self.hooks[milestone.index()].as_ref()
    }
}

impl<D: ?Sized> Default for HookRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ?Sized> fmt::Debug for HookRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let created = Milestone::ALL.iter().filter_map(|m| self.hook(*m).map(|hook| (m.as_str(), hook)));
        f.debug_map().entries(created).finish()
    }
}
