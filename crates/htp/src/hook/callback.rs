use std::fmt;

use crate::protocol::HookStatus;

/// An inspection extension invoked when a milestone fires.
///
/// A callback receives the shared context, may read and write it, and answers
/// with a [`HookStatus`]. Returning [`HookStatus::Error`] vetoes the current
/// transaction; callbacks after it in the same hook do not run.
///
/// Callbacks run synchronously on the thread driving the parser, so they must be
/// fast and must not block. They must not keep references into the context past
/// the call.
pub trait Callback<D: ?Sized>: Send + Sync {
    fn invoke(&self, data: &mut D) -> HookStatus;
}

/// A callback that wraps a closure.
pub struct FnCallback<F>(F);

impl<F> fmt::Debug for FnCallback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallback").finish_non_exhaustive()
    }
}

impl<D, F> Callback<D> for FnCallback<F>
where
    D: ?Sized,
    F: Fn(&mut D) -> HookStatus + Send + Sync,
{
    #[inline]
    fn invoke(&self, data: &mut D) -> HookStatus {
        (self.0)(data)
    }
}

/// Creates a callback from a closure.
///
/// # Example
/// ```
/// use micro_htp::hook::{fn_callback, Callback};
/// use micro_htp::protocol::{HookStatus, Transaction};
///
/// let only_get = fn_callback(|tx: &mut Transaction| match tx.request_method.as_deref() {
///     Some(b"GET") => HookStatus::Ok,
///     _ => HookStatus::Declined,
/// });
///
/// assert_eq!(only_get.invoke(&mut Transaction::new(0)), HookStatus::Declined);
/// ```
pub fn fn_callback<D, F>(f: F) -> FnCallback<F>
where
    D: ?Sized,
    F: Fn(&mut D) -> HookStatus + Send + Sync,
{
    FnCallback(f)
}

impl<D: ?Sized, C: Callback<D> + ?Sized> Callback<D> for Box<C> {
    #[inline]
    fn invoke(&self, data: &mut D) -> HookStatus {
        (**self).invoke(data)
    }
}

impl<D: ?Sized, C: Callback<D> + ?Sized> Callback<D> for std::sync::Arc<C> {
    #[inline]
    fn invoke(&self, data: &mut D) -> HookStatus {
        (**self).invoke(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn closure_sees_and_mutates_context() {
        let bump = fn_callback(|n: &mut u32| {
            *n += 1;
            HookStatus::Ok
        });

        let mut n = 41;
        assert_eq!(bump.invoke(&mut n), HookStatus::Ok);
        assert_eq!(n, 42);
    }

    #[test]
    fn closure_callback_debug_hides_the_closure() {
        let callback = fn_callback(|_: &mut u32| HookStatus::Ok);
        assert_eq!(format!("{callback:?}"), "FnCallback { .. }");
    }

    #[test]
    fn shared_callback_is_still_a_callback() {
        let shared: Arc<dyn Callback<u32>> = Arc::new(fn_callback(|_: &mut u32| HookStatus::Declined));
        let mut n = 0;
        assert_eq!(shared.invoke(&mut n), HookStatus::Declined);
        assert_eq!(Arc::clone(&shared).invoke(&mut n), HookStatus::Declined);
    }
}
