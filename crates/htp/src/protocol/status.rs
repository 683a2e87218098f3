//! The two status vocabularies used across the hook boundary.
//!
//! Callbacks and hooks answer with [`HookStatus`]; the connection parser answers
//! its caller with [`HtpStatus`]. Both enumerations name `Error`, `Ok` and
//! `Declined`, but the numeric values and the meaning differ, so neither type
//! converts into the other implicitly. [`HtpStatus::from_hook`] is the single
//! translation point.

/// Outcome of a single callback, and the aggregated outcome of a hook.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HookStatus {
    /// The callback vetoes the current transaction. Callbacks after it do not run.
    Error = -1,
    /// The callback did its work.
    Ok = 0,
    /// The callback was not interested in this invocation.
    Declined = 1,
}

impl HookStatus {
    /// Returns true for a veto.
    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, HookStatus::Error)
    }
}

/// Status returned by the connection parser's data entry points.
#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HtpStatus {
    /// The current transaction failed, either vetoed by a callback or malformed
    /// beyond what the tolerant grammar recovers from.
    Error = -1,
    /// No work was done.
    Declined = 0,
    /// The work completed.
    Ok = 1,
    /// All supplied data was consumed; call again with more.
    Data = 2,
    /// Processing needs data from the other direction first. The unconsumed
    /// part of the input stays buffered in the parser.
    DataOther = 3,
    /// The caller should stop feeding this connection.
    Stop = 4,
}

impl HtpStatus {
    /// Translates an aggregated hook status into the parser vocabulary.
    ///
    /// A veto becomes [`HtpStatus::Error`]; `Ok` and `Declined` both let the
    /// parser continue and keep their names.
    pub fn from_hook(status: HookStatus) -> Self {
        match status {
            HookStatus::Error => HtpStatus::Error,
            HookStatus::Ok => HtpStatus::Ok,
            HookStatus::Declined => HtpStatus::Declined,
        }
    }

    /// Returns true when the parser should keep going.
    #[inline]
    pub fn is_continue(self) -> bool {
        !matches!(self, HtpStatus::Error | HtpStatus::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_keeps_meaning_not_value() {
        assert_eq!(HtpStatus::from_hook(HookStatus::Error), HtpStatus::Error);
        assert_eq!(HtpStatus::from_hook(HookStatus::Ok), HtpStatus::Ok);
        assert_eq!(HtpStatus::from_hook(HookStatus::Declined), HtpStatus::Declined);

        // same names, different wire values
        assert_ne!(HookStatus::Ok as i32, HtpStatus::Ok as i32);
        assert_ne!(HookStatus::Declined as i32, HtpStatus::Declined as i32);
    }

    #[test]
    fn continuation() {
        assert!(HtpStatus::from_hook(HookStatus::Ok).is_continue());
        assert!(HtpStatus::from_hook(HookStatus::Declined).is_continue());
        assert!(!HtpStatus::from_hook(HookStatus::Error).is_continue());
        assert!(HtpStatus::Data.is_continue());
        assert!(!HtpStatus::Stop.is_continue());
        assert!(HookStatus::Error.is_error());
        assert!(!HookStatus::Declined.is_error());
    }
}
