//! Reentrancy protection.
//!
//! One flag per ledger instance. It is raised on entry to every mutating
//! operation and lowered when the [`EntryGuard`] drops, which covers the
//! success path, every `?` early return and unwinding panics alike.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::LedgerError;

/// Holds the ledger's in-progress flag for the duration of one operation.
#[derive(Debug)]
pub(crate) struct EntryGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> EntryGuard<'a> {
    /// Raises the flag, or fails if it is already raised.
    pub(crate) fn enter(flag: &'a AtomicBool) -> Result<Self, LedgerError> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| LedgerError::ReentrancyRejected)?;
        Ok(Self { flag })
    }
}

impl Drop for EntryGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_entry_is_rejected() {
        let flag = AtomicBool::new(false);
        let outer = EntryGuard::enter(&flag).unwrap();
        assert_eq!(
            EntryGuard::enter(&flag).unwrap_err(),
            LedgerError::ReentrancyRejected
        );
        drop(outer);
        assert!(EntryGuard::enter(&flag).is_ok());
    }

    #[test]
    fn flag_is_released_on_error_paths() {
        fn failing(flag: &AtomicBool) -> Result<(), LedgerError> {
            let _guard = EntryGuard::enter(flag)?;
            Err(LedgerError::ZeroAmount)
        }

        let flag = AtomicBool::new(false);
        assert!(failing(&flag).is_err());
        assert!(!flag.load(Ordering::SeqCst));
    }
}
