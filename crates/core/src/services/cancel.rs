//! Cooperative cancellation of transfer fetches.
//!
//! A [`FetchControl`] hands out one [`CancelFlag`] per fetch. Starting a new
//! fetch or calling [`FetchControl::cancel`] raises every flag handed out
//! before. Flags are only polled at page boundaries, so a page request in
//! progress always runs to completion.
//!
//! A fetch that was cancelled explicitly is still the latest one; a fetch
//! replaced by [`FetchControl::begin`] is not.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

/// Issues cancellation flags; owned by whoever starts fetches.
#[derive(Debug)]
pub struct FetchControl {
    generation: watch::Sender<u64>,
    latest: AtomicU64,
}

impl FetchControl {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            generation,
            latest: AtomicU64::new(0),
        }
    }

    /// Cancel any outstanding fetch and return the flag for a new one.
    pub fn begin(&self) -> CancelFlag {
        let mut started = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            started = *g;
            self.latest.store(started, Ordering::SeqCst);
        });
        CancelFlag {
            generation: started,
            rx: self.generation.subscribe(),
        }
    }

    /// Cancel the outstanding fetch, if any.
    pub fn cancel(&self) {
        self.generation.send_modify(|g| *g += 1);
    }

    /// Whether no fetch was started after the one owning `flag`.
    pub fn is_latest(&self, flag: &CancelFlag) -> bool {
        self.latest.load(Ordering::SeqCst) == flag.generation
    }
}

impl Default for FetchControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a cancellation request, checked once per page.
#[derive(Debug, Clone)]
pub struct CancelFlag {
    rx: watch::Receiver<u64>,
    generation: u64,
}

impl CancelFlag {
    /// A flag that is never raised.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(0);
        Self { rx, generation: 0 }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() != self.generation
    }

    /// Generation of the fetch owning this flag, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fetch_cancels_previous() {
        let control = FetchControl::new();
        let first = control.begin();
        assert!(!first.is_cancelled());

        let second = control.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        control.cancel();
        assert!(second.is_cancelled());
    }

    #[test]
    fn explicit_cancel_keeps_latest() {
        let control = FetchControl::new();
        let first = control.begin();
        assert_eq!(first.generation(), 1);

        control.cancel();
        assert!(first.is_cancelled());
        assert!(control.is_latest(&first));

        let second = control.begin();
        assert!(!control.is_latest(&first));
        assert!(control.is_latest(&second));
    }

    #[test]
    fn never_flag_stays_down() {
        let flag = CancelFlag::never();
        assert!(!flag.is_cancelled());
    }
}
