//! Cooperative cancellation shared between the caller and the worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::errors::{StepError, StepResult};

/// Handle for requesting that running work stop.
///
/// Clones share one flag. Work polls the flag at checkpoints; a running
/// subprocess is only stopped at its next output line. Once set the flag
/// stays set until [`CancelToken::reset`] is called.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe from any thread, idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Return `StepError::Cancelled` if cancellation was requested.
    pub fn checkpoint(&self) -> StepResult<()> {
        if self.is_cancelled() {
            Err(StepError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Clear the flag so the token can be reused for a new run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();

        assert!(token.checkpoint().is_ok());
        other.cancel();

        assert!(token.is_cancelled());
        assert!(matches!(token.checkpoint(), Err(StepError::Cancelled)));
    }

    #[test]
    fn stays_set_until_reset() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!token.is_cancelled());
        assert!(token.checkpoint().is_ok());
    }

    #[test]
    fn cancel_from_another_thread() {
        let token = CancelToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }
}
