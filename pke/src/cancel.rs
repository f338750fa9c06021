use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::errors::{SearchError, SearchResult};

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    running: AtomicBool,
}

/// Shared cancellation signal for one search.
///
/// Cloning is cheap and every clone observes the same state. Once [`cancel`] has been
/// called the token stays triggered; a new search needs a new token.
///
/// [`cancel`]: CancellationToken::cancel
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Triggers cancellation. Idempotent, and valid before a search has started.
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::SeqCst) {
            debug!("Cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Whether a session currently holds this token
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Claims the token for one session. Fails if another session still holds it.
    pub(crate) fn acquire(&self) -> SearchResult<RunGuard> {
        self.state
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SearchError::SessionActive)?;
        Ok(RunGuard {
            state: Arc::clone(&self.state),
        })
    }
}

/// Marks a token as in use until dropped.
#[derive(Debug)]
pub(crate) struct RunGuard {
    state: Arc<TokenState>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::SeqCst);
    }
}
