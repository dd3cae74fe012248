//! Generation-stamped cancellation for poll loops
//!
//! Every submission takes a token stamped with the current generation.
//! Advancing the generation cancels every outstanding token at once, so a
//! response that arrives for a superseded or closed task is recognised as
//! stale and dropped instead of being applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared generation counter; one per orchestrator.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel all outstanding tokens and issue one for the new generation.
    pub fn advance(&self) -> CancellationToken {
        let stamp = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        CancellationToken {
            stamp,
            current: self.current.clone(),
        }
    }

    /// Cancel all outstanding tokens.
    pub fn cancel_all(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

/// A cooperative cancellation token.
///
/// The orchestrator advances the generation; the poll loop checks its token
/// before acting on any response. Cancellation during a request has no
/// effect until the next check.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    stamp: u64,
    current: Arc<AtomicU64>,
}

impl CancellationToken {
    /// Check if a newer generation has started.
    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.stamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_uncancelled() {
        let generation = Generation::new();
        let token = generation.advance();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn advancing_cancels_older_tokens_only() {
        let generation = Generation::new();
        let old = generation.advance();
        let new = generation.advance();
        assert!(old.is_cancelled());
        assert!(!new.is_cancelled());
    }

    #[test]
    fn cancel_all_reaches_cloned_tokens() {
        let generation = Generation::new();
        let token = generation.advance();
        let clone = token.clone();
        generation.cancel_all();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }
}
