//! Readiness state machine
//!
//! A tree is [`ReadyState::Ready`] exactly when its root is configured.
//! Listeners hear about crossings of that boundary, never about
//! recomputations that leave it unchanged.

use std::sync::Arc;

/// Whether enumeration may begin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadyState {
    /// Root is not configured
    #[default]
    Empty,
    /// Root is configured
    Ready,
}

impl ReadyState {
    /// State for a root completeness flag
    #[inline]
    #[must_use]
    pub fn from_configured(configured: bool) -> Self {
        if configured {
            Self::Ready
        } else {
            Self::Empty
        }
    }

    /// Check if ready
    #[inline]
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Observer of readiness transitions
pub trait TreeListener: Send + Sync {
    /// Root became configured
    fn tree_ready(&self);

    /// Root stopped being configured
    fn tree_not_ready(&self);
}

/// Fires exactly one event per boundary crossing
#[derive(Default, Clone)]
pub(crate) struct ReadinessTracker {
    state: ReadyState,
    listeners: Vec<Arc<dyn TreeListener>>,
}

impl ReadinessTracker {
    pub(crate) fn state(&self) -> ReadyState {
        self.state
    }

    /// Set the starting state without notifying anyone
    pub(crate) fn prime(&mut self, state: ReadyState) {
        self.state = state;
    }

    pub(crate) fn subscribe(&mut self, listener: Arc<dyn TreeListener>) {
        self.listeners.push(listener);
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Move to `next`, returning whether a transition happened
    pub(crate) fn transition(&mut self, next: ReadyState) -> bool {
        if next == self.state {
            return false;
        }
        self.state = next;
        match next {
            ReadyState::Ready => {
                tracing::info!("configuration tree is ready");
                for listener in &self.listeners {
                    listener.tree_ready();
                }
            }
            ReadyState::Empty => {
                tracing::info!("configuration tree is no longer ready");
                for listener in &self.listeners {
                    listener.tree_not_ready();
                }
            }
        }
        true
    }
}

impl std::fmt::Debug for ReadinessTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessTracker")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter {
        ready: AtomicUsize,
        not_ready: AtomicUsize,
    }

    impl TreeListener for Counter {
        fn tree_ready(&self) {
            self.ready.fetch_add(1, Ordering::SeqCst);
        }
        fn tree_not_ready(&self) {
            self.not_ready.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn only_boundary_crossings_notify() {
        let counter = Arc::new(Counter::default());
        let mut tracker = ReadinessTracker::default();
        tracker.subscribe(counter.clone());

        assert!(!tracker.transition(ReadyState::Empty));
        assert!(tracker.transition(ReadyState::Ready));
        assert!(!tracker.transition(ReadyState::Ready));
        assert!(tracker.transition(ReadyState::Empty));

        assert_eq!(counter.ready.load(Ordering::SeqCst), 1);
        assert_eq!(counter.not_ready.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn prime_is_silent() {
        let counter = Arc::new(Counter::default());
        let mut tracker = ReadinessTracker::default();
        tracker.subscribe(counter.clone());
        tracker.prime(ReadyState::Ready);
        assert!(tracker.state().is_ready());
        assert_eq!(counter.ready.load(Ordering::SeqCst), 0);
    }
}
