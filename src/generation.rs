//! Cooperative cancellation for route generations
//!
//! Every (re)start of route generation advances a shared counter and hands
//! the new value out as a [`GenerationToken`]. Work that is about to produce
//! an observable effect checks [`GenerationToken::is_stale`] first and quietly
//! stops when a newer generation exists. Nothing is aborted: in-flight calls
//! of a stale generation still finish, their results are just dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared, monotonically increasing generation counter
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every token handed out before
    pub fn advance(&self) -> GenerationToken {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationToken {
            id,
            live: Arc::clone(&self.current),
        }
    }

    /// Value of the newest generation
    #[must_use]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

/// The generation a piece of work belongs to
#[derive(Debug, Clone)]
pub struct GenerationToken {
    id: u64,
    live: Arc<AtomicU64>,
}

impl GenerationToken {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True once a newer generation has started
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.live.load(Ordering::SeqCst) != self.id
    }

    #[must_use]
    pub fn is_current(&self) -> bool {
        !self.is_stale()
    }
}
