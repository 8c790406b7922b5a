//! Build generation tracking.
//!
//! Every tree build is stamped with a generation id. Starting a new build
//! advances the shared counter, and work tagged with an older id is stale:
//! the scheduler drops it at its next batch boundary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically increasing generation counter shared by one collection view.
#[derive(Debug, Clone, Default)]
pub struct BuildGeneration {
    current: Arc<AtomicU64>,
}

impl BuildGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the counter and returns a guard for the new generation.
    pub fn next(&self) -> GenerationGuard {
        let id = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        GenerationGuard {
            generation_id: id,
            current: Arc::clone(&self.current),
        }
    }

    pub fn current_id(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

/// Captured generation id plus a view of the live counter.
#[derive(Debug, Clone)]
pub struct GenerationGuard {
    generation_id: u64,
    current: Arc<AtomicU64>,
}

impl GenerationGuard {
    /// True once a newer generation has started.
    pub fn is_stale(&self) -> bool {
        self.current.load(Ordering::Acquire) != self.generation_id
    }

    pub fn generation_id(&self) -> u64 {
        self.generation_id
    }
}

#[cfg(test)]
mod tests {
    use super::BuildGeneration;

    #[test]
    fn test_generation_ids_increase() {
        let generation = BuildGeneration::new();
        assert_eq!(generation.current_id(), 0);

        let first = generation.next();
        let second = generation.next();

        assert_eq!(first.generation_id(), 1);
        assert_eq!(second.generation_id(), 2);
        assert_eq!(generation.current_id(), 2);
    }

    #[test]
    fn test_older_guard_becomes_stale() {
        let generation = BuildGeneration::new();
        let first = generation.next();
        assert!(!first.is_stale(), "fresh guard should be current");

        let second = generation.clone().next();

        assert!(first.is_stale(), "superseded guard should be stale");
        assert!(!second.is_stale(), "latest guard should stay current");
    }
}
