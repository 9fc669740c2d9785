//! In-flight rasterization counter

/// Bounded counter limiting simultaneously dispatched rasterizations.
///
/// Advisory state consulted by the scheduler tick, not a lock: the pipeline
/// is single-threaded, so plain integers suffice. A multi-threaded embedding
/// must keep the gate owned by its scheduling thread.
#[derive(Debug)]
pub struct ConcurrencyGate {
    active: usize,
    limit: usize,
}

impl ConcurrencyGate {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            active: 0,
            limit: limit.max(1),
        }
    }

    /// Claim a slot if one is free.
    pub fn try_acquire(&mut self) -> bool {
        if self.active < self.limit {
            self.active += 1;
            true
        } else {
            false
        }
    }

    /// Return a slot.
    pub fn release(&mut self) {
        debug_assert!(self.active > 0, "gate released more than acquired");
        self.active = self.active.saturating_sub(1);
    }

    /// Drop all claims. Used on teardown.
    pub fn reset(&mut self) {
        self.active = 0;
    }

    /// Renders currently in flight
    #[must_use]
    pub fn active(&self) -> usize {
        self.active
    }

    /// Maximum simultaneous renders
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn at_capacity(&self) -> bool {
        self.active >= self.limit
    }
}
