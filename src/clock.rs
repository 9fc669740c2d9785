//! Injectable time source for TTL and frame-pacing checks

use std::time::Instant;

/// Source of "now" for cache expiry and dispatch throttling.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// System monotonic clock
#[derive(Clone, Copy, Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(any(test, feature = "test-utils"))]
mod manual {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use super::Clock;

    /// Deterministic clock advanced explicitly by tests.
    ///
    /// Clones share the same offset, so a test can keep one handle while the
    /// pipeline owns another.
    #[derive(Clone, Debug)]
    pub struct ManualClock {
        origin: Instant,
        offset: Rc<Cell<Duration>>,
    }

    impl ManualClock {
        #[must_use]
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
            }
        }

        /// Move time forward by `by`.
        pub fn advance(&self, by: Duration) {
            self.offset.set(self.offset.get() + by);
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + self.offset.get()
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use manual::ManualClock;
