#![forbid(unsafe_code)]

//! Injectable time source for the cooperative scheduler.
//!
//! The concurrent updater measures how long it has been rendering to decide
//! when to yield. In production that is wall-clock time; in tests a
//! [`LabClock`] makes the decision fully deterministic.
//!
//! # Example
//!
//! ```
//! use weft_core::clock::{Clock, LabClock};
//! use web_time::Duration;
//!
//! let lab = LabClock::new();
//! let clock = Clock::Lab(lab.clone());
//! let start = clock.now();
//! lab.advance(Duration::from_millis(8));
//! assert_eq!(clock.now() - start, Duration::from_millis(8));
//! ```

use std::cell::Cell;
use std::rc::Rc;

use web_time::{Duration, Instant};

/// Time source used by the host.
#[derive(Debug, Clone, Default)]
pub enum Clock {
    /// Real wall-clock time.
    #[default]
    Real,
    /// Deterministic lab clock for testing.
    Lab(LabClock),
}

impl Clock {
    #[must_use]
    pub fn now(&self) -> Instant {
        match self {
            Self::Real => Instant::now(),
            Self::Lab(c) => c.now(),
        }
    }

    /// Time elapsed since `earlier`, saturating at zero.
    #[must_use]
    pub fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now()
            .checked_duration_since(earlier)
            .unwrap_or(Duration::ZERO)
    }

    #[inline]
    #[must_use]
    pub fn is_lab(&self) -> bool {
        matches!(self, Self::Lab(_))
    }
}

/// A manually-advanceable clock for deterministic tests.
///
/// All clones share the same offset. Single-threaded, like the runtime
/// that reads it.
#[derive(Debug, Clone)]
pub struct LabClock {
    epoch: Instant,
    offset_us: Rc<Cell<u64>>,
}

impl LabClock {
    /// Create a new lab clock starting at `Instant::now()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            offset_us: Rc::new(Cell::new(0)),
        }
    }

    /// Advance the lab clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        let us = u64::try_from(delta.as_micros()).unwrap_or(u64::MAX);
        self.offset_us.set(self.offset_us.get().saturating_add(us));
    }

    /// Current lab time.
    #[must_use]
    pub fn now(&self) -> Instant {
        let offset = Duration::from_micros(self.offset_us.get());
        self.epoch + offset
    }
}

impl Default for LabClock {
    fn default() -> Self {
        Self::new()
    }
}
