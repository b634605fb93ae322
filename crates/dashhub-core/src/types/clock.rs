//! Wall-clock abstraction.
//!
//! Everything that compares against "now" (queue due dates, status
//! timestamps, virtual tick scheduling) reads time through [`Clock`] so
//! tests can move time deterministically.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug + 'static {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Move the clock to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.now.write().unwrap_or_else(|p| p.into_inner());
        *guard = instant;
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(|p| p.into_inner());
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|p| p.into_inner())
    }
}
