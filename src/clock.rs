//! Clock abstraction so time-dependent decisions are testable.
//!
//! Cache TTLs, override expiry, and the impersonation timeout are all lazy
//! predicates over "now". Injecting the clock keeps them deterministic under
//! test without a background scheduler.

use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Intended for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a manual clock pinned at the given instant.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Create a manual clock pinned at the current system time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.write().unwrap();
        *now += delta;
    }

    /// Pin the clock to a specific instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.write().unwrap() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap()
    }
}

/// Shared clock handle used throughout the core.
pub type SharedClock = Arc<dyn Clock>;

/// Convenience constructor for the default system clock.
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}
