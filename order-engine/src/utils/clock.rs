//! Injected clock
//!
//! Cache TTLs, delivery dates, and meal-time thresholds all depend on
//! "now". Components take a `Clock` instead of calling `Utc::now()`
//! directly so tests can pin time.

use chrono::{DateTime, Utc};

/// Time source seam
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used in production
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed clock for tests
#[derive(Debug)]
pub struct FixedClock(parking_lot::RwLock<DateTime<Utc>>);

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(parking_lot::RwLock::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.write() = now;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.0.write();
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.read()
    }
}
