//! Time source abstraction for token expiry.
//!
//! Production code reads the system clock; tests substitute a manually
//! advanced clock so expiry boundaries can be checked deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Abstraction over wall-clock time.
pub trait Clock: Send + Sync {
    /// Current time in whole seconds since the Unix epoch.
    fn now_secs(&self) -> u64;
}

/// Real time source using the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        // duration_since(UNIX_EPOCH) only fails if system time is before 1970.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_secs())
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start_secs: u64) -> Self {
        Self {
            now: AtomicU64::new(start_secs),
        }
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn set(&self, secs: u64) {
        self.now.store(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
