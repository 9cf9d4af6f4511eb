//! Time sources.
//!
//! Predictions are computed against "now" in unix seconds. Production code
//! reads the wall clock; tests pin time with [`FixedClock`].

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Source of the current unix timestamp in seconds.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now_secs(&self) -> u64;
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        u64::try_from(Utc::now().timestamp()).unwrap_or(0)
    }
}

/// Manually driven clock.
///
/// # Examples
///
/// ```
/// use realmsync::time::{Clock, FixedClock};
///
/// let clock = FixedClock::new(1_000);
/// clock.advance(30);
/// assert_eq!(clock.now_secs(), 1_030);
/// ```
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicU64,
}

impl FixedClock {
    #[must_use]
    pub const fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::Release);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::AcqRel);
    }
}

impl Clock for FixedClock {
    fn now_secs(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}
