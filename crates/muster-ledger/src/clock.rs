//! Monotonic time source used to validate gathering schedules.
//!
//! The ledger only asks one question of time: "is `scheduled_at` still in the
//! future?" Any ever-increasing counter answers it - block height, slot
//! number, or wall-clock seconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// An ever-increasing counter.
pub trait BlockClock {
    /// Current value. Successive calls never return a smaller value.
    fn now(&self) -> u64;
}

impl<C: BlockClock + ?Sized> BlockClock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// Unix time in seconds, clamped so it never runs backwards.
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water: AtomicU64,
}

impl SystemClock {
    /// Create a clock starting from the current system time.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockClock for SystemClock {
    fn now(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let prev = self.high_water.fetch_max(wall, Ordering::AcqRel);
        prev.max(wall)
    }
}

/// A counter advanced by hand (tests, replays, offline tools).
#[derive(Debug, Default)]
pub struct ManualClock {
    height: AtomicU64,
}

impl ManualClock {
    /// Create a clock at `height`.
    pub fn at(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
        }
    }

    /// Advance by `blocks` and return the new height.
    pub fn advance(&self, blocks: u64) -> u64 {
        self.height.fetch_add(blocks, Ordering::AcqRel) + blocks
    }

    /// Move to `height`; lower values are ignored.
    pub fn set(&self, height: u64) {
        self.height.fetch_max(height, Ordering::AcqRel);
    }
}

impl BlockClock for ManualClock {
    fn now(&self) -> u64 {
        self.height.load(Ordering::Acquire)
    }
}
