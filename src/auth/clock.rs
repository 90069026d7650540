//! Timestamp sources for request signing.
//!
//! The exchange rejects requests whose `CB-ACCESS-TIMESTAMP` is too far from
//! its own clock, so the signer reads time through [`ClockSource`] rather than
//! calling the system clock directly.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Trait for providing signing timestamps.
pub trait ClockSource: Send + Sync {
    /// Current time in whole seconds since the UNIX epoch (UTC).
    fn now(&self) -> u64;

    /// Align this clock with the server's current time.
    ///
    /// Returns `false` if the clock cannot be adjusted.
    fn synchronize(&self, server_now: u64) -> bool {
        let _ = server_now;
        false
    }
}

fn wall_clock_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn wall_clock_secs_signed() -> i64 {
    i64::try_from(wall_clock_secs()).unwrap_or(i64::MAX)
}

/// Wall-clock time, no adjustment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> u64 {
        wall_clock_secs()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub u64);

impl ClockSource for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

/// Wall-clock time corrected by an offset learned from the server.
#[derive(Debug, Default)]
pub struct SyncedClock {
    offset_secs: AtomicI64,
}

impl SyncedClock {
    /// Create a clock with no offset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current offset from the local wall clock, in seconds.
    pub fn offset(&self) -> i64 {
        self.offset_secs.load(Ordering::Acquire)
    }

    /// Replace the offset directly.
    pub fn set_offset(&self, offset_secs: i64) {
        self.offset_secs.store(offset_secs, Ordering::Release);
    }
}

impl ClockSource for SyncedClock {
    fn now(&self) -> u64 {
        let adjusted = wall_clock_secs_signed().saturating_add(self.offset());
        u64::try_from(adjusted).unwrap_or(0)
    }

    /// Rejects server times beyond `i64::MAX` seconds and keeps the current offset.
    fn synchronize(&self, server_now: u64) -> bool {
        let Ok(server_now) = i64::try_from(server_now) else {
            tracing::warn!(server_now, "server time out of range, clock not adjusted");
            return false;
        };
        let offset = server_now.saturating_sub(wall_clock_secs_signed());
        self.set_offset(offset);
        tracing::debug!(offset_secs = offset, "clock synchronized with server");
        true
    }
}
