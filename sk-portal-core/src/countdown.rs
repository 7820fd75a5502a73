//! Wall-clock anchored countdown

use std::time::{Duration, Instant};

/// Longest countdown that will be started. Servers have been seen reporting
/// absurd remaining times, anything above this is treated as this.
pub const MAX_COUNTDOWN_SECS: u64 = 24 * 60 * 60;

/// A countdown towards a fixed point in time.
///
/// The remaining time is always derived from the deadline, so a process that
/// gets suspended for a while shows the right value on the very next tick
/// instead of slowly catching up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    ends_at: Instant,
}

impl Countdown {
    /// Start counting down `seconds` from `now`, capped at
    /// [`MAX_COUNTDOWN_SECS`].
    pub fn start(now: Instant, seconds: u64) -> Self {
        let seconds = seconds.min(MAX_COUNTDOWN_SECS);
        Self {
            ends_at: now
                .checked_add(Duration::from_secs(seconds))
                .unwrap_or(now),
        }
    }

    /// Whole seconds left, rounded up.
    ///
    /// Rounding up means a fresh 300 second countdown reads 300 until a
    /// full second has elapsed, and only reads 0 once the deadline passed.
    pub fn remaining_seconds(&self, now: Instant) -> u64 {
        let left = self.ends_at.saturating_duration_since(now);
        let secs = left.as_secs();
        if left.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Format seconds as `MM:SS`
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
