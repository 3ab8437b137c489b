//! Common time helpers for balltrack_core.

use std::time::Duration;

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
#[inline]
pub fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Tick rate in Hz for a period in milliseconds, for log output.
#[inline]
pub fn rate_hz(period_ms: u64) -> f32 {
    MILLIS_PER_SEC as f32 / period_ms.max(1) as f32
}
