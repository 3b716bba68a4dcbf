//! Shuttle repeat-rate acceleration curve
//!
//! Fibonacci growth gives small steps near the center and fast repeats at
//! full deflection: 1, 2, 3, 5, 8, 13, 21 repeats per second for |value| 1..7.

use std::time::Duration;

/// Largest displacement the ring reports on either side of zero
pub const MAX_SHUTTLE_MAGNITUDE: u8 = 7;

/// Repeats per second for a displacement magnitude (`n >= 1`)
pub fn accel(n: u8) -> u32 {
    let (mut a, mut b) = (0u32, 1u32);
    for _ in 1..n {
        (a, b) = (b, a + b);
    }
    b
}

/// Interval between repeat ticks for a non-zero magnitude
///
/// Magnitudes past [`MAX_SHUTTLE_MAGNITUDE`] use the top rate.
pub fn repeat_period(magnitude: u8) -> Duration {
    let n = magnitude.clamp(1, MAX_SHUTTLE_MAGNITUDE);
    Duration::from_secs(1) / accel(n)
}
