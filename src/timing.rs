//! Monotonic wall-clock timestamp source.
//!
//! All measurements in the harness are differences of two reads of the same
//! `WallClock`, expressed as seconds in `f64`. The clock is backed by
//! [`std::time::Instant`], which is monotonic and immune to thread or core
//! migration.

use std::time::Instant;

/// Number of change-over probes used to estimate the clock resolution.
const RESOLUTION_PROBES: usize = 32;

/// Monotonic high-resolution clock handed out once per measurement context.
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Seconds elapsed since this clock was created. Non-decreasing.
    #[inline(always)]
    pub fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    /// Smallest observable positive tick, in seconds.
    ///
    /// Measured by spinning until the reported time changes and keeping the
    /// smallest delta seen over a handful of probes.
    pub fn resolution(&self) -> f64 {
        let mut best = f64::INFINITY;

        for _ in 0..RESOLUTION_PROBES {
            let t0 = self.now();
            let mut t1 = self.now();
            while t1 <= t0 {
                t1 = self.now();
            }
            best = best.min(t1 - t0);
        }

        best
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_nondecreasing() {
        let clock = WallClock::new();
        let t1 = clock.now();
        let t2 = clock.now();
        let t3 = clock.now();
        assert!(t1 <= t2 && t2 <= t3, "wall clock must never run backwards");
    }

    #[test]
    fn test_resolution_is_positive_and_finite() {
        let clock = WallClock::new();
        let res = clock.resolution();
        assert!(res > 0.0);
        assert!(res.is_finite());
        // Any usable platform clock ticks faster than once per second.
        assert!(res < 1.0);
    }
}
