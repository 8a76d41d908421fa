//! Adaptive iteration-count calibration.
//!
//! Wall-clock timing of a short-running kernel is dominated by scheduler
//! jitter and timer granularity. Instead of a hand-tuned per-machine
//! iteration count, the calibrator measures once, extrapolates from the
//! observed time-per-iteration, and retries until a single timed invocation
//! lands above the noise floor. It typically converges in one to three
//! attempts.

use crate::error::BenchError;

/// Measurements at or above this duration are accepted.
pub const MIN_DURATION: f64 = 0.1;
/// Extrapolation target inside the acceptance window.
pub const TARGET_DURATION: f64 = 0.3;
/// Applied to every extrapolated iteration count to avoid overshooting on
/// extrapolation error.
pub const SAFETY_FACTOR: f64 = 0.9;
/// Substituted for a zero elapsed time so the scale factor stays finite.
pub const ZERO_TIME_FALLBACK: f64 = 5.0e-3;
/// Attempt budget. A timer that keeps reporting sub-window times past this
/// many extrapolations is pathological.
pub const MAX_ATTEMPTS: usize = 30;
/// Iteration floor; also the starting guess.
pub const START_ITER: usize = 2;

/// Outcome of a successful calibration.
#[derive(Clone, Copy, Debug)]
pub struct Calibration {
    /// Iteration count to use for every repetition at this problem size.
    pub iter: usize,
    /// Number of probe invocations spent.
    pub attempts: usize,
    /// Elapsed time of the accepted probe.
    pub elapsed: f64,
}

/// Find an iteration count for which `run(iter)` lands inside the duration
/// window.
///
/// Acceptance is one-sided: a probe that overshoots `TARGET_DURATION` is
/// still accepted, since re-decreasing the count would oscillate. The
/// measurement is merely slower than ideal, not invalid.
pub fn calibrate(
    kernel: &'static str,
    mut run: impl FnMut(usize) -> f64,
) -> Result<Calibration, BenchError> {
    let mut iter = START_ITER;

    for attempt in 1..=MAX_ATTEMPTS {
        let new_time = run(iter);

        if new_time >= MIN_DURATION {
            return Ok(Calibration {
                iter,
                attempts: attempt,
                elapsed: new_time,
            });
        }

        let measured = if new_time > 0.0 {
            new_time
        } else {
            ZERO_TIME_FALLBACK
        };
        let factor = TARGET_DURATION / measured;
        iter = ((iter as f64 * factor * SAFETY_FACTOR) as usize).max(START_ITER);
    }

    Err(BenchError::CalibrationDidNotConverge {
        kernel,
        attempts: MAX_ATTEMPTS,
    })
}
