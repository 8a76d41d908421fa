//! Analytic correctness check for constant-initialized runs.
//!
//! Every kernel applies the same recurrence to every element, so a run that
//! started from per-vector constants can be replayed on four scalar
//! stand-ins. The measurement context records each executed invocation as
//! `(kernel, sweeps)`; replaying that log step by step reproduces the exact
//! per-element arithmetic, including the non-idempotent accumulation of
//! update, daxpy and sdaxpy. The expected vector sums are then the replayed
//! values times the element count.

use crate::allocate::{Vectors, INIT_A, INIT_B, INIT_C, INIT_D};
use crate::error::BenchError;
use crate::kernels::KernelId;
use crate::measure::KernelEvent;

/// Maximum tolerated relative deviation between expected and observed sums.
pub const CHECK_MAX_EPSILON: f64 = 1.0e-8;

/// Replay `events` from the constant initial values and return the expected
/// per-element value of `a`, `b`, `c`, `d`.
pub fn replay(events: &[KernelEvent], scalar: f64) -> [f64; 4] {
    let (mut aj, mut bj, mut cj, mut dj) = (INIT_A, INIT_B, INIT_C, INIT_D);

    for event in events {
        for _ in 0..event.sweeps {
            match event.kernel {
                KernelId::Init => bj = scalar,
                // The reduction result is parked in a sentinel slot that the
                // context restores, so sum leaves no trace.
                KernelId::Sum => {}
                KernelId::Copy => cj = aj,
                KernelId::Update => aj *= scalar,
                KernelId::Triad => aj = bj + scalar * cj,
                KernelId::Daxpy => aj += scalar * bj,
                KernelId::Striad => aj = bj + dj * cj,
                KernelId::Sdaxpy => aj += bj * cj,
            }
        }
    }

    [aj, bj, cj, dj]
}

/// Compare the actual vector sums against the replayed prediction.
///
/// Returns the first diverging vector as a [`BenchError::Validation`]; the
/// caller reports it and marks the run untrusted without discarding the
/// measurement output that was already produced.
pub fn verify(
    vectors: &Vectors,
    n: usize,
    scalar: f64,
    events: &[KernelEvent],
) -> Result<(), BenchError> {
    let expected_values = replay(events, scalar);
    let observed = vectors.sums(n);

    for (i, name) in ['a', 'b', 'c', 'd'].into_iter().enumerate() {
        let expected = expected_values[i] * n as f64;
        let observed = observed[i];

        let diverged = if observed == 0.0 {
            expected != 0.0
        } else {
            ((expected - observed) / observed).abs() > CHECK_MAX_EPSILON
        };

        if diverged {
            return Err(BenchError::Validation {
                vector: name,
                expected,
                observed,
            });
        }
    }

    Ok(())
}
