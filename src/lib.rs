//! # bwbench
//!
//! A memory-hierarchy bandwidth benchmark: sustained bandwidth and
//! floating-point throughput for a fixed set of streaming vector kernels
//! (init, sum, copy, update, triad, daxpy, striad, sdaxpy), measured either
//! at a single problem size or swept across geometrically growing sizes to
//! trace cache-level boundaries.
//!
//! The heart of the crate is the adaptive timing harness: the
//! [`calibrate`](calibrate::calibrate) loop that stretches each kernel above
//! the timer-noise floor, and the [`measure`] aggregation that reduces
//! repeated runs to noise-resistant rates.

pub mod affinity;
pub mod allocate;
pub mod calibrate;
pub mod check;
pub mod cli;
pub mod error;
pub mod kernels;
pub mod measure;
pub mod profile;
pub mod report;
pub mod sweep;
pub mod timing;

pub use error::BenchError;

pub mod prelude {
    pub use crate::allocate::{DataInit, Vectors, ARRAY_ALIGNMENT};
    pub use crate::calibrate::{calibrate, Calibration};
    pub use crate::error::BenchError;
    pub use crate::kernels::{ExecMode, KernelId, SimdPolicy, Threading};
    pub use crate::measure::{run_fixed, KernelMeasurement, MeasurementContext};
    pub use crate::sweep::{run_sweep, SweepPoint};
}

#[cfg(test)]
mod tests {
    use crate::allocate::{DataInit, INIT_SCALAR};
    use crate::check;
    use crate::kernels::{ExecMode, KernelId, SimdPolicy, Threading};
    use crate::measure::MeasurementContext;
    use crate::profile::RegionTally;

    /// Whole-pipeline exercise at a small size: every kernel in every
    /// mutating mode runs through the context, the region marker sees every
    /// invocation, and the analytic check signs off on the final state.
    #[test]
    fn test_pipeline_validates_across_modes() {
        for (mode, threads) in [(ExecMode::Sequential, 1), (ExecMode::Worksharing, 4)] {
            let n = 2048;
            let mut ctx = MeasurementContext::new(
                n,
                mode,
                SimdPolicy::build_default(),
                Threading {
                    threads,
                    pin: false,
                },
                DataInit::Constant,
                INIT_SCALAR,
                5,
                Box::new(RegionTally::new()),
            )
            .unwrap();
            ctx.reinit(n);

            for id in KernelId::ALL {
                let elapsed = ctx.run_kernel(id, n, 3);
                assert!(elapsed >= 0.0, "{:?} returned a negative time", id);
            }

            check::verify(&ctx.vectors, n, ctx.scalar, ctx.events())
                .unwrap_or_else(|err| panic!("{mode:?} run failed validation: {err}"));

            let summary = ctx.marker_summary();
            assert_eq!(summary.len(), KernelId::ALL.len());
            assert!(summary.iter().all(|row| row.calls == 1));
        }
    }
}
