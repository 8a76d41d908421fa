//! Memory-hierarchy sweep: one bandwidth-vs-size curve per kernel.
//!
//! Problem sizes grow geometrically from a small in-cache floor up to the
//! configured maximum, so the curve crosses every cache level on the way to
//! main memory. The optimal iteration count varies by orders of magnitude
//! between an L1-resident and a memory-resident size, which is why every
//! (kernel, size) pair is calibrated from scratch.

use std::io;

use crate::calibrate::calibrate;
use crate::error::BenchError;
use crate::kernels::{KernelDescriptor, KernelId};
use crate::measure::{derive_rates, AggregateStats, MeasurementContext, TimingSeries};

/// First problem size of every sweep.
pub const START_SIZE: usize = 100;
/// Geometric expansion factor between consecutive sizes.
pub const EXPANSION: f64 = 1.2;

/// One row of a sweep curve.
#[derive(Clone, Copy, Debug)]
pub struct SweepPoint {
    pub n: usize,
    pub iter: usize,
    pub stats: AggregateStats,
    /// Bytes per second; `None` when the timing was degenerate.
    pub bandwidth: Option<f64>,
    /// Flops per second; `None` for zero-flop kernels or degenerate timing.
    pub flop_rate: Option<f64>,
}

/// Where sweep results go. The harness only depends on this interface; the
/// `.dat`-file implementation lives in the report module.
pub trait SweepSink {
    fn begin_kernel(&mut self, desc: &'static KernelDescriptor) -> io::Result<()>;
    fn point(
        &mut self,
        desc: &'static KernelDescriptor,
        point: &SweepPoint,
    ) -> io::Result<()>;
    fn finish_kernel(&mut self, desc: &'static KernelDescriptor) -> io::Result<()>;
}

/// The geometric size sequence `START_SIZE, floor(n * EXPANSION), ...`
/// strictly below `max`.
pub fn size_ladder(max: usize) -> Vec<usize> {
    let mut sizes = Vec::new();
    let mut n = START_SIZE;
    while n < max {
        sizes.push(n);
        n = (n as f64 * EXPANSION) as usize;
    }
    sizes
}

/// Drive the full sweep: every kernel over every ladder size, recalibrating
/// at each point. Calibration failures and degenerate timings skip the
/// point with a warning instead of aborting the sweep.
pub fn run_sweep(
    ctx: &mut MeasurementContext,
    max_n: usize,
    sink: &mut dyn SweepSink,
) -> Result<(), BenchError> {
    let sizes = size_ladder(max_n);
    let scale = ctx.scale();

    for id in KernelId::ALL {
        let desc = id.descriptor();
        sink.begin_kernel(desc)?;

        for &n in &sizes {
            // Fresh data per point keeps repeated update/daxpy sweeps from
            // driving the values toward denormals mid-curve.
            ctx.reinit(n);

            let cal = match calibrate(desc.label, |iter| ctx.run_kernel(id, n, iter)) {
                Ok(cal) => cal,
                Err(err) => {
                    eprintln!("bwbench: warning: {err}, skipping N = {n}");
                    continue;
                }
            };

            let mut series = TimingSeries::with_capacity(ctx.reps);
            for _ in 0..ctx.reps {
                series.push(ctx.run_kernel(id, n, cal.iter));
            }

            let stats = series.stats().unwrap_or_default();
            let rates = derive_rates(desc, n, cal.iter, scale, &stats);

            sink.point(
                desc,
                &SweepPoint {
                    n,
                    iter: cal.iter,
                    stats,
                    bandwidth: rates.bandwidth,
                    flop_rate: rates.flop_rate,
                },
            )?;
        }

        sink.finish_kernel(desc)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_point_count_matches_geometric_formula() {
        // 100 to 100000 at x1.2: ceil(ln(1000) / ln(1.2)) points.
        let sizes = size_ladder(100_000);
        let expected = ((100_000f64 / 100.0).ln() / EXPANSION.ln()).ceil() as usize;
        assert_eq!(sizes.len(), expected);
        assert_eq!(sizes.len(), 38);
    }

    #[test]
    fn test_ladder_is_strictly_increasing_and_bounded() {
        let sizes = size_ladder(8_000_000);
        assert_eq!(sizes[0], START_SIZE);
        assert!(sizes.windows(2).all(|w| w[0] < w[1]));
        assert!(sizes.iter().all(|&n| n < 8_000_000));
    }

    #[test]
    fn test_ladder_applies_floor_per_step() {
        let sizes = size_ladder(300);
        // 100, 120, 144, 172 (floor of 172.8), 206 (floor of 207.36-ish), ...
        assert_eq!(&sizes[..4], &[100, 120, 144, 172]);
    }

    #[test]
    fn test_ladder_below_start_is_empty() {
        assert!(size_ladder(START_SIZE).is_empty());
        assert!(size_ladder(0).is_empty());
    }
}
