//! Measurement aggregation: timing series, summary statistics, derived
//! rates, and the context object threaded through the whole harness.

use crate::allocate::{DataInit, Vectors, BYTES_PER_WORD};
use crate::calibrate::calibrate;
use crate::error::BenchError;
use crate::kernels::{
    self, ExecMode, KernelDescriptor, KernelId, SimdPolicy, Threading, SENTINEL_INDEX,
};
use crate::profile::{RegionMarker, RegionSummary};
use crate::timing::WallClock;

/// Elapsed-time samples for one kernel at one problem size, in collection
/// order.
#[derive(Clone, Debug, Default)]
pub struct TimingSeries {
    samples: Vec<f64>,
}

impl TimingSeries {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, elapsed: f64) {
        self.samples.push(elapsed);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Summary statistics over samples `[1, len)`. The 0th sample is the
    /// warm-up discard: the first invocation pays page-fault and cache-cold
    /// costs that are not representative of steady state.
    ///
    /// Returns `None` for series too short to survive the discard.
    pub fn stats(&self) -> Option<AggregateStats> {
        let kept = &self.samples[self.samples.len().min(1)..];
        if kept.is_empty() {
            return None;
        }

        let mut min = f64::MAX;
        let mut max = 0.0f64;
        let mut total = 0.0;
        for &t in kept {
            min = min.min(t);
            max = max.max(t);
            total += t;
        }

        Some(AggregateStats {
            avg: total / kept.len() as f64,
            min,
            max,
        })
    }
}

/// Elapsed-time summary for one kernel, warm-up sample excluded.
#[derive(Clone, Copy, Debug, Default)]
pub struct AggregateStats {
    pub avg: f64,
    /// Primary rate estimator; the minimum is the sample least disturbed by
    /// transient system noise.
    pub min: f64,
    pub max: f64,
}

/// Rates derived from an [`AggregateStats`]. `None` means the computation
/// was skipped: degenerate timing for bandwidth, a zero-flop kernel for the
/// flop rate.
#[derive(Clone, Copy, Debug)]
pub struct DerivedRates {
    /// Bytes per second.
    pub bandwidth: Option<f64>,
    /// Floating-point operations per second.
    pub flop_rate: Option<f64>,
}

/// Compute bandwidth and flop rate for a measurement of `iter` sweeps over
/// `n` elements. `scale` multiplies the traffic for throughput mode, where
/// every worker moves the full working set.
///
/// A non-positive minimum time (possible on a clock coarser than the run)
/// yields `None` rates and a warning instead of an Inf/NaN row.
pub fn derive_rates(
    desc: &KernelDescriptor,
    n: usize,
    iter: usize,
    scale: usize,
    stats: &AggregateStats,
) -> DerivedRates {
    if stats.min <= 0.0 {
        eprintln!(
            "bwbench: warning: non-positive minimum time for {}, skipping rate computation",
            desc.label
        );
        return DerivedRates {
            bandwidth: None,
            flop_rate: None,
        };
    }

    let volume = (n * iter * scale) as f64;
    let bytes = (desc.words * BYTES_PER_WORD) as f64 * volume;
    let flops = desc.flops as f64 * volume;

    DerivedRates {
        bandwidth: Some(bytes / stats.min),
        flop_rate: (desc.flops > 0).then(|| flops / stats.min),
    }
}

/// One executed kernel invocation: which kernel, and how many full sweeps it
/// performed. The correctness check replays these.
#[derive(Clone, Copy, Debug)]
pub struct KernelEvent {
    pub kernel: KernelId,
    pub sweeps: usize,
}

/// Everything a measurement needs, passed explicitly instead of living in
/// globals: the vectors, the clock, the region marker, the execution
/// configuration, and the event log feeding the correctness check.
pub struct MeasurementContext {
    pub vectors: Vectors,
    pub clock: WallClock,
    pub scalar: f64,
    pub mode: ExecMode,
    pub simd: SimdPolicy,
    pub threading: Threading,
    pub init: DataInit,
    /// Outer repetition count per kernel (series length including the
    /// warm-up discard).
    pub reps: usize,
    marker: Box<dyn RegionMarker>,
    events: Vec<KernelEvent>,
}

impl MeasurementContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        alloc_len: usize,
        mode: ExecMode,
        simd: SimdPolicy,
        threading: Threading,
        init: DataInit,
        scalar: f64,
        reps: usize,
        marker: Box<dyn RegionMarker>,
    ) -> Result<Self, BenchError> {
        Ok(Self {
            vectors: Vectors::allocate(alloc_len)?,
            clock: WallClock::new(),
            scalar,
            mode,
            simd,
            threading,
            init,
            reps,
            marker,
            events: Vec::new(),
        })
    }

    /// Traffic multiplier for rate derivation.
    pub fn scale(&self) -> usize {
        match self.mode {
            ExecMode::Throughput => self.threading.threads.max(1),
            _ => 1,
        }
    }

    /// (Re-)initialize the leading `n` elements of the vectors and forget
    /// previously recorded events.
    pub fn reinit(&mut self, n: usize) {
        self.vectors.init(self.init, n);
        self.events.clear();
    }

    pub fn events(&self) -> &[KernelEvent] {
        &self.events
    }

    pub fn marker_summary(&self) -> Vec<RegionSummary> {
        self.marker.summary()
    }

    /// Run one calibrated-or-probing kernel invocation: bracket it with the
    /// region marker, shield the sum sentinel slot, and record the executed
    /// sweeps for the correctness check.
    pub fn run_kernel(&mut self, id: KernelId, n: usize, iter: usize) -> f64 {
        let label = id.label();
        self.marker.start(label);

        let saved_sentinel = (id == KernelId::Sum)
            .then(|| self.vectors.a.get(SENTINEL_INDEX).copied())
            .flatten();

        let elapsed = kernels::run_kernel(
            self.mode,
            self.simd,
            id,
            &self.clock,
            &mut self.vectors,
            self.scalar,
            n,
            iter,
            &self.threading,
        );

        if let Some(value) = saved_sentinel {
            self.vectors.a[SENTINEL_INDEX] = value;
        }

        self.marker.stop(label);

        if self.mode.mutates_shared() {
            self.events.push(KernelEvent {
                kernel: id,
                sweeps: iter,
            });
        }

        elapsed
    }
}

/// Result row for one kernel at one problem size.
#[derive(Clone, Copy, Debug)]
pub struct KernelMeasurement {
    pub kernel: KernelId,
    pub iter: usize,
    pub stats: AggregateStats,
    pub bandwidth: Option<f64>,
    pub flop_rate: Option<f64>,
}

/// Fixed-size benchmark: calibrate every kernel at `n`, then interleave the
/// kernels round-robin for `reps` outer repetitions, exactly like the
/// classic fixed-size run, and reduce each series to a result row.
pub fn run_fixed(
    ctx: &mut MeasurementContext,
    n: usize,
) -> Result<Vec<KernelMeasurement>, BenchError> {
    let mut calibrated = Vec::with_capacity(KernelId::ALL.len());
    for id in KernelId::ALL {
        let cal = calibrate(id.label(), |iter| ctx.run_kernel(id, n, iter))?;
        calibrated.push((id, cal.iter));
    }

    let mut series: Vec<TimingSeries> = calibrated
        .iter()
        .map(|_| TimingSeries::with_capacity(ctx.reps))
        .collect();

    for _ in 0..ctx.reps {
        for (slot, &(id, iter)) in series.iter_mut().zip(&calibrated) {
            slot.push(ctx.run_kernel(id, n, iter));
        }
    }

    let scale = ctx.scale();
    Ok(calibrated
        .iter()
        .zip(&series)
        .map(|(&(id, iter), series)| {
            let stats = series.stats().unwrap_or_default();
            let rates = derive_rates(id.descriptor(), n, iter, scale, &stats);
            KernelMeasurement {
                kernel: id,
                iter,
                stats,
                bandwidth: rates.bandwidth,
                flop_rate: rates.flop_rate,
            }
        })
        .collect())
}
