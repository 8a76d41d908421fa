//! The streaming vector kernels and their execution-mode variants.
//!
//! Eight fixed elementwise operations over the four benchmark vectors, each
//! available in three execution modes:
//!
//! - **Sequential**: one thread, one pass over the data.
//! - **Throughput**: every worker runs the full kernel over a thread-private
//!   output array; aggregate traffic scales with the worker count.
//! - **Worksharing**: workers split the index range of the shared vectors
//!   into disjoint contiguous chunks.
//!
//! The elementwise sweep bodies are shared between the modes; the mode
//! modules only differ in how they drive the sweeps and where the timestamps
//! are taken.

use crate::allocate::Vectors;
use crate::timing::WallClock;

mod seq;
#[cfg(all(
    feature = "streaming-stores",
    target_arch = "x86_64",
    target_feature = "avx512f"
))]
mod stream_avx512;
mod tp;
mod ws;

/// Index of the slot the sum kernel writes its reduction result into, so the
/// compiler cannot treat the reduction as dead. The measurement context
/// saves and restores this slot around every sum invocation.
pub const SENTINEL_INDEX: usize = 10;

pub const NUM_KERNELS: usize = 8;

/// The fixed kernel list, in the canonical execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KernelId {
    Init = 0,
    Sum,
    Copy,
    Update,
    Triad,
    Daxpy,
    Striad,
    Sdaxpy,
}

impl KernelId {
    pub const ALL: [KernelId; NUM_KERNELS] = [
        KernelId::Init,
        KernelId::Sum,
        KernelId::Copy,
        KernelId::Update,
        KernelId::Triad,
        KernelId::Daxpy,
        KernelId::Striad,
        KernelId::Sdaxpy,
    ];

    pub fn descriptor(self) -> &'static KernelDescriptor {
        &KERNELS[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.descriptor().label
    }
}

/// Static per-kernel metadata: display label, distinct vector words touched
/// per element, floating-point operations per element.
pub struct KernelDescriptor {
    pub label: &'static str,
    pub words: usize,
    pub flops: usize,
}

pub static KERNELS: [KernelDescriptor; NUM_KERNELS] = [
    KernelDescriptor { label: "Init", words: 1, flops: 0 },
    KernelDescriptor { label: "Sum", words: 1, flops: 1 },
    KernelDescriptor { label: "Copy", words: 2, flops: 0 },
    KernelDescriptor { label: "Update", words: 2, flops: 1 },
    KernelDescriptor { label: "Triad", words: 3, flops: 2 },
    KernelDescriptor { label: "Daxpy", words: 3, flops: 2 },
    KernelDescriptor { label: "STriad", words: 4, flops: 2 },
    KernelDescriptor { label: "SDaxpy", words: 4, flops: 2 },
];

/// Execution-mode axis shared by every kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    Throughput,
    Worksharing,
}

impl ExecMode {
    /// Whether kernel invocations in this mode mutate the shared vectors.
    /// Throughput workers write only thread-private arrays.
    pub fn mutates_shared(self) -> bool {
        !matches!(self, ExecMode::Throughput)
    }
}

/// Strategy selecting between the scalar sweep bodies and the non-temporal
/// store fast path. The fast path only exists when the crate is built with
/// the `streaming-stores` feature on an AVX-512 target; on any other build
/// the policy resolves to `Scalar`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimdPolicy {
    Scalar,
    Avx512Streaming,
}

impl SimdPolicy {
    /// Policy compiled into this build.
    pub fn build_default() -> Self {
        #[cfg(all(
            feature = "streaming-stores",
            target_arch = "x86_64",
            target_feature = "avx512f"
        ))]
        {
            SimdPolicy::Avx512Streaming
        }
        #[cfg(not(all(
            feature = "streaming-stores",
            target_arch = "x86_64",
            target_feature = "avx512f"
        )))]
        {
            SimdPolicy::Scalar
        }
    }
}

/// Worker configuration for the parallel execution modes.
#[derive(Clone, Copy, Debug)]
pub struct Threading {
    pub threads: usize,
    /// Pin worker `t` to core `t` before it enters the timed region.
    pub pin: bool,
}

impl Threading {
    pub fn single() -> Self {
        Self {
            threads: 1,
            pin: false,
        }
    }
}

/// Invoke one kernel: exactly `iter` full sweeps over the leading `n`
/// elements, returning the wall time from immediately before the first sweep
/// to immediately after the last.
pub fn run_kernel(
    mode: ExecMode,
    policy: SimdPolicy,
    id: KernelId,
    clock: &WallClock,
    vectors: &mut Vectors,
    scalar: f64,
    n: usize,
    iter: usize,
    threading: &Threading,
) -> f64 {
    match mode {
        ExecMode::Sequential => seq::run(policy, id, clock, vectors, scalar, n, iter),
        ExecMode::Throughput => tp::run(id, clock, vectors, scalar, n, iter, threading),
        ExecMode::Worksharing => ws::run(id, clock, vectors, scalar, n, iter, threading),
    }
}

// ---------------------------------------------------------------------------
// Elementwise sweep bodies, shared by the execution modes
// ---------------------------------------------------------------------------

pub(crate) fn sweep_init(out: &mut [f64], scalar: f64) {
    for x in out {
        *x = scalar;
    }
}

pub(crate) fn sweep_sum(a: &[f64]) -> f64 {
    let mut sum = 0.0;
    for x in a {
        sum += *x;
    }
    sum
}

pub(crate) fn sweep_copy(dst: &mut [f64], src: &[f64]) {
    for (x, s) in dst.iter_mut().zip(src) {
        *x = *s;
    }
}

/// In-place `a[i] = a[i] * scalar`.
pub(crate) fn sweep_update(a: &mut [f64], scalar: f64) {
    for x in a {
        *x *= scalar;
    }
}

/// Out-of-place `out[i] = src[i] * scalar` (throughput-mode update).
pub(crate) fn sweep_scale(out: &mut [f64], src: &[f64], scalar: f64) {
    for (x, s) in out.iter_mut().zip(src) {
        *x = s * scalar;
    }
}

/// `out[i] = b[i] + scalar * c[i]`.
pub(crate) fn sweep_triad(out: &mut [f64], b: &[f64], c: &[f64], scalar: f64) {
    for ((x, bi), ci) in out.iter_mut().zip(b).zip(c) {
        *x = bi + scalar * ci;
    }
}

/// In-place `a[i] = a[i] + scalar * b[i]`.
pub(crate) fn sweep_daxpy(a: &mut [f64], b: &[f64], scalar: f64) {
    for (x, bi) in a.iter_mut().zip(b) {
        *x += scalar * bi;
    }
}

/// `out[i] = b[i] + d[i] * c[i]`.
pub(crate) fn sweep_striad(out: &mut [f64], b: &[f64], c: &[f64], d: &[f64]) {
    for (((x, bi), ci), di) in out.iter_mut().zip(b).zip(c).zip(d) {
        *x = bi + di * ci;
    }
}

/// In-place `a[i] = a[i] + b[i] * c[i]`.
pub(crate) fn sweep_sdaxpy(a: &mut [f64], b: &[f64], c: &[f64]) {
    for ((x, bi), ci) in a.iter_mut().zip(b).zip(c) {
        *x += bi * ci;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocate::{DataInit, Vectors, INIT_SCALAR};

    fn constant_vectors(n: usize) -> Vectors {
        let mut v = Vectors::allocate(n).unwrap();
        v.init(DataInit::Constant, n);
        v
    }

    #[test]
    fn test_kernel_table_matches_ids() {
        assert_eq!(KernelId::ALL.len(), NUM_KERNELS);
        assert_eq!(KernelId::Init.label(), "Init");
        assert_eq!(KernelId::Striad.label(), "STriad");
        assert_eq!(KernelId::Triad.descriptor().words, 3);
        assert_eq!(KernelId::Triad.descriptor().flops, 2);
        assert_eq!(KernelId::Copy.descriptor().flops, 0);
        assert_eq!(KernelId::Sdaxpy.descriptor().words, 4);
    }

    #[test]
    fn test_triad_scenario_constant_init() {
        // N = 1000 with constant init and scalar 0.1: b and c never change
        // under triad alone, so every repetition lands on a[i] == 2.05.
        let n = 1000;
        let mut v = constant_vectors(n);
        let clock = WallClock::new();

        let elapsed = run_kernel(
            ExecMode::Sequential,
            SimdPolicy::Scalar,
            KernelId::Triad,
            &clock,
            &mut v,
            INIT_SCALAR,
            n,
            10,
            &Threading::single(),
        );

        assert!(elapsed >= 0.0);
        assert!(v.a.iter().all(|&x| x == 2.05));
    }

    #[test]
    fn test_kernel_array_roles() {
        let n = 64;
        let clock = WallClock::new();
        let t = Threading::single();
        let run = |id: KernelId, v: &mut Vectors| {
            run_kernel(
                ExecMode::Sequential,
                SimdPolicy::Scalar,
                id,
                &clock,
                v,
                0.5,
                n,
                1,
                &t,
            )
        };

        // init writes b
        let mut v = constant_vectors(n);
        run(KernelId::Init, &mut v);
        assert!(v.b.iter().all(|&x| x == 0.5));
        assert!(v.a.iter().all(|&x| x == 2.0));

        // copy writes c from a
        let mut v = constant_vectors(n);
        run(KernelId::Copy, &mut v);
        assert!(v.c.iter().all(|&x| x == 2.0));

        // update scales a in place
        let mut v = constant_vectors(n);
        run(KernelId::Update, &mut v);
        assert!(v.a.iter().all(|&x| x == 1.0));

        // daxpy accumulates into a: 2.0 + 0.5 * 2.0
        let mut v = constant_vectors(n);
        run(KernelId::Daxpy, &mut v);
        assert!(v.a.iter().all(|&x| x == 3.0));

        // striad: a = b + d * c = 2.0 + 1.0 * 0.5
        let mut v = constant_vectors(n);
        run(KernelId::Striad, &mut v);
        assert!(v.a.iter().all(|&x| x == 2.5));

        // sdaxpy: a = a + b * c = 2.0 + 2.0 * 0.5
        let mut v = constant_vectors(n);
        run(KernelId::Sdaxpy, &mut v);
        assert!(v.a.iter().all(|&x| x == 3.0));
    }

    #[test]
    fn test_sum_writes_sentinel() {
        let n = 64;
        let mut v = constant_vectors(n);
        let clock = WallClock::new();
        run_kernel(
            ExecMode::Sequential,
            SimdPolicy::Scalar,
            KernelId::Sum,
            &clock,
            &mut v,
            0.5,
            n,
            1,
            &Threading::single(),
        );
        // 64 elements of 2.0
        assert_eq!(v.a[SENTINEL_INDEX], 128.0);
        assert!(v.a.iter().enumerate().all(|(i, &x)| i == SENTINEL_INDEX || x == 2.0));
    }

    #[test]
    fn test_worksharing_matches_sequential() {
        let n = 1003; // deliberately not a multiple of the worker count
        let clock = WallClock::new();

        for id in [
            KernelId::Init,
            KernelId::Copy,
            KernelId::Update,
            KernelId::Triad,
            KernelId::Daxpy,
            KernelId::Striad,
            KernelId::Sdaxpy,
        ] {
            let mut seq_v = constant_vectors(n);
            let mut ws_v = constant_vectors(n);

            run_kernel(
                ExecMode::Sequential,
                SimdPolicy::Scalar,
                id,
                &clock,
                &mut seq_v,
                INIT_SCALAR,
                n,
                3,
                &Threading::single(),
            );
            run_kernel(
                ExecMode::Worksharing,
                SimdPolicy::Scalar,
                id,
                &clock,
                &mut ws_v,
                INIT_SCALAR,
                n,
                3,
                &Threading {
                    threads: 4,
                    pin: false,
                },
            );

            for (name, s, w) in [
                ("a", &seq_v.a, &ws_v.a),
                ("b", &seq_v.b, &ws_v.b),
                ("c", &seq_v.c, &ws_v.c),
                ("d", &seq_v.d, &ws_v.d),
            ] {
                assert_eq!(
                    s.iter().collect::<Vec<_>>(),
                    w.iter().collect::<Vec<_>>(),
                    "worksharing {:?} diverged from sequential on vector {}",
                    id,
                    name
                );
            }
        }
    }

    #[test]
    fn test_worksharing_sum_reduction() {
        let n = 500;
        let mut v = constant_vectors(n);
        let clock = WallClock::new();
        run_kernel(
            ExecMode::Worksharing,
            SimdPolicy::Scalar,
            KernelId::Sum,
            &clock,
            &mut v,
            INIT_SCALAR,
            n,
            1,
            &Threading {
                threads: 3,
                pin: false,
            },
        );
        // Partial sums of 500 * 2.0, combined after the join.
        assert_eq!(v.a[SENTINEL_INDEX], 1000.0);
    }

    #[test]
    fn test_throughput_leaves_shared_vectors_unchanged() {
        let n = 256;
        let mut v = constant_vectors(n);
        let clock = WallClock::new();

        for id in KernelId::ALL {
            let elapsed = run_kernel(
                ExecMode::Throughput,
                SimdPolicy::Scalar,
                id,
                &clock,
                &mut v,
                INIT_SCALAR,
                n,
                2,
                &Threading {
                    threads: 2,
                    pin: false,
                },
            );
            assert!(elapsed >= 0.0, "{:?} produced a negative time", id);
        }

        assert!(v.a.iter().all(|&x| x == 2.0));
        assert!(v.b.iter().all(|&x| x == 2.0));
        assert!(v.c.iter().all(|&x| x == 0.5));
        assert!(v.d.iter().all(|&x| x == 1.0));
    }

    #[test]
    fn test_more_workers_than_elements() {
        let n = 5;
        let mut v = constant_vectors(n);
        let clock = WallClock::new();
        run_kernel(
            ExecMode::Worksharing,
            SimdPolicy::Scalar,
            KernelId::Triad,
            &clock,
            &mut v,
            INIT_SCALAR,
            n,
            1,
            &Threading {
                threads: 64,
                pin: false,
            },
        );
        assert!(v.a[..n].iter().all(|&x| x == 2.05));
    }
}
