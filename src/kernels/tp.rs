//! Throughput kernel drivers.
//!
//! Every worker runs the full kernel over a thread-private output array
//! while reading the shared input vectors, so the aggregate memory traffic
//! scales with the worker count. The private array is allocated inside the
//! worker, before the entry barrier, so its pages are first touched by the
//! thread that will stream through them.

use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;

use super::{
    sweep_copy, sweep_init, sweep_scale, sweep_striad, sweep_sum, sweep_triad, KernelId,
    Threading,
};
use crate::affinity;
use crate::allocate::{AlignedVec, Vectors, ARRAY_ALIGNMENT};
use crate::timing::WallClock;

pub(super) fn run(
    id: KernelId,
    clock: &WallClock,
    vectors: &mut Vectors,
    scalar: f64,
    n: usize,
    iter: usize,
    threading: &Threading,
) -> f64 {
    let workers = threading.threads.max(1);
    let barrier = Barrier::new(workers);
    let start_bits = AtomicU64::new(0);
    let end_bits = AtomicU64::new(0);
    let pin = threading.pin;

    let (a, b, c, d) = (
        &vectors.a[..n],
        &vectors.b[..n],
        &vectors.c[..n],
        &vectors.d[..n],
    );

    std::thread::scope(|scope| {
        for tid in 0..workers {
            let barrier = &barrier;
            let start_bits = &start_bits;
            let end_bits = &end_bits;
            let clock = *clock;

            scope.spawn(move || {
                if pin {
                    affinity::pin_to(tid);
                }

                let mut private =
                    AlignedVec::new(n, ARRAY_ALIGNMENT).unwrap_or_else(|err| {
                        eprintln!("bwbench: thread-private allocation failed: {err}");
                        std::process::exit(1);
                    });
                let out = &mut private[..];

                if barrier.wait().is_leader() {
                    start_bits.store(clock.now().to_bits(), Ordering::Relaxed);
                }
                barrier.wait();

                let mut local = 0.0;
                for _ in 0..iter {
                    match id {
                        KernelId::Init => sweep_init(out, scalar),
                        KernelId::Sum => local += sweep_sum(a),
                        KernelId::Copy => sweep_copy(out, b),
                        KernelId::Update => sweep_scale(out, a, scalar),
                        // out = b + scalar * c
                        KernelId::Triad => sweep_triad(out, b, c, scalar),
                        // out = a + scalar * b
                        KernelId::Daxpy => sweep_triad(out, a, b, scalar),
                        // out = b + d * c
                        KernelId::Striad => sweep_striad(out, b, c, d),
                        // out = a + c * b
                        KernelId::Sdaxpy => sweep_striad(out, a, b, c),
                    }
                    if id == KernelId::Sum {
                        black_box(&local);
                    } else {
                        black_box(out.last());
                    }
                }
                black_box(local);

                if barrier.wait().is_leader() {
                    end_bits.store(clock.now().to_bits(), Ordering::Relaxed);
                }

                if pin {
                    affinity::unpin();
                }
            });
        }
    });

    f64::from_bits(end_bits.load(Ordering::Relaxed))
        - f64::from_bits(start_bits.load(Ordering::Relaxed))
}
