//! Worksharing kernel drivers.
//!
//! Every worker owns a disjoint contiguous chunk of the shared vectors; the
//! only synchronization per invocation is the barrier pair around the timed
//! body. Whichever worker comes out of a barrier as leader takes the
//! timestamp, so no thread is designated up front.

use std::hint::black_box;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Barrier;

use super::{
    sweep_copy, sweep_daxpy, sweep_init, sweep_sdaxpy, sweep_striad, sweep_sum, sweep_triad,
    sweep_update, KernelId, Threading, SENTINEL_INDEX,
};
use crate::affinity;
use crate::allocate::Vectors;
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
    let requested = threading.threads.max(1).min(n.max(1));
    let chunk = n.div_ceil(requested).max(1);
    let workers = n.div_ceil(chunk).max(1);

    let barrier = Barrier::new(workers);
    let start_bits = AtomicU64::new(0);
    let end_bits = AtomicU64::new(0);
    let mut partials = vec![0.0f64; workers];
    let pin = threading.pin;

    let Vectors { a, b, c, d } = vectors;
    let (a, b, c, d) = (&mut a[..n], &mut b[..n], &mut c[..n], &mut d[..n]);

    std::thread::scope(|scope| {
        for (tid, ((((ac, bc), cc), dc), partial)) in a
            .chunks_mut(chunk)
            .zip(b.chunks_mut(chunk))
            .zip(c.chunks_mut(chunk))
            .zip(d.chunks_mut(chunk))
            .zip(partials.iter_mut())
            .enumerate()
        {
            let barrier = &barrier;
            let start_bits = &start_bits;
            let end_bits = &end_bits;
            let clock = *clock;

            scope.spawn(move || {
                if pin {
                    affinity::pin_to(tid);
                }

                if barrier.wait().is_leader() {
                    start_bits.store(clock.now().to_bits(), Ordering::Relaxed);
                }
                barrier.wait();

                let mut local = 0.0;
                for _ in 0..iter {
                    match id {
                        KernelId::Init => sweep_init(bc, scalar),
                        KernelId::Sum => local += sweep_sum(ac),
                        KernelId::Copy => sweep_copy(cc, ac),
                        KernelId::Update => sweep_update(ac, scalar),
                        KernelId::Triad => sweep_triad(ac, bc, cc, scalar),
                        KernelId::Daxpy => sweep_daxpy(ac, bc, scalar),
                        KernelId::Striad => sweep_striad(ac, bc, cc, dc),
                        KernelId::Sdaxpy => sweep_sdaxpy(ac, bc, cc),
                    }
                    let probe = match id {
                        KernelId::Init => bc.last(),
                        KernelId::Copy => cc.last(),
                        KernelId::Sum => None,
                        _ => ac.last(),
                    };
                    black_box(probe);
                }
                *partial = local;

                if barrier.wait().is_leader() {
                    end_bits.store(clock.now().to_bits(), Ordering::Relaxed);
                }

                if pin {
                    affinity::unpin();
                }
            });
        }
    });

    if id == KernelId::Sum {
        let total: f64 = partials.iter().sum();
        if let Some(slot) = a.get_mut(SENTINEL_INDEX) {
            *slot = total;
        }
    }

    f64::from_bits(end_bits.load(Ordering::Relaxed))
        - f64::from_bits(start_bits.load(Ordering::Relaxed))
}
