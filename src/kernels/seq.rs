//! Sequential kernel drivers: one thread, timestamps straddling the
//! iteration loop.

use std::hint::black_box;

use super::{
    sweep_copy, sweep_daxpy, sweep_init, sweep_sdaxpy, sweep_striad, sweep_sum, sweep_triad,
    sweep_update, KernelId, SimdPolicy, SENTINEL_INDEX,
};
use crate::allocate::Vectors;
use crate::timing::WallClock;

pub(super) fn run(
    policy: SimdPolicy,
    id: KernelId,
    clock: &WallClock,
    vectors: &mut Vectors,
    scalar: f64,
    n: usize,
    iter: usize,
) -> f64 {
    #[cfg(all(
        feature = "streaming-stores",
        target_arch = "x86_64",
        target_feature = "avx512f"
    ))]
    {
        if policy == SimdPolicy::Avx512Streaming {
            return super::stream_avx512::run(id, clock, vectors, scalar, n, iter);
        }
    }
    let _ = policy;

    let Vectors { a, b, c, d } = vectors;
    let (a, b, c, d) = (&mut a[..n], &mut b[..n], &mut c[..n], &mut d[..n]);

    match id {
        KernelId::Init => timed(clock, iter, || {
            sweep_init(b, scalar);
            black_box(b.last());
        }),
        KernelId::Sum => {
            // The reduction result accumulates across sweeps and lands in
            // a[SENTINEL_INDEX] each sweep so the loop cannot be eliminated;
            // the caller restores that slot afterwards.
            let mut total = 0.0;
            let elapsed = timed(clock, iter, || {
                total += sweep_sum(a);
                if let Some(slot) = a.get_mut(SENTINEL_INDEX) {
                    *slot = total;
                }
            });
            black_box(total);
            elapsed
        }
        KernelId::Copy => timed(clock, iter, || {
            sweep_copy(c, a);
            black_box(c.last());
        }),
        KernelId::Update => timed(clock, iter, || {
            sweep_update(a, scalar);
            black_box(a.last());
        }),
        KernelId::Triad => timed(clock, iter, || {
            sweep_triad(a, b, c, scalar);
            black_box(a.last());
        }),
        KernelId::Daxpy => timed(clock, iter, || {
            sweep_daxpy(a, b, scalar);
            black_box(a.last());
        }),
        KernelId::Striad => timed(clock, iter, || {
            sweep_striad(a, b, c, d);
            black_box(a.last());
        }),
        KernelId::Sdaxpy => timed(clock, iter, || {
            sweep_sdaxpy(a, b, c);
            black_box(a.last());
        }),
    }
}

fn timed(clock: &WallClock, iter: usize, mut sweep: impl FnMut()) -> f64 {
    let start = clock.now();
    for _ in 0..iter {
        sweep();
    }
    clock.now() - start
}
