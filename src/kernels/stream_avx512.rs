//! AVX-512 sequential kernel bodies using non-temporal stores.
//!
//! Writes that stream through the full working set evict useful cache lines
//! for data that will not be re-read; `_mm512_stream_pd` bypasses the cache
//! allocation. The vectors are 64-byte aligned and processed from element 0,
//! so every 8-lane chunk is stream-store eligible; the sub-8 tail falls back
//! to the scalar bodies. The sum reduction has no store stream and keeps its
//! scalar form.

use core::arch::x86_64::{
    _mm512_add_pd, _mm512_load_pd, _mm512_mul_pd, _mm512_set1_pd, _mm512_stream_pd, _mm_sfence,
};
use std::hint::black_box;

use super::{seq, KernelId, SimdPolicy};
use crate::allocate::Vectors;
use crate::timing::WallClock;

const LANES: usize = 8;

pub(super) fn run(
    id: KernelId,
    clock: &WallClock,
    vectors: &mut Vectors,
    scalar: f64,
    n: usize,
    iter: usize,
) -> f64 {
    if id == KernelId::Sum {
        return seq::run(SimdPolicy::Scalar, id, clock, vectors, scalar, n, iter);
    }

    let Vectors { a, b, c, d } = vectors;
    let (a, b, c, d) = (&mut a[..n], &mut b[..n], &mut c[..n], &mut d[..n]);

    match id {
        KernelId::Init => timed(clock, iter, || {
            unsafe { stream_fill(b, scalar) };
            black_box(b.last());
        }),
        KernelId::Copy => timed(clock, iter, || {
            unsafe { stream_copy(c, a) };
            black_box(c.last());
        }),
        KernelId::Update => timed(clock, iter, || {
            unsafe { stream_update(a, scalar) };
            black_box(a.last());
        }),
        KernelId::Triad => timed(clock, iter, || {
            unsafe { stream_triad(a, b, c, scalar) };
            black_box(a.last());
        }),
        KernelId::Daxpy => timed(clock, iter, || {
            unsafe { stream_daxpy(a, b, scalar) };
            black_box(a.last());
        }),
        KernelId::Striad => timed(clock, iter, || {
            unsafe { stream_striad(a, b, c, d) };
            black_box(a.last());
        }),
        KernelId::Sdaxpy => timed(clock, iter, || {
            unsafe { stream_sdaxpy(a, b, c) };
            black_box(a.last());
        }),
        KernelId::Sum => unreachable!("sum uses the scalar body"),
    }
}

fn timed(clock: &WallClock, iter: usize, mut sweep: impl FnMut()) -> f64 {
    let start = clock.now();
    for _ in 0..iter {
        sweep();
        // Drain the store buffers before the next sweep (or the final
        // timestamp) so streamed writes are actually on their way to memory.
        unsafe { _mm_sfence() };
    }
    clock.now() - start
}

unsafe fn stream_fill(out: &mut [f64], scalar: f64) {
    let vs = _mm512_set1_pd(scalar);
    let mut chunks = out.chunks_exact_mut(LANES);
    for chunk in &mut chunks {
        _mm512_stream_pd(chunk.as_mut_ptr(), vs);
    }
    super::sweep_init(chunks.into_remainder(), scalar);
}

unsafe fn stream_copy(dst: &mut [f64], src: &[f64]) {
    let mut chunks = dst.chunks_exact_mut(LANES);
    let mut src_chunks = src.chunks_exact(LANES);
    for (chunk, s) in (&mut chunks).zip(&mut src_chunks) {
        _mm512_stream_pd(chunk.as_mut_ptr(), _mm512_load_pd(s.as_ptr()));
    }
    super::sweep_copy(chunks.into_remainder(), src_chunks.remainder());
}

unsafe fn stream_update(a: &mut [f64], scalar: f64) {
    let vs = _mm512_set1_pd(scalar);
    let mut chunks = a.chunks_exact_mut(LANES);
    for chunk in &mut chunks {
        let prod = _mm512_mul_pd(_mm512_load_pd(chunk.as_ptr()), vs);
        _mm512_stream_pd(chunk.as_mut_ptr(), prod);
    }
    super::sweep_update(chunks.into_remainder(), scalar);
}

unsafe fn stream_triad(a: &mut [f64], b: &[f64], c: &[f64], scalar: f64) {
    let vs = _mm512_set1_pd(scalar);
    let mut chunks = a.chunks_exact_mut(LANES);
    let mut bch = b.chunks_exact(LANES);
    let mut cch = c.chunks_exact(LANES);
    for ((chunk, bs), cs) in (&mut chunks).zip(&mut bch).zip(&mut cch) {
        let sum = _mm512_add_pd(
            _mm512_load_pd(bs.as_ptr()),
            _mm512_mul_pd(vs, _mm512_load_pd(cs.as_ptr())),
        );
        _mm512_stream_pd(chunk.as_mut_ptr(), sum);
    }
    super::sweep_triad(chunks.into_remainder(), bch.remainder(), cch.remainder(), scalar);
}

unsafe fn stream_daxpy(a: &mut [f64], b: &[f64], scalar: f64) {
    let vs = _mm512_set1_pd(scalar);
    let mut chunks = a.chunks_exact_mut(LANES);
    let mut bch = b.chunks_exact(LANES);
    for (chunk, bs) in (&mut chunks).zip(&mut bch) {
        let sum = _mm512_add_pd(
            _mm512_load_pd(chunk.as_ptr()),
            _mm512_mul_pd(vs, _mm512_load_pd(bs.as_ptr())),
        );
        _mm512_stream_pd(chunk.as_mut_ptr(), sum);
    }
    super::sweep_daxpy(chunks.into_remainder(), bch.remainder(), scalar);
}

unsafe fn stream_striad(a: &mut [f64], b: &[f64], c: &[f64], d: &[f64]) {
    let mut chunks = a.chunks_exact_mut(LANES);
    let mut bch = b.chunks_exact(LANES);
    let mut cch = c.chunks_exact(LANES);
    let mut dch = d.chunks_exact(LANES);
    for (((chunk, bs), cs), ds) in (&mut chunks).zip(&mut bch).zip(&mut cch).zip(&mut dch) {
        let sum = _mm512_add_pd(
            _mm512_load_pd(bs.as_ptr()),
            _mm512_mul_pd(_mm512_load_pd(ds.as_ptr()), _mm512_load_pd(cs.as_ptr())),
        );
        _mm512_stream_pd(chunk.as_mut_ptr(), sum);
    }
    super::sweep_striad(
        chunks.into_remainder(),
        bch.remainder(),
        cch.remainder(),
        dch.remainder(),
    );
}

unsafe fn stream_sdaxpy(a: &mut [f64], b: &[f64], c: &[f64]) {
    let mut chunks = a.chunks_exact_mut(LANES);
    let mut bch = b.chunks_exact(LANES);
    let mut cch = c.chunks_exact(LANES);
    for ((chunk, bs), cs) in (&mut chunks).zip(&mut bch).zip(&mut cch) {
        let sum = _mm512_add_pd(
            _mm512_load_pd(chunk.as_ptr()),
            _mm512_mul_pd(_mm512_load_pd(bs.as_ptr()), _mm512_load_pd(cs.as_ptr())),
        );
        _mm512_stream_pd(chunk.as_mut_ptr(), sum);
    }
    super::sweep_sdaxpy(chunks.into_remainder(), bch.remainder(), cch.remainder());
}
