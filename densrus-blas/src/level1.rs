//! BLAS Level 1: Vector-vector operations.
//!
//! Vectors are `(n, buffer, inc)` views. Increments are signed: a negative
//! increment walks the buffer from its far end, so logical element `i` of
//! `x` lives at `first_index(n, incx) + i * incx`. Unit-stride calls go
//! through the unrolled contiguous kernels in `densrus_core::kernels`.

use densrus_core::kernels;
use densrus_core::{first_index, require, vector_len, Precondition};

#[inline(always)]
fn check_x(n: usize, x_len: usize, incx: isize) {
    require!(incx != 0, Precondition::ZeroIncX);
    require!(x_len >= vector_len(n, incx), Precondition::ShortX);
}

#[inline(always)]
fn check_y(n: usize, y_len: usize, incy: isize) {
    require!(incy != 0, Precondition::ZeroIncY);
    require!(y_len >= vector_len(n, incy), Precondition::ShortY);
}

/// Buffer offset of logical element `i` in a view whose element 0 is at `start`.
#[inline(always)]
pub(crate) fn at(start: usize, i: usize, inc: isize) -> usize {
    (start as isize + i as isize * inc) as usize
}

// ============================================================================
// DOT: inner product
// ============================================================================

/// Double-precision dot product: result = x^T * y
#[inline]
pub fn ddot(n: usize, x: &[f64], incx: isize, y: &[f64], incy: isize) -> f64 {
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if n == 0 {
        return 0.0;
    }
    check_x(n, x.len(), incx);
    check_y(n, y.len(), incy);

    if incx == 1 && incy == 1 {
        return kernels::dot(&x[..n], &y[..n]);
    }
    let ix = first_index(n, incx);
    let iy = first_index(n, incy);
    let mut sum = 0.0;
    for i in 0..n {
        sum += x[at(ix, i, incx)] * y[at(iy, i, incy)];
    }
    sum
}

// ============================================================================
// NRM2 / ASUM / IAMAX: reductions
// ============================================================================

/// Euclidean norm ||x||_2, computed with a running scale so that neither
/// tiny nor huge entries underflow or overflow when squared.
///
/// The norm does not depend on traversal order, so a negative increment
/// is treated as its magnitude.
pub fn dnrm2(n: usize, x: &[f64], incx: isize) -> f64 {
    require!(incx != 0, Precondition::ZeroIncX);
    if n == 0 {
        return 0.0;
    }
    check_x(n, x.len(), incx);
    if n == 1 {
        return x[0].abs();
    }

    let step = incx.unsigned_abs();
    let (scale, ssq) = if step == 1 {
        kernels::sum_squares(&x[..n], 0.0, 1.0)
    } else {
        let mut scale = 0.0;
        let mut ssq = 1.0;
        for i in 0..n {
            (scale, ssq) = kernels::sum_squares(&x[i * step..i * step + 1], scale, ssq);
        }
        (scale, ssq)
    };
    if scale.is_infinite() {
        return f64::INFINITY;
    }
    scale * ssq.sqrt()
}

/// Sum of absolute values: sum |x_i|
pub fn dasum(n: usize, x: &[f64], incx: isize) -> f64 {
    require!(incx != 0, Precondition::ZeroIncX);
    if n == 0 {
        return 0.0;
    }
    check_x(n, x.len(), incx);
    let step = incx.unsigned_abs();
    if step == 1 {
        return kernels::asum(&x[..n]);
    }
    (0..n).map(|i| x[i * step].abs()).sum()
}

/// Index of the first element with maximum absolute value, or `None` when
/// `n == 0`. Indices are logical: 0 is the first element visited.
pub fn idamax(n: usize, x: &[f64], incx: isize) -> Option<usize> {
    require!(incx != 0, Precondition::ZeroIncX);
    if n == 0 {
        return None;
    }
    check_x(n, x.len(), incx);
    let ix = first_index(n, incx);
    let mut best = 0;
    let mut max = x[ix].abs();
    for i in 1..n {
        let v = x[at(ix, i, incx)].abs();
        if v > max {
            max = v;
            best = i;
        }
    }
    Some(best)
}

// ============================================================================
// SCAL: x = alpha * x
// ============================================================================

/// Double-precision scal: x := alpha * x
///
/// `alpha == 0` overwrites with zeros, so NaN and Inf entries are cleared
/// rather than propagated.
pub fn dscal(n: usize, alpha: f64, x: &mut [f64], incx: isize) {
    require!(incx != 0, Precondition::ZeroIncX);
    if n == 0 {
        return;
    }
    check_x(n, x.len(), incx);
    let step = incx.unsigned_abs();
    if alpha == 0.0 {
        if step == 1 {
            x[..n].fill(0.0);
        } else {
            for i in 0..n {
                x[i * step] = 0.0;
            }
        }
        return;
    }
    if step == 1 {
        kernels::scal(alpha, &mut x[..n]);
    } else {
        for i in 0..n {
            x[i * step] *= alpha;
        }
    }
}

// ============================================================================
// AXPY: y = alpha * x + y
// ============================================================================

/// Double-precision axpy: y := alpha * x + y
///
/// `alpha == 0` returns without touching `y`.
pub fn daxpy(n: usize, alpha: f64, x: &[f64], incx: isize, y: &mut [f64], incy: isize) {
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if n == 0 {
        return;
    }
    check_x(n, x.len(), incx);
    check_y(n, y.len(), incy);
    if alpha == 0.0 {
        return;
    }

    if incx == 1 && incy == 1 {
        kernels::axpy(alpha, &x[..n], &mut y[..n]);
        return;
    }
    let ix = first_index(n, incx);
    let iy = first_index(n, incy);
    for i in 0..n {
        y[at(iy, i, incy)] += alpha * x[at(ix, i, incx)];
    }
}

// ============================================================================
// COPY / SWAP
// ============================================================================

/// Double-precision copy: y := x
pub fn dcopy(n: usize, x: &[f64], incx: isize, y: &mut [f64], incy: isize) {
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if n == 0 {
        return;
    }
    check_x(n, x.len(), incx);
    check_y(n, y.len(), incy);

    if incx == 1 && incy == 1 {
        y[..n].copy_from_slice(&x[..n]);
        return;
    }
    let ix = first_index(n, incx);
    let iy = first_index(n, incy);
    for i in 0..n {
        y[at(iy, i, incy)] = x[at(ix, i, incx)];
    }
}

/// Double-precision swap: x <-> y
pub fn dswap(n: usize, x: &mut [f64], incx: isize, y: &mut [f64], incy: isize) {
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if n == 0 {
        return;
    }
    check_x(n, x.len(), incx);
    check_y(n, y.len(), incy);

    if incx == 1 && incy == 1 {
        x[..n].swap_with_slice(&mut y[..n]);
        return;
    }
    let ix = first_index(n, incx);
    let iy = first_index(n, incy);
    for i in 0..n {
        std::mem::swap(&mut x[at(ix, i, incx)], &mut y[at(iy, i, incy)]);
    }
}

// ============================================================================
// ROT: plane rotation
// ============================================================================

/// Apply a plane rotation: (x_i, y_i) := (c*x_i + s*y_i, c*y_i - s*x_i)
pub fn drot(n: usize, x: &mut [f64], incx: isize, y: &mut [f64], incy: isize, c: f64, s: f64) {
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if n == 0 {
        return;
    }
    check_x(n, x.len(), incx);
    check_y(n, y.len(), incy);

    let ix = first_index(n, incx);
    let iy = first_index(n, incy);
    for i in 0..n {
        let px = at(ix, i, incx);
        let py = at(iy, i, incy);
        let (vx, vy) = (x[px], y[py]);
        x[px] = c * vx + s * vy;
        y[py] = c * vy - s * vx;
    }
}
