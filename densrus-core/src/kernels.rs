//! Contiguous f64 primitives shared by the BLAS and LAPACK crates.
//!
//! These operate on unit-stride slices only; strided callers either walk
//! indices themselves or copy into a contiguous buffer first. Loops are
//! unrolled by four with independent accumulators so the compiler can keep
//! several FMA chains in flight without `portable_simd`.

/// Register tile rows for the DGEMM microkernel.
pub const DGEMM_MR: usize = 4;
/// Register tile columns for the DGEMM microkernel.
pub const DGEMM_NR: usize = 8;
/// Depth of a packed panel (fits L1 with one MR and one NR strip).
pub const DGEMM_KC: usize = 256;
/// Rows of A packed per L2 block.
pub const DGEMM_MC: usize = 96;
/// Columns of B packed per L3 block.
pub const DGEMM_NC: usize = 2048;

const UNROLL: usize = 4;

/// Dot product of two equal-length slices.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    let len = a.len();
    let chunks = len / UNROLL;

    let mut acc0 = 0.0;
    let mut acc1 = 0.0;
    let mut acc2 = 0.0;
    let mut acc3 = 0.0;
    for i in 0..chunks {
        let base = i * UNROLL;
        acc0 += a[base] * b[base];
        acc1 += a[base + 1] * b[base + 1];
        acc2 += a[base + 2] * b[base + 2];
        acc3 += a[base + 3] * b[base + 3];
    }

    let mut sum = (acc0 + acc1) + (acc2 + acc3);
    for i in (chunks * UNROLL)..len {
        sum += a[i] * b[i];
    }
    sum
}

/// y += alpha * x on equal-length slices.
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    assert_eq!(x.len(), y.len());
    let len = x.len();
    let chunks = len / UNROLL;

    for i in 0..chunks {
        let base = i * UNROLL;
        y[base] += alpha * x[base];
        y[base + 1] += alpha * x[base + 1];
        y[base + 2] += alpha * x[base + 2];
        y[base + 3] += alpha * x[base + 3];
    }
    for i in (chunks * UNROLL)..len {
        y[i] += alpha * x[i];
    }
}

/// x *= alpha. Does not special-case zero; callers that need an
/// overwrite (NaN-clearing) semantic must fill instead.
#[inline]
pub fn scal(alpha: f64, x: &mut [f64]) {
    for v in x.iter_mut() {
        *v *= alpha;
    }
}

/// Sum of absolute values.
#[inline]
pub fn asum(x: &[f64]) -> f64 {
    let len = x.len();
    let chunks = len / UNROLL;

    let mut acc0 = 0.0;
    let mut acc1 = 0.0;
    let mut acc2 = 0.0;
    let mut acc3 = 0.0;
    for i in 0..chunks {
        let base = i * UNROLL;
        acc0 += x[base].abs();
        acc1 += x[base + 1].abs();
        acc2 += x[base + 2].abs();
        acc3 += x[base + 3].abs();
    }

    let mut sum = (acc0 + acc1) + (acc2 + acc3);
    for v in &x[chunks * UNROLL..] {
        sum += v.abs();
    }
    sum
}

/// Scaled sum of squares update: returns `(scale, ssq)` such that
/// `scale^2 * ssq = scale_in^2 * ssq_in + sum(x_i^2)`.
///
/// Never squares a value larger than `scale`, so it cannot overflow.
#[inline]
pub fn sum_squares(x: &[f64], mut scale: f64, mut ssq: f64) -> (f64, f64) {
    for &v in x {
        if v == 0.0 {
            continue;
        }
        let absxi = v.abs();
        if absxi.is_nan() {
            return (f64::NAN, f64::NAN);
        }
        if scale < absxi {
            let r = scale / absxi;
            ssq = 1.0 + ssq * r * r;
            scale = absxi;
        } else {
            let r = absxi / scale;
            ssq += r * r;
        }
    }
    (scale, ssq)
}
