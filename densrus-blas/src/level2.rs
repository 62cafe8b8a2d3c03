//! BLAS Level 2: Matrix-vector operations.
//!
//! Matrices are row-major with leading dimension `lda >= max(1, cols)`.
//! Row-contiguous inner loops use `kernels::dot` / `kernels::axpy`; strided
//! vectors are gathered into contiguous buffers first and scattered back.

use densrus_core::kernels;
use densrus_core::{first_index, matrix_len, require, vector_len, Diag, Precondition, Transpose, Uplo};

use crate::level1::at;

// ============================================================================
// Gather helpers: copy strided data into contiguous buffers in logical order
// ============================================================================

#[inline]
pub(crate) fn gather(n: usize, x: &[f64], inc: isize) -> Vec<f64> {
    let start = first_index(n, inc);
    (0..n).map(|i| x[at(start, i, inc)]).collect()
}

#[inline]
pub(crate) fn scatter(buf: &[f64], x: &mut [f64], inc: isize) {
    let start = first_index(buf.len(), inc);
    for (i, &v) in buf.iter().enumerate() {
        x[at(start, i, inc)] = v;
    }
}

/// y := beta * y, with `beta == 0` as an overwrite.
fn scale_y(len: usize, beta: f64, y: &mut [f64], incy: isize) {
    if beta == 1.0 {
        return;
    }
    let start = first_index(len, incy);
    if beta == 0.0 {
        if incy == 1 {
            y[..len].fill(0.0);
        } else {
            for i in 0..len {
                y[at(start, i, incy)] = 0.0;
            }
        }
    } else if incy == 1 {
        kernels::scal(beta, &mut y[..len]);
    } else {
        for i in 0..len {
            y[at(start, i, incy)] *= beta;
        }
    }
}

fn check_vectors(len_x: usize, x: &[f64], incx: isize, len_y: usize, y_len: usize, incy: isize) {
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    require!(x.len() >= vector_len(len_x, incx), Precondition::ShortX);
    require!(y_len >= vector_len(len_y, incy), Precondition::ShortY);
}

// ============================================================================
// GEMV: General matrix-vector multiply
// y := alpha * op(A) * x + beta * y
// ============================================================================

/// Double-precision GEMV: y := alpha * op(A) * x + beta * y
///
/// A is `m x n`. `beta == 0` overwrites y (existing NaN is discarded) and
/// `alpha == 0` only scales y.
pub fn dgemv(
    trans: Transpose,
    m: usize,
    n: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    x: &[f64],
    incx: isize,
    beta: f64,
    y: &mut [f64],
    incy: isize,
) {
    require!(lda >= n.max(1), Precondition::BadLdA);
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if m == 0 || n == 0 {
        return;
    }

    let (len_x, len_y) = if trans.is_trans() { (m, n) } else { (n, m) };
    require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
    check_vectors(len_x, x, incx, len_y, y.len(), incy);

    if alpha == 0.0 && beta == 1.0 {
        return;
    }
    scale_y(len_y, beta, y, incy);
    if alpha == 0.0 {
        return;
    }

    let x_buf;
    let xs: &[f64] = if incx == 1 {
        &x[..len_x]
    } else {
        x_buf = gather(len_x, x, incx);
        &x_buf
    };

    if !trans.is_trans() {
        // y[i] += alpha * dot(A_row_i, x)
        let iy = first_index(m, incy);
        for i in 0..m {
            let row = &a[i * lda..i * lda + n];
            y[at(iy, i, incy)] += alpha * kernels::dot(row, xs);
        }
        return;
    }

    // Transpose: y += alpha * x[i] * A_row_i  (axpy per row)
    if incy == 1 {
        for i in 0..m {
            let row = &a[i * lda..i * lda + n];
            kernels::axpy(alpha * xs[i], row, &mut y[..n]);
        }
    } else {
        let mut y_buf = gather(n, y, incy);
        for i in 0..m {
            let row = &a[i * lda..i * lda + n];
            kernels::axpy(alpha * xs[i], row, &mut y_buf);
        }
        scatter(&y_buf, y, incy);
    }
}

// ============================================================================
// GBMV: General band matrix-vector multiply
// ============================================================================

/// Double-precision band GEMV: y := alpha * op(A) * x + beta * y
///
/// A is `m x n` with `kl` sub-diagonals and `ku` super-diagonals, stored
/// row by row: entry (i, j) lives at `a[i * lda + j + kl - i]`.
pub fn dgbmv(
    trans: Transpose,
    m: usize,
    n: usize,
    kl: usize,
    ku: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    x: &[f64],
    incx: isize,
    beta: f64,
    y: &mut [f64],
    incy: isize,
) {
    require!(lda >= kl + ku + 1, Precondition::BadLdA);
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if m == 0 || n == 0 {
        return;
    }

    let (len_x, len_y) = if trans.is_trans() { (m, n) } else { (n, m) };
    let band_rows = m.min(n + kl);
    require!(
        a.len() >= lda * (band_rows - 1) + kl + ku + 1,
        Precondition::ShortA
    );
    check_vectors(len_x, x, incx, len_y, y.len(), incy);

    if alpha == 0.0 && beta == 1.0 {
        return;
    }
    scale_y(len_y, beta, y, incy);
    if alpha == 0.0 {
        return;
    }

    let xs = gather(len_x, x, incx);
    let iy = first_index(len_y, incy);
    for i in 0..band_rows {
        let j_lo = i.saturating_sub(kl);
        let j_hi = n.min(i + ku + 1);
        if j_lo >= j_hi {
            continue;
        }
        let off = i * lda + kl - i;
        let band = &a[off + j_lo..off + j_hi];
        if !trans.is_trans() {
            y[at(iy, i, incy)] += alpha * kernels::dot(band, &xs[j_lo..j_hi]);
        } else {
            let tmp = alpha * xs[i];
            for (k, &aij) in band.iter().enumerate() {
                y[at(iy, j_lo + k, incy)] += tmp * aij;
            }
        }
    }
}

// ============================================================================
// GER: Rank-1 update  A := alpha * x * y^T + A
// ============================================================================

/// Double-precision rank-1 update: A := alpha * x * y^T + A
pub fn dger(
    m: usize,
    n: usize,
    alpha: f64,
    x: &[f64],
    incx: isize,
    y: &[f64],
    incy: isize,
    a: &mut [f64],
    lda: usize,
) {
    require!(lda >= n.max(1), Precondition::BadLdA);
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if m == 0 || n == 0 {
        return;
    }
    check_vectors(m, x, incx, n, y.len(), incy);
    require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
    if alpha == 0.0 {
        return;
    }

    let ys = gather(n, y, incy);
    let ix = first_index(m, incx);
    for i in 0..m {
        let tmp = alpha * x[at(ix, i, incx)];
        if tmp != 0.0 {
            kernels::axpy(tmp, &ys, &mut a[i * lda..i * lda + n]);
        }
    }
}

// ============================================================================
// SYMV: Symmetric matrix-vector multiply
// ============================================================================

/// Double-precision SYMV: y := alpha * A * x + beta * y
///
/// Only the `uplo` triangle of A is read.
pub fn dsymv(
    uplo: Uplo,
    n: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    x: &[f64],
    incx: isize,
    beta: f64,
    y: &mut [f64],
    incy: isize,
) {
    require!(lda >= n.max(1), Precondition::BadLdA);
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if n == 0 {
        return;
    }
    require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
    check_vectors(n, x, incx, n, y.len(), incy);

    if alpha == 0.0 && beta == 1.0 {
        return;
    }
    scale_y(n, beta, y, incy);
    if alpha == 0.0 {
        return;
    }

    let xs = gather(n, x, incx);
    let mut acc = vec![0.0; n];
    for i in 0..n {
        let row = &a[i * lda..i * lda + n];
        acc[i] += row[i] * xs[i];
        match uplo {
            Uplo::Upper => {
                // Row i holds A(i, i+1..n); the mirrored column feeds y[i+1..].
                acc[i] += kernels::dot(&row[i + 1..], &xs[i + 1..]);
                kernels::axpy(xs[i], &row[i + 1..], &mut acc[i + 1..]);
            }
            _ => {
                acc[i] += kernels::dot(&row[..i], &xs[..i]);
                kernels::axpy(xs[i], &row[..i], &mut acc[..i]);
            }
        }
    }
    let iy = first_index(n, incy);
    for i in 0..n {
        y[at(iy, i, incy)] += alpha * acc[i];
    }
}

// ============================================================================
// SYR / SYR2: Symmetric rank-1 and rank-2 updates
// ============================================================================

/// Double-precision symmetric rank-1 update: A := alpha * x * x^T + A
pub fn dsyr(uplo: Uplo, n: usize, alpha: f64, x: &[f64], incx: isize, a: &mut [f64], lda: usize) {
    require!(lda >= n.max(1), Precondition::BadLdA);
    require!(incx != 0, Precondition::ZeroIncX);
    if n == 0 {
        return;
    }
    require!(x.len() >= vector_len(n, incx), Precondition::ShortX);
    require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
    if alpha == 0.0 {
        return;
    }

    let xs = gather(n, x, incx);
    for i in 0..n {
        let tmp = alpha * xs[i];
        if tmp == 0.0 {
            continue;
        }
        let (lo, hi) = match uplo {
            Uplo::Upper => (i, n),
            _ => (0, i + 1),
        };
        kernels::axpy(tmp, &xs[lo..hi], &mut a[i * lda + lo..i * lda + hi]);
    }
}

/// Double-precision symmetric rank-2 update: A := alpha * x * y^T + alpha * y * x^T + A
pub fn dsyr2(
    uplo: Uplo,
    n: usize,
    alpha: f64,
    x: &[f64],
    incx: isize,
    y: &[f64],
    incy: isize,
    a: &mut [f64],
    lda: usize,
) {
    require!(lda >= n.max(1), Precondition::BadLdA);
    require!(incx != 0, Precondition::ZeroIncX);
    require!(incy != 0, Precondition::ZeroIncY);
    if n == 0 {
        return;
    }
    check_vectors(n, x, incx, n, y.len(), incy);
    require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
    if alpha == 0.0 {
        return;
    }

    let xs = gather(n, x, incx);
    let ys = gather(n, y, incy);
    for i in 0..n {
        let (lo, hi) = match uplo {
            Uplo::Upper => (i, n),
            _ => (0, i + 1),
        };
        let row = &mut a[i * lda + lo..i * lda + hi];
        kernels::axpy(alpha * xs[i], &ys[lo..hi], row);
        kernels::axpy(alpha * ys[i], &xs[lo..hi], row);
    }
}

// ============================================================================
// TRMV: Triangular matrix-vector multiply  x := op(A) * x
// ============================================================================

/// Double-precision TRMV: x := op(A) * x for triangular A.
pub fn dtrmv(
    uplo: Uplo,
    trans: Transpose,
    diag: Diag,
    n: usize,
    a: &[f64],
    lda: usize,
    x: &mut [f64],
    incx: isize,
) {
    require!(lda >= n.max(1), Precondition::BadLdA);
    require!(incx != 0, Precondition::ZeroIncX);
    if n == 0 {
        return;
    }
    require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
    require!(x.len() >= vector_len(n, incx), Precondition::ShortX);

    let nonunit = diag == Diag::NonUnit;
    let mut xs = gather(n, x, incx);
    match (uplo, trans.is_trans()) {
        (Uplo::Upper, false) => {
            for i in 0..n {
                let row = &a[i * lda..i * lda + n];
                let d = if nonunit { row[i] * xs[i] } else { xs[i] };
                xs[i] = d + kernels::dot(&row[i + 1..], &xs[i + 1..]);
            }
        }
        (Uplo::Lower, false) => {
            for i in (0..n).rev() {
                let row = &a[i * lda..i * lda + n];
                let d = if nonunit { row[i] * xs[i] } else { xs[i] };
                xs[i] = d + kernels::dot(&row[..i], &xs[..i]);
            }
        }
        (Uplo::Upper, true) => {
            for i in (0..n).rev() {
                let row = &a[i * lda..i * lda + n];
                let xi = xs[i];
                if nonunit {
                    xs[i] *= row[i];
                }
                kernels::axpy(xi, &row[i + 1..], &mut xs[i + 1..]);
            }
        }
        (Uplo::Lower, true) => {
            for i in 0..n {
                let row = &a[i * lda..i * lda + n];
                let xi = xs[i];
                if nonunit {
                    xs[i] *= row[i];
                }
                kernels::axpy(xi, &row[..i], &mut xs[..i]);
            }
        }
    }
    scatter(&xs, x, incx);
}

// ============================================================================
// TRSV: Triangular solve  op(A) * x = b
// ============================================================================

/// Double-precision TRSV: solve op(A) * x = b, with b overwritten by x.
///
/// No singularity test is performed; a zero diagonal yields Inf/NaN.
pub fn dtrsv(
    uplo: Uplo,
    trans: Transpose,
    diag: Diag,
    n: usize,
    a: &[f64],
    lda: usize,
    x: &mut [f64],
    incx: isize,
) {
    require!(lda >= n.max(1), Precondition::BadLdA);
    require!(incx != 0, Precondition::ZeroIncX);
    if n == 0 {
        return;
    }
    require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
    require!(x.len() >= vector_len(n, incx), Precondition::ShortX);

    let nonunit = diag == Diag::NonUnit;
    let mut xs = gather(n, x, incx);
    match (uplo, trans.is_trans()) {
        (Uplo::Upper, false) => {
            // Back substitution on rows.
            for i in (0..n).rev() {
                let row = &a[i * lda..i * lda + n];
                let mut v = xs[i] - kernels::dot(&row[i + 1..], &xs[i + 1..]);
                if nonunit {
                    v /= row[i];
                }
                xs[i] = v;
            }
        }
        (Uplo::Lower, false) => {
            for i in 0..n {
                let row = &a[i * lda..i * lda + n];
                let mut v = xs[i] - kernels::dot(&row[..i], &xs[..i]);
                if nonunit {
                    v /= row[i];
                }
                xs[i] = v;
            }
        }
        (Uplo::Upper, true) => {
            // A^T is lower: resolve x[i], then eliminate it from later entries.
            for i in 0..n {
                let row = &a[i * lda..i * lda + n];
                if nonunit {
                    xs[i] /= row[i];
                }
                let xi = xs[i];
                kernels::axpy(-xi, &row[i + 1..], &mut xs[i + 1..]);
            }
        }
        (Uplo::Lower, true) => {
            for i in (0..n).rev() {
                let row = &a[i * lda..i * lda + n];
                if nonunit {
                    xs[i] /= row[i];
                }
                let xi = xs[i];
                kernels::axpy(-xi, &row[..i], &mut xs[..i]);
            }
        }
    }
    scatter(&xs, x, incx);
}
