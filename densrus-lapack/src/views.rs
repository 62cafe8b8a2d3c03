//! Copies between matrix columns and contiguous vectors.
//!
//! A column of a row-major matrix is interleaved with every other column,
//! so it cannot be borrowed mutably while the rest of the matrix is read.
//! Routines that need both copy the column out, work on the copy, and write
//! it back.

use crate::Blas64;

/// Rows `r0..r0+len` of column `j`.
pub(crate) fn column(a: &[f64], lda: usize, r0: usize, len: usize, j: usize) -> Vec<f64> {
    (0..len).map(|k| a[(r0 + k) * lda + j]).collect()
}

/// Store `v` into rows `r0..r0+v.len()` of column `j`.
pub(crate) fn set_column(a: &mut [f64], lda: usize, r0: usize, j: usize, v: &[f64]) {
    for (k, &x) in v.iter().enumerate() {
        a[(r0 + k) * lda + j] = x;
    }
}

/// Copy of the `rows x cols` block at (r0, c0), packed with leading dimension `cols`.
pub(crate) fn block(a: &[f64], lda: usize, r0: usize, c0: usize, rows: usize, cols: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(rows * cols);
    for i in 0..rows {
        let start = (r0 + i) * lda + c0;
        out.extend_from_slice(&a[start..start + cols]);
    }
    out
}

/// Apply the plane rotation `(c, s)` to rows `p < q` of A over columns
/// `c0..c0+len`: `row_p := c*row_p + s*row_q`, `row_q := c*row_q - s*row_p`.
pub(crate) fn rotate_rows<B: Blas64>(
    blas: &B,
    a: &mut [f64],
    lda: usize,
    p: usize,
    q: usize,
    c0: usize,
    len: usize,
    c: f64,
    s: f64,
) {
    if len == 0 {
        return;
    }
    let (top, bottom) = a.split_at_mut(q * lda);
    blas.drot(len, &mut top[p * lda + c0..], 1, &mut bottom[c0..], 1, c, s);
}

/// The rotation of [`rotate_rows`] applied to columns `p` and `q` over rows
/// `r0..r0+len`.
pub(crate) fn rotate_columns(a: &mut [f64], lda: usize, r0: usize, len: usize, p: usize, q: usize, c: f64, s: f64) {
    for row in a[r0 * lda..].chunks_mut(lda).take(len) {
        let (x, y) = (row[p], row[q]);
        row[p] = c * x + s * y;
        row[q] = c * y - s * x;
    }
}
