//! BLAS Level 3: Matrix-matrix operations.
//!
//! The centrepiece is DGEMM, cache-blocked with the Goto algorithm: panels
//! of op(A) and op(B) are packed into contiguous buffers sized for L2/L3,
//! and a register-tiled microkernel accumulates MR x NR blocks of C.
//! Small products skip packing and run a dot-product loop instead.
//!
//! The symmetric and triangular routines touch only the declared triangle
//! of their symmetric/triangular operand and of C.

use densrus_core::kernels::{self, DGEMM_KC, DGEMM_MC, DGEMM_MR, DGEMM_NC, DGEMM_NR};
use densrus_core::{matrix_len, require, Diag, Precondition, Side, Transpose, Uplo};

/// Below this many multiply-adds DGEMM skips packing.
const DGEMM_SMALL: usize = 110_000;

/// C := beta * C over the `m x n` region, with `beta == 0` as an overwrite.
fn scale_c(m: usize, n: usize, beta: f64, c: &mut [f64], ldc: usize) {
    if beta == 1.0 {
        return;
    }
    for i in 0..m {
        let row = &mut c[i * ldc..i * ldc + n];
        if beta == 0.0 {
            row.fill(0.0);
        } else {
            kernels::scal(beta, row);
        }
    }
}

/// Column range of row `i` that lies in the `uplo` triangle of an `n x n` matrix.
#[inline(always)]
fn tri_cols(uplo: Uplo, i: usize, n: usize) -> (usize, usize) {
    match uplo {
        Uplo::Upper => (i, n),
        _ => (0, i + 1),
    }
}

/// beta-scale only the `uplo` triangle of C.
fn scale_triangle(uplo: Uplo, n: usize, beta: f64, c: &mut [f64], ldc: usize) {
    if beta == 1.0 {
        return;
    }
    for i in 0..n {
        let (lo, hi) = tri_cols(uplo, i, n);
        let row = &mut c[i * ldc + lo..i * ldc + hi];
        if beta == 0.0 {
            row.fill(0.0);
        } else {
            kernels::scal(beta, row);
        }
    }
}

// ============================================================================
// DGEMM: Double-precision General Matrix Multiply
// C := alpha * op(A) * op(B) + beta * C
// ============================================================================

/// Double-precision GEMM: C := alpha * op(A) * op(B) + beta * C
///
/// op(A) is `m x k`, op(B) is `k x n`, C is `m x n`. A leading dimension
/// smaller than the stored column count, or a buffer too short for the
/// declared shape, is a precondition violation.
pub fn dgemm(
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &[f64],
    ldb: usize,
    beta: f64,
    c: &mut [f64],
    ldc: usize,
) {
    let (a_rows, a_cols) = if trans_a.is_trans() { (k, m) } else { (m, k) };
    let (b_rows, b_cols) = if trans_b.is_trans() { (n, k) } else { (k, n) };
    require!(lda >= a_cols.max(1), Precondition::BadLdA);
    require!(ldb >= b_cols.max(1), Precondition::BadLdB);
    require!(ldc >= n.max(1), Precondition::BadLdC);
    if m == 0 || n == 0 {
        return;
    }
    require!(a.len() >= matrix_len(a_rows, a_cols, lda), Precondition::ShortA);
    require!(b.len() >= matrix_len(b_rows, b_cols, ldb), Precondition::ShortB);
    require!(c.len() >= matrix_len(m, n, ldc), Precondition::ShortC);

    if (alpha == 0.0 || k == 0) && beta == 1.0 {
        return;
    }
    scale_c(m, n, beta, c, ldc);
    if alpha == 0.0 || k == 0 {
        return;
    }

    if m * n * k < DGEMM_SMALL {
        dgemm_simple(trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, c, ldc);
    } else {
        dgemm_blocked(trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, c, ldc);
    }
}

/// Small-matrix DGEMM with contiguous dot products.
fn dgemm_simple(
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &[f64],
    ldb: usize,
    c: &mut [f64],
    ldc: usize,
) {
    // Pre-gather op(B) columns into contiguous layout
    let mut b_cols = vec![0.0f64; n * k];
    for j in 0..n {
        for p in 0..k {
            b_cols[j * k + p] = if trans_b.is_trans() { b[j * ldb + p] } else { b[p * ldb + j] };
        }
    }

    let mut a_row = vec![0.0f64; k];
    for i in 0..m {
        let row: &[f64] = if trans_a.is_trans() {
            for p in 0..k {
                a_row[p] = a[p * lda + i];
            }
            &a_row
        } else {
            &a[i * lda..i * lda + k]
        };
        for j in 0..n {
            c[i * ldc + j] += alpha * kernels::dot(row, &b_cols[j * k..(j + 1) * k]);
        }
    }
}

/// Cache-blocked DGEMM using the Goto algorithm with an MR x NR microkernel.
fn dgemm_blocked(
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &[f64],
    ldb: usize,
    c: &mut [f64],
    ldc: usize,
) {
    let mc = DGEMM_MC.min(m);
    let nc = DGEMM_NC.min(n);
    let kc = DGEMM_KC.min(k);

    let mc_padded = mc.div_ceil(DGEMM_MR) * DGEMM_MR;
    let nc_padded = nc.div_ceil(DGEMM_NR) * DGEMM_NR;

    let mut packed_a = vec![0.0f64; mc_padded * kc];
    let mut packed_b = vec![0.0f64; kc * nc_padded];

    for jc in (0..n).step_by(nc) {
        let jb = nc.min(n - jc);
        for pc in (0..k).step_by(kc) {
            let pb = kc.min(k - pc);
            pack_b(trans_b, b, ldb, pc, jc, pb, jb, &mut packed_b);
            for ic in (0..m).step_by(mc) {
                let ib = mc.min(m - ic);
                pack_a(trans_a, a, lda, ic, pc, ib, pb, &mut packed_a);
                macrokernel(alpha, &packed_a, &packed_b, c, ldc, ic, jc, ib, jb, pb);
            }
        }
    }
}

/// Pack an `rows x cols` block of op(A) into MR-row strips.
fn pack_a(
    trans: Transpose,
    a: &[f64],
    lda: usize,
    row_start: usize,
    col_start: usize,
    rows: usize,
    cols: usize,
    packed: &mut [f64],
) {
    let mut idx = 0;
    for i_block in (0..rows).step_by(DGEMM_MR) {
        let mr = DGEMM_MR.min(rows - i_block);
        for p in 0..cols {
            for ir in 0..DGEMM_MR {
                packed[idx] = if ir < mr {
                    let i = row_start + i_block + ir;
                    let j = col_start + p;
                    if trans.is_trans() {
                        a[j * lda + i]
                    } else {
                        a[i * lda + j]
                    }
                } else {
                    0.0
                };
                idx += 1;
            }
        }
    }
}

/// Pack a `rows x cols` block of op(B) into NR-column strips.
fn pack_b(
    trans: Transpose,
    b: &[f64],
    ldb: usize,
    row_start: usize,
    col_start: usize,
    rows: usize,
    cols: usize,
    packed: &mut [f64],
) {
    let mut idx = 0;
    for j_block in (0..cols).step_by(DGEMM_NR) {
        let nr = DGEMM_NR.min(cols - j_block);
        for p in 0..rows {
            for jr in 0..DGEMM_NR {
                packed[idx] = if jr < nr {
                    let i = row_start + p;
                    let j = col_start + j_block + jr;
                    if trans.is_trans() {
                        b[j * ldb + i]
                    } else {
                        b[i * ldb + j]
                    }
                } else {
                    0.0
                };
                idx += 1;
            }
        }
    }
}

/// Dispatch microkernels over one packed block.
fn macrokernel(
    alpha: f64,
    packed_a: &[f64],
    packed_b: &[f64],
    c: &mut [f64],
    ldc: usize,
    ic: usize,
    jc: usize,
    mb: usize,
    nb: usize,
    kb: usize,
) {
    let mr_blocks = mb.div_ceil(DGEMM_MR);
    let nr_blocks = nb.div_ceil(DGEMM_NR);

    for jr in 0..nr_blocks {
        let nr = DGEMM_NR.min(nb - jr * DGEMM_NR);
        for ir in 0..mr_blocks {
            let mr = DGEMM_MR.min(mb - ir * DGEMM_MR);
            microkernel(
                alpha,
                &packed_a[ir * DGEMM_MR * kb..],
                &packed_b[jr * DGEMM_NR * kb..],
                c,
                ldc,
                ic + ir * DGEMM_MR,
                jc + jr * DGEMM_NR,
                mr,
                nr,
                kb,
            );
        }
    }
}

/// MR x NR register tile. Padding lanes of the packed panels are zero, so
/// the accumulation always runs full width; only the store is clipped.
#[inline(always)]
fn microkernel(
    alpha: f64,
    packed_a: &[f64],
    packed_b: &[f64],
    c: &mut [f64],
    ldc: usize,
    row: usize,
    col: usize,
    mr: usize,
    nr: usize,
    kb: usize,
) {
    let mut acc = [[0.0f64; DGEMM_NR]; DGEMM_MR];
    for p in 0..kb {
        let bp = &packed_b[p * DGEMM_NR..(p + 1) * DGEMM_NR];
        let ap = &packed_a[p * DGEMM_MR..(p + 1) * DGEMM_MR];
        for ir in 0..DGEMM_MR {
            let av = ap[ir];
            for jr in 0..DGEMM_NR {
                acc[ir][jr] += av * bp[jr];
            }
        }
    }

    for ir in 0..mr {
        let base = (row + ir) * ldc + col;
        for jr in 0..nr {
            c[base + jr] += alpha * acc[ir][jr];
        }
    }
}

// ============================================================================
// DSYMM: Symmetric matrix multiply
// C := alpha * A * B + beta * C  (Left)  or  alpha * B * A + beta * C  (Right)
// ============================================================================

/// Double-precision SYMM. A is symmetric and only its `uplo` triangle is read;
/// the other half is mirrored on the fly.
pub fn dsymm(
    side: Side,
    uplo: Uplo,
    m: usize,
    n: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &[f64],
    ldb: usize,
    beta: f64,
    c: &mut [f64],
    ldc: usize,
) {
    let na = if side == Side::Left { m } else { n };
    require!(lda >= na.max(1), Precondition::BadLdA);
    require!(ldb >= n.max(1), Precondition::BadLdB);
    require!(ldc >= n.max(1), Precondition::BadLdC);
    if m == 0 || n == 0 {
        return;
    }
    require!(a.len() >= matrix_len(na, na, lda), Precondition::ShortA);
    require!(b.len() >= matrix_len(m, n, ldb), Precondition::ShortB);
    require!(c.len() >= matrix_len(m, n, ldc), Precondition::ShortC);

    if alpha == 0.0 && beta == 1.0 {
        return;
    }
    scale_c(m, n, beta, c, ldc);
    if alpha == 0.0 {
        return;
    }

    let sym = |i: usize, j: usize| -> f64 {
        let stored = match uplo {
            Uplo::Upper => i <= j,
            _ => i >= j,
        };
        if stored {
            a[i * lda + j]
        } else {
            a[j * lda + i]
        }
    };

    match side {
        Side::Left => {
            // C_i += alpha * sum_l A(i, l) * B_l, row-wise axpy.
            for i in 0..m {
                for l in 0..m {
                    let t = alpha * sym(i, l);
                    if t != 0.0 {
                        kernels::axpy(t, &b[l * ldb..l * ldb + n], &mut c[i * ldc..i * ldc + n]);
                    }
                }
            }
        }
        Side::Right => {
            // C_i += alpha * sum_l B(i, l) * A_l, with A_l expanded once per l.
            let mut a_row = vec![0.0; n];
            for l in 0..n {
                for (j, v) in a_row.iter_mut().enumerate() {
                    *v = sym(l, j);
                }
                for i in 0..m {
                    let t = alpha * b[i * ldb + l];
                    if t != 0.0 {
                        kernels::axpy(t, &a_row, &mut c[i * ldc..i * ldc + n]);
                    }
                }
            }
        }
    }
}

// ============================================================================
// DSYRK: Symmetric rank-k update
// C := alpha * op(A) * op(A)^T + beta * C
// ============================================================================

/// Double-precision SYRK. With `NoTrans`, A is `n x k` and C gets `A * A^T`;
/// with `Trans`, A is `k x n` and C gets `A^T * A`. Only the `uplo`
/// triangle of C is read or written.
pub fn dsyrk(
    uplo: Uplo,
    trans: Transpose,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    beta: f64,
    c: &mut [f64],
    ldc: usize,
) {
    let (a_rows, a_cols) = if trans.is_trans() { (k, n) } else { (n, k) };
    require!(lda >= a_cols.max(1), Precondition::BadLdA);
    require!(ldc >= n.max(1), Precondition::BadLdC);
    if n == 0 {
        return;
    }
    require!(a.len() >= matrix_len(a_rows, a_cols, lda), Precondition::ShortA);
    require!(c.len() >= matrix_len(n, n, ldc), Precondition::ShortC);

    if (alpha == 0.0 || k == 0) && beta == 1.0 {
        return;
    }
    scale_triangle(uplo, n, beta, c, ldc);
    if alpha == 0.0 || k == 0 {
        return;
    }

    if !trans.is_trans() {
        for i in 0..n {
            let ai = &a[i * lda..i * lda + k];
            let (lo, hi) = tri_cols(uplo, i, n);
            for j in lo..hi {
                c[i * ldc + j] += alpha * kernels::dot(ai, &a[j * lda..j * lda + k]);
            }
        }
    } else {
        for l in 0..k {
            let al = &a[l * lda..l * lda + n];
            for i in 0..n {
                let t = alpha * al[i];
                if t != 0.0 {
                    let (lo, hi) = tri_cols(uplo, i, n);
                    kernels::axpy(t, &al[lo..hi], &mut c[i * ldc + lo..i * ldc + hi]);
                }
            }
        }
    }
}

// ============================================================================
// DSYR2K: Symmetric rank-2k update
// C := alpha * (op(A) * op(B)^T + op(B) * op(A)^T) + beta * C
// ============================================================================

/// Double-precision SYR2K. Shapes follow [`dsyrk`] for both A and B. The
/// triangle opposite `uplo` is never touched, so sentinels stored there survive.
pub fn dsyr2k(
    uplo: Uplo,
    trans: Transpose,
    n: usize,
    k: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &[f64],
    ldb: usize,
    beta: f64,
    c: &mut [f64],
    ldc: usize,
) {
    let (rows, cols) = if trans.is_trans() { (k, n) } else { (n, k) };
    require!(lda >= cols.max(1), Precondition::BadLdA);
    require!(ldb >= cols.max(1), Precondition::BadLdB);
    require!(ldc >= n.max(1), Precondition::BadLdC);
    if n == 0 {
        return;
    }
    require!(a.len() >= matrix_len(rows, cols, lda), Precondition::ShortA);
    require!(b.len() >= matrix_len(rows, cols, ldb), Precondition::ShortB);
    require!(c.len() >= matrix_len(n, n, ldc), Precondition::ShortC);

    if (alpha == 0.0 || k == 0) && beta == 1.0 {
        return;
    }
    scale_triangle(uplo, n, beta, c, ldc);
    if alpha == 0.0 || k == 0 {
        return;
    }

    if !trans.is_trans() {
        for i in 0..n {
            let ai = &a[i * lda..i * lda + k];
            let bi = &b[i * ldb..i * ldb + k];
            let (lo, hi) = tri_cols(uplo, i, n);
            for j in lo..hi {
                let aj = &a[j * lda..j * lda + k];
                let bj = &b[j * ldb..j * ldb + k];
                c[i * ldc + j] += alpha * (kernels::dot(ai, bj) + kernels::dot(bi, aj));
            }
        }
    } else {
        for l in 0..k {
            let al = &a[l * lda..l * lda + n];
            let bl = &b[l * ldb..l * ldb + n];
            for i in 0..n {
                let (lo, hi) = tri_cols(uplo, i, n);
                let row = &mut c[i * ldc + lo..i * ldc + hi];
                let ta = alpha * al[i];
                let tb = alpha * bl[i];
                if ta != 0.0 {
                    kernels::axpy(ta, &bl[lo..hi], row);
                }
                if tb != 0.0 {
                    kernels::axpy(tb, &al[lo..hi], row);
                }
            }
        }
    }
}

// ============================================================================
// DTRMM: Triangular matrix multiply
// B := alpha * op(A) * B  (Left)  or  alpha * B * op(A)  (Right)
// ============================================================================

/// Double-precision TRMM, in place on the `m x n` matrix B.
pub fn dtrmm(
    side: Side,
    uplo: Uplo,
    trans: Transpose,
    diag: Diag,
    m: usize,
    n: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &mut [f64],
    ldb: usize,
) {
    let na = if side == Side::Left { m } else { n };
    require!(lda >= na.max(1), Precondition::BadLdA);
    require!(ldb >= n.max(1), Precondition::BadLdB);
    if m == 0 || n == 0 {
        return;
    }
    require!(a.len() >= matrix_len(na, na, lda), Precondition::ShortA);
    require!(b.len() >= matrix_len(m, n, ldb), Precondition::ShortB);

    if alpha == 0.0 {
        scale_c(m, n, 0.0, b, ldb);
        return;
    }

    let nonunit = diag == Diag::NonUnit;
    let upper = uplo == Uplo::Upper;

    match side {
        Side::Left => {
            // Row i of op(A) * B is a combination of rows of B. The visiting
            // order keeps every row read still at its original value.
            let order: Box<dyn Iterator<Item = usize>> = if upper != trans.is_trans() {
                Box::new(0..m)
            } else {
                Box::new((0..m).rev())
            };
            for i in order {
                let (lo, hi) = if upper != trans.is_trans() { (i + 1, m) } else { (0, i) };
                let (head, tail) = b.split_at_mut(i * ldb);
                let (bi, rest) = tail.split_at_mut(n);
                if nonunit {
                    let d = a[i * lda + i];
                    kernels::scal(d, bi);
                }
                for l in lo..hi {
                    let t = if trans.is_trans() { a[l * lda + i] } else { a[i * lda + l] };
                    if t == 0.0 {
                        continue;
                    }
                    let bl = if l < i {
                        &head[l * ldb..l * ldb + n]
                    } else {
                        let off = (l - i) * ldb - n;
                        &rest[off..off + n]
                    };
                    kernels::axpy(t, bl, bi);
                }
                if alpha != 1.0 {
                    kernels::scal(alpha, bi);
                }
            }
        }
        Side::Right => {
            for i in 0..m {
                let x = &mut b[i * ldb..i * ldb + n];
                match (upper, trans.is_trans()) {
                    (true, false) => {
                        for l in (0..n).rev() {
                            let xl = x[l];
                            kernels::axpy(xl, &a[l * lda + l + 1..l * lda + n], &mut x[l + 1..]);
                            if nonunit {
                                x[l] *= a[l * lda + l];
                            }
                        }
                    }
                    (false, false) => {
                        for l in 0..n {
                            let xl = x[l];
                            kernels::axpy(xl, &a[l * lda..l * lda + l], &mut x[..l]);
                            if nonunit {
                                x[l] *= a[l * lda + l];
                            }
                        }
                    }
                    (true, true) => {
                        for j in 0..n {
                            let row = &a[j * lda..j * lda + n];
                            let d = if nonunit { row[j] * x[j] } else { x[j] };
                            x[j] = d + kernels::dot(&row[j + 1..], &x[j + 1..]);
                        }
                    }
                    (false, true) => {
                        for j in (0..n).rev() {
                            let row = &a[j * lda..j * lda + n];
                            let d = if nonunit { row[j] * x[j] } else { x[j] };
                            x[j] = d + kernels::dot(&row[..j], &x[..j]);
                        }
                    }
                }
                if alpha != 1.0 {
                    kernels::scal(alpha, x);
                }
            }
        }
    }
}

// ============================================================================
// DTRSM: Triangular solve with multiple right-hand sides
// op(A) * X = alpha * B  (Left)  or  X * op(A) = alpha * B  (Right)
// ============================================================================

/// Double-precision TRSM, X overwrites B.
///
/// All eight Side x Uplo x Transpose combinations are supported, each with
/// unit or non-unit diagonal. `alpha == 0` zero-fills B without reading A.
pub fn dtrsm(
    side: Side,
    uplo: Uplo,
    trans: Transpose,
    diag: Diag,
    m: usize,
    n: usize,
    alpha: f64,
    a: &[f64],
    lda: usize,
    b: &mut [f64],
    ldb: usize,
) {
    let na = if side == Side::Left { m } else { n };
    require!(lda >= na.max(1), Precondition::BadLdA);
    require!(ldb >= n.max(1), Precondition::BadLdB);
    if m == 0 || n == 0 {
        return;
    }
    require!(a.len() >= matrix_len(na, na, lda), Precondition::ShortA);
    require!(b.len() >= matrix_len(m, n, ldb), Precondition::ShortB);

    if alpha == 0.0 {
        scale_c(m, n, 0.0, b, ldb);
        return;
    }
    scale_c(m, n, alpha, b, ldb);

    let nonunit = diag == Diag::NonUnit;
    let upper = uplo == Uplo::Upper;

    match side {
        Side::Left => {
            // Row substitution. `forward` means rows are resolved top-down.
            let forward = upper == trans.is_trans();
            let order: Box<dyn Iterator<Item = usize>> =
                if forward { Box::new(0..m) } else { Box::new((0..m).rev()) };
            for i in order {
                let (head, tail) = b.split_at_mut(i * ldb);
                let (bi, rest) = tail.split_at_mut(n);
                if !trans.is_trans() {
                    // Gather: B_i -= sum A(i, l) * X_l over already solved rows.
                    let (lo, hi) = if forward { (0, i) } else { (i + 1, m) };
                    for l in lo..hi {
                        let t = a[i * lda + l];
                        if t == 0.0 {
                            continue;
                        }
                        let xl = if l < i {
                            &head[l * ldb..l * ldb + n]
                        } else {
                            let off = (l - i) * ldb - n;
                            &rest[off..off + n]
                        };
                        kernels::axpy(-t, xl, bi);
                    }
                    if nonunit {
                        let d = a[i * lda + i];
                        bi.iter_mut().for_each(|v| *v /= d);
                    }
                } else {
                    // Scatter: resolve X_i, then eliminate it from unsolved rows.
                    if nonunit {
                        let d = a[i * lda + i];
                        bi.iter_mut().for_each(|v| *v /= d);
                    }
                    let (lo, hi) = if forward { (i + 1, m) } else { (0, i) };
                    for l in lo..hi {
                        let t = a[i * lda + l];
                        if t == 0.0 {
                            continue;
                        }
                        let bl = if l < i {
                            &mut head[l * ldb..l * ldb + n]
                        } else {
                            let off = (l - i) * ldb - n;
                            &mut rest[off..off + n]
                        };
                        kernels::axpy(-t, bi, bl);
                    }
                }
            }
        }
        Side::Right => {
            // Each row x of B solves x * op(A) = b independently.
            for i in 0..m {
                let x = &mut b[i * ldb..i * ldb + n];
                match (upper, trans.is_trans()) {
                    (true, false) => {
                        for j in 0..n {
                            if nonunit {
                                x[j] /= a[j * lda + j];
                            }
                            let xj = x[j];
                            kernels::axpy(-xj, &a[j * lda + j + 1..j * lda + n], &mut x[j + 1..]);
                        }
                    }
                    (false, false) => {
                        for j in (0..n).rev() {
                            if nonunit {
                                x[j] /= a[j * lda + j];
                            }
                            let xj = x[j];
                            kernels::axpy(-xj, &a[j * lda..j * lda + j], &mut x[..j]);
                        }
                    }
                    (true, true) => {
                        for j in (0..n).rev() {
                            let row = &a[j * lda..j * lda + n];
                            let mut v = x[j] - kernels::dot(&row[j + 1..], &x[j + 1..]);
                            if nonunit {
                                v /= row[j];
                            }
                            x[j] = v;
                        }
                    }
                    (false, true) => {
                        for j in 0..n {
                            let row = &a[j * lda..j * lda + n];
                            let mut v = x[j] - kernels::dot(&row[..j], &x[..j]);
                            if nonunit {
                                v /= row[j];
                            }
                            x[j] = v;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize, ld: usize) -> Vec<f64> {
        let mut out = vec![f64::NAN; matrix_len(rows, cols, ld)];
        for i in 0..rows {
            for j in 0..cols {
                out[i * ld + j] = rng.gen_range(-1.0..1.0);
            }
        }
        out
    }

    fn get(a: &[f64], ld: usize, trans: Transpose, i: usize, j: usize) -> f64 {
        if trans.is_trans() {
            a[j * ld + i]
        } else {
            a[i * ld + j]
        }
    }

    fn flat(rows: &[&[f64]]) -> Vec<f64> {
        rows.iter().flat_map(|r| r.iter().copied()).collect()
    }

    fn assert_close(got: &[f64], want: &[f64], tol: f64, ctx: &str) {
        assert_eq!(got.len(), want.len(), "{}", ctx);
        for (idx, (g, w)) in got.iter().zip(want).enumerate() {
            if w.is_nan() {
                assert!(g.is_nan(), "{}: [{}] = {}, want NaN", ctx, idx, g);
            } else if w.is_infinite() {
                assert_eq!(g, w, "{}: [{}]", ctx, idx);
            } else {
                assert!((g - w).abs() <= tol * (1.0 + w.abs()), "{}: [{}] = {}, want {}", ctx, idx, g, w);
            }
        }
    }

    #[test]
    fn test_dgemm_simple_multiply() {
        // [[1, 2], [3, 4]] * [[5, 6], [7, 8]] = [[19, 22], [43, 50]]
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![5.0, 6.0, 7.0, 8.0];
        let mut c = vec![0.0; 4];
        dgemm(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2, 1.0, &a, 2, &b, 2, 0.0, &mut c, 2);
        assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn test_dgemm_matches_reference_all_transposes() {
        let mut rng = seeded_rng();
        // The last shape crosses the packing threshold and exercises partial tiles.
        for &(m, n, k) in &[(3, 5, 4), (7, 1, 9), (61, 53, 47)] {
            for ta in [Transpose::NoTrans, Transpose::Trans] {
                for tb in [Transpose::NoTrans, Transpose::Trans] {
                    let (ar, ac) = if ta.is_trans() { (k, m) } else { (m, k) };
                    let (br, bc) = if tb.is_trans() { (n, k) } else { (k, n) };
                    let (lda, ldb, ldc) = (ac + 3, bc + 2, n + 1);
                    let a = random_matrix(&mut rng, ar, ac, lda);
                    let b = random_matrix(&mut rng, br, bc, ldb);
                    let c0 = random_matrix(&mut rng, m, n, ldc);
                    let (alpha, beta) = (0.7, -1.3);

                    let mut want = c0.clone();
                    for i in 0..m {
                        for j in 0..n {
                            let mut s = 0.0;
                            for p in 0..k {
                                s += get(&a, lda, ta, i, p) * get(&b, ldb, tb, p, j);
                            }
                            want[i * ldc + j] = alpha * s + beta * c0[i * ldc + j];
                        }
                    }

                    let mut c = c0.clone();
                    dgemm(ta, tb, m, n, k, alpha, &a, lda, &b, ldb, beta, &mut c, ldc);
                    // Slack columns hold NaN in both and must stay NaN.
                    assert_close(&c, &want, 1e-13 * k as f64, &format!("{}x{}x{} {:?} {:?}", m, n, k, ta, tb));
                }
            }
        }
    }

    #[test]
    fn test_dgemm_blocked_64x64() {
        let n = 64;
        let a: Vec<f64> = (0..n * n).map(|i| ((i % 13) as f64) * 0.25).collect();
        let mut ident = vec![0.0; n * n];
        for i in 0..n {
            ident[i * n + i] = 1.0;
        }
        let mut c = vec![f64::NAN; n * n];
        dgemm(Transpose::NoTrans, Transpose::NoTrans, n, n, n, 1.0, &a, n, &ident, n, 0.0, &mut c, n);
        assert_eq!(c, a);
    }

    #[test]
    fn test_dgemm_alpha_zero_only_scales() {
        let a = vec![f64::NAN; 4];
        let b = vec![f64::INFINITY; 4];
        let mut c = vec![1.0, 2.0, 3.0, 4.0];
        dgemm(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2, 0.0, &a, 2, &b, 2, 2.0, &mut c, 2);
        assert_eq!(c, vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    #[should_panic(expected = "insufficient length of B")]
    fn test_dgemm_inner_dimension_mismatch_panics() {
        // A is 2x3 but B only holds 2 rows.
        let a = vec![0.0; 6];
        let b = vec![0.0; 4];
        let mut c = vec![0.0; 4];
        dgemm(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 3, 1.0, &a, 3, &b, 2, 0.0, &mut c, 2);
    }

    #[test]
    fn test_dsymm_reference_table() {
        let b = flat(&[&[2.0, 3.0, 4.0, 8.0], &[5.0, 6.0, 7.0, 15.0], &[8.0, 9.0, 10.0, 20.0]]);
        let c0 = flat(&[&[8.0, 12.0, 2.0, 1.0], &[9.0, 12.0, 9.0, 9.0], &[12.0, 1.0, -1.0, 5.0]]);
        let want = flat(&[
            &[126.0, 156.0, 144.0, 285.0],
            &[211.0, 252.0, 275.0, 535.0],
            &[282.0, 291.0, 327.0, 689.0],
        ]);
        let nan = f64::NAN;
        let upper = flat(&[&[2.0, 3.0, 4.0], &[nan, 6.0, 7.0], &[nan, nan, 10.0]]);
        let lower = flat(&[&[2.0, nan, nan], &[3.0, 6.0, nan], &[4.0, 7.0, 10.0]]);
        for (uplo, a) in [(Uplo::Upper, &upper), (Uplo::Lower, &lower)] {
            let mut c = c0.clone();
            dsymm(Side::Left, uplo, 3, 4, 2.0, a, 3, &b, 4, 3.0, &mut c, 4);
            assert_close(&c, &want, 1e-14, &format!("{:?}", uplo));
        }
    }

    #[test]
    fn test_dsymm_right_matches_gemm() {
        let mut rng = seeded_rng();
        let (m, n) = (4, 5);
        let full = {
            let mut s = random_matrix(&mut rng, n, n, n);
            for i in 0..n {
                for j in 0..i {
                    s[i * n + j] = s[j * n + i];
                }
            }
            s
        };
        let b = random_matrix(&mut rng, m, n, n);
        let mut want = vec![0.0; m * n];
        dgemm(Transpose::NoTrans, Transpose::NoTrans, m, n, n, 1.5, &b, n, &full, n, 0.0, &mut want, n);
        for uplo in [Uplo::Upper, Uplo::Lower] {
            let mut a = full.clone();
            for i in 0..n {
                for j in 0..n {
                    if (uplo == Uplo::Upper && j < i) || (uplo == Uplo::Lower && j > i) {
                        a[i * n + j] = f64::NAN;
                    }
                }
            }
            let mut c = vec![f64::NAN; m * n];
            dsymm(Side::Right, uplo, m, n, 1.5, &a, n, &b, n, 0.0, &mut c, n);
            assert_close(&c, &want, 1e-13, &format!("{:?}", uplo));
        }
    }

    #[test]
    fn test_dsyrk_lower_keeps_upper() {
        // A = [[1, 2], [3, 4]]; A * A^T = [[5, 11], [11, 25]]
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let mut c = vec![f64::NAN, -7.0, f64::NAN, f64::NAN];
        dsyrk(Uplo::Lower, Transpose::NoTrans, 2, 2, 1.0, &a, 2, 0.0, &mut c, 2);
        assert_eq!(c[0], 5.0);
        assert_eq!(c[1], -7.0);
        assert_eq!(c[2], 11.0);
        assert_eq!(c[3], 25.0);

        // A^T * A = [[10, 14], [14, 20]]
        let mut c = vec![1.0, 1.0, f64::NAN, 1.0];
        dsyrk(Uplo::Upper, Transpose::Trans, 2, 2, 1.0, &a, 2, 1.0, &mut c, 2);
        assert_eq!(c[0], 11.0);
        assert_eq!(c[1], 15.0);
        assert!(c[2].is_nan());
        assert_eq!(c[3], 21.0);
    }

    struct Syr2kCase {
        uplo: Uplo,
        trans: Transpose,
        alpha: f64,
        beta: f64,
        c: Vec<f64>,
        want: Vec<f64>,
    }

    #[test]
    fn test_dsyr2k_reference_table() {
        let inf = f64::INFINITY;
        let nan = f64::NAN;
        let upper_c = flat(&[&[1.0, 2.0, 3.0], &[-inf, 4.0, 5.0], &[-inf, -inf, 6.0]]);
        let lower_c = flat(&[&[1.0, -inf, -inf], &[2.0, 4.0, -inf], &[3.0, 5.0, 6.0]]);
        let upper_full = flat(&[&[140.0, 250.0, 360.0], &[-inf, 410.0, 568.0], &[-inf, -inf, 774.0]]);
        let lower_full = flat(&[&[140.0, -inf, -inf], &[250.0, 410.0, -inf], &[360.0, 568.0, 774.0]]);
        let cases = vec![
            Syr2kCase {
                uplo: Uplo::Upper,
                trans: Transpose::NoTrans,
                alpha: 0.0,
                beta: 2.0,
                c: upper_c.clone(),
                want: flat(&[&[2.0, 4.0, 6.0], &[-inf, 8.0, 10.0], &[-inf, -inf, 12.0]]),
            },
            Syr2kCase {
                uplo: Uplo::Lower,
                trans: Transpose::NoTrans,
                alpha: 0.0,
                beta: 2.0,
                c: lower_c.clone(),
                want: flat(&[&[2.0, -inf, -inf], &[4.0, 8.0, -inf], &[6.0, 10.0, 12.0]]),
            },
            Syr2kCase {
                uplo: Uplo::Upper,
                trans: Transpose::NoTrans,
                alpha: 3.0,
                beta: 2.0,
                c: upper_c.clone(),
                want: upper_full.clone(),
            },
            Syr2kCase {
                uplo: Uplo::Lower,
                trans: Transpose::NoTrans,
                alpha: 3.0,
                beta: 2.0,
                c: lower_c.clone(),
                want: lower_full.clone(),
            },
            Syr2kCase {
                uplo: Uplo::Upper,
                trans: Transpose::Trans,
                alpha: 3.0,
                beta: 2.0,
                c: upper_c.clone(),
                want: upper_full.clone(),
            },
            Syr2kCase {
                uplo: Uplo::Lower,
                trans: Transpose::Trans,
                alpha: 3.0,
                beta: 2.0,
                c: lower_c.clone(),
                want: lower_full,
            },
            // beta == 0 must overwrite NaN in the triangle while -Inf outside survives.
            Syr2kCase {
                uplo: Uplo::Upper,
                trans: Transpose::NoTrans,
                alpha: 3.0,
                beta: 0.0,
                c: flat(&[&[nan, nan, nan], &[-inf, nan, nan], &[-inf, -inf, nan]]),
                want: flat(&[&[138.0, 246.0, 354.0], &[-inf, 402.0, 558.0], &[-inf, -inf, 762.0]]),
            },
        ];

        let a_n = flat(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 6.0]]);
        let b_n = flat(&[&[7.0, 8.0], &[9.0, 10.0], &[11.0, 12.0]]);
        let a_t = flat(&[&[1.0, 3.0, 5.0], &[2.0, 4.0, 6.0]]);
        let b_t = flat(&[&[7.0, 9.0, 11.0], &[8.0, 10.0, 12.0]]);

        for (idx, case) in cases.iter().enumerate() {
            let (a, b, ld) = if case.trans.is_trans() { (&a_t, &b_t, 3) } else { (&a_n, &b_n, 2) };
            let mut c = case.c.clone();
            dsyr2k(case.uplo, case.trans, 3, 2, case.alpha, a, ld, b, ld, case.beta, &mut c, 3);
            assert_close(&c, &case.want, 1e-14, &format!("case {}", idx));
        }
    }

    struct TrsmCase {
        uplo: Uplo,
        trans: Transpose,
        diag: Diag,
        alpha: f64,
        a: Vec<f64>,
        want: Vec<f64>,
    }

    #[test]
    fn test_dtrsm_left_reference_table() {
        let upper_a = flat(&[&[1.0, 2.0, 3.0], &[0.0, 4.0, 5.0], &[0.0, 0.0, 5.0]]);
        let lower_a = flat(&[&[2.0, 0.0, 0.0], &[3.0, 4.0, 0.0], &[5.0, 6.0, 7.0]]);
        let upper_t = flat(&[&[2.0, 3.0, 4.0], &[0.0, 5.0, 6.0], &[0.0, 0.0, 7.0]]);
        let cases = vec![
            TrsmCase {
                uplo: Uplo::Upper,
                trans: Transpose::NoTrans,
                diag: Diag::NonUnit,
                alpha: 2.0,
                a: upper_a.clone(),
                want: vec![1.0, 3.4, -0.5, -0.5, 2.0, 3.2],
            },
            TrsmCase {
                uplo: Uplo::Upper,
                trans: Transpose::NoTrans,
                diag: Diag::Unit,
                alpha: 2.0,
                a: upper_a,
                want: vec![60.0, 96.0, -42.0, -66.0, 10.0, 16.0],
            },
            TrsmCase {
                uplo: Uplo::Lower,
                trans: Transpose::NoTrans,
                diag: Diag::NonUnit,
                alpha: 3.0,
                a: lower_a.clone(),
                want: vec![4.5, 9.0, -0.375, -1.5, -0.75, -12.0 / 7.0],
            },
            TrsmCase {
                uplo: Uplo::Lower,
                trans: Transpose::NoTrans,
                diag: Diag::Unit,
                alpha: 3.0,
                a: lower_a,
                want: vec![9.0, 18.0, -15.0, -33.0, 60.0, 132.0],
            },
            TrsmCase {
                uplo: Uplo::Upper,
                trans: Transpose::Trans,
                diag: Diag::NonUnit,
                alpha: 3.0,
                a: upper_t.clone(),
                want: vec![4.5, 9.0, -0.3, -1.2, -6.0 / 35.0, -24.0 / 35.0],
            },
            TrsmCase {
                uplo: Uplo::Upper,
                trans: Transpose::Trans,
                diag: Diag::Unit,
                alpha: 3.0,
                a: upper_t,
                want: vec![9.0, 18.0, -15.0, -33.0, 69.0, 150.0],
            },
        ];
        for (idx, case) in cases.iter().enumerate() {
            // ldb = 3 leaves one slack column that must keep its NaN.
            let mut b = vec![3.0, 6.0, f64::NAN, 4.0, 7.0, f64::NAN, 5.0, 8.0];
            dtrsm(Side::Left, case.uplo, case.trans, case.diag, 3, 2, case.alpha, &case.a, 3, &mut b, 3);
            let got = vec![b[0], b[1], b[3], b[4], b[6], b[7]];
            assert_close(&got, &case.want, 1e-14, &format!("case {}", idx));
            assert!(b[2].is_nan() && b[5].is_nan(), "case {}: slack written", idx);
        }
    }

    #[test]
    fn test_dtrsm_alpha_zero_zero_fills_singular() {
        let a = vec![0.0; 4];
        let mut b = vec![f64::NAN, 1.0, f64::INFINITY, 2.0];
        dtrsm(Side::Left, Uplo::Upper, Transpose::NoTrans, Diag::NonUnit, 2, 2, 0.0, &a, 2, &mut b, 2);
        assert_eq!(b, vec![0.0; 4]);
    }

    fn random_triangular(rng: &mut StdRng, uplo: Uplo, n: usize, ld: usize) -> Vec<f64> {
        let mut a = vec![f64::NAN; matrix_len(n, n, ld)];
        for i in 0..n {
            for j in 0..n {
                let stored = match uplo {
                    Uplo::Upper => j >= i,
                    _ => j <= i,
                };
                if stored {
                    a[i * ld + j] = rng.gen_range(-1.0..1.0);
                }
            }
            // Keep the diagonal well away from zero.
            a[i * ld + i] = rng.gen_range(1.0..2.0);
        }
        a
    }

    /// op(A) as a dense matrix with the implicit zeros and unit diagonal filled in.
    fn dense_op(a: &[f64], ld: usize, n: usize, uplo: Uplo, trans: Transpose, diag: Diag) -> Vec<f64> {
        let mut out = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let stored = match uplo {
                    Uplo::Upper => j >= i,
                    _ => j <= i,
                };
                let v = if i == j && diag == Diag::Unit {
                    1.0
                } else if stored {
                    a[i * ld + j]
                } else {
                    0.0
                };
                if trans.is_trans() {
                    out[j * n + i] = v;
                } else {
                    out[i * n + j] = v;
                }
            }
        }
        out
    }

    #[test]
    fn test_dtrsm_dtrmm_round_trip_all_combinations() {
        let mut rng = seeded_rng();
        let (m, n) = (5, 4);
        for side in [Side::Left, Side::Right] {
            for uplo in [Uplo::Upper, Uplo::Lower] {
                for trans in [Transpose::NoTrans, Transpose::Trans] {
                    for diag in [Diag::NonUnit, Diag::Unit] {
                        let na = if side == Side::Left { m } else { n };
                        let lda = na + 2;
                        let ldb = n + 1;
                        let a = random_triangular(&mut rng, uplo, na, lda);
                        let b0 = random_matrix(&mut rng, m, n, ldb);
                        let alpha = 1.75;
                        let ctx = format!("{:?} {:?} {:?} {:?}", side, uplo, trans, diag);

                        let mut x = b0.clone();
                        dtrsm(side, uplo, trans, diag, m, n, alpha, &a, lda, &mut x, ldb);

                        // Reconstruct op(A) * X (or X * op(A)) with a dense product.
                        let opa = dense_op(&a, lda, na, uplo, trans, diag);
                        let mut prod = vec![f64::NAN; b0.len()];
                        match side {
                            Side::Left => dgemm(
                                Transpose::NoTrans, Transpose::NoTrans, m, n, m, 1.0, &opa, m, &x, ldb, 0.0,
                                &mut prod, ldb,
                            ),
                            Side::Right => dgemm(
                                Transpose::NoTrans, Transpose::NoTrans, m, n, n, 1.0, &x, ldb, &opa, n, 0.0,
                                &mut prod, ldb,
                            ),
                        }
                        let want: Vec<f64> = b0.iter().map(|v| alpha * v).collect();
                        assert_close(&prod, &want, 1e-13, &ctx);

                        // dtrmm must undo the solve when given 1/alpha.
                        dtrmm(side, uplo, trans, diag, m, n, 1.0 / alpha, &a, lda, &mut x, ldb);
                        assert_close(&x, &b0, 1e-13, &ctx);
                    }
                }
            }
        }
    }
}
