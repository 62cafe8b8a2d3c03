//! Householder reflectors: generation, application and blocking.
//!
//! An elementary reflector is `H = I - tau * v * vᵀ` with `v[0] = 1`. Only
//! the tail of v is stored; the unit entry is implicit. A block of k
//! reflectors is applied as `I - V * T * Vᵀ` with T upper (Forward) or lower
//! (Backward) triangular.

use crate::auxiliary::{last_nonzero_column, last_nonzero_row};
use crate::flags::{Direct, StoreV};
use crate::views;
use crate::{Blas64, Diag, Lapack, Side, Transpose, Uplo};
use densrus_core::machine::{EPS, SAFE_MIN};
use densrus_core::{first_index, matrix_len, require, vector_len, Precondition};

impl<B: Blas64> Lapack<B> {
    // ========================================================================
    // Generation
    // ========================================================================

    /// Generate a reflector H of order n such that
    ///
    /// ```text
    /// H * [alpha]   [beta]
    ///     [  x  ] = [  0 ]      Hᵀ H = I
    /// ```
    ///
    /// `x` holds the `n-1` tail entries at stride `incx` and is overwritten
    /// with the tail of v. Returns `(beta, tau)`. When the tail is already
    /// zero, `tau = 0` and H is the identity.
    pub fn dlarfg(&self, n: usize, alpha: f64, x: &mut [f64], incx: isize) -> (f64, f64) {
        require!(incx != 0, Precondition::ZeroIncX);
        if n <= 1 {
            return (alpha, 0.0);
        }
        require!(x.len() >= vector_len(n - 1, incx), Precondition::ShortX);

        let mut xnorm = self.blas.dnrm2(n - 1, x, incx);
        if xnorm == 0.0 {
            return (alpha, 0.0);
        }
        let mut alpha = alpha;
        let mut beta = -self.dlapy2(alpha, xnorm).copysign(alpha);
        let safmin = SAFE_MIN / EPS;
        let mut knt = 0;
        if beta.abs() < safmin {
            // xnorm and beta may be inaccurate; scale x and recompute.
            let rsafmn = 1.0 / safmin;
            loop {
                knt += 1;
                self.blas.dscal(n - 1, rsafmn, x, incx);
                beta *= rsafmn;
                alpha *= rsafmn;
                if beta.abs() >= safmin || knt >= 20 {
                    break;
                }
            }
            xnorm = self.blas.dnrm2(n - 1, x, incx);
            beta = -self.dlapy2(alpha, xnorm).copysign(alpha);
        }
        let tau = (beta - alpha) / beta;
        self.blas.dscal(n - 1, 1.0 / (alpha - beta), x, incx);
        for _ in 0..knt {
            beta *= safmin;
        }
        (beta, tau)
    }

    // ========================================================================
    // Application of one reflector
    // ========================================================================

    /// Apply `H = I - tau * v * vᵀ` to the `m x n` matrix C from the left
    /// (`C := H*C`, v has m entries) or the right (`C := C*H`, v has n).
    ///
    /// Unlike the reflectors stored by the factorizations, v here is given
    /// in full, including its leading entry. Trailing zeros of v, and the
    /// rows or columns of C they would touch, are skipped. `work` needs n
    /// entries (Left) or m (Right).
    pub fn dlarf(
        &self,
        side: Side,
        m: usize,
        n: usize,
        v: &[f64],
        incv: isize,
        tau: f64,
        c: &mut [f64],
        ldc: usize,
        work: &mut [f64],
    ) {
        require!(incv != 0, Precondition::ZeroIncX);
        require!(ldc >= n.max(1), Precondition::BadLdC);
        let apply_left = side == Side::Left;
        let len = if apply_left { m } else { n };
        if tau == 0.0 || m == 0 || n == 0 {
            return;
        }
        require!(v.len() >= vector_len(len, incv), Precondition::ShortV);
        require!(c.len() >= matrix_len(m, n, ldc), Precondition::ShortC);
        require!(work.len() >= if apply_left { n } else { m }, Precondition::ShortWork);

        // Trim trailing zeros of v. A shortened view starts later in the
        // buffer when the increment is negative.
        let start = first_index(len, incv);
        let mut lastv = len;
        while lastv > 0 && v[(start as isize + (lastv as isize - 1) * incv) as usize] == 0.0 {
            lastv -= 1;
        }
        if lastv == 0 {
            return;
        }
        let v = if incv < 0 { &v[(len - lastv) * incv.unsigned_abs()..] } else { v };

        if apply_left {
            // w := C(0:lastv, 0:lastc)ᵀ * v ; C := C - tau * v * wᵀ
            let lastc = last_nonzero_column(lastv, n, c, ldc);
            if lastc == 0 {
                return;
            }
            self.blas.dgemv(Transpose::Trans, lastv, lastc, 1.0, c, ldc, v, incv, 0.0, work, 1);
            self.blas.dger(lastv, lastc, -tau, v, incv, work, 1, c, ldc);
        } else {
            // w := C(0:lastc, 0:lastv) * v ; C := C - tau * w * vᵀ
            let lastc = last_nonzero_row(m, lastv, c, ldc);
            if lastc == 0 {
                return;
            }
            self.blas.dgemv(Transpose::NoTrans, lastc, lastv, 1.0, c, ldc, v, incv, 0.0, work, 1);
            self.blas.dger(lastc, lastv, -tau, work, 1, v, incv, c, ldc);
        }
    }

    /// [`dlarf`](Self::dlarf) for a contiguous v, with the reflector applied
    /// directly when its order is at most 10.
    pub fn dlarfx(
        &self,
        side: Side,
        m: usize,
        n: usize,
        v: &[f64],
        tau: f64,
        c: &mut [f64],
        ldc: usize,
        work: &mut [f64],
    ) {
        let order = if side == Side::Left { m } else { n };
        if order > 10 {
            self.dlarf(side, m, n, v, 1, tau, c, ldc, work);
            return;
        }
        require!(ldc >= n.max(1), Precondition::BadLdC);
        if tau == 0.0 || m == 0 || n == 0 {
            return;
        }
        require!(v.len() >= order, Precondition::ShortV);
        require!(c.len() >= matrix_len(m, n, ldc), Precondition::ShortC);
        let v = &v[..order];
        if side == Side::Left {
            for j in 0..n {
                let sum: f64 = v.iter().enumerate().map(|(i, vi)| vi * c[i * ldc + j]).sum();
                let t = tau * sum;
                for (i, vi) in v.iter().enumerate() {
                    c[i * ldc + j] -= t * vi;
                }
            }
        } else {
            for i in 0..m {
                let row = &mut c[i * ldc..i * ldc + n];
                let sum: f64 = row.iter().zip(v).map(|(x, vi)| x * vi).sum();
                let t = tau * sum;
                for (x, vi) in row.iter_mut().zip(v) {
                    *x -= t * vi;
                }
            }
        }
    }

    // ========================================================================
    // Block reflectors
    // ========================================================================

    /// Form the `k x k` triangular factor T of the block reflector
    /// `H = I - V * T * Vᵀ` of order n built from k elementary reflectors.
    ///
    /// With Columnwise storage V is `n x k` and reflector i is its column i;
    /// with Rowwise storage V is `k x n` and reflector i is row i. For
    /// Forward, reflector i has its unit entry at position i and zeros
    /// before it, and T is upper triangular. For Backward, the unit entry is
    /// at `n-k+i` with zeros after it, and T is lower triangular. The unit
    /// entries and the implied zeros are not read.
    pub fn dlarft(
        &self,
        direct: Direct,
        store: StoreV,
        n: usize,
        k: usize,
        v: &[f64],
        ldv: usize,
        tau: &[f64],
        t: &mut [f64],
        ldt: usize,
    ) {
        let (vrows, vcols) = if store == StoreV::Columnwise { (n, k) } else { (k, n) };
        require!(k <= n || n == 0, Precondition::BadK);
        require!(ldv >= vcols.max(1), Precondition::BadLdV);
        require!(ldt >= k.max(1), Precondition::BadLdT);
        if n == 0 || k == 0 {
            return;
        }
        require!(v.len() >= matrix_len(vrows, vcols, ldv), Precondition::ShortV);
        require!(tau.len() >= k, Precondition::ShortTau);
        require!(t.len() >= matrix_len(k, k, ldt), Precondition::ShortT);
        let ldv_i = ldv as isize;

        match direct {
            Direct::Forward => {
                for i in 0..k {
                    if tau[i] == 0.0 {
                        for j in 0..=i {
                            t[j * ldt + i] = 0.0;
                        }
                        continue;
                    }
                    // T(0:i, i) := -tau[i] * V(i:n, 0:i)ᵀ * V(i:n, i)
                    let mut col = vec![0.0; i];
                    for j in 0..i {
                        col[j] = -tau[i] * if store == StoreV::Columnwise { v[i * ldv + j] } else { v[j * ldv + i] };
                    }
                    if i + 1 < n && i > 0 {
                        match store {
                            StoreV::Columnwise => self.blas.dgemv(
                                Transpose::Trans,
                                n - i - 1,
                                i,
                                -tau[i],
                                &v[(i + 1) * ldv..],
                                ldv,
                                &v[(i + 1) * ldv + i..],
                                ldv_i,
                                1.0,
                                &mut col,
                                1,
                            ),
                            StoreV::Rowwise => self.blas.dgemv(
                                Transpose::NoTrans,
                                i,
                                n - i - 1,
                                -tau[i],
                                &v[i + 1..],
                                ldv,
                                &v[i * ldv + i + 1..],
                                1,
                                1.0,
                                &mut col,
                                1,
                            ),
                        }
                    }
                    // T(0:i, i) := T(0:i, 0:i) * T(0:i, i)
                    if i > 0 {
                        self.blas.dtrmv(Uplo::Upper, Transpose::NoTrans, Diag::NonUnit, i, t, ldt, &mut col, 1);
                    }
                    views::set_column(t, ldt, 0, i, &col);
                    t[i * ldt + i] = tau[i];
                }
            }
            Direct::Backward => {
                for i in (0..k).rev() {
                    if tau[i] == 0.0 {
                        for j in i..k {
                            t[j * ldt + i] = 0.0;
                        }
                        continue;
                    }
                    if i + 1 < k {
                        // T(i+1:k, i) := -tau[i] * V(0:n-k+i, i+1:k)ᵀ * V(0:n-k+i, i)
                        let unit = n - k + i;
                        let mut col = vec![0.0; k - i - 1];
                        for j in i + 1..k {
                            col[j - i - 1] =
                                -tau[i] * if store == StoreV::Columnwise { v[unit * ldv + j] } else { v[j * ldv + unit] };
                        }
                        if unit > 0 {
                            match store {
                                StoreV::Columnwise => self.blas.dgemv(
                                    Transpose::Trans,
                                    unit,
                                    k - i - 1,
                                    -tau[i],
                                    &v[i + 1..],
                                    ldv,
                                    &v[i..],
                                    ldv_i,
                                    1.0,
                                    &mut col,
                                    1,
                                ),
                                StoreV::Rowwise => self.blas.dgemv(
                                    Transpose::NoTrans,
                                    k - i - 1,
                                    unit,
                                    -tau[i],
                                    &v[(i + 1) * ldv..],
                                    ldv,
                                    &v[i * ldv..],
                                    1,
                                    1.0,
                                    &mut col,
                                    1,
                                ),
                            }
                        }
                        // T(i+1:k, i) := T(i+1:k, i+1:k) * T(i+1:k, i)
                        self.blas.dtrmv(
                            Uplo::Lower,
                            Transpose::NoTrans,
                            Diag::NonUnit,
                            k - i - 1,
                            &t[(i + 1) * ldt + i + 1..],
                            ldt,
                            &mut col,
                            1,
                        );
                        views::set_column(t, ldt, i + 1, i, &col);
                    }
                    t[i * ldt + i] = tau[i];
                }
            }
        }
    }

    /// Apply the block reflector `H = I - V * T * Vᵀ` or its transpose to the
    /// `m x n` matrix C from the left or the right.
    ///
    /// V holds k reflectors columnwise in Forward order: it is `m x k` for
    /// Left and `n x k` for Right, unit lower trapezoidal with the unit
    /// diagonal and upper triangle not read. `work` is an `n x k` (Left) or
    /// `m x k` (Right) matrix with leading dimension `ldwork`.
    pub fn dlarfb(
        &self,
        side: Side,
        trans: Transpose,
        direct: Direct,
        store: StoreV,
        m: usize,
        n: usize,
        k: usize,
        v: &[f64],
        ldv: usize,
        t: &[f64],
        ldt: usize,
        c: &mut [f64],
        ldc: usize,
        work: &mut [f64],
        ldwork: usize,
    ) {
        require!(
            direct == Direct::Forward && store == StoreV::Columnwise,
            Precondition::BadReflectorStorage
        );
        require!(ldv >= k.max(1), Precondition::BadLdV);
        require!(ldt >= k.max(1), Precondition::BadLdT);
        require!(ldc >= n.max(1), Precondition::BadLdC);
        require!(ldwork >= k.max(1), Precondition::BadLdWork);
        if m == 0 || n == 0 || k == 0 {
            return;
        }
        let (order, wrows) = if side == Side::Left { (m, n) } else { (n, m) };
        require!(k <= order, Precondition::BadK);
        require!(v.len() >= matrix_len(order, k, ldv), Precondition::ShortV);
        require!(t.len() >= matrix_len(k, k, ldt), Precondition::ShortT);
        require!(c.len() >= matrix_len(m, n, ldc), Precondition::ShortC);
        require!(work.len() >= matrix_len(wrows, k, ldwork), Precondition::ShortWork);

        // H*C uses T in W*Tᵀ, Hᵀ*C uses W*T (and the reverse on the right).
        let blas = &self.blas;
        if side == Side::Left {
            let transt = if trans.is_trans() { Transpose::NoTrans } else { Transpose::Trans };
            // W := Cᵀ * V = C1ᵀ * V1 + C2ᵀ * V2, stored in work (n x k).
            for j in 0..k {
                blas.dcopy(n, &c[j * ldc..], 1, &mut work[j..], ldwork as isize);
            }
            blas.dtrmm(Side::Right, Uplo::Lower, Transpose::NoTrans, Diag::Unit, n, k, 1.0, v, ldv, work, ldwork);
            if m > k {
                blas.dgemm(
                    Transpose::Trans,
                    Transpose::NoTrans,
                    n,
                    k,
                    m - k,
                    1.0,
                    &c[k * ldc..],
                    ldc,
                    &v[k * ldv..],
                    ldv,
                    1.0,
                    work,
                    ldwork,
                );
            }
            blas.dtrmm(Side::Right, Uplo::Upper, transt, Diag::NonUnit, n, k, 1.0, t, ldt, work, ldwork);
            // C := C - V * Wᵀ
            if m > k {
                blas.dgemm(
                    Transpose::NoTrans,
                    Transpose::Trans,
                    m - k,
                    n,
                    k,
                    -1.0,
                    &v[k * ldv..],
                    ldv,
                    work,
                    ldwork,
                    1.0,
                    &mut c[k * ldc..],
                    ldc,
                );
            }
            blas.dtrmm(Side::Right, Uplo::Lower, Transpose::Trans, Diag::Unit, n, k, 1.0, v, ldv, work, ldwork);
            for j in 0..k {
                for i in 0..n {
                    c[j * ldc + i] -= work[i * ldwork + j];
                }
            }
            return;
        }

        // W := C * V = C1 * V1 + C2 * V2, stored in work (m x k).
        for j in 0..k {
            blas.dcopy(m, &c[j..], ldc as isize, &mut work[j..], ldwork as isize);
        }
        blas.dtrmm(Side::Right, Uplo::Lower, Transpose::NoTrans, Diag::Unit, m, k, 1.0, v, ldv, work, ldwork);
        if n > k {
            blas.dgemm(
                Transpose::NoTrans,
                Transpose::NoTrans,
                m,
                k,
                n - k,
                1.0,
                &c[k..],
                ldc,
                &v[k * ldv..],
                ldv,
                1.0,
                work,
                ldwork,
            );
        }
        blas.dtrmm(Side::Right, Uplo::Upper, trans, Diag::NonUnit, m, k, 1.0, t, ldt, work, ldwork);
        // C := C - W * Vᵀ
        if n > k {
            blas.dgemm(
                Transpose::NoTrans,
                Transpose::Trans,
                m,
                n - k,
                k,
                -1.0,
                work,
                ldwork,
                &v[k * ldv..],
                ldv,
                1.0,
                &mut c[k..],
                ldc,
            );
        }
        blas.dtrmm(Side::Right, Uplo::Lower, Transpose::Trans, Diag::Unit, m, k, 1.0, v, ldv, work, ldwork);
        for i in 0..m {
            for j in 0..k {
                c[i * ldc + j] -= work[i * ldwork + j];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Explicit `I - tau * v * vᵀ` of order n.
    fn reflector(n: usize, v: &[f64], tau: f64) -> Vec<f64> {
        let mut h = eye(n);
        for i in 0..n {
            for j in 0..n {
                h[i * n + j] -= tau * v[i] * v[j];
            }
        }
        h
    }

    #[test]
    fn test_dlarfg_annihilates_tail() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(10);
        for &n in &[1usize, 2, 3, 7, 20] {
            for &inc in &[1isize, 3] {
                for scale in [1.0, 1e-310 / EPS] {
                    let alpha = scale * rng.gen_range(-1.0..1.0);
                    let mut x = vec![f64::NAN; vector_len(n.saturating_sub(1), inc)];
                    let mut orig = vec![alpha];
                    for i in 0..n.saturating_sub(1) {
                        x[i * inc as usize] = scale * rng.gen_range(-1.0..1.0);
                        orig.push(x[i * inc as usize]);
                    }
                    let (beta, tau) = lapack.dlarfg(n, alpha, &mut x, inc);
                    let mut v = vec![1.0];
                    for i in 0..n.saturating_sub(1) {
                        v.push(x[i * inc as usize]);
                    }
                    let h = reflector(n, &v, tau);
                    let hx = matmul_dims(n, 1, n, &h, &orig);
                    let norm = densrus_blas::level1::dnrm2(n, &orig, 1);
                    assert!((hx[0] - beta).abs() <= 1e-14 * norm.max(f64::MIN_POSITIVE), "n = {}", n);
                    for &r in &hx[1..] {
                        assert!(r.abs() <= 1e-14 * norm, "n = {}, residual {}", n, r);
                    }
                    if n > 1 {
                        assert!((1.0..=2.0).contains(&tau), "tau = {}", tau);
                    }
                }
            }
        }
    }

    #[test]
    fn test_dlarfg_zero_tail_is_identity() {
        let lapack = Lapack::new();
        let mut x = [0.0, 0.0];
        assert_eq!(lapack.dlarfg(3, -2.5, &mut x, 1), (-2.5, 0.0));
    }

    #[test]
    fn test_dlarf_and_dlarfx_match_explicit() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(11);
        for side in [Side::Left, Side::Right] {
            for &(m, n, ldc) in &[(4usize, 3usize, 3usize), (5, 12, 14), (13, 2, 5), (1, 1, 1)] {
                for trailing_zeros in [0usize, 2] {
                    let order = if side == Side::Left { m } else { n };
                    let mut v: Vec<f64> = (0..order).map(|_| rng.gen_range(-1.0..1.0)).collect();
                    for vi in v.iter_mut().rev().take(trailing_zeros.min(order - 1)) {
                        *vi = 0.0;
                    }
                    let tau = 1.3;
                    let c = random_general(m, n, ldc, &mut rng);
                    let h = reflector(order, &v, tau);
                    let packed = pack(m, n, &c, ldc);
                    let want =
                        if side == Side::Left { matmul_dims(m, n, m, &h, &packed) } else { matmul_dims(m, n, n, &packed, &h) };

                    let mut work = vec![0.0; m.max(n)];
                    let mut got = c.clone();
                    lapack.dlarf(side, m, n, &v, 1, tau, &mut got, ldc, &mut work);
                    let mut got_x = c.clone();
                    lapack.dlarfx(side, m, n, &v, tau, &mut got_x, ldc, &mut work);

                    // Negative increment over a reversed copy of v.
                    let rev: Vec<f64> = v.iter().rev().copied().collect();
                    let mut got_neg = c.clone();
                    lapack.dlarf(side, m, n, &rev, -1, tau, &mut got_neg, ldc, &mut work);

                    for i in 0..m {
                        for j in 0..n {
                            let w = want[i * n + j];
                            assert!((got[i * ldc + j] - w).abs() < 1e-14, "dlarf {:?} {}x{}", side, m, n);
                            assert!((got_x[i * ldc + j] - w).abs() < 1e-14, "dlarfx {:?} {}x{}", side, m, n);
                            assert!((got_neg[i * ldc + j] - w).abs() < 1e-14, "dlarf inc -1 {:?}", side);
                        }
                    }
                    assert!(outside_all_nan(m, n, &got, ldc));
                }
            }
        }
    }

    /// Reflectors for the Forward/Backward × Columnwise/Rowwise layouts with
    /// the implied unit entries and zeros filled in, so V can be compared
    /// against explicit products.
    fn explicit_v(direct: Direct, store: StoreV, n: usize, k: usize, v: &[f64], ldv: usize) -> Vec<Vec<f64>> {
        (0..k)
            .map(|i| {
                (0..n)
                    .map(|r| {
                        let unit = if direct == Direct::Forward { i } else { n - k + i };
                        let stored = if store == StoreV::Columnwise { v[r * ldv + i] } else { v[i * ldv + r] };
                        match direct {
                            _ if r == unit => 1.0,
                            Direct::Forward if r < unit => 0.0,
                            Direct::Backward if r > unit => 0.0,
                            _ => stored,
                        }
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_dlarft_reproduces_product() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(12);
        for direct in [Direct::Forward, Direct::Backward] {
            for store in [StoreV::Columnwise, StoreV::Rowwise] {
                for &(n, k) in &[(6usize, 3usize), (5, 5), (8, 1), (4, 2)] {
                    let (vr, vc) = if store == StoreV::Columnwise { (n, k) } else { (k, n) };
                    let ldv = vc + 2;
                    let v = random_general(vr, vc, ldv, &mut rng);
                    let mut tau: Vec<f64> = (0..k).map(|_| rng.gen_range(0.5..1.5)).collect();
                    if k > 2 {
                        tau[1] = 0.0;
                    }
                    let ldt = k + 1;
                    let mut t = nan_slice(k * ldt);
                    lapack.dlarft(direct, store, n, k, &v, ldv, &tau, &mut t, ldt);

                    // H = H(0) H(1) ... H(k-1) for Forward, reversed for Backward.
                    let vs = explicit_v(direct, store, n, k, &v, ldv);
                    let mut h = eye(n);
                    for i in 0..k {
                        let hi = reflector(n, &vs[i], tau[i]);
                        h = if direct == Direct::Forward { matmul(n, &h, &hi) } else { matmul(n, &hi, &h) };
                    }
                    // I - V T Vᵀ with V as n x k.
                    let mut vmat = vec![0.0; n * k];
                    for i in 0..k {
                        for r in 0..n {
                            vmat[r * k + i] = vs[i][r];
                        }
                    }
                    let mut tmat = vec![0.0; k * k];
                    for i in 0..k {
                        for j in 0..k {
                            let keep = if direct == Direct::Forward { j >= i } else { j <= i };
                            if keep {
                                tmat[i * k + j] = t[i * ldt + j];
                            }
                        }
                    }
                    let vt = matmul_dims(n, k, k, &vmat, &tmat);
                    let mut block = eye(n);
                    for i in 0..n {
                        for j in 0..n {
                            let s: f64 = (0..k).map(|l| vt[i * k + l] * vmat[j * k + l]).sum();
                            block[i * n + j] -= s;
                        }
                    }
                    for (got, want) in block.iter().zip(&h) {
                        assert!((got - want).abs() < 1e-13, "{:?} {:?} n={} k={}", direct, store, n, k);
                    }
                }
            }
        }
    }

    #[test]
    fn test_dlarfb_matches_reflector_sequence() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(13);
        for side in [Side::Left, Side::Right] {
            for trans in [Transpose::NoTrans, Transpose::Trans] {
                for &(m, n, k) in &[(6usize, 4usize, 3usize), (4, 6, 2), (5, 5, 5), (7, 3, 1)] {
                    let order = if side == Side::Left { m } else { n };
                    if k > order {
                        continue;
                    }
                    let ldv = k + 1;
                    let v = random_general(order, k, ldv, &mut rng);
                    let tau: Vec<f64> = (0..k).map(|_| rng.gen_range(0.5..1.5)).collect();
                    let mut t = vec![0.0; k * k];
                    lapack.dlarft(Direct::Forward, StoreV::Columnwise, order, k, &v, ldv, &tau, &mut t, k);

                    let ldc = n + 3;
                    let c = random_general(m, n, ldc, &mut rng);
                    let wrows = if side == Side::Left { n } else { m };
                    let ldwork = k + 2;
                    let mut work = vec![0.0; wrows * ldwork];
                    let mut got = c.clone();
                    lapack.dlarfb(
                        side, trans, Direct::Forward, StoreV::Columnwise, m, n, k, &v, ldv, &t, k, &mut got, ldc,
                        &mut work, ldwork,
                    );

                    let vs = explicit_v(Direct::Forward, StoreV::Columnwise, order, k, &v, ldv);
                    let mut h = eye(order);
                    for i in 0..k {
                        h = matmul(order, &h, &reflector(order, &vs[i], tau[i]));
                    }
                    if trans.is_trans() {
                        h = transpose(order, &h);
                    }
                    let packed = pack(m, n, &c, ldc);
                    let want =
                        if side == Side::Left { matmul_dims(m, n, m, &h, &packed) } else { matmul_dims(m, n, n, &packed, &h) };
                    for i in 0..m {
                        for j in 0..n {
                            assert!(
                                (got[i * ldc + j] - want[i * n + j]).abs() < 1e-13,
                                "{:?} {:?} m={} n={} k={}",
                                side,
                                trans,
                                m,
                                n,
                                k
                            );
                        }
                    }
                    assert!(outside_all_nan(m, n, &got, ldc));
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "unsupported reflector direction or storage")]
    fn test_dlarfb_rejects_rowwise() {
        let lapack = Lapack::new();
        let mut c = [0.0; 4];
        let mut work = [0.0; 4];
        lapack.dlarfb(
            Side::Left,
            Transpose::NoTrans,
            Direct::Forward,
            StoreV::Rowwise,
            2,
            2,
            1,
            &[1.0; 4],
            2,
            &[1.0],
            1,
            &mut c,
            2,
            &mut work,
            2,
        );
    }
}
