//! Reduction of a general matrix to upper Hessenberg form, `Qᵀ A Q = H`,
//! and application of the orthogonal factors of QR and Hessenberg
//! reductions.
//!
//! Q is stored as `H(ilo) ... H(ihi-1)`. Reflector i has `v[..=i] = 0`,
//! `v[i+1] = 1`, `v[ihi+1..] = 0`, and `v[i+2..=ihi]` stored in
//! `A[i+2..=ihi, i]`.

use crate::flags::{Direct, StoreV};
use crate::tuning::{self, Routine};
use crate::views;
use crate::{Blas64, Diag, Lapack, Part, Side, Transpose, Uplo, Work};
use densrus_core::{matrix_len, require, Precondition};
use log::debug;

/// Largest block size the blocked routines use.
const NBMAX: usize = 64;
/// Leading dimension of the T factor kept at the front or back of `work`.
const LDT: usize = NBMAX + 1;
/// Workspace taken by the T factor.
const TSIZE: usize = LDT * NBMAX;

impl<B: Blas64> Lapack<B> {
    // ========================================================================
    // Hessenberg reduction
    // ========================================================================

    /// Unblocked Hessenberg reduction of rows and columns `ilo..=ihi`.
    ///
    /// A is assumed upper triangular outside that range, as left by
    /// balancing. `tau` needs `n-1` entries, `work` needs n.
    pub fn dgehd2(&self, n: usize, ilo: usize, ihi: usize, a: &mut [f64], lda: usize, tau: &mut [f64], work: &mut [f64]) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        if n == 0 {
            return;
        }
        require!(ilo <= ihi && ihi < n, Precondition::BadIloIhi);
        require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
        require!(tau.len() >= n - 1, Precondition::ShortTau);
        require!(work.len() >= n, Precondition::ShortWork);

        for i in ilo..ihi {
            // Annihilate A[i+2..=ihi, i].
            let (beta, t) = self.dlarfg(ihi - i, a[(i + 1) * lda + i], &mut a[(i + 2).min(n - 1) * lda + i..], lda as isize);
            tau[i] = t;
            let mut v = views::column(a, lda, i + 1, ihi - i, i);
            v[0] = 1.0;
            // A[..=ihi, i+1..=ihi] := A H(i)
            self.dlarf(Side::Right, ihi + 1, ihi - i, &v, 1, t, &mut a[i + 1..], lda, work);
            // A[i+1..=ihi, i+1..] := H(i) A
            self.dlarf(Side::Left, ihi - i, n - i - 1, &v, 1, t, &mut a[(i + 1) * lda + i + 1..], lda, work);
            a[(i + 1) * lda + i] = beta;
        }
    }

    /// Reduce the first `nb` columns of the `n x (n-k+1)` matrix A so that
    /// entries below the k-th subdiagonal are zero, the panel step of
    /// [`dgehrd`](Self::dgehrd).
    ///
    /// Returns the block reflector `I - V T Vᵀ` with V in the reduced columns
    /// below row k and T in `t`, and also `Y = A V T` in the `n x nb` matrix
    /// `y`.
    pub fn dlahr2(
        &self,
        n: usize,
        k: usize,
        nb: usize,
        a: &mut [f64],
        lda: usize,
        tau: &mut [f64],
        t: &mut [f64],
        ldt: usize,
        y: &mut [f64],
        ldy: usize,
    ) {
        require!(k <= n, Precondition::BadK);
        require!(nb <= n, Precondition::BadBlockSize);
        require!(lda >= (n - k + 1).max(1), Precondition::BadLdA);
        require!(ldt >= nb.max(1), Precondition::BadLdT);
        require!(ldy >= nb.max(1), Precondition::BadLdWork);
        if n <= 1 || nb == 0 {
            return;
        }
        require!(a.len() >= (n - 1) * lda + n - k + 1, Precondition::ShortA);
        require!(tau.len() >= nb, Precondition::ShortTau);
        require!(t.len() >= matrix_len(nb, nb, ldt), Precondition::ShortT);
        require!(y.len() >= matrix_len(n, nb, ldy), Precondition::ShortWork);

        let blas = &self.blas;
        let mut ei = 0.0;
        for i in 0..nb {
            if i > 0 {
                // Update column i: b := A[k.., i] - Y[k.., ..i] * A[k+i-1, ..i]ᵀ
                let mut b = views::column(a, lda, k, n - k, i);
                blas.dgemv(Transpose::NoTrans, n - k, i, -1.0, &y[k * ldy..], ldy, &a[(k + i - 1) * lda..], 1, 1.0, &mut b, 1);

                // Apply I - V Tᵀ Vᵀ to b from the left, with V = [V1; V2]
                // split after row i and V1 unit lower triangular.
                // w := V1ᵀ b1 + V2ᵀ b2
                let mut w = b[..i].to_vec();
                blas.dtrmv(Uplo::Lower, Transpose::Trans, Diag::Unit, i, &a[k * lda..], lda, &mut w, 1);
                blas.dgemv(Transpose::Trans, n - k - i, i, 1.0, &a[(k + i) * lda..], lda, &b[i..], 1, 1.0, &mut w, 1);
                // w := Tᵀ w
                blas.dtrmv(Uplo::Upper, Transpose::Trans, Diag::NonUnit, i, t, ldt, &mut w, 1);
                // b2 -= V2 w ; b1 -= V1 w
                blas.dgemv(Transpose::NoTrans, n - k - i, i, -1.0, &a[(k + i) * lda..], lda, &w, 1, 1.0, &mut b[i..], 1);
                blas.dtrmv(Uplo::Lower, Transpose::NoTrans, Diag::Unit, i, &a[k * lda..], lda, &mut w, 1);
                blas.daxpy(i, -1.0, &w, 1, &mut b, 1);
                views::set_column(a, lda, k, i, &b);

                a[(k + i - 1) * lda + i - 1] = ei;
            }

            // Annihilate A[k+i+1.., i].
            let (beta, tau_i) =
                self.dlarfg(n - k - i, a[(k + i) * lda + i], &mut a[(k + i + 1).min(n - 1) * lda + i..], lda as isize);
            ei = beta;
            tau[i] = tau_i;
            a[(k + i) * lda + i] = 1.0;
            let v = views::column(a, lda, k + i, n - k - i, i);

            // Y[k.., i] := tau * (A[k.., i+1..] v - Y[k.., ..i] (V2ᵀ v))
            let mut ycol = vec![0.0; n - k];
            blas.dgemv(Transpose::NoTrans, n - k, n - k - i, 1.0, &a[k * lda + i + 1..], lda, &v, 1, 0.0, &mut ycol, 1);
            let mut tcol = vec![0.0; i];
            blas.dgemv(Transpose::Trans, n - k - i, i, 1.0, &a[(k + i) * lda..], lda, &v, 1, 0.0, &mut tcol, 1);
            blas.dgemv(Transpose::NoTrans, n - k, i, -1.0, &y[k * ldy..], ldy, &tcol, 1, 1.0, &mut ycol, 1);
            blas.dscal(n - k, tau_i, &mut ycol, 1);
            views::set_column(y, ldy, k, i, &ycol);

            // T[..i, i] := -tau * T[..i, ..i] (V2ᵀ v)
            blas.dscal(i, -tau_i, &mut tcol, 1);
            blas.dtrmv(Uplo::Upper, Transpose::NoTrans, Diag::NonUnit, i, t, ldt, &mut tcol, 1);
            views::set_column(t, ldt, 0, i, &tcol);
            t[i * ldt + i] = tau_i;
        }
        a[(k + nb - 1) * lda + nb - 1] = ei;

        // Y[..k, ..nb] := A[..k, 1..] V T
        self.dlacpy(Part::All, k, nb, &a[1..], lda, y, ldy);
        blas.dtrmm(Side::Right, Uplo::Lower, Transpose::NoTrans, Diag::Unit, k, nb, 1.0, &a[k * lda..], lda, y, ldy);
        if n > k + nb {
            blas.dgemm(
                Transpose::NoTrans,
                Transpose::NoTrans,
                k,
                nb,
                n - k - nb,
                1.0,
                &a[1 + nb..],
                lda,
                &a[(k + nb) * lda..],
                lda,
                1.0,
                y,
                ldy,
            );
        }
        blas.dtrmm(Side::Right, Uplo::Upper, Transpose::NoTrans, Diag::NonUnit, k, nb, 1.0, t, ldt, y, ldy);
    }

    /// Blocked Hessenberg reduction of rows and columns `ilo..=ihi`.
    ///
    /// Output storage is that of [`dgehd2`](Self::dgehd2); `tau[..ilo]` and
    /// `tau[ihi..]` are set to zero. The workspace minimum is `max(1, n)`.
    pub fn dgehrd(&self, n: usize, ilo: usize, ihi: usize, a: &mut [f64], lda: usize, tau: &mut [f64], work: Work<'_>) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        if n > 0 {
            require!(ilo <= ihi && ihi < n, Precondition::BadIloIhi);
        }
        let mut nb = tuning::block_size(Routine::Gehrd).min(NBMAX);
        let optimal = if n == 0 { 1 } else { n * nb + TSIZE };
        let Some(work) = work.resolve(optimal, n.max(1)) else {
            return;
        };
        if n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
        require!(tau.len() >= n - 1, Precondition::ShortTau);

        tau[..ilo].fill(0.0);
        tau[ihi..n - 1].fill(0.0);
        let nh = ihi - ilo + 1;
        if nh <= 1 {
            return;
        }

        let mut nbmin = 2;
        let mut nx = 0;
        if nb > 1 && nb < nh {
            nx = nb.max(tuning::crossover(Routine::Gehrd));
            if nx < nh && work.len() < n * nb + TSIZE {
                nbmin = tuning::min_block_size(Routine::Gehrd).max(2);
                nb = if work.len() >= n * nbmin + TSIZE { (work.len() - TSIZE) / n } else { 1 };
            }
        }

        let mut i = ilo;
        if nb >= nbmin && nb < nh && nx < nh {
            debug!("dgehrd: n={} ilo={} ihi={} nb={} nx={}", n, ilo, ihi, nb, nx);
            let blas = &self.blas;
            // Y is n x nb at the front of work, T follows it.
            let ldy = nb;
            let (y, t) = work.split_at_mut(n * nb);
            while i + nx + 1 < ihi {
                let ib = nb.min(ihi - i);
                self.dlahr2(ihi + 1, i + 1, ib, &mut a[i..], lda, &mut tau[i..], t, LDT, y, ldy);

                // V, unit lower trapezoidal, from rows i+1..=ihi of the panel.
                let mut v = views::block(a, lda, i + 1, i, ihi - i, ib);
                for r in 0..ib {
                    v[r * ib + r] = 1.0;
                    v[r * ib + r + 1..(r + 1) * ib].fill(0.0);
                }

                // A[..=ihi, i+ib..=ihi] -= Y Vᵀ
                blas.dgemm(
                    Transpose::NoTrans,
                    Transpose::Trans,
                    ihi + 1,
                    ihi - i - ib + 1,
                    ib,
                    -1.0,
                    y,
                    ldy,
                    &v[(ib - 1) * ib..],
                    ib,
                    1.0,
                    &mut a[i + ib..],
                    lda,
                );
                // A[..=i, i+1..i+ib] -= Y[..=i, ..ib-1] V1ᵀ
                blas.dtrmm(Side::Right, Uplo::Lower, Transpose::Trans, Diag::Unit, i + 1, ib - 1, 1.0, &v, ib, y, ldy);
                for j in 0..ib - 1 {
                    blas.daxpy(i + 1, -1.0, &y[j..], ldy as isize, &mut a[i + j + 1..], lda as isize);
                }
                // A[i+1..=ihi, i+ib..] := Hᵀ A
                self.dlarfb(
                    Side::Left,
                    Transpose::Trans,
                    Direct::Forward,
                    StoreV::Columnwise,
                    ihi - i,
                    n - i - ib,
                    ib,
                    &v,
                    ib,
                    t,
                    LDT,
                    &mut a[(i + 1) * lda + i + ib..],
                    lda,
                    y,
                    ldy,
                );
                i += nb;
            }
        }
        self.dgehd2(n, i, ihi, a, lda, tau, work);
    }

    // ========================================================================
    // Applying Q
    // ========================================================================

    /// Overwrite the `m x n` matrix C with `Q C`, `Qᵀ C`, `C Q` or `C Qᵀ`,
    /// where `Q = H(0) ... H(k-1)` holds the reflectors `dgeqrf` stores in
    /// the first k columns of A (`m x k` from the Left, `n x k` from the
    /// Right). `work` needs n entries (Left) or m (Right).
    pub fn dorm2r(
        &self,
        side: Side,
        trans: Transpose,
        m: usize,
        n: usize,
        k: usize,
        a: &[f64],
        lda: usize,
        tau: &[f64],
        c: &mut [f64],
        ldc: usize,
        work: &mut [f64],
    ) {
        let left = side == Side::Left;
        let (nq, nw) = if left { (m, n) } else { (n, m) };
        require!(k <= nq, Precondition::BadK);
        require!(lda >= k.max(1), Precondition::BadLdA);
        require!(ldc >= n.max(1), Precondition::BadLdC);
        if m == 0 || n == 0 || k == 0 {
            return;
        }
        require!(a.len() >= matrix_len(nq, k, lda), Precondition::ShortA);
        require!(tau.len() >= k, Precondition::ShortTau);
        require!(c.len() >= matrix_len(m, n, ldc), Precondition::ShortC);
        require!(work.len() >= nw, Precondition::ShortWork);

        let mut order: Vec<usize> = (0..k).collect();
        if left != trans.is_trans() {
            order.reverse();
        }
        for i in order {
            let mut v = views::column(a, lda, i, nq - i, i);
            v[0] = 1.0;
            if left {
                self.dlarf(side, m - i, n, &v, 1, tau[i], &mut c[i * ldc..], ldc, work);
            } else {
                self.dlarf(side, m, n - i, &v, 1, tau[i], &mut c[i..], ldc, work);
            }
        }
    }

    /// Blocked [`dorm2r`](Self::dorm2r). The workspace minimum is
    /// `max(1, n)` from the Left and `max(1, m)` from the Right.
    pub fn dormqr(
        &self,
        side: Side,
        trans: Transpose,
        m: usize,
        n: usize,
        k: usize,
        a: &[f64],
        lda: usize,
        tau: &[f64],
        c: &mut [f64],
        ldc: usize,
        work: Work<'_>,
    ) {
        let left = side == Side::Left;
        let (nq, nw) = if left { (m, n) } else { (n, m) };
        require!(k <= nq, Precondition::BadK);
        require!(lda >= k.max(1), Precondition::BadLdA);
        require!(ldc >= n.max(1), Precondition::BadLdC);
        let mut nb = tuning::block_size(Routine::Ormqr).min(NBMAX);
        let Some(work) = work.resolve(nw.max(1) * nb + TSIZE, nw.max(1)) else {
            return;
        };
        if m == 0 || n == 0 || k == 0 {
            return;
        }
        require!(a.len() >= matrix_len(nq, k, lda), Precondition::ShortA);
        require!(tau.len() >= k, Precondition::ShortTau);
        require!(c.len() >= matrix_len(m, n, ldc), Precondition::ShortC);

        let mut nbmin = 2;
        if nb > 1 && nb < k && work.len() < nw * nb + TSIZE {
            nb = work.len().saturating_sub(TSIZE) / nw;
            nbmin = tuning::min_block_size(Routine::Ormqr).max(2);
        }
        if nb < nbmin || nb >= k {
            self.dorm2r(side, trans, m, n, k, a, lda, tau, c, ldc, work);
            return;
        }
        debug!("dormqr: m={} n={} k={} nb={}", m, n, k, nb);

        let (t, rest) = work.split_at_mut(TSIZE);
        let mut blocks: Vec<usize> = (0..k).step_by(nb).collect();
        if left != trans.is_trans() {
            blocks.reverse();
        }
        for i in blocks {
            let ib = nb.min(k - i);
            let v = &a[i * lda + i..];
            self.dlarft(Direct::Forward, StoreV::Columnwise, nq - i, ib, v, lda, &tau[i..], t, LDT);
            if left {
                self.dlarfb(
                    side,
                    trans,
                    Direct::Forward,
                    StoreV::Columnwise,
                    m - i,
                    n,
                    ib,
                    v,
                    lda,
                    t,
                    LDT,
                    &mut c[i * ldc..],
                    ldc,
                    rest,
                    nb,
                );
            } else {
                self.dlarfb(
                    side,
                    trans,
                    Direct::Forward,
                    StoreV::Columnwise,
                    m,
                    n - i,
                    ib,
                    v,
                    lda,
                    t,
                    LDT,
                    &mut c[i..],
                    ldc,
                    rest,
                    nb,
                );
            }
        }
    }

    /// Overwrite the `m x n` matrix C with `Q C`, `Qᵀ C`, `C Q` or `C Qᵀ`,
    /// where Q is the orthogonal factor of the Hessenberg reduction computed
    /// by [`dgehrd`](Self::dgehrd) with the same `ilo` and `ihi`.
    pub fn dormhr(
        &self,
        side: Side,
        trans: Transpose,
        m: usize,
        n: usize,
        ilo: usize,
        ihi: usize,
        a: &[f64],
        lda: usize,
        tau: &[f64],
        c: &mut [f64],
        ldc: usize,
        work: Work<'_>,
    ) {
        let left = side == Side::Left;
        let (nq, nw) = if left { (m, n) } else { (n, m) };
        if nq > 0 {
            require!(ilo <= ihi && ihi < nq, Precondition::BadIloIhi);
        }
        require!(lda >= nq.max(1), Precondition::BadLdA);
        require!(ldc >= n.max(1), Precondition::BadLdC);
        let nb = tuning::block_size(Routine::Ormqr).min(NBMAX);
        let Some(work) = work.resolve(nw.max(1) * nb + TSIZE, nw.max(1)) else {
            return;
        };
        let nh = if nq > 0 { ihi - ilo } else { 0 };
        if m == 0 || n == 0 || nh == 0 {
            return;
        }
        require!(a.len() >= matrix_len(nq, nq, lda), Precondition::ShortA);
        require!(tau.len() >= nq - 1, Precondition::ShortTau);
        require!(c.len() >= matrix_len(m, n, ldc), Precondition::ShortC);

        let v = &a[(ilo + 1) * lda + ilo..];
        if left {
            self.dormqr(side, trans, nh, n, nh, v, lda, &tau[ilo..ihi], &mut c[(ilo + 1) * ldc..], ldc, Work::Execute(work));
        } else {
            self.dormqr(side, trans, m, nh, nh, v, lda, &tau[ilo..ihi], &mut c[ilo + 1..], ldc, Work::Execute(work));
        }
    }
}
