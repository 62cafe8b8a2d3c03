//! Reduction of a symmetric matrix to tridiagonal form, `Qᵀ A Q = T`.
//!
//! Q is never formed. With Upper, `Q = H(n-2) ... H(0)` and reflector i has
//! `v[i+1..] = 0`, `v[i] = 1`, with `v[..i]` stored in `A[..i, i+1]`. With
//! Lower, `Q = H(0) ... H(n-2)` and reflector i has `v[..=i] = 0`,
//! `v[i+1] = 1`, with `v[i+2..]` stored in `A[i+2.., i]`. `dorgtr` builds Q
//! from that storage.

use crate::tuning::{self, Routine};
use crate::views;
use crate::{Blas64, Lapack, Transpose, Uplo, Work};
use densrus_core::{matrix_len, require, Precondition};
use log::debug;

impl<B: Blas64> Lapack<B> {
    /// Unblocked tridiagonal reduction.
    ///
    /// On return the diagonal and first super- (Upper) or sub-diagonal
    /// (Lower) of A hold T, `d` and `e` hold copies of them, and the rest
    /// of the referenced triangle holds the reflectors with scalars in `tau`.
    pub fn dsytd2(&self, uplo: Uplo, n: usize, a: &mut [f64], lda: usize, d: &mut [f64], e: &mut [f64], tau: &mut [f64]) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        if n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
        require!(d.len() >= n, Precondition::ShortD);
        require!(e.len() >= n - 1, Precondition::ShortE);
        require!(tau.len() >= n - 1, Precondition::ShortTau);
        let blas = &self.blas;
        let ldai = lda as isize;

        if uplo == Uplo::Upper {
            // Reduce the upper triangle, last column first.
            for i in (0..n - 1).rev() {
                // Annihilate A[..i, i+1].
                let (beta, taui) = self.dlarfg(i + 1, a[i * lda + i + 1], &mut a[i + 1..], ldai);
                e[i] = beta;
                a[i * lda + i + 1] = beta;
                if taui != 0.0 {
                    let mut v = views::column(a, lda, 0, i + 1, i + 1);
                    v[i] = 1.0;
                    // x := taui * A * v, stored in tau[..=i]
                    blas.dsymv(uplo, i + 1, taui, a, lda, &v, 1, 0.0, tau, 1);
                    // w := x - 1/2 * taui * (xᵀ v) * v
                    let alpha = -0.5 * taui * blas.ddot(i + 1, tau, 1, &v, 1);
                    blas.daxpy(i + 1, alpha, &v, 1, tau, 1);
                    // A := A - v wᵀ - w vᵀ
                    blas.dsyr2(uplo, i + 1, -1.0, &v, 1, tau, 1, a, lda);
                }
                d[i + 1] = a[(i + 1) * lda + i + 1];
                tau[i] = taui;
            }
            d[0] = a[0];
            return;
        }

        // Reduce the lower triangle, first column first.
        for i in 0..n - 1 {
            // Annihilate A[i+2.., i].
            let x0 = (i + 2).min(n - 1) * lda + i;
            let (beta, taui) = self.dlarfg(n - i - 1, a[(i + 1) * lda + i], &mut a[x0..], ldai);
            e[i] = beta;
            a[(i + 1) * lda + i] = beta;
            if taui != 0.0 {
                let m = n - i - 1;
                let mut v = views::column(a, lda, i + 1, m, i);
                v[0] = 1.0;
                let sub = (i + 1) * lda + i + 1;
                let w = &mut tau[i..];
                blas.dsymv(uplo, m, taui, &a[sub..], lda, &v, 1, 0.0, w, 1);
                let alpha = -0.5 * taui * blas.ddot(m, w, 1, &v, 1);
                blas.daxpy(m, alpha, &v, 1, w, 1);
                blas.dsyr2(uplo, m, -1.0, &v, 1, w, 1, &mut a[sub..], lda);
            }
            d[i] = a[i * lda + i];
            tau[i] = taui;
        }
        d[n - 1] = a[(n - 1) * lda + n - 1];
    }

    /// Reduce `nb` rows and columns of a symmetric matrix to tridiagonal
    /// form and return the `n x nb` matrix W needed to update the rest,
    /// `A := A - V Wᵀ - W Vᵀ`.
    ///
    /// With Upper the last nb columns are reduced, with Lower the first nb.
    /// The off-diagonal entry of each reduced column is set to 1 so that V
    /// can be read straight out of A; `e` keeps the true values.
    pub fn dlatrd(
        &self,
        uplo: Uplo,
        n: usize,
        nb: usize,
        a: &mut [f64],
        lda: usize,
        e: &mut [f64],
        tau: &mut [f64],
        w: &mut [f64],
        ldw: usize,
    ) {
        require!(nb <= n, Precondition::BadBlockSize);
        require!(lda >= n.max(1), Precondition::BadLdA);
        require!(ldw >= nb.max(1), Precondition::BadLdWork);
        if n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
        require!(w.len() >= matrix_len(n, nb, ldw), Precondition::ShortWork);
        require!(e.len() >= n - 1, Precondition::ShortE);
        require!(tau.len() >= n - 1, Precondition::ShortTau);
        let blas = &self.blas;
        let ldai = lda as isize;

        if uplo == Uplo::Upper {
            for i in (n - nb..n).rev() {
                let iw = i + nb - n;
                let m = n - i - 1;
                if i < n - 1 {
                    // Update A[..=i, i].
                    let mut col = views::column(a, lda, 0, i + 1, i);
                    blas.dgemv(Transpose::NoTrans, i + 1, m, -1.0, &a[i + 1..], lda, &w[i * ldw + iw + 1..], 1, 1.0, &mut col, 1);
                    blas.dgemv(Transpose::NoTrans, i + 1, m, -1.0, &w[iw + 1..], ldw, &a[i * lda + i + 1..], 1, 1.0, &mut col, 1);
                    views::set_column(a, lda, 0, i, &col);
                }
                if i == 0 {
                    continue;
                }
                // Annihilate A[..i-1, i].
                let (beta, taui) = self.dlarfg(i, a[(i - 1) * lda + i], &mut a[i..], ldai);
                e[i - 1] = beta;
                tau[i - 1] = taui;
                a[(i - 1) * lda + i] = 1.0;
                let v = views::column(a, lda, 0, i, i);

                // W[..i, iw]
                let mut wcol = vec![0.0; i];
                blas.dsymv(Uplo::Upper, i, 1.0, a, lda, &v, 1, 0.0, &mut wcol, 1);
                if i < n - 1 {
                    let mut tmp = vec![0.0; m];
                    blas.dgemv(Transpose::Trans, i, m, 1.0, &w[iw + 1..], ldw, &v, 1, 0.0, &mut tmp, 1);
                    blas.dgemv(Transpose::NoTrans, i, m, -1.0, &a[i + 1..], lda, &tmp, 1, 1.0, &mut wcol, 1);
                    blas.dgemv(Transpose::Trans, i, m, 1.0, &a[i + 1..], lda, &v, 1, 0.0, &mut tmp, 1);
                    blas.dgemv(Transpose::NoTrans, i, m, -1.0, &w[iw + 1..], ldw, &tmp, 1, 1.0, &mut wcol, 1);
                    views::set_column(w, ldw, i + 1, iw, &tmp);
                }
                blas.dscal(i, taui, &mut wcol, 1);
                let alpha = -0.5 * taui * blas.ddot(i, &wcol, 1, &v, 1);
                blas.daxpy(i, alpha, &v, 1, &mut wcol, 1);
                views::set_column(w, ldw, 0, iw, &wcol);
            }
            return;
        }

        for i in 0..nb {
            // Update A[i.., i].
            let mut col = views::column(a, lda, i, n - i, i);
            blas.dgemv(Transpose::NoTrans, n - i, i, -1.0, &a[i * lda..], lda, &w[i * ldw..], 1, 1.0, &mut col, 1);
            blas.dgemv(Transpose::NoTrans, n - i, i, -1.0, &w[i * ldw..], ldw, &a[i * lda..], 1, 1.0, &mut col, 1);
            views::set_column(a, lda, i, i, &col);
            if i == n - 1 {
                continue;
            }
            // Annihilate A[i+2.., i].
            let m = n - i - 1;
            let x0 = (i + 2).min(n - 1) * lda + i;
            let (beta, taui) = self.dlarfg(m, a[(i + 1) * lda + i], &mut a[x0..], ldai);
            e[i] = beta;
            tau[i] = taui;
            a[(i + 1) * lda + i] = 1.0;
            let v = views::column(a, lda, i + 1, m, i);

            // W[i+1.., i]
            let mut wcol = vec![0.0; m];
            let sub = (i + 1) * lda + i + 1;
            blas.dsymv(Uplo::Lower, m, 1.0, &a[sub..], lda, &v, 1, 0.0, &mut wcol, 1);
            let mut tmp = vec![0.0; i];
            blas.dgemv(Transpose::Trans, m, i, 1.0, &w[(i + 1) * ldw..], ldw, &v, 1, 0.0, &mut tmp, 1);
            blas.dgemv(Transpose::NoTrans, m, i, -1.0, &a[(i + 1) * lda..], lda, &tmp, 1, 1.0, &mut wcol, 1);
            blas.dgemv(Transpose::Trans, m, i, 1.0, &a[(i + 1) * lda..], lda, &v, 1, 0.0, &mut tmp, 1);
            blas.dgemv(Transpose::NoTrans, m, i, -1.0, &w[(i + 1) * ldw..], ldw, &tmp, 1, 1.0, &mut wcol, 1);
            views::set_column(w, ldw, 0, i, &tmp);
            blas.dscal(m, taui, &mut wcol, 1);
            let alpha = -0.5 * taui * blas.ddot(m, &wcol, 1, &v, 1);
            blas.daxpy(m, alpha, &v, 1, &mut wcol, 1);
            views::set_column(w, ldw, i + 1, i, &wcol);
        }
    }

    /// Blocked tridiagonal reduction.
    ///
    /// Panels of `nb` columns are reduced with `dlatrd` and the trailing
    /// matrix is updated with one `dsyr2k` per panel. The remainder below
    /// the crossover point goes through `dsytd2`. Output storage is the same
    /// as [`dsytd2`](Self::dsytd2). Any workspace of at least one entry
    /// works; the optimum is `n * nb`.
    pub fn dsytrd(
        &self,
        uplo: Uplo,
        n: usize,
        a: &mut [f64],
        lda: usize,
        d: &mut [f64],
        e: &mut [f64],
        tau: &mut [f64],
        work: Work<'_>,
    ) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        let mut nb = tuning::block_size(Routine::Sytrd);
        let Some(work) = work.resolve((n * nb).max(1), 1) else {
            return;
        };
        if n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
        require!(d.len() >= n, Precondition::ShortD);
        require!(e.len() >= n - 1, Precondition::ShortE);
        require!(tau.len() >= n - 1, Precondition::ShortTau);

        let mut nx = n;
        if nb > 1 && nb < n {
            // Crossover point below which the unblocked code is used.
            nx = nb.max(tuning::crossover(Routine::Sytrd));
            if nx < n && work.len() < n * nb {
                nb = (work.len() / n).max(1);
                if nb < tuning::min_block_size(Routine::Sytrd) {
                    nx = n;
                }
            }
        } else {
            nb = 1;
        }
        if nx >= n {
            self.dsytd2(uplo, n, a, lda, d, e, tau);
            return;
        }
        debug!("dsytrd: n={} nb={} nx={}", n, nb, nx);

        // W is (rows x nb) with leading dimension nb.
        let ldw = nb;
        let blas = &self.blas;
        if uplo == Uplo::Upper {
            let kk = n - ((n - nx + nb - 1) / nb) * nb;
            let mut i = n - nb;
            loop {
                // Reduce columns i..i+nb and form W for the update.
                self.dlatrd(uplo, i + nb, nb, a, lda, e, tau, work, ldw);
                // A[..i, ..i] -= V Wᵀ + W Vᵀ
                let v = views::block(a, lda, 0, i, i, nb);
                blas.dsyr2k(uplo, Transpose::NoTrans, i, nb, -1.0, &v, nb, work, ldw, 1.0, a, lda);
                for j in i..i + nb {
                    a[(j - 1) * lda + j] = e[j - 1];
                    d[j] = a[j * lda + j];
                }
                if i < kk + nb {
                    break;
                }
                i -= nb;
            }
            self.dsytd2(uplo, kk, a, lda, d, e, tau);
            return;
        }

        let mut i = 0;
        while i < n - nx {
            self.dlatrd(uplo, n - i, nb, &mut a[i * lda + i..], lda, &mut e[i..], &mut tau[i..], work, ldw);
            // A[i+nb.., i+nb..] -= V Wᵀ + W Vᵀ
            let rest = n - i - nb;
            let v = views::block(a, lda, i + nb, i, rest, nb);
            blas.dsyr2k(
                uplo,
                Transpose::NoTrans,
                rest,
                nb,
                -1.0,
                &v,
                nb,
                &work[nb * ldw..],
                ldw,
                1.0,
                &mut a[(i + nb) * lda + i + nb..],
                lda,
            );
            for j in i..i + nb {
                a[(j + 1) * lda + j] = e[j];
                d[j] = a[j * lda + j];
            }
            i += nb;
        }
        self.dsytd2(uplo, n - i, &mut a[i * lda + i..], lda, &mut d[i..], &mut e[i..], &mut tau[i..]);
    }
}
