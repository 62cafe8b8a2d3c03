//! Householder QR factorization.

use crate::tuning::{self, Routine};
use crate::views;
use crate::{Blas64, Direct, Lapack, Side, StoreV, Transpose, Work};
use densrus_core::{matrix_len, require, Precondition};
use log::debug;

impl<B: Blas64> Lapack<B> {
    /// Unblocked QR factorization `A = Q R` of the `m x n` matrix A.
    ///
    /// On return the upper trapezoid of A holds R. Below the diagonal,
    /// column i holds reflector i with its unit leading entry implied, and
    /// `Q = H(0) H(1) ... H(k-1)` with `k = min(m, n)`. `work` needs n
    /// entries.
    pub fn dgeqr2(&self, m: usize, n: usize, a: &mut [f64], lda: usize, tau: &mut [f64], work: &mut [f64]) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        let k = m.min(n);
        if k == 0 {
            return;
        }
        require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
        require!(tau.len() >= k, Precondition::ShortTau);
        require!(work.len() >= n, Precondition::ShortWork);

        for i in 0..k {
            // Annihilate A[i+1.., i].
            let x0 = (i + 1).min(m - 1) * lda + i;
            let (beta, taui) = self.dlarfg(m - i, a[i * lda + i], &mut a[x0..], lda as isize);
            a[i * lda + i] = beta;
            tau[i] = taui;
            if i + 1 < n {
                let mut v = views::column(a, lda, i, m - i, i);
                v[0] = 1.0;
                self.dlarf(Side::Left, m - i, n - i - 1, &v, 1, taui, &mut a[i * lda + i + 1..], lda, work);
            }
        }
    }

    /// Blocked QR factorization with the output storage of
    /// [`dgeqr2`](Self::dgeqr2).
    ///
    /// Panels of nb columns are factored unblocked and applied to the
    /// trailing columns as one block reflector. The workspace minimum is
    /// `max(1, n)`; the optimum is `n * nb`.
    pub fn dgeqrf(&self, m: usize, n: usize, a: &mut [f64], lda: usize, tau: &mut [f64], work: Work<'_>) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        let mut nb = tuning::block_size(Routine::Geqrf);
        let Some(work) = work.resolve((n * nb).max(1), n.max(1)) else {
            return;
        };
        let k = m.min(n);
        if k == 0 {
            return;
        }
        require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
        require!(tau.len() >= k, Precondition::ShortTau);

        let mut nbmin = 2;
        let mut nx = 0;
        if nb > 1 && nb < k {
            nx = tuning::crossover(Routine::Geqrf);
            if nx < k && work.len() < n * nb {
                nb = work.len() / n;
                nbmin = tuning::min_block_size(Routine::Geqrf).max(2);
            }
        }

        let mut i = 0;
        if nb >= nbmin && nb < k && nx < k {
            debug!("dgeqrf: m={} n={} nb={} nx={}", m, n, nb, nx);
            // T (nb x nb) at the front of work, then W ((n - i - ib) x nb).
            let (t, w) = work.split_at_mut(nb * nb);
            while i < k - nx {
                let ib = nb.min(k - i);
                self.dgeqr2(m - i, ib, &mut a[i * lda + i..], lda, &mut tau[i..], w);
                if i + ib < n {
                    let v = views::block(a, lda, i, i, m - i, ib);
                    self.dlarft(Direct::Forward, StoreV::Columnwise, m - i, ib, &v, ib, &tau[i..], t, nb);
                    // A[i.., i+ib..] := Hᵀ A[i.., i+ib..]
                    self.dlarfb(
                        Side::Left,
                        Transpose::Trans,
                        Direct::Forward,
                        StoreV::Columnwise,
                        m - i,
                        n - i - ib,
                        ib,
                        &v,
                        ib,
                        t,
                        nb,
                        &mut a[i * lda + i + ib..],
                        lda,
                        w,
                        nb,
                    );
                }
                i += nb;
            }
        }
        if i < k {
            self.dgeqr2(m - i, n - i, &mut a[i * lda + i..], lda, &mut tau[i..], work);
        }
    }
}
