//! Explicit orthogonal factors from stored reflectors.

use crate::views;
use crate::{Blas64, Lapack, Side, Uplo, Work};
use densrus_core::{matrix_len, require, Precondition};

impl<B: Blas64> Lapack<B> {
    /// Overwrite the `m x n` matrix A (m >= n >= k) with the first n
    /// columns of `Q = H(0) H(1) ... H(k-1)`, the reflectors returned by
    /// `dgeqrf` in the first k columns of A. `work` needs n entries.
    pub fn dorg2r(&self, m: usize, n: usize, k: usize, a: &mut [f64], lda: usize, tau: &[f64], work: &mut [f64]) {
        require!(n <= m, Precondition::BadK);
        require!(k <= n, Precondition::BadK);
        require!(lda >= n.max(1), Precondition::BadLdA);
        if n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
        require!(tau.len() >= k, Precondition::ShortTau);
        require!(work.len() >= n, Precondition::ShortWork);

        // Columns k..n start as columns of the identity.
        for i in 0..m {
            a[i * lda + k..i * lda + n].fill(0.0);
        }
        for j in k..n {
            a[j * lda + j] = 1.0;
        }
        for i in (0..k).rev() {
            // Apply H(i) to A[i.., i..] from the left.
            if i < n - 1 {
                let mut v = views::column(a, lda, i, m - i, i);
                v[0] = 1.0;
                self.dlarf(Side::Left, m - i, n - i - 1, &v, 1, tau[i], &mut a[i * lda + i + 1..], lda, work);
            }
            if i < m - 1 {
                self.blas.dscal(m - i - 1, -tau[i], &mut a[(i + 1) * lda + i..], lda as isize);
            }
            a[i * lda + i] = 1.0 - tau[i];
            for l in 0..i {
                a[l * lda + i] = 0.0;
            }
        }
    }

    /// Overwrite the `m x n` matrix A (m >= n >= k) with the last n columns
    /// of `Q = H(k-1) ... H(1) H(0)`, the reflectors of a QL factorization
    /// stored in the last k columns of A. `work` needs n entries.
    pub fn dorg2l(&self, m: usize, n: usize, k: usize, a: &mut [f64], lda: usize, tau: &[f64], work: &mut [f64]) {
        require!(n <= m, Precondition::BadK);
        require!(k <= n, Precondition::BadK);
        require!(lda >= n.max(1), Precondition::BadLdA);
        if n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
        require!(tau.len() >= k, Precondition::ShortTau);
        require!(work.len() >= n, Precondition::ShortWork);

        // Columns 0..n-k start as the last columns of the identity.
        for i in 0..m {
            a[i * lda..i * lda + n - k].fill(0.0);
        }
        for j in 0..n - k {
            a[(m - n + j) * lda + j] = 1.0;
        }
        for i in 0..k {
            let ii = n - k + i;
            let last = m - n + ii;
            // Apply H(i) to A[..=last, ..ii] from the left.
            let mut v = views::column(a, lda, 0, last + 1, ii);
            v[last] = 1.0;
            self.dlarf(Side::Left, last + 1, ii, &v, 1, tau[i], a, lda, work);
            self.blas.dscal(last, -tau[i], &mut a[ii..], lda as isize);
            a[last * lda + ii] = 1.0 - tau[i];
            for l in last + 1..m {
                a[l * lda + ii] = 0.0;
            }
        }
    }

    /// Overwrite A with the `n x n` orthogonal Q from `dsytrd` run with the
    /// same `uplo`. The workspace minimum and optimum are both `max(1, n-1)`.
    pub fn dorgtr(&self, uplo: Uplo, n: usize, a: &mut [f64], lda: usize, tau: &[f64], work: Work<'_>) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        let lw = n.saturating_sub(1).max(1);
        let Some(work) = work.resolve(lw, lw) else {
            return;
        };
        if n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
        require!(tau.len() >= n - 1, Precondition::ShortTau);

        if uplo == Uplo::Upper {
            // Shift the reflectors one column left; the last row and column
            // of Q are those of the identity.
            for j in 0..n - 1 {
                for i in 0..j {
                    a[i * lda + j] = a[i * lda + j + 1];
                }
                a[(n - 1) * lda + j] = 0.0;
            }
            for i in 0..n - 1 {
                a[i * lda + n - 1] = 0.0;
            }
            a[(n - 1) * lda + n - 1] = 1.0;
            self.dorg2l(n - 1, n - 1, n - 1, a, lda, tau, work);
            return;
        }

        // Shift the reflectors one column right; the first row and column
        // of Q are those of the identity.
        for j in (1..n).rev() {
            a[j] = 0.0;
            for i in j + 1..n {
                a[i * lda + j] = a[i * lda + j - 1];
            }
        }
        a[0] = 1.0;
        for i in 1..n {
            a[i * lda] = 0.0;
        }
        if n > 1 {
            self.dorg2r(n - 1, n - 1, n - 1, &mut a[lda + 1..], lda, tau, work);
        }
    }
}
