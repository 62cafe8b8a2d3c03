//! Cholesky factorization of symmetric positive definite matrices.

use crate::tuning::{self, Routine};
use crate::views;
use crate::{Blas64, Diag, Lapack, Side, Transpose, Uplo};
use densrus_core::{matrix_len, require, Precondition};
use log::debug;

impl<B: Blas64> Lapack<B> {
    /// Unblocked Cholesky factorization.
    ///
    /// With `Uplo::Upper` the upper triangle of A is overwritten by U with
    /// `A = UᵀU`; with `Uplo::Lower` the lower triangle by L with `A = LLᵀ`.
    /// The other triangle is not referenced. Returns `false` when a leading
    /// minor is not positive definite, leaving the offending diagonal entry
    /// in place and the factorization incomplete.
    pub fn dpotf2(&self, uplo: Uplo, n: usize, a: &mut [f64], lda: usize) -> bool {
        require!(lda >= n.max(1), Precondition::BadLdA);
        if n == 0 {
            return true;
        }
        require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);
        let blas = &self.blas;

        if uplo == Uplo::Upper {
            for j in 0..n {
                // Column j of U above the diagonal is already final.
                let mut ajj = a[j * lda + j] - blas.ddot(j, &a[j..], lda as isize, &a[j..], lda as isize);
                if ajj <= 0.0 || ajj.is_nan() {
                    a[j * lda + j] = ajj;
                    return false;
                }
                ajj = ajj.sqrt();
                a[j * lda + j] = ajj;
                // Row j of U right of the diagonal.
                for k in j + 1..n {
                    let dot = blas.ddot(j, &a[j..], lda as isize, &a[k..], lda as isize);
                    a[j * lda + k] = (a[j * lda + k] - dot) / ajj;
                }
            }
            return true;
        }

        for j in 0..n {
            let row = j * lda;
            let mut ajj = a[row + j] - blas.ddot(j, &a[row..], 1, &a[row..], 1);
            if ajj <= 0.0 || ajj.is_nan() {
                a[row + j] = ajj;
                return false;
            }
            ajj = ajj.sqrt();
            a[row + j] = ajj;
            // Column j of L below the diagonal.
            for i in j + 1..n {
                let dot = blas.ddot(j, &a[i * lda..], 1, &a[row..], 1);
                a[i * lda + j] = (a[i * lda + j] - dot) / ajj;
            }
        }
        true
    }

    /// Blocked Cholesky factorization with the storage and return value of
    /// [`dpotf2`](Self::dpotf2).
    ///
    /// Each diagonal block is updated with `dsyrk` and factored unblocked;
    /// the panel beside it is updated with `dgemm` and solved with `dtrsm`.
    pub fn dpotrf(&self, uplo: Uplo, n: usize, a: &mut [f64], lda: usize) -> bool {
        require!(lda >= n.max(1), Precondition::BadLdA);
        if n == 0 {
            return true;
        }
        require!(a.len() >= matrix_len(n, n, lda), Precondition::ShortA);

        let nb = tuning::block_size(Routine::Potrf);
        if nb <= 1 || nb >= n {
            return self.dpotf2(uplo, n, a, lda);
        }
        debug!("dpotrf: n={} nb={}", n, nb);
        let blas = &self.blas;

        let mut j = 0;
        while j < n {
            let jb = nb.min(n - j);
            let rest = n - j - jb;
            let diag = j * lda + j;

            if uplo == Uplo::Upper {
                // U[..j, j..j+jb], the part of the factor above this block.
                let above = if j > 0 { views::block(a, lda, 0, j, j, jb) } else { Vec::new() };
                if j > 0 {
                    // A11 -= U01ᵀ U01
                    blas.dsyrk(uplo, Transpose::Trans, jb, j, -1.0, &above, jb, 1.0, &mut a[diag..], lda);
                }
                if !self.dpotf2(uplo, jb, &mut a[diag..], lda) {
                    return false;
                }
                if rest > 0 {
                    if j > 0 {
                        // A12 -= U01ᵀ U02
                        let right = views::block(a, lda, 0, j + jb, j, rest);
                        blas.dgemm(
                            Transpose::Trans,
                            Transpose::NoTrans,
                            jb,
                            rest,
                            j,
                            -1.0,
                            &above,
                            jb,
                            &right,
                            rest,
                            1.0,
                            &mut a[diag + jb..],
                            lda,
                        );
                    }
                    // U12 := U11⁻ᵀ A12
                    let u11 = views::block(a, lda, j, j, jb, jb);
                    blas.dtrsm(
                        Side::Left,
                        Uplo::Upper,
                        Transpose::Trans,
                        Diag::NonUnit,
                        jb,
                        rest,
                        1.0,
                        &u11,
                        jb,
                        &mut a[diag + jb..],
                        lda,
                    );
                }
            } else {
                // L[j..j+jb, ..j], the part of the factor left of this block.
                let left = if j > 0 { views::block(a, lda, j, 0, jb, j) } else { Vec::new() };
                if j > 0 {
                    // A11 -= L10 L10ᵀ
                    blas.dsyrk(uplo, Transpose::NoTrans, jb, j, -1.0, &left, j, 1.0, &mut a[diag..], lda);
                }
                if !self.dpotf2(uplo, jb, &mut a[diag..], lda) {
                    return false;
                }
                if rest > 0 {
                    let below = (j + jb) * lda + j;
                    if j > 0 {
                        // A21 -= L20 L10ᵀ
                        let l20 = views::block(a, lda, j + jb, 0, rest, j);
                        blas.dgemm(
                            Transpose::NoTrans,
                            Transpose::Trans,
                            rest,
                            jb,
                            j,
                            -1.0,
                            &l20,
                            j,
                            &left,
                            j,
                            1.0,
                            &mut a[below..],
                            lda,
                        );
                    }
                    // L21 := A21 L11⁻ᵀ
                    let l11 = views::block(a, lda, j, j, jb, jb);
                    blas.dtrsm(
                        Side::Right,
                        Uplo::Lower,
                        Transpose::Trans,
                        Diag::NonUnit,
                        rest,
                        jb,
                        1.0,
                        &l11,
                        jb,
                        &mut a[below..],
                        lda,
                    );
                }
            }
            j += jb;
        }
        true
    }
}
