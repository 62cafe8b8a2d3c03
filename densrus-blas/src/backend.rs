//! The BLAS capability interface.
//!
//! LAPACK routines never call the free functions in `level1`/`level2`/
//! `level3` directly; they go through a `Blas64` value chosen when the
//! caller builds its `Lapack` instance. `Native` is the pure Rust backend.
//! A vendor backend implements the same trait and is injected in its place.

use crate::{level1, level2, level3};
use densrus_core::{Diag, Side, Transpose, Uplo};

/// Double-precision BLAS, one method per routine. Argument order and
/// semantics match the free functions of the same name.
pub trait Blas64 {
    // Level 1
    fn ddot(&self, n: usize, x: &[f64], incx: isize, y: &[f64], incy: isize) -> f64;
    fn dnrm2(&self, n: usize, x: &[f64], incx: isize) -> f64;
    fn dasum(&self, n: usize, x: &[f64], incx: isize) -> f64;
    fn idamax(&self, n: usize, x: &[f64], incx: isize) -> Option<usize>;
    fn dscal(&self, n: usize, alpha: f64, x: &mut [f64], incx: isize);
    fn daxpy(&self, n: usize, alpha: f64, x: &[f64], incx: isize, y: &mut [f64], incy: isize);
    fn dcopy(&self, n: usize, x: &[f64], incx: isize, y: &mut [f64], incy: isize);
    fn dswap(&self, n: usize, x: &mut [f64], incx: isize, y: &mut [f64], incy: isize);
    fn drot(&self, n: usize, x: &mut [f64], incx: isize, y: &mut [f64], incy: isize, c: f64, s: f64);

    // Level 2
    fn dgemv(
        &self,
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
    );
    fn dgbmv(
        &self,
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
    );
    fn dger(
        &self,
        m: usize,
        n: usize,
        alpha: f64,
        x: &[f64],
        incx: isize,
        y: &[f64],
        incy: isize,
        a: &mut [f64],
        lda: usize,
    );
    fn dsymv(
        &self,
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
    );
    fn dsyr(&self, uplo: Uplo, n: usize, alpha: f64, x: &[f64], incx: isize, a: &mut [f64], lda: usize);
    fn dsyr2(
        &self,
        uplo: Uplo,
        n: usize,
        alpha: f64,
        x: &[f64],
        incx: isize,
        y: &[f64],
        incy: isize,
        a: &mut [f64],
        lda: usize,
    );
    fn dtrmv(
        &self,
        uplo: Uplo,
        trans: Transpose,
        diag: Diag,
        n: usize,
        a: &[f64],
        lda: usize,
        x: &mut [f64],
        incx: isize,
    );
    fn dtrsv(
        &self,
        uplo: Uplo,
        trans: Transpose,
        diag: Diag,
        n: usize,
        a: &[f64],
        lda: usize,
        x: &mut [f64],
        incx: isize,
    );

    // Level 3
    fn dgemm(
        &self,
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
    );
    fn dsymm(
        &self,
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
    );
    fn dsyrk(
        &self,
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
    );
    fn dsyr2k(
        &self,
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
    );
    fn dtrmm(
        &self,
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
    );
    fn dtrsm(
        &self,
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
    );
}

/// Pure Rust backend over the `level1`/`level2`/`level3` kernels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Native;

impl Blas64 for Native {
    #[inline]
    fn ddot(&self, n: usize, x: &[f64], incx: isize, y: &[f64], incy: isize) -> f64 {
        level1::ddot(n, x, incx, y, incy)
    }
    #[inline]
    fn dnrm2(&self, n: usize, x: &[f64], incx: isize) -> f64 {
        level1::dnrm2(n, x, incx)
    }
    #[inline]
    fn dasum(&self, n: usize, x: &[f64], incx: isize) -> f64 {
        level1::dasum(n, x, incx)
    }
    #[inline]
    fn idamax(&self, n: usize, x: &[f64], incx: isize) -> Option<usize> {
        level1::idamax(n, x, incx)
    }
    #[inline]
    fn dscal(&self, n: usize, alpha: f64, x: &mut [f64], incx: isize) {
        level1::dscal(n, alpha, x, incx)
    }
    #[inline]
    fn daxpy(&self, n: usize, alpha: f64, x: &[f64], incx: isize, y: &mut [f64], incy: isize) {
        level1::daxpy(n, alpha, x, incx, y, incy)
    }
    #[inline]
    fn dcopy(&self, n: usize, x: &[f64], incx: isize, y: &mut [f64], incy: isize) {
        level1::dcopy(n, x, incx, y, incy)
    }
    #[inline]
    fn dswap(&self, n: usize, x: &mut [f64], incx: isize, y: &mut [f64], incy: isize) {
        level1::dswap(n, x, incx, y, incy)
    }
    #[inline]
    fn drot(&self, n: usize, x: &mut [f64], incx: isize, y: &mut [f64], incy: isize, c: f64, s: f64) {
        level1::drot(n, x, incx, y, incy, c, s)
    }

    fn dgemv(
        &self,
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
        level2::dgemv(trans, m, n, alpha, a, lda, x, incx, beta, y, incy)
    }
    fn dgbmv(
        &self,
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
        level2::dgbmv(trans, m, n, kl, ku, alpha, a, lda, x, incx, beta, y, incy)
    }
    fn dger(
        &self,
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
        level2::dger(m, n, alpha, x, incx, y, incy, a, lda)
    }
    fn dsymv(
        &self,
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
        level2::dsymv(uplo, n, alpha, a, lda, x, incx, beta, y, incy)
    }
    fn dsyr(&self, uplo: Uplo, n: usize, alpha: f64, x: &[f64], incx: isize, a: &mut [f64], lda: usize) {
        level2::dsyr(uplo, n, alpha, x, incx, a, lda)
    }
    fn dsyr2(
        &self,
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
        level2::dsyr2(uplo, n, alpha, x, incx, y, incy, a, lda)
    }
    fn dtrmv(
        &self,
        uplo: Uplo,
        trans: Transpose,
        diag: Diag,
        n: usize,
        a: &[f64],
        lda: usize,
        x: &mut [f64],
        incx: isize,
    ) {
        level2::dtrmv(uplo, trans, diag, n, a, lda, x, incx)
    }
    fn dtrsv(
        &self,
        uplo: Uplo,
        trans: Transpose,
        diag: Diag,
        n: usize,
        a: &[f64],
        lda: usize,
        x: &mut [f64],
        incx: isize,
    ) {
        level2::dtrsv(uplo, trans, diag, n, a, lda, x, incx)
    }

    fn dgemm(
        &self,
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
        level3::dgemm(trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc)
    }
    fn dsymm(
        &self,
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
        level3::dsymm(side, uplo, m, n, alpha, a, lda, b, ldb, beta, c, ldc)
    }
    fn dsyrk(
        &self,
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
        level3::dsyrk(uplo, trans, n, k, alpha, a, lda, beta, c, ldc)
    }
    fn dsyr2k(
        &self,
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
        level3::dsyr2k(uplo, trans, n, k, alpha, a, lda, b, ldb, beta, c, ldc)
    }
    fn dtrmm(
        &self,
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
        level3::dtrmm(side, uplo, trans, diag, m, n, alpha, a, lda, b, ldb)
    }
    fn dtrsm(
        &self,
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
        level3::dtrsm(side, uplo, trans, diag, m, n, alpha, a, lda, b, ldb)
    }
}
