// LAPACK routines keep the reference argument lists, and the numeric loops
// index several strided views at once.
#![allow(clippy::too_many_arguments, clippy::needless_range_loop)]

//! # Densrus LAPACK
//!
//! Pure Rust double-precision LAPACK routines on row-major buffers, built on
//! the BLAS capability interface from `densrus-blas`.
//!
//! ## Coverage
//!
//! - **Symmetric eigenproblem**: `dsytd2` / `dlatrd` / `dsytrd` reduce to
//!   tridiagonal form, `dorgtr` forms Q, `dsteqr` iterates to eigenvalues.
//! - **Nonsymmetric eigenproblem**: `dgehrd` reduces to Hessenberg form,
//!   `dhseqr` computes the real Schur form with the multishift QR algorithm
//!   and aggressive early deflation (`dlaqr04`, `dlaqr23`, `dlaqr5`).
//! - **Factorizations**: Cholesky (`dpotrf`) and Householder QR (`dgeqrf`).
//! - **Auxiliaries**: plane rotations, Householder reflectors, norms,
//!   scaling, copying, 2×2 kernels and Schur reordering.
//!
//! ## Conventions
//!
//! Element (i, j) of a matrix is `a[i * lda + j]`. Routines are methods on
//! [`Lapack`], which owns the [`Blas64`] implementation every Level-2/3 call
//! goes through. Bad dimensions panic with a [`Precondition`] message;
//! numerical outcomes (convergence, definiteness) are return values.
//!
//! ```
//! use densrus_lapack::{Lapack, Uplo};
//!
//! let lapack = Lapack::new();
//! let mut a = [4.0, 2.0, 2.0, 3.0];
//! assert!(lapack.dpotrf(Uplo::Lower, 2, &mut a, 2));
//! assert_eq!(a[0], 2.0);
//! assert_eq!(a[2], 1.0);
//! ```
//!
//! [`Precondition`]: densrus_core::Precondition

pub mod auxiliary;
pub mod cholesky;
pub mod flags;
pub mod hessenberg;
pub mod householder;
pub mod orgtr;
pub mod qr;
pub mod reorder;
pub mod schur;
pub mod steqr;
pub mod tridiag;
pub mod tuning;
pub mod workspace;

mod views;

#[cfg(test)]
mod testutil;

pub use densrus_blas::{Blas64, Native};
pub use densrus_core::{Diag, Side, Transpose, Uplo};

pub use auxiliary::Standardized;
pub use flags::{Direct, EigComp, MatrixNorm, Part, Pivot, SchurComp, SchurJob, Sort, StoreV};
pub use workspace::Work;

/// LAPACK implementation parameterised by the BLAS it runs on.
///
/// The BLAS is fixed at construction, so a vendor backend can be swapped in
/// without touching any routine:
///
/// ```
/// use densrus_lapack::{Lapack, Native};
///
/// let lapack = Lapack::with_blas(Native);
/// assert_eq!(lapack.dlapy2(3.0, 4.0), 5.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Lapack<B: Blas64 = Native> {
    blas: B,
}

impl Lapack {
    /// LAPACK on the pure Rust BLAS.
    pub fn new() -> Self {
        Self { blas: Native }
    }
}

impl Default for Lapack {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Blas64> Lapack<B> {
    pub fn with_blas(blas: B) -> Self {
        Self { blas }
    }

    /// The BLAS implementation this instance calls.
    pub fn blas(&self) -> &B {
        &self.blas
    }
}
