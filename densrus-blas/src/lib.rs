// BLAS functions keep the CBLAS argument lists, so many parameters are inherent to the API.
// Numeric kernels use index loops on strided arrays where iterators hurt readability.
#![allow(clippy::too_many_arguments, clippy::needless_range_loop)]

//! # Densrus BLAS
//!
//! Pure Rust double-precision BLAS on row-major, strided, caller-owned buffers.
//!
//! ## BLAS Levels
//!
//! - **Level 1** (vector-vector): `ddot`, `dnrm2`, `dasum`, `idamax`, `dscal`,
//!   `daxpy`, `dcopy`, `dswap`, `drot`
//! - **Level 2** (matrix-vector): `dgemv`, `dgbmv`, `dger`, `dsymv`, `dsyr`,
//!   `dsyr2`, `dtrmv`, `dtrsv`
//! - **Level 3** (matrix-matrix): `dgemm`, `dsymm`, `dsyrk`, `dsyr2k`, `dtrmm`, `dtrsm`
//!
//! ## Memory Layout
//!
//! Element (i, j) of a matrix lives at `i * ld + j`; the `ld - cols` slack at
//! the end of each row is never read or written. Vector increments are
//! signed, and a negative increment visits the buffer back to front.
//!
//! ## Backends
//!
//! Higher layers take a [`Blas64`] implementation by value instead of
//! calling a global. [`Native`] forwards to the functions in this crate.
//!
//! ```
//! use densrus_blas::{level3, Transpose};
//!
//! let a = [1.0, 2.0, 3.0, 4.0];
//! let b = [5.0, 6.0, 7.0, 8.0];
//! let mut c = [0.0; 4];
//! level3::dgemm(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2, 1.0, &a, 2, &b, 2, 0.0, &mut c, 2);
//! assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
//! ```

pub mod backend;
pub mod level1;
pub mod level2;
pub mod level3;

// Re-export flag types for convenience
pub use densrus_core::layout::{Diag, Side, Transpose, Uplo};

pub use backend::{Blas64, Native};
