//! # Densrus Core
//!
//! Shared building blocks for the densrus linear-algebra crates.
//!
//! This crate provides:
//! - **CBLAS flag types**: `Transpose`, `Uplo`, `Side`, `Diag`, plus
//!   strided-view index helpers for row-major buffers.
//! - **Machine constants**: the `dlamch` values for IEEE binary64.
//! - **Preconditions**: the panic messages every kernel raises on misuse.
//! - **Contiguous kernels**: unrolled dot/axpy/scal/asum and the GEMM tile sizes.

pub mod kernels;
pub mod layout;
pub mod machine;
pub mod precondition;

pub use layout::{first_index, matrix_len, vector_len, Diag, Side, Transpose, Uplo};
pub use precondition::Precondition;
