//! Option enums for LAPACK routines.
//!
//! These replace the single-character job arguments of the reference
//! interface.

/// Which eigenvectors `dsteqr` computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EigComp {
    /// Eigenvalues only; Z is not referenced.
    None,
    /// Z holds the orthogonal matrix that reduced the original matrix to
    /// tridiagonal form and is updated to the eigenvectors of that matrix.
    Orig,
    /// Z is initialized to the identity and receives the eigenvectors of the
    /// tridiagonal matrix itself.
    Tridiag,
}

/// How much of the Schur factorization `dhseqr` computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchurJob {
    EigenvaluesOnly,
    /// H is overwritten by the quasi-triangular Schur factor T.
    SchurForm,
}

/// Which Schur vectors `dhseqr` accumulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchurComp {
    None,
    /// Z holds an orthogonal matrix Q on entry and is overwritten by Q*Z.
    Original,
    /// Z is initialized to the identity.
    Identity,
}

/// Part of a matrix touched by `dlacpy` and `dlaset`.
///
/// Unlike [`Uplo`](crate::Uplo), which selects the stored triangle of a
/// symmetric or triangular operand, this also allows the whole matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Part {
    /// The upper trapezoid, diagonal included.
    Upper,
    /// The lower trapezoid, diagonal included.
    Lower,
    All,
}

/// Order in which elementary reflectors are multiplied to form a block reflector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direct {
    /// H = H(0) H(1) ... H(k-1)
    Forward,
    /// H = H(k-1) ... H(1) H(0)
    Backward,
}

/// How reflector vectors are laid out in V.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreV {
    Columnwise,
    Rowwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixNorm {
    /// max |a_ij|
    MaxAbs,
    /// One norm.
    MaxColumnSum,
    /// Infinity norm.
    MaxRowSum,
    Frobenius,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sort {
    Increasing,
    Decreasing,
}

/// Plane for each rotation in a `dlasr` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pivot {
    /// Rotation k acts on rows (or columns) k and k+1.
    Variable,
    /// Rotation k acts on 0 and k+1.
    Top,
    /// Rotation k acts on k and the last row (or column).
    Bottom,
}
