//! Matrix builders and checks shared by the routine tests.

use crate::{Lapack, MatrixNorm, Transpose, Uplo};
use densrus_blas::level3;
use rand::rngs::StdRng;
use rand::Rng;

pub fn nan_slice(n: usize) -> Vec<f64> {
    vec![f64::NAN; n]
}

/// `rows x cols` matrix with entries in [-1, 1) and NaN in the `ld - cols`
/// slack of every row.
pub fn random_general(rows: usize, cols: usize, ld: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut a = nan_slice(rows * ld);
    for i in 0..rows {
        for j in 0..cols {
            a[i * ld + j] = rng.gen_range(-1.0..1.0);
        }
    }
    a
}

/// Random upper Hessenberg matrix with NaN slack.
pub fn random_hessenberg(n: usize, ld: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut h = random_general(n, n, ld, rng);
    for i in 2..n {
        for j in 0..i - 1 {
            h[i * ld + j] = 0.0;
        }
    }
    h
}

/// Random symmetric `n x n` matrix, both triangles filled.
pub fn random_symmetric(n: usize, ld: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut a = random_general(n, n, ld, rng);
    for i in 1..n {
        for j in 0..i {
            a[i * ld + j] = a[j * ld + i];
        }
    }
    a
}

/// Random upper quasi-triangular matrix in Schur canonical form, with its
/// eigenvalues. Roughly half the diagonal is 2×2 blocks holding complex
/// pairs.
pub fn random_schur_canonical(n: usize, ld: usize, rng: &mut StdRng) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut t = random_general(n, n, ld, rng);
    for i in 1..n {
        for j in 0..i {
            t[i * ld + j] = 0.0;
        }
    }
    let mut wr = vec![0.0; n];
    let mut wi = vec![0.0; n];
    let mut i = 0;
    while i < n {
        if i + 1 == n || rng.gen_bool(0.5) {
            wr[i] = t[i * ld + i];
            i += 1;
            continue;
        }
        // 2×2 block with equal diagonal and off-diagonals of opposite sign.
        let a = t[i * ld + i];
        let b = t[i * ld + i + 1].abs().max(0.1);
        let c = -rng.gen_range(0.1..1.0);
        t[i * ld + i + 1] = b;
        t[(i + 1) * ld + i] = c;
        t[(i + 1) * ld + i + 1] = a;
        let im = b.abs().sqrt() * c.abs().sqrt();
        wr[i] = a;
        wr[i + 1] = a;
        wi[i] = im;
        wi[i + 1] = -im;
        i += 2;
    }
    (t, wr, wi)
}

pub fn eye(n: usize) -> Vec<f64> {
    let mut a = vec![0.0; n * n];
    for i in 0..n {
        a[i * n + i] = 1.0;
    }
    a
}

/// Product of the `m x k` matrix `a` and the `k x n` matrix `b`, both packed.
pub fn matmul_dims(m: usize, n: usize, k: usize, a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut c = vec![0.0; m * n];
    if m > 0 && n > 0 {
        level3::dgemm(Transpose::NoTrans, Transpose::NoTrans, m, n, k, 1.0, a, k.max(1), b, n, 0.0, &mut c, n);
    }
    c
}

pub fn matmul(n: usize, a: &[f64], b: &[f64]) -> Vec<f64> {
    matmul_dims(n, n, n, a, b)
}

pub fn transpose(n: usize, a: &[f64]) -> Vec<f64> {
    let mut t = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            t[j * n + i] = a[i * n + j];
        }
    }
    t
}

/// Packed copy of the leading `rows x cols` block.
pub fn pack(rows: usize, cols: usize, a: &[f64], lda: usize) -> Vec<f64> {
    crate::views::block(a, lda, 0, 0, rows, cols)
}

/// Full symmetric matrix from the `uplo` triangle of `a`.
pub fn sym_from(uplo: Uplo, n: usize, a: &[f64], lda: usize) -> Vec<f64> {
    let mut s = vec![0.0; n * n];
    for i in 0..n {
        for j in i..n {
            let v = if uplo == Uplo::Lower { a[j * lda + i] } else { a[i * lda + j] };
            s[i * n + j] = v;
            s[j * n + i] = v;
        }
    }
    s
}

/// One norm of `I - QᵀQ` for the `n x n` matrix Q.
pub fn residual_orthogonal(n: usize, q: &[f64], ldq: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let mut r = eye(n);
    level3::dgemm(Transpose::Trans, Transpose::NoTrans, n, n, n, -1.0, q, ldq, q, ldq, 1.0, &mut r, n);
    Lapack::new().dlange(MatrixNorm::MaxColumnSum, n, n, &r, n)
}

/// `c == 0`, or equal diagonal with off-diagonals of opposite sign.
pub fn is_schur_canonical(a: f64, b: f64, c: f64, d: f64) -> bool {
    c == 0.0 || (b != 0.0 && a == d && b.is_sign_negative() != c.is_sign_negative())
}

pub fn is_upper_hessenberg(n: usize, h: &[f64], ldh: usize) -> bool {
    (2..n).all(|i| (0..i - 1).all(|j| h[i * ldh + j] == 0.0))
}

/// Every entry in the `ld - cols` slack of each row, and beyond the last
/// row, is still NaN.
pub fn outside_all_nan(rows: usize, cols: usize, a: &[f64], ld: usize) -> bool {
    a.iter().enumerate().all(|(idx, v)| {
        let (i, j) = (idx / ld, idx % ld);
        (i < rows && j < cols) || v.is_nan()
    })
}

/// Eigenvalue `(re, im)` is within `tol` of some entry of `(wr, wi)`.
pub fn contains_eigenvalue(wr: &[f64], wi: &[f64], re: f64, im: f64, tol: f64) -> bool {
    wr.iter().zip(wi).any(|(&r, &i)| (r - re).abs() <= tol && (i - im).abs() <= tol)
}
