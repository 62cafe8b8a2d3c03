//! Auxiliary routines: rotations, 2×2 kernels, norms, scaling and copies.

use crate::flags::{Direct, MatrixNorm, Part, Pivot, Sort};
use crate::{Blas64, Lapack, Side};
use densrus_core::kernels;
use densrus_core::machine::{OVERFLOW, PREC, SAFE_MIN};
use densrus_core::{matrix_len, require, Precondition};

/// A real 2×2 block in Schur canonical form, as produced by [`Lapack::dlanv2`].
///
/// `[a b; c d] = [cs -sn; sn cs] * [aa bb; cc dd] * [cs sn; -sn cs]`, where
/// the right-hand side is the input block. Either `c == 0`, or `a == d` and
/// `b*c < 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardized {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub rt1r: f64,
    pub rt1i: f64,
    pub rt2r: f64,
    pub rt2i: f64,
    pub cs: f64,
    pub sn: f64,
}

impl<B: Blas64> Lapack<B> {
    // ========================================================================
    // Scalar kernels
    // ========================================================================

    /// sqrt(x² + y²) without unnecessary overflow or underflow. A NaN
    /// argument is returned as is.
    pub fn dlapy2(&self, x: f64, y: f64) -> f64 {
        if x.is_nan() {
            return x;
        }
        if y.is_nan() {
            return y;
        }
        let xabs = x.abs();
        let yabs = y.abs();
        let w = xabs.max(yabs);
        let z = xabs.min(yabs);
        if z == 0.0 || w > OVERFLOW {
            return w;
        }
        w * (1.0 + (z / w) * (z / w)).sqrt()
    }

    /// Generate a plane rotation so that
    ///
    /// ```text
    /// [  cs  sn ] [ f ]   [ r ]
    /// [ -sn  cs ] [ g ] = [ 0 ]
    /// ```
    ///
    /// with `cs² + sn² = 1`. Returns `(cs, sn, r)`. When `g == 0` the rotation
    /// is the identity; when `f == 0`, `cs == 0` and `r == |g|`.
    pub fn dlartg(&self, f: f64, g: f64) -> (f64, f64, f64) {
        let safmin = SAFE_MIN;
        let safmax = 1.0 / safmin;
        let rtmin = safmin.sqrt();
        let rtmax = (safmax / 2.0).sqrt();

        if g == 0.0 {
            return (1.0, 0.0, f);
        }
        let g1 = g.abs();
        if f == 0.0 {
            return (0.0, 1f64.copysign(g), g1);
        }
        let f1 = f.abs();
        if f1 > rtmin && f1 < rtmax && g1 > rtmin && g1 < rtmax {
            let d = (f * f + g * g).sqrt();
            let cs = f1 / d;
            let r = d.copysign(f);
            return (cs, g / r, r);
        }
        let u = safmax.min(safmin.max(f1).max(g1));
        let fs = f / u;
        let gs = g / u;
        let d = (fs * fs + gs * gs).sqrt();
        let cs = fs.abs() / d;
        let r = d.copysign(f);
        let sn = gs / r;
        (cs, sn, r * u)
    }

    /// Schur factorization of a real 2×2 nonsymmetric matrix in standardized form.
    ///
    /// On return the block is upper triangular when its eigenvalues are
    /// real, and has equal diagonal entries with off-diagonals of opposite
    /// sign when they are a complex pair `rt1r ± i*rt1i`.
    pub fn dlanv2(&self, a: f64, b: f64, c: f64, d: f64) -> Standardized {
        const MULTPL: f64 = 4.0;
        let eps = PREC;
        let safmn2 = 2f64.powi(((SAFE_MIN / eps).log2() / 2.0).trunc() as i32);
        let safmx2 = 1.0 / safmn2;

        let (mut a, mut b, mut c, mut d) = (a, b, c, d);
        let mut cs: f64;
        let mut sn: f64;
        if c == 0.0 {
            cs = 1.0;
            sn = 0.0;
        } else if b == 0.0 {
            // Swap rows and columns.
            cs = 0.0;
            sn = 1.0;
            std::mem::swap(&mut a, &mut d);
            b = -c;
            c = 0.0;
        } else if a - d == 0.0 && b.is_sign_negative() != c.is_sign_negative() {
            cs = 1.0;
            sn = 0.0;
        } else {
            let mut temp = a - d;
            let mut p = 0.5 * temp;
            let bcmax = b.abs().max(c.abs());
            let bcmis = b.abs().min(c.abs()) * 1f64.copysign(b) * 1f64.copysign(c);
            let mut scale = p.abs().max(bcmax);
            let mut z = p / scale * p + bcmax / scale * bcmis;
            if z >= MULTPL * eps {
                // Real eigenvalues. Compute a and d.
                z = p + (scale.sqrt() * z.sqrt()).copysign(p);
                a = d + z;
                d -= bcmax / z * bcmis;
                let tau = self.dlapy2(c, z);
                cs = z / tau;
                sn = c / tau;
                b -= c;
                c = 0.0;
            } else {
                // Complex or nearly equal real eigenvalues: make the
                // diagonal entries equal.
                let mut sigma = b + c;
                for _ in 0..=20 {
                    scale = temp.abs().max(sigma.abs());
                    if scale >= safmx2 {
                        sigma *= safmn2;
                        temp *= safmn2;
                        continue;
                    }
                    if scale <= safmn2 {
                        sigma *= safmx2;
                        temp *= safmx2;
                        continue;
                    }
                    break;
                }
                p = 0.5 * temp;
                let mut tau = self.dlapy2(sigma, temp);
                cs = (0.5 * (1.0 + sigma.abs() / tau)).sqrt();
                sn = -(p / (tau * cs)) * 1f64.copysign(sigma);

                // [aa bb; cc dd] = [a b; c d] * [cs -sn; sn cs]
                let aa = a * cs + b * sn;
                let bb = -a * sn + b * cs;
                let cc = c * cs + d * sn;
                let dd = -c * sn + d * cs;

                // [a b; c d] = [cs sn; -sn cs] * [aa bb; cc dd]
                a = aa * cs + cc * sn;
                b = bb * cs + dd * sn;
                c = -aa * sn + cc * cs;
                d = -bb * sn + dd * cs;

                temp = 0.5 * (a + d);
                a = temp;
                d = temp;

                if c != 0.0 {
                    if b != 0.0 {
                        if b.is_sign_negative() == c.is_sign_negative() {
                            // Real eigenvalues: reduce to upper triangular form.
                            let sab = b.abs().sqrt();
                            let sac = c.abs().sqrt();
                            p = (sab * sac).copysign(c);
                            tau = 1.0 / (b + c).abs().sqrt();
                            a = temp + p;
                            d = temp - p;
                            b -= c;
                            c = 0.0;
                            let cs1 = sab * tau;
                            let sn1 = sac * tau;
                            let t = cs * cs1 - sn * sn1;
                            sn = cs * sn1 + sn * cs1;
                            cs = t;
                        }
                    } else {
                        b = -c;
                        c = 0.0;
                        let t = cs;
                        cs = -sn;
                        sn = t;
                    }
                }
            }
        }

        let (rt1i, rt2i) = if c == 0.0 {
            (0.0, 0.0)
        } else {
            let im = b.abs().sqrt() * c.abs().sqrt();
            (im, -im)
        };
        Standardized { a, b, c, d, rt1r: a, rt1i, rt2r: d, rt2i, cs, sn }
    }

    /// Eigenvalues `(rt1, rt2)` of the symmetric matrix `[a b; b c]`, with
    /// `|rt1| >= |rt2|`.
    pub fn dlae2(&self, a: f64, b: f64, c: f64) -> (f64, f64) {
        let (rt1, rt2, _) = sym2x2(a, b, c);
        (rt1, rt2)
    }

    /// Eigen decomposition of the symmetric matrix `[a b; b c]`. Returns
    /// `(rt1, rt2, cs1, sn1)` where `(cs1, sn1)` is the unit eigenvector
    /// for `rt1`, the eigenvalue of larger magnitude.
    pub fn dlaev2(&self, a: f64, b: f64, c: f64) -> (f64, f64, f64, f64) {
        let (rt1, rt2, sgn1) = sym2x2(a, b, c);
        let df = a - c;
        let tb = b + b;
        let ab = tb.abs();
        let rt = sym2x2_radius(df.abs(), ab);

        let (cs, sgn2) = if df >= 0.0 { (df + rt, 1.0) } else { (df - rt, -1.0) };
        let mut cs1: f64;
        let mut sn1: f64;
        if cs.abs() > ab {
            let ct = -tb / cs;
            sn1 = 1.0 / (1.0 + ct * ct).sqrt();
            cs1 = ct * sn1;
        } else if ab == 0.0 {
            cs1 = 1.0;
            sn1 = 0.0;
        } else {
            let tn = -cs / tb;
            cs1 = 1.0 / (1.0 + tn * tn).sqrt();
            sn1 = tn * cs1;
        }
        if sgn1 == sgn2 {
            let tn = cs1;
            cs1 = -sn1;
            sn1 = tn;
        }
        (rt1, rt2, cs1, sn1)
    }

    // ========================================================================
    // Rotation sequences and sorting
    // ========================================================================

    /// Apply a sequence of plane rotations `P = P(z-1) ... P(0)` to the
    /// `m x n` matrix A: `A := P*A` from the Left (z = m) or `A := A*Pᵀ`
    /// from the Right (z = n). Rotation k is `[c_k s_k; -s_k c_k]` in the
    /// plane chosen by `pivot`; `direct` is the order they are applied in.
    pub fn dlasr(
        &self,
        side: Side,
        pivot: Pivot,
        direct: Direct,
        m: usize,
        n: usize,
        c: &[f64],
        s: &[f64],
        a: &mut [f64],
        lda: usize,
    ) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        if m == 0 || n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
        let z = if side == Side::Left { m } else { n };
        require!(c.len() >= z - 1 && s.len() >= z - 1, Precondition::ShortWork);

        let plane = |k: usize| match pivot {
            Pivot::Variable => (k, k + 1),
            Pivot::Top => (0, k + 1),
            Pivot::Bottom => (k, z - 1),
        };
        let mut apply = |k: usize| {
            let (ct, st) = (c[k], s[k]);
            if ct == 1.0 && st == 0.0 {
                return;
            }
            let (p, q) = plane(k);
            if side == Side::Left {
                for j in 0..n {
                    let x = a[p * lda + j];
                    let y = a[q * lda + j];
                    a[q * lda + j] = ct * y - st * x;
                    a[p * lda + j] = st * y + ct * x;
                }
            } else {
                for i in 0..m {
                    let x = a[i * lda + p];
                    let y = a[i * lda + q];
                    a[i * lda + q] = ct * y - st * x;
                    a[i * lda + p] = st * y + ct * x;
                }
            }
        };
        match direct {
            Direct::Forward => (0..z - 1).for_each(&mut apply),
            Direct::Backward => (0..z - 1).rev().for_each(&mut apply),
        }
    }

    /// Sort the first `n` entries of `d`.
    pub fn dlasrt(&self, sort: Sort, n: usize, d: &mut [f64]) {
        require!(d.len() >= n, Precondition::ShortD);
        let d = &mut d[..n];
        match sort {
            Sort::Increasing => d.sort_by(|x, y| x.total_cmp(y)),
            Sort::Decreasing => d.sort_by(|x, y| y.total_cmp(x)),
        }
    }

    // ========================================================================
    // Scaling and norms
    // ========================================================================

    /// A := A * (cto / cfrom) for an `m x n` general matrix, in steps that
    /// keep every intermediate product representable.
    pub fn dlascl(&self, cfrom: f64, cto: f64, m: usize, n: usize, a: &mut [f64], lda: usize) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        require!(cfrom != 0.0 && !cfrom.is_nan(), Precondition::BadScale);
        require!(!cto.is_nan(), Precondition::BadScale);
        if m == 0 || n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);

        let smlnum = SAFE_MIN;
        let bignum = 1.0 / smlnum;
        let mut cfromc = cfrom;
        let mut ctoc = cto;
        loop {
            let cfrom1 = cfromc * smlnum;
            let mul: f64;
            let done: bool;
            if cfrom1 == cfromc {
                // cfromc is infinite: multiply by a correctly signed zero
                // for finite cto, or a NaN otherwise.
                mul = ctoc / cfromc;
                done = true;
            } else {
                let cto1 = ctoc / bignum;
                if cto1 == ctoc {
                    // ctoc is zero or infinite.
                    mul = ctoc;
                    done = true;
                    cfromc = 1.0;
                } else if cfrom1.abs() > ctoc.abs() && ctoc != 0.0 {
                    mul = smlnum;
                    done = false;
                    cfromc = cfrom1;
                } else if cto1.abs() > cfromc.abs() {
                    mul = bignum;
                    done = false;
                    ctoc = cto1;
                } else {
                    mul = ctoc / cfromc;
                    done = true;
                    if mul == 1.0 {
                        return;
                    }
                }
            }
            for i in 0..m {
                kernels::scal(mul, &mut a[i * lda..i * lda + n]);
            }
            if done {
                return;
            }
        }
    }

    /// Norm of the symmetric tridiagonal matrix with diagonal `d[..n]` and
    /// off-diagonal `e[..n-1]`. NaN entries propagate to the result.
    pub fn dlanst(&self, norm: MatrixNorm, n: usize, d: &[f64], e: &[f64]) -> f64 {
        if n == 0 {
            return 0.0;
        }
        require!(d.len() >= n, Precondition::ShortD);
        require!(e.len() >= n - 1, Precondition::ShortE);
        match norm {
            MatrixNorm::MaxAbs => {
                let mut anorm = d[n - 1].abs();
                for &v in d[..n - 1].iter().chain(&e[..n - 1]) {
                    let v = v.abs();
                    if anorm < v || v.is_nan() {
                        anorm = v;
                    }
                }
                anorm
            }
            MatrixNorm::MaxColumnSum | MatrixNorm::MaxRowSum => {
                if n == 1 {
                    return d[0].abs();
                }
                let mut anorm = d[0].abs() + e[0].abs();
                let last = e[n - 2].abs() + d[n - 1].abs();
                if anorm < last || last.is_nan() {
                    anorm = last;
                }
                for i in 1..n - 1 {
                    let sum = d[i].abs() + e[i].abs() + e[i - 1].abs();
                    if anorm < sum || sum.is_nan() {
                        anorm = sum;
                    }
                }
                anorm
            }
            MatrixNorm::Frobenius => {
                let (mut scale, mut ssq) = (0.0, 1.0);
                if n > 1 {
                    (scale, ssq) = kernels::sum_squares(&e[..n - 1], scale, ssq);
                    ssq *= 2.0;
                }
                (scale, ssq) = kernels::sum_squares(&d[..n], scale, ssq);
                scale * ssq.sqrt()
            }
        }
    }

    /// Norm of an `m x n` general matrix.
    pub fn dlange(&self, norm: MatrixNorm, m: usize, n: usize, a: &[f64], lda: usize) -> f64 {
        require!(lda >= n.max(1), Precondition::BadLdA);
        if m == 0 || n == 0 {
            return 0.0;
        }
        require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
        let rows = (0..m).map(|i| &a[i * lda..i * lda + n]);
        let keep_max = |acc: f64, v: f64| if acc < v || v.is_nan() { v } else { acc };
        match norm {
            MatrixNorm::MaxAbs => rows.flatten().fold(0.0, |acc, v| keep_max(acc, v.abs())),
            MatrixNorm::MaxRowSum => rows.fold(0.0, |acc, row| keep_max(acc, kernels::asum(row))),
            MatrixNorm::MaxColumnSum => {
                let mut sums = vec![0.0; n];
                for row in rows {
                    for (s, v) in sums.iter_mut().zip(row) {
                        *s += v.abs();
                    }
                }
                sums.into_iter().fold(0.0, keep_max)
            }
            MatrixNorm::Frobenius => {
                let (scale, ssq) = rows.fold((0.0, 1.0), |(scale, ssq), row| {
                    kernels::sum_squares(row, scale, ssq)
                });
                scale * ssq.sqrt()
            }
        }
    }

    // ========================================================================
    // Copy and initialize
    // ========================================================================

    /// Copy all of A, or only its upper or lower trapezoid, into B.
    pub fn dlacpy(&self, part: Part, m: usize, n: usize, a: &[f64], lda: usize, b: &mut [f64], ldb: usize) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        require!(ldb >= n.max(1), Precondition::BadLdB);
        if m == 0 || n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
        require!(b.len() >= matrix_len(m, n, ldb), Precondition::ShortB);
        for i in 0..m {
            let cols = match part {
                Part::Upper => i.min(n)..n,
                Part::Lower => 0..(i + 1).min(n),
                Part::All => 0..n,
            };
            b[i * ldb + cols.start..i * ldb + cols.end]
                .copy_from_slice(&a[i * lda + cols.start..i * lda + cols.end]);
        }
    }

    /// Set the off-diagonal entries of the chosen part of A to `alpha` and
    /// the diagonal to `beta`.
    pub fn dlaset(&self, part: Part, m: usize, n: usize, alpha: f64, beta: f64, a: &mut [f64], lda: usize) {
        require!(lda >= n.max(1), Precondition::BadLdA);
        if m == 0 || n == 0 {
            return;
        }
        require!(a.len() >= matrix_len(m, n, lda), Precondition::ShortA);
        for i in 0..m {
            let row = &mut a[i * lda..i * lda + n];
            match part {
                Part::Upper => row[(i + 1).min(n)..].fill(alpha),
                Part::Lower => row[..i.min(n)].fill(alpha),
                Part::All => row.fill(alpha),
            }
            if i < n {
                row[i] = beta;
            }
        }
    }
}

/// Shared part of `dlae2` and `dlaev2`: eigenvalues plus the sign of the
/// trace used to pick the eigenvector.
fn sym2x2(a: f64, b: f64, c: f64) -> (f64, f64, f64) {
    let sm = a + c;
    let df = a - c;
    let ab = (b + b).abs();
    let (acmx, acmn) = if a.abs() > c.abs() { (a, c) } else { (c, a) };
    let rt = sym2x2_radius(df.abs(), ab);
    if sm < 0.0 {
        let rt1 = 0.5 * (sm - rt);
        // Order of operations matters for accuracy.
        let rt2 = (acmx / rt1) * acmn - (b / rt1) * b;
        (rt1, rt2, -1.0)
    } else if sm > 0.0 {
        let rt1 = 0.5 * (sm + rt);
        let rt2 = (acmx / rt1) * acmn - (b / rt1) * b;
        (rt1, rt2, 1.0)
    } else {
        (0.5 * rt, -0.5 * rt, 1.0)
    }
}

fn sym2x2_radius(adf: f64, ab: f64) -> f64 {
    if adf > ab {
        adf * (1.0 + (ab / adf) * (ab / adf)).sqrt()
    } else if adf < ab {
        ab * (1.0 + (adf / ab) * (adf / ab)).sqrt()
    } else {
        ab * std::f64::consts::SQRT_2
    }
}

/// Number of leading columns of the `m x n` matrix A that contain a nonzero.
pub(crate) fn last_nonzero_column(m: usize, n: usize, a: &[f64], lda: usize) -> usize {
    if n == 0 {
        return 0;
    }
    if a[n - 1] != 0.0 || a[(m - 1) * lda + n - 1] != 0.0 {
        return n;
    }
    for j in (0..n).rev() {
        if (0..m).any(|i| a[i * lda + j] != 0.0) {
            return j + 1;
        }
    }
    0
}

/// Number of leading rows of the `m x n` matrix A that contain a nonzero.
pub(crate) fn last_nonzero_row(m: usize, n: usize, a: &[f64], lda: usize) -> usize {
    if m == 0 {
        return 0;
    }
    for i in (0..m).rev() {
        if a[i * lda..i * lda + n].iter().any(|&v| v != 0.0) {
            return i + 1;
        }
    }
    0
}
