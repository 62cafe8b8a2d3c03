//! Reordering of the real Schur form.
//!
//! A matrix in Schur canonical form is upper quasi-triangular with 1×1 and
//! standardized 2×2 diagonal blocks. These routines move blocks along the
//! diagonal by orthogonal similarity, optionally accumulating the
//! transformation into Q. A swap whose result would not be numerically
//! upper quasi-triangular is refused and leaves T and Q unchanged.

use crate::flags::MatrixNorm;
use crate::views;
use crate::{Blas64, Lapack, Part, Side};
use densrus_core::machine::{PREC, SAFE_MIN};
use densrus_core::{matrix_len, require, Precondition};

impl<B: Blas64> Lapack<B> {
    /// Solve the Sylvester equation
    ///
    /// ```text
    /// op(TL) * X + isgn * X * op(TR) = scale * B
    /// ```
    ///
    /// for the `n1 x n2` matrix X, where n1 and n2 are each 1 or 2 and op is
    /// the identity or the transpose. Complete pivoting is used; pivots
    /// below a threshold are perturbed.
    ///
    /// Returns `(scale, xnorm, ok)`. `scale <= 1` is chosen to prevent
    /// overflow in X, `xnorm` is the infinity norm of X, and `ok` is false
    /// when TL and `-isgn*TR` have (nearly) common eigenvalues and the
    /// solution was computed with perturbed values.
    pub fn dlasy2(
        &self,
        tranl: bool,
        tranr: bool,
        isgn: i32,
        n1: usize,
        n2: usize,
        tl: &[f64],
        ldtl: usize,
        tr: &[f64],
        ldtr: usize,
        b: &[f64],
        ldb: usize,
        x: &mut [f64],
        ldx: usize,
    ) -> (f64, f64, bool) {
        require!(isgn == 1 || isgn == -1, Precondition::BadSign);
        require!(n1 <= 2 && n2 <= 2, Precondition::BadBlockSize);
        require!(ldtl >= n1.max(1), Precondition::BadLdA);
        require!(ldtr >= n2.max(1), Precondition::BadLdB);
        require!(ldb >= n2.max(1), Precondition::BadLdC);
        require!(ldx >= n2.max(1), Precondition::BadLdWork);
        if n1 == 0 || n2 == 0 {
            return (1.0, 0.0, true);
        }
        require!(tl.len() >= matrix_len(n1, n1, ldtl), Precondition::ShortA);
        require!(tr.len() >= matrix_len(n2, n2, ldtr), Precondition::ShortB);
        require!(b.len() >= matrix_len(n1, n2, ldb), Precondition::ShortC);
        require!(x.len() >= matrix_len(n1, n2, ldx), Precondition::ShortX);

        let eps = PREC;
        let smlnum = SAFE_MIN / eps;
        let sgn = f64::from(isgn);
        let mut ok = true;

        if n1 == 1 && n2 == 1 {
            let mut tau1 = tl[0] + sgn * tr[0];
            let mut bet = tau1.abs();
            if bet <= smlnum {
                tau1 = smlnum;
                bet = smlnum;
                ok = false;
            }
            let gam = b[0].abs();
            let scale = if smlnum * gam > bet { 1.0 / gam } else { 1.0 };
            x[0] = b[0] * scale / tau1;
            return (scale, x[0].abs(), ok);
        }

        let opl = |i: usize, k: usize| if tranl { tl[k * ldtl + i] } else { tl[i * ldtl + k] };
        let opr = |k: usize, j: usize| if tranr { tr[j * ldtr + k] } else { tr[k * ldtr + j] };

        let mut smin: f64 = 0.0;
        for i in 0..n1 {
            for j in 0..n1 {
                smin = smin.max(tl[i * ldtl + j].abs());
            }
        }
        for i in 0..n2 {
            for j in 0..n2 {
                smin = smin.max(tr[i * ldtr + j].abs());
            }
        }
        let smin = (eps * smin).max(smlnum);

        // Kronecker form: unknown X[i][j] is entry i*n2 + j, and so is the
        // equation for B[i][j].
        let size = n1 * n2;
        let mut t = [[0.0f64; 4]; 4];
        let mut rhs = [0.0f64; 4];
        for i in 0..n1 {
            for j in 0..n2 {
                let row = i * n2 + j;
                for k in 0..n1 {
                    t[row][k * n2 + j] += opl(i, k);
                }
                for k in 0..n2 {
                    t[row][i * n2 + k] += sgn * opr(k, j);
                }
                rhs[row] = b[i * ldb + j];
            }
        }

        // Gaussian elimination with complete pivoting.
        let mut jpiv = [0usize; 4];
        for i in 0..size - 1 {
            let mut xmax = 0.0;
            let (mut ipsv, mut jpsv) = (i, i);
            for ip in i..size {
                for jp in i..size {
                    if t[ip][jp].abs() >= xmax {
                        xmax = t[ip][jp].abs();
                        ipsv = ip;
                        jpsv = jp;
                    }
                }
            }
            if ipsv != i {
                t.swap(ipsv, i);
                rhs.swap(ipsv, i);
            }
            if jpsv != i {
                for row in t.iter_mut() {
                    row.swap(jpsv, i);
                }
            }
            jpiv[i] = jpsv;
            if t[i][i].abs() < smin {
                ok = false;
                t[i][i] = smin;
            }
            for k in i + 1..size {
                t[k][i] /= t[i][i];
                rhs[k] -= t[k][i] * rhs[i];
                for j in i + 1..size {
                    t[k][j] -= t[k][i] * t[i][j];
                }
            }
        }
        let last = size - 1;
        if t[last][last].abs() < smin {
            ok = false;
            t[last][last] = smin;
        }

        let grow = if size == 2 { 2.0 } else { 8.0 };
        let mut scale = 1.0;
        if (0..size).any(|k| grow * smlnum * rhs[k].abs() > t[k][k].abs()) {
            let bmax = rhs[..size].iter().fold(0.0f64, |m, v| m.max(v.abs()));
            scale = 1.0 / grow / bmax;
            for v in rhs[..size].iter_mut() {
                *v *= scale;
            }
        }

        let mut sol = [0.0f64; 4];
        for i in (0..size).rev() {
            let inv = 1.0 / t[i][i];
            sol[i] = rhs[i] * inv;
            for j in i + 1..size {
                sol[i] -= inv * t[i][j] * sol[j];
            }
        }
        for i in (0..size - 1).rev() {
            if jpiv[i] != i {
                sol.swap(i, jpiv[i]);
            }
        }

        let mut xnorm: f64 = 0.0;
        for i in 0..n1 {
            let mut sum = 0.0;
            for j in 0..n2 {
                x[i * ldx + j] = sol[i * n2 + j];
                sum += sol[i * n2 + j].abs();
            }
            xnorm = xnorm.max(sum);
        }
        (scale, xnorm, ok)
    }

    /// Swap the adjacent diagonal blocks `T11` (order n1, starting at row
    /// j1) and `T22` (order n2) of the upper quasi-triangular T by an
    /// orthogonal similarity. With `wantq`, the transformation is also
    /// applied to the columns of Q. `work` needs n entries.
    ///
    /// Returns false, with T and Q untouched, when the swap was rejected
    /// because the blocks are too close for the result to be reliably
    /// quasi-triangular.
    pub fn dlaexc(
        &self,
        wantq: bool,
        n: usize,
        t: &mut [f64],
        ldt: usize,
        q: &mut [f64],
        ldq: usize,
        j1: usize,
        n1: usize,
        n2: usize,
        work: &mut [f64],
    ) -> bool {
        require!(ldt >= n.max(1), Precondition::BadLdT);
        require!(ldq >= 1 && (!wantq || ldq >= n), Precondition::BadLdZ);
        require!(n1 <= 2 && n2 <= 2, Precondition::BadBlockSize);
        if n == 0 || n1 == 0 || n2 == 0 || j1 + n1 >= n {
            return true;
        }
        require!(j1 + n1 + n2 <= n, Precondition::BadReorderIndex);
        require!(t.len() >= matrix_len(n, n, ldt), Precondition::ShortT);
        if wantq {
            require!(q.len() >= matrix_len(n, n, ldq), Precondition::ShortZ);
        }
        require!(work.len() >= n, Precondition::ShortWork);

        let blas = &self.blas;
        let j2 = j1 + 1;
        let j3 = j1 + 2;

        if n1 == 1 && n2 == 1 {
            let t11 = t[j1 * ldt + j1];
            let t22 = t[j2 * ldt + j2];
            let (cs, sn, _) = self.dlartg(t[j1 * ldt + j2], t22 - t11);
            if j3 < n {
                views::rotate_rows(blas, t, ldt, j1, j2, j3, n - j3, cs, sn);
            }
            views::rotate_columns(t, ldt, 0, j1, j1, j2, cs, sn);
            t[j1 * ldt + j1] = t22;
            t[j2 * ldt + j2] = t11;
            if wantq {
                views::rotate_columns(q, ldq, 0, n, j1, j2, cs, sn);
            }
            return true;
        }

        // Work on a copy of the diagonal block of order n1+n2 first.
        const LDD: usize = 4;
        let nd = n1 + n2;
        let mut d = [0.0f64; 16];
        self.dlacpy(Part::All, nd, nd, &t[j1 * ldt + j1..], ldt, &mut d, LDD);
        let dnorm = self.dlange(MatrixNorm::MaxAbs, nd, nd, &d, LDD);
        let thresh = (10.0 * PREC * dnorm).max(SAFE_MIN / PREC);

        // Solve T11*X - X*T22 = scale*T12.
        let mut x = [0.0f64; 4];
        const LDX: usize = 2;
        let (scale, _, _) = self.dlasy2(false, false, -1, n1, n2, &d, LDD, &d[n1 * LDD + n1..], LDD, &d[n1..], LDD, &mut x, LDX);

        match (n1, n2) {
            (1, 2) => {
                // Reflector H with ( scale, X11, X12 ) H = ( 0, 0, * ).
                let mut u = [scale, x[0], 1.0];
                let (_, tau) = self.dlarfg(3, x[1], &mut u[..2], 1);
                u[2] = 1.0;
                let t11 = t[j1 * ldt + j1];

                self.dlarfx(Side::Left, 3, 3, &u, tau, &mut d, LDD, work);
                self.dlarfx(Side::Right, 3, 3, &u, tau, &mut d, LDD, work);
                let fill = d[2 * LDD].abs().max(d[2 * LDD + 1].abs()).max((d[2 * LDD + 2] - t11).abs());
                if fill > thresh {
                    return false;
                }

                self.dlarfx(Side::Left, 3, n - j1, &u, tau, &mut t[j1 * ldt + j1..], ldt, work);
                self.dlarfx(Side::Right, j2 + 1, 3, &u, tau, &mut t[j1..], ldt, work);
                t[j3 * ldt + j1] = 0.0;
                t[j3 * ldt + j2] = 0.0;
                t[j3 * ldt + j3] = t11;
                if wantq {
                    self.dlarfx(Side::Right, n, 3, &u, tau, &mut q[j1..], ldq, work);
                }
            }
            (2, 1) => {
                // Reflector H with H ( -X11, -X21, scale )ᵀ = ( *, 0, 0 )ᵀ.
                let mut u = [1.0, -x[LDX], scale];
                let (_, tau) = self.dlarfg(3, -x[0], &mut u[1..], 1);
                u[0] = 1.0;
                let t33 = t[j3 * ldt + j3];

                self.dlarfx(Side::Left, 3, 3, &u, tau, &mut d, LDD, work);
                self.dlarfx(Side::Right, 3, 3, &u, tau, &mut d, LDD, work);
                let fill = d[LDD].abs().max(d[2 * LDD].abs()).max((d[0] - t33).abs());
                if fill > thresh {
                    return false;
                }

                self.dlarfx(Side::Right, j3 + 1, 3, &u, tau, &mut t[j1..], ldt, work);
                self.dlarfx(Side::Left, 3, n - j1 - 1, &u, tau, &mut t[j1 * ldt + j2..], ldt, work);
                t[j1 * ldt + j1] = t33;
                t[j2 * ldt + j1] = 0.0;
                t[j3 * ldt + j1] = 0.0;
                if wantq {
                    self.dlarfx(Side::Right, n, 3, &u, tau, &mut q[j1..], ldq, work);
                }
            }
            _ => {
                // Reflectors H1, H2 with
                //   H2 H1 [ -X11 -X12; -X21 -X22; scale 0; 0 scale ] = [ * *; 0 *; 0 0; 0 0 ].
                let mut u1 = [1.0, -x[LDX], scale];
                let (_, tau1) = self.dlarfg(3, -x[0], &mut u1[1..], 1);
                u1[0] = 1.0;
                let temp = -tau1 * (x[1] + u1[1] * x[LDX + 1]);
                let mut u2 = [1.0, -temp * u1[2], scale];
                let (_, tau2) = self.dlarfg(3, -temp * u1[1] - x[LDX + 1], &mut u2[1..], 1);
                u2[0] = 1.0;

                self.dlarfx(Side::Left, 3, 4, &u1, tau1, &mut d, LDD, work);
                self.dlarfx(Side::Right, 4, 3, &u1, tau1, &mut d, LDD, work);
                self.dlarfx(Side::Left, 3, 4, &u2, tau2, &mut d[LDD..], LDD, work);
                self.dlarfx(Side::Right, 4, 3, &u2, tau2, &mut d[1..], LDD, work);
                let fill = d[2 * LDD]
                    .abs()
                    .max(d[2 * LDD + 1].abs())
                    .max(d[3 * LDD].abs())
                    .max(d[3 * LDD + 1].abs());
                if fill > thresh {
                    return false;
                }

                let j4 = j1 + 3;
                self.dlarfx(Side::Left, 3, n - j1, &u1, tau1, &mut t[j1 * ldt + j1..], ldt, work);
                self.dlarfx(Side::Right, j4 + 1, 3, &u1, tau1, &mut t[j1..], ldt, work);
                self.dlarfx(Side::Left, 3, n - j1, &u2, tau2, &mut t[j2 * ldt + j1..], ldt, work);
                self.dlarfx(Side::Right, j4 + 1, 3, &u2, tau2, &mut t[j2..], ldt, work);
                t[j3 * ldt + j1] = 0.0;
                t[j3 * ldt + j2] = 0.0;
                t[j4 * ldt + j1] = 0.0;
                t[j4 * ldt + j2] = 0.0;
                if wantq {
                    self.dlarfx(Side::Right, n, 3, &u1, tau1, &mut q[j1..], ldq, work);
                    self.dlarfx(Side::Right, n, 3, &u2, tau2, &mut q[j2..], ldq, work);
                }
            }
        }

        if n2 == 2 {
            // The block now at j1 is the old T22; standardize it.
            self.standardize_block(wantq, n, t, ldt, q, ldq, j1);
        }
        if n1 == 2 {
            self.standardize_block(wantq, n, t, ldt, q, ldq, j1 + n2);
        }
        true
    }

    /// Put the 2×2 diagonal block at (k, k) into Schur canonical form and
    /// apply the rotation to the rest of T and to Q.
    fn standardize_block(&self, wantq: bool, n: usize, t: &mut [f64], ldt: usize, q: &mut [f64], ldq: usize, k: usize) {
        let s = self.dlanv2(t[k * ldt + k], t[k * ldt + k + 1], t[(k + 1) * ldt + k], t[(k + 1) * ldt + k + 1]);
        t[k * ldt + k] = s.a;
        t[k * ldt + k + 1] = s.b;
        t[(k + 1) * ldt + k] = s.c;
        t[(k + 1) * ldt + k + 1] = s.d;
        if k + 2 < n {
            views::rotate_rows(&self.blas, t, ldt, k, k + 1, k + 2, n - k - 2, s.cs, s.sn);
        }
        views::rotate_columns(t, ldt, 0, k, k, k + 1, s.cs, s.sn);
        if wantq {
            views::rotate_columns(q, ldq, 0, n, k, k + 1, s.cs, s.sn);
        }
    }

    /// Move the diagonal block of T starting at row `ifst` to row `ilst` by
    /// a sequence of adjacent swaps, keeping T in Schur canonical form.
    /// With `wantq`, Q is overwritten by `Q * Z` where Z is the orthogonal
    /// transformation. `work` needs n entries.
    ///
    /// If `ifst` or `ilst` points at the second row of a 2×2 block it is
    /// moved to the first. Returns `(ifst, ilst, ok)` with the adjusted
    /// `ifst` and the row where the block ended up. On a rejected swap
    /// `ok` is false and the block stays where it was at that point; T is
    /// still a valid Schur form.
    pub fn dtrexc(
        &self,
        wantq: bool,
        n: usize,
        t: &mut [f64],
        ldt: usize,
        q: &mut [f64],
        ldq: usize,
        ifst: usize,
        ilst: usize,
        work: &mut [f64],
    ) -> (usize, usize, bool) {
        require!(ldt >= n.max(1), Precondition::BadLdT);
        require!(ldq >= 1 && (!wantq || ldq >= n), Precondition::BadLdZ);
        require!(n == 0 || (ifst < n && ilst < n), Precondition::BadReorderIndex);
        if n <= 1 {
            return (ifst, ilst, true);
        }
        require!(t.len() >= matrix_len(n, n, ldt), Precondition::ShortT);
        if wantq {
            require!(q.len() >= matrix_len(n, n, ldq), Precondition::ShortZ);
        }
        require!(work.len() >= n, Precondition::ShortWork);

        let sub = |t: &[f64], i: usize| t[i * ldt + i - 1] != 0.0;

        let mut ifst = ifst;
        if ifst > 0 && sub(t, ifst) {
            ifst -= 1;
        }
        let mut nbf = if ifst + 1 < n && sub(t, ifst + 1) { 2 } else { 1 };
        let mut ilst = ilst;
        if ilst > 0 && sub(t, ilst) {
            ilst -= 1;
        }
        let nbl = if ilst + 1 < n && sub(t, ilst + 1) { 2 } else { 1 };

        if ifst == ilst {
            return (ifst, ilst, true);
        }

        if ifst < ilst {
            if nbf == 2 && nbl == 1 {
                ilst -= 1;
            }
            if nbf == 1 && nbl == 2 {
                ilst += 1;
            }
            let mut here = ifst;
            while here < ilst {
                if nbf != 3 {
                    // Swap the 1×1 or 2×2 block with the block below.
                    let nbnext = if here + nbf + 1 < n && sub(t, here + nbf + 1) { 2 } else { 1 };
                    if !self.dlaexc(wantq, n, t, ldt, q, ldq, here, nbf, nbnext, work) {
                        return (ifst, here, false);
                    }
                    here += nbnext;
                    // A 2×2 block may have split into two 1×1 blocks.
                    if nbf == 2 && !sub(t, here + 1) {
                        nbf = 3;
                    }
                    continue;
                }

                // Two 1×1 blocks, each swapped separately.
                let mut nbnext = if here + 3 < n && sub(t, here + 3) { 2 } else { 1 };
                if !self.dlaexc(wantq, n, t, ldt, q, ldq, here + 1, 1, nbnext, work) {
                    return (ifst, here, false);
                }
                if nbnext == 1 {
                    self.dlaexc(wantq, n, t, ldt, q, ldq, here, 1, 1, work);
                    here += 1;
                    continue;
                }
                if !sub(t, here + 2) {
                    nbnext = 1;
                }
                if nbnext == 2 {
                    if !self.dlaexc(wantq, n, t, ldt, q, ldq, here, 1, 2, work) {
                        return (ifst, here, false);
                    }
                } else {
                    self.dlaexc(wantq, n, t, ldt, q, ldq, here, 1, 1, work);
                    self.dlaexc(wantq, n, t, ldt, q, ldq, here + 1, 1, 1, work);
                }
                here += 2;
            }
            return (ifst, here, true);
        }

        let mut here = ifst;
        while here > ilst {
            if nbf != 3 {
                // Swap the 1×1 or 2×2 block with the block above.
                let nbnext = if here >= 2 && sub(t, here - 1) { 2 } else { 1 };
                if !self.dlaexc(wantq, n, t, ldt, q, ldq, here - nbnext, nbnext, nbf, work) {
                    return (ifst, here, false);
                }
                here -= nbnext;
                if nbf == 2 && !sub(t, here + 1) {
                    nbf = 3;
                }
                continue;
            }

            let mut nbnext = if here >= 2 && sub(t, here - 1) { 2 } else { 1 };
            if !self.dlaexc(wantq, n, t, ldt, q, ldq, here - nbnext, nbnext, 1, work) {
                return (ifst, here, false);
            }
            if nbnext == 1 {
                self.dlaexc(wantq, n, t, ldt, q, ldq, here, 1, 1, work);
                here -= 1;
                continue;
            }
            if !sub(t, here) {
                nbnext = 1;
            }
            if nbnext == 2 {
                if !self.dlaexc(wantq, n, t, ldt, q, ldq, here - 1, 2, 1, work) {
                    return (ifst, here, false);
                }
            } else {
                self.dlaexc(wantq, n, t, ldt, q, ldq, here, 1, 1, work);
                self.dlaexc(wantq, n, t, ldt, q, ldq, here - 1, 1, 1, work);
            }
            here -= 2;
        }
        (ifst, here, true)
    }
}
