//! Symmetric tridiagonal eigenvalues by the implicit QL/QR method.

use crate::flags::{Direct, EigComp, MatrixNorm, Pivot, Sort};
use crate::{Blas64, Lapack, Part, Side};
use densrus_core::machine::{EPS, SAFE_MIN};
use densrus_core::{matrix_len, require, Precondition};

/// Sweeps allowed per eigenvalue.
const MAX_SWEEPS: usize = 30;

impl<B: Blas64> Lapack<B> {
    /// All eigenvalues, and optionally eigenvectors, of the symmetric
    /// tridiagonal matrix with diagonal `d[..n]` and off-diagonal `e[..n-1]`.
    ///
    /// On success `d` holds the eigenvalues in increasing order and, unless
    /// `compz` is [`EigComp::None`], column j of Z holds the eigenvector for
    /// `d[j]`. `work` needs `max(1, 2n-2)` entries when vectors are wanted
    /// and is not referenced otherwise.
    ///
    /// Returns `false` if the iteration budget of 30n sweeps ran out; `d`
    /// and `e` then hold a partially reduced tridiagonal matrix orthogonally
    /// similar to the input, with `e` nonzero where the split failed.
    pub fn dsteqr(
        &self,
        compz: EigComp,
        n: usize,
        d: &mut [f64],
        e: &mut [f64],
        z: &mut [f64],
        ldz: usize,
        work: &mut [f64],
    ) -> bool {
        let wantz = compz != EigComp::None;
        require!(ldz >= 1 && (!wantz || ldz >= n), Precondition::BadLdZ);
        if n == 0 {
            return true;
        }
        require!(d.len() >= n, Precondition::ShortD);
        require!(e.len() >= n - 1, Precondition::ShortE);
        if wantz {
            require!(z.len() >= matrix_len(n, n, ldz), Precondition::ShortZ);
            require!(work.len() >= (2 * n - 2).max(1), Precondition::ShortWork);
        }

        if compz == EigComp::Tridiag {
            self.dlaset(Part::All, n, n, 0.0, 1.0, z, ldz);
        }
        if n == 1 {
            return true;
        }

        let eps2 = EPS * EPS;
        let safmin = SAFE_MIN;
        let safmax = 1.0 / safmin;
        let ssfmax = safmax.sqrt() / 3.0;
        let ssfmin = safmin.sqrt() / eps2;

        let max_iter = MAX_SWEEPS * n;
        let mut jtot = 0;
        let mut l1 = 0;
        while l1 < n {
            // Split off the next unreduced block d[l1..=m].
            if l1 > 0 {
                e[l1 - 1] = 0.0;
            }
            let mut m = l1;
            while m < n - 1 {
                let tst = e[m].abs();
                if tst == 0.0 {
                    break;
                }
                if tst <= d[m].abs().sqrt() * d[m + 1].abs().sqrt() * EPS {
                    e[m] = 0.0;
                    break;
                }
                m += 1;
            }
            let mut l = l1;
            let lsv = l;
            let mut lend = m;
            let lendsv = lend;
            l1 = m + 1;
            if lend == l {
                continue;
            }

            // Scale the block into a safe range.
            let anorm = self.dlanst(MatrixNorm::MaxAbs, lend - l + 1, &d[l..], &e[l..]);
            if anorm == 0.0 {
                continue;
            }
            let scaled_to = if anorm > ssfmax {
                Some(ssfmax)
            } else if anorm < ssfmin {
                Some(ssfmin)
            } else {
                None
            };
            if let Some(to) = scaled_to {
                self.dlascl(anorm, to, lend - l + 1, 1, &mut d[l..], 1);
                self.dlascl(anorm, to, lend - l, 1, &mut e[l..], 1);
            }

            // Chase from the end with the smaller diagonal entry.
            if d[lend].abs() < d[l].abs() {
                lend = lsv;
                l = lendsv;
            }

            if lend > l {
                // QL iteration.
                loop {
                    let mut m = lend;
                    for mm in l..lend {
                        let tst = e[mm].abs().powi(2);
                        if tst <= (eps2 * d[mm].abs()) * d[mm + 1].abs() + safmin {
                            m = mm;
                            break;
                        }
                    }
                    if m < lend {
                        e[m] = 0.0;
                    }
                    let mut p = d[l];
                    if m == l {
                        l += 1;
                        if l <= lend {
                            continue;
                        }
                        break;
                    }
                    if m == l + 1 {
                        let (rt1, rt2) = if wantz {
                            let (rt1, rt2, c, s) = self.dlaev2(d[l], e[l], d[l + 1]);
                            work[l] = c;
                            work[n - 1 + l] = s;
                            let (cs, sn) = work.split_at(n - 1);
                            self.dlasr(Side::Right, Pivot::Variable, Direct::Backward, n, 2, &cs[l..], &sn[l..], &mut z[l..], ldz);
                            (rt1, rt2)
                        } else {
                            self.dlae2(d[l], e[l], d[l + 1])
                        };
                        d[l] = rt1;
                        d[l + 1] = rt2;
                        e[l] = 0.0;
                        l += 2;
                        if l <= lend {
                            continue;
                        }
                        break;
                    }
                    if jtot == max_iter {
                        break;
                    }
                    jtot += 1;

                    // Wilkinson shift from the leading 2×2.
                    let mut g = (d[l + 1] - p) / (2.0 * e[l]);
                    let mut r = self.dlapy2(g, 1.0);
                    g = d[m] - p + e[l] / (g + r.copysign(g));
                    let mut s = 1.0;
                    let mut c = 1.0;
                    p = 0.0;
                    for i in (l..m).rev() {
                        let f = s * e[i];
                        let b = c * e[i];
                        (c, s, r) = self.dlartg(g, f);
                        if i != m - 1 {
                            e[i + 1] = r;
                        }
                        g = d[i + 1] - p;
                        r = (d[i] - g) * s + 2.0 * c * b;
                        p = s * r;
                        d[i + 1] = g + p;
                        g = c * r - b;
                        if wantz {
                            work[i] = c;
                            work[n - 1 + i] = -s;
                        }
                    }
                    if wantz {
                        let (cs, sn) = work.split_at(n - 1);
                        self.dlasr(Side::Right, Pivot::Variable, Direct::Backward, n, m - l + 1, &cs[l..], &sn[l..], &mut z[l..], ldz);
                    }
                    d[l] -= p;
                    e[l] = g;
                }
            } else {
                // QR iteration.
                loop {
                    let mut m = lend;
                    for mm in (lend + 1..=l).rev() {
                        let tst = e[mm - 1].abs().powi(2);
                        if tst <= (eps2 * d[mm].abs()) * d[mm - 1].abs() + safmin {
                            m = mm;
                            break;
                        }
                    }
                    if m > lend {
                        e[m - 1] = 0.0;
                    }
                    let mut p = d[l];
                    if m == l {
                        if l == lend {
                            break;
                        }
                        l -= 1;
                        continue;
                    }
                    if m + 1 == l {
                        let (rt1, rt2) = if wantz {
                            let (rt1, rt2, c, s) = self.dlaev2(d[l - 1], e[l - 1], d[l]);
                            work[m] = c;
                            work[n - 1 + m] = s;
                            let (cs, sn) = work.split_at(n - 1);
                            self.dlasr(Side::Right, Pivot::Variable, Direct::Forward, n, 2, &cs[m..], &sn[m..], &mut z[l - 1..], ldz);
                            (rt1, rt2)
                        } else {
                            self.dlae2(d[l - 1], e[l - 1], d[l])
                        };
                        d[l - 1] = rt1;
                        d[l] = rt2;
                        e[l - 1] = 0.0;
                        if l < lend + 2 {
                            break;
                        }
                        l -= 2;
                        continue;
                    }
                    if jtot == max_iter {
                        break;
                    }
                    jtot += 1;

                    let mut g = (d[l - 1] - p) / (2.0 * e[l - 1]);
                    let mut r = self.dlapy2(g, 1.0);
                    g = d[m] - p + e[l - 1] / (g + r.copysign(g));
                    let mut s = 1.0;
                    let mut c = 1.0;
                    p = 0.0;
                    for i in m..l {
                        let f = s * e[i];
                        let b = c * e[i];
                        (c, s, r) = self.dlartg(g, f);
                        if i != m {
                            e[i - 1] = r;
                        }
                        g = d[i] - p;
                        r = (d[i + 1] - g) * s + 2.0 * c * b;
                        p = s * r;
                        d[i] = g + p;
                        g = c * r - b;
                        if wantz {
                            work[i] = c;
                            work[n - 1 + i] = s;
                        }
                    }
                    if wantz {
                        let (cs, sn) = work.split_at(n - 1);
                        self.dlasr(Side::Right, Pivot::Variable, Direct::Forward, n, l - m + 1, &cs[m..], &sn[m..], &mut z[m..], ldz);
                    }
                    d[l] -= p;
                    e[l - 1] = g;
                }
            }

            if let Some(to) = scaled_to {
                self.dlascl(to, anorm, lendsv - lsv + 1, 1, &mut d[lsv..], 1);
                self.dlascl(to, anorm, lendsv - lsv, 1, &mut e[lsv..], 1);
            }

            if jtot >= max_iter {
                let unconverged = e[..n - 1].iter().filter(|&&v| v != 0.0).count();
                if unconverged > 0 {
                    log::warn!("dsteqr: {} off-diagonal entries failed to converge in {} sweeps", unconverged, max_iter);
                    return false;
                }
                break;
            }
        }

        if !wantz {
            self.dlasrt(Sort::Increasing, n, d);
            return true;
        }
        // Selection sort keeps the eigenvector swaps to at most n-1.
        for i in 0..n - 1 {
            let mut k = i;
            let mut p = d[i];
            for j in i + 1..n {
                if d[j] < p {
                    k = j;
                    p = d[j];
                }
            }
            if k != i {
                d[k] = d[i];
                d[i] = p;
                for row in z.chunks_mut(ldz).take(n) {
                    row.swap(i, k);
                }
            }
        }
        true
    }
}
