//! Real Schur form of an upper Hessenberg matrix: `H = Z T Zᵀ`.
//!
//! [`Lapack::dhseqr`] is the driver. Small matrices go to the double-shift
//! QR of [`Lapack::dlahqr`]; larger ones to the small-bulge multishift QR
//! of [`Lapack::dlaqr04`], which alternates aggressive early deflation
//! ([`Lapack::dlaqr23`]) with sweeps of many simultaneous shifts
//! ([`Lapack::dlaqr5`]).
//!
//! Z, when wanted, is touched only in rows `iloz..=ihiz` and needs at least
//! `ihiz + 1` rows and columns.

use crate::tuning::{self, NIBBLE, NMIN};
use crate::views;
use crate::{Blas64, Lapack, Part, SchurComp, SchurJob, Side, Transpose, Work};
use densrus_core::machine::{PREC, SAFE_MIN};
use densrus_core::{matrix_len, require, Precondition};
use log::{debug, warn};

/// Matrices up to this order always use `dlahqr`.
const NTINY: usize = 15;

/// Order of the zero-padded copy that gives `dlaqr04` room when `dlahqr`
/// fails on a small matrix.
const NL: usize = 49;

/// Iterations without deflation before the window size is varied.
const KEXNW: usize = 5;

/// Iterations without deflation between exceptional shifts.
const KEXSH: usize = 6;

const WILK1: f64 = 0.75;
const WILK2: f64 = -0.4375;

impl<B: Blas64> Lapack<B> {
    // ========================================================================
    // Driver
    // ========================================================================

    /// Eigenvalues of the upper Hessenberg matrix H and, optionally, its
    /// Schur factorization `H = Z T Zᵀ`.
    ///
    /// H is assumed upper triangular outside rows and columns `ilo..=ihi`,
    /// as left by balancing; its eigenvalues there are copied from the
    /// diagonal. With [`SchurJob::SchurForm`], H is overwritten by the
    /// quasi-triangular T in Schur canonical form. [`SchurComp::Identity`]
    /// sets Z to the Schur vectors of H; [`SchurComp::Original`] multiplies
    /// the incoming Z (usually the Q of `dgehrd`) by them.
    ///
    /// `wr` and `wi` receive the eigenvalues; complex pairs are adjacent
    /// with the positive imaginary part first, in the order of the diagonal
    /// of T. The workspace minimum is `max(1, n)`.
    ///
    /// Returns 0 on success. Otherwise returns `k > 0`: the eigenvalues at
    /// `k..=ihi` have converged and the leading block of H up to row `k-1`
    /// is still unreduced.
    pub fn dhseqr(
        &self,
        job: SchurJob,
        compz: SchurComp,
        n: usize,
        ilo: usize,
        ihi: usize,
        h: &mut [f64],
        ldh: usize,
        wr: &mut [f64],
        wi: &mut [f64],
        z: &mut [f64],
        ldz: usize,
        work: Work<'_>,
    ) -> usize {
        let wantt = job == SchurJob::SchurForm;
        let wantz = compz != SchurComp::None;
        require!(ldh >= n.max(1), Precondition::BadLdH);
        require!(ldz >= 1 && (!wantz || ldz >= n), Precondition::BadLdZ);
        if n > 0 {
            require!(ilo <= ihi && ihi < n, Precondition::BadIloIhi);
        }

        let mut optimal = n.max(1);
        if n > 0 {
            let mut slot = [0.0];
            self.dlaqr04(wantt, wantz, n, ilo, ihi, &mut [], ldh, &mut [], &mut [], ilo, ihi, &mut [], ldz, Work::Query(&mut slot), 1);
            optimal = optimal.max(slot[0] as usize);
        }
        let Some(work) = work.resolve(optimal, n.max(1)) else {
            return 0;
        };
        if n == 0 {
            return 0;
        }
        require!(h.len() >= matrix_len(n, n, ldh), Precondition::ShortH);
        require!(wr.len() >= n && wi.len() >= n, Precondition::ShortEigenvalues);
        if wantz {
            require!(z.len() >= matrix_len(n, n, ldz), Precondition::ShortZ);
        }

        // Eigenvalues isolated by balancing.
        for i in (0..ilo).chain(ihi + 1..n) {
            wr[i] = h[i * ldh + i];
            wi[i] = 0.0;
        }
        if compz == SchurComp::Identity {
            self.dlaset(Part::All, n, n, 0.0, 1.0, z, ldz);
        }
        if ilo == ihi {
            wr[ilo] = h[ilo * ldh + ilo];
            wi[ilo] = 0.0;
            return 0;
        }

        let mut unconverged;
        if n > NMIN.max(NTINY) {
            unconverged = self.dlaqr04(
                wantt,
                wantz,
                n,
                ilo,
                ihi,
                h,
                ldh,
                &mut wr[..=ihi],
                &mut wi[..=ihi],
                ilo,
                ihi,
                z,
                ldz,
                Work::Execute(work),
                1,
            );
        } else {
            unconverged = self.dlahqr(wantt, wantz, n, ilo, ihi, h, ldh, &mut wr[..=ihi], &mut wi[..=ihi], ilo, ihi, z, ldz);
            if unconverged > 0 {
                // The multishift code sometimes succeeds where dlahqr fails.
                let kbot = unconverged - 1;
                debug!("dhseqr: dlahqr stalled at {}, retrying with dlaqr04", kbot);
                if n >= NL {
                    unconverged = self.dlaqr04(
                        wantt,
                        wantz,
                        n,
                        ilo,
                        kbot,
                        h,
                        ldh,
                        &mut wr[..=kbot],
                        &mut wi[..=kbot],
                        ilo,
                        ihi,
                        z,
                        ldz,
                        Work::Execute(work),
                        1,
                    );
                } else {
                    // Too small for the multishift code; run it on a
                    // zero-padded copy.
                    let mut hl = vec![0.0; NL * NL];
                    self.dlacpy(Part::All, n, n, h, ldh, &mut hl, NL);
                    let mut workl = vec![0.0; NL];
                    unconverged = self.dlaqr04(
                        wantt,
                        wantz,
                        NL,
                        ilo,
                        kbot,
                        &mut hl,
                        NL,
                        &mut wr[..=kbot],
                        &mut wi[..=kbot],
                        ilo,
                        ihi,
                        z,
                        ldz,
                        Work::Execute(&mut workl),
                        1,
                    );
                    if wantt || unconverged > 0 {
                        self.dlacpy(Part::All, n, n, &hl, NL, h, ldh);
                    }
                }
            }
        }

        // Clear out the entries below the first subdiagonal.
        if (wantt || unconverged > 0) && n > 2 {
            self.dlaset(Part::Lower, n - 2, n - 2, 0.0, 0.0, &mut h[2 * ldh..], ldh);
        }
        if unconverged > 0 {
            warn!("dhseqr: QR iteration failed to converge; eigenvalues {}..={} are valid", unconverged, ihi);
        }
        unconverged
    }

    // ========================================================================
    // Double-shift QR
    // ========================================================================

    /// Eigenvalues and, optionally, the Schur form of the Hessenberg
    /// submatrix in rows and columns `ilo..=ihi` by the double-shift
    /// implicit QR algorithm. Intended for small matrices and as the base
    /// case of the multishift code.
    ///
    /// With `wantt` the full T is computed, otherwise only eigenvalues. With
    /// `wantz` the transformations are applied to rows `iloz..=ihiz` of Z.
    /// `wr` and `wi` need `ihi + 1` entries.
    ///
    /// Returns 0 on success, or `i + 1` if the iteration budget ran out
    /// while working on the block ending at row i; eigenvalues `i+1..=ihi`
    /// have then converged.
    pub fn dlahqr(
        &self,
        wantt: bool,
        wantz: bool,
        n: usize,
        ilo: usize,
        ihi: usize,
        h: &mut [f64],
        ldh: usize,
        wr: &mut [f64],
        wi: &mut [f64],
        iloz: usize,
        ihiz: usize,
        z: &mut [f64],
        ldz: usize,
    ) -> usize {
        require!(ldh >= n.max(1), Precondition::BadLdH);
        require!(ldz >= 1, Precondition::BadLdZ);
        if n == 0 {
            return 0;
        }
        require!(ilo <= ihi && ihi < n, Precondition::BadIloIhi);
        require!(h.len() >= matrix_len(n, n, ldh), Precondition::ShortH);
        require!(wr.len() > ihi && wi.len() > ihi, Precondition::ShortEigenvalues);
        if wantz {
            check_z(iloz, ihiz, ilo, ihi, n, z, ldz);
        }

        if ilo == ihi {
            wr[ilo] = h[ilo * ldh + ilo];
            wi[ilo] = 0.0;
            return 0;
        }

        // Clear the two diagonals below the subdiagonal.
        for j in ilo..ihi.saturating_sub(2) {
            h[(j + 2) * ldh + j] = 0.0;
            h[(j + 3) * ldh + j] = 0.0;
        }
        if ilo + 2 <= ihi {
            h[ihi * ldh + ihi - 2] = 0.0;
        }

        let nh = ihi - ilo + 1;
        let nz = ihiz + 1 - iloz.min(ihiz + 1);
        let ulp = PREC;
        let smlnum = SAFE_MIN * (nh as f64 / ulp);

        // Rows and columns of H the transformations are applied to.
        let (mut i1, mut i2) = (0, n - 1);
        let itmax = 30 * nh.max(10);
        let mut kdefl = 0;

        // Eigenvalues i+1..=ihi have converged. The active block is l..=i.
        let mut i = ihi;
        loop {
            let mut l = ilo;
            let mut converged = false;
            for _ in 0..=itmax {
                // Look for a single small subdiagonal entry.
                let mut k = i;
                while k > l {
                    let hkk1 = h[k * ldh + k - 1].abs();
                    if hkk1 <= smlnum {
                        break;
                    }
                    let mut tst = h[(k - 1) * ldh + k - 1].abs() + h[k * ldh + k].abs();
                    if tst == 0.0 {
                        if k >= ilo + 2 {
                            tst += h[(k - 1) * ldh + k - 2].abs();
                        }
                        if k < ihi {
                            tst += h[(k + 1) * ldh + k].abs();
                        }
                    }
                    // Ahues & Kressner deflation criterion.
                    if hkk1 <= ulp * tst {
                        let hk1k = h[(k - 1) * ldh + k].abs();
                        let ab = hkk1.max(hk1k);
                        let ba = hkk1.min(hk1k);
                        let diff = (h[(k - 1) * ldh + k - 1] - h[k * ldh + k]).abs();
                        let aa = h[k * ldh + k].abs().max(diff);
                        let bb = h[k * ldh + k].abs().min(diff);
                        let s = aa + ab;
                        if ab / s * ba <= smlnum.max(aa / s * bb * ulp) {
                            break;
                        }
                    }
                    k -= 1;
                }
                l = k;
                if l > ilo {
                    h[l * ldh + l - 1] = 0.0;
                }
                if l + 1 >= i {
                    // A 1×1 or 2×2 block has split off.
                    converged = true;
                    break;
                }
                kdefl += 1;

                if !wantt {
                    i1 = l;
                    i2 = i;
                }

                let (mut h11, mut h12, mut h21, mut h22) = if kdefl % (2 * 10) == 0 {
                    // Exceptional shift based at the bottom.
                    let s = h[i * ldh + i - 1].abs() + h[(i - 1) * ldh + i - 2].abs();
                    let a = WILK1 * s + h[i * ldh + i];
                    (a, WILK2 * s, s, a)
                } else if kdefl % 10 == 0 {
                    // Exceptional shift based at the top.
                    let s = h[(l + 1) * ldh + l].abs() + h[(l + 2) * ldh + l + 1].abs();
                    let a = WILK1 * s + h[l * ldh + l];
                    (a, WILK2 * s, s, a)
                } else {
                    // Francis double shift from the trailing 2×2.
                    (h[(i - 1) * ldh + i - 1], h[(i - 1) * ldh + i], h[i * ldh + i - 1], h[i * ldh + i])
                };
                let s = h11.abs() + h12.abs() + h21.abs() + h22.abs();
                let (mut rt1r, mut rt1i, mut rt2r, mut rt2i) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
                if s != 0.0 {
                    h11 /= s;
                    h21 /= s;
                    h12 /= s;
                    h22 /= s;
                    let tr = (h11 + h22) / 2.0;
                    let det = (h11 - tr) * (h22 - tr) - h12 * h21;
                    let rtdisc = det.abs().sqrt();
                    if det >= 0.0 {
                        // Complex conjugate shifts.
                        rt1r = tr * s;
                        rt2r = rt1r;
                        rt1i = rtdisc * s;
                        rt2i = -rt1i;
                    } else {
                        // Two real shifts; use the one closer to h22 twice.
                        rt1r = tr + rtdisc;
                        rt2r = tr - rtdisc;
                        if (rt1r - h22).abs() <= (rt2r - h22).abs() {
                            rt1r *= s;
                            rt2r = rt1r;
                        } else {
                            rt2r *= s;
                            rt1r = rt2r;
                        }
                        rt1i = 0.0;
                        rt2i = 0.0;
                    }
                }

                // Look for two consecutive small subdiagonal entries.
                let mut v = [0.0f64; 3];
                let mut m = i - 2;
                loop {
                    let mut h21s = h[(m + 1) * ldh + m];
                    let hmm = h[m * ldh + m];
                    let mut s = (hmm - rt2r).abs() + rt2i.abs() + h21s.abs();
                    h21s /= s;
                    v[0] = h21s * h[m * ldh + m + 1] + (hmm - rt1r) * ((hmm - rt2r) / s) - rt2i / s * rt1i;
                    v[1] = h21s * (hmm + h[(m + 1) * ldh + m + 1] - rt1r - rt2r);
                    v[2] = h21s * h[(m + 2) * ldh + m + 1];
                    s = v[0].abs() + v[1].abs() + v[2].abs();
                    v[0] /= s;
                    v[1] /= s;
                    v[2] /= s;
                    if m == l {
                        break;
                    }
                    let dsum = h[(m - 1) * ldh + m - 1].abs() + hmm.abs() + h[(m + 1) * ldh + m + 1].abs();
                    if h[m * ldh + m - 1].abs() * (v[1].abs() + v[2].abs()) <= ulp * v[0].abs() * dsum {
                        break;
                    }
                    m -= 1;
                }

                // Double-shift QR step: introduce the bulge at m and chase it
                // to the bottom of the active block.
                for k in m..i {
                    let nr = (i - k + 1).min(3);
                    if k > m {
                        for (r, vr) in v.iter_mut().enumerate().take(nr) {
                            *vr = h[(k + r) * ldh + k - 1];
                        }
                    }
                    let (beta, t0) = self.dlarfg(nr, v[0], &mut v[1..nr], 1);
                    v[0] = beta;
                    if k > m {
                        h[k * ldh + k - 1] = beta;
                        h[(k + 1) * ldh + k - 1] = 0.0;
                        if k + 1 < i {
                            h[(k + 2) * ldh + k - 1] = 0.0;
                        }
                    } else if m > l {
                        // Equivalent to negating H[k, k-1], but safe when v
                        // underflows.
                        h[k * ldh + k - 1] *= 1.0 - t0;
                    }
                    let t1 = t0 * v[1];
                    if nr == 3 {
                        let t2 = t0 * v[2];
                        for j in k..=i2 {
                            let sum = h[k * ldh + j] + v[1] * h[(k + 1) * ldh + j] + v[2] * h[(k + 2) * ldh + j];
                            h[k * ldh + j] -= sum * t0;
                            h[(k + 1) * ldh + j] -= sum * t1;
                            h[(k + 2) * ldh + j] -= sum * t2;
                        }
                        for j in i1..=(k + 3).min(i) {
                            let row = &mut h[j * ldh + k..j * ldh + k + 3];
                            let sum = row[0] + v[1] * row[1] + v[2] * row[2];
                            row[0] -= sum * t0;
                            row[1] -= sum * t1;
                            row[2] -= sum * t2;
                        }
                        if wantz {
                            for j in iloz..=ihiz {
                                let row = &mut z[j * ldz + k..j * ldz + k + 3];
                                let sum = row[0] + v[1] * row[1] + v[2] * row[2];
                                row[0] -= sum * t0;
                                row[1] -= sum * t1;
                                row[2] -= sum * t2;
                            }
                        }
                    } else if nr == 2 {
                        for j in k..=i2 {
                            let sum = h[k * ldh + j] + v[1] * h[(k + 1) * ldh + j];
                            h[k * ldh + j] -= sum * t0;
                            h[(k + 1) * ldh + j] -= sum * t1;
                        }
                        for j in i1..=i {
                            let row = &mut h[j * ldh + k..j * ldh + k + 2];
                            let sum = row[0] + v[1] * row[1];
                            row[0] -= sum * t0;
                            row[1] -= sum * t1;
                        }
                        if wantz {
                            for j in iloz..=ihiz {
                                let row = &mut z[j * ldz + k..j * ldz + k + 2];
                                let sum = row[0] + v[1] * row[1];
                                row[0] -= sum * t0;
                                row[1] -= sum * t1;
                            }
                        }
                    }
                }
            }

            if !converged {
                return i + 1;
            }

            if l == i {
                // One real eigenvalue.
                wr[i] = h[i * ldh + i];
                wi[i] = 0.0;
            } else if l + 1 == i {
                // A pair: standardize the 2×2 block.
                let st = self.dlanv2(h[(i - 1) * ldh + i - 1], h[(i - 1) * ldh + i], h[i * ldh + i - 1], h[i * ldh + i]);
                h[(i - 1) * ldh + i - 1] = st.a;
                h[(i - 1) * ldh + i] = st.b;
                h[i * ldh + i - 1] = st.c;
                h[i * ldh + i] = st.d;
                wr[i - 1] = st.rt1r;
                wi[i - 1] = st.rt1i;
                wr[i] = st.rt2r;
                wi[i] = st.rt2i;
                if wantt {
                    if i2 > i {
                        views::rotate_rows(&self.blas, h, ldh, i - 1, i, i + 1, i2 - i, st.cs, st.sn);
                    }
                    views::rotate_columns(h, ldh, i1, i - 1 - i1, i - 1, i, st.cs, st.sn);
                }
                if wantz {
                    views::rotate_columns(z, ldz, iloz, nz, i - 1, i, st.cs, st.sn);
                }
            }

            kdefl = 0;
            if l <= ilo {
                return 0;
            }
            i = l - 1;
        }
    }

    // ========================================================================
    // Multishift QR with aggressive early deflation
    // ========================================================================

    /// Eigenvalues and, optionally, the Schur form of the Hessenberg
    /// submatrix `ilo..=ihi` by the small-bulge multishift QR algorithm
    /// with aggressive early deflation. Arguments are as for
    /// [`dlahqr`](Self::dlahqr); matrices of order at most 15 are passed to
    /// it directly.
    ///
    /// `recur` bounds the depth of the recursion through
    /// [`dlaqr23`](Self::dlaqr23); the driver passes 1. The workspace
    /// minimum is `max(1, n)`. The bulge-chasing and deflation panels are
    /// scratch buffers allocated per call.
    pub fn dlaqr04(
        &self,
        wantt: bool,
        wantz: bool,
        n: usize,
        ilo: usize,
        ihi: usize,
        h: &mut [f64],
        ldh: usize,
        wr: &mut [f64],
        wi: &mut [f64],
        iloz: usize,
        ihiz: usize,
        z: &mut [f64],
        ldz: usize,
        work: Work<'_>,
        recur: usize,
    ) -> usize {
        require!(ldh >= n.max(1), Precondition::BadLdH);
        require!(ldz >= 1, Precondition::BadLdZ);
        if n > 0 {
            require!(ilo <= ihi && ihi < n, Precondition::BadIloIhi);
        }
        if n <= NTINY {
            if work.resolve(1, 1).is_none() {
                return 0;
            }
            return self.dlahqr(wantt, wantz, n, ilo, ihi, h, ldh, wr, wi, iloz, ihiz, z, ldz);
        }

        let active = ihi - ilo + 1;
        let nwr = tuning::deflation_window(active).max(2).min(active).min((n - 1) / 3);
        let nsr = tuning::shift_count(active).min((n - 3) / 6).min(ihi - ilo);
        let nsr = (nsr - nsr % 2).max(2);

        let mut slot = [0.0];
        let wq = (nwr + 1).min(active);
        self.dlaqr23(
            wantt,
            wantz,
            n,
            ilo,
            ihi,
            wq,
            &mut [],
            ldh,
            iloz,
            ihiz,
            &mut [],
            ldz,
            &mut [],
            &mut [],
            &mut [],
            n,
            n,
            &mut [],
            n,
            n,
            &mut [],
            n,
            Work::Query(&mut slot),
            recur,
        );
        let lwkopt = (3 * nsr / 2).max(slot[0] as usize);
        let Some(work) = work.resolve(lwkopt, n.max(1)) else {
            return 0;
        };
        require!(h.len() >= matrix_len(n, n, ldh), Precondition::ShortH);
        require!(wr.len() > ihi && wi.len() > ihi, Precondition::ShortEigenvalues);
        if wantz {
            check_z(iloz, ihiz, ilo, ihi, n, z, ldz);
        }

        let nmin = NMIN.max(NTINY);
        let kacc22 = tuning::kacc22(active);
        let lwork = work.len();
        let nwmax = ((n - 1) / 3).min(lwork / 2);
        let nsmax = ((n - 3) / 6).min(2 * lwork / 3);
        let nsmax = nsmax - nsmax % 2;
        debug!(
            "dlaqr04: n={} ilo={} ihi={} nwr={} nsr={} kacc22={} recur={}",
            n, ilo, ihi, nwr, nsr, kacc22, recur
        );

        // Scratch panels: V or U (square), T or WH (wide), WV (tall).
        let span = nwmax.max((3 * nsmax).saturating_sub(3)).max(1);
        let mut square = vec![0.0; span * span];
        let mut wide = vec![0.0; span * n];
        let mut tall = vec![0.0; n * span];

        let itmax = (2 * KEXSH).max(30) * active.max(10);
        let mut unconverged = 0;
        let mut ndfl = 1;
        let mut ndec: isize = 0;
        let mut nw = nwmax;
        let mut kbot = ihi;
        let mut it = 0;
        loop {
            if it == itmax {
                unconverged = kbot + 1;
                break;
            }
            it += 1;

            // Locate the active block.
            let mut ktop = ilo;
            for k in (ilo + 1..=kbot).rev() {
                if h[k * ldh + k - 1] == 0.0 {
                    ktop = k;
                    break;
                }
            }

            // Deflation window size: normally nwr, or nwr+1 when that
            // window has the smaller subdiagonal entry. After KEXNW
            // iterations without deflation, grow it to the maximum and then
            // shrink it gradually.
            let nh = kbot - ktop + 1;
            let nwupbd = nh.min(nwmax);
            nw = if ndfl < KEXNW { nwupbd.min(nwr) } else { nwupbd.min(2 * nw) };
            if nw < nwmax {
                if nw + 1 >= nh {
                    nw = nh;
                } else {
                    let kwtop = kbot - nw + 1;
                    if h[kwtop * ldh + kwtop - 1].abs() > h[(kwtop - 1) * ldh + kwtop - 2].abs() {
                        nw += 1;
                    }
                }
            }
            if ndfl < KEXNW {
                ndec = -1;
            } else if ndec >= 0 || nw >= nwupbd {
                ndec += 1;
                if (nw as isize) - ndec < 2 {
                    ndec = 0;
                }
                nw -= ndec as usize;
            }

            let (ls, ld) = self.dlaqr23(
                wantt,
                wantz,
                n,
                ktop,
                kbot,
                nw,
                h,
                ldh,
                iloz,
                ihiz,
                z,
                ldz,
                &mut wr[..=kbot],
                &mut wi[..=kbot],
                &mut square,
                nw,
                n,
                &mut wide,
                n,
                n,
                &mut tall,
                nw,
                Work::Execute(&mut *work),
                recur,
            );
            if ld > kbot - ilo {
                // Everything left has deflated.
                break;
            }
            kbot -= ld;
            let mut ks = kbot + 1 - ls;

            // Skip the sweep when many eigenvalues just deflated and the
            // active block is still large: the next deflation window will
            // likely deflate more.
            if ld == 0 || (100 * ld <= nw * NIBBLE && kbot + 1 - ktop > nmin.min(nwmax)) {
                let mut ns = nsmax.min(nsr).min((kbot - ktop).max(2));
                ns -= ns % 2;

                if ndfl % KEXSH == 0 {
                    // Exceptional shifts.
                    ks = kbot + 1 - ns;
                    let mut i = kbot;
                    while i > ks.max(ktop + 1) {
                        let ss = h[i * ldh + i - 1].abs() + h[(i - 1) * ldh + i - 2].abs();
                        let aa = WILK1 * ss + h[i * ldh + i];
                        let st = self.dlanv2(aa, ss, WILK2 * ss, aa);
                        wr[i - 1] = st.rt1r;
                        wi[i - 1] = st.rt1i;
                        wr[i] = st.rt2r;
                        wi[i] = st.rt2i;
                        i -= 2;
                    }
                    if ks == ktop {
                        wr[ks + 1] = h[(ks + 1) * ldh + ks + 1];
                        wi[ks + 1] = 0.0;
                        wr[ks] = wr[ks + 1];
                        wi[ks] = wi[ks + 1];
                    }
                } else {
                    if kbot + 1 - ks <= ns / 2 {
                        // Too few shifts from the window; take eigenvalues
                        // of a trailing submatrix instead.
                        ks = kbot + 1 - ns;
                        let mut hs = views::block(h, ldh, ks, ks, ns, ns);
                        let failed = if ns > nmin && recur > 0 {
                            self.dlaqr04(
                                false,
                                false,
                                ns,
                                0,
                                ns - 1,
                                &mut hs,
                                ns,
                                &mut wr[ks..ks + ns],
                                &mut wi[ks..ks + ns],
                                0,
                                0,
                                &mut [],
                                1,
                                Work::Execute(&mut *work),
                                recur - 1,
                            )
                        } else {
                            self.dlahqr(false, false, ns, 0, ns - 1, &mut hs, ns, &mut wr[ks..ks + ns], &mut wi[ks..ks + ns], 0, 0, &mut [], 1)
                        };
                        ks += failed;
                        if ks >= kbot {
                            // Rare QR failure: fall back to the trailing 2×2.
                            let st = self.dlanv2(
                                h[(kbot - 1) * ldh + kbot - 1],
                                h[(kbot - 1) * ldh + kbot],
                                h[kbot * ldh + kbot - 1],
                                h[kbot * ldh + kbot],
                            );
                            wr[kbot - 1] = st.rt1r;
                            wi[kbot - 1] = st.rt1i;
                            wr[kbot] = st.rt2r;
                            wi[kbot] = st.rt2i;
                            ks = kbot - 1;
                        }
                    }

                    if kbot + 1 - ks > ns {
                        // Sort by decreasing magnitude so the smallest shifts
                        // are used. Bubble sort keeps conjugate pairs together.
                        let mut k = kbot;
                        let mut sorted = false;
                        while k > ks && !sorted {
                            sorted = true;
                            for i in ks..k {
                                if wr[i].abs() + wi[i].abs() < wr[i + 1].abs() + wi[i + 1].abs() {
                                    sorted = false;
                                    wr.swap(i, i + 1);
                                    wi.swap(i, i + 1);
                                }
                            }
                            k -= 1;
                        }
                    }

                    // Pair up real shifts; conjugate pairs are already adjacent.
                    let mut i = kbot;
                    while i > ks + 1 {
                        if wi[i] != -wi[i - 1] {
                            wr[i - 2..=i].rotate_right(1);
                            wi[i - 2..=i].rotate_right(1);
                        }
                        i -= 2;
                    }
                }

                // Two real shifts: use the one closer to H[kbot, kbot] twice.
                if kbot + 1 - ks == 2 && wi[kbot] == 0.0 {
                    let hbb = h[kbot * ldh + kbot];
                    if (wr[kbot] - hbb).abs() < (wr[kbot - 1] - hbb).abs() {
                        wr[kbot - 1] = wr[kbot];
                    } else {
                        wr[kbot] = wr[kbot - 1];
                    }
                }

                ns = ns.min(kbot + 1 - ks);
                ns -= ns % 2;
                ks = kbot + 1 - ns;
                let kdu = (3 * ns).saturating_sub(3).max(1);
                self.dlaqr5(
                    wantt,
                    wantz,
                    kacc22,
                    n,
                    ktop,
                    kbot,
                    ns,
                    &mut wr[ks..ks + ns],
                    &mut wi[ks..ks + ns],
                    h,
                    ldh,
                    iloz,
                    ihiz,
                    z,
                    ldz,
                    &mut work[..],
                    3,
                    &mut square,
                    kdu,
                    n,
                    &mut tall,
                    kdu,
                    n,
                    &mut wide,
                    n,
                );
            }

            if ld > 0 {
                ndfl = 1;
            } else {
                ndfl += 1;
            }
        }
        if unconverged > 0 {
            debug!("dlaqr04: no convergence after {} iterations, {} rows left", itmax, unconverged);
        }
        unconverged
    }

    /// Aggressive early deflation on the trailing `nw x nw` window of the
    /// isolated active block `ktop..=kbot` of H.
    ///
    /// The window is reduced to Schur form, converged eigenvalues are
    /// detected from the spike of the transformation and deflated, and the
    /// rest are returned as shifts. The window is returned to Hessenberg
    /// form and the transformation is applied to the rest of H (all of it
    /// with `wantt`) and to rows `iloz..=ihiz` of Z (with `wantz`).
    ///
    /// Scratch: V is `nw x nw` with `ldv >= nw`, T is `nw x nh` with
    /// `nh >= nw` and `ldt >= nh`, WV is `nv x nw` with `ldwv >= nw`.
    /// `sr` and `si` need `kbot + 1` entries; the window's eigenvalues land
    /// in `kbot+1-nw..=kbot`. The workspace minimum is `max(1, 2*nw)`.
    ///
    /// Returns `(ns, nd)`: the number of unconverged eigenvalues available
    /// as shifts in `sr/si[kbot+1-nd-ns..=kbot-nd]`, and the number of
    /// deflated ones.
    pub fn dlaqr23(
        &self,
        wantt: bool,
        wantz: bool,
        n: usize,
        ktop: usize,
        kbot: usize,
        nw: usize,
        h: &mut [f64],
        ldh: usize,
        iloz: usize,
        ihiz: usize,
        z: &mut [f64],
        ldz: usize,
        sr: &mut [f64],
        si: &mut [f64],
        v: &mut [f64],
        ldv: usize,
        nh: usize,
        t: &mut [f64],
        ldt: usize,
        nv: usize,
        wv: &mut [f64],
        ldwv: usize,
        work: Work<'_>,
        recur: usize,
    ) -> (usize, usize) {
        require!(ldh >= n.max(1), Precondition::BadLdH);
        require!(n == 0 || (ktop <= kbot && kbot < n), Precondition::BadWindow);
        require!(ldz >= 1, Precondition::BadLdZ);
        require!(ldv >= nw.max(1), Precondition::BadLdV);
        require!(nh >= nw, Precondition::BadNw);
        require!(ldt >= nh.max(1), Precondition::BadLdT);
        require!(ldwv >= nw.max(1), Precondition::BadLdWV);

        let jw = if n == 0 { 0 } else { nw.min(kbot - ktop + 1) };
        let mut lwkopt = (2 * jw).max(1);
        if jw > 2 {
            let mut slot = [0.0];
            self.dgehrd(jw, 0, jw - 2, &mut [], jw, &mut [], Work::Query(&mut slot));
            let lwk1 = slot[0] as usize;
            self.dormhr(Side::Right, Transpose::NoTrans, jw, jw, 0, jw - 2, &[], jw, &[], &mut [], jw, Work::Query(&mut slot));
            let lwk2 = slot[0] as usize;
            lwkopt = jw + lwk1.max(lwk2);
            if recur > 0 {
                self.dlaqr04(true, true, jw, 0, jw - 1, &mut [], jw, &mut [], &mut [], 0, jw - 1, &mut [], jw, Work::Query(&mut slot), recur - 1);
                lwkopt = lwkopt.max(slot[0] as usize);
            }
        }
        let Some(work) = work.resolve(lwkopt, (2 * nw).max(1)) else {
            return (0, 0);
        };
        if jw == 0 {
            return (0, 0);
        }
        require!(h.len() >= matrix_len(n, n, ldh), Precondition::ShortH);
        require!(sr.len() > kbot && si.len() > kbot, Precondition::ShortShifts);
        require!(v.len() >= matrix_len(jw, jw, ldv), Precondition::ShortV);
        require!(t.len() >= matrix_len(jw, nh, ldt), Precondition::ShortT);
        require!(wv.len() >= matrix_len(nv, jw, ldwv), Precondition::ShortWV);
        if wantz {
            check_z(iloz, ihiz, ktop, kbot, n, z, ldz);
        }

        let ulp = PREC;
        let smlnum = SAFE_MIN * (n as f64 / ulp);

        // The spike: the subdiagonal entry coupling the window to the rest
        // of the active block.
        let kwtop = kbot + 1 - jw;
        let mut s = if kwtop != ktop { h[kwtop * ldh + kwtop - 1] } else { 0.0 };

        if kwtop == kbot {
            // 1×1 window.
            sr[kwtop] = h[kwtop * ldh + kwtop];
            si[kwtop] = 0.0;
            if s.abs() <= smlnum.max(ulp * h[kwtop * ldh + kwtop].abs()) {
                if kwtop > ktop {
                    h[kwtop * ldh + kwtop - 1] = 0.0;
                }
                return (0, 1);
            }
            return (1, 0);
        }

        // Reduce the window to Schur form T = Vᵀ W V. If the QR iteration
        // fails, deflation carries on with the part that converged: rows
        // infqr.. of T.
        self.dlacpy(Part::Upper, jw, jw, &h[kwtop * ldh + kwtop..], ldh, t, ldt);
        self.blas.dcopy(jw - 1, &h[(kwtop + 1) * ldh + kwtop..], (ldh + 1) as isize, &mut t[ldt..], (ldt + 1) as isize);
        self.dlaset(Part::All, jw, jw, 0.0, 1.0, v, ldv);
        let infqr = if recur > 0 && jw > NMIN {
            self.dlaqr04(
                true,
                true,
                jw,
                0,
                jw - 1,
                t,
                ldt,
                &mut sr[kwtop..],
                &mut si[kwtop..],
                0,
                jw - 1,
                v,
                ldv,
                Work::Execute(&mut *work),
                recur - 1,
            )
        } else {
            self.dlahqr(true, true, jw, 0, jw - 1, t, ldt, &mut sr[kwtop..], &mut si[kwtop..], 0, jw - 1, v, ldv)
        };

        // dtrexc needs a clean margin below the subdiagonal.
        for j in 0..jw.saturating_sub(3) {
            t[(j + 2) * ldt + j] = 0.0;
            t[(j + 3) * ldt + j] = 0.0;
        }
        if jw >= 3 {
            t[(jw - 1) * ldt + jw - 3] = 0.0;
        }

        // Deflation check: an eigenvalue (block) at the bottom of T is
        // converged when its spike entry s*V[0, ·] is negligible. Blocks
        // that are not are moved to the top, out of the way.
        let mut ns = jw;
        let mut ilst = infqr;
        while ilst < ns {
            let bulge = ns >= 2 && t[(ns - 1) * ldt + ns - 2] != 0.0;
            if !bulge {
                let mut abst = t[(ns - 1) * ldt + ns - 1].abs();
                if abst == 0.0 {
                    abst = s.abs();
                }
                if (s * v[ns - 1]).abs() <= smlnum.max(ulp * abst) {
                    ns -= 1;
                } else {
                    let (_, moved, _) = self.dtrexc(true, jw, t, ldt, v, ldv, ns - 1, ilst, work);
                    ilst = moved + 1;
                }
                continue;
            }
            let mut abst = t[(ns - 1) * ldt + ns - 1].abs()
                + t[(ns - 1) * ldt + ns - 2].abs().sqrt() * t[(ns - 2) * ldt + ns - 1].abs().sqrt();
            if abst == 0.0 {
                abst = s.abs();
            }
            if (s * v[ns - 1]).abs().max((s * v[ns - 2]).abs()) <= smlnum.max(ulp * abst) {
                ns -= 2;
            } else {
                // On a rare swap failure dtrexc reports where the block
                // stopped, which is still the right place to continue.
                let (_, moved, _) = self.dtrexc(true, jw, t, ldt, v, ldv, ns - 1, ilst, work);
                ilst = moved + 2;
            }
        }

        if ns == 0 {
            s = 0.0;
        }

        if ns < jw && ns >= infqr + 2 {
            // Sort the undeflated blocks by decreasing magnitude, which
            // helps graded matrices. Bubble sort copes with swap failures.
            let block_magnitude = |t: &[f64], i: usize, last: usize| -> f64 {
                if i == last || t[(i + 1) * ldt + i] == 0.0 {
                    t[i * ldt + i].abs()
                } else {
                    t[i * ldt + i].abs() + t[(i + 1) * ldt + i].abs().sqrt() * t[i * ldt + i + 1].abs().sqrt()
                }
            };
            let mut sorted = false;
            let mut i = ns;
            while !sorted {
                sorted = true;
                let kend = i.saturating_sub(1);
                i = infqr;
                let mut k = if i == ns - 1 || t[(i + 1) * ldt + i] == 0.0 { i + 1 } else { i + 2 };
                while k <= kend {
                    let evi = block_magnitude(t, i, kend);
                    let evk = block_magnitude(t, k, kend);
                    if evi >= evk {
                        i = k;
                    } else {
                        sorted = false;
                        let (_, moved, ok) = self.dtrexc(true, jw, t, ldt, v, ldv, i, k, work);
                        i = if ok { moved } else { k };
                    }
                    k = if i == kend || t[(i + 1) * ldt + i] == 0.0 { i + 1 } else { i + 2 };
                }
            }
        }

        // Eigenvalues of the window, from T.
        let mut i = jw;
        while i > infqr {
            let r = i - 1;
            if r == infqr || t[r * ldt + r - 1] == 0.0 {
                sr[kwtop + r] = t[r * ldt + r];
                si[kwtop + r] = 0.0;
                i -= 1;
                continue;
            }
            let st = self.dlanv2(t[(r - 1) * ldt + r - 1], t[(r - 1) * ldt + r], t[r * ldt + r - 1], t[r * ldt + r]);
            sr[kwtop + r - 1] = st.rt1r;
            si[kwtop + r - 1] = st.rt1i;
            sr[kwtop + r] = st.rt2r;
            si[kwtop + r] = st.rt2i;
            i -= 2;
        }

        if ns < jw || s == 0.0 {
            let (spike, rest) = work.split_at_mut(jw);
            if ns > 1 && s != 0.0 {
                // Reflect the spike back into the lower triangle and
                // restore Hessenberg form on the undeflated part.
                spike[..ns].copy_from_slice(&v[..ns]);
                let (_, tau) = self.dlarfg(ns, spike[0], &mut spike[1..ns], 1);
                spike[0] = 1.0;
                self.dlaset(Part::Lower, jw - 2, jw - 2, 0.0, 0.0, &mut t[2 * ldt..], ldt);
                self.dlarf(Side::Left, ns, jw, &spike[..ns], 1, tau, t, ldt, rest);
                self.dlarf(Side::Right, ns, ns, &spike[..ns], 1, tau, t, ldt, rest);
                self.dlarf(Side::Right, jw, ns, &spike[..ns], 1, tau, v, ldv, rest);
                self.dgehrd(jw, 0, ns - 1, t, ldt, &mut spike[..jw - 1], Work::Execute(&mut *rest));
            }

            // Copy the reduced window back into H.
            if kwtop > 0 {
                h[kwtop * ldh + kwtop - 1] = s * v[0];
            }
            self.dlacpy(Part::Upper, jw, jw, t, ldt, &mut h[kwtop * ldh + kwtop..], ldh);
            self.blas.dcopy(jw - 1, &t[ldt..], (ldt + 1) as isize, &mut h[(kwtop + 1) * ldh + kwtop..], (ldh + 1) as isize);

            // Fold the Hessenberg reflectors into V.
            if ns > 1 && s != 0.0 {
                self.dormhr(Side::Right, Transpose::NoTrans, jw, ns, 0, ns - 1, t, ldt, &spike[..ns - 1], v, ldv, Work::Execute(rest));
            }

            // Update the vertical slab of H above the window.
            let ltop = if wantt { 0 } else { ktop };
            for krow in (ltop..kwtop).step_by(nv.max(1)) {
                let kln = nv.min(kwtop - krow);
                self.blas.dgemm(
                    Transpose::NoTrans,
                    Transpose::NoTrans,
                    kln,
                    jw,
                    jw,
                    1.0,
                    &h[krow * ldh + kwtop..],
                    ldh,
                    v,
                    ldv,
                    0.0,
                    wv,
                    ldwv,
                );
                self.dlacpy(Part::All, kln, jw, wv, ldwv, &mut h[krow * ldh + kwtop..], ldh);
            }

            // Update the horizontal slab to the right of the window.
            if wantt {
                for kcol in (kbot + 1..n).step_by(nh.max(1)) {
                    let kln = nh.min(n - kcol);
                    self.blas.dgemm(
                        Transpose::Trans,
                        Transpose::NoTrans,
                        jw,
                        kln,
                        jw,
                        1.0,
                        v,
                        ldv,
                        &h[kwtop * ldh + kcol..],
                        ldh,
                        0.0,
                        t,
                        ldt,
                    );
                    self.dlacpy(Part::All, jw, kln, t, ldt, &mut h[kwtop * ldh + kcol..], ldh);
                }
            }

            if wantz {
                for krow in (iloz..=ihiz).step_by(nv.max(1)) {
                    let kln = nv.min(ihiz + 1 - krow);
                    self.blas.dgemm(
                        Transpose::NoTrans,
                        Transpose::NoTrans,
                        kln,
                        jw,
                        jw,
                        1.0,
                        &z[krow * ldz + kwtop..],
                        ldz,
                        v,
                        ldv,
                        0.0,
                        wv,
                        ldwv,
                    );
                    self.dlacpy(Part::All, kln, jw, wv, ldwv, &mut z[krow * ldz + kwtop..], ldz);
                }
            }
        }

        // Shifts are the unconverged eigenvalues that could not be deflated.
        // Subtracting infqr accounts for a QR failure in the window.
        (ns - infqr.min(ns), jw - ns)
    }

    // ========================================================================
    // Bulge chasing
    // ========================================================================

    /// A multiple of the first column of `(H - s1 I)(H - s2 I)` for the
    /// 2×2 or 3×3 matrix H, where `s1 = sr1 + i*si1` and `s2 = sr2 + i*si2`
    /// are both real or a complex conjugate pair. The result is scaled to
    /// avoid overflow and most underflow.
    pub fn dlaqr1(&self, n: usize, h: &[f64], ldh: usize, sr1: f64, si1: f64, sr2: f64, si2: f64, v: &mut [f64]) {
        require!(n == 2 || n == 3, Precondition::BadBlockSize);
        require!(ldh >= n, Precondition::BadLdH);
        require!(h.len() >= matrix_len(n, n, ldh), Precondition::ShortH);
        require!(v.len() >= n, Precondition::ShortV);

        let h11 = h[0];
        let h21 = h[ldh];
        if n == 2 {
            let s = (h11 - sr2).abs() + si2.abs() + h21.abs();
            if s == 0.0 {
                v[0] = 0.0;
                v[1] = 0.0;
                return;
            }
            let h21s = h21 / s;
            v[0] = h21s * h[1] + (h11 - sr1) * ((h11 - sr2) / s) - si1 * (si2 / s);
            v[1] = h21s * (h11 + h[ldh + 1] - sr1 - sr2);
            return;
        }

        let h31 = h[2 * ldh];
        let s = (h11 - sr2).abs() + si2.abs() + h21.abs() + h31.abs();
        if s == 0.0 {
            v[..3].fill(0.0);
            return;
        }
        let h21s = h21 / s;
        let h31s = h31 / s;
        v[0] = (h11 - sr1) * ((h11 - sr2) / s) - si1 * (si2 / s) + h[1] * h21s + h[2] * h31s;
        v[1] = h21s * (h11 + h[ldh + 1] - sr1 - sr2) + h[ldh + 2] * h31s;
        v[2] = h31s * (h11 + h[2 * ldh + 2] - sr1 - sr2) + h21s * h[2 * ldh + 1];
    }

    /// One multishift QR sweep on the active block `ktop..=kbot`: a chain
    /// of `nshfts/2` small 3×3 bulges is introduced at the top and chased
    /// off the bottom.
    ///
    /// `sr`/`si` hold the shifts, with complex conjugate pairs adjacent;
    /// they may be reordered. V (`nshfts/2 x 3`, `ldv >= 3`) receives the
    /// reflectors. With `kacc22 == 1` the reflectors of each chunk are
    /// accumulated in the `kdu x kdu` matrix U, `kdu = 3*nshfts - 3`, and
    /// applied to the rest of H and Z with `dgemm`, using WV (`nv x kdu`)
    /// and WH (`kdu x nh`) as scratch. With `kacc22 == 0`, U, WV and WH are
    /// not referenced.
    pub fn dlaqr5(
        &self,
        wantt: bool,
        wantz: bool,
        kacc22: usize,
        n: usize,
        ktop: usize,
        kbot: usize,
        nshfts: usize,
        sr: &mut [f64],
        si: &mut [f64],
        h: &mut [f64],
        ldh: usize,
        iloz: usize,
        ihiz: usize,
        z: &mut [f64],
        ldz: usize,
        v: &mut [f64],
        ldv: usize,
        u: &mut [f64],
        ldu: usize,
        nv: usize,
        wv: &mut [f64],
        ldwv: usize,
        nh: usize,
        wh: &mut [f64],
        ldwh: usize,
    ) {
        require!(kacc22 <= 1, Precondition::BadKacc22);
        require!(nshfts % 2 == 0, Precondition::BadNShifts);
        require!(ldh >= n.max(1), Precondition::BadLdH);
        require!(ldz >= 1, Precondition::BadLdZ);
        require!(ldv >= 3, Precondition::BadLdV);
        if n == 0 || nshfts < 2 {
            return;
        }
        require!(ktop < n && kbot < n, Precondition::BadWindow);
        if ktop >= kbot {
            return;
        }
        let nbmps = nshfts / 2;
        let kdu = 6 * nbmps - 3;
        let accum = kacc22 == 1;
        require!(sr.len() >= nshfts && si.len() >= nshfts, Precondition::ShortShifts);
        require!(h.len() >= matrix_len(n, n, ldh), Precondition::ShortH);
        require!(v.len() >= matrix_len(nbmps, 3, ldv), Precondition::ShortV);
        if wantz {
            check_z(iloz, ihiz, ktop, kbot, n, z, ldz);
        }
        if accum {
            require!(ldu >= kdu, Precondition::BadLdU);
            require!(ldwv >= kdu, Precondition::BadLdWV);
            require!(nh >= 1 && ldwh >= nh, Precondition::BadLdWork);
            require!(nv >= 1, Precondition::BadBlockSize);
            require!(u.len() >= matrix_len(kdu, kdu, ldu), Precondition::ShortU);
            require!(wv.len() >= matrix_len(nv, kdu, ldwv), Precondition::ShortWV);
            require!(wh.len() >= matrix_len(kdu, nh, ldwh), Precondition::ShortWork);
        }

        // Pair up real shifts; conjugate pairs are already adjacent.
        for i in (0..nshfts - 2).step_by(2) {
            if si[i] != -si[i + 1] {
                sr[i..i + 3].rotate_left(1);
                si[i..i + 3].rotate_left(1);
            }
        }

        let ulp = PREC;
        let smlnum = SAFE_MIN * (n as f64 / ulp);

        if ktop + 2 <= kbot {
            h[(ktop + 2) * ldh + ktop] = 0.0;
        }

        // Bulge positions run ahead of ktop and past kbot ("phantom"
        // columns) while the chain enters and leaves, so they are signed.
        let ix = |r: isize, c: isize| r as usize * ldh + c as usize;
        let (ktop_s, kbot_s) = (ktop as isize, kbot as isize);
        let nb = nbmps as isize;
        let kdu_s = kdu as isize;

        let mut incol = 3 * (1 - nb) + ktop_s - 1;
        while incol <= kbot_s - 2 {
            let ndcol = incol + kdu_s;
            if accum {
                self.dlaset(Part::All, kdu, kdu, 0.0, 1.0, u, ldu);
            }

            // Chase the chain of bulges 3*nbmps-2 columns to the right,
            // one column at a time.
            for krcol in incol..=(incol + 3 * nb - 3).min(kbot_s - 2) {
                // Active bulges are mtop..=mbot; bmp22 marks a 2×2 bulge
                // that fits only at the very bottom.
                let mtop = ((ktop_s - 1 - krcol + 2) / 3).max(0);
                let mbot = nb.min((kbot_s - krcol) / 3) - 1;
                let m22 = mbot + 1;
                let bmp22 = mbot < nb - 1 && krcol + 3 * m22 == kbot_s - 2;

                // Reflectors that move each bulge one column right.
                for m in mtop..=mbot {
                    let k = krcol + 3 * m;
                    let vm = m as usize * ldv;
                    let (s1, s2) = (2 * m as usize, 2 * m as usize + 1);
                    if k == ktop_s - 1 {
                        self.dlaqr1(3, &h[ktop * ldh + ktop..], ldh, sr[s1], si[s1], sr[s2], si[s2], &mut v[vm..vm + 3]);
                        let alpha = v[vm];
                        let (_, tau) = self.dlarfg(3, alpha, &mut v[vm + 1..vm + 3], 1);
                        v[vm] = tau;
                        continue;
                    }
                    v[vm + 1] = h[ix(k + 2, k)];
                    v[vm + 2] = h[ix(k + 3, k)];
                    let (beta, tau) = self.dlarfg(3, h[ix(k + 1, k)], &mut v[vm + 1..vm + 3], 1);
                    v[vm] = tau;

                    // A bulge may collapse through vigilant deflation or
                    // underflow. If so, try to reintroduce it from the
                    // shifts, ignoring H[k+1, k] and H[k+2, k].
                    if h[ix(k + 3, k)] != 0.0 || h[ix(k + 3, k + 1)] != 0.0 || h[ix(k + 3, k + 2)] == 0.0 {
                        h[ix(k + 1, k)] = beta;
                        h[ix(k + 2, k)] = 0.0;
                        h[ix(k + 3, k)] = 0.0;
                        continue;
                    }
                    let mut vt = [0.0f64; 3];
                    self.dlaqr1(3, &h[ix(k + 1, k + 1)..], ldh, sr[s1], si[s1], sr[s2], si[s2], &mut vt);
                    let alpha = vt[0];
                    let (_, tau) = self.dlarfg(3, alpha, &mut vt[1..3], 1);
                    vt[0] = tau;
                    let refsum = vt[0] * (h[ix(k + 1, k)] + vt[1] * h[ix(k + 2, k)]);
                    let dsum = h[ix(k, k)].abs() + h[ix(k + 1, k + 1)].abs() + h[ix(k + 2, k + 2)].abs();
                    if (h[ix(k + 2, k)] - refsum * vt[1]).abs() + (refsum * vt[2]).abs() > ulp * dsum {
                        // The new bulge would leave too much fill; keep
                        // the old one.
                        h[ix(k + 1, k)] = beta;
                    } else {
                        h[ix(k + 1, k)] -= refsum;
                        v[vm..vm + 3].copy_from_slice(&vt);
                    }
                    h[ix(k + 2, k)] = 0.0;
                    h[ix(k + 3, k)] = 0.0;
                }

                if bmp22 {
                    let k = krcol + 3 * m22;
                    let vm = m22 as usize * ldv;
                    let (s1, s2) = (2 * m22 as usize, 2 * m22 as usize + 1);
                    if k == ktop_s - 1 {
                        self.dlaqr1(2, &h[ix(k + 1, k + 1)..], ldh, sr[s1], si[s1], sr[s2], si[s2], &mut v[vm..vm + 2]);
                        let beta = v[vm];
                        let (_, tau) = self.dlarfg(2, beta, &mut v[vm + 1..vm + 2], 1);
                        v[vm] = tau;
                    } else {
                        v[vm + 1] = h[ix(k + 2, k)];
                        let (beta, tau) = self.dlarfg(2, h[ix(k + 1, k)], &mut v[vm + 1..vm + 2], 1);
                        v[vm] = tau;
                        h[ix(k + 1, k)] = beta;
                        h[ix(k + 2, k)] = 0.0;
                    }
                }

                // Apply the reflectors from the left.
                let jbot = if accum {
                    ndcol.min(kbot_s)
                } else if wantt {
                    n as isize - 1
                } else {
                    kbot_s
                };
                for j in ktop_s.max(krcol)..=jbot {
                    let mend = (mbot + 1).min((j - krcol + 2) / 3) - 1;
                    for m in mtop..=mend {
                        let k = krcol + 3 * m;
                        let vm = m as usize * ldv;
                        let refsum = v[vm] * (h[ix(k + 1, j)] + v[vm + 1] * h[ix(k + 2, j)] + v[vm + 2] * h[ix(k + 3, j)]);
                        h[ix(k + 1, j)] -= refsum;
                        h[ix(k + 2, j)] -= refsum * v[vm + 1];
                        h[ix(k + 3, j)] -= refsum * v[vm + 2];
                    }
                }
                if bmp22 {
                    let k = krcol + 3 * m22;
                    let vm = m22 as usize * ldv;
                    for j in (k + 1).max(ktop_s)..=jbot {
                        let refsum = v[vm] * (h[ix(k + 1, j)] + v[vm + 1] * h[ix(k + 2, j)]);
                        h[ix(k + 1, j)] -= refsum;
                        h[ix(k + 2, j)] -= refsum * v[vm + 1];
                    }
                }

                // Apply them from the right. The last row of each bulge is
                // filled in after the deflation check below.
                let jtop = if accum {
                    ktop_s.max(incol)
                } else if wantt {
                    0
                } else {
                    ktop_s
                };
                let ufirst = (ktop_s - incol - 1).max(0) as usize;
                for m in mtop..=mbot {
                    let vm = m as usize * ldv;
                    if v[vm] == 0.0 {
                        continue;
                    }
                    let k = krcol + 3 * m;
                    let (tau, v1, v2) = (v[vm], v[vm + 1], v[vm + 2]);
                    for j in jtop..=kbot_s.min(k + 3) {
                        let row = &mut h[ix(j, k + 1)..ix(j, k + 1) + 3];
                        let refsum = tau * (row[0] + v1 * row[1] + v2 * row[2]);
                        row[0] -= refsum;
                        row[1] -= refsum * v1;
                        row[2] -= refsum * v2;
                    }
                    if accum {
                        let kms = (k - incol) as usize;
                        for j in ufirst..kdu {
                            let row = &mut u[j * ldu + kms..j * ldu + kms + 3];
                            let refsum = tau * (row[0] + v1 * row[1] + v2 * row[2]);
                            row[0] -= refsum;
                            row[1] -= refsum * v1;
                            row[2] -= refsum * v2;
                        }
                    } else if wantz {
                        let c = (k + 1) as usize;
                        for j in iloz..=ihiz {
                            let row = &mut z[j * ldz + c..j * ldz + c + 3];
                            let refsum = tau * (row[0] + v1 * row[1] + v2 * row[2]);
                            row[0] -= refsum;
                            row[1] -= refsum * v1;
                            row[2] -= refsum * v2;
                        }
                    }
                }
                if bmp22 {
                    let k = krcol + 3 * m22;
                    let vm = m22 as usize * ldv;
                    let (tau, v1) = (v[vm], v[vm + 1]);
                    if tau != 0.0 {
                        for j in jtop..=kbot_s.min(k + 3) {
                            let row = &mut h[ix(j, k + 1)..ix(j, k + 1) + 2];
                            let refsum = tau * (row[0] + v1 * row[1]);
                            row[0] -= refsum;
                            row[1] -= refsum * v1;
                        }
                        if accum {
                            let kms = (k - incol) as usize;
                            for j in ufirst..kdu {
                                let row = &mut u[j * ldu + kms..j * ldu + kms + 2];
                                let refsum = tau * (row[0] + v1 * row[1]);
                                row[0] -= refsum;
                                row[1] -= refsum * v1;
                            }
                        } else if wantz {
                            let c = (k + 1) as usize;
                            for j in iloz..=ihiz {
                                let row = &mut z[j * ldz + c..j * ldz + c + 2];
                                let refsum = tau * (row[0] + v1 * row[1]);
                                row[0] -= refsum;
                                row[1] -= refsum * v1;
                            }
                        }
                    }
                }

                // Vigilant deflation: both the classic small-subdiagonal
                // test and the Ahues & Kressner criterion must hold.
                let mut mstart = mtop;
                if krcol + 3 * mstart < ktop_s {
                    mstart += 1;
                }
                let mut mend = mbot;
                if bmp22 {
                    mend += 1;
                }
                if krcol == kbot_s - 2 {
                    mend += 1;
                }
                for m in mstart..=mend {
                    let k = (kbot_s - 1).min(krcol + 3 * m) as usize;
                    let sub = h[(k + 1) * ldh + k];
                    if sub == 0.0 {
                        continue;
                    }
                    let mut tst1 = h[k * ldh + k].abs() + h[(k + 1) * ldh + k + 1].abs();
                    if tst1 == 0.0 {
                        if k > ktop {
                            tst1 += h[k * ldh + k - 1].abs();
                        }
                        if k > ktop + 1 {
                            tst1 += h[k * ldh + k - 2].abs();
                        }
                        if k > ktop + 2 {
                            tst1 += h[k * ldh + k - 3].abs();
                        }
                        if k + 2 <= kbot {
                            tst1 += h[(k + 2) * ldh + k + 1].abs();
                        }
                        if k + 3 <= kbot {
                            tst1 += h[(k + 3) * ldh + k + 1].abs();
                        }
                        if k + 4 <= kbot {
                            tst1 += h[(k + 4) * ldh + k + 1].abs();
                        }
                    }
                    if sub.abs() <= smlnum.max(ulp * tst1) {
                        let sup = h[k * ldh + k + 1].abs();
                        let h12 = sub.abs().max(sup);
                        let h21 = sub.abs().min(sup);
                        let diff = (h[k * ldh + k] - h[(k + 1) * ldh + k + 1]).abs();
                        let h11 = h[(k + 1) * ldh + k + 1].abs().max(diff);
                        let h22 = h[(k + 1) * ldh + k + 1].abs().min(diff);
                        let scl = h11 + h12;
                        let tst2 = h22 * (h11 / scl);
                        if tst2 == 0.0 || h21 * (h12 / scl) <= smlnum.max(ulp * tst2) {
                            h[(k + 1) * ldh + k] = 0.0;
                        }
                    }
                }

                // Fill in the last row of each bulge.
                let mend = nb.min((kbot_s - krcol - 1) / 3) - 1;
                for m in mtop..=mend {
                    let k = krcol + 3 * m;
                    let vm = m as usize * ldv;
                    let refsum = v[vm] * v[vm + 2] * h[ix(k + 4, k + 3)];
                    h[ix(k + 4, k + 1)] = -refsum;
                    h[ix(k + 4, k + 2)] = -refsum * v[vm + 1];
                    h[ix(k + 4, k + 3)] -= refsum * v[vm + 2];
                }
            }

            // Apply the accumulated U to the far-from-diagonal parts of H
            // and to Z. k0 and nu locate the part of U that is not the
            // identity while the chain enters or leaves.
            if accum {
                let (jtop, jbot) = if wantt { (0, n - 1) } else { (ktop, kbot) };
                let k0 = (ktop_s - incol - 1).max(0) as usize;
                let nu = kdu - (ndcol - kbot_s).max(0) as usize - k0;
                let first = (incol + k0 as isize + 1) as usize;
                let uk = &u[k0 * ldu + k0..];

                let jstart = (ndcol.min(kbot_s) + 1) as usize;
                for jcol in (jstart..=jbot).step_by(nh) {
                    let jlen = nh.min(jbot + 1 - jcol);
                    self.blas.dgemm(
                        Transpose::Trans,
                        Transpose::NoTrans,
                        nu,
                        jlen,
                        nu,
                        1.0,
                        uk,
                        ldu,
                        &h[first * ldh + jcol..],
                        ldh,
                        0.0,
                        wh,
                        ldwh,
                    );
                    self.dlacpy(Part::All, nu, jlen, wh, ldwh, &mut h[first * ldh + jcol..], ldh);
                }

                let rend = ktop.max(incol.max(0) as usize);
                for jrow in (jtop..rend).step_by(nv) {
                    let jlen = nv.min(rend - jrow);
                    self.blas.dgemm(
                        Transpose::NoTrans,
                        Transpose::NoTrans,
                        jlen,
                        nu,
                        nu,
                        1.0,
                        &h[jrow * ldh + first..],
                        ldh,
                        uk,
                        ldu,
                        0.0,
                        wv,
                        ldwv,
                    );
                    self.dlacpy(Part::All, jlen, nu, wv, ldwv, &mut h[jrow * ldh + first..], ldh);
                }

                if wantz {
                    for jrow in (iloz..=ihiz).step_by(nv) {
                        let jlen = nv.min(ihiz + 1 - jrow);
                        self.blas.dgemm(
                            Transpose::NoTrans,
                            Transpose::NoTrans,
                            jlen,
                            nu,
                            nu,
                            1.0,
                            &z[jrow * ldz + first..],
                            ldz,
                            uk,
                            ldu,
                            0.0,
                            wv,
                            ldwv,
                        );
                        self.dlacpy(Part::All, jlen, nu, wv, ldwv, &mut z[jrow * ldz + first..], ldz);
                    }
                }
            }

            incol += 3 * nb - 2;
        }
    }
}

/// Z must cover rows and columns `0..=ihiz`, and the transformed rows
/// `iloz..=ihiz` must include the active block `lo..=hi`.
fn check_z(iloz: usize, ihiz: usize, lo: usize, hi: usize, n: usize, z: &[f64], ldz: usize) {
    require!(iloz <= lo && hi <= ihiz && ihiz < n, Precondition::BadIlozIhiz);
    require!(ldz > ihiz, Precondition::BadLdZ);
    require!(z.len() >= matrix_len(ihiz + 1, ihiz + 1, ldz), Precondition::ShortZ);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Zero the subdiagonal entries that isolate rows `ilo..=ihi`, the way
    /// balancing leaves a matrix.
    fn isolate(n: usize, h: &mut [f64], ldh: usize, ilo: usize, ihi: usize) {
        for i in 1..n {
            if i <= ilo || i > ihi {
                h[i * ldh + i - 1] = 0.0;
            }
        }
    }

    /// H is upper quasi-triangular in Schur canonical form and (wr, wi)
    /// are the eigenvalues of its diagonal blocks.
    fn check_schur(n: usize, h: &[f64], ldh: usize, wr: &[f64], wi: &[f64]) {
        let mut k = 0;
        while k < n {
            for i in k + 2..n {
                assert_eq!(h[i * ldh + k], 0.0, "fill at ({}, {})", i, k);
            }
            if k + 1 < n && h[(k + 1) * ldh + k] != 0.0 {
                let (a, b) = (h[k * ldh + k], h[k * ldh + k + 1]);
                let (c, d) = (h[(k + 1) * ldh + k], h[(k + 1) * ldh + k + 1]);
                assert!(is_schur_canonical(a, b, c, d), "block at {} is not standardized", k);
                assert!(k + 2 >= n || h[(k + 2) * ldh + k + 1] == 0.0, "adjacent 2×2 blocks at {}", k);
                let im = b.abs().sqrt() * c.abs().sqrt();
                assert!((wr[k] - a).abs() <= 1e-14 && (wr[k + 1] - a).abs() <= 1e-14, "wr at {}", k);
                assert!((wi[k] - im).abs() <= 1e-14 && (wi[k + 1] + im).abs() <= 1e-14, "wi at {}", k);
                k += 2;
            } else {
                assert!((wr[k] - h[k * ldh + k]).abs() <= 1e-14 && wi[k] == 0.0, "eigenvalue at {}", k);
                k += 1;
            }
        }
    }

    /// Largest entry of `|Zᵀ H₀ Z - H|`, with H₀ packed.
    fn schur_residual(n: usize, h0: &[f64], z: &[f64], ldz: usize, h: &[f64], ldh: usize) -> f64 {
        let z = pack(n, n, z, ldz);
        let got = matmul(n, &transpose(n, &z), &matmul(n, h0, &z));
        let mut worst = 0.0f64;
        for i in 0..n {
            for j in 0..n {
                worst = worst.max((got[i * n + j] - h[i * ldh + j]).abs());
            }
        }
        worst
    }

    fn same_spectrum(wr: &[f64], wi: &[f64], wr2: &[f64], wi2: &[f64], tol: f64) -> bool {
        wr.iter().zip(wi).all(|(&re, &im)| contains_eigenvalue(wr2, wi2, re, im, tol))
    }

    #[test]
    fn test_dlaqr1_is_parallel_to_shifted_product() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(50);
        for n in [2usize, 3] {
            for _ in 0..20 {
                let ldh = n + 2;
                let h = random_general(n, n, ldh, &mut rng);
                let (sr1, si1, sr2, si2) = if rng.gen_bool(0.5) {
                    let (re, im) = (rng.gen_range(-1.0..1.0), rng.gen_range(0.1..1.0));
                    (re, im, re, -im)
                } else {
                    (rng.gen_range(-1.0..1.0), 0.0, rng.gen_range(-1.0..1.0), 0.0)
                };
                let mut v = nan_slice(n);
                lapack.dlaqr1(n, &h, ldh, sr1, si1, sr2, si2, &mut v);

                // (H - s1 I)(H - s2 I) e1 = H² e1 - (s1 + s2) H e1 + s1 s2 e1
                let (sum, prod) = (sr1 + sr2, sr1 * sr2 - si1 * si2);
                let want: Vec<f64> = (0..n)
                    .map(|i| {
                        let h2: f64 = (0..n).map(|k| h[i * ldh + k] * h[k * ldh]).sum();
                        h2 - sum * h[i * ldh] + if i == 0 { prod } else { 0.0 }
                    })
                    .collect();
                let big = (0..n).max_by(|&a, &b| want[a].abs().total_cmp(&want[b].abs())).unwrap();
                let scale = v[big] / want[big];
                for i in 0..n {
                    let diff = (v[i] - scale * want[i]).abs();
                    assert!(diff <= 1e-13 * v[big].abs(), "n={} component {} off by {}", n, i, diff);
                }
            }
        }
    }

    #[test]
    fn test_dlahqr_random_hessenberg() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(51);
        for &n in &[1usize, 2, 3, 5, 10, 17, 30] {
            for extra in [0usize, 3] {
                for (wantt, wantz) in [(true, true), (true, false), (false, true), (false, false)] {
                    let ldh = n + extra;
                    let ilo = rng.gen_range(0..n);
                    let ihi = rng.gen_range(ilo..n);
                    let mut h = random_hessenberg(n, ldh, &mut rng);
                    isolate(n, &mut h, ldh, ilo, ihi);
                    let h0 = pack(n, n, &h, ldh);
                    let mut z = eye(n);
                    let mut wr = nan_slice(n);
                    let mut wi = nan_slice(n);

                    let info = lapack.dlahqr(wantt, wantz, n, ilo, ihi, &mut h, ldh, &mut wr, &mut wi, 0, n - 1, &mut z, n);
                    assert_eq!(info, 0, "n={} did not converge", n);
                    assert!(outside_all_nan(n, n, &h, ldh));
                    assert!(is_upper_hessenberg(n, &h, ldh));
                    for i in 0..n {
                        assert_eq!(wr[i].is_nan(), i < ilo || i > ihi, "wr[{}] ilo={} ihi={}", i, ilo, ihi);
                    }

                    let tol = 1e-13 * n as f64;
                    if wantz {
                        assert!(residual_orthogonal(n, &z, n) <= tol);
                    }
                    if wantt {
                        // Outside ilo..=ihi the eigenvalues sit on the diagonal.
                        for i in (0..ilo).chain(ihi + 1..n) {
                            wr[i] = h[i * ldh + i];
                            wi[i] = 0.0;
                        }
                        check_schur(n, &h, ldh, &wr, &wi);
                    }
                    if wantt && wantz {
                        let resid = schur_residual(n, &h0, &z, n, &h, ldh);
                        assert!(resid <= tol, "n={} |ZᵀH₀Z - T| = {}", n, resid);
                    }
                    if !wantt {
                        let mut t = h0.clone();
                        let (mut wr2, mut wi2) = (nan_slice(n), nan_slice(n));
                        lapack.dlahqr(true, false, n, ilo, ihi, &mut t, n, &mut wr2, &mut wi2, 0, 0, &mut [], 1);
                        assert!(same_spectrum(&wr[ilo..=ihi], &wi[ilo..=ihi], &wr2[ilo..=ihi], &wi2[ilo..=ihi], 1e-8));
                    }
                }
            }
        }
    }

    #[test]
    fn test_dlahqr_cyclic_matrix_converges() {
        // The cyclic shift stalls the Francis double shift; only the
        // exceptional shifts make progress.
        let lapack = Lapack::new();
        let n = 6;
        let mut h = vec![0.0; n * n];
        for i in 1..n {
            h[i * n + i - 1] = 1.0;
        }
        h[n - 1] = 1.0;
        let h0 = h.clone();
        let mut z = eye(n);
        let mut wr = nan_slice(n);
        let mut wi = nan_slice(n);
        let info = lapack.dlahqr(true, true, n, 0, n - 1, &mut h, n, &mut wr, &mut wi, 0, n - 1, &mut z, n);
        assert_eq!(info, 0);
        check_schur(n, &h, n, &wr, &wi);
        assert!(schur_residual(n, &h0, &z, n, &h, n) <= 1e-13);
        for k in 0..n {
            let theta = 2.0 * std::f64::consts::PI * k as f64 / n as f64;
            assert!(contains_eigenvalue(&wr, &wi, theta.cos(), theta.sin(), 1e-12), "missing root {}", k);
        }
    }

    #[test]
    fn test_dlaqr5_sweep_is_a_similarity() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(52);
        for &(n, ktop, kbot, nshfts) in &[
            (12usize, 0usize, 11usize, 2usize),
            (12, 2, 9, 2),
            (30, 0, 29, 4),
            (30, 5, 26, 6),
            (64, 3, 60, 10),
            (64, 0, 63, 16),
        ] {
            let mut h = random_hessenberg(n, n, &mut rng);
            isolate(n, &mut h, n, ktop, kbot);
            let h0 = h.clone();
            let mut sr = vec![0.0; nshfts];
            let mut si = vec![0.0; nshfts];
            for p in (0..nshfts).step_by(2) {
                sr[p] = rng.gen_range(-1.0..1.0);
                if rng.gen_bool(0.5) {
                    si[p] = rng.gen_range(0.1..1.0);
                    si[p + 1] = -si[p];
                    sr[p + 1] = sr[p];
                } else {
                    sr[p + 1] = rng.gen_range(-1.0..1.0);
                }
            }

            let nbmps = nshfts / 2;
            let kdu = 3 * nshfts - 3;
            let (nv, nh) = (5, 7);
            let mut results = Vec::new();
            for kacc22 in [0usize, 1] {
                let mut h = h0.clone();
                let mut z = eye(n);
                let (mut sr, mut si) = (sr.clone(), si.clone());
                let mut v = nan_slice(nbmps * 3);
                let mut u = nan_slice(kdu * kdu);
                let mut wv = nan_slice(nv * kdu);
                let mut wh = nan_slice(kdu * nh);
                lapack.dlaqr5(
                    true, true, kacc22, n, ktop, kbot, nshfts, &mut sr, &mut si, &mut h, n, 0, n - 1, &mut z, n, &mut v, 3, &mut u, kdu,
                    nv, &mut wv, kdu, nh, &mut wh, nh,
                );
                assert!(is_upper_hessenberg(n, &h, n), "n={} kacc22={}", n, kacc22);
                if ktop > 0 {
                    assert_eq!(h[ktop * n + ktop - 1], 0.0);
                }
                if kbot + 1 < n {
                    assert_eq!(h[(kbot + 1) * n + kbot], 0.0);
                }
                let tol = 1e-13 * n as f64;
                assert!(residual_orthogonal(n, &z, n) <= tol);
                let resid = schur_residual(n, &h0, &z, n, &h, n);
                assert!(resid <= tol, "n={} kacc22={} |ZᵀH₀Z - H| = {}", n, kacc22, resid);
                results.push(h);
            }
            // Accumulating the reflections changes only the rounding.
            for (a, b) in results[0].iter().zip(&results[1]) {
                assert!((a - b).abs() <= 1e-11, "n={}", n);
            }
        }
    }

    struct AedCase {
        n: usize,
        ktop: usize,
        kbot: usize,
        nw: usize,
        h: Vec<f64>,
        evals: Vec<(f64, f64)>,
    }

    fn aed_cases(rng: &mut StdRng) -> Vec<AedCase> {
        let mut cases = vec![
            AedCase { n: 1, ktop: 0, kbot: 0, nw: 1, h: vec![0.709965484086874], evals: vec![(0.709965484086874, 0.0)] },
            AedCase { n: 2, ktop: 0, kbot: 1, nw: 2, h: vec![0.0, -1.0, 1.0, 0.0], evals: vec![(0.0, 1.0), (0.0, -1.0)] },
            AedCase {
                n: 2,
                ktop: 0,
                kbot: 1,
                nw: 2,
                h: vec![0.625219991450918, 0.817510791994361, 0.331218891622294, 0.124103744878131],
                evals: vec![(0.952203547663447, 0.0), (-0.202879811334398, 0.0)],
            },
            AedCase {
                n: 4,
                ktop: 1,
                kbot: 2,
                nw: 2,
                h: vec![
                    1.0, 2.0, 3.0, 4.0, //
                    0.0, 0.625219991450918, 0.817510791994361, 5.0, //
                    0.0, 0.331218891622294, 0.124103744878131, 6.0, //
                    0.0, 0.0, 0.0, 7.0,
                ],
                evals: vec![(0.952203547663447, 0.0), (-0.202879811334398, 0.0)],
            },
            AedCase {
                n: 2,
                ktop: 0,
                kbot: 1,
                nw: 2,
                h: vec![-1.1219562276608, 0.685473513349362, -0.819951061145131, 0.193728523178888],
                evals: vec![(-0.464113852240958, 0.359580510817350), (-0.464113852240958, -0.359580510817350)],
            },
            AedCase {
                n: 5,
                ktop: 0,
                kbot: 4,
                nw: 5,
                h: vec![
                    0.957590178533658, -0.510651295522708, 0.924974510015869, -0.130016306879522, 0.0292601986926954, //
                    -1.08084756637964, 1.77529701001213, -1.36480197632509, 0.223196371219601, 0.112912853063308, //
                    0.0, -0.844075612174676, 1.067867614486, -0.255782915176399, -0.200598563137468, //
                    0.0, 0.0, -0.567097237165410, 0.207205057427341, 0.654998340743380, //
                    0.0, 0.0, 0.0, -0.189441413886041, -0.418125416021786,
                ],
                evals: vec![
                    (2.94393309555622, 0.0),
                    (0.497029793606701, 0.363041654992384),
                    (0.497029793606701, -0.363041654992384),
                    (-0.174079119166145, 0.201570009462092),
                    (-0.174079119166145, -0.201570009462092),
                ],
            },
        ];
        for &n in &[1usize, 2, 3, 4, 5, 6, 10, 18, 31, 100] {
            let ktop = rng.gen_range(0..n);
            let kbot = rng.gen_range(ktop..n);
            let nw = rng.gen_range(1..=kbot - ktop + 1);
            let mut h = random_hessenberg(n, n, rng);
            isolate(n, &mut h, n, ktop, kbot);
            // Only the window's subdiagonals matter; restore the rest.
            for i in (1..=ktop.saturating_sub(1)).chain(kbot + 2..n) {
                h[i * n + i - 1] = rng.gen_range(-1.0..1.0);
            }
            cases.push(AedCase { n, ktop, kbot, nw, h, evals: Vec::new() });
        }
        cases
    }

    #[test]
    fn test_dlaqr23_deflation_window() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(53);
        for case in aed_cases(&mut rng) {
            let AedCase { n, ktop, kbot, nw, .. } = case;
            let scale = case.h.iter().fold(1.0f64, |m, x| m.max(x.abs()));
            for (wantt, wantz) in [(true, true), (true, false), (false, true), (false, false)] {
                for extra in [0usize, 5] {
                    for recur in [0usize, 1] {
                        for optimal in [false, true] {
                            let ldh = n + extra;
                            let mut h = nan_slice(n * ldh);
                            lapack.dlacpy(Part::All, n, n, &case.h, n, &mut h, ldh);
                            let iloz = rng.gen_range(0..=ktop);
                            let ihiz = rng.gen_range(kbot..n);
                            let ldz = n + extra;
                            let mut z = nan_slice(n * ldz);
                            lapack.dlaset(Part::All, n, n, 0.0, 1.0, &mut z, ldz);
                            let mut sr = nan_slice(kbot + 1);
                            let mut si = nan_slice(kbot + 1);
                            let ldv = nw + extra;
                            let mut v = nan_slice(nw * ldv);
                            let nh = nw + rng.gen_range(0..=5);
                            let ldt = nh + extra;
                            let mut t = nan_slice(nw * ldt);
                            let nv = rng.gen_range(1..=n);
                            let ldwv = nw + extra;
                            let mut wv = nan_slice(nv * ldwv);

                            let mut query = [0.0];
                            lapack.dlaqr23(
                                wantt, wantz, n, ktop, kbot, nw, &mut h, ldh, iloz, ihiz, &mut z, ldz, &mut sr, &mut si, &mut v, ldv, nh,
                                &mut t, ldt, nv, &mut wv, ldwv, Work::Query(&mut query), recur,
                            );
                            let lwork = if optimal { query[0] as usize } else { (2 * nw).max(1) };
                            let mut work = nan_slice(lwork);
                            let (ns, nd) = lapack.dlaqr23(
                                wantt, wantz, n, ktop, kbot, nw, &mut h, ldh, iloz, ihiz, &mut z, ldz, &mut sr, &mut si, &mut v, ldv, nh,
                                &mut t, ldt, nv, &mut wv, ldwv, Work::Execute(&mut work), recur,
                            );

                            let label = format!("n={} ktop={} kbot={} nw={} wantt={} wantz={} recur={}", n, ktop, kbot, nw, wantt, wantz, recur);
                            assert!(ns + nd <= nw, "{}", label);
                            assert!(outside_all_nan(n, n, &h, ldh), "{}", label);
                            assert!(outside_all_nan(n, n, &z, ldz), "{}", label);
                            assert!(outside_all_nan(nw, nw, &v, ldv), "{}", label);
                            assert!(outside_all_nan(nw, nh, &t, ldt), "{}", label);
                            assert!(outside_all_nan(nv, nw, &wv, ldwv), "{}", label);
                            assert!(is_upper_hessenberg(n, &h, ldh), "{}", label);

                            // Only the window's eigenvalues are written.
                            let kwtop = kbot + 1 - nw;
                            for i in 0..=kbot {
                                assert_eq!(sr[i].is_nan(), i < kwtop, "{} sr[{}]", label, i);
                            }
                            if nd > 0 && kbot + 1 - nd > ktop {
                                assert_eq!(h[(kbot + 1 - nd) * ldh + kbot - nd], 0.0, "{} deflated block not split off", label);
                            }

                            let tol = 1e-13 * n as f64;
                            if wantz {
                                assert!(residual_orthogonal(n, &z, ldz) <= tol, "{}", label);
                                for i in 0..n {
                                    for j in 0..n {
                                        if (iloz..=ihiz).contains(&i) && (kwtop..=kbot).contains(&j) {
                                            continue;
                                        }
                                        let want = if i == j { 1.0 } else { 0.0 };
                                        assert_eq!(z[i * ldz + j], want, "{} Z[{}, {}]", label, i, j);
                                    }
                                }
                            }
                            if wantt && wantz {
                                let resid = schur_residual(n, &case.h, &z, ldz, &h, ldh);
                                assert!(resid <= tol * scale, "{} |ZᵀH₀Z - H| = {}", label, resid);
                            }
                            // A window of order at most two is standardized in closed form.
                            let eig_tol = if nw <= 2 { 1e-14 } else { 1e-13 * scale };
                            for &(re, im) in &case.evals {
                                assert!(
                                    contains_eigenvalue(&sr[kwtop..], &si[kwtop..], re, im, eig_tol),
                                    "{} missing eigenvalue {} + {}i",
                                    label,
                                    re,
                                    im
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    fn run_dhseqr(
        lapack: &Lapack,
        job: SchurJob,
        compz: SchurComp,
        n: usize,
        ilo: usize,
        ihi: usize,
        h: &mut [f64],
        ldh: usize,
        z: &mut [f64],
        ldz: usize,
    ) -> (Vec<f64>, Vec<f64>, usize) {
        let mut wr = nan_slice(n);
        let mut wi = nan_slice(n);
        let mut query = [0.0];
        lapack.dhseqr(job, compz, n, ilo, ihi, h, ldh, &mut wr, &mut wi, z, ldz, Work::Query(&mut query));
        assert!(query[0] as usize >= n.max(1));
        let mut work = nan_slice(query[0] as usize);
        let info = lapack.dhseqr(job, compz, n, ilo, ihi, h, ldh, &mut wr, &mut wi, z, ldz, Work::Execute(&mut work));
        (wr, wi, info)
    }

    #[test]
    fn test_dhseqr_schur_factorization() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(54);
        for &n in &[0usize, 1, 2, 3, 8, 16, 40, 76, 101, 160] {
            for extra in [0usize, 3] {
                let ldh = (n + extra).max(1);
                let mut h = random_hessenberg(n, ldh, &mut rng);
                let h0 = pack(n, n, &h, ldh);
                let ldz = (n + extra).max(1);
                let mut z = nan_slice(n * ldz);
                let (wr, wi, info) =
                    run_dhseqr(&lapack, SchurJob::SchurForm, SchurComp::Identity, n, 0, n.saturating_sub(1), &mut h, ldh, &mut z, ldz);
                assert_eq!(info, 0, "n={}", n);
                assert!(outside_all_nan(n, n, &h, ldh));
                assert!(outside_all_nan(n, n, &z, ldz));
                check_schur(n, &h, ldh, &wr, &wi);
                let tol = 1e-13 * n as f64;
                assert!(residual_orthogonal(n, &z, ldz) <= tol, "n={}", n);
                let resid = schur_residual(n, &h0, &z, ldz, &h, ldh);
                assert!(resid <= tol, "n={} |ZᵀH₀Z - T| = {}", n, resid);

                // The eigenvalue-only path finds the same spectrum.
                let mut h2 = h0.clone();
                let (wr2, wi2, info) =
                    run_dhseqr(&lapack, SchurJob::EigenvaluesOnly, SchurComp::None, n, 0, n.saturating_sub(1), &mut h2, n.max(1), &mut [], 1);
                assert_eq!(info, 0);
                assert!(same_spectrum(&wr, &wi, &wr2, &wi2, 1e-8), "n={}", n);
            }
        }
    }

    /// Orthogonal Q from the Hessenberg reduction of a random matrix.
    fn random_orthogonal(lapack: &Lapack, n: usize, rng: &mut StdRng) -> Vec<f64> {
        let mut a = random_general(n, n, n, rng);
        let mut tau = vec![0.0; n.saturating_sub(1)];
        let mut work = vec![0.0; n * 64 + 65 * 64];
        lapack.dgehrd(n, 0, n - 1, &mut a, n, &mut tau, Work::Execute(&mut work));
        let mut q = eye(n);
        lapack.dormhr(Side::Left, Transpose::NoTrans, n, n, 0, n - 1, &a, n, &tau, &mut q, n, Work::Execute(&mut work));
        q
    }

    #[test]
    fn test_dhseqr_accumulates_into_dgehrd_q() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(55);
        for &n in &[5usize, 30, 90] {
            let a = random_general(n, n, n, &mut rng);
            let mut h = a.clone();
            let mut tau = vec![0.0; n - 1];
            let mut work = vec![0.0; n * 64 + 65 * 64];
            lapack.dgehrd(n, 0, n - 1, &mut h, n, &mut tau, Work::Execute(&mut work));
            let mut z = eye(n);
            lapack.dormhr(Side::Left, Transpose::NoTrans, n, n, 0, n - 1, &h, n, &tau, &mut z, n, Work::Execute(&mut work));
            for i in 2..n {
                h[i * n..i * n + i - 1].fill(0.0);
            }

            let (wr, wi, info) = run_dhseqr(&lapack, SchurJob::SchurForm, SchurComp::Original, n, 0, n - 1, &mut h, n, &mut z, n);
            assert_eq!(info, 0);
            check_schur(n, &h, n, &wr, &wi);
            let tol = 1e-13 * n as f64;
            assert!(residual_orthogonal(n, &z, n) <= tol);
            let resid = schur_residual(n, &a, &z, n, &h, n);
            assert!(resid <= tol, "n={} |ZᵀAZ - T| = {}", n, resid);
        }
    }

    #[test]
    fn test_dhseqr_known_spectrum() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(56);
        for &n in &[10usize, 30, 90, 130] {
            // Block diagonal T keeps A = Q T Qᵀ normal, so its eigenvalues
            // are perfectly conditioned.
            let (mut t, wr_want, wi_want) = random_schur_canonical(n, n, &mut rng);
            for i in 0..n {
                for j in i + 1..n {
                    let in_block = j == i + 1 && t[(i + 1) * n + i] != 0.0;
                    if !in_block {
                        t[i * n + j] = 0.0;
                    }
                }
            }
            let q = random_orthogonal(&lapack, n, &mut rng);
            let mut a = matmul(n, &q, &matmul(n, &t, &transpose(n, &q)));
            let mut tau = vec![0.0; n - 1];
            let mut work = vec![0.0; n * 64 + 65 * 64];
            lapack.dgehrd(n, 0, n - 1, &mut a, n, &mut tau, Work::Execute(&mut work));
            for i in 2..n {
                a[i * n..i * n + i - 1].fill(0.0);
            }

            let (wr, wi, info) = run_dhseqr(&lapack, SchurJob::EigenvaluesOnly, SchurComp::None, n, 0, n - 1, &mut a, n, &mut [], 1);
            assert_eq!(info, 0);
            for i in 0..n {
                assert!(contains_eigenvalue(&wr, &wi, wr_want[i], wi_want[i], 1e-10), "n={} missing {} + {}i", n, wr_want[i], wi_want[i]);
            }
            // Conjugate pairs are adjacent, positive imaginary part first.
            let mut i = 0;
            while i < n {
                if wi[i] != 0.0 {
                    assert!(wi[i] > 0.0 && wi[i + 1] == -wi[i] && wr[i + 1] == wr[i]);
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }

    #[test]
    fn test_dhseqr_isolated_eigenvalues() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(57);
        for &(n, ilo, ihi) in &[(12usize, 3usize, 8usize), (20, 0, 0), (20, 19, 19), (90, 4, 85)] {
            let mut h = random_hessenberg(n, n, &mut rng);
            isolate(n, &mut h, n, ilo, ihi);
            let h0 = h.clone();
            let mut z = nan_slice(n * n);
            let (wr, wi, info) = run_dhseqr(&lapack, SchurJob::SchurForm, SchurComp::Identity, n, ilo, ihi, &mut h, n, &mut z, n);
            assert_eq!(info, 0);
            for i in (0..ilo).chain(ihi + 1..n) {
                assert_eq!(wr[i], h0[i * n + i]);
                assert_eq!(wi[i], 0.0);
            }
            check_schur(n, &h, n, &wr, &wi);
            let tol = 1e-13 * n as f64;
            assert!(residual_orthogonal(n, &z, n) <= tol);
            assert!(schur_residual(n, &h0, &z, n, &h, n) <= tol);
        }
    }

    #[test]
    fn test_dhseqr_query_touches_nothing() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(58);
        let n = 120;
        let mut h = random_hessenberg(n, n, &mut rng);
        let h0 = h.clone();
        let mut z = nan_slice(n * n);
        let mut wr = nan_slice(n);
        let mut wi = nan_slice(n);
        let mut query = [0.0];
        let info = lapack.dhseqr(SchurJob::SchurForm, SchurComp::Identity, n, 0, n - 1, &mut h, n, &mut wr, &mut wi, &mut z, n, Work::Query(&mut query));
        assert_eq!(info, 0);
        assert!(query[0] as usize >= n);
        assert_eq!(h, h0);
        assert!(z.iter().chain(&wr).chain(&wi).all(|x| x.is_nan()));
    }

    #[test]
    fn test_dhseqr_minimum_workspace_suffices() {
        let lapack = Lapack::new();
        let mut rng = StdRng::seed_from_u64(59);
        let n = 110;
        let mut h = random_hessenberg(n, n, &mut rng);
        let h0 = h.clone();
        let mut z = nan_slice(n * n);
        let mut wr = nan_slice(n);
        let mut wi = nan_slice(n);
        let mut work = nan_slice(n);
        let info = lapack.dhseqr(SchurJob::SchurForm, SchurComp::Identity, n, 0, n - 1, &mut h, n, &mut wr, &mut wi, &mut z, n, Work::Execute(&mut work));
        assert_eq!(info, 0);
        check_schur(n, &h, n, &wr, &wi);
        assert!(schur_residual(n, &h0, &z, n, &h, n) <= 1e-13 * n as f64);
    }

    #[test]
    #[should_panic(expected = "bad ilo or ihi")]
    fn test_dhseqr_rejects_bad_range() {
        let mut h = vec![0.0; 9];
        Lapack::new().dhseqr(
            SchurJob::EigenvaluesOnly,
            SchurComp::None,
            3,
            2,
            1,
            &mut h,
            3,
            &mut [0.0; 3],
            &mut [0.0; 3],
            &mut [],
            1,
            Work::Execute(&mut [0.0; 3]),
        );
    }
}
