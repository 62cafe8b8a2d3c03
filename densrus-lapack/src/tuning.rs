//! Block sizes and multishift QR parameters (the `ilaenv` / `iparmq` family).
//!
//! These are the only tunables in the crate. They depend on the routine and
//! the problem size, never on runtime state, so results are reproducible
//! across runs.

/// Routine families with a blocked implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Routine {
    Sytrd,
    Gehrd,
    Geqrf,
    Potrf,
    Ormqr,
}

/// Optimal block size (`ilaenv` ispec 1).
pub fn block_size(routine: Routine) -> usize {
    match routine {
        Routine::Potrf => 64,
        Routine::Sytrd | Routine::Gehrd | Routine::Geqrf | Routine::Ormqr => 32,
    }
}

/// Smallest block size worth running the blocked code with (`ilaenv` ispec 2).
pub fn min_block_size(_routine: Routine) -> usize {
    2
}

/// Order below which the unblocked code is used for the rest of the matrix
/// (`ilaenv` ispec 3).
pub fn crossover(routine: Routine) -> usize {
    match routine {
        Routine::Sytrd => 32,
        Routine::Gehrd | Routine::Geqrf | Routine::Ormqr => 128,
        Routine::Potrf => 0,
    }
}

// ============================================================================
// Multishift QR (iparmq)
// ============================================================================

/// Matrices smaller than this go to the double-shift `dlahqr`.
pub const NMIN: usize = 75;

/// Percentage of deflations from aggressive early deflation that skips the
/// next multishift sweep.
pub const NIBBLE: usize = 14;

/// Active blocks larger than this get a wider deflation window.
const KNWSWP: usize = 500;

/// Number of shifts at which the sweep accumulates its reflections into an
/// explicit orthogonal matrix.
const KACMIN: usize = 14;

/// Number of simultaneous shifts for an active block of order `nh`.
pub fn shift_count(nh: usize) -> usize {
    let mut ns = 2;
    if nh >= 30 {
        ns = 4;
    }
    if nh >= 60 {
        ns = 10;
    }
    if nh >= 150 {
        let lg = ((nh as f64).ln() / 2f64.ln()).round() as usize;
        ns = (nh / lg.max(1)).max(10);
    }
    if nh >= 590 {
        ns = 64;
    }
    if nh >= 3000 {
        ns = 128;
    }
    if nh >= 6000 {
        ns = 256;
    }
    (ns - ns % 2).max(2)
}

/// Aggressive early deflation window size for an active block of order `nh`.
pub fn deflation_window(nh: usize) -> usize {
    let ns = shift_count(nh);
    if nh <= KNWSWP {
        ns
    } else {
        3 * ns / 2
    }
}

/// How `dlaqr5` applies its accumulated reflections: 0 updates the rest of
/// H with Level-2 operations, 1 accumulates them and uses `dgemm`.
pub fn kacc22(nh: usize) -> usize {
    if shift_count(nh) >= KACMIN {
        1
    } else {
        0
    }
}
