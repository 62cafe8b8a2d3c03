//! Precondition violations.
//!
//! Bad dimensions, strides and buffer lengths are programming errors, not
//! data errors: kernels panic with one of these messages before touching
//! memory. Numerical failures are reported through return values instead.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("densrus: zero x increment")]
    ZeroIncX,
    #[error("densrus: zero y increment")]
    ZeroIncY,
    #[error("densrus: bad leading dimension of A")]
    BadLdA,
    #[error("densrus: bad leading dimension of B")]
    BadLdB,
    #[error("densrus: bad leading dimension of C")]
    BadLdC,
    #[error("densrus: bad leading dimension of H")]
    BadLdH,
    #[error("densrus: bad leading dimension of T")]
    BadLdT,
    #[error("densrus: bad leading dimension of V")]
    BadLdV,
    #[error("densrus: bad leading dimension of WV")]
    BadLdWV,
    #[error("densrus: bad leading dimension of Z")]
    BadLdZ,
    #[error("densrus: bad leading dimension of U")]
    BadLdU,
    #[error("densrus: bad leading dimension of work")]
    BadLdWork,
    #[error("densrus: insufficient length of x")]
    ShortX,
    #[error("densrus: insufficient length of y")]
    ShortY,
    #[error("densrus: insufficient length of A")]
    ShortA,
    #[error("densrus: insufficient length of B")]
    ShortB,
    #[error("densrus: insufficient length of C")]
    ShortC,
    #[error("densrus: insufficient length of H")]
    ShortH,
    #[error("densrus: insufficient length of T")]
    ShortT,
    #[error("densrus: insufficient length of V")]
    ShortV,
    #[error("densrus: insufficient length of WV")]
    ShortWV,
    #[error("densrus: insufficient length of Z")]
    ShortZ,
    #[error("densrus: insufficient length of U")]
    ShortU,
    #[error("densrus: insufficient length of d")]
    ShortD,
    #[error("densrus: insufficient length of e")]
    ShortE,
    #[error("densrus: insufficient length of tau")]
    ShortTau,
    #[error("densrus: insufficient length of sr or si")]
    ShortShifts,
    #[error("densrus: insufficient length of wr or wi")]
    ShortEigenvalues,
    #[error("densrus: insufficient length of work")]
    ShortWork,
    #[error("densrus: insufficient workspace length")]
    BadLWork,
    #[error("densrus: k out of range")]
    BadK,
    #[error("densrus: bad ilo or ihi")]
    BadIloIhi,
    #[error("densrus: bad ktop or kbot")]
    BadWindow,
    #[error("densrus: bad deflation window size")]
    BadNw,
    #[error("densrus: bad iloz or ihiz")]
    BadIlozIhiz,
    #[error("densrus: bad number of shifts")]
    BadNShifts,
    #[error("densrus: unsupported kacc22")]
    BadKacc22,
    #[error("densrus: isgn must be 1 or -1")]
    BadSign,
    #[error("densrus: bad ifst or ilst")]
    BadReorderIndex,
    #[error("densrus: bad block size")]
    BadBlockSize,
    #[error("densrus: unsupported reflector direction or storage")]
    BadReflectorStorage,
    #[error("densrus: bad scaling factor")]
    BadScale,
}

/// Panic with the message of `$violation` unless `$cond` holds.
#[macro_export]
macro_rules! require {
    ($cond:expr, $violation:expr) => {
        if !$cond {
            panic!("{}", $violation);
        }
    };
}
