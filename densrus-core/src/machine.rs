//! Double-precision machine constants (the `dlamch` family).
//!
//! Values are fixed for IEEE-754 binary64 with round-to-nearest.

/// Relative machine epsilon for rounding, 2^-53.
pub const EPS: f64 = 1.1102230246251565e-16;

/// Base of the floating-point representation.
pub const BASE: f64 = 2.0;

/// `EPS * BASE`, the spacing of floats just above 1.
pub const PREC: f64 = EPS * BASE;

/// Smallest positive normal number such that `1 / SAFE_MIN` does not overflow.
pub const SAFE_MIN: f64 = 2.2250738585072014e-308;

/// Largest finite value.
pub const OVERFLOW: f64 = f64::MAX;

/// Underflow threshold used by scaling routines.
pub const SMALL_NUM: f64 = SAFE_MIN / PREC;

/// Overflow counterpart of [`SMALL_NUM`].
pub const BIG_NUM: f64 = 1.0 / SMALL_NUM;

/// `sqrt(SMALL_NUM)`.
pub const RT_MIN: f64 = 1.0010415475915505e-146;

/// `1 / RT_MIN`.
pub const RT_MAX: f64 = 1.0 / RT_MIN;
