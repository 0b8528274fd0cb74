//! Numerical constants for calibration math
//!
//! Provides standardized tolerance values used throughout the library.

/// Tolerance for detecting near-zero denominators in the de-embedding
/// formulas. A difference of standards below this magnitude is treated as
/// a degenerate input rather than divided through.
pub const NEAR_ZERO: f64 = 1e-15;

/// Relative tolerance for comparing reference impedances between a
/// calibration dataset and a raw measurement.
pub const Z0_REL_TOL: f64 = 1e-10;
