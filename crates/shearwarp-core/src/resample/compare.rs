//! Relaxed equality on real numbers.
//!
//! Only used to recognise special parameter values (identity shears, singular
//! points of a kernel, vanishing pivots), never for general numeric comparison.

/// Default tolerance exponent: values closer than `2^-20` compare equal.
pub const DEFAULT_TOLERANCE_BITS: i32 = 20;

/// True iff `|a - b| < 2^-20`.
#[inline]
pub fn approx_eq(a: f64, b: f64) -> bool {
    approx_eq_bits(a, b, DEFAULT_TOLERANCE_BITS)
}

/// True iff `|a - b| < 2^-bits`.
#[inline]
pub fn approx_eq_bits(a: f64, b: f64, bits: i32) -> bool {
    (a - b).abs() < 2f64.powi(-bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_values() {
        assert!(approx_eq(1.0, 1.0));
        assert!(approx_eq(0.0, -0.0));
    }

    #[test]
    fn test_within_tolerance() {
        assert!(approx_eq(1.0, 1.0 + 2f64.powi(-21)));
        assert!(!approx_eq(1.0, 1.0 + 2f64.powi(-19)));
    }

    #[test]
    fn test_boundary_is_exclusive() {
        assert!(!approx_eq(0.0, 2f64.powi(-20)));
    }

    #[test]
    fn test_custom_bits() {
        assert!(approx_eq_bits(1.0, 1.01, 4));
        assert!(!approx_eq_bits(1.0, 1.01, 10));
    }

    #[test]
    fn test_nan_never_equal() {
        assert!(!approx_eq(f64::NAN, f64::NAN));
        assert!(!approx_eq(f64::NAN, 0.0));
    }
}
