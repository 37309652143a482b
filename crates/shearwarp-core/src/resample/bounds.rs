//! Maximal preserved frequencies of an affine map.
//!
//! Frequencies are Nyquist-relative: `1.0` is the Nyquist frequency of the
//! sampling grid. A map with linear part `A` sends source frequency `eta` to
//! destination frequency `A^T eta`, so a rectangle `[-u, u] x [-v, v]` of
//! source frequencies survives without aliasing when
//!
//! ```text
//! |a0| u + |a3| v <= 1
//! |a1| u + |a4| v <= 1
//! ```

use super::ResampleError;

/// Source of the `(umax, vmax)` pair consumed by the shear decomposition.
pub trait FrequencyBounds {
    /// Compute `(umax, vmax)` for the 2x2 linear part `[[a0, a1], [a3, a4]]`.
    ///
    /// Both values must lie in `(0, 1]`.
    fn bounds(&self, linear: [[f64; 2]; 2]) -> Result<(f64, f64), ResampleError>;
}

/// Largest-area frequency rectangle inside both Nyquist boxes.
///
/// Maximizes `u * v` subject to the two aliasing constraints above and
/// `u, v <= 1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NyquistBounds;

/// A constraint line `p * u + q * v = r`.
type Line = [f64; 3];

impl FrequencyBounds for NyquistBounds {
    fn bounds(&self, linear: [[f64; 2]; 2]) -> Result<(f64, f64), ResampleError> {
        let [[a0, a1], [a3, a4]] = linear;
        if ![a0, a1, a3, a4].iter().all(|v| v.is_finite()) {
            return Err(ResampleError::FrequencyBounds(format!(
                "non-finite linear part {linear:?}"
            )));
        }
        let det = a0 * a4 - a1 * a3;
        if det.abs() < f64::EPSILON {
            return Err(ResampleError::FrequencyBounds(format!(
                "singular linear part {linear:?}"
            )));
        }

        let lines: [Line; 4] = [
            [1.0, 0.0, 1.0],
            [0.0, 1.0, 1.0],
            [a0.abs(), a3.abs(), 1.0],
            [a1.abs(), a4.abs(), 1.0],
        ];
        let feasible = |u: f64, v: f64| {
            u > 0.0
                && v > 0.0
                && lines
                    .iter()
                    .all(|&[p, q, r]| p * u + q * v <= r * (1.0 + 1e-12))
        };

        // the optimum of u*v over the feasible polygon is either a vertex or
        // the tangency point of an edge
        let mut candidates = Vec::with_capacity(10);
        for (i, l1) in lines.iter().enumerate() {
            for l2 in &lines[i + 1..] {
                if let Some(point) = intersect(l1, l2) {
                    candidates.push(point);
                }
            }
            let [p, q, r] = *l1;
            if p > 0.0 && q > 0.0 {
                candidates.push((r / (2.0 * p), r / (2.0 * q)));
            }
        }

        candidates
            .into_iter()
            .filter(|&(u, v)| feasible(u, v))
            .max_by(|a, b| (a.0 * a.1).total_cmp(&(b.0 * b.1)))
            .map(|(u, v)| (u.min(1.0), v.min(1.0)))
            .ok_or_else(|| {
                ResampleError::FrequencyBounds(format!("no admissible band for {linear:?}"))
            })
    }
}

fn intersect(l1: &Line, l2: &Line) -> Option<(f64, f64)> {
    let [p1, q1, r1] = *l1;
    let [p2, q2, r2] = *l2;
    let det = p1 * q2 - p2 * q1;
    if det.abs() < 1e-15 {
        return None;
    }
    Some(((r1 * q2 - r2 * q1) / det, (p1 * r2 - p2 * r1) / det))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bounds(linear: [[f64; 2]; 2]) -> (f64, f64) {
        NyquistBounds.bounds(linear).unwrap()
    }

    #[test]
    fn test_identity_keeps_full_band() {
        assert_eq!(bounds([[1.0, 0.0], [0.0, 1.0]]), (1.0, 1.0));
    }

    #[test]
    fn test_magnification_keeps_full_band() {
        assert_eq!(bounds([[0.5, 0.0], [0.0, 0.25]]), (1.0, 1.0));
    }

    #[test]
    fn test_minification_halves_band() {
        let (u, v) = bounds([[2.0, 0.0], [0.0, 4.0]]);
        assert_relative_eq!(u, 0.5);
        assert_relative_eq!(v, 0.25);
    }

    #[test]
    fn test_rotation_is_symmetric() {
        let (s, c) = 30f64.to_radians().sin_cos();
        let (u, v) = bounds([[c, -s], [s, c]]);
        assert_relative_eq!(u, v, epsilon = 1e-12);
        assert_relative_eq!(u, 1.0 / (c + s), epsilon = 1e-12);
    }

    #[test]
    fn test_result_satisfies_constraints() {
        let linear = [[1.3, -0.7], [0.4, 0.9]];
        let (u, v) = bounds(linear);
        assert!(u > 0.0 && u <= 1.0);
        assert!(v > 0.0 && v <= 1.0);
        assert!(1.3 * u + 0.4 * v <= 1.0 + 1e-9);
        assert!(0.7 * u + 0.9 * v <= 1.0 + 1e-9);
    }

    #[test]
    fn test_rejects_singular_and_non_finite() {
        assert!(NyquistBounds.bounds([[1.0, 2.0], [2.0, 4.0]]).is_err());
        assert!(NyquistBounds.bounds([[f64::NAN, 0.0], [0.0, 1.0]]).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: bounds are in (0, 1] and respect both aliasing constraints.
        #[test]
        fn prop_bounds_are_admissible(
            a0 in -4.0f64..4.0,
            a1 in -4.0f64..4.0,
            a3 in -4.0f64..4.0,
            a4 in -4.0f64..4.0,
        ) {
            prop_assume!((a0 * a4 - a1 * a3).abs() > 1e-3);
            let (u, v) = NyquistBounds.bounds([[a0, a1], [a3, a4]]).unwrap();
            prop_assert!(u > 0.0 && u <= 1.0);
            prop_assert!(v > 0.0 && v <= 1.0);
            prop_assert!(a0.abs() * u + a3.abs() * v <= 1.0 + 1e-9);
            prop_assert!(a1.abs() * u + a4.abs() * v <= 1.0 + 1e-9);
        }
    }
}
