//! Anti-aliasing kernel profiles and their phase-indexed lookup tables.
//!
//! A [`KernelTable`] tabulates one profile at `prec = 2^phase_bits` sub-pixel
//! phases and `2N + 1` integer tap offsets, where `N = ceil(s * taps)` grows
//! with the scale factor `s >= 1`. Stretching the profile by `s` lowers its
//! bandwidth by the same factor, which is what suppresses aliasing when a
//! shear compresses the image.
//!
//! Each phase row is normalized to unit gain, so a constant signal passes
//! through any table unchanged.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::compare::approx_eq_bits;
use super::ResampleError;

/// Default base tap half-width.
pub const DEFAULT_TAPS: usize = 4;

/// Default phase resolution exponent (1024 phases).
pub const DEFAULT_PHASE_BITS: u32 = 10;

/// One-dimensional interpolation profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KernelProfile {
    /// Raised-cosine low-pass filter.
    RaisedCosine {
        /// Period `T` of the underlying sinc.
        period: f64,
        /// Roll-off factor `beta` in `(0, 1]`.
        roll_off: f64,
    },
    /// Gaussian `exp(-x^2 / (2 * variance))`.
    Gaussian {
        /// Variance of the gaussian, in squared pixels.
        variance: f64,
    },
}

impl Default for KernelProfile {
    fn default() -> Self {
        Self::raised_cosine()
    }
}

impl KernelProfile {
    /// Raised cosine with period 1 and roll-off 0.36.
    pub fn raised_cosine() -> Self {
        Self::RaisedCosine {
            period: 1.0,
            roll_off: 0.36,
        }
    }

    /// Gaussian with variance 0.36.
    pub fn gaussian() -> Self {
        Self::Gaussian { variance: 0.36 }
    }

    /// Check that the profile parameters describe a usable filter.
    pub fn validate(&self) -> Result<(), ResampleError> {
        match *self {
            Self::RaisedCosine { period, roll_off } => {
                if !(period.is_finite() && period > 0.0) {
                    return Err(ResampleError::InvalidConfig(format!(
                        "raised cosine period must be positive, got {period}"
                    )));
                }
                if !(roll_off > 0.0 && roll_off <= 1.0) {
                    return Err(ResampleError::InvalidConfig(format!(
                        "raised cosine roll-off must be in (0, 1], got {roll_off}"
                    )));
                }
            }
            Self::Gaussian { variance } => {
                if !(variance.is_finite() && variance > 0.0) {
                    return Err(ResampleError::InvalidConfig(format!(
                        "gaussian variance must be positive, got {variance}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Evaluate the profile at offset `x` (in pixels).
    ///
    /// Offsets within `2^-tolerance_bits` of a removable singularity take the
    /// limit value.
    pub fn weight(&self, x: f64, tolerance_bits: i32) -> f64 {
        match *self {
            Self::RaisedCosine { period, roll_off } => {
                if approx_eq_bits(x, 0.0, tolerance_bits) {
                    1.0
                } else if approx_eq_bits(x.abs(), period / (2.0 * roll_off), tolerance_bits) {
                    // removable singularity where both cos and the denominator vanish
                    roll_off / 2.0 * (PI / (2.0 * roll_off)).sin()
                } else {
                    let u = PI * x / period;
                    let ratio = 2.0 * roll_off * x / period;
                    u.sin() / u * (roll_off * u).cos() / (1.0 - ratio * ratio)
                }
            }
            Self::Gaussian { variance } => (-x * x / (2.0 * variance)).exp(),
        }
    }
}

/// Precomputed, normalized convolution weights for one shear.
#[derive(Debug, Clone)]
pub struct KernelTable {
    half_width: usize,
    phases: usize,
    /// Phase-major: row `p` holds the `2N + 1` weights for offsets `-N..=N`.
    weights: Vec<f32>,
}

impl KernelTable {
    /// Build the table for scale factor `scale`.
    ///
    /// For every phase `p` and offset `k` in `-N..=N` the raw weight is
    /// `profile.weight((k + p / prec) / scale, tolerance_bits)`; each phase
    /// row is then divided by its sum.
    ///
    /// # Errors
    ///
    /// * `InvalidKernelScale` if `scale` is not finite or below one
    /// * `Allocation` if the table cannot be allocated
    /// * `InvalidConfig` if a phase row sums to zero
    pub fn build(
        profile: &KernelProfile,
        scale: f64,
        taps: usize,
        phase_bits: u32,
        tolerance_bits: i32,
    ) -> Result<Self, ResampleError> {
        if !scale.is_finite() || scale < 1.0 {
            return Err(ResampleError::InvalidKernelScale(scale));
        }

        let half_width = (scale * taps as f64).ceil() as usize;
        let phases = 1usize << phase_bits;
        let row_len = 2 * half_width + 1;
        let len = row_len
            .checked_mul(phases)
            .ok_or(ResampleError::Allocation(usize::MAX))?;

        let mut weights = Vec::new();
        weights
            .try_reserve_exact(len)
            .map_err(|_| ResampleError::Allocation(len))?;

        let prec = phases as f64;
        let n = half_width as i64;
        let mut row = Vec::with_capacity(row_len);
        for p in 0..phases {
            row.clear();
            let frac = p as f64 / prec;
            let mut total = 0.0f64;
            for k in -n..=n {
                let w = profile.weight((k as f64 + frac) / scale, tolerance_bits);
                total += w;
                row.push(w);
            }
            if !(total.is_finite() && total.abs() > f64::EPSILON) {
                return Err(ResampleError::InvalidConfig(format!(
                    "kernel has no gain at phase {p} (sum {total})"
                )));
            }
            weights.extend(row.iter().map(|&w| (w / total) as f32));
        }

        Ok(Self {
            half_width,
            phases,
            weights,
        })
    }

    /// Tap half-width `N`.
    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// Phase resolution `prec`.
    pub fn phases(&self) -> usize {
        self.phases
    }

    /// Weights of phase `p`, indexed by `offset + N`.
    #[inline]
    pub fn phase(&self, p: usize) -> &[f32] {
        let row_len = 2 * self.half_width + 1;
        &self.weights[p * row_len..(p + 1) * row_len]
    }

    /// Weight at integer offset `offset` in `-N..=N` and phase `p`.
    #[inline]
    pub fn weight(&self, offset: isize, p: usize) -> f32 {
        self.phase(p)[(offset + self.half_width as isize) as usize]
    }
}
