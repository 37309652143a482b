//! Core types for the resampling engine: errors and configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::compare::DEFAULT_TOLERANCE_BITS;
use super::kernel::{KernelProfile, DEFAULT_PHASE_BITS, DEFAULT_TAPS};

/// Error types for resampling operations.
///
/// Every variant is fatal to the call that produced it: no partial output is
/// written to the destination image.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResampleError {
    /// Width or height is zero, or the image is too large to address.
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Sample buffer length doesn't match the image dimensions.
    #[error("Invalid pixel data: expected {expected} samples, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// The affine map contains NaN or infinite coefficients.
    #[error("Affine map has non-finite coefficients: {0:?}")]
    NonFiniteMap([f64; 6]),

    /// The affine map cannot be decomposed into shears.
    #[error("Degenerate affine map: {0}")]
    DegenerateMap(String),

    /// The frequency-bound collaborator failed or returned unusable bounds.
    #[error("Frequency bounds unavailable: {0}")]
    FrequencyBounds(String),

    /// A kernel table was requested with a scale factor below one.
    #[error("Invalid kernel scale {0}: must be finite and >= 1")]
    InvalidKernelScale(f64),

    /// The configuration is outside the supported range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Intermediate images of the map would not fit the largest supported canvas.
    #[error("Map needs a {width}x{height} working canvas, above the supported maximum")]
    CanvasOverflow { width: usize, height: usize },

    /// A kernel table or working buffer could not be allocated.
    #[error("Failed to allocate buffer of {0} elements")]
    Allocation(usize),
}

/// How a shear distributes its destination rows over threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Execution {
    /// Rows are processed in parallel on the global rayon pool.
    #[default]
    Parallel,
    /// Rows are processed sequentially on the calling thread.
    Serial,
}

/// Whether the orchestrator may transpose the image before decomposing the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransposePolicy {
    /// Transpose when the map shears more strongly across rows than along them.
    #[default]
    Auto,
    /// Never transpose.
    Never,
    /// Always transpose.
    Always,
}

/// Tunable parameters of the resampling engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Interpolation / anti-aliasing profile.
    pub profile: KernelProfile,
    /// Base tap half-width; a kernel built for scale `s` spans `ceil(s * taps)` taps
    /// on each side.
    pub taps: usize,
    /// Phase resolution exponent: kernels are tabulated at `2^phase_bits` sub-pixel
    /// phases.
    pub phase_bits: u32,
    /// Relaxed equality tolerance exponent: values closer than `2^-tolerance_bits`
    /// compare equal.
    pub tolerance_bits: i32,
    /// Transposition policy.
    pub transpose: TransposePolicy,
    /// Row scheduling.
    pub execution: Execution,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            profile: KernelProfile::default(),
            taps: DEFAULT_TAPS,
            phase_bits: DEFAULT_PHASE_BITS,
            tolerance_bits: DEFAULT_TOLERANCE_BITS,
            transpose: TransposePolicy::default(),
            execution: Execution::default(),
        }
    }
}

impl ResampleConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that every parameter is within its supported range.
    pub fn validate(&self) -> Result<(), ResampleError> {
        if self.taps == 0 {
            return Err(ResampleError::InvalidConfig(
                "taps must be at least 1".to_string(),
            ));
        }
        if !(1..=16).contains(&self.phase_bits) {
            return Err(ResampleError::InvalidConfig(format!(
                "phase_bits must be in 1..=16, got {}",
                self.phase_bits
            )));
        }
        if !(1..=52).contains(&self.tolerance_bits) {
            return Err(ResampleError::InvalidConfig(format!(
                "tolerance_bits must be in 1..=52, got {}",
                self.tolerance_bits
            )));
        }
        self.profile.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ResampleConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.taps, 4);
        assert_eq!(config.phase_bits, 10);
        assert_eq!(config.tolerance_bits, 20);
        assert_eq!(config.transpose, TransposePolicy::Auto);
        assert_eq!(config.execution, Execution::Parallel);
    }

    #[test]
    fn test_validate_rejects_zero_taps() {
        let mut config = ResampleConfig::new();
        config.taps = 0;
        assert!(matches!(
            config.validate(),
            Err(ResampleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_phase_bits_out_of_range() {
        let mut config = ResampleConfig::new();
        config.phase_bits = 0;
        assert!(config.validate().is_err());
        config.phase_bits = 17;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_profile() {
        let mut config = ResampleConfig::new();
        config.profile = KernelProfile::Gaussian { variance: -1.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_deserializes_partial_json() {
        let json = r#"{"profile": {"gaussian": {"variance": 0.5}}, "execution": "serial"}"#;
        let config: ResampleConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.profile, KernelProfile::Gaussian { variance: 0.5 });
        assert_eq!(config.execution, Execution::Serial);
        assert_eq!(config.taps, 4);
    }

    #[test]
    fn test_error_display() {
        let err = ResampleError::InvalidDimensions {
            width: 0,
            height: 3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid dimensions: width (0) and height (3) must be non-zero"
        );

        let err = ResampleError::InvalidKernelScale(0.5);
        assert_eq!(err.to_string(), "Invalid kernel scale 0.5: must be finite and >= 1");
    }
}
