//! Band-limited affine resampling.
//!
//! This module provides:
//! - Phase-indexed interpolation kernels (raised cosine and Gaussian)
//! - One-dimensional shears along rows or columns
//! - Frequency bounds that keep each shear free of aliasing
//! - The four-shear orchestrator with mirror boundary extension
//!
//! # Architecture
//!
//! [`Resampler`] validates its inputs, optionally transposes the source so the
//! dominant shear runs along rows, asks a [`FrequencyBounds`] collaborator for
//! the preserved band, decomposes the map with [`decompose`] and runs the four
//! shears between two ping-pong canvases. The final canvas is cropped into
//! the caller's destination image.
//!
//! # Examples
//!
//! ```ignore
//! use shearwarp_core::resample::{apply_affine, AffineMap, ResampleConfig};
//!
//! let map = AffineMap::new([0.5, 0.0, 0.0, 0.0, 0.5, 0.0]);
//! let doubled = apply_affine(&image, &map, 2 * image.width, 2 * image.height, &ResampleConfig::default())?;
//! ```

mod affine;
mod bounds;
mod compare;
mod kernel;
mod shear;
mod transpose;
mod types;

pub use affine::{
    apply_affine, apply_affine_transform, decompose, mirror_index, AffineMap, Decomposition,
    ResampleSummary, Resampler, MAX_CANVAS_GROWTH,
};
pub use bounds::{FrequencyBounds, NyquistBounds};
pub use compare::{approx_eq, approx_eq_bits, DEFAULT_TOLERANCE_BITS};
pub use kernel::{KernelProfile, KernelTable, DEFAULT_PHASE_BITS, DEFAULT_TAPS};
pub use shear::{apply_shear, Axis, ShearSpec};
pub use transpose::{should_transpose, transpose_in_place};
pub use types::{Execution, ResampleConfig, ResampleError, TransposePolicy};
