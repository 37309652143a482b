//! Shearwarp Core - Band-limited affine image resampling
//!
//! This crate resamples images under an inverse affine map by decomposing
//! the map into four one-dimensional shears, each convolved with a
//! phase-indexed interpolation kernel. It also provides PNG/JPEG I/O for the
//! floating-point image type.

pub mod codec;
pub mod image;
pub mod resample;

pub use codec::{decode_image, encode_image, read_image, write_image, CodecError};
pub use crate::image::{FloatImage, CHANNELS};
pub use resample::{
    apply_affine, apply_affine_transform, AffineMap, KernelProfile, ResampleConfig,
    ResampleError, ResampleSummary, Resampler,
};
