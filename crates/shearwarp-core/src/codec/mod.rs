//! File I/O for [`FloatImage`](crate::image::FloatImage).
//!
//! Decoding goes through the `image` crate and always yields three channels
//! on a 0..255 scale: gray images are broadcast, alpha is discarded.
//! Encoding clamps and rounds every sample to 8 bits.
//!
//! # Examples
//!
//! ```ignore
//! use shearwarp_core::codec::{read_image, write_image};
//!
//! let image = read_image("input.png")?;
//! write_image(&image, "copy.png")?;
//! ```

mod decode;
mod encode;

pub use decode::{decode_image, read_image};
pub use encode::{encode_image, write_image};
pub use image::ImageFormat;

use thiserror::Error;

/// Errors that can occur while reading or writing image files.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes could not be decoded as an image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Encoding to the requested format failed.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// The output format could not be inferred from the path.
    #[error("Unsupported output format for {0}")]
    UnsupportedFormat(String),

    /// The decoded image does not form a valid buffer.
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] crate::resample::ResampleError),

    /// Reading or writing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
