//! Decoding of PNG and JPEG files into floating-point RGB.

use std::io::Cursor;
use std::path::Path;

use image::ImageReader;

use super::CodecError;
use crate::image::FloatImage;

/// Decode an image from bytes, guessing the format from its signature.
///
/// # Errors
///
/// Returns `CodecError::Decode` if the bytes are not a supported image.
pub fn decode_image(bytes: &[u8]) -> Result<FloatImage, CodecError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    let img = reader
        .decode()
        .map_err(|e| CodecError::Decode(e.to_string()))?;

    let color = img.color();
    if color.has_alpha() {
        log::warn!("dropping alpha channel of {color:?} image");
    }
    if color.channel_count() < 3 {
        log::debug!("broadcasting {color:?} image to three channels");
    }

    let rgb = img.into_rgb8();
    let (width, height) = rgb.dimensions();
    let samples = rgb.into_raw().into_iter().map(f32::from).collect();
    Ok(FloatImage::new(width, height, samples)?)
}

/// Read and decode the image at `path`.
pub fn read_image(path: impl AsRef<Path>) -> Result<FloatImage, CodecError> {
    let bytes = std::fs::read(path)?;
    decode_image(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma, Rgba, RgbaImage};

    fn png_bytes(img: impl Into<image::DynamicImage>) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.into().write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_gray_broadcasts_channels() {
        let gray = GrayImage::from_fn(3, 2, |x, y| Luma([(x + 10 * y) as u8]));
        let img = decode_image(&png_bytes(gray)).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.pixel(2, 1), [12.0, 12.0, 12.0]);
    }

    #[test]
    fn test_decode_rgba_drops_alpha() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 40]));
        let img = decode_image(&png_bytes(rgba)).unwrap();
        assert_eq!(img.samples.len(), 12);
        assert_eq!(img.pixel(1, 1), [10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_image(&[0u8, 1, 2, 3, 4, 5]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let result = read_image("/nonexistent/shearwarp/input.png");
        assert!(matches!(result, Err(CodecError::Io(_))));
    }
}
