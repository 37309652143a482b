//! Encoding of floating-point RGB into 8-bit PNG or JPEG.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbImage};

use super::CodecError;
use crate::image::FloatImage;

/// Encode `image` in `format`.
///
/// Samples are clamped to `0..=255` and rounded to the nearest integer.
///
/// # Errors
///
/// Returns `CodecError::InvalidImage` for inconsistent buffers and
/// `CodecError::Encode` if the encoder fails.
pub fn encode_image(image: &FloatImage, format: ImageFormat) -> Result<Vec<u8>, CodecError> {
    image.validate()?;
    let bytes: Vec<u8> = image
        .samples
        .iter()
        .map(|&v| v.clamp(0.0, 255.0).round() as u8)
        .collect();
    let rgb = RgbImage::from_raw(image.width, image.height, bytes).ok_or_else(|| {
        CodecError::Encode(format!(
            "buffer does not match {}x{}",
            image.width, image.height
        ))
    })?;

    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, format)
        .map_err(|e| CodecError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

/// Encode `image` and write it to `path`, choosing the format from the
/// file extension.
pub fn write_image(image: &FloatImage, path: impl AsRef<Path>) -> Result<(), CodecError> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path)
        .map_err(|_| CodecError::UnsupportedFormat(path.display().to_string()))?;
    let bytes = encode_image(image, format)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_image;

    #[test]
    fn test_png_roundtrip_clamps_and_rounds() {
        let luma = [-20.0, 0.4, 127.6, 300.0];
        let img = FloatImage::from_luma(2, 2, &luma).unwrap();
        let png = encode_image(&img, ImageFormat::Png).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let decoded = decode_image(&png).unwrap();
        assert_eq!(decoded.pixel(0, 0), [0.0; 3]);
        assert_eq!(decoded.pixel(1, 0), [0.0; 3]);
        assert_eq!(decoded.pixel(0, 1), [128.0; 3]);
        assert_eq!(decoded.pixel(1, 1), [255.0; 3]);
    }

    #[test]
    fn test_jpeg_has_magic_bytes() {
        let img = FloatImage::filled(16, 16, 90.0).unwrap();
        let jpeg = encode_image(&img, ImageFormat::Jpeg).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_invalid_buffer_is_rejected() {
        let mut img = FloatImage::filled(4, 4, 0.0).unwrap();
        img.samples.pop();
        assert!(matches!(
            encode_image(&img, ImageFormat::Png),
            Err(CodecError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let img = FloatImage::filled(1, 1, 0.0).unwrap();
        assert!(matches!(
            write_image(&img, "out.unknownext"),
            Err(CodecError::UnsupportedFormat(_))
        ));
    }
}
