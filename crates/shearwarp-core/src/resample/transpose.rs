//! Transposition of image and map so the dominant shear runs along rows.
//!
//! Swapping the rows of the map's linear part while transposing the source
//! image leaves the warped result unchanged: the destination still samples
//! `src(A x + t)`. Only the order in which the four shears read memory
//! changes.

use super::affine::AffineMap;
use super::ResampleError;
use crate::image::FloatImage;

/// Decide whether transposing makes the decomposition cheaper.
///
/// Each row of the linear part is normalized to unit length; transposition
/// pays off when the off-diagonal terms outweigh the diagonal ones.
pub fn should_transpose(map: &AffineMap) -> bool {
    let [a0, a1, _, a3, a4, _] = map.coefficients();
    let c1 = a0.hypot(a1);
    let c2 = a3.hypot(a4);
    if c1 == 0.0 || c2 == 0.0 {
        return false;
    }
    let diagonal = a0.abs() / c1 + a4.abs() / c2;
    let off_diagonal = a1.abs() / c1 + a3.abs() / c2;
    diagonal < off_diagonal
}

/// Transpose `image` and swap the rows of `map` in place.
///
/// Callers that need the originals must copy them first. On error both are
/// left unchanged.
pub fn transpose_in_place(
    image: &mut FloatImage,
    map: &mut AffineMap,
) -> Result<(), ResampleError> {
    log::debug!(
        "transposing {}x{} source to align the dominant shear with rows",
        image.width,
        image.height
    );
    *image = image.transposed()?;
    map.swap_axes();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation(degrees: f64) -> AffineMap {
        let (s, c) = degrees.to_radians().sin_cos();
        AffineMap::new([c, -s, 0.0, s, c, 0.0])
    }

    #[test]
    fn test_identity_is_not_transposed() {
        assert!(!should_transpose(&AffineMap::identity()));
    }

    #[test]
    fn test_small_rotation_is_not_transposed() {
        assert!(!should_transpose(&rotation(30.0)));
    }

    #[test]
    fn test_quarter_turn_is_transposed() {
        assert!(should_transpose(&rotation(90.0)));
        assert!(should_transpose(&rotation(70.0)));
    }

    #[test]
    fn test_scale_does_not_matter() {
        let map = AffineMap::new([0.1, 3.0, 0.0, 2.0, 0.2, 0.0]);
        assert!(should_transpose(&map));
        let map = AffineMap::new([5.0, 0.1, 0.0, 0.0, 0.01, 0.0]);
        assert!(!should_transpose(&map));
    }

    #[test]
    fn test_degenerate_row_is_left_alone() {
        let map = AffineMap::new([0.0, 0.0, 1.0, 0.0, 1.0, 0.0]);
        assert!(!should_transpose(&map));
    }

    #[test]
    fn test_transpose_in_place_swaps_everything() {
        let luma: Vec<f32> = (0..6).map(|v| v as f32).collect();
        let mut image = FloatImage::from_luma(3, 2, &luma).unwrap();
        let original = image.clone();
        let mut map = AffineMap::new([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        transpose_in_place(&mut image, &mut map).unwrap();

        assert_eq!(map.coefficients(), [4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
        assert_eq!((image.width, image.height), (2, 3));
        assert_eq!(image.pixel(1, 2), original.pixel(2, 1));
    }
}
