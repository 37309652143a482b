//! Affine resampling by decomposition into four one-dimensional shears.
//!
//! # Algorithm
//!
//! The inverse map `x_src = a0 x + a1 y + a2`, `y_src = a3 x + a4 y + a5` is
//! realized as vertical, horizontal, vertical, horizontal shears:
//!
//! ```text
//! b0 = a0 - a1 a3 / a4          t2 = a2 - a1 a5 / a4
//! rv = clamp(|a1| umax + min(1, |a4| vmax), 1, 3)
//! rh = clamp(|a3 / a4| rv vmax + min(1, |b0| umax), 1, 3)
//!
//! 1. vertical    scale 1/vmax  coefficients (a4 / rv, 0)
//! 2. horizontal  scale 1/umax  coefficients (b0 / rh, a1 / rv)     translation -t2
//! 3. vertical    scale rv      coefficients (rv, a3 rv / (a4 rh))  translation -a5 rv / a4
//! 4. horizontal  scale rh      coefficients (rh, 0)
//! ```
//!
//! `rv` and `rh` stretch the intermediate images just enough that no stage
//! has to represent frequencies above its own Nyquist limit; the last two
//! stages undo the stretch with correspondingly widened kernels.
//!
//! The shears run on a canvas filled from the source with mirror boundary
//! extension so that the convolutions never see a hard edge. The canvas is at
//! least three times the working size in each direction, and grows until every
//! tap of every stage that contributes to the output lies inside it. Maps
//! whose intermediate images would need more than [`MAX_CANVAS_GROWTH`] times
//! the default area are rejected.

use super::bounds::{FrequencyBounds, NyquistBounds};
use super::compare::{approx_eq, approx_eq_bits};
use super::shear::{apply_shear, Axis, ShearSpec};
use super::transpose::{should_transpose, transpose_in_place};
use super::types::{ResampleConfig, TransposePolicy};
use super::ResampleError;
use crate::image::{try_zeroed, FloatImage, CHANNELS};

/// Largest canvas area, relative to the default canvas of three times the
/// working size in each direction.
pub const MAX_CANVAS_GROWTH: usize = 64;

/// Inverse affine map from destination to source pixel coordinates.
///
/// ```text
/// x_src = a0 * x_dst + a1 * y_dst + a2
/// y_src = a3 * x_dst + a4 * y_dst + a5
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    coefficients: [f64; 6],
}

impl AffineMap {
    /// Create a map from `[a0, a1, a2, a3, a4, a5]`.
    pub fn new(coefficients: [f64; 6]) -> Self {
        Self { coefficients }
    }

    /// The identity map.
    pub fn identity() -> Self {
        Self::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0])
    }

    /// Build a map from a 3x3 homogeneous matrix.
    ///
    /// The last row must be `(0, 0, h22)` with `h22 != 0`; the matrix is
    /// normalized by `h22`.
    ///
    /// # Errors
    ///
    /// Returns `ResampleError::DegenerateMap` for projective matrices and for
    /// `h22 == 0`, and `ResampleError::NonFiniteMap` for NaN or infinite entries.
    pub fn from_homogeneous(h: [[f64; 3]; 3]) -> Result<Self, ResampleError> {
        if !approx_eq(h[2][0], 0.0) || !approx_eq(h[2][1], 0.0) {
            return Err(ResampleError::DegenerateMap(format!(
                "projective row ({}, {}) is not supported",
                h[2][0], h[2][1]
            )));
        }
        if approx_eq(h[2][2], 0.0) {
            return Err(ResampleError::DegenerateMap(
                "homogeneous scale h22 vanishes".to_string(),
            ));
        }
        let s = h[2][2];
        let map = Self::new([
            h[0][0] / s,
            h[0][1] / s,
            h[0][2] / s,
            h[1][0] / s,
            h[1][1] / s,
            h[1][2] / s,
        ]);
        if !map.is_finite() {
            return Err(ResampleError::NonFiniteMap(map.coefficients));
        }
        Ok(map)
    }

    /// Coefficients `[a0, a1, a2, a3, a4, a5]`.
    pub fn coefficients(&self) -> [f64; 6] {
        self.coefficients
    }

    /// Linear part `[[a0, a1], [a3, a4]]`.
    pub fn linear(&self) -> [[f64; 2]; 2] {
        let [a0, a1, _, a3, a4, _] = self.coefficients;
        [[a0, a1], [a3, a4]]
    }

    /// True if every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        self.coefficients.iter().all(|c| c.is_finite())
    }

    /// Map a destination point to source coordinates.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a0, a1, a2, a3, a4, a5] = self.coefficients;
        (a0 * x + a1 * y + a2, a3 * x + a4 * y + a5)
    }

    /// Exchange the roles of the source axes (swap the two rows).
    pub fn swap_axes(&mut self) {
        let [a0, a1, a2, a3, a4, a5] = self.coefficients;
        self.coefficients = [a3, a4, a5, a0, a1, a2];
    }
}

impl Default for AffineMap {
    fn default() -> Self {
        Self::identity()
    }
}

/// Reflect `idx` into `0..len` with half-sample symmetry.
///
/// `-1` maps to `0`, `len` maps to `len - 1`, and reflection repeats until the
/// index is in range.
pub fn mirror_index(idx: i64, len: usize) -> usize {
    let period = 2 * len as i64;
    let r = idx.rem_euclid(period);
    if r < len as i64 {
        r as usize
    } else {
        (period - 1 - r) as usize
    }
}

/// The four shear stages of one affine map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposition {
    /// Stages in application order.
    pub shears: [ShearSpec; 4],
    /// Vertical stretch of the intermediate images.
    pub rv: f64,
    /// Horizontal stretch of the intermediate images.
    pub rh: f64,
}

/// Decompose `map` into shears.
///
/// `source` is the source size `[w, h]` and `working` the working size
/// `[ww, hh]`; frame centers start at the source center and end at the
/// working center.
///
/// # Errors
///
/// Returns `ResampleError::DegenerateMap` when `a4` or `b0` vanish within the
/// relaxed tolerance, or when any stage parameter is not finite.
pub fn decompose(
    map: &AffineMap,
    (umax, vmax): (f64, f64),
    source: [usize; 2],
    working: [usize; 2],
    tolerance_bits: i32,
) -> Result<Decomposition, ResampleError> {
    let [a0, a1, a2, a3, a4, a5] = map.coefficients();
    if approx_eq_bits(a4, 0.0, tolerance_bits) {
        return Err(ResampleError::DegenerateMap(format!(
            "vertical pivot a4 = {a4} vanishes"
        )));
    }
    let b0 = a0 - a1 * a3 / a4;
    if approx_eq_bits(b0, 0.0, tolerance_bits) {
        return Err(ResampleError::DegenerateMap(format!(
            "horizontal pivot b0 = {b0} vanishes"
        )));
    }
    let t2 = a2 - a1 * a5 / a4;
    let rv = (a1.abs() * umax + (a4.abs() * vmax).min(1.0)).clamp(1.0, 3.0);
    let rh = ((a3 / a4).abs() * rv * vmax + (b0.abs() * umax).min(1.0)).clamp(1.0, 3.0);

    let (wf, hf) = (source[0] as f64, source[1] as f64);
    let (wwf, hhf) = (working[0] as f64, working[1] as f64);

    let before = [wf / 2.0, hf / 2.0];
    let first = ShearSpec {
        axis: Axis::Vertical,
        center_before: before,
        center_after: [before[0], rv / a4 * before[1]],
        scale: 1.0 / vmax,
        coefficients: [a4 / rv, 0.0],
    };

    let before = [first.center_after[0] - t2, first.center_after[1]];
    let second = ShearSpec {
        axis: Axis::Horizontal,
        center_before: before,
        center_after: [
            rh / b0 * before[0] - a1 / rv * rh / b0 * before[1],
            before[1],
        ],
        scale: 1.0 / umax,
        coefficients: [b0 / rh, a1 / rv],
    };

    let before = [
        second.center_after[0],
        second.center_after[1] - a5 * rv / a4,
    ];
    let third = ShearSpec {
        axis: Axis::Vertical,
        center_before: before,
        center_after: [before[0], hhf / 2.0],
        scale: rv,
        coefficients: [rv, a3 * rv / a4 / rh],
    };

    let fourth = ShearSpec {
        axis: Axis::Horizontal,
        center_before: third.center_after,
        center_after: [wwf / 2.0, hhf / 2.0],
        scale: rh,
        coefficients: [rh, 0.0],
    };

    let shears = [first, second, third, fourth];
    let finite = shears.iter().all(|s| {
        s.scale.is_finite()
            && s.coefficients.iter().all(|c| c.is_finite())
            && s.center_before.iter().all(|c| c.is_finite())
            && s.center_after.iter().all(|c| c.is_finite())
    });
    if !finite {
        return Err(ResampleError::DegenerateMap(
            "shear parameters are not finite".to_string(),
        ));
    }

    Ok(Decomposition { shears, rv, rh })
}

/// Diagnostics of one resampling call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampleSummary {
    /// Whether the source and map were transposed before decomposition.
    pub transposed: bool,
    /// Preserved horizontal frequency (Nyquist-relative).
    pub umax: f64,
    /// Preserved vertical frequency (Nyquist-relative).
    pub vmax: f64,
    /// Vertical intermediate stretch.
    pub rv: f64,
    /// Horizontal intermediate stretch.
    pub rh: f64,
}

/// Affine resampling engine.
#[derive(Debug, Clone)]
pub struct Resampler<B = NyquistBounds> {
    config: ResampleConfig,
    bounds: B,
}

impl Resampler<NyquistBounds> {
    /// Create a resampler using [`NyquistBounds`].
    pub fn new(config: ResampleConfig) -> Self {
        Self::with_bounds(config, NyquistBounds)
    }
}

impl Default for Resampler<NyquistBounds> {
    fn default() -> Self {
        Self::new(ResampleConfig::default())
    }
}

impl<B: FrequencyBounds> Resampler<B> {
    /// Create a resampler with a custom frequency-bound collaborator.
    pub fn with_bounds(config: ResampleConfig, bounds: B) -> Self {
        Self { config, bounds }
    }

    /// The engine configuration.
    pub fn config(&self) -> &ResampleConfig {
        &self.config
    }

    /// Resample `src` under `map` into `dst`.
    ///
    /// The output size is taken from `dst`, which the caller allocates.
    ///
    /// # Side effects
    ///
    /// When the transpose policy fires, `src` is replaced by its transpose and
    /// the rows of `map` are swapped. The result written to `dst` is the same
    /// either way; callers that need the originals afterwards must pass
    /// copies (see [`apply_affine`]).
    ///
    /// # Errors
    ///
    /// All errors are fatal and leave `dst` untouched:
    /// * `InvalidConfig`, `InvalidDimensions`, `InvalidPixelData` for bad inputs
    /// * `NonFiniteMap` and `DegenerateMap` for maps that cannot be decomposed
    /// * `FrequencyBounds` if the collaborator fails or returns bounds outside `(0, 1]`
    /// * `CanvasOverflow` if the intermediate images would not fit the largest canvas
    /// * `Allocation` if the working canvases cannot be allocated
    pub fn apply(
        &self,
        src: &mut FloatImage,
        map: &mut AffineMap,
        dst: &mut FloatImage,
    ) -> Result<ResampleSummary, ResampleError> {
        self.config.validate()?;
        src.validate()?;
        dst.validate()?;
        if !map.is_finite() {
            return Err(ResampleError::NonFiniteMap(map.coefficients()));
        }

        let transposed = match self.config.transpose {
            TransposePolicy::Auto => should_transpose(map),
            TransposePolicy::Never => false,
            TransposePolicy::Always => true,
        };
        if transposed {
            transpose_in_place(src, map)?;
        }

        let (umax, vmax) = self.bounds.bounds(map.linear())?;
        for (name, value) in [("umax", umax), ("vmax", vmax)] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ResampleError::FrequencyBounds(format!(
                    "{name} = {value} is outside (0, 1]"
                )));
            }
        }

        let (w, h) = (src.width as usize, src.height as usize);
        let (w_out, h_out) = (dst.width as usize, dst.height as usize);
        let (ww, hh) = (w.max(w_out), h.max(h_out));

        let decomposition = decompose(
            map,
            (umax, vmax),
            [w, h],
            [ww, hh],
            self.config.tolerance_bits,
        )?;
        let [mx, my] = canvas_margins(&decomposition, [w_out, h_out], [ww, hh], &self.config);
        let (cw, ch) = canvas_size([ww, hh], [mx, my])?;
        log::debug!(
            "resampling {w}x{h} -> {w_out}x{h_out} on a {cw}x{ch} canvas: \
             umax {umax:.4}, vmax {vmax:.4}, rv {:.4}, rh {:.4}",
            decomposition.rv,
            decomposition.rh
        );

        let len = cw
            .checked_mul(ch)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or(ResampleError::Allocation(usize::MAX))?;
        let mut front = try_zeroed(len)?;
        let mut back = try_zeroed(len)?;

        // the smaller of input and output is centered inside the working size
        let origin = [mx + w_out.saturating_sub(w) / 2, my + h_out.saturating_sub(h) / 2];
        fill_mirrored(src, &mut front, [cw, ch], origin);

        for spec in &decomposition.shears {
            apply_shear(&front, &mut back, cw, ch, spec, &self.config)?;
            std::mem::swap(&mut front, &mut back);
        }

        let row_len = w_out * CHANNELS;
        for (j, row) in dst.samples.chunks_exact_mut(row_len).enumerate() {
            let start = ((j + my) * cw + mx) * CHANNELS;
            row.copy_from_slice(&front[start..start + row_len]);
        }

        Ok(ResampleSummary {
            transposed,
            umax,
            vmax,
            rv: decomposition.rv,
            rh: decomposition.rh,
        })
    }
}

/// Resample with the default configuration.
///
/// Same contract as [`Resampler::apply`], including the in-place
/// transposition of `src` and `map`.
pub fn apply_affine_transform(
    src: &mut FloatImage,
    map: &mut AffineMap,
    dst: &mut FloatImage,
) -> Result<ResampleSummary, ResampleError> {
    Resampler::default().apply(src, map, dst)
}

/// Resample a copy of `src` into a new `width x height` image.
///
/// Neither `src` nor `map` is modified.
pub fn apply_affine(
    src: &FloatImage,
    map: &AffineMap,
    width: u32,
    height: u32,
    config: &ResampleConfig,
) -> Result<FloatImage, ResampleError> {
    let mut dst = FloatImage::filled(width, height, 0.0)?;
    let mut src = src.clone();
    let mut map = *map;
    Resampler::new(config.clone()).apply(&mut src, &mut map, &mut dst)?;
    Ok(dst)
}

/// Margins `[mx, my]` around the working area that keep every tap inside the
/// canvas.
///
/// The crop region is pulled back through the stages in frame coordinates.
/// Canvas index and frame coordinate of a stage differ by
/// `canvas / 2 - center`, with `canvas / 2 = working / 2 + margin`. The result
/// is never below the working size.
fn canvas_margins(
    decomposition: &Decomposition,
    output: [usize; 2],
    working: [usize; 2],
    config: &ResampleConfig,
) -> [usize; 2] {
    let (xo, yo) = ((output[0] - 1) as f64, (output[1] - 1) as f64);
    let mut region = vec![[0.0, 0.0], [xo, 0.0], [0.0, yo], [xo, yo]];
    let mut margins = working.map(|v| v as f64);
    let shears = &decomposition.shears;

    for k in (0..shears.len()).rev() {
        let spec = &shears[k];
        region = pull_back(spec, &region, config);
        for (axis, margin) in margins.iter_mut().enumerate() {
            let half = working[axis] as f64 / 2.0;
            let center = spec.center_before[axis];
            for p in &region {
                *margin = margin
                    .max(center - p[axis] - half)
                    .max(p[axis] + 1.0 - center - half);
            }
        }
        // move into the destination frame of the previous stage
        if k > 0 {
            let prev = &shears[k - 1];
            let shift = [
                prev.center_after[0] - spec.center_before[0],
                prev.center_after[1] - spec.center_before[1],
            ];
            for p in &mut region {
                p[0] += shift[0];
                p[1] += shift[1];
            }
        }
    }
    margins.map(|m| m.ceil() as usize)
}

/// Source-frame points read by `spec` while producing the destination-frame
/// `region`, widened by the kernel reach along the shear axis.
fn pull_back(spec: &ShearSpec, region: &[[f64; 2]], config: &ResampleConfig) -> Vec<[f64; 2]> {
    if spec.is_identity(config.tolerance_bits) {
        return region.to_vec();
    }
    let along = match spec.axis {
        Axis::Horizontal => 0,
        Axis::Vertical => 1,
    };
    // one extra sample for the floor of the source position
    let reach = (spec.scale * config.taps as f64).ceil() + 1.0;
    let [c0, c1] = spec.coefficients;
    region
        .iter()
        .flat_map(|p| {
            let m = c0 * p[along] + c1 * p[1 - along];
            let (mut lo, mut hi) = (*p, *p);
            lo[along] = m - reach;
            hi[along] = m + reach;
            [lo, hi]
        })
        .collect()
}

fn canvas_size(
    working: [usize; 2],
    margins: [usize; 2],
) -> Result<(usize, usize), ResampleError> {
    let side = |w: usize, m: usize| m.checked_mul(2).and_then(|v| v.checked_add(w));
    let (Some(cw), Some(ch)) = (side(working[0], margins[0]), side(working[1], margins[1])) else {
        return Err(ResampleError::CanvasOverflow {
            width: usize::MAX,
            height: usize::MAX,
        });
    };
    let limit = MAX_CANVAS_GROWTH
        .saturating_mul(9)
        .saturating_mul(working[0])
        .saturating_mul(working[1]);
    if cw.saturating_mul(ch) > limit {
        return Err(ResampleError::CanvasOverflow {
            width: cw,
            height: ch,
        });
    }
    Ok((cw, ch))
}

/// Fill `canvas` so that canvas pixel `origin + (x, y)` is source pixel
/// `(x, y)`, reflecting everything outside the source.
fn fill_mirrored(src: &FloatImage, canvas: &mut [f32], [cw, _]: [usize; 2], origin: [usize; 2]) {
    let (w, h) = (src.width as usize, src.height as usize);
    let columns: Vec<usize> = (0..cw)
        .map(|i| mirror_index(i as i64 - origin[0] as i64, w))
        .collect();

    for (j, row) in canvas.chunks_exact_mut(cw * CHANNELS).enumerate() {
        let sy = mirror_index(j as i64 - origin[1] as i64, h);
        let src_row = &src.samples[sy * w * CHANNELS..(sy + 1) * w * CHANNELS];
        for (px, &sx) in row.chunks_exact_mut(CHANNELS).zip(&columns) {
            px.copy_from_slice(&src_row[sx * CHANNELS..(sx + 1) * CHANNELS]);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Reflect one step at a time until in range.
    fn reflect_naive(mut idx: i64, len: i64) -> i64 {
        while idx < 0 || idx > len - 1 {
            idx = if idx < 0 { -1 - idx } else { 2 * len - 1 - idx };
        }
        idx
    }

    proptest! {
        /// Property: closed-form mirror agrees with repeated reflection.
        #[test]
        fn prop_mirror_matches_repeated_reflection(idx in -200i64..200, len in 1usize..20) {
            prop_assert_eq!(mirror_index(idx, len) as i64, reflect_naive(idx, len as i64));
        }

        /// Property: a constant image stays constant under rotation and scaling.
        #[test]
        fn prop_constant_image_is_invariant(
            degrees in -20.0f64..20.0,
            scale in 0.8f64..1.25,
            value in 1.0f32..255.0,
        ) {
            let src = FloatImage::filled(24, 24, value).unwrap();
            let (s, c) = degrees.to_radians().sin_cos();
            let (a0, a1, a3, a4) = (scale * c, -scale * s, scale * s, scale * c);
            // keep the center fixed
            let map = AffineMap::new([a0, a1, 12.0 - 12.0 * (a0 + a1), a3, a4, 12.0 - 12.0 * (a3 + a4)]);
            let out = apply_affine(&src, &map, 24, 24, &ResampleConfig::default()).unwrap();
            for &v in &out.samples {
                prop_assert!((v - value).abs() <= 1e-3 * value);
            }
        }
    }
}
