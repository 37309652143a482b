//! One-dimensional shears: scale, shear and translation along a single axis.
//!
//! A horizontal shear maps destination pixel `(x, y)` to the source abscissa
//!
//! ```text
//! M = c0 * (x + xc_after - W/2) + c1 * (y + yc_after - H/2) - xc_before + W/2
//! ```
//!
//! and convolves the source row `y` around `M` with a [`KernelTable`]. The
//! vertical shear is the same with the roles of the axes swapped. Centers are
//! expressed in frame coordinates, so a shear's `center_before` is the
//! previous shear's `center_after`.
//!
//! Taps falling outside the image are dropped from the sum rather than
//! padded; callers provide enough border beforehand.

use rayon::prelude::*;

use super::compare::approx_eq_bits;
use super::kernel::KernelTable;
use super::types::{Execution, ResampleConfig};
use super::ResampleError;
use crate::image::CHANNELS;

/// Axis along which a shear displaces samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Along rows (the contiguous memory axis).
    Horizontal,
    /// Along columns.
    Vertical,
}

/// Parameters of one shear stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShearSpec {
    /// Axis the shear acts on.
    pub axis: Axis,
    /// Frame center `[x, y]` of the source image.
    pub center_before: [f64; 2],
    /// Frame center `[x, y]` of the destination image.
    pub center_after: [f64; 2],
    /// Kernel width scale factor, `>= 1`.
    pub scale: f64,
    /// `c0` scales the shear axis, `c1` couples in the other axis.
    pub coefficients: [f64; 2],
}

impl ShearSpec {
    /// Index of the shear axis in `[x, y]` pairs.
    fn along(&self) -> usize {
        match self.axis {
            Axis::Horizontal => 0,
            Axis::Vertical => 1,
        }
    }

    /// True when the shear leaves the image unchanged within `2^-tolerance_bits`.
    pub fn is_identity(&self, tolerance_bits: i32) -> bool {
        let along = self.along();
        approx_eq_bits(self.coefficients[0], 1.0, tolerance_bits)
            && approx_eq_bits(self.coefficients[1], 0.0, tolerance_bits)
            && approx_eq_bits(
                self.center_before[along],
                self.center_after[along],
                tolerance_bits,
            )
    }
}

/// Apply one shear from `src` to `dst`, both `width x height` RGB buffers.
///
/// The identity shear is a plain copy and never builds a kernel table.
///
/// # Errors
///
/// * `InvalidPixelData` if a buffer does not match the dimensions
/// * any error from [`KernelTable::build`]
pub fn apply_shear(
    src: &[f32],
    dst: &mut [f32],
    width: usize,
    height: usize,
    spec: &ShearSpec,
    config: &ResampleConfig,
) -> Result<(), ResampleError> {
    let expected = width * height * CHANNELS;
    for actual in [src.len(), dst.len()] {
        if actual != expected {
            return Err(ResampleError::InvalidPixelData { expected, actual });
        }
    }

    if spec.is_identity(config.tolerance_bits) {
        log::trace!("{:?} shear is the identity, copying", spec.axis);
        dst.copy_from_slice(src);
        return Ok(());
    }

    let table = KernelTable::build(
        &config.profile,
        spec.scale,
        config.taps,
        config.phase_bits,
        config.tolerance_bits,
    )?;
    log::trace!(
        "{:?} shear: coefficients {:?}, scale {:.4}, {} taps",
        spec.axis,
        spec.coefficients,
        spec.scale,
        2 * table.half_width() + 1
    );

    let shear = Convolution {
        src,
        width,
        height,
        spec,
        table: &table,
    };
    let row_len = width * CHANNELS;
    match spec.axis {
        Axis::Horizontal => for_each_row(dst, row_len, config.execution, |j, row| {
            shear.horizontal_row(j, row)
        }),
        Axis::Vertical => for_each_row(dst, row_len, config.execution, |j, row| {
            shear.vertical_row(j, row)
        }),
    }
    Ok(())
}

/// Run `f` on every destination row; returns once all rows are written.
fn for_each_row<F>(dst: &mut [f32], row_len: usize, execution: Execution, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    match execution {
        Execution::Parallel => dst
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(j, row)| f(j, row)),
        Execution::Serial => dst
            .chunks_mut(row_len)
            .enumerate()
            .for_each(|(j, row)| f(j, row)),
    }
}

/// Read-only state shared by every row of one shear.
struct Convolution<'a> {
    src: &'a [f32],
    width: usize,
    height: usize,
    spec: &'a ShearSpec,
    table: &'a KernelTable,
}

impl Convolution<'_> {
    /// Split a source coordinate into its integer tap and quantized phase.
    #[inline]
    fn split(&self, m: f64) -> (i64, usize) {
        let k = m.floor();
        let prec = self.table.phases();
        let p = ((prec as f64) * (m - k)).floor() as usize;
        (k as i64, p.min(prec - 1))
    }

    /// Weighted sum of the samples `at(u)` for `u` within `N` of `m`, clipped to
    /// `0..len`.
    #[inline]
    fn convolve(&self, m: f64, len: usize, at: impl Fn(usize) -> usize) -> [f32; CHANNELS] {
        let (k, p) = self.split(m);
        let n = self.table.half_width() as i64;
        let weights = self.table.phase(p);
        let lo = (k - n).max(0);
        let hi = (k + n).min(len as i64 - 1);

        let mut acc = [0.0f32; CHANNELS];
        for u in lo..=hi {
            let w = weights[(k - u + n) as usize];
            let idx = at(u as usize);
            for (c, a) in acc.iter_mut().enumerate() {
                *a += w * self.src[idx + c];
            }
        }
        acc
    }

    fn horizontal_row(&self, j: usize, row: &mut [f32]) {
        let [c0, c1] = self.spec.coefficients;
        let [xc_i, _] = self.spec.center_before;
        let [xc_f, yc_f] = self.spec.center_after;
        let (wf, hf) = (self.width as f64, self.height as f64);

        let across = c1 * (j as f64 + yc_f - hf / 2.0) - xc_i + wf / 2.0;
        let row_start = j * self.width * CHANNELS;
        for (i, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
            let m = c0 * (i as f64 + xc_f - wf / 2.0) + across;
            let value = self.convolve(m, self.width, |u| row_start + u * CHANNELS);
            px.copy_from_slice(&value);
        }
    }

    fn vertical_row(&self, j: usize, row: &mut [f32]) {
        let [c0, c1] = self.spec.coefficients;
        let [_, yc_i] = self.spec.center_before;
        let [xc_f, yc_f] = self.spec.center_after;
        let (wf, hf) = (self.width as f64, self.height as f64);

        let along = c0 * (j as f64 + yc_f - hf / 2.0) - yc_i + hf / 2.0;
        for (i, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
            let m = c1 * (i as f64 + xc_f - wf / 2.0) + along;
            let value = self.convolve(m, self.height, |u| (u * self.width + i) * CHANNELS);
            px.copy_from_slice(&value);
        }
    }
}
