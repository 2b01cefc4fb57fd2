//! Arbitrary 2-D kernel correlation.
//!
//! The kernel is applied as a correlation (not flipped), borders are
//! extended by reflection without repeating the edge pixel
//! (`gfedcb|abcdefgh|gfedcba`), and results are rounded and saturated
//! to `u8`.

use image::{DynamicImage, GrayImage, Luma};

use crate::blur::map_channels;
use crate::types::PipelineError;

/// A validated row-major kernel with its anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    width: usize,
    height: usize,
    weights: Vec<f64>,
    anchor: (usize, usize),
}

impl Kernel {
    /// Build a kernel from rows. An anchor coordinate of `-1` means the
    /// kernel centre on that axis.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParamValue`] if `rows` is empty or
    /// ragged, or if the anchor lies outside the kernel.
    pub fn new(rows: &[Vec<f64>], anchor: (i64, i64)) -> Result<Self, PipelineError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 || rows.iter().any(|r| r.len() != width) {
            return Err(PipelineError::InvalidParamValue {
                param: "kernel".to_string(),
                reason: "kernel must be a non-empty rectangular array".to_string(),
            });
        }
        let resolve = |coord: i64, len: usize| -> Option<usize> {
            if coord == -1 {
                Some(len / 2)
            } else {
                usize::try_from(coord).ok().filter(|&c| c < len)
            }
        };
        let anchor = resolve(anchor.0, width)
            .zip(resolve(anchor.1, height))
            .ok_or_else(|| PipelineError::InvalidParamValue {
                param: "anchor".to_string(),
                reason: format!(
                    "({}, {}) is outside the {width}x{height} kernel",
                    anchor.0, anchor.1
                ),
            })?;
        Ok(Self {
            width,
            height,
            weights: rows.iter().flatten().copied().collect(),
            anchor,
        })
    }

    /// `(width, height)` of the kernel.
    #[must_use]
    pub const fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Resolved `(x, y)` anchor.
    #[must_use]
    pub const fn anchor(&self) -> (usize, usize) {
        self.anchor
    }
}

/// Map a possibly out-of-range coordinate back into `0..len` by
/// reflect-101.
fn reflect_101(i: i64, len: i64) -> i64 {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let i = i.rem_euclid(period);
    if i < len { i } else { period - i }
}

fn correlate(channel: &GrayImage, kernel: &Kernel, delta: f64) -> GrayImage {
    let (w, h) = (i64::from(channel.width()), i64::from(channel.height()));
    #[allow(clippy::cast_possible_wrap)]
    let (ax, ay) = (kernel.anchor.0 as i64, kernel.anchor.1 as i64);
    GrayImage::from_fn(channel.width(), channel.height(), |x, y| {
        let mut acc = delta;
        for (ky, row) in kernel.weights.chunks(kernel.width).enumerate() {
            #[allow(clippy::cast_possible_wrap)]
            let sy = reflect_101(i64::from(y) + ky as i64 - ay, h);
            for (kx, &weight) in row.iter().enumerate() {
                #[allow(clippy::cast_possible_wrap)]
                let sx = reflect_101(i64::from(x) + kx as i64 - ax, w);
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                let sample = channel.get_pixel(sx as u32, sy as u32).0[0];
                acc += weight * f64::from(sample);
            }
        }
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let out = acc.round().clamp(0.0, 255.0) as u8;
        Luma([out])
    })
}

/// Correlate every channel of `image` with `kernel` and add `delta`.
#[must_use = "returns the filtered image"]
pub fn filter2d(image: &DynamicImage, kernel: &Kernel, delta: f64) -> DynamicImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }
    map_channels(image, |channel| correlate(channel, kernel, delta))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sharpen() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, -1.0, 0.0],
            vec![-1.0, 5.0, -1.0],
            vec![0.0, -1.0, 0.0],
        ]
    }

    fn ramp() -> GrayImage {
        GrayImage::from_fn(5, 4, |x, y| Luma([u8::try_from(x * 40 + y * 10).unwrap()]))
    }

    #[test]
    fn identity_kernel_is_identity() {
        let kernel = Kernel::new(&[vec![1.0]], (-1, -1)).unwrap();
        let img = DynamicImage::ImageLuma8(ramp());
        assert_eq!(filter2d(&img, &kernel, 0.0), img);
    }

    #[test]
    fn sharpen_leaves_uniform_image_unchanged() {
        let kernel = Kernel::new(&sharpen(), (-1, -1)).unwrap();
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(6, 6, Luma([90])));
        assert_eq!(filter2d(&img, &kernel, 0.0), img);
    }

    #[test]
    fn delta_is_added_and_saturates() {
        let kernel = Kernel::new(&[vec![1.0]], (-1, -1)).unwrap();
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([250])));
        let out = filter2d(&img, &kernel, 20.0).to_luma8();
        assert!(out.pixels().all(|p| p.0[0] == 255));
        let out = filter2d(&img, &kernel, -300.0).to_luma8();
        assert!(out.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn shift_kernel_reflects_at_border() {
        // Picks the left neighbour; at x = 0 reflect-101 reads x = 1.
        let kernel = Kernel::new(&[vec![1.0, 0.0, 0.0]], (-1, -1)).unwrap();
        let row = GrayImage::from_fn(4, 1, |x, _| Luma([[10, 20, 30, 40][x as usize]]));
        let out = filter2d(&DynamicImage::ImageLuma8(row), &kernel, 0.0).to_luma8();
        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, [20, 10, 20, 30]);
    }

    #[test]
    fn explicit_anchor_moves_the_kernel() {
        // Anchor at the last tap: output(x) = input(x - 2).
        let kernel = Kernel::new(&[vec![1.0, 0.0, 0.0]], (2, 0)).unwrap();
        let row = GrayImage::from_fn(4, 1, |x, _| Luma([[10, 20, 30, 40][x as usize]]));
        let out = filter2d(&DynamicImage::ImageLuma8(row), &kernel, 0.0).to_luma8();
        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, [30, 20, 10, 20]);
    }

    #[test]
    fn color_layout_is_preserved() {
        let kernel = Kernel::new(&sharpen(), (-1, -1)).unwrap();
        let img = DynamicImage::new_rgb8(4, 4);
        assert!(matches!(
            filter2d(&img, &kernel, 0.0),
            DynamicImage::ImageRgb8(_)
        ));
    }

    #[test]
    fn anchor_outside_kernel_is_rejected() {
        let err = Kernel::new(&sharpen(), (3, 0)).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidParamValue { ref param, .. } if param == "anchor"
        ));
        assert!(Kernel::new(&sharpen(), (-2, 0)).is_err());
    }

    #[test]
    fn ragged_kernel_is_rejected() {
        assert!(Kernel::new(&[vec![1.0, 2.0], vec![3.0]], (-1, -1)).is_err());
        assert!(Kernel::new(&[], (-1, -1)).is_err());
    }

    #[test]
    fn reflect_101_indices() {
        let mapped: Vec<i64> = (-3..7).map(|i| reflect_101(i, 4)).collect();
        assert_eq!(mapped, [3, 2, 1, 0, 1, 2, 3, 2, 1, 0]);
        assert_eq!(reflect_101(-5, 1), 0);
    }
}
