//! Per-channel inclusive range masking.

use image::{DynamicImage, GrayImage, Luma};

/// Build a binary mask of pixels whose channels all lie inside their
/// inclusive `[low, high]` range.
///
/// Gray input is tested against `ranges[0]` only; anything else is
/// compared in RGB. A range with `low > high` matches nothing. Mask
/// pixels are 255 inside and 0 outside.
#[must_use = "returns the mask"]
pub fn in_range(image: &DynamicImage, ranges: &[(u8, u8); 3]) -> GrayImage {
    let inside = |value: u8, (low, high): (u8, u8)| low <= value && value <= high;
    match image {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => {
            let gray = image.to_luma8();
            GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                let hit = inside(gray.get_pixel(x, y).0[0], ranges[0]);
                Luma([if hit { 255 } else { 0 }])
            })
        }
        _ => {
            let rgb = image.to_rgb8();
            GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                let pixel = rgb.get_pixel(x, y).0;
                let hit = pixel.iter().zip(ranges).all(|(&v, &r)| inside(v, r));
                Luma([if hit { 255 } else { 0 }])
            })
        }
    }
}

/// Fraction of mask pixels that are set, in `[0, 1]`. Empty masks give 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn coverage(mask: &GrayImage) -> f64 {
    let total = u64::from(mask.width()) * u64::from(mask.height());
    if total == 0 {
        return 0.0;
    }
    let set = mask.pixels().filter(|p| p.0[0] != 0).count() as u64;
    set as f64 / total as f64
}
