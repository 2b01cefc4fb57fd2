//! Canny edge detection.
//!
//! Wraps [`imageproc::edges::canny`]. Color input is reduced to
//! grayscale first. The result is a binary image where white pixels
//! (255) are edges and black pixels (0) are background.

use image::{DynamicImage, GrayImage};

/// Minimum allowed Canny threshold.
///
/// A low threshold of zero marks every pixel with any gradient as a
/// potential edge, so hysteresis fills flat noise into a dense edge map.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Clamp a `(low, high)` threshold pair into the range Canny accepts.
///
/// A reversed pair is swapped, then both are raised to at least
/// [`MIN_THRESHOLD`].
#[must_use]
pub fn clamp_thresholds(low: f32, high: f32) -> (f32, f32) {
    (
        low.min(high).max(MIN_THRESHOLD),
        low.max(high).max(MIN_THRESHOLD),
    )
}

/// Detect edges using the Canny algorithm.
///
/// Pixels with gradient magnitude above `high_threshold` are definite
/// edges; those between the thresholds are edges only if connected to a
/// definite edge. The thresholds are clamped with [`clamp_thresholds`],
/// so callers may pass them in either order.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &DynamicImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let (low, high) = clamp_thresholds(low_threshold, high_threshold);
    let gray = match image {
        DynamicImage::ImageLuma8(gray) => std::borrow::Cow::Borrowed(gray),
        other => std::borrow::Cow::Owned(other.to_luma8()),
    };
    imageproc::edges::canny(&gray, low, high)
}

/// Count edge pixels (value 255) in a binary edge map.
#[must_use]
pub fn count_edge_pixels(edges: &GrayImage) -> u64 {
    edges.pixels().map(|p| u64::from(p.0[0] == 255)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x20 image with a sharp vertical boundary at x = 10.
    fn sharp_edge_image() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(20, 20, |x, _y| {
            if x < 10 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        }))
    }

    #[test]
    fn blank_image_produces_no_edges() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(20, 20, |_, _| image::Luma([128])));
        let edges = canny(&img, 50.0, 150.0);
        assert_eq!(edges.dimensions(), (20, 20));
        assert_eq!(count_edge_pixels(&edges), 0, "expected no edges in uniform image");
    }

    #[test]
    fn sharp_edge_detected() {
        let edges = canny(&sharp_edge_image(), 50.0, 150.0);
        assert!(
            count_edge_pixels(&edges) > 0,
            "expected edges at sharp boundary, found none"
        );
    }

    #[test]
    fn color_input_is_reduced_to_gray() {
        let color = DynamicImage::ImageRgb8(sharp_edge_image().to_rgb8());
        assert_eq!(
            canny(&color, 50.0, 150.0),
            canny(&sharp_edge_image(), 50.0, 150.0)
        );
    }

    #[test]
    fn zero_low_threshold_is_clamped_to_min() {
        let img = sharp_edge_image();
        assert_eq!(canny(&img, 0.0, 150.0), canny(&img, MIN_THRESHOLD, 150.0));
    }

    #[test]
    fn reversed_thresholds_are_swapped() {
        let ramp = DynamicImage::ImageLuma8(GrayImage::from_fn(40, 40, |x, y| {
            image::Luma([u8::try_from((x * 6 + y * 3) % 256).unwrap_or(0)])
        }));
        for img in [sharp_edge_image(), ramp] {
            assert_eq!(canny(&img, 40.0, 400.0), canny(&img, 400.0, 40.0));
        }
    }

    #[test]
    fn clamp_thresholds_orders_pair() {
        assert_eq!(clamp_thresholds(0.0, 0.0), (1.0, 1.0));
        assert_eq!(clamp_thresholds(300.0, 200.0), (200.0, 300.0));
        assert_eq!(clamp_thresholds(50.0, 150.0), (50.0, 150.0));
        assert_eq!(clamp_thresholds(150.0, 0.0), (1.0, 150.0));
    }
}
