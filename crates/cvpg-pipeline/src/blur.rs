//! Box and Gaussian blur over gray or color images.
//!
//! `imageproc`'s filters only accept `GrayImage`, so color images are
//! split into channels, filtered independently and reassembled by
//! [`map_channels`]. Both filters are linear and per-channel, so the
//! result matches filtering in color space.
//!
//! Both filters extend the border by repeating the edge pixel
//! (`aaa|abcdefgh|hhh`). This differs from [`filter2d`](crate::filter2d),
//! which reflects without repeating it, so a blur and an equivalent
//! averaging kernel passed to `Filter2D` can disagree along the edges.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Pixel};

/// Apply a per-channel grayscale filter to any image.
///
/// 8-bit gray, gray+alpha, RGB and RGBA images keep their layout. Deeper
/// formats are converted to 8-bit RGBA first.
pub(crate) fn map_channels(
    image: &DynamicImage,
    filter: impl Fn(&GrayImage) -> GrayImage,
) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(filter(gray)),
        DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(map_buffer(buf, &filter)),
        DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(map_buffer(buf, &filter)),
        DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(map_buffer(buf, &filter)),
        other => DynamicImage::ImageRgba8(map_buffer(&other.to_rgba8(), &filter)),
    }
}

fn map_buffer<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    filter: &impl Fn(&GrayImage) -> GrayImage,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = image.dimensions();

    // Split into one grayscale image per channel and filter each.
    let filtered: Vec<GrayImage> = (0..usize::from(P::CHANNEL_COUNT))
        .map(|c| {
            let channel =
                GrayImage::from_fn(w, h, |x, y| Luma([image.get_pixel(x, y).channels()[c]]));
            filter(&channel)
        })
        .collect();

    // Reassemble.
    let mut out = ImageBuffer::<P, Vec<u8>>::new(w, h);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        for (c, channel) in filtered.iter().enumerate() {
            pixel.channels_mut()[c] = channel.get_pixel(x, y).0[0];
        }
    }
    out
}

/// Normalized box filter with a `(width, height)` kernel.
///
/// The kernel is centered on each pixel, so even sizes behave like the
/// next odd size up. A 1×1 kernel returns the image unchanged.
#[must_use = "returns the blurred image"]
pub fn box_blur(image: &DynamicImage, ksize: (u32, u32)) -> DynamicImage {
    let x_radius = ksize.0 / 2;
    let y_radius = ksize.1 / 2;
    if x_radius == 0 && y_radius == 0 {
        return image.clone();
    }
    map_channels(image, |channel| {
        imageproc::filter::box_filter(channel, x_radius, y_radius)
    })
}

/// Sigma implied by a kernel side when none is given.
///
/// Matches the usual `0.3 * ((k - 1) * 0.5 - 1) + 0.8` rule for
/// Gaussian kernels sized from their aperture.
#[must_use]
pub fn sigma_for_kernel(ksize: u32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let k = ksize.max(1) as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Round an even kernel side up to the next odd one.
const fn odd_side(side: u32) -> u32 {
    side | 1
}

/// Normalized 1-D Gaussian weights for a kernel of exactly `len` taps.
///
/// `len` must be odd. A non-positive `sigma` is derived from `len` via
/// [`sigma_for_kernel`].
#[must_use]
pub fn gaussian_kernel(len: u32, sigma: f32) -> Vec<f32> {
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        sigma_for_kernel(len)
    };
    #[allow(clippy::cast_precision_loss)]
    let radius = (len / 2) as f32;
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (0..len)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let d = i as f32 - radius;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Apply Gaussian blur with a `(width, height)` kernel.
///
/// Even sides are rounded up to odd. Each side's weights come from
/// `sigma`; a non-positive sigma is derived per side with
/// [`sigma_for_kernel`]. A 1×1 kernel returns the image unchanged.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &DynamicImage, ksize: (u32, u32), sigma: f32) -> DynamicImage {
    let (w, h) = (odd_side(ksize.0), odd_side(ksize.1));
    if w == 1 && h == 1 {
        return image.clone();
    }
    let h_kernel = gaussian_kernel(w, sigma);
    let v_kernel = gaussian_kernel(h, sigma);
    map_channels(image, |channel| {
        let rows = imageproc::filter::horizontal_filter(channel, &h_kernel);
        imageproc::filter::vertical_filter(&rows, &v_kernel)
    })
}
