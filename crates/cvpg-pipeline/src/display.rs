//! Conversion of stage outputs into the RGBA buffers hosts display or
//! save.
//!
//! 16-bit samples keep their high byte. Float samples are clamped to
//! `[0, 1]` and scaled by 255. Gray is replicated across RGB and a
//! missing alpha channel becomes opaque.

use image::{DynamicImage, Rgba, RgbaImage};

fn from_u16(v: u16) -> u8 {
    v.to_be_bytes()[0]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_f32(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert any stage output to 8-bit RGBA.
#[must_use = "returns the display image"]
pub fn to_display_rgba(image: &DynamicImage) -> RgbaImage {
    let (w, h) = (image.width(), image.height());
    match image {
        DynamicImage::ImageLuma16(buf) => RgbaImage::from_fn(w, h, |x, y| {
            let v = from_u16(buf.get_pixel(x, y).0[0]);
            Rgba([v, v, v, 255])
        }),
        DynamicImage::ImageLumaA16(buf) => RgbaImage::from_fn(w, h, |x, y| {
            let [v, a] = buf.get_pixel(x, y).0.map(from_u16);
            Rgba([v, v, v, a])
        }),
        DynamicImage::ImageRgb16(buf) => RgbaImage::from_fn(w, h, |x, y| {
            let [r, g, b] = buf.get_pixel(x, y).0.map(from_u16);
            Rgba([r, g, b, 255])
        }),
        DynamicImage::ImageRgba16(buf) => {
            RgbaImage::from_fn(w, h, |x, y| Rgba(buf.get_pixel(x, y).0.map(from_u16)))
        }
        DynamicImage::ImageRgb32F(buf) => RgbaImage::from_fn(w, h, |x, y| {
            let [r, g, b] = buf.get_pixel(x, y).0.map(from_f32);
            Rgba([r, g, b, 255])
        }),
        DynamicImage::ImageRgba32F(buf) => {
            RgbaImage::from_fn(w, h, |x, y| Rgba(buf.get_pixel(x, y).0.map(from_f32)))
        }
        // 8-bit layouts expand losslessly.
        other => other.to_rgba8(),
    }
}
