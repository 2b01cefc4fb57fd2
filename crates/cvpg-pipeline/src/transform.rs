//! Transform stages: one image operation plus its editable params.
//!
//! This module defines the [`TransformOp`] trait for pluggable image
//! operations and the [`TransformKind`] enum listing the built-in ones.
//!
//! # Strategy pattern
//!
//! A [`Transform`] pairs an operation with the [`Params`] it reads. The
//! operation itself is stateless: it receives the params on every call,
//! so the same kind can back any number of transforms. Hosts that need
//! something the built-ins do not cover implement [`TransformOp`] and
//! wrap it with [`Transform::new`].

use std::fmt;

use image::DynamicImage;

use crate::blur;
use crate::edge;
use crate::filter2d::{self, Kernel};
use crate::in_range;
use crate::param::{Param, Params};
use crate::threshold::{self, ThresholdType};
use crate::types::{Extra, PipelineError};

/// An image operation a [`Transform`] runs.
pub trait TransformOp: fmt::Debug {
    /// Name shown to the user and used to look the operation up.
    fn name(&self) -> &str;

    /// Params a fresh transform of this kind starts with.
    fn default_params(&self) -> Vec<Param>;

    /// Map `(image, extra)` to the next pair using `params`.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when a param is missing, has the
    /// wrong type or holds a value the operation cannot use.
    fn apply(
        &self,
        params: &Params,
        image: DynamicImage,
        extra: Extra,
    ) -> Result<(DynamicImage, Extra), PipelineError>;
}

/// Built-in image operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    /// Normalized box filter.
    Blur,
    /// Gaussian smoothing.
    GaussianBlur,
    /// Canny edge detection.
    Canny,
    /// Fixed-level or Otsu thresholding.
    Threshold,
    /// Per-channel range mask.
    InRange,
    /// Custom kernel correlation.
    Filter2D,
}

impl TransformKind {
    /// Every built-in, in catalogue order.
    pub const ALL: [Self; 6] = [
        Self::Blur,
        Self::GaussianBlur,
        Self::Canny,
        Self::Threshold,
        Self::InRange,
        Self::Filter2D,
    ];

    /// Catalogue name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Blur => "Blur",
            Self::GaussianBlur => "GaussianBlur",
            Self::Canny => "Canny",
            Self::Threshold => "Threshold",
            Self::InRange => "InRange",
            Self::Filter2D => "Filter2D",
        }
    }

    /// One-line summary for listings.
    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Self::Blur => "Blurs an image using the normalized box filter",
            Self::GaussianBlur => "Blurs an image using a Gaussian filter",
            Self::Canny => "Finds edges in an image using the Canny algorithm",
            Self::Threshold => "Applies a fixed-level threshold to each pixel",
            Self::InRange => "Checks if pixels lie between per-channel bounds",
            Self::Filter2D => "Convolves an image with a custom kernel",
        }
    }

    /// Look a built-in up by name, ignoring ASCII case.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownTransform`] if no built-in has
    /// that name.
    pub fn from_name(name: &str) -> Result<Self, PipelineError> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| PipelineError::UnknownTransform(name.to_string()))
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// All built-in transform kinds, in catalogue order.
#[must_use]
pub fn collect_builtin_transforms() -> Vec<TransformKind> {
    TransformKind::ALL.to_vec()
}

fn to_u8(value: i64) -> u8 {
    u8::try_from(value.clamp(0, 255)).unwrap_or(u8::MAX)
}

fn channel_range(params: &Params, name: &str) -> Result<(u8, u8), PipelineError> {
    let (low, high) = params.int_pair(name)?;
    Ok((to_u8(low), to_u8(high)))
}

impl TransformOp for TransformKind {
    fn name(&self) -> &str {
        TransformKind::name(*self)
    }

    fn default_params(&self) -> Vec<Param> {
        match *self {
            Self::Blur => vec![
                Param::kernel_size("ksize", (5, 5), 1, 99).with_help_text("Blurring kernel size"),
            ],
            Self::GaussianBlur => vec![
                Param::kernel_size("ksize", (5, 5), 1, 99).with_help_text("Gaussian kernel size"),
                Param::float_slider("sigma_x", 1.0, 0.0, 10.0, 0.1).with_help_text(
                    "Gaussian standard deviation; 0 derives it from the kernel size",
                ),
            ],
            Self::Canny => vec![
                Param::int_slider("threshold1", 100, 0, 500)
                    .with_help_text("First threshold for the hysteresis procedure"),
                Param::int_slider("threshold2", 200, 0, 500)
                    .with_help_text("Second threshold for the hysteresis procedure"),
            ],
            Self::Threshold => {
                let types: Vec<&str> = ThresholdType::ALL.iter().map(|t| t.name()).collect();
                vec![
                    Param::int_slider("thresh", 127, 0, 255).with_help_text("Threshold value"),
                    Param::int_slider("maxval", 255, 0, 255)
                        .with_help_text("Value used by the binary threshold types"),
                    Param::choice("threshold_type", ThresholdType::Binary.name(), &types),
                    Param::boolean("use_otsu", false)
                        .with_help_text("Pick the threshold from the image histogram"),
                ]
            }
            Self::InRange => (0..3)
                .map(|c| {
                    Param::int_pair_slider(format!("channel_{c}"), (0, 255), 0, 255)
                        .with_help_text(format!("Inclusive bounds for channel {c}"))
                })
                .collect(),
            Self::Filter2D => vec![
                Param::array_2d(
                    "kernel",
                    vec![
                        vec![0.0, -1.0, 0.0],
                        vec![-1.0, 5.0, -1.0],
                        vec![0.0, -1.0, 0.0],
                    ],
                    true,
                )
                .with_help_text("Correlation kernel, rows separated by ';'"),
                Param::point("anchor", (-1, -1))
                    .with_help_text("Anchor within the kernel; -1 means the centre"),
                Param::float_slider("delta", 0.0, -255.0, 255.0, 1.0)
                    .with_help_text("Value added to each filtered pixel"),
            ],
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn apply(
        &self,
        params: &Params,
        image: DynamicImage,
        mut extra: Extra,
    ) -> Result<(DynamicImage, Extra), PipelineError> {
        let out = match *self {
            Self::Blur => blur::box_blur(&image, params.kernel_size("ksize")?),
            Self::GaussianBlur => blur::gaussian_blur(
                &image,
                params.kernel_size("ksize")?,
                params.float("sigma_x")? as f32,
            ),
            Self::Canny => {
                let edges = edge::canny(
                    &image,
                    params.int("threshold1")? as f32,
                    params.int("threshold2")? as f32,
                );
                extra.insert("edge_pixels", edge::count_edge_pixels(&edges) as f64);
                DynamicImage::ImageLuma8(edges)
            }
            Self::Threshold => {
                let kind: ThresholdType =
                    params.choice("threshold_type")?.parse().map_err(|reason| {
                        PipelineError::InvalidParamValue {
                            param: "threshold_type".to_string(),
                            reason,
                        }
                    })?;
                let (out, level) = threshold::threshold(
                    &image,
                    to_u8(params.int("thresh")?),
                    to_u8(params.int("maxval")?),
                    kind,
                    params.bool("use_otsu")?,
                );
                extra.insert("threshold", f64::from(level));
                DynamicImage::ImageLuma8(out)
            }
            Self::InRange => {
                let ranges = [
                    channel_range(params, "channel_0")?,
                    channel_range(params, "channel_1")?,
                    channel_range(params, "channel_2")?,
                ];
                let mask = in_range::in_range(&image, &ranges);
                extra.insert("mask_coverage", in_range::coverage(&mask));
                DynamicImage::ImageLuma8(mask)
            }
            Self::Filter2D => {
                let kernel = Kernel::new(params.array_2d("kernel")?, params.point("anchor")?)?;
                filter2d::filter2d(&image, &kernel, params.float("delta")?)
            }
        };
        Ok((out, extra))
    }
}

/// One stage of a window: an operation and its params.
#[derive(Debug)]
pub struct Transform {
    op: Box<dyn TransformOp>,
    params: Params,
}

impl Transform {
    /// Wrap an operation, starting from its default params.
    #[must_use]
    pub fn new(op: impl TransformOp + 'static) -> Self {
        let params = Params::new(op.name(), op.default_params());
        Self {
            op: Box::new(op),
            params,
        }
    }

    /// A built-in transform.
    #[must_use]
    pub fn builtin(kind: TransformKind) -> Self {
        Self::new(kind)
    }

    /// Name of the wrapped operation.
    #[must_use]
    pub fn name(&self) -> &str {
        self.op.name()
    }

    /// The transform's params.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// The transform's params, for editing.
    pub const fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// File the host would show as this transform's documentation.
    #[must_use]
    pub fn doc_filename(&self) -> String {
        format!("{}.html", self.name())
    }

    /// Run the operation on one `(image, extra)` pair.
    ///
    /// # Errors
    ///
    /// Whatever the operation returns.
    pub fn draw(
        &self,
        image: DynamicImage,
        extra: Extra,
    ) -> Result<(DynamicImage, Extra), PipelineError> {
        self.op.apply(&self.params, image, extra)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::param::ParamValue;

    fn gradient() -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(24, 16, |x, y| {
            image::Rgb([
                u8::try_from(x * 10).unwrap(),
                u8::try_from(y * 15).unwrap(),
                128,
            ])
        }))
    }

    #[test]
    fn every_builtin_runs_with_defaults() {
        for kind in collect_builtin_transforms() {
            let t = Transform::builtin(kind);
            let (out, _) = t.draw(gradient(), Extra::new()).unwrap();
            assert_eq!((out.width(), out.height()), (24, 16), "{kind}");
        }
    }

    #[test]
    fn from_name_ignores_case() {
        assert_eq!(
            TransformKind::from_name("gaussianblur").unwrap(),
            TransformKind::GaussianBlur
        );
        assert!(matches!(
            TransformKind::from_name("Sobel"),
            Err(PipelineError::UnknownTransform(ref n)) if n == "Sobel"
        ));
    }

    #[test]
    fn builtin_names_are_unique() {
        let mut names: Vec<&str> = TransformKind::ALL
            .into_iter()
            .map(TransformKind::name)
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TransformKind::ALL.len());
    }

    #[test]
    fn threshold_transform_marks_single_bright_pixel() {
        let mut t = Transform::builtin(TransformKind::Threshold);
        t.params_mut()
            .get_mut("thresh")
            .unwrap()
            .store_value(Some(ParamValue::Int(150)))
            .unwrap();
        let mut gray = GrayImage::from_pixel(6, 6, Luma([127]));
        gray.put_pixel(2, 4, Luma([200]));
        let (out, extra) = t
            .draw(DynamicImage::ImageLuma8(gray), Extra::new())
            .unwrap();
        let out = out.to_luma8();
        for (x, y, p) in out.enumerate_pixels() {
            let expected = if (x, y) == (2, 4) { 255 } else { 0 };
            assert_eq!(p.0[0], expected);
        }
        assert_eq!(extra.get("threshold"), Some(150.0));
    }

    #[test]
    fn canny_and_in_range_record_extra() {
        let (_, extra) = Transform::builtin(TransformKind::Canny)
            .draw(gradient(), Extra::new())
            .unwrap();
        assert!(extra.get("edge_pixels").is_some());

        let (_, extra) = Transform::builtin(TransformKind::InRange)
            .draw(gradient(), Extra::new())
            .unwrap();
        assert_eq!(extra.get("mask_coverage"), Some(1.0));
    }

    fn step_image() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(40, 40, |x, _| {
            Luma([if x < 20 { 0 } else { 255 }])
        }))
    }

    fn draw_with(kind: TransformKind, edits: &[(&str, &str)]) -> (DynamicImage, Extra) {
        let mut t = Transform::builtin(kind);
        for (name, text) in edits {
            t.params_mut().get_mut(name).unwrap().store_text(text).unwrap();
        }
        t.draw(step_image(), Extra::new()).unwrap()
    }

    #[test]
    fn gaussian_ksize_changes_output_at_default_sigma() {
        let (small, _) = draw_with(TransformKind::GaussianBlur, &[("ksize", "3x3")]);
        let (large, _) = draw_with(TransformKind::GaussianBlur, &[("ksize", "31x31")]);
        assert_ne!(small, large);
    }

    #[test]
    fn canny_threshold_order_does_not_matter() {
        let (forward, forward_extra) = draw_with(
            TransformKind::Canny,
            &[("threshold1", "40"), ("threshold2", "400")],
        );
        let (reversed, reversed_extra) = draw_with(
            TransformKind::Canny,
            &[("threshold1", "400"), ("threshold2", "40")],
        );
        assert_eq!(forward, reversed);
        assert_eq!(
            forward_extra.get("edge_pixels"),
            reversed_extra.get("edge_pixels")
        );
    }

    #[test]
    fn extra_from_earlier_stages_is_kept() {
        let mut extra = Extra::new();
        extra.insert("upstream", 3.0);
        let (_, extra) = Transform::builtin(TransformKind::Threshold)
            .draw(gradient(), extra)
            .unwrap();
        assert_eq!(extra.get("upstream"), Some(3.0));
        assert!(extra.get("threshold").is_some());
    }

    #[test]
    fn bad_anchor_surfaces_as_error() {
        let mut t = Transform::builtin(TransformKind::Filter2D);
        t.params_mut()
            .get_mut("anchor")
            .unwrap()
            .store_value(Some(ParamValue::Point(5, 5)))
            .unwrap();
        assert!(matches!(
            t.draw(gradient(), Extra::new()),
            Err(PipelineError::InvalidParamValue { .. })
        ));
    }

    #[test]
    fn params_are_owned_by_transform_name() {
        let t = Transform::builtin(TransformKind::InRange);
        assert_eq!(t.params().owner(), "InRange");
        let names: Vec<&str> = t.params().iter().map(Param::name).collect();
        assert_eq!(names, ["channel_0", "channel_1", "channel_2"]);
        assert_eq!(t.doc_filename(), "InRange.html");
    }

    #[derive(Debug)]
    struct Invert;

    impl TransformOp for Invert {
        fn name(&self) -> &str {
            "Invert"
        }

        fn default_params(&self) -> Vec<Param> {
            Vec::new()
        }

        fn apply(
            &self,
            _params: &Params,
            mut image: DynamicImage,
            extra: Extra,
        ) -> Result<(DynamicImage, Extra), PipelineError> {
            image.invert();
            Ok((image, extra))
        }
    }

    #[test]
    fn custom_operation_can_be_wrapped() {
        let t = Transform::new(Invert);
        assert_eq!(t.name(), "Invert");
        assert!(t.params().is_empty());
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([10])));
        let (out, _) = t.draw(img, Extra::new()).unwrap();
        assert_eq!(out.to_luma8().get_pixel(0, 0).0[0], 245);
    }
}
