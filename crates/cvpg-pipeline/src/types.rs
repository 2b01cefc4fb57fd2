//! Shared types for the cvpg transform pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Re-export `DynamicImage` so downstream crates can hold stage
/// inputs and outputs without depending on `image` directly.
pub use image::DynamicImage;

/// Re-export `GrayImage` for single-channel intermediates.
pub use image::GrayImage;

/// Re-export `RgbaImage`, the display format handed to hosts.
pub use image::RgbaImage;

/// Auxiliary payload threaded through a window alongside the image.
///
/// Stages may read values left by earlier stages and add their own
/// (e.g. the threshold Otsu picked, the number of edge pixels). Keys are
/// kept ordered so JSON dumps and info displays are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extra(BTreeMap<String, f64>);

impl Extra {
    /// Create an empty payload.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace a named value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(key.into(), value)
    }

    /// Look up a named value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    /// Returns `true` if no stage has recorded anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of recorded values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an image.
    #[must_use]
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Errors raised by params, windows, transforms and the pipeline.
///
/// The core layer does not recover from anything: every failure is
/// returned to the caller, which decides whether to log it and keep the
/// last good image.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A signed transform index from the host was negative.
    #[error("transform index must be >= 0, got {0}")]
    NegativeTransformIndex(i64),

    /// A transform index past the end of the window.
    #[error("transform index {index} out of range for window with {len} transforms")]
    TransformIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of transforms in the window.
        len: usize,
    },

    /// A window index past the end of the pipeline.
    #[error("window index {index} out of range for pipeline with {len} windows")]
    WindowIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of windows in the pipeline.
        len: usize,
    },

    /// The pipeline has no windows to run.
    #[error("pipeline has no windows")]
    EmptyPipeline,

    /// No built-in transform has the given name.
    #[error("unknown transform: {0}")]
    UnknownTransform(String),

    /// The transform has no param with the given name.
    #[error("transform {transform} has no param named {param}")]
    UnknownParam {
        /// Name of the transform that was searched.
        transform: String,
        /// Requested param name.
        param: String,
    },

    /// A value of the wrong variant was given for a param.
    #[error("param {param} expects a {expected} value")]
    ParamType {
        /// Param name.
        param: String,
        /// Human-readable name of the expected kind.
        expected: &'static str,
    },

    /// A value had the right variant but is not acceptable.
    #[error("invalid value for param {param}: {reason}")]
    InvalidParamValue {
        /// Param name.
        param: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The param is display-only.
    #[error("param {0} is read-only")]
    ReadOnlyParam(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extra_insert_and_get() {
        let mut extra = Extra::new();
        assert!(extra.is_empty());
        assert_eq!(extra.insert("threshold", 127.0), None);
        assert_eq!(extra.insert("threshold", 90.0), Some(127.0));
        assert_eq!(extra.get("threshold"), Some(90.0));
        assert_eq!(extra.get("missing"), None);
        assert_eq!(extra.len(), 1);
    }

    #[test]
    fn extra_iterates_in_key_order() {
        let mut extra = Extra::new();
        extra.insert("zeta", 1.0);
        extra.insert("alpha", 2.0);
        let keys: Vec<&str> = extra.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["alpha", "zeta"]);
    }

    #[test]
    fn extra_serializes_as_plain_map() {
        let mut extra = Extra::new();
        extra.insert("edge_pixels", 12.0);
        let json = serde_json::to_string(&extra).unwrap();
        assert_eq!(json, r#"{"edge_pixels":12.0}"#);
    }

    #[test]
    fn dimensions_of_image() {
        let img = DynamicImage::new_luma8(7, 3);
        let dims = Dimensions::of(&img);
        assert_eq!(
            dims,
            Dimensions {
                width: 7,
                height: 3
            }
        );
        assert_eq!(dims.pixel_count(), 21);
    }

    #[test]
    fn error_negative_index_display() {
        let err = PipelineError::NegativeTransformIndex(-2);
        assert_eq!(err.to_string(), "transform index must be >= 0, got -2");
    }

    #[test]
    fn error_unknown_param_display() {
        let err = PipelineError::UnknownParam {
            transform: "Threshold".to_string(),
            param: "sigma".to_string(),
        };
        assert_eq!(err.to_string(), "transform Threshold has no param named sigma");
    }

    #[test]
    fn error_empty_input_display() {
        assert_eq!(
            PipelineError::EmptyInput.to_string(),
            "input image data is empty"
        );
    }
}
