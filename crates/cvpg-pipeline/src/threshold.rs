//! Fixed-level and Otsu thresholding.
//!
//! Every rule compares with `src > thresh`, so a pixel equal to the
//! threshold counts as "below".

use std::fmt;
use std::str::FromStr;

use image::{DynamicImage, GrayImage, Luma};
use serde::{Deserialize, Serialize};

/// How pixels above and below the threshold are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThresholdType {
    /// `maxval` above, `0` otherwise.
    #[default]
    Binary,
    /// `0` above, `maxval` otherwise.
    BinaryInv,
    /// `thresh` above, unchanged otherwise.
    Trunc,
    /// Unchanged above, `0` otherwise.
    ToZero,
    /// `0` above, unchanged otherwise.
    ToZeroInv,
}

impl ThresholdType {
    /// All rules in display order.
    pub const ALL: [Self; 5] = [
        Self::Binary,
        Self::BinaryInv,
        Self::Trunc,
        Self::ToZero,
        Self::ToZeroInv,
    ];

    /// Name used in choice params.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "THRESH_BINARY",
            Self::BinaryInv => "THRESH_BINARY_INV",
            Self::Trunc => "THRESH_TRUNC",
            Self::ToZero => "THRESH_TOZERO",
            Self::ToZeroInv => "THRESH_TOZERO_INV",
        }
    }

    /// Rewrite one pixel value.
    #[must_use]
    pub const fn apply(self, value: u8, thresh: u8, maxval: u8) -> u8 {
        let above = value > thresh;
        match self {
            Self::Binary => {
                if above {
                    maxval
                } else {
                    0
                }
            }
            Self::BinaryInv => {
                if above {
                    0
                } else {
                    maxval
                }
            }
            Self::Trunc => {
                if above {
                    thresh
                } else {
                    value
                }
            }
            Self::ToZero => {
                if above {
                    value
                } else {
                    0
                }
            }
            Self::ToZeroInv => {
                if above {
                    0
                } else {
                    value
                }
            }
        }
    }
}

impl fmt::Display for ThresholdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ThresholdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("unknown threshold type: {s}"))
    }
}

/// Threshold a grayscale image.
///
/// Color input is reduced to grayscale first. When `use_otsu` is set
/// the threshold is picked from the image histogram and `thresh` is
/// ignored. Returns the thresholded image and the threshold actually
/// used.
#[must_use = "returns the thresholded image"]
pub fn threshold(
    image: &DynamicImage,
    thresh: u8,
    maxval: u8,
    kind: ThresholdType,
    use_otsu: bool,
) -> (GrayImage, u8) {
    let gray = image.to_luma8();
    let level = if use_otsu {
        imageproc::contrast::otsu_level(&gray)
    } else {
        thresh
    };
    let out = GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([kind.apply(gray.get_pixel(x, y).0[0], level, maxval)])
    });
    (out, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_threshold_single_bright_pixel() {
        let mut gray = GrayImage::from_pixel(8, 8, Luma([127]));
        gray.put_pixel(3, 5, Luma([200]));
        let (out, level) = threshold(
            &DynamicImage::ImageLuma8(gray),
            150,
            255,
            ThresholdType::Binary,
            false,
        );
        assert_eq!(level, 150);
        for (x, y, p) in out.enumerate_pixels() {
            let expected = if (x, y) == (3, 5) { 255 } else { 0 };
            assert_eq!(p.0[0], expected, "pixel ({x},{y})");
        }
    }

    #[test]
    fn equal_to_threshold_counts_as_below() {
        assert_eq!(ThresholdType::Binary.apply(150, 150, 255), 0);
        assert_eq!(ThresholdType::Binary.apply(151, 150, 255), 255);
    }

    #[test]
    fn each_rule() {
        let cases = [
            (ThresholdType::Binary, [0, 200]),
            (ThresholdType::BinaryInv, [200, 0]),
            (ThresholdType::Trunc, [100, 150]),
            (ThresholdType::ToZero, [0, 180]),
            (ThresholdType::ToZeroInv, [100, 0]),
        ];
        for (kind, [below, above]) in cases {
            assert_eq!(kind.apply(100, 150, 200), below, "{kind} below");
            assert_eq!(kind.apply(180, 150, 200), above, "{kind} above");
        }
    }

    #[test]
    fn otsu_splits_bimodal_image() {
        let gray = GrayImage::from_fn(10, 10, |x, _| Luma([if x < 5 { 20 } else { 220 }]));
        let (out, level) = threshold(
            &DynamicImage::ImageLuma8(gray),
            0,
            255,
            ThresholdType::Binary,
            true,
        );
        assert!((20..220).contains(&level), "otsu level {level}");
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(9, 0).0[0], 255);
    }

    #[test]
    fn names_round_trip() {
        for kind in ThresholdType::ALL {
            assert_eq!(kind.name().parse::<ThresholdType>(), Ok(kind));
        }
        assert!("THRESH_OTSU".parse::<ThresholdType>().is_err());
    }
}
