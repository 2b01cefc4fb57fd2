//! Editable, typed transform parameters.
//!
//! A [`Param`] pairs a [`ParamKind`] (which UI control it is, with its
//! bounds or choices) with a default [`ParamValue`] and the value the
//! user last stored. The kind set is sealed: hosts dispatch on the kind
//! tag to pick a widget, and transforms read values through the typed
//! getters on [`Params`].
//!
//! Params hold no reference to the transform or pipeline that owns
//! them. Storing a value only validates and records it; restarting the
//! pipeline is driven by the [`ParamChange`](crate::ParamChange)
//! notification the owning window returns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError};

/// Which control a param is edited with, plus the metadata that control
/// needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamKind {
    /// Integer slider.
    IntSlider {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
        /// Slider step.
        step: i64,
        /// The user may move the bounds, so values are not clamped.
        editable_range: bool,
    },
    /// Float slider.
    FloatSlider {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
        /// Slider step.
        step: f64,
        /// The user may move the bounds, so values are not clamped.
        editable_range: bool,
    },
    /// Two integer sliders sharing one range (e.g. a low/high pair).
    IntPairSlider {
        /// Lower bound.
        min: i64,
        /// Upper bound.
        max: i64,
        /// Slider step.
        step: i64,
        /// The user may move the bounds, so values are not clamped.
        editable_range: bool,
    },
    /// Two float sliders sharing one range.
    FloatPairSlider {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
        /// Slider step.
        step: f64,
        /// The user may move the bounds, so values are not clamped.
        editable_range: bool,
    },
    /// Dropdown over a fixed list of names.
    Choice {
        /// Accepted names, in display order.
        choices: Vec<String>,
    },
    /// Checkbox.
    Bool,
    /// Free integer entry with optional bounds.
    IntInput {
        /// Optional lower bound.
        min: Option<i64>,
        /// Optional upper bound.
        max: Option<i64>,
    },
    /// Free float entry with optional bounds.
    FloatInput {
        /// Optional lower bound.
        min: Option<f64>,
        /// Optional upper bound.
        max: Option<f64>,
        /// Digits kept after the decimal point.
        decimals: u32,
    },
    /// RGB color picker.
    Color,
    /// Read-only text display.
    Text,
    /// One-dimensional numeric array.
    Array1D {
        /// The host offers an anchor picker next to the array.
        use_anchor: bool,
    },
    /// Two-dimensional numeric array (kernels, structuring elements).
    Array2D {
        /// The host offers an anchor picker next to the array.
        use_anchor: bool,
    },
    /// Kernel width and height.
    KernelSize {
        /// Smallest allowed side.
        min: u32,
        /// Largest allowed side.
        max: u32,
    },
    /// Integer `(x, y)` point.
    Point,
    /// Width and height in pixels, e.g. a resize target.
    Dimensions,
}

impl ParamKind {
    /// Short human-readable name of the value this kind accepts.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::IntSlider { .. } | Self::IntInput { .. } => "integer",
            Self::FloatSlider { .. } | Self::FloatInput { .. } => "float",
            Self::IntPairSlider { .. } => "integer pair",
            Self::FloatPairSlider { .. } => "float pair",
            Self::Choice { .. } => "choice",
            Self::Bool => "boolean",
            Self::Color => "color",
            Self::Text => "text",
            Self::Array1D { .. } => "1-D array",
            Self::Array2D { .. } => "2-D array",
            Self::KernelSize { .. } => "kernel size",
            Self::Point => "point",
            Self::Dimensions => "dimensions",
        }
    }

    /// Check `value` against this kind and bring it into range.
    ///
    /// Integers are promoted for float kinds. Bounded kinds clamp
    /// instead of rejecting, except sliders with `editable_range`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ParamType`] when the variant does not
    /// fit the kind, and [`PipelineError::InvalidParamValue`] for
    /// unknown choices, non-finite floats and ragged or empty arrays.
    #[allow(clippy::cast_precision_loss)]
    pub fn coerce(&self, param: &str, value: ParamValue) -> Result<ParamValue, PipelineError> {
        let invalid = |reason: String| PipelineError::InvalidParamValue {
            param: param.to_string(),
            reason,
        };
        match (self, value) {
            (
                Self::IntSlider {
                    min,
                    max,
                    editable_range,
                    ..
                },
                ParamValue::Int(v),
            ) => Ok(ParamValue::Int(if *editable_range {
                v
            } else {
                clamp_int(v, *min, *max)
            })),
            (Self::FloatSlider { .. }, ParamValue::Int(v)) => {
                self.coerce(param, ParamValue::Float(v as f64))
            }
            (
                Self::FloatSlider {
                    min,
                    max,
                    editable_range,
                    ..
                },
                ParamValue::Float(v),
            ) => {
                let v = finite(v).ok_or_else(|| invalid("value must be finite".to_string()))?;
                Ok(ParamValue::Float(if *editable_range {
                    v
                } else {
                    clamp_float(v, *min, *max)
                }))
            }
            (
                Self::IntPairSlider {
                    min,
                    max,
                    editable_range,
                    ..
                },
                ParamValue::IntPair(a, b),
            ) => Ok(if *editable_range {
                ParamValue::IntPair(a, b)
            } else {
                ParamValue::IntPair(clamp_int(a, *min, *max), clamp_int(b, *min, *max))
            }),
            (Self::FloatPairSlider { .. }, ParamValue::IntPair(a, b)) => {
                self.coerce(param, ParamValue::FloatPair(a as f64, b as f64))
            }
            (
                Self::FloatPairSlider {
                    min,
                    max,
                    editable_range,
                    ..
                },
                ParamValue::FloatPair(a, b),
            ) => {
                let (a, b) = finite(a)
                    .zip(finite(b))
                    .ok_or_else(|| invalid("values must be finite".to_string()))?;
                Ok(if *editable_range {
                    ParamValue::FloatPair(a, b)
                } else {
                    ParamValue::FloatPair(clamp_float(a, *min, *max), clamp_float(b, *min, *max))
                })
            }
            (Self::Choice { choices }, ParamValue::Choice(name)) => {
                if choices.iter().any(|c| *c == name) {
                    Ok(ParamValue::Choice(name))
                } else {
                    Err(invalid(format!(
                        "{name:?} is not one of [{}]",
                        choices.join(", ")
                    )))
                }
            }
            (Self::Bool, ParamValue::Bool(b)) => Ok(ParamValue::Bool(b)),
            (Self::IntInput { min, max }, ParamValue::Int(v)) => {
                let v = min.map_or(v, |lo| v.max(lo));
                Ok(ParamValue::Int(max.map_or(v, |hi| v.min(hi))))
            }
            (Self::FloatInput { .. }, ParamValue::Int(v)) => {
                self.coerce(param, ParamValue::Float(v as f64))
            }
            (Self::FloatInput { min, max, decimals }, ParamValue::Float(v)) => {
                let v = finite(v).ok_or_else(|| invalid("value must be finite".to_string()))?;
                let v = min.map_or(v, |lo| v.max(lo));
                let v = max.map_or(v, |hi| v.min(hi));
                Ok(ParamValue::Float(round_to(v, *decimals)))
            }
            (Self::Color, ParamValue::Color(rgb)) => Ok(ParamValue::Color(rgb)),
            (Self::Text, ParamValue::Text(s)) => Ok(ParamValue::Text(s)),
            (Self::Array1D { .. }, ParamValue::Array1D(values)) => {
                if values.iter().all(|v| v.is_finite()) {
                    Ok(ParamValue::Array1D(values))
                } else {
                    Err(invalid("array values must be finite".to_string()))
                }
            }
            (Self::Array2D { .. }, ParamValue::Array2D(rows)) => {
                check_rows(&rows).map_err(invalid)?;
                Ok(ParamValue::Array2D(rows))
            }
            (Self::KernelSize { min, max }, ParamValue::KernelSize(w, h)) => {
                let clamp = |side: u32| side.max(*min).min(*max);
                Ok(ParamValue::KernelSize(clamp(w), clamp(h)))
            }
            (Self::Point, ParamValue::Point(x, y)) => Ok(ParamValue::Point(x, y)),
            (Self::Dimensions, ParamValue::Dimensions(w, h)) => {
                Ok(ParamValue::Dimensions(w.max(1), h.max(1)))
            }
            (kind, _) => Err(PipelineError::ParamType {
                param: param.to_string(),
                expected: kind.type_name(),
            }),
        }
    }
}

fn clamp_int(v: i64, min: i64, max: i64) -> i64 {
    v.max(min).min(max)
}

fn clamp_float(v: f64, min: f64, max: f64) -> f64 {
    v.max(min).min(max)
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

#[allow(clippy::cast_possible_wrap)]
fn round_to(v: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals.min(15) as i32);
    (v * scale).round() / scale
}

fn check_rows(rows: &[Vec<f64>]) -> Result<(), String> {
    let Some(first) = rows.first() else {
        return Err("array must have at least one row".to_string());
    };
    if first.is_empty() {
        return Err("array rows must not be empty".to_string());
    }
    if rows.iter().any(|r| r.len() != first.len()) {
        return Err("array rows must all have the same length".to_string());
    }
    if rows.iter().flatten().any(|v| !v.is_finite()) {
        return Err("array values must be finite".to_string());
    }
    Ok(())
}

/// A value held by a [`Param`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamValue {
    /// Integer sliders and inputs.
    Int(i64),
    /// Float sliders and inputs.
    Float(f64),
    /// Integer pair sliders.
    IntPair(i64, i64),
    /// Float pair sliders.
    FloatPair(f64, f64),
    /// Selected choice name.
    Choice(String),
    /// Checkbox state.
    Bool(bool),
    /// RGB color.
    Color([u8; 3]),
    /// Display text.
    Text(String),
    /// One-dimensional array.
    Array1D(Vec<f64>),
    /// Row-major two-dimensional array.
    Array2D(Vec<Vec<f64>>),
    /// Kernel `(width, height)`.
    KernelSize(u32, u32),
    /// Point `(x, y)`.
    Point(i64, i64),
    /// `(width, height)` in pixels.
    Dimensions(u32, u32),
}

impl ParamValue {
    /// Parse command-line text into a value of the variant `kind` takes.
    ///
    /// Accepted forms: `5`, `1.5`, `10,20`, `true`/`off`, a choice
    /// name, `r,g,b` or `#rrggbb`, `5` or `5x3` for kernel sizes,
    /// `640x480` for dimensions, `x,y`, `1,2,3` and `1,2;3,4` for arrays. The result is not yet
    /// range-checked; see [`ParamKind::coerce`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParamValue`] if `text` does not
    /// parse as the kind's value type.
    pub fn parse(kind: &ParamKind, param: &str, text: &str) -> Result<Self, PipelineError> {
        let text = text.trim();
        let fail = || PipelineError::InvalidParamValue {
            param: param.to_string(),
            reason: format!("cannot parse {text:?} as {}", kind.type_name()),
        };
        let parsed = match kind {
            ParamKind::IntSlider { .. } | ParamKind::IntInput { .. } => {
                text.parse().ok().map(Self::Int)
            }
            ParamKind::FloatSlider { .. } | ParamKind::FloatInput { .. } => {
                text.parse().ok().map(Self::Float)
            }
            ParamKind::IntPairSlider { .. } => {
                parse_pair::<i64>(text, ',').map(|(a, b)| Self::IntPair(a, b))
            }
            ParamKind::FloatPairSlider { .. } => {
                parse_pair::<f64>(text, ',').map(|(a, b)| Self::FloatPair(a, b))
            }
            ParamKind::Choice { .. } => Some(Self::Choice(text.to_string())),
            ParamKind::Bool => parse_bool(text).map(Self::Bool),
            ParamKind::Color => parse_color(text).map(Self::Color),
            ParamKind::Text => Some(Self::Text(text.to_string())),
            ParamKind::Array1D { .. } => parse_row(text).map(Self::Array1D),
            ParamKind::Array2D { .. } => text
                .split(';')
                .map(parse_row)
                .collect::<Option<Vec<_>>>()
                .map(Self::Array2D),
            ParamKind::KernelSize { .. } => parse_kernel_size(text),
            ParamKind::Point => parse_pair::<i64>(text, ',').map(|(x, y)| Self::Point(x, y)),
            ParamKind::Dimensions => {
                parse_pair::<u32>(text, 'x').map(|(w, h)| Self::Dimensions(w, h))
            }
        };
        parsed.ok_or_else(fail)
    }

    /// Integer content.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Float content; integers are promoted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Integer pair content.
    #[must_use]
    pub const fn as_int_pair(&self) -> Option<(i64, i64)> {
        match self {
            Self::IntPair(a, b) => Some((*a, *b)),
            _ => None,
        }
    }

    /// Float pair content.
    #[must_use]
    pub const fn as_float_pair(&self) -> Option<(f64, f64)> {
        match self {
            Self::FloatPair(a, b) => Some((*a, *b)),
            _ => None,
        }
    }

    /// Selected choice name.
    #[must_use]
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            Self::Choice(s) => Some(s),
            _ => None,
        }
    }

    /// Checkbox state.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// RGB color.
    #[must_use]
    pub const fn as_color(&self) -> Option<[u8; 3]> {
        match self {
            Self::Color(rgb) => Some(*rgb),
            _ => None,
        }
    }

    /// Display text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// One-dimensional array.
    #[must_use]
    pub fn as_array_1d(&self) -> Option<&[f64]> {
        match self {
            Self::Array1D(v) => Some(v),
            _ => None,
        }
    }

    /// Two-dimensional array rows.
    #[must_use]
    pub fn as_array_2d(&self) -> Option<&[Vec<f64>]> {
        match self {
            Self::Array2D(rows) => Some(rows),
            _ => None,
        }
    }

    /// Kernel `(width, height)`.
    #[must_use]
    pub const fn as_kernel_size(&self) -> Option<(u32, u32)> {
        match self {
            Self::KernelSize(w, h) => Some((*w, *h)),
            _ => None,
        }
    }

    /// `(width, height)` in pixels.
    #[must_use]
    pub const fn as_dimensions(&self) -> Option<Dimensions> {
        match self {
            Self::Dimensions(width, height) => Some(Dimensions {
                width: *width,
                height: *height,
            }),
            _ => None,
        }
    }

    /// Point `(x, y)`.
    #[must_use]
    pub const fn as_point(&self) -> Option<(i64, i64)> {
        match self {
            Self::Point(x, y) => Some((*x, *y)),
            _ => None,
        }
    }
}

/// Renders in the same syntax [`ParamValue::parse`] accepts.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::IntPair(a, b) | Self::Point(a, b) => write!(f, "{a},{b}"),
            Self::FloatPair(a, b) => write!(f, "{a},{b}"),
            Self::Choice(s) | Self::Text(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Color([r, g, b]) => write!(f, "{r},{g},{b}"),
            Self::Array1D(values) => f.write_str(&join_row(values)),
            Self::Array2D(rows) => {
                let rows: Vec<String> = rows.iter().map(|r| join_row(r)).collect();
                f.write_str(&rows.join(";"))
            }
            Self::KernelSize(w, h) | Self::Dimensions(w, h) => write!(f, "{w}x{h}"),
        }
    }
}

fn join_row(values: &[f64]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_pair<T: std::str::FromStr>(text: &str, sep: char) -> Option<(T, T)> {
    let (a, b) = text.split_once(sep)?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_color(text: &str) -> Option<[u8; 3]> {
    if let Some(hex) = text.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some([channel(0)?, channel(2)?, channel(4)?]);
    }
    let parts: Vec<u8> = text
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    <[u8; 3]>::try_from(parts).ok()
}

fn parse_row(text: &str) -> Option<Vec<f64>> {
    text.split(',').map(|v| v.trim().parse().ok()).collect()
}

fn parse_kernel_size(text: &str) -> Option<ParamValue> {
    let sep = if text.contains('x') { 'x' } else { ',' };
    if text.contains(sep) {
        parse_pair::<u32>(text, sep).map(|(w, h)| ParamValue::KernelSize(w, h))
    } else {
        text.parse().ok().map(|k| ParamValue::KernelSize(k, k))
    }
}

/// A named, typed, editable value bound to one transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    name: String,
    label: Option<String>,
    help_text: String,
    read_only: bool,
    kind: ParamKind,
    default: ParamValue,
    value: Option<ParamValue>,
}

impl Param {
    /// Create a param of any kind.
    ///
    /// The caller is responsible for `default` matching `kind`; the
    /// typed constructors below guarantee it.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParamKind, default: ParamValue) -> Self {
        let read_only = matches!(kind, ParamKind::Text);
        Self {
            name: name.into(),
            label: None,
            help_text: String::new(),
            read_only,
            kind,
            default,
            value: None,
        }
    }

    /// Integer slider with step 1.
    #[must_use]
    pub fn int_slider(name: impl Into<String>, default: i64, min: i64, max: i64) -> Self {
        Self::new(
            name,
            ParamKind::IntSlider {
                min,
                max,
                step: 1,
                editable_range: false,
            },
            ParamValue::Int(default),
        )
    }

    /// Float slider.
    #[must_use]
    pub fn float_slider(
        name: impl Into<String>,
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    ) -> Self {
        Self::new(
            name,
            ParamKind::FloatSlider {
                min,
                max,
                step,
                editable_range: false,
            },
            ParamValue::Float(default),
        )
    }

    /// Pair of integer sliders with step 1.
    #[must_use]
    pub fn int_pair_slider(
        name: impl Into<String>,
        default: (i64, i64),
        min: i64,
        max: i64,
    ) -> Self {
        Self::new(
            name,
            ParamKind::IntPairSlider {
                min,
                max,
                step: 1,
                editable_range: false,
            },
            ParamValue::IntPair(default.0, default.1),
        )
    }

    /// Pair of float sliders.
    #[must_use]
    pub fn float_pair_slider(
        name: impl Into<String>,
        default: (f64, f64),
        min: f64,
        max: f64,
        step: f64,
    ) -> Self {
        Self::new(
            name,
            ParamKind::FloatPairSlider {
                min,
                max,
                step,
                editable_range: false,
            },
            ParamValue::FloatPair(default.0, default.1),
        )
    }

    /// Dropdown choice.
    #[must_use]
    pub fn choice(name: impl Into<String>, default: &str, choices: &[&str]) -> Self {
        Self::new(
            name,
            ParamKind::Choice {
                choices: choices.iter().map(ToString::to_string).collect(),
            },
            ParamValue::Choice(default.to_string()),
        )
    }

    /// Checkbox.
    #[must_use]
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, ParamKind::Bool, ParamValue::Bool(default))
    }

    /// Integer entry.
    #[must_use]
    pub fn int_input(
        name: impl Into<String>,
        default: i64,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Self {
        Self::new(name, ParamKind::IntInput { min, max }, ParamValue::Int(default))
    }

    /// Float entry.
    #[must_use]
    pub fn float_input(
        name: impl Into<String>,
        default: f64,
        min: Option<f64>,
        max: Option<f64>,
        decimals: u32,
    ) -> Self {
        Self::new(
            name,
            ParamKind::FloatInput { min, max, decimals },
            ParamValue::Float(default),
        )
    }

    /// Color picker.
    #[must_use]
    pub fn color(name: impl Into<String>, default: [u8; 3]) -> Self {
        Self::new(name, ParamKind::Color, ParamValue::Color(default))
    }

    /// Read-only text.
    #[must_use]
    pub fn text(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Text, ParamValue::Text(default.into()))
    }

    /// One-dimensional array.
    #[must_use]
    pub fn array_1d(name: impl Into<String>, default: Vec<f64>, use_anchor: bool) -> Self {
        Self::new(
            name,
            ParamKind::Array1D { use_anchor },
            ParamValue::Array1D(default),
        )
    }

    /// Two-dimensional array.
    #[must_use]
    pub fn array_2d(name: impl Into<String>, default: Vec<Vec<f64>>, use_anchor: bool) -> Self {
        Self::new(
            name,
            ParamKind::Array2D { use_anchor },
            ParamValue::Array2D(default),
        )
    }

    /// Kernel size.
    #[must_use]
    pub fn kernel_size(name: impl Into<String>, default: (u32, u32), min: u32, max: u32) -> Self {
        Self::new(
            name,
            ParamKind::KernelSize { min, max },
            ParamValue::KernelSize(default.0, default.1),
        )
    }

    /// Integer point.
    #[must_use]
    pub fn point(name: impl Into<String>, default: (i64, i64)) -> Self {
        Self::new(name, ParamKind::Point, ParamValue::Point(default.0, default.1))
    }

    /// Width and height.
    #[must_use]
    pub fn dimensions(name: impl Into<String>, default: Dimensions) -> Self {
        Self::new(
            name,
            ParamKind::Dimensions,
            ParamValue::Dimensions(default.width, default.height),
        )
    }

    /// Override the derived display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach tooltip text.
    #[must_use]
    pub fn with_help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = help_text.into();
        self
    }

    /// Mark the param display-only.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Let the user move slider bounds; stored values are then not
    /// clamped. No effect on non-slider kinds.
    #[must_use]
    pub fn with_editable_range(mut self) -> Self {
        match &mut self.kind {
            ParamKind::IntSlider { editable_range, .. }
            | ParamKind::FloatSlider { editable_range, .. }
            | ParamKind::IntPairSlider { editable_range, .. }
            | ParamKind::FloatPairSlider { editable_range, .. } => *editable_range = true,
            _ => {}
        }
        self
    }

    /// Identifier used to look the param up.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display label: the explicit one, or the name with `_` replaced
    /// by spaces and each word capitalized.
    #[must_use]
    pub fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| derive_label(&self.name))
    }

    /// Tooltip text (possibly empty).
    #[must_use]
    pub fn help_text(&self) -> &str {
        &self.help_text
    }

    /// Whether edits are rejected.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Control kind and its metadata.
    #[must_use]
    pub const fn kind(&self) -> &ParamKind {
        &self.kind
    }

    /// Value used until the first store.
    #[must_use]
    pub const fn default_value(&self) -> &ParamValue {
        &self.default
    }

    /// The stored value, or `None` if nothing has been stored yet.
    #[must_use]
    pub const fn stored(&self) -> Option<&ParamValue> {
        self.value.as_ref()
    }

    /// Effective value: the stored one once set, the default before.
    #[must_use]
    pub fn value(&self) -> &ParamValue {
        self.value.as_ref().unwrap_or(&self.default)
    }

    /// Validate and store `value`. `None` leaves the stored value as it
    /// is. Returns whether anything was stored.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ReadOnlyParam`] for display-only params
    /// and whatever [`ParamKind::coerce`] rejects.
    pub fn store_value(&mut self, value: Option<ParamValue>) -> Result<bool, PipelineError> {
        let Some(value) = value else {
            return Ok(false);
        };
        if self.read_only {
            return Err(PipelineError::ReadOnlyParam(self.name.clone()));
        }
        let value = self.kind.coerce(&self.name, value)?;
        log::debug!("{}: {value}", self.name);
        self.value = Some(value);
        Ok(true)
    }

    /// Parse `text` for this param's kind and store it.
    ///
    /// # Errors
    ///
    /// See [`ParamValue::parse`] and [`store_value`](Self::store_value).
    pub fn store_text(&mut self, text: &str) -> Result<bool, PipelineError> {
        let value = ParamValue::parse(&self.kind, &self.name, text)?;
        self.store_value(Some(value))
    }

    /// Forget the stored value so the default applies again.
    pub fn reset(&mut self) {
        self.value = None;
    }
}

fn derive_label(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The ordered params of one transform, with typed lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    owner: String,
    params: Vec<Param>,
}

impl Params {
    /// Params belonging to the transform called `owner`.
    #[must_use]
    pub fn new(owner: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            owner: owner.into(),
            params,
        }
    }

    /// Name of the owning transform.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Number of params.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` for transforms without params.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Params in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.params.iter()
    }

    /// Look up a param by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Look up a param by name for editing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParam`] if there is none.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Param, PipelineError> {
        let owner = &self.owner;
        self.params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| PipelineError::UnknownParam {
                transform: owner.clone(),
                param: name.to_string(),
            })
    }

    /// Effective value of a named param.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParam`] if there is none.
    pub fn value(&self, name: &str) -> Result<&ParamValue, PipelineError> {
        self.get(name)
            .map(Param::value)
            .ok_or_else(|| PipelineError::UnknownParam {
                transform: self.owner.clone(),
                param: name.to_string(),
            })
    }

    fn typed<T>(
        &self,
        name: &str,
        expected: &'static str,
        read: impl FnOnce(&ParamValue) -> Option<T>,
    ) -> Result<T, PipelineError> {
        read(self.value(name)?).ok_or_else(|| PipelineError::ParamType {
            param: name.to_string(),
            expected,
        })
    }

    /// Integer value of a named param.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownParam`] or [`PipelineError::ParamType`].
    pub fn int(&self, name: &str) -> Result<i64, PipelineError> {
        self.typed(name, "integer", ParamValue::as_int)
    }

    /// Float value of a named param (integers promoted).
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownParam`] or [`PipelineError::ParamType`].
    pub fn float(&self, name: &str) -> Result<f64, PipelineError> {
        self.typed(name, "float", ParamValue::as_float)
    }

    /// Boolean value of a named param.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownParam`] or [`PipelineError::ParamType`].
    pub fn bool(&self, name: &str) -> Result<bool, PipelineError> {
        self.typed(name, "boolean", ParamValue::as_bool)
    }

    /// Selected choice of a named param.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownParam`] or [`PipelineError::ParamType`].
    pub fn choice(&self, name: &str) -> Result<&str, PipelineError> {
        let value = self.value(name)?;
        value.as_choice().ok_or_else(|| PipelineError::ParamType {
            param: name.to_string(),
            expected: "choice",
        })
    }

    /// Integer pair value of a named param.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownParam`] or [`PipelineError::ParamType`].
    pub fn int_pair(&self, name: &str) -> Result<(i64, i64), PipelineError> {
        self.typed(name, "integer pair", ParamValue::as_int_pair)
    }

    /// Kernel size of a named param.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownParam`] or [`PipelineError::ParamType`].
    pub fn kernel_size(&self, name: &str) -> Result<(u32, u32), PipelineError> {
        self.typed(name, "kernel size", ParamValue::as_kernel_size)
    }

    /// Point value of a named param.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownParam`] or [`PipelineError::ParamType`].
    pub fn point(&self, name: &str) -> Result<(i64, i64), PipelineError> {
        self.typed(name, "point", ParamValue::as_point)
    }

    /// Width and height of a named param.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownParam`] or [`PipelineError::ParamType`].
    pub fn dimensions(&self, name: &str) -> Result<Dimensions, PipelineError> {
        self.typed(name, "dimensions", ParamValue::as_dimensions)
    }

    /// Two-dimensional array rows of a named param.
    ///
    /// # Errors
    ///
    /// [`PipelineError::UnknownParam`] or [`PipelineError::ParamType`].
    pub fn array_2d(&self, name: &str) -> Result<&[Vec<f64>], PipelineError> {
        let value = self.value(name)?;
        value.as_array_2d().ok_or_else(|| PipelineError::ParamType {
            param: name.to_string(),
            expected: "2-D array",
        })
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
