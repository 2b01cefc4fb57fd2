//! cvpg-pipeline: the transform pipeline behind the cvpg playground.
//!
//! An image flows through one or more [`Window`]s, each an ordered chain
//! of [`Transform`]s. Every transform owns typed, editable [`Param`]s.
//! When a param changes, the [`Pipeline`] re-runs from the edited
//! transform onward, reusing cached outputs for the stages before it:
//!
//! ```text
//! source -> window 0 [t0 -> t1 -> ...] -> window 1 [...] -> output
//! ```
//!
//! This crate has **no I/O dependencies**. It works on in-memory images
//! and byte slices; reading files, parsing flags and writing results
//! live in the `cvpg` binary.

pub mod blur;
pub mod decode;
pub mod display;
pub mod edge;
pub mod filter2d;
pub mod in_range;
pub mod param;
pub mod pipeline;
pub mod threshold;
pub mod transform;
pub mod types;
pub mod window;

pub use decode::decode;
pub use display::to_display_rgba;
pub use param::{Param, ParamKind, ParamValue, Params};
pub use pipeline::{ParamChange, Pipeline};
pub use threshold::ThresholdType;
pub use transform::{Transform, TransformKind, TransformOp, collect_builtin_transforms};
pub use types::{Dimensions, DynamicImage, Extra, GrayImage, PipelineError, RgbaImage};
pub use window::{Window, transform_index, transform_window};

/// Build a pipeline running a single built-in transform over `source`
/// and run it once.
///
/// # Errors
///
/// Returns the first stage error of the initial run.
pub fn single_transform_pipeline(
    source: DynamicImage,
    kind: TransformKind,
) -> Result<Pipeline, PipelineError> {
    let mut pipeline = Pipeline::new(source, vec![transform_window(kind)]);
    pipeline.run_pipeline(0, 0)?;
    Ok(pipeline)
}
