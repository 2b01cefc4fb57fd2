//! Windows: ordered chains of transforms sharing one input.
//!
//! A [`Window`] threads an `(image, extra)` pair through its transforms,
//! optionally starting part-way along the chain. It keeps a copy of the
//! last full input, the output of every stage of the last run and the
//! final output, so the owning [`Pipeline`](crate::Pipeline) can restart
//! from any stage without recomputing the ones before it.
//!
//! Hosts do not register callbacks. They read [`Window::last_out`] and
//! compare [`Window::completed_runs`] against the value they last saw to
//! decide whether to refresh.

use std::sync::atomic::{AtomicUsize, Ordering};

use image::DynamicImage;

use crate::param::ParamValue;
use crate::pipeline::ParamChange;
use crate::transform::{Transform, TransformKind};
use crate::types::{Extra, PipelineError};

/// Counter behind the `Step N` default names.
static WINDOW_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Convert a signed transform index coming from a host into a `usize`.
///
/// # Errors
///
/// Returns [`PipelineError::NegativeTransformIndex`] for negative values.
pub fn transform_index(index: i64) -> Result<usize, PipelineError> {
    if index < 0 {
        return Err(PipelineError::NegativeTransformIndex(index));
    }
    // Too large for this platform: saturate so the range check rejects it.
    Ok(usize::try_from(index).unwrap_or(usize::MAX))
}

/// A one-transform window named after a built-in kind.
#[must_use]
pub fn transform_window(kind: TransformKind) -> Window {
    Window::named(kind.name(), vec![Transform::builtin(kind)])
}

type Stage = (DynamicImage, Extra);

/// An ordered chain of transforms with its cached inputs and outputs.
#[derive(Debug)]
pub struct Window {
    name: String,
    transforms: Vec<Transform>,
    index: usize,
    last_in: Option<DynamicImage>,
    extra_in: Extra,
    last_out: Option<DynamicImage>,
    last_extra: Extra,
    stages: Vec<Option<Stage>>,
    completed_runs: u64,
}

impl Window {
    /// A window named `Step N`, with `N` counting every auto-named
    /// window created in this process.
    #[must_use]
    pub fn new(transforms: Vec<Transform>) -> Self {
        let n = WINDOW_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        Self::named(format!("Step {n}"), transforms)
    }

    /// A window with an explicit name.
    #[must_use]
    pub fn named(name: impl Into<String>, transforms: Vec<Transform>) -> Self {
        let stages = transforms.iter().map(|_| None).collect();
        Self {
            name: name.into(),
            transforms,
            index: 0,
            last_in: None,
            extra_in: Extra::new(),
            last_out: None,
            last_extra: Extra::new(),
            stages,
            completed_runs: 0,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of this window in its pipeline.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    pub(crate) const fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Number of transforms.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Returns `true` for a window without transforms.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Transforms in execution order.
    #[must_use]
    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// Look a transform up by index.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TransformIndexOutOfRange`] past the end.
    pub fn transform(&self, index: usize) -> Result<&Transform, PipelineError> {
        let len = self.transforms.len();
        self.transforms
            .get(index)
            .ok_or(PipelineError::TransformIndexOutOfRange { index, len })
    }

    /// Look a transform up by index, for editing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TransformIndexOutOfRange`] past the end.
    pub fn transform_mut(&mut self, index: usize) -> Result<&mut Transform, PipelineError> {
        let len = self.transforms.len();
        self.transforms
            .get_mut(index)
            .ok_or(PipelineError::TransformIndexOutOfRange { index, len })
    }

    /// Input of the last run that started at stage 0.
    #[must_use]
    pub const fn last_in(&self) -> Option<&DynamicImage> {
        self.last_in.as_ref()
    }

    /// Payload that came with [`last_in`](Self::last_in).
    #[must_use]
    pub const fn extra_in(&self) -> &Extra {
        &self.extra_in
    }

    /// Output of the last successful run.
    #[must_use]
    pub const fn last_out(&self) -> Option<&DynamicImage> {
        self.last_out.as_ref()
    }

    /// Payload that came with [`last_out`](Self::last_out).
    #[must_use]
    pub const fn last_extra(&self) -> &Extra {
        &self.last_extra
    }

    /// Output pair of the last successful run.
    #[must_use]
    pub fn output(&self) -> Option<(&DynamicImage, &Extra)> {
        self.last_out.as_ref().map(|img| (img, &self.last_extra))
    }

    /// Number of runs that completed without error.
    #[must_use]
    pub const fn completed_runs(&self) -> u64 {
        self.completed_runs
    }

    /// The cached input for restarting at stage `k`: the last full input
    /// for `k == 0`, otherwise the output of stage `k - 1`. `None` when
    /// that stage has not produced anything since it was last
    /// invalidated.
    #[must_use]
    pub fn resume_input(&self, k: usize) -> Option<(&DynamicImage, &Extra)> {
        if k == 0 {
            return self.last_in.as_ref().map(|img| (img, &self.extra_in));
        }
        self.stages
            .get(k - 1)?
            .as_ref()
            .map(|(img, extra)| (img, extra))
    }

    /// Run stages `transform_index..N` on `img_in`, which must already
    /// reflect stages `0..transform_index`.
    ///
    /// Inputs are copied, never modified. Each stage's output is cached.
    /// With `transform_index == N` the input is passed through as the
    /// output.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::TransformIndexOutOfRange`] when
    /// `transform_index > N`, and the first stage error otherwise. After
    /// a stage error the failed stage and everything after it have no
    /// cached output, and [`last_out`](Self::last_out) keeps the previous
    /// good image.
    pub fn draw(
        &mut self,
        img_in: &DynamicImage,
        extra_in: &Extra,
        transform_index: usize,
    ) -> Result<(DynamicImage, Extra), PipelineError> {
        let len = self.transforms.len();
        if transform_index > len {
            return Err(PipelineError::TransformIndexOutOfRange {
                index: transform_index,
                len,
            });
        }
        if transform_index == 0 {
            self.last_in = Some(img_in.clone());
            self.extra_in = extra_in.clone();
        }
        log::debug!(
            "{}: drawing transforms {transform_index}..{len}",
            self.name
        );

        for stage in &mut self.stages[transform_index..] {
            *stage = None;
        }
        let mut image = img_in.clone();
        let mut extra = extra_in.clone();
        for (i, transform) in self.transforms.iter().enumerate().skip(transform_index) {
            let (out, out_extra) = transform.draw(image, extra)?;
            self.stages[i] = Some((out.clone(), out_extra.clone()));
            image = out;
            extra = out_extra;
        }

        self.last_out = Some(image.clone());
        self.last_extra = extra.clone();
        self.completed_runs += 1;
        Ok((image, extra))
    }

    /// Store `value` into param `name` of transform `transform_index`
    /// and return the restart the change calls for. `None` stores
    /// nothing but still asks for a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform or param does not exist, or the
    /// value is rejected.
    pub fn store_param(
        &mut self,
        transform_index: usize,
        name: &str,
        value: Option<ParamValue>,
    ) -> Result<ParamChange, PipelineError> {
        let window_index = self.index;
        self.transform_mut(transform_index)?
            .params_mut()
            .get_mut(name)?
            .store_value(value)?;
        Ok(ParamChange {
            window_index,
            transform_index,
            param: name.to_string(),
        })
    }
}
