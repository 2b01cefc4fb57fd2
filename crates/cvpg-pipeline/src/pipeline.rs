//! Pipeline coordination across windows.
//!
//! A [`Pipeline`] owns the source image and an ordered list of
//! [`Window`]s. Window 0 reads the source; every later window reads the
//! output of the one before it. [`Pipeline::run_pipeline`] re-executes
//! from a given window and transform, reusing cached stage outputs for
//! everything upstream of the restart point.
//!
//! # Change notification
//!
//! Params do not know which transform or window owns them. Editing goes
//! through [`Window::store_param`], which returns a [`ParamChange`]
//! naming the restart point, and [`Pipeline::apply_change`] consumes it.
//! [`Pipeline::store_value_and_start`] does both in one call.

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::param::ParamValue;
use crate::types::{Extra, PipelineError};
use crate::window::Window;

/// A stored param edit and where the pipeline must restart because of
/// it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamChange {
    /// Window owning the edited transform.
    pub window_index: usize,
    /// Position of the edited transform in its window.
    pub transform_index: usize,
    /// Name of the edited param.
    pub param: String,
}

/// The source image and the windows that process it in order.
#[derive(Debug)]
pub struct Pipeline {
    source: DynamicImage,
    source_extra: Extra,
    windows: Vec<Window>,
}

impl Pipeline {
    /// Build a pipeline and assign each window its index. Nothing runs
    /// until [`run_pipeline`](Self::run_pipeline) is called.
    #[must_use]
    pub fn new(source: DynamicImage, windows: Vec<Window>) -> Self {
        let mut pipeline = Self {
            source,
            source_extra: Extra::new(),
            windows: Vec::with_capacity(windows.len()),
        };
        for window in windows {
            pipeline.push_window(window);
        }
        pipeline
    }

    /// Seed window 0 with a payload as well as the image.
    #[must_use]
    pub fn with_source_extra(mut self, extra: Extra) -> Self {
        self.source_extra = extra;
        self
    }

    /// Append a window and return its index.
    pub fn push_window(&mut self, mut window: Window) -> usize {
        let index = self.windows.len();
        window.set_index(index);
        self.windows.push(window);
        index
    }

    /// The image window 0 reads.
    #[must_use]
    pub const fn source(&self) -> &DynamicImage {
        &self.source
    }

    /// Windows in execution order.
    #[must_use]
    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    /// Number of windows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns `true` if there are no windows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Look a window up by index.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::WindowIndexOutOfRange`] past the end.
    pub fn window(&self, index: usize) -> Result<&Window, PipelineError> {
        let len = self.windows.len();
        self.windows
            .get(index)
            .ok_or(PipelineError::WindowIndexOutOfRange { index, len })
    }

    /// Look a window up by index, for editing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::WindowIndexOutOfRange`] past the end.
    pub fn window_mut(&mut self, index: usize) -> Result<&mut Window, PipelineError> {
        let len = self.windows.len();
        self.windows
            .get_mut(index)
            .ok_or(PipelineError::WindowIndexOutOfRange { index, len })
    }

    /// Output of the last window, if it has run successfully.
    #[must_use]
    pub fn output(&self) -> Option<(&DynamicImage, &Extra)> {
        self.windows.last().and_then(Window::output)
    }

    /// Input window `index` reads on a full run: the source for window
    /// 0, otherwise the previous window's last output.
    fn upstream_output(&self, index: usize) -> Option<(&DynamicImage, &Extra)> {
        match index.checked_sub(1) {
            None => Some((&self.source, &self.source_extra)),
            Some(prev) => self.windows.get(prev).and_then(Window::output),
        }
    }

    /// Find where a restart at `(window_index, transform_index)` can
    /// actually begin, walking back past missing cache entries.
    fn resume_point(
        &self,
        window_index: usize,
        transform_index: usize,
    ) -> (usize, usize, DynamicImage, Extra) {
        let (mut w, mut k) = (window_index, transform_index);
        loop {
            let input = if k == 0 {
                self.upstream_output(w)
            } else {
                self.windows.get(w).and_then(|win| win.resume_input(k))
            };
            if let Some((image, extra)) = input {
                return (w, k, image.clone(), extra.clone());
            }
            if k > 0 {
                log::warn!(
                    "no cached input for window {w} transform {k}, re-running window {w}"
                );
                k = 0;
            } else {
                // Window 0 always has the source, so this only happens for w > 0.
                log::warn!("window {} has no output yet, re-running it", w - 1);
                w -= 1;
            }
        }
    }

    /// Re-execute window `window_index` from `transform_index`, then
    /// every later window from its first transform.
    ///
    /// Returns the `(image, extra)` pair produced by the last window.
    /// Stages upstream of the restart point are not recomputed when
    /// their outputs are cached; when they are not, the run starts
    /// earlier.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyPipeline`],
    /// [`PipelineError::WindowIndexOutOfRange`] or
    /// [`PipelineError::TransformIndexOutOfRange`] for a bad restart
    /// point, and the first stage error otherwise. Windows after a
    /// failing one are not run and keep their previous output.
    pub fn run_pipeline(
        &mut self,
        window_index: usize,
        transform_index: usize,
    ) -> Result<(DynamicImage, Extra), PipelineError> {
        if self.windows.is_empty() {
            return Err(PipelineError::EmptyPipeline);
        }
        let window_len = self.window(window_index)?.len();
        if transform_index > window_len {
            return Err(PipelineError::TransformIndexOutOfRange {
                index: transform_index,
                len: window_len,
            });
        }

        let (start, k, image, extra) = self.resume_point(window_index, transform_index);
        log::debug!("running pipeline from window {start} transform {k}");

        let mut result = (image, extra);
        for (i, window) in self.windows.iter_mut().enumerate().skip(start) {
            let from = if i == start { k } else { 0 };
            result = window.draw(&result.0, &result.1, from)?;
        }
        Ok(result)
    }

    /// Restart the pipeline at the point a param edit names.
    ///
    /// # Errors
    ///
    /// See [`run_pipeline`](Self::run_pipeline).
    pub fn apply_change(
        &mut self,
        change: &ParamChange,
    ) -> Result<(DynamicImage, Extra), PipelineError> {
        log::debug!(
            "{} changed in window {} transform {}",
            change.param,
            change.window_index,
            change.transform_index
        );
        self.run_pipeline(change.window_index, change.transform_index)
    }

    /// Store a param value and restart from its transform. `None` keeps
    /// the stored value and still restarts.
    ///
    /// # Errors
    ///
    /// Returns an error if the window, transform or param does not
    /// exist, the value is rejected, or the restarted run fails.
    pub fn store_value_and_start(
        &mut self,
        window_index: usize,
        transform_index: usize,
        name: &str,
        value: Option<ParamValue>,
    ) -> Result<(DynamicImage, Extra), PipelineError> {
        let change = self
            .window_mut(window_index)?
            .store_param(transform_index, name, value)?;
        self.apply_change(&change)
    }

    /// Replace the source image and re-run every window.
    ///
    /// # Errors
    ///
    /// See [`run_pipeline`](Self::run_pipeline).
    pub fn set_source(
        &mut self,
        image: DynamicImage,
    ) -> Result<(DynamicImage, Extra), PipelineError> {
        self.source = image;
        self.run_pipeline(0, 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;
    use crate::param::{Param, Params};
    use crate::transform::{Transform, TransformOp};

    /// Adds `step` to every pixel and counts how often it ran.
    #[derive(Debug)]
    struct Add(&'static str);

    impl TransformOp for Add {
        fn name(&self) -> &str {
            self.0
        }

        fn default_params(&self) -> Vec<Param> {
            vec![Param::int_slider("step", 1, -255, 255)]
        }

        #[allow(clippy::cast_possible_truncation)]
        fn apply(
            &self,
            params: &Params,
            image: DynamicImage,
            mut extra: Extra,
        ) -> Result<(DynamicImage, Extra), PipelineError> {
            let runs = extra.get(self.0).unwrap_or(0.0);
            extra.insert(self.0, runs + 1.0);
            Ok((image.brighten(params.int("step")? as i32), extra))
        }
    }

    fn window(tags: &[&'static str]) -> Window {
        Window::new(tags.iter().copied().map(|t| Transform::new(Add(t))).collect())
    }

    fn source() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, Luma([100])))
    }

    fn value(img: &DynamicImage) -> u8 {
        img.to_luma8().get_pixel(0, 0).0[0]
    }

    fn two_windows() -> Pipeline {
        Pipeline::new(source(), vec![window(&["a", "b"]), window(&["c"])])
    }

    #[test]
    fn windows_get_their_index() {
        let p = two_windows();
        assert_eq!(p.window(0).unwrap().index(), 0);
        assert_eq!(p.window(1).unwrap().index(), 1);
    }

    #[test]
    fn full_run_chains_windows() {
        let mut p = two_windows();
        let (out, extra) = p.run_pipeline(0, 0).unwrap();
        assert_eq!(value(&out), 103);
        assert_eq!(extra.len(), 3);
        assert_eq!(value(p.window(1).unwrap().last_in().unwrap()), 102);
        assert_eq!(value(p.output().unwrap().0), 103);
    }

    #[test]
    fn empty_pipeline_is_an_error() {
        let mut p = Pipeline::new(source(), Vec::new());
        assert!(matches!(
            p.run_pipeline(0, 0),
            Err(PipelineError::EmptyPipeline)
        ));
    }

    #[test]
    fn bad_restart_points_are_errors() {
        let mut p = two_windows();
        assert!(matches!(
            p.run_pipeline(2, 0),
            Err(PipelineError::WindowIndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            p.run_pipeline(0, 3),
            Err(PipelineError::TransformIndexOutOfRange { index: 3, len: 2 })
        ));
    }

    #[test]
    fn cached_restart_skips_upstream_stages() {
        let mut p = two_windows();
        p.run_pipeline(0, 0).unwrap();

        let (out, extra) = p
            .store_value_and_start(0, 1, "step", Some(ParamValue::Int(10)))
            .unwrap();
        assert_eq!(value(&out), 112);
        // Stage "a" was not re-run: its counter came from the cache.
        assert_eq!(extra.get("a"), Some(1.0));
        assert_eq!(p.window(0).unwrap().completed_runs(), 2);
        assert_eq!(p.window(1).unwrap().completed_runs(), 2);
    }

    #[test]
    fn restart_without_cache_falls_back_to_earlier_window() {
        let mut p = two_windows();
        let (out, _) = p.run_pipeline(1, 0).unwrap();
        assert_eq!(value(&out), 103);
        assert_eq!(p.window(0).unwrap().completed_runs(), 1);
    }

    #[test]
    fn restart_without_stage_cache_reruns_window() {
        let mut p = two_windows();
        let (out, _) = p.run_pipeline(0, 1).unwrap();
        assert_eq!(value(&out), 103);
    }

    #[test]
    fn storing_none_still_restarts() {
        let mut p = two_windows();
        p.run_pipeline(0, 0).unwrap();
        p.store_value_and_start(1, 0, "step", None).unwrap();
        assert_eq!(p.window(0).unwrap().completed_runs(), 1);
        assert_eq!(p.window(1).unwrap().completed_runs(), 2);
        assert_eq!(
            p.window(1).unwrap().transform(0).unwrap().params().int("step").unwrap(),
            1
        );
    }

    #[test]
    fn apply_change_uses_the_notified_point() {
        let mut p = two_windows();
        p.run_pipeline(0, 0).unwrap();
        let change = p
            .window_mut(1)
            .unwrap()
            .store_param(0, "step", Some(ParamValue::Int(-100)))
            .unwrap();
        let (out, _) = p.apply_change(&change).unwrap();
        assert_eq!(value(&out), 2);
        assert_eq!(p.window(0).unwrap().completed_runs(), 1);
    }

    #[test]
    fn set_source_reruns_everything() {
        let mut p = two_windows();
        p.run_pipeline(0, 0).unwrap();
        let (out, _) = p
            .set_source(DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 3, Luma([0]))))
            .unwrap();
        assert_eq!(value(&out), 3);
    }

    #[test]
    fn source_extra_reaches_first_window() {
        let mut seed = Extra::new();
        seed.insert("seed", 7.0);
        let mut p = two_windows().with_source_extra(seed);
        let (_, extra) = p.run_pipeline(0, 0).unwrap();
        assert_eq!(extra.get("seed"), Some(7.0));
    }
}
