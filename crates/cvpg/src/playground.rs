//! The playground session: one source image, one selected transform, and
//! the last image that rendered successfully.
//!
//! Param edits go through [`Pipeline::store_value_and_start`]. When an
//! edit or a run fails the error is handed back to the caller and the
//! previous output stays on display.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::Path;

use cvpg_pipeline::{
    Dimensions, DynamicImage, Extra, ParamValue, Pipeline, PipelineError, TransformKind,
    collect_builtin_transforms, to_display_rgba, transform_index, transform_window,
};

use crate::error::AppError;

/// What [`Playground::describe`] includes besides the params.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Name each transform's documentation file.
    pub show_docs: bool,
    /// Show the `extra` payload of the last run.
    pub show_info: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            show_docs: true,
            show_info: true,
        }
    }
}

/// Image shown when no `--image` is given: a horizontal ramp with a
/// bright disc and a dark square, so every built-in has edges and
/// levels to work with.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn sample_image() -> DynamicImage {
    const SIZE: u32 = 256;
    DynamicImage::ImageRgb8(image::RgbImage::from_fn(SIZE, SIZE, |x, y| {
        let (fx, fy) = (f64::from(x), f64::from(y));
        let in_disc = (fx - 170.0).hypot(fy - 90.0) < 50.0;
        let in_square = (40..110).contains(&x) && (140..210).contains(&y);
        if in_disc {
            image::Rgb([240, 200, 60])
        } else if in_square {
            image::Rgb([20, 40, 90])
        } else {
            let ramp = (fx / f64::from(SIZE - 1) * 200.0) as u8;
            image::Rgb([ramp, ramp / 2 + 40, 255 - ramp])
        }
    }))
}

/// Render a JSON preset value in the text syntax params parse.
fn json_to_text(name: &str, value: &serde_json::Value) -> Result<String, AppError> {
    use serde_json::Value;

    let scalar = |v: &Value| match v {
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(AppError::JsonValue(name.to_string())),
    };
    let row = |items: &[Value]| -> Result<String, AppError> {
        Ok(items.iter().map(scalar).collect::<Result<Vec<_>, _>>()?.join(","))
    };
    match value {
        Value::Array(items) if items.iter().all(Value::is_array) => {
            let rows: Vec<String> = items
                .iter()
                .filter_map(Value::as_array)
                .map(|r| row(r))
                .collect::<Result<_, _>>()?;
            Ok(rows.join(";"))
        }
        Value::Array(items) => row(items),
        other => scalar(other),
    }
}

/// Build a window for `kind` and run it once, logging a failed run.
fn start(source: &DynamicImage, kind: TransformKind) -> (Pipeline, Option<(DynamicImage, Extra)>) {
    let mut pipeline = Pipeline::new(source.clone(), vec![transform_window(kind)]);
    let output = match pipeline.run_pipeline(0, 0) {
        Ok(output) => Some(output),
        Err(e) => {
            log::error!("{kind} failed on the source image: {e}");
            None
        }
    };
    (pipeline, output)
}

/// A headless playground session.
#[derive(Debug)]
pub struct Playground {
    source: DynamicImage,
    options: Options,
    kind: TransformKind,
    pipeline: Pipeline,
    last_good: Option<(DynamicImage, Extra)>,
}

impl Playground {
    /// Start a session on `source` with `kind` selected.
    #[must_use]
    pub fn new(source: DynamicImage, kind: TransformKind, options: Options) -> Self {
        let (pipeline, last_good) = start(&source, kind);
        Self {
            source,
            options,
            kind,
            pipeline,
            last_good,
        }
    }

    /// Selected transform.
    #[must_use]
    pub const fn kind(&self) -> TransformKind {
        self.kind
    }

    /// Last successfully rendered image.
    #[must_use]
    pub fn output(&self) -> Option<&DynamicImage> {
        self.last_good.as_ref().map(|(img, _)| img)
    }

    /// Payload of the last successful run.
    #[must_use]
    pub fn extra(&self) -> Option<&Extra> {
        self.last_good.as_ref().map(|(_, extra)| extra)
    }

    /// Switch to another built-in, discarding the current window and
    /// its edits.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownTransform`] for an unknown name.
    pub fn select(&mut self, name: &str) -> Result<(), PipelineError> {
        let kind = TransformKind::from_name(name)?;
        let (pipeline, last_good) = start(&self.source, kind);
        log::info!("selected {kind}");
        self.kind = kind;
        self.pipeline = pipeline;
        self.last_good = last_good;
        Ok(())
    }

    /// Parse `text` for param `name` of the selected transform, store it
    /// and re-run. On failure the previous output is kept.
    ///
    /// # Errors
    ///
    /// Returns the parse, validation or stage error.
    pub fn set(&mut self, name: &str, text: &str) -> Result<(), PipelineError> {
        let kind = self
            .pipeline
            .window(0)?
            .transform(0)?
            .params()
            .get(name)
            .map(|p| p.kind().clone())
            .ok_or_else(|| PipelineError::UnknownParam {
                transform: self.kind.name().to_string(),
                param: name.to_string(),
            })?;
        let value = ParamValue::parse(&kind, name, text)?;
        let output = self
            .pipeline
            .store_value_and_start(0, 0, name, Some(value))?;
        self.last_good = Some(output);
        Ok(())
    }

    /// Re-run the selected window from a signed transform index, as
    /// typed by the user. On failure the previous output is kept.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NegativeTransformIndex`] for negative
    /// indices, [`PipelineError::TransformIndexOutOfRange`] past the end
    /// and the stage error otherwise.
    pub fn rerun(&mut self, index: i64) -> Result<(), PipelineError> {
        let index = transform_index(index)?;
        let output = self.pipeline.run_pipeline(0, index)?;
        self.last_good = Some(output);
        Ok(())
    }

    /// Apply a JSON object of `name: value` pairs, in key order.
    ///
    /// Scalars, arrays and arrays of arrays are accepted, in the shapes
    /// the matching param kinds expect.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Json`] if `json` is not an object, and the
    /// first failing edit otherwise.
    pub fn apply_json(&mut self, json: &str) -> Result<(), AppError> {
        let preset: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        for (name, value) in &preset {
            let text = json_to_text(name, value)?;
            self.set(name, &text)?;
        }
        Ok(())
    }

    /// Human-readable summary of the selected transform.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Transform: {}", self.kind);
        if let Ok(transform) = self.pipeline.window(0).and_then(|w| w.transform(0)) {
            if self.options.show_docs {
                let _ = writeln!(out, "Docs: {}", transform.doc_filename());
            }
            for param in transform.params() {
                let _ = write!(
                    out,
                    "  {} ({}) [{}] = {}",
                    param.name(),
                    param.label(),
                    param.kind().type_name(),
                    param.value()
                );
                if !param.help_text().is_empty() {
                    let _ = write!(out, "  # {}", param.help_text());
                }
                out.push('\n');
            }
        }
        if self.options.show_info
            && let Some(extra) = self.extra().filter(|e| !e.is_empty())
        {
            out.push_str("Info:\n");
            for (key, value) in extra.iter() {
                let _ = writeln!(out, "  {key} = {value}");
            }
        }
        match self.output().map(Dimensions::of) {
            Some(dims) => {
                let _ = writeln!(out, "Output: {}x{}", dims.width, dims.height);
            }
            None => out.push_str("Output: none\n"),
        }
        out
    }

    /// Machine-readable summary of the selected transform.
    #[must_use]
    pub fn describe_json(&self) -> serde_json::Value {
        let transform = self.pipeline.window(0).and_then(|w| w.transform(0)).ok();
        let mut json = serde_json::json!({
            "transform": self.kind.name(),
            "params": transform.map(|t| t.params()),
            "has_output": self.last_good.is_some(),
        });
        if self.options.show_docs {
            json["docs"] = transform.map(|t| t.doc_filename()).into();
        }
        if self.options.show_info {
            json["extra"] = serde_json::to_value(self.extra()).unwrap_or_default();
        }
        json
    }

    /// Write the last good output, converted for display, to `path`.
    /// The format follows the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoOutput`] before any successful run and
    /// [`AppError::ImageEncode`] if writing fails.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let image = self.output().ok_or(AppError::NoOutput)?;
        to_display_rgba(image)
            .save(path)
            .map_err(|source| AppError::ImageEncode {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!(
            "saved {} ({}x{})",
            path.display(),
            image.width(),
            image.height()
        );
        Ok(())
    }

    fn list(&self) -> String {
        let mut out = String::new();
        for kind in collect_builtin_transforms() {
            let marker = if kind == self.kind { '*' } else { ' ' };
            let _ = writeln!(out, "{marker} {:<14} {}", kind.name(), kind.summary());
        }
        out
    }

    /// Run one interactive command.
    ///
    /// # Errors
    ///
    /// Returns edit, selection and save failures; the session itself is
    /// still usable afterwards.
    pub fn execute(&mut self, line: &str) -> Result<Reply, AppError> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Reply::Nothing);
        };
        let rest: Vec<&str> = words.collect();
        match (command, rest.as_slice()) {
            ("list", []) => Ok(Reply::Text(self.list())),
            ("select", [name]) => {
                self.select(name)?;
                Ok(Reply::Text(self.describe()))
            }
            ("set", [name, value @ ..]) if !value.is_empty() => {
                self.set(name, &value.join(" "))?;
                Ok(Reply::Text(self.describe()))
            }
            ("run", []) => {
                self.rerun(0)?;
                Ok(Reply::Text(self.describe()))
            }
            ("run", [index]) if index.parse::<i64>().is_ok() => {
                self.rerun(index.parse().unwrap_or_default())?;
                Ok(Reply::Text(self.describe()))
            }
            ("show", []) => Ok(Reply::Text(self.describe())),
            ("save", [path]) => {
                self.save(Path::new(path))?;
                Ok(Reply::Nothing)
            }
            ("help", []) => Ok(Reply::Text(HELP.to_string())),
            ("quit" | "exit", []) => Ok(Reply::Quit),
            _ => Ok(Reply::Text(format!("unrecognized command: {line}\n{HELP}"))),
        }
    }
}

const HELP: &str = "\
commands:
  list               list built-in transforms
  select NAME        switch to another transform
  set NAME VALUE     edit a param of the selected transform
  run [INDEX]        re-run from transform INDEX (default 0)
  show               describe the selected transform
  save PATH          write the current output image
  help               show this help
  quit               leave the session
";

/// Result of an interactive command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print this.
    Text(String),
    /// Nothing to print.
    Nothing,
    /// End the session.
    Quit,
}

/// Read commands from `input` until `quit` or end of input.
///
/// Command errors are logged and the session continues with the last
/// good image.
///
/// # Errors
///
/// Returns [`AppError::Console`] if reading or writing fails.
pub fn run_interactive(
    playground: &mut Playground,
    input: impl BufRead,
    mut output: impl Write,
) -> Result<(), AppError> {
    write!(output, "{}> ", playground.kind())?;
    output.flush()?;
    for line in input.lines() {
        match playground.execute(&line?) {
            Ok(Reply::Text(text)) => write!(output, "{text}")?,
            Ok(Reply::Nothing) => {}
            Ok(Reply::Quit) => return Ok(()),
            Err(e) => log::error!("{e}"),
        }
        write!(output, "{}> ", playground.kind())?;
        output.flush()?;
    }
    Ok(())
}
