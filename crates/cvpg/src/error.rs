//! Errors surfaced by the `cvpg` binary.

use std::path::PathBuf;

use cvpg_pipeline::PipelineError;

/// Everything that can stop a `cvpg` run.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// `--image` names a path that does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Reading an input file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Writing to stdout or reading commands from stdin failed.
    #[error("console I/O failed: {0}")]
    Console(#[from] std::io::Error),

    /// `--params-json` is not valid JSON, or not a JSON object.
    #[error("invalid params JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A param value in a JSON preset cannot be expressed as text.
    #[error("unsupported JSON value for param {0}")]
    JsonValue(String),

    /// A `--set` argument without `=`.
    #[error("invalid assignment {0:?}: expected NAME=VALUE")]
    Assignment(String),

    /// The pipeline rejected an edit or a stage failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// There is no output image to save yet.
    #[error("no output image to save")]
    NoOutput,

    /// Encoding or writing the output image failed.
    #[error("failed to write {}: {source}", path.display())]
    ImageEncode {
        /// Destination path.
        path: PathBuf,
        /// Underlying error.
        source: image::ImageError,
    },
}
