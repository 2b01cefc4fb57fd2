//! cvpg: headless playground for tuning image-processing transforms.
//!
//! Loads an image (or a generated sample), selects one built-in
//! transform, applies param edits from flags, a JSON preset or an
//! interactive session on stdin, prints the resulting state and
//! optionally writes the rendered image.
//!
//! # Usage
//!
//! ```text
//! cargo run --bin cvpg -- [OPTIONS]
//! cvpg --image photo.jpg --transform Threshold --set thresh=90 --output out.png
//! cvpg --interactive --log-level DEBUG
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod error;
mod playground;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use cvpg_pipeline::{DynamicImage, TransformKind, collect_builtin_transforms};

use crate::error::AppError;
use crate::playground::{Options, Playground, run_interactive, sample_image};

/// Transform selected when `--transform` is not given.
const DEFAULT_TRANSFORM: TransformKind = TransformKind::Blur;

/// Tune image-processing transforms and re-run them over an image.
#[derive(Parser)]
#[command(name = "cvpg", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP). A generated
    /// sample is used when omitted.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Do not name documentation files in transform descriptions.
    #[arg(long)]
    no_docs: bool,

    /// Do not show the info payload (thresholds, counts) of the last run.
    #[arg(long)]
    disable_info_widgets: bool,

    /// Log level.
    #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Built-in transform to start with.
    #[arg(long)]
    transform: Option<String>,

    /// Param edit as NAME=VALUE; may be repeated, applied in order.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,

    /// Param edits as a JSON object of name/value pairs, applied before
    /// any `--set`.
    #[arg(long)]
    params_json: Option<String>,

    /// Write the final output image here; the format follows the
    /// extension.
    #[arg(long)]
    output: Option<PathBuf>,

    /// List built-in transforms and exit.
    #[arg(long)]
    list: bool,

    /// Print the final state as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Read commands from stdin before printing the final state.
    #[arg(long)]
    interactive: bool,
}

/// Log level names accepted by `--log-level`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    /// Same as `ERROR`; there is no separate critical level.
    #[value(name = "CRITICAL")]
    Critical,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "INFO")]
    Info,
    #[value(name = "DEBUG")]
    Debug,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Critical | LogLevel::Error => Self::Error,
            LogLevel::Warning => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
        }
    }
}

/// Initialise `env_logger` with `LEVEL:target:line:message` lines.
fn init_logging(level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(level.into())
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{}:{}:{}",
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}

/// Split a `--set` argument at its first `=`.
fn parse_assignment(arg: &str) -> Result<(&str, &str), AppError> {
    arg.split_once('=')
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| AppError::Assignment(arg.to_string()))
}

/// Read and decode the input image, or fall back to the sample.
fn load_source(path: Option<&Path>) -> Result<DynamicImage, AppError> {
    let Some(path) = path else {
        log::info!("no --image given, using the generated sample");
        return Ok(sample_image());
    };
    if !path.exists() {
        return Err(AppError::FileNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| AppError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = cvpg_pipeline::decode(&bytes)?;
    log::info!(
        "loaded {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

fn print_catalogue() {
    for kind in collect_builtin_transforms() {
        println!("{:<14} {}", kind.name(), kind.summary());
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    if cli.list {
        print_catalogue();
        return Ok(());
    }

    let source = load_source(cli.image.as_deref())?;
    let kind = match &cli.transform {
        Some(name) => TransformKind::from_name(name)?,
        None => DEFAULT_TRANSFORM,
    };
    let options = Options {
        show_docs: !cli.no_docs,
        show_info: !cli.disable_info_widgets,
    };
    let mut playground = Playground::new(source, kind, options);

    if let Some(ref json) = cli.params_json {
        playground.apply_json(json)?;
    }
    for arg in &cli.set {
        let (name, value) = parse_assignment(arg)?;
        playground.set(name, value)?;
    }

    if cli.interactive {
        let stdin = std::io::stdin();
        run_interactive(&mut playground, stdin.lock(), std::io::stdout().lock())?;
        println!();
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&playground.describe_json())?);
    } else {
        print!("{}", playground.describe());
    }

    if let Some(ref path) = cli.output {
        playground.save(path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["cvpg"]).unwrap();
        assert_eq!(cli.log_level, LogLevel::Info);
        assert!(cli.image.is_none());
        assert!(cli.set.is_empty());
        assert!(!cli.no_docs && !cli.disable_info_widgets);
    }

    #[test]
    fn log_level_names() {
        let cli = Cli::try_parse_from(["cvpg", "--log-level", "CRITICAL"]).unwrap();
        assert_eq!(log::LevelFilter::from(cli.log_level), log::LevelFilter::Error);
        let cli = Cli::try_parse_from(["cvpg", "--log-level", "warning"]).unwrap();
        assert_eq!(log::LevelFilter::from(cli.log_level), log::LevelFilter::Warn);
        assert!(Cli::try_parse_from(["cvpg", "--log-level", "TRACE"]).is_err());
    }

    #[test]
    fn repeated_set_flags_keep_order() {
        let cli =
            Cli::try_parse_from(["cvpg", "--set", "thresh=90", "--set", "use_otsu=true"]).unwrap();
        assert_eq!(cli.set, ["thresh=90", "use_otsu=true"]);
    }

    #[test]
    fn assignment_splits_at_first_equals() {
        assert_eq!(parse_assignment("kernel=1,2;3,4").unwrap(), ("kernel", "1,2;3,4"));
        assert_eq!(parse_assignment(" a = b=c ").unwrap(), ("a", "b=c"));
        assert!(matches!(parse_assignment("thresh"), Err(AppError::Assignment(_))));
        assert!(parse_assignment("=5").is_err());
    }

    #[test]
    fn missing_image_is_file_not_found() {
        let err = load_source(Some(Path::new("/definitely/not/here.png"))).unwrap_err();
        assert!(matches!(err, AppError::FileNotFound(_)));
    }

    #[test]
    fn no_image_uses_sample() {
        let img = load_source(None).unwrap();
        assert_eq!((img.width(), img.height()), (256, 256));
    }

    #[test]
    fn unknown_transform_fails_run() {
        let cli = Cli::try_parse_from(["cvpg", "--transform", "Sobel"]).unwrap();
        assert!(matches!(
            run(&cli),
            Err(AppError::Pipeline(cvpg_pipeline::PipelineError::UnknownTransform(_)))
        ));
    }

    #[test]
    fn headless_run_writes_output() {
        let path = std::env::temp_dir().join(format!("cvpg-main-{}.png", std::process::id()));
        let cli = Cli::try_parse_from([
            "cvpg",
            "--transform",
            "Threshold",
            "--set",
            "use_otsu=true",
            "--output",
            path.to_str().unwrap(),
        ])
        .unwrap();
        run(&cli).unwrap();
        let written = image::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!((written.width(), written.height()), (256, 256));
    }
}
