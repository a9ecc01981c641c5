//! Command-line driver for the stackview image stack engine.
//!
//! Builds a synthetic stack, applies a sequence of view operations and
//! prints what a viewer would display as JSON.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{Parser, Subcommand};
use log::{debug, info, LevelFilter};
use ndarray::{Array3, Array4, ArrayD};
use serde::{Deserialize, Serialize};
use stackview_algorithms::smooth;
use stackview_engine::{
    ColorModel, EngineConfig, FrameMeta, FrameRange, FrameStats, ImageStack, Levels, LoadOptions,
    NormOp, Normalize, ReduceOp, Reference, Region, ViewState,
};
use sysinfo::System;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Core error: {0}")]
    Core(#[from] stackview_core::Error),

    #[error("Memory budget: {0}")]
    Budget(String),
}

/// Settings file contents; every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Settings {
    engine: EngineConfig,
    load: LoadOptions,
    /// Share of available memory a loaded stack may use when no explicit
    /// budget is configured.
    memory_fraction: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            load: LoadOptions::default(),
            memory_fraction: 0.5,
        }
    }
}

impl Settings {
    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&text)?;
        info!("Read settings from {}", path.display());
        Ok(settings)
    }

    /// Fills in the memory budget from available system memory.
    fn resolve_budget(mut self) -> Result<Self> {
        if self.load.memory_budget_bytes.is_some() {
            return Ok(self);
        }
        if !(0.0 < self.memory_fraction && self.memory_fraction <= 1.0) {
            return Err(CliError::Budget(
                "memory_fraction must be in (0.0, 1.0]".to_string(),
            ));
        }
        let mut system = System::new();
        system.refresh_memory();
        let available = system.available_memory();
        if available == 0 {
            return Err(CliError::Budget(
                "available system memory reported as 0".to_string(),
            ));
        }
        let budget = (available as f64 * self.memory_fraction).floor() as u64;
        let budget = usize::try_from(budget).unwrap_or(usize::MAX);
        debug!("Memory budget {} bytes", budget);
        self.load = self.load.with_memory_budget_bytes(budget);
        Ok(self)
    }
}

/// One view operation, written `name[:args]`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Reduce(ReduceOp),
    Unravel,
    Normalize {
        op: NormOp,
        range: FrameRange,
        force: bool,
    },
    Mask(Region),
    Transpose,
    FlipX,
    FlipY,
    Reset,
}

fn parse_named<T>(text: &str) -> std::result::Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    text.parse().map_err(|e: T::Err| e.to_string())
}

fn parse_number<T: FromStr>(text: &str, what: &str) -> std::result::Result<T, String> {
    text.trim()
        .parse()
        .map_err(|_| format!("invalid {what} '{text}'"))
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        match (name, args.as_slice()) {
            ("reduce", [op]) => Ok(Self::Reduce(parse_named(op)?)),
            ("unravel", []) => Ok(Self::Unravel),
            ("normalize" | "normalize-force", [op, left, right, rest @ ..]) if rest.len() <= 1 => {
                let mut range = FrameRange::new(
                    parse_number(left, "left frame")?,
                    parse_number(right, "right frame")?,
                );
                if let Some(beta) = rest.first() {
                    range = range.with_beta(parse_number(beta, "beta")?);
                }
                Ok(Self::Normalize {
                    op: parse_named(op)?,
                    range,
                    force: name == "normalize-force",
                })
            }
            ("mask", [rect]) => {
                let values = rect
                    .split(',')
                    .map(|v| parse_number::<f64>(v, "mask value"))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                match values.as_slice() {
                    &[row, col, height, width] => {
                        Ok(Self::Mask(Region::new((row, col), (height, width))))
                    }
                    _ => Err(format!("mask expects ROW,COL,HEIGHT,WIDTH, got '{rect}'")),
                }
            }
            ("transpose", []) => Ok(Self::Transpose),
            ("flip-x", []) => Ok(Self::FlipX),
            ("flip-y", []) => Ok(Self::FlipY),
            ("reset", []) => Ok(Self::Reset),
            _ => Err(format!("unknown step '{s}'")),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reduce(op) => write!(f, "reduce:{op}"),
            Self::Unravel => f.write_str("unravel"),
            Self::Normalize { op, range, force } => {
                let name = if *force { "normalize-force" } else { "normalize" };
                write!(f, "{name}:{op}:{}:{}:{}", range.left, range.right, range.beta)
            }
            Self::Mask(r) => write!(f, "mask:{},{},{},{}", r.row, r.col, r.height, r.width),
            Self::Transpose => f.write_str("transpose"),
            Self::FlipX => f.write_str("flip-x"),
            Self::FlipY => f.write_str("flip-y"),
            Self::Reset => f.write_str("reset"),
        }
    }
}

impl Step {
    fn apply(self, stack: &mut ImageStack) -> stackview_core::Result<()> {
        match self {
            Self::Reduce(op) => stack.reduce(op),
            Self::Unravel => stack.unravel(),
            Self::Normalize { op, range, force } => {
                let request = Normalize::new(op, Reference::Range(range));
                let request = if force { request.forced() } else { request };
                stack.normalize(&request)?;
            }
            Self::Mask(region) => {
                stack.mask(&region)?;
            }
            Self::Transpose => stack.transpose(),
            Self::FlipX => stack.flip_x(),
            Self::FlipY => stack.flip_y(),
            Self::Reset => stack.reset(),
        }
        Ok(())
    }
}

/// Interactive image stack engine, driven from the command line.
#[derive(Parser)]
#[command(name = "stackview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON settings file (engine and load options)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply view operations to a synthetic stack and report the result
    Run {
        /// Number of frames
        #[arg(long, default_value = "16")]
        frames: usize,

        /// Frame height in pixels
        #[arg(long, default_value = "64")]
        height: usize,

        /// Frame width in pixels
        #[arg(long, default_value = "64")]
        width: usize,

        /// Generate RGB frames
        #[arg(long)]
        color: bool,

        /// Convert RGB frames to grayscale on load
        #[arg(long)]
        grayscale: bool,

        /// Load only this share of the frames
        #[arg(long)]
        subset: Option<f64>,

        /// Shrink every frame to this share of its height and width
        #[arg(long)]
        size_ratio: Option<f64>,

        /// Rescale every frame to 0..=255 relative to its maximum
        #[arg(long)]
        eight_bit: bool,

        /// Operation to apply, e.g. `reduce:mean`, `normalize:subtract:0:3:0.9`,
        /// `mask:10,10,20,20`; repeatable
        #[arg(long = "op")]
        ops: Vec<Step>,

        /// Region `ROW,COL,HEIGHT,WIDTH` whose mean per frame is reported
        #[arg(long, value_parser = parse_region)]
        roi: Option<Region>,

        /// Moving-average window applied to the ROI curve
        #[arg(long, default_value = "1")]
        smooth: usize,
    },

    /// Print the effective settings
    Config,
}

fn parse_region(s: &str) -> std::result::Result<Region, String> {
    match format!("mask:{s}").parse::<Step>()? {
        Step::Mask(region) => Ok(region),
        _ => Err(format!("invalid region '{s}'")),
    }
}

/// Outcome of one step.
#[derive(Debug, Serialize)]
struct StepReport {
    step: String,
    applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RoiReport {
    frames: Vec<f64>,
    means: Vec<f64>,
}

/// What the viewer would show after all steps.
#[derive(Debug, Serialize)]
struct Report {
    raw_shape: Vec<usize>,
    shape: Vec<usize>,
    grayscale: bool,
    single_frame: bool,
    state: ViewState,
    stats: Option<FrameStats>,
    levels: Option<Levels>,
    first_frame: Option<String>,
    center_pixel: Option<String>,
    steps: Vec<StepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    roi: Option<RoiReport>,
}

fn synthetic_stack(frames: usize, height: usize, width: usize, color: bool) -> (ArrayD<f64>, Vec<FrameMeta>) {
    let value = |f: usize, r: usize, c: usize| {
        let ramp = (r + c) as f64;
        let pulse = ((f * 37 + r * 11 + c * 7) % 17) as f64;
        ramp * (1.0 + f as f64 / frames.max(1) as f64) + pulse
    };
    let (raw, model, channels) = if color {
        let raw = Array4::from_shape_fn((frames, height, width, 3), |(f, r, c, k)| {
            value(f, r, c) * (1.0 + k as f64 * 0.25)
        });
        (raw.into_dyn(), ColorModel::Rgb, 3)
    } else {
        let raw = Array3::from_shape_fn((frames, height, width), |(f, r, c)| value(f, r, c));
        (raw.into_dyn(), ColorModel::Grayscale, 1)
    };
    let frame_bytes = height * width * channels * std::mem::size_of::<f64>();
    let meta = FrameMeta::numbered("synthetic", frames, (height, width), "f64", 64, model, frame_bytes);
    (raw, meta)
}

fn run_steps(stack: &mut ImageStack, steps: &[Step]) -> Vec<StepReport> {
    steps
        .iter()
        .map(|&step| {
            let outcome = step.apply(stack);
            info!("{step}: {}", if outcome.is_ok() { "applied" } else { "rejected" });
            StepReport {
                step: step.to_string(),
                applied: outcome.is_ok(),
                error: outcome.err().map(|e| e.to_string()),
            }
        })
        .collect()
}

fn roi_report(stack: &ImageStack, region: &Region, window: usize) -> Option<RoiReport> {
    let curve = stack.roi_curve(region)?;
    let frames: Vec<f64> = (0..curve.len()).map(|i| i as f64).collect();
    if window <= 1 {
        return Some(RoiReport {
            frames,
            means: curve.to_vec(),
        });
    }
    let (frames, means) = smooth(&frames, &curve.to_vec(), window);
    Some(RoiReport { frames, means })
}

fn report(stack: &ImageStack, steps: Vec<StepReport>, roi: Option<RoiReport>) -> Report {
    let shape = stack.shape();
    let center_pixel = match shape.as_slice() {
        [_, rows, cols, ..] => stack.pixel(0, rows / 2, cols / 2).map(|v| v.to_string()),
        _ => None,
    };
    let first_frame = stack
        .frame_label(0)
        .map(|label| format!("{}/{} {}", label.index, label.last, label.name));
    Report {
        raw_shape: stack.raw_shape().to_vec(),
        grayscale: stack.is_grayscale(),
        single_frame: stack.is_single_frame(),
        state: stack.view_state(),
        stats: stack.stats(),
        levels: stack.levels(),
        first_frame,
        center_pixel,
        shape,
        steps,
        roi,
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Run {
            frames,
            height,
            width,
            color,
            grayscale,
            subset,
            size_ratio,
            eight_bit,
            ops,
            roi,
            smooth,
        } => {
            let settings = settings.resolve_budget()?;
            let grayscale = grayscale || settings.load.grayscale;
            let eight_bit = eight_bit || settings.load.convert_to_8_bit;
            let mut options = settings
                .load
                .with_grayscale(grayscale)
                .with_convert_to_8_bit(eight_bit);
            if let Some(ratio) = subset {
                options = options.with_subset_ratio(ratio);
            }
            if let Some(ratio) = size_ratio {
                options = options.with_size_ratio(ratio);
            }

            let (raw, meta) = synthetic_stack(frames, height, width, color);
            let mut stack = ImageStack::with_options(raw, meta, settings.engine, &options)?;
            let steps = run_steps(&mut stack, &ops);
            let roi = roi.and_then(|region| roi_report(&stack, &region, smooth));

            let report = report(&stack, steps, roi);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Config => {
            let settings = settings.resolve_budget()?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}
