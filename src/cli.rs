//! Defines command-line interface options using `clap` for the sample_planes application.

use clap::{Parser, ValueEnum};
use sample_planes::AxisOrdering;
use std::path::{Path, PathBuf};

/// A CLI tool for extracting and averaging sampled flow planes
#[derive(Parser, Debug)]
#[command(
    version,
    name = "sample_planes",
    about = "Streaming statistics over sampled planes in NetCDF files"
)]
pub struct Args {
    /// NetCDF sample files, in time order
    #[arg(short, long, required = true, num_args = 1..)]
    pub file: Vec<PathBuf>,

    /// Sampler group to read. Defaults to the first group of the first file
    #[arg(short, long)]
    pub group: Option<String>,

    /// List groups, grid dimensions and fields of each file
    #[arg(long)]
    pub list_groups: bool,

    /// Fields to process, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = default_vars())]
    pub vars: Vec<String>,

    /// Time window for statistics, formatted as <t1>:<t2>
    #[arg(long, value_parser = parse_window_arg)]
    pub window: Option<(f64, f64)>,

    /// Statistic to compute over the window
    #[arg(long, value_enum)]
    pub stat: Option<StatArg>,

    /// Extract snapshots at these timestep indices (negative counts from the end)
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, num_args = 0..)]
    pub extract: Option<Vec<i64>>,

    /// Read every timestep of the velocity components on the sorted plane axes,
    /// with times spaced by this output interval
    #[arg(long, value_name = "OUTPUT_DT", conflicts_with = "extract")]
    pub full_plane: Option<f64>,

    /// Spatial dimension order for --full-plane, e.g. xzy or x,z,y
    #[arg(long, default_value = "xzy", value_parser = parse_ordering_arg)]
    pub ordering: AxisOrdering,

    /// Restrict to these flat point indices, comma separated
    #[arg(long, value_delimiter = ',')]
    pub points: Vec<usize>,

    /// Keep points flat (line samplers)
    #[arg(long)]
    pub line: bool,

    /// Replace NaN samples by zero before averaging
    #[arg(long)]
    pub replace_nan: bool,

    /// Copy group attributes into the result
    #[arg(long)]
    pub include_attrs: bool,

    /// Include timestamps of extracted timesteps
    #[arg(long)]
    pub include_times: bool,

    /// Path to save the result as JSON
    #[arg(long)]
    pub output_json: Option<PathBuf>,

    /// Path to save statistics as NetCDF
    #[arg(long)]
    pub output_netcdf: Option<PathBuf>,

    /// Worker threads for --per-file-parallel. Defaults to Rayon's global pool size
    #[arg(short = 't', long, requires = "per_file_parallel")]
    pub threads: Option<usize>,

    /// Fold the input files concurrently
    #[arg(long)]
    pub per_file_parallel: bool,

    /// Draw a progress bar while accumulating
    #[arg(long)]
    pub progress: bool,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Statistics selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatArg {
    /// Temporal mean
    Mean,
    /// Minimum, maximum and standard deviation (with the mean)
    MinMaxStd,
    /// Reynolds stresses uu, uv, uw, vv, vw, ww (with the mean)
    Reynolds,
    /// Mean, min/max/std and Reynolds stresses in two sweeps
    All,
}

impl Args {
    /// The one input file of a single-file mode (--extract, --full-plane)
    pub fn single_file(&self, mode: &str) -> Result<&Path, String> {
        match self.file.as_slice() {
            [path] => Ok(path),
            files => Err(format!("{mode} reads one file, got {}", files.len())),
        }
    }
}

fn default_vars() -> Vec<String> {
    sample_planes::DEFAULT_VARIABLES
        .iter()
        .map(|v| v.to_string())
        .collect()
}

fn parse_window_arg(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [start, end] => {
            let start = start
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid window start '{start}'"))?;
            let end = end
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid window end '{end}'"))?;
            Ok((start, end))
        }
        _ => Err("Invalid format: Expected '<t1>:<t2>'.".to_string()),
    }
}

fn parse_ordering_arg(s: &str) -> Result<AxisOrdering, String> {
    s.parse().map_err(|e: sample_planes::SampleError| e.to_string())
}
