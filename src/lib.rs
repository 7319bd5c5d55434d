//! sample_planes: streaming statistics over sampled flow planes
//!
//! A Rust library for post-processing planar and line sampler output stored in
//! grouped NetCDF files. sample_planes extracts snapshots and point time series and
//! computes temporal statistics (mean, min, max, standard deviation and two-point
//! correlations such as Reynolds stresses) over a time window that may span several
//! files, without ever holding the full time series in memory.
//!
//! ## Key Features
//!
//! - **Streaming Statistics**: one fold over the accepted timesteps, one snapshot alive at a time
//! - **Multi-file Windows**: a timestep shared by consecutive files is counted once
//! - **Derived Quantities**: user functions accumulated exactly like sampled fields
//! - **Parallel Processing**: optional per-file folding on a Rayon pool
//! - **NetCDF & JSON Output**: results written with the source attributes attached
//!
//! ## Module Organization
//!
//! - [`grid`]: flat rows to grid-shaped arrays
//! - [`window`]: time-window filtering and multi-file continuation
//! - [`data_source`]: the file-format abstraction; [`netcdf_io`] and [`memory_io`] implement it
//! - [`extract`]: plane, line, point and full-plane extraction
//! - [`statistics`]: accumulators, the streaming fold and the aggregation passes
//! - [`derived`]: user-supplied derived quantities
//! - [`record`]: result records and JSON output
//! - [`metadata`]: group inspection
//! - [`parallel`]: parallel processing configuration
//! - [`progress`]: progress reporting
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use sample_planes::prelude::*;
//!
//! let source = NetcdfSource::new();
//! let request = AggregateRequest::new(["run1.nc", "run2.nc"], TimeWindow::new(300.0, 600.0))
//!     .group("p_hub");
//! let mean = mean_pass(&source, &request).unwrap();
//! let stress = reynolds_stress_pass(&source, &request, Some(&mean)).unwrap();
//! if !stress.is_empty_window() {
//!     write_stats_to_netcdf(&stress, std::path::Path::new("stress.nc")).unwrap();
//! }
//! ```

// Core modules
pub mod data_source;
pub mod derived;
pub mod errors;
pub mod extract;
pub mod grid;
pub mod memory_io;
pub mod metadata;
pub mod netcdf_io;
pub mod parallel;
pub mod progress;
pub mod record;
pub mod statistics;
pub mod window;

// Direct re-exports for the public API
pub use data_source::{Attributes, SampleGroup, SampleSource};
pub use derived::{ExtraFunction, Snapshot};
pub use errors::{Result, SampleError};
pub use extract::{extract_full_plane, extract_planes, extract_points, resolve_timestep, ExtractRequest};
pub use grid::{Axis, AxisOrdering, Field, GridLayout, SpatialGrid};
pub use memory_io::{MemoryFile, MemoryGroup, MemorySource};
pub use netcdf_io::{write_stats_to_netcdf, NetCDFWriter, NetcdfSource};
pub use parallel::ParallelConfig;
pub use record::{FullPlaneRecord, PlaneRecord, PointRecord, StatKind, Statistics, StatsRecord};
pub use statistics::{
    combined_pass, mean_pass, min_max_std_pass, reynolds_stress_pass, Accumulator, AggregateRequest, Aggregator,
    Correlation, Strategy, DEFAULT_VARIABLES,
};
pub use window::{TimeWindow, WindowCursor};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::data_source::{SampleGroup, SampleSource};
    pub use crate::derived::{ExtraFunction, Snapshot};
    pub use crate::errors::{Result, SampleError};
    pub use crate::extract::{extract_full_plane, extract_planes, extract_points, ExtractRequest};
    pub use crate::grid::{AxisOrdering, Field, GridLayout};
    pub use crate::memory_io::{MemoryFile, MemoryGroup, MemorySource};
    pub use crate::netcdf_io::{write_stats_to_netcdf, NetCDFWriter, NetcdfSource};
    pub use crate::parallel::ParallelConfig;
    pub use crate::progress::{ConsoleProgress, ProgressReporter};
    pub use crate::record::{StatKind, StatsRecord};
    pub use crate::statistics::{
        combined_pass, mean_pass, min_max_std_pass, reynolds_stress_pass, AggregateRequest, Aggregator,
        Correlation,
    };
    pub use crate::window::TimeWindow;
}
