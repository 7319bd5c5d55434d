//! Streaming statistics over sampled planes
//!
//! This module provides the temporal statistics engine: a single streaming fold over
//! the accepted timesteps of one or more files, parameterised by accumulator
//! strategies.
//!
//! # Organization
//!
//! This module is organized into submodules:
//! - [`operations`]: accumulator strategies and running accumulators
//! - [`request`]: aggregation requests and correlation pairs
//! - [`fold`]: file planning and the generic fold
//! - [`parallel`]: per-file parallel folding
//! - [`passes`]: mean, min/max/std, correlation and combined passes

pub mod fold;
pub mod operations;
pub mod parallel;
pub mod passes;
pub mod request;

// Re-export the main types and functions for convenience
pub use fold::{plan_files, run_fold, FilePlan, FoldResult};
pub use operations::{Accumulator, Strategy, EXTREMUM_SENTINEL};
pub use passes::{combined_pass, mean_pass, min_max_std_pass, reynolds_stress_pass, Aggregator};
pub use request::{AggregateRequest, Correlation, DEFAULT_VARIABLES};
