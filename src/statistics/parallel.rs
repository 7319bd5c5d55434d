//! Per-file parallel folding
//!
//! Each file is folded into its own copy of the accumulator set on a Rayon pool.
//! Results come back in file order, so the caller can merge them deterministically.

use super::fold::{fold_file, FileOutcome, FilePlan};
use super::operations::Accumulator;
use super::request::AggregateRequest;
use crate::data_source::SampleSource;
use crate::errors::Result;
use crate::parallel::ParallelConfig;
use crate::progress::ProgressTracker;
use log::debug;
use rayon::prelude::*;

/// Fold every plan into a fresh copy of `template`, concurrently.
///
/// # Errors
///
/// Returns the first failing file's error, or [`SampleError::ThreadPool`] if the
/// dedicated pool cannot be built.
///
/// [`SampleError::ThreadPool`]: crate::errors::SampleError::ThreadPool
pub(crate) fn fold_files_parallel(
    source: &dyn SampleSource,
    plans: &[FilePlan],
    group: &str,
    request: &AggregateRequest,
    template: &[Accumulator],
    tracker: &ProgressTracker<'_>,
    config: &ParallelConfig,
) -> Result<Vec<(FileOutcome, Vec<Accumulator>)>> {
    let fold_all = || {
        debug!(
            "⚡ Folding {} files across {} threads",
            plans.len(),
            rayon::current_num_threads()
        );
        plans
            .par_iter()
            .enumerate()
            .map(|(i, plan)| {
                let mut partial = template.to_vec();
                let outcome = fold_file(source, plan, group, request, &mut partial, i == 0, tracker)?;
                Ok((outcome, partial))
            })
            .collect::<Result<Vec<_>>>()
    };

    match config.build_pool()? {
        Some(pool) => pool.install(fold_all),
        None => fold_all(),
    }
}
