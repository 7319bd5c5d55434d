//! The generic streaming fold shared by every aggregation pass
//!
//! A pass runs in two stages. [`plan_files`] feeds every file's time vector through
//! one [`WindowCursor`](crate::window::WindowCursor), in file order, producing the
//! accepted `(timestep, time)` pairs per file. [`fold_file`] then opens one file's
//! group, reads each planned snapshot, evaluates the extra functions, optionally
//! projects onto the point subset and folds the result into a set of
//! [`Accumulator`]s. Only one snapshot per field is alive at a time.

use super::operations::Accumulator;
use super::parallel::fold_files_parallel;
use super::request::AggregateRequest;
use crate::data_source::{Attributes, SampleSource};
use crate::derived::{extend_snapshot, Snapshot};
use crate::errors::{Result, SampleError};
use crate::extract::read_snapshot;
use crate::grid::{select_points, SpatialGrid};
use crate::parallel::ParallelConfig;
use crate::progress::{ProgressReporter, ProgressTracker};
use log::{debug, info};
use std::path::PathBuf;

/// Accepted timesteps of one file
#[derive(Debug, Clone, PartialEq)]
pub struct FilePlan {
    pub path: PathBuf,
    /// `(timestep index, time)` in file order
    pub steps: Vec<(usize, f64)>,
}

/// Run the continuation filter over every file of `request`, in order.
///
/// # Errors
///
/// Returns [`SampleError::SourceUnavailable`] when no file is given or a time vector
/// cannot be read.
pub fn plan_files(source: &dyn SampleSource, request: &AggregateRequest) -> Result<Vec<FilePlan>> {
    if request.files.is_empty() {
        return Err(SampleError::unavailable("", "no input files given"));
    }
    let mut cursor = request.window.cursor();
    request
        .files
        .iter()
        .map(|path| {
            let times = source.read_times(path)?;
            let steps = cursor.plan(&times);
            info!(
                "{}: {} of {} timesteps inside [{}, {}]",
                path.display(),
                steps.len(),
                times.len(),
                request.window.start,
                request.window.end
            );
            Ok(FilePlan {
                path: path.clone(),
                steps,
            })
        })
        .collect()
}

/// What one file contributed besides its accumulator updates
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub count: usize,
    pub times: Vec<f64>,
    pub grid: Option<SpatialGrid>,
    pub attributes: Option<Attributes>,
}

/// Fold every planned snapshot of one file into `accumulators`.
///
/// The grid is read only when `read_grid` is set and the attributes only when the
/// request asks for them. The group handle is dropped before returning.
pub(crate) fn fold_file(
    source: &dyn SampleSource,
    plan: &FilePlan,
    group_name: &str,
    request: &AggregateRequest,
    accumulators: &mut [Accumulator],
    read_grid: bool,
    tracker: &ProgressTracker<'_>,
) -> Result<FileOutcome> {
    let group = source.open_group(&plan.path, group_name)?;
    let shape = group.grid_shape(request.layout)?;
    let accumulated_shape = match &request.points {
        Some(points) => vec![points.len()],
        None => shape.clone(),
    };

    let grid = if read_grid {
        let grid = group.grid(&shape)?;
        Some(match &request.points {
            Some(points) => grid.select_points(points)?,
            None => grid,
        })
    } else {
        None
    };

    for acc in accumulators.iter_mut() {
        acc.ensure_initialized(&accumulated_shape);
    }

    let mut times = Vec::with_capacity(plan.steps.len());
    for &(itime, t) in &plan.steps {
        debug!(
            "accumulating timestep {} (t = {}) of group '{}' from {}",
            itime,
            t,
            group.name(),
            plan.path.display()
        );
        let mut snapshot = read_snapshot(
            group.as_ref(),
            &request.variables,
            itime,
            &shape,
            request.replace_nan,
        )?;
        extend_snapshot(&mut snapshot, &request.extra_functions, &shape)?;
        if let Some(points) = &request.points {
            snapshot = project(snapshot, points)?;
        }
        for acc in accumulators.iter_mut() {
            acc.update(&snapshot)?;
        }
        times.push(t);
        tracker.tick();
    }

    let attributes = if request.include_attributes {
        Some(group.attributes()?)
    } else {
        None
    };

    Ok(FileOutcome {
        count: times.len(),
        times,
        grid,
        attributes,
    })
}

fn project(snapshot: Snapshot, points: &[usize]) -> Result<Snapshot> {
    snapshot
        .into_iter()
        .map(|(name, field)| Ok((name, select_points(&field, points)?)))
        .collect()
}

/// Result of folding all files of a request
#[derive(Debug, Clone)]
pub struct FoldResult {
    pub group: String,
    pub count: usize,
    pub times: Vec<f64>,
    pub grid: Option<SpatialGrid>,
    pub attributes: Option<Attributes>,
    pub accumulators: Vec<Accumulator>,
}

/// Plan, then fold every file into `accumulators`, sequentially or per file in
/// parallel as `config` says. Grid comes from the first file, attributes from the
/// last one.
///
/// # Errors
///
/// Returns [`SampleError::DuplicateName`] before opening any file when an extra
/// function reuses the name of another tracked quantity.
pub fn run_fold(
    source: &dyn SampleSource,
    request: &AggregateRequest,
    mut accumulators: Vec<Accumulator>,
    config: &ParallelConfig,
    progress: Option<&dyn ProgressReporter>,
) -> Result<FoldResult> {
    request.validate()?;
    let plans = plan_files(source, request)?;
    let group = source.resolve_group(&plans[0].path, request.group.as_deref())?;
    let total: usize = plans.iter().map(|p| p.steps.len()).sum();
    let tracker = ProgressTracker::new(progress, total);
    debug!(
        "folding {} accumulators over {} files of group '{}' ({} timesteps)",
        accumulators.len(),
        plans.len(),
        group,
        total
    );

    let outcomes = if config.per_file && plans.len() > 1 {
        let partials = fold_files_parallel(source, &plans, &group, request, &accumulators, &tracker, config)?;
        let mut outcomes = Vec::with_capacity(partials.len());
        for (outcome, partial) in partials {
            for (acc, part) in accumulators.iter_mut().zip(&partial) {
                acc.merge(part)?;
            }
            outcomes.push(outcome);
        }
        outcomes
    } else {
        plans
            .iter()
            .enumerate()
            .map(|(i, plan)| fold_file(source, plan, &group, request, &mut accumulators, i == 0, &tracker))
            .collect::<Result<Vec<_>>>()?
    };

    let mut result = FoldResult {
        group,
        count: 0,
        times: Vec::with_capacity(total),
        grid: None,
        attributes: None,
        accumulators,
    };
    for outcome in outcomes {
        result.count += outcome.count;
        result.times.extend(outcome.times);
        if result.grid.is_none() {
            result.grid = outcome.grid;
        }
        if outcome.attributes.is_some() {
            result.attributes = outcome.attributes;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_io::{MemoryFile, MemoryGroup, MemorySource};
    use crate::window::TimeWindow;

    fn file(times: Vec<f64>) -> MemoryFile {
        let rows = times.iter().map(|&t| vec![t, 2.0 * t]).collect();
        let group = MemoryGroup::new(&[2, 1, 1], vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]).with_field("u", rows);
        MemoryFile::new(times).with_group("p_hub", group)
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_file("a.nc", file(vec![0.0, 1.0, 2.0]))
            .with_file("b.nc", file(vec![2.0, 3.0, 4.0]))
    }

    #[test]
    fn plan_counts_shared_boundary_once() -> Result<()> {
        let request = AggregateRequest::new(["a.nc", "b.nc"], TimeWindow::new(0.0, 4.0));
        let plans = plan_files(&source(), &request)?;
        assert_eq!(plans[0].steps.len(), 3);
        assert_eq!(plans[1].steps, vec![(1, 3.0), (2, 4.0)]);
        Ok(())
    }

    #[test]
    fn no_files_is_unavailable() {
        let request = AggregateRequest::new(Vec::<PathBuf>::new(), TimeWindow::new(0.0, 4.0));
        assert!(matches!(
            plan_files(&source(), &request),
            Err(SampleError::SourceUnavailable { .. })
        ));
    }

    #[test]
    fn sequential_and_per_file_agree() -> Result<()> {
        let src = source();
        let request = AggregateRequest::new(["a.nc", "b.nc"], TimeWindow::new(0.0, 4.0)).variables(&["u"]);
        let template = vec![Accumulator::sum("u"), Accumulator::max("u")];

        let sequential = run_fold(&src, &request, template.clone(), &ParallelConfig::default(), None)?;
        assert_eq!(src.peak_open_handles(), 1);
        let per_file = run_fold(
            &src,
            &request,
            template,
            &ParallelConfig::with_threads(2).per_file(true),
            None,
        )?;

        assert_eq!(sequential.count, 5);
        assert_eq!(per_file.count, 5);
        assert_eq!(sequential.times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(per_file.times, sequential.times);
        assert_eq!(sequential.accumulators, per_file.accumulators);
        assert_eq!(sequential.accumulators[0].running().unwrap().as_slice(), Some(&[10.0, 20.0][..]));
        assert_eq!(src.open_handles(), 0);
        Ok(())
    }

    #[test]
    fn grid_projected_onto_points() -> Result<()> {
        let request = AggregateRequest::new(["a.nc"], TimeWindow::new(0.0, 1.0))
            .variables(&["u"])
            .points(vec![1]);
        let result = run_fold(&source(), &request, vec![Accumulator::sum("u")], &ParallelConfig::default(), None)?;
        let grid = result.grid.unwrap();
        assert_eq!(grid.x.as_slice(), Some(&[1.0][..]));
        assert_eq!(result.accumulators[0].running().unwrap().as_slice(), Some(&[2.0][..]));
        Ok(())
    }
}
