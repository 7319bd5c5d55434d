//! Aggregation passes: mean, min/max/std, correlations and the combined sweep
//!
//! Every pass builds a set of [`Accumulator`]s, hands them to
//! [`run_fold`](super::fold::run_fold) and finalises them with the grand accepted
//! count. Passes that need the mean (std and correlations) either take a
//! precomputed mean record or run a mean pass of their own first. Setting
//! [`AggregateRequest::points`] turns any pass into its point variant.

use super::fold::{run_fold, FoldResult};
use super::operations::Accumulator;
use super::request::{AggregateRequest, Correlation};
use crate::data_source::SampleSource;
use crate::errors::{Result, SampleError};
use crate::grid::Field;
use crate::parallel::ParallelConfig;
use crate::progress::ProgressReporter;
use crate::record::{Statistics, StatsRecord};
use log::{debug, info};

/// Runs aggregation passes against one data source
pub struct Aggregator<'a> {
    source: &'a dyn SampleSource,
    parallel: ParallelConfig,
    progress: Option<&'a dyn ProgressReporter>,
}

impl<'a> Aggregator<'a> {
    pub fn new(source: &'a dyn SampleSource) -> Self {
        Self {
            source,
            parallel: ParallelConfig::default(),
            progress: None,
        }
    }

    #[must_use]
    pub fn with_parallel(mut self, config: ParallelConfig) -> Self {
        self.parallel = config;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, reporter: &'a dyn ProgressReporter) -> Self {
        self.progress = Some(reporter);
        self
    }

    fn fold(&self, request: &AggregateRequest, accumulators: Vec<Accumulator>) -> Result<FoldResult> {
        run_fold(self.source, request, accumulators, &self.parallel, self.progress)
    }

    /// Temporal mean of every variable and extra function.
    ///
    /// # Errors
    ///
    /// Fails fast on the first unreadable file, missing field or shape mismatch.
    pub fn mean(&self, request: &AggregateRequest) -> Result<StatsRecord> {
        info!("Computing averages");
        let accumulators = request
            .tracked_names()
            .iter()
            .map(|name| Accumulator::sum(name))
            .collect();
        let fold = self.fold(request, accumulators)?;
        Ok(finish(fold, request, None))
    }

    /// Minimum, maximum and standard deviation of every tracked quantity. The returned
    /// record also carries the means used.
    ///
    /// # Errors
    ///
    /// As [`Aggregator::mean`], plus [`SampleError::FieldNotFound`] if `mean` lacks a
    /// tracked quantity.
    pub fn min_max_std(&self, request: &AggregateRequest, mean: Option<&StatsRecord>) -> Result<StatsRecord> {
        let computed;
        let mean = match mean {
            Some(record) => record,
            None => {
                computed = self.mean(request)?;
                &computed
            }
        };
        let request = continuing(request, mean);

        info!("Calculating min/max/std");
        let mut accumulators = Vec::new();
        for name in request.tracked_names() {
            accumulators.push(Accumulator::min(&name));
            accumulators.push(Accumulator::max(&name));
            accumulators.push(Accumulator::squared_deviation(&name, mean_of(mean, &name)?));
        }
        let fold = self.fold(&request, accumulators)?;
        Ok(finish(fold, &request, Some(mean)))
    }

    /// Covariance of each pair in `pairs`, about the means.
    ///
    /// # Errors
    ///
    /// As [`Aggregator::min_max_std`].
    pub fn correlations(
        &self,
        request: &AggregateRequest,
        pairs: &[Correlation],
        mean: Option<&StatsRecord>,
    ) -> Result<StatsRecord> {
        let request = request.covering(pairs);
        let computed;
        let mean = match mean {
            Some(record) => record,
            None => {
                computed = self.mean(&request)?;
                &computed
            }
        };
        let request = continuing(&request, mean);

        info!("Calculating correlations");
        let accumulators = cross_moments(pairs, mean)?;
        let fold = self.fold(&request, accumulators)?;
        Ok(finish(fold, &request, Some(mean)))
    }

    /// The six Reynolds stresses `uu, uv, uw, vv, vw, ww` of the velocity components.
    pub fn reynolds_stress(&self, request: &AggregateRequest, mean: Option<&StatsRecord>) -> Result<StatsRecord> {
        self.correlations(request, &Correlation::reynolds_stresses(), mean)
    }

    /// Mean in a first sweep, then min/max/std and the correlations of `pairs` in a
    /// single second sweep.
    ///
    /// # Errors
    ///
    /// As [`Aggregator::min_max_std`].
    pub fn combined(&self, request: &AggregateRequest, pairs: &[Correlation]) -> Result<StatsRecord> {
        let request = request.covering(pairs);
        let mean = self.mean(&request)?;
        let request = continuing(&request, &mean);

        info!("Calculating min/max/std and correlations");
        let mut accumulators = Vec::new();
        for name in request.tracked_names() {
            accumulators.push(Accumulator::min(&name));
            accumulators.push(Accumulator::max(&name));
            accumulators.push(Accumulator::squared_deviation(&name, mean_of(&mean, &name)?));
        }
        accumulators.extend(cross_moments(pairs, &mean)?);
        let fold = self.fold(&request, accumulators)?;
        Ok(finish(fold, &request, Some(&mean)))
    }

    /// [`Aggregator::combined`] restricted to flat point indices.
    pub fn combined_at_points(
        &self,
        request: &AggregateRequest,
        points: Vec<usize>,
        pairs: &[Correlation],
    ) -> Result<StatsRecord> {
        self.combined(&request.clone().points(points), pairs)
    }
}

/// The second sweep reads the group the mean was taken from.
fn continuing(request: &AggregateRequest, mean: &StatsRecord) -> AggregateRequest {
    let mut request = request.clone();
    if request.group.is_none() {
        request.group = Some(mean.group.clone());
    }
    request
}

fn mean_of(mean: &StatsRecord, name: &str) -> Result<Field> {
    mean.mean(name)
        .cloned()
        .ok_or_else(|| SampleError::field_not_found(format!("{name} (mean)")))
}

fn cross_moments(pairs: &[Correlation], mean: &StatsRecord) -> Result<Vec<Accumulator>> {
    pairs
        .iter()
        .map(|pair| {
            Ok(Accumulator::cross_moment(
                &pair.name,
                &pair.first,
                &pair.second,
                mean_of(mean, &pair.first)?,
                mean_of(mean, &pair.second)?,
            ))
        })
        .collect()
}

/// Finalise `fold` into a record, on top of the statistics already in `base`.
fn finish(fold: FoldResult, request: &AggregateRequest, base: Option<&StatsRecord>) -> StatsRecord {
    let mut stats = base.map_or_else(Statistics::default, |b| b.stats.clone());
    let count = fold.count;
    for acc in fold.accumulators {
        if let Some((kind, name, field)) = acc.finalize(count) {
            stats.get_mut(kind).insert(name, field);
        }
    }
    if count == 0 {
        debug!("no timesteps inside the window; statistics left at their initial values");
    }
    StatsRecord {
        group: fold.group,
        window: request.window,
        grid: fold.grid,
        times: fold.times,
        count,
        stats,
        attributes: fold
            .attributes
            .or_else(|| base.and_then(|b| b.attributes.clone())),
        points: request.points.clone(),
    }
}

/// Sequential [`Aggregator::mean`]
pub fn mean_pass(source: &dyn SampleSource, request: &AggregateRequest) -> Result<StatsRecord> {
    Aggregator::new(source).mean(request)
}

/// Sequential [`Aggregator::min_max_std`]
pub fn min_max_std_pass(
    source: &dyn SampleSource,
    request: &AggregateRequest,
    mean: Option<&StatsRecord>,
) -> Result<StatsRecord> {
    Aggregator::new(source).min_max_std(request, mean)
}

/// Sequential [`Aggregator::reynolds_stress`]
pub fn reynolds_stress_pass(
    source: &dyn SampleSource,
    request: &AggregateRequest,
    mean: Option<&StatsRecord>,
) -> Result<StatsRecord> {
    Aggregator::new(source).reynolds_stress(request, mean)
}

/// Sequential [`Aggregator::combined`]
pub fn combined_pass(
    source: &dyn SampleSource,
    request: &AggregateRequest,
    pairs: &[Correlation],
) -> Result<StatsRecord> {
    Aggregator::new(source).combined(request, pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_io::{MemoryFile, MemoryGroup, MemorySource};
    use crate::record::StatKind;
    use crate::window::TimeWindow;

    // one point, u = t, v = 2t
    fn source() -> MemorySource {
        let times = vec![1.0, 2.0, 3.0];
        let group = MemoryGroup::new(&[1, 1, 1], vec![0.0, 0.0, 0.0])
            .with_field("u", times.iter().map(|&t| vec![t]).collect())
            .with_field("v", times.iter().map(|&t| vec![2.0 * t]).collect());
        MemorySource::new().with_file("a.nc", MemoryFile::new(times).with_group("p_hub", group))
    }

    fn value(record: &StatsRecord, kind: StatKind, name: &str) -> f64 {
        record.field(kind, name).unwrap().iter().copied().next().unwrap()
    }

    #[test]
    fn min_max_std_carries_mean() -> Result<()> {
        let request = AggregateRequest::new(["a.nc"], TimeWindow::new(0.0, 10.0)).variables(&["u"]);
        let record = min_max_std_pass(&source(), &request, None)?;
        assert_eq!(record.count, 3);
        assert_eq!(value(&record, StatKind::Mean, "u"), 2.0);
        assert_eq!(value(&record, StatKind::Min, "u"), 1.0);
        assert_eq!(value(&record, StatKind::Max, "u"), 3.0);
        assert!((value(&record, StatKind::Std, "u") - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn precomputed_mean_is_used() -> Result<()> {
        let src = source();
        let request = AggregateRequest::new(["a.nc"], TimeWindow::new(0.0, 10.0)).variables(&["u"]);
        let mut mean = mean_pass(&src, &request)?;
        // shift the injected mean; the std must follow it
        mean.stats.mean.get_mut("u").unwrap().fill(0.0);
        let record = min_max_std_pass(&src, &request, Some(&mean))?;
        let expected = ((1.0 + 4.0 + 9.0) / 3.0f64).sqrt();
        assert!((value(&record, StatKind::Std, "u") - expected).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn missing_mean_field_reported() {
        let src = source();
        let request = AggregateRequest::new(["a.nc"], TimeWindow::new(0.0, 10.0)).variables(&["u"]);
        let mean = mean_pass(&src, &request).unwrap();
        let wider = request.variables(&["u", "v"]);
        assert!(matches!(
            min_max_std_pass(&src, &wider, Some(&mean)),
            Err(SampleError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn combined_matches_separate_passes() -> Result<()> {
        let src = source();
        let request = AggregateRequest::new(["a.nc"], TimeWindow::new(0.0, 10.0)).variables(&["u"]);
        let pairs = vec![Correlation::new("uv", "u", "v")];
        let combined = combined_pass(&src, &request, &pairs)?;
        let separate = Aggregator::new(&src).correlations(&request, &pairs, None)?;
        assert_eq!(
            combined.field(StatKind::Correlation, "uv"),
            separate.field(StatKind::Correlation, "uv")
        );
        // cov(t, 2t) over {1, 2, 3} = 2 * var(t)
        assert!((value(&combined, StatKind::Correlation, "uv") - 4.0 / 3.0).abs() < 1e-12);
        assert!(combined.field(StatKind::Std, "v").is_some());
        Ok(())
    }
}
