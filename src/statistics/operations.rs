//! Accumulator strategies and running accumulators
//!
//! Each statistic is one [`Strategy`] applied through the same three steps:
//! `initial` (array the running value starts from), `update` (fold one snapshot in)
//! and `finalize` (normalise by the accepted count). `merge` combines two partial
//! running values of the same strategy, which is what per-file parallel passes use.
//!
//! Sums are plain running sums in `f64`; no compensated summation is done, so very
//! long series drift by the usual floating-point reassociation error.

use crate::derived::Snapshot;
use crate::errors::{Result, SampleError};
use crate::grid::Field;
use crate::record::StatKind;
use ndarray::{ArrayD, IxDyn, Zip};

/// Start value of running extrema: min starts at `+EXTREMUM_SENTINEL`,
/// max at `-EXTREMUM_SENTINEL`.
pub const EXTREMUM_SENTINEL: f64 = f64::MAX;

/// How one running array is updated and finalised
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Running sum, finalised to the mean
    Sum,
    /// Sum of squared deviation from a precomputed mean, finalised to the
    /// population standard deviation
    SumOfSquaredDeviation(Field),
    /// Elementwise minimum
    Min,
    /// Elementwise maximum
    Max,
    /// Sum of the product of two fields' deviations from their means, finalised to
    /// the covariance
    CrossMoment(Field, Field),
}

fn check_shape(expected: &Field, actual: &Field) -> Result<()> {
    if expected.shape() == actual.shape() {
        Ok(())
    } else {
        Err(SampleError::ShapeMismatch {
            expected: expected.len(),
            actual: actual.len(),
        })
    }
}

impl Strategy {
    #[must_use]
    pub fn kind(&self) -> StatKind {
        match self {
            Self::Sum => StatKind::Mean,
            Self::SumOfSquaredDeviation(_) => StatKind::Std,
            Self::Min => StatKind::Min,
            Self::Max => StatKind::Max,
            Self::CrossMoment(_, _) => StatKind::Correlation,
        }
    }

    /// Running array before any snapshot has been seen
    #[must_use]
    pub fn initial(&self, shape: &[usize]) -> Field {
        match self {
            Self::Min => ArrayD::from_elem(IxDyn(shape), EXTREMUM_SENTINEL),
            Self::Max => ArrayD::from_elem(IxDyn(shape), -EXTREMUM_SENTINEL),
            _ => ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// Fold one snapshot into `running`. `paired` is only read by
    /// [`Strategy::CrossMoment`] and defaults to `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::ShapeMismatch`] if any operand differs in shape from
    /// `running`.
    pub fn update(&self, running: &mut Field, sample: &Field, paired: Option<&Field>) -> Result<()> {
        check_shape(running, sample)?;
        match self {
            Self::Sum => {
                Zip::from(running).and(sample).for_each(|r, &x| *r += x);
            }
            Self::SumOfSquaredDeviation(mean) => {
                check_shape(sample, mean)?;
                Zip::from(running)
                    .and(sample)
                    .and(mean)
                    .for_each(|r, &x, &m| *r += (x - m) * (x - m));
            }
            Self::Min => {
                Zip::from(running).and(sample).for_each(|r, &x| {
                    if x < *r {
                        *r = x;
                    }
                });
            }
            Self::Max => {
                Zip::from(running).and(sample).for_each(|r, &x| {
                    if x > *r {
                        *r = x;
                    }
                });
            }
            Self::CrossMoment(mean_a, mean_b) => {
                let other = paired.unwrap_or(sample);
                check_shape(sample, other)?;
                check_shape(sample, mean_a)?;
                check_shape(sample, mean_b)?;
                Zip::from(running)
                    .and(sample)
                    .and(other)
                    .and(mean_a)
                    .and(mean_b)
                    .for_each(|r, &a, &b, &ma, &mb| *r += (a - ma) * (b - mb));
            }
        }
        Ok(())
    }

    /// Combine a partial running array from another file into `running`.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::ShapeMismatch`] if the partials differ in shape.
    pub fn merge(&self, running: &mut Field, partial: &Field) -> Result<()> {
        check_shape(running, partial)?;
        match self {
            Self::Min => Self::Min.update(running, partial, None),
            Self::Max => Self::Max.update(running, partial, None),
            _ => Self::Sum.update(running, partial, None),
        }
    }

    /// Normalise by the accepted count. With a count of zero the running array is
    /// returned untouched.
    #[must_use]
    pub fn finalize(&self, mut running: Field, count: usize) -> Field {
        if count == 0 {
            return running;
        }
        let n = count as f64;
        match self {
            Self::Sum | Self::CrossMoment(_, _) => running.mapv_inplace(|s| s / n),
            Self::SumOfSquaredDeviation(_) => running.mapv_inplace(|s| (s / n).sqrt()),
            Self::Min | Self::Max => {}
        }
        running
    }
}

/// One running statistic: output name, input field(s), strategy and running array
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    output: String,
    input: String,
    paired: Option<String>,
    strategy: Strategy,
    running: Option<Field>,
}

impl Accumulator {
    fn single(field: &str, strategy: Strategy) -> Self {
        Self {
            output: field.to_string(),
            input: field.to_string(),
            paired: None,
            strategy,
            running: None,
        }
    }

    #[must_use]
    pub fn sum(field: &str) -> Self {
        Self::single(field, Strategy::Sum)
    }

    #[must_use]
    pub fn min(field: &str) -> Self {
        Self::single(field, Strategy::Min)
    }

    #[must_use]
    pub fn max(field: &str) -> Self {
        Self::single(field, Strategy::Max)
    }

    #[must_use]
    pub fn squared_deviation(field: &str, mean: Field) -> Self {
        Self::single(field, Strategy::SumOfSquaredDeviation(mean))
    }

    #[must_use]
    pub fn cross_moment(output: &str, first: &str, second: &str, mean_first: Field, mean_second: Field) -> Self {
        Self {
            output: output.to_string(),
            input: first.to_string(),
            paired: Some(second.to_string()),
            strategy: Strategy::CrossMoment(mean_first, mean_second),
            running: None,
        }
    }

    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    #[must_use]
    pub fn kind(&self) -> StatKind {
        self.strategy.kind()
    }

    #[must_use]
    pub fn running(&self) -> Option<&Field> {
        self.running.as_ref()
    }

    /// Allocate the running array on first use; later calls keep the existing one.
    pub fn ensure_initialized(&mut self, shape: &[usize]) {
        if self.running.is_none() {
            self.running = Some(self.strategy.initial(shape));
        }
    }

    /// Fold the matching fields of `snapshot` in.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::FieldNotFound`] if an input field is missing from the
    /// snapshot, [`SampleError::ShapeMismatch`] on a shape disagreement.
    pub fn update(&mut self, snapshot: &Snapshot) -> Result<()> {
        let sample = snapshot
            .get(&self.input)
            .ok_or_else(|| SampleError::field_not_found(&self.input))?;
        let paired = match &self.paired {
            Some(name) => Some(
                snapshot
                    .get(name)
                    .ok_or_else(|| SampleError::field_not_found(name))?,
            ),
            None => None,
        };
        let running = self
            .running
            .get_or_insert_with(|| self.strategy.initial(sample.shape()));
        self.strategy.update(running, sample, paired)
    }

    /// Merge a partial accumulator of the same statistic.
    pub fn merge(&mut self, partial: &Accumulator) -> Result<()> {
        let Some(other) = &partial.running else {
            return Ok(());
        };
        match &mut self.running {
            Some(running) => self.strategy.merge(running, other),
            None => {
                self.running = Some(other.clone());
                Ok(())
            }
        }
    }

    /// Finalise into `(kind, output name, array)`; `None` if never initialised.
    #[must_use]
    pub fn finalize(self, count: usize) -> Option<(StatKind, String, Field)> {
        let kind = self.strategy.kind();
        let strategy = self.strategy;
        self.running
            .map(|running| (kind, self.output, strategy.finalize(running, count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(values: &[f64]) -> Field {
        ArrayD::from_shape_vec(IxDyn(&[values.len()]), values.to_vec()).unwrap()
    }

    fn snapshot(pairs: Vec<(&str, Vec<f64>)>) -> Snapshot {
        pairs
            .into_iter()
            .map(|(name, values)| (name.to_string(), field(&values)))
            .collect()
    }

    #[test]
    fn initial_values() {
        assert!(Strategy::Sum.initial(&[2, 2]).iter().all(|&v| v == 0.0));
        assert!(Strategy::Min.initial(&[3]).iter().all(|&v| v == f64::MAX));
        assert!(Strategy::Max.initial(&[3]).iter().all(|&v| v == -f64::MAX));
    }

    #[test]
    fn sum_finalizes_to_mean() -> Result<()> {
        let mut acc = Accumulator::sum("u");
        acc.update(&snapshot(vec![("u", vec![1.0, 2.0])]))?;
        acc.update(&snapshot(vec![("u", vec![3.0, 6.0])]))?;
        let (kind, name, mean) = acc.finalize(2).unwrap();
        assert_eq!(kind, StatKind::Mean);
        assert_eq!(name, "u");
        assert_eq!(mean, field(&[2.0, 4.0]));
        Ok(())
    }

    #[test]
    fn extrema_replace_strictly() -> Result<()> {
        let mut lo = Accumulator::min("u");
        let mut hi = Accumulator::max("u");
        for values in [vec![1.0, 5.0], vec![-2.0, 5.0], vec![0.0, 7.0]] {
            let s = snapshot(vec![("u", values)]);
            lo.update(&s)?;
            hi.update(&s)?;
        }
        assert_eq!(lo.finalize(3).unwrap().2, field(&[-2.0, 5.0]));
        assert_eq!(hi.finalize(3).unwrap().2, field(&[1.0, 7.0]));
        Ok(())
    }

    #[test]
    fn nan_never_replaces_extrema() -> Result<()> {
        let mut lo = Accumulator::min("u");
        lo.ensure_initialized(&[1]);
        lo.update(&snapshot(vec![("u", vec![f64::NAN])]))?;
        assert_eq!(lo.running().unwrap()[[0]], f64::MAX);
        Ok(())
    }

    #[test]
    fn squared_deviation_finalizes_to_std() -> Result<()> {
        let mut acc = Accumulator::squared_deviation("u", field(&[2.0]));
        for v in [1.0, 3.0, 1.0, 3.0] {
            acc.update(&snapshot(vec![("u", vec![v])]))?;
        }
        let (kind, _, std) = acc.finalize(4).unwrap();
        assert_eq!(kind, StatKind::Std);
        assert!((std[[0]] - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn cross_moment_is_covariance() -> Result<()> {
        let mut acc = Accumulator::cross_moment("uv", "u", "v", field(&[0.0]), field(&[1.0]));
        acc.update(&snapshot(vec![("u", vec![1.0]), ("v", vec![2.0])]))?;
        acc.update(&snapshot(vec![("u", vec![-1.0]), ("v", vec![0.0])]))?;
        let (kind, name, cov) = acc.finalize(2).unwrap();
        assert_eq!(kind, StatKind::Correlation);
        assert_eq!(name, "uv");
        assert!((cov[[0]] - 1.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn missing_input_is_reported() {
        let mut acc = Accumulator::cross_moment("uw", "u", "w", field(&[0.0]), field(&[0.0]));
        let result = acc.update(&snapshot(vec![("u", vec![1.0])]));
        match result {
            Err(SampleError::FieldNotFound { field }) => assert_eq!(field, "w"),
            _ => panic!("Expected FieldNotFound error"),
        }
    }

    #[test]
    fn shape_disagreement_is_an_error() {
        let mut acc = Accumulator::sum("u");
        acc.ensure_initialized(&[2]);
        let result = acc.update(&snapshot(vec![("u", vec![1.0, 2.0, 3.0])]));
        assert!(matches!(result, Err(SampleError::ShapeMismatch { .. })));
    }

    #[test]
    fn zero_count_leaves_running_untouched() {
        let mut acc = Accumulator::max("u");
        acc.ensure_initialized(&[2]);
        let (_, _, out) = acc.finalize(0).unwrap();
        assert!(out.iter().all(|&v| v == -f64::MAX));
    }

    #[test]
    fn merge_matches_single_stream() -> Result<()> {
        let samples = [
            vec![1.0, 9.0],
            vec![4.0, -1.0],
            vec![2.0, 3.0],
            vec![0.5, 8.0],
        ];
        let builders: [fn() -> Accumulator; 3] = [
            || Accumulator::sum("u"),
            || Accumulator::min("u"),
            || Accumulator::max("u"),
        ];
        for build in builders {
            let mut whole = build();
            let mut left = build();
            let mut right = build();
            for (i, values) in samples.iter().enumerate() {
                let s = snapshot(vec![("u", values.clone())]);
                whole.update(&s)?;
                if i < 2 {
                    left.update(&s)?;
                } else {
                    right.update(&s)?;
                }
            }
            left.merge(&right)?;
            assert_eq!(left.running(), whole.running());
        }
        Ok(())
    }

    #[test]
    fn ensure_initialized_keeps_existing() -> Result<()> {
        let mut acc = Accumulator::sum("u");
        acc.update(&snapshot(vec![("u", vec![1.0])]))?;
        acc.ensure_initialized(&[1]);
        assert_eq!(acc.running(), Some(&field(&[1.0])));
        Ok(())
    }
}
