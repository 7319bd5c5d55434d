//! Result records returned by extraction and aggregation
//!
//! Statistics are grouped by [`StatKind`] rather than by suffixed string keys; the
//! `<name>_<suffix>` spelling only appears when a record is written to a file.

use crate::data_source::Attributes;
use crate::errors::Result;
use crate::grid::{Axis, Field, SpatialGrid};
use crate::window::TimeWindow;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Arrays keyed by field (or derived-quantity, or correlation) name
pub type FieldSet = BTreeMap<String, Field>;

/// Supported statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StatKind {
    /// Temporal mean
    Mean,
    /// Elementwise minimum
    Min,
    /// Elementwise maximum
    Max,
    /// Population standard deviation about the mean
    Std,
    /// Covariance of two fields about their means
    Correlation,
}

impl StatKind {
    pub const ALL: [StatKind; 5] = [
        StatKind::Mean,
        StatKind::Min,
        StatKind::Max,
        StatKind::Std,
        StatKind::Correlation,
    ];

    /// Get the string representation of the statistic
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Min => "minimum",
            Self::Max => "maximum",
            Self::Std => "standard deviation",
            Self::Correlation => "correlation",
        }
    }

    /// Suffix used for variable names in written files
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Mean | Self::Correlation => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Std => "std",
        }
    }
}

/// Finalised statistics, one sub-map per kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub mean: FieldSet,
    pub min: FieldSet,
    pub max: FieldSet,
    pub std: FieldSet,
    pub correlation: FieldSet,
}

impl Statistics {
    #[must_use]
    pub fn get(&self, kind: StatKind) -> &FieldSet {
        match kind {
            StatKind::Mean => &self.mean,
            StatKind::Min => &self.min,
            StatKind::Max => &self.max,
            StatKind::Std => &self.std,
            StatKind::Correlation => &self.correlation,
        }
    }

    pub fn get_mut(&mut self, kind: StatKind) -> &mut FieldSet {
        match kind {
            StatKind::Mean => &mut self.mean,
            StatKind::Min => &mut self.min,
            StatKind::Max => &mut self.max,
            StatKind::Std => &mut self.std,
            StatKind::Correlation => &mut self.correlation,
        }
    }

    /// Every `(kind, name, array)` in kind order
    pub fn iter(&self) -> impl Iterator<Item = (StatKind, &String, &Field)> {
        StatKind::ALL
            .into_iter()
            .flat_map(move |kind| self.get(kind).iter().map(move |(name, f)| (kind, name, f)))
    }
}

/// Output of an aggregation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRecord {
    /// Group the statistics were taken from
    pub group: String,
    pub window: TimeWindow,
    /// Coordinates, restricted to `points` when a point subset was requested
    pub grid: Option<SpatialGrid>,
    /// Accepted times, in processing order
    pub times: Vec<f64>,
    /// Number of accepted timesteps over all files
    pub count: usize,
    pub stats: Statistics,
    pub attributes: Option<Attributes>,
    pub points: Option<Vec<usize>>,
}

impl StatsRecord {
    /// True when no timestep fell inside the window. Arrays are then left at their
    /// initial values (zeros for sums, ±`f64::MAX` for extrema) and must not be read
    /// as statistics.
    #[must_use]
    pub fn is_empty_window(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn field(&self, kind: StatKind, name: &str) -> Option<&Field> {
        self.stats.get(kind).get(name)
    }

    #[must_use]
    pub fn mean(&self, name: &str) -> Option<&Field> {
        self.field(StatKind::Mean, name)
    }

    /// Shape shared by every array in the record
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match &self.grid {
            Some(grid) => grid.shape().to_vec(),
            None => self
                .stats
                .iter()
                .next()
                .map(|(_, _, f)| f.shape().to_vec())
                .unwrap_or_default(),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }
}

/// Snapshots pulled from full planes (or lines)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaneRecord {
    pub group: String,
    pub grid: SpatialGrid,
    /// Resolved timestep indices, in request order
    pub timesteps: Vec<usize>,
    pub times: Option<Vec<f64>>,
    /// field name → timestep index → snapshot
    pub fields: BTreeMap<String, BTreeMap<usize, Field>>,
    pub attributes: Option<Attributes>,
}

impl PlaneRecord {
    #[must_use]
    pub fn snapshot(&self, field: &str, timestep: usize) -> Option<&Field> {
        self.fields.get(field)?.get(&timestep)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }
}

/// Time series of individual points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    pub group: String,
    pub grid: SpatialGrid,
    pub points: Vec<usize>,
    pub timesteps: Vec<usize>,
    pub times: Option<Vec<f64>>,
    /// point index → field name → one value per timestep
    pub series: BTreeMap<usize, BTreeMap<String, Vec<f64>>>,
    pub attributes: Option<Attributes>,
}

impl PointRecord {
    #[must_use]
    pub fn series(&self, point: usize, field: &str) -> Option<&[f64]> {
        self.series.get(&point)?.get(field).map(Vec::as_slice)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }
}

/// Every timestep of a plane, laid out on its sorted coordinate axes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullPlaneRecord {
    pub group: String,
    /// Timestep index times the output interval
    pub times: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// Dimension names of every field array: `times`, then the axis ordering
    pub dims: Vec<String>,
    /// Velocity components, shaped `(times, ordering...)`
    pub fields: FieldSet,
}

impl FullPlaneRecord {
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &[f64] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }
}

/// Serialize any record as pretty-printed JSON.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;
    use ndarray::IxDyn;
    use tempfile::tempdir;

    fn record() -> StatsRecord {
        let mut stats = Statistics::default();
        stats
            .mean
            .insert("velocityx".to_string(), ArrayD::from_elem(IxDyn(&[2]), 1.5));
        stats
            .std
            .insert("velocityx".to_string(), ArrayD::zeros(IxDyn(&[2])));
        StatsRecord {
            group: "p_hub".to_string(),
            window: TimeWindow::new(0.0, 1.0),
            grid: None,
            times: vec![0.0, 1.0],
            count: 2,
            stats,
            attributes: None,
            points: None,
        }
    }

    #[test]
    fn lookup_by_kind() {
        let record = record();
        assert!(record.mean("velocityx").is_some());
        assert!(record.field(StatKind::Max, "velocityx").is_none());
        assert_eq!(record.shape(), vec![2]);
        assert!(!record.is_empty_window());

        let kinds: Vec<StatKind> = record.stats.iter().map(|(k, _, _)| k).collect();
        assert_eq!(kinds, vec![StatKind::Mean, StatKind::Std]);
    }

    #[test]
    fn suffixes_match_file_convention() {
        assert_eq!(StatKind::Mean.suffix(), "avg");
        assert_eq!(StatKind::Std.suffix(), "std");
        assert_eq!(StatKind::Correlation.suffix(), "avg");
    }

    #[test]
    fn json_written() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("stats.json");
        record().write_json(&path)?;
        let text = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(value["count"], 2);
        assert_eq!(value["group"], "p_hub");
        Ok(())
    }
}
