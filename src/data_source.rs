//! Data source abstraction for sampled-plane files
//!
//! The statistics engine never touches a file format directly. It talks to a
//! [`SampleSource`], which can enumerate the groups of a file, open one group as a
//! [`SampleGroup`], and read a top-level variable such as the time coordinate.
//!
//! A [`SampleGroup`] owns whatever handle backs it; dropping the box releases the
//! handle, so every caller in this crate keeps the box scoped to one file.

use crate::errors::{Result, SampleError};
use crate::grid::{natural_shape, reshape, Field, GridLayout, SpatialGrid};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;

/// Name of the top-level time coordinate
pub const TIME_VARIABLE: &str = "time";

/// Group attribute holding the sampler grid dimensions in (i, j, k) order
pub const IJK_DIMS_ATTRIBUTE: &str = "ijk_dims";

/// Dataset-level attributes, converted to JSON values
pub type Attributes = BTreeMap<String, JsonValue>;

/// A file format that stores sampler groups
pub trait SampleSource: Sync {
    /// List group names in storage order
    fn list_groups(&self, path: &Path) -> Result<Vec<String>>;

    /// Open a group; the returned handle is released when dropped
    fn open_group(&self, path: &Path, group: &str) -> Result<Box<dyn SampleGroup>>;

    /// Read a top-level variable without opening any group
    fn read_variable(&self, path: &Path, name: &str) -> Result<Vec<f64>>;

    /// Read the time coordinate of a file
    fn read_times(&self, path: &Path) -> Result<Vec<f64>> {
        self.read_variable(path, TIME_VARIABLE)
    }

    /// Use `group` if given, otherwise the first group of the file
    fn resolve_group(&self, path: &Path, group: Option<&str>) -> Result<String> {
        match group {
            Some(name) => Ok(name.to_string()),
            None => self
                .list_groups(path)?
                .into_iter()
                .next()
                .ok_or_else(|| SampleError::unavailable(path, "file contains no groups")),
        }
    }
}

/// One open sampler group
pub trait SampleGroup {
    fn name(&self) -> &str;

    /// Grid dimensions as stored, (i, j, k) order
    fn ijk_dims(&self) -> Result<Vec<usize>>;

    /// Flat `num_points × 3` coordinate table
    fn coordinates(&self) -> Result<Vec<f64>>;

    /// Flat values of `field` at timestep `itime`
    fn field_row(&self, field: &str, itime: usize) -> Result<Vec<f64>>;

    /// Names of the per-timestep fields in the group
    fn field_names(&self) -> Result<Vec<String>>;

    /// All group attributes
    fn attributes(&self) -> Result<Attributes>;

    /// Array shape of one snapshot under `layout`
    fn grid_shape(&self, layout: GridLayout) -> Result<Vec<usize>> {
        match layout {
            GridLayout::Plane => Ok(natural_shape(&self.ijk_dims()?)),
            GridLayout::Line => Ok(vec![self.coordinates()?.len() / 3]),
        }
    }

    /// Coordinate arrays shaped like one snapshot
    fn grid(&self, shape: &[usize]) -> Result<SpatialGrid> {
        SpatialGrid::from_coordinates(&self.coordinates()?, shape)
    }

    /// One field at one timestep, reshaped
    fn snapshot(&self, field: &str, itime: usize, shape: &[usize]) -> Result<Field> {
        reshape(self.field_row(field, itime)?, shape)
    }
}

/// Convert a JSON attribute value into grid dimensions.
///
/// # Errors
///
/// Returns [`SampleError::InvalidAttribute`] unless the value is a non-negative integer
/// or an array of them.
pub fn dims_from_json(name: &str, value: &JsonValue) -> Result<Vec<usize>> {
    let invalid = || SampleError::InvalidAttribute {
        name: name.to_string(),
        message: format!("expected non-negative integers, found {value}"),
    };
    let as_dim = |v: &JsonValue| v.as_u64().and_then(|d| usize::try_from(d).ok());
    match value {
        JsonValue::Array(items) => items
            .iter()
            .map(|v| as_dim(v).ok_or_else(invalid))
            .collect(),
        other => as_dim(other).map(|d| vec![d]).ok_or_else(invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dims_accept_arrays_and_scalars() -> Result<()> {
        assert_eq!(dims_from_json("ijk_dims", &json!([4, 3, 1]))?, vec![4, 3, 1]);
        assert_eq!(dims_from_json("ijk_dims", &json!(7))?, vec![7]);
        Ok(())
    }

    #[test]
    fn dims_reject_negative_or_text() {
        assert!(matches!(
            dims_from_json("ijk_dims", &json!([4, -1])),
            Err(SampleError::InvalidAttribute { .. })
        ));
        assert!(dims_from_json("ijk_dims", &json!("4x3")).is_err());
    }
}
