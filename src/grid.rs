//! Grid reshaping for sampled fields
//!
//! Sampler groups store each field as one flat row of `num_points` values per
//! timestep and the coordinates as a flat `num_points × 3` table. The grid
//! dimensions are stored as the `ijk_dims` attribute in (i, j, k) order, while the
//! flat storage runs fastest along i, so the natural row-major shape is the
//! reversed tuple `(k, j, i)`.

use crate::errors::{Result, SampleError};
use ndarray::{ArrayD, IxDyn};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One field at one timestep (or any array shaped like one)
pub type Field = ArrayD<f64>;

/// How sampled points are arranged into arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridLayout {
    /// Reshape to the reversed `ijk_dims` tuple
    #[default]
    Plane,
    /// Keep points flat, as written by line samplers
    Line,
}

/// Spatial coordinate axis, matching the columns of the coordinate table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Column of this axis in the `num_points × 3` coordinate table
    #[must_use]
    pub const fn column(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }
}

/// Order of the three spatial dimensions of a full-plane array, slowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AxisOrdering([Axis; 3]);

impl Default for AxisOrdering {
    /// `(x, z, y)`
    fn default() -> Self {
        Self([Axis::X, Axis::Z, Axis::Y])
    }
}

impl AxisOrdering {
    /// # Errors
    ///
    /// Returns [`SampleError::InvalidOrdering`] unless every axis appears exactly once.
    pub fn new(axes: [Axis; 3]) -> Result<Self> {
        let [a, b, c] = axes;
        if a == b || b == c || a == c {
            return Err(SampleError::InvalidOrdering(format!(
                "{}{}{}",
                a.label(),
                b.label(),
                c.label()
            )));
        }
        Ok(Self(axes))
    }

    #[must_use]
    pub fn axes(&self) -> [Axis; 3] {
        self.0
    }
}

impl fmt::Display for AxisOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|axis| f.write_str(axis.label()))
    }
}

impl FromStr for AxisOrdering {
    type Err = SampleError;

    /// Parse `"xzy"` or `"x,z,y"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SampleError::InvalidOrdering(s.to_string());
        let axes = s
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .map(|c| match c.to_ascii_lowercase() {
                'x' => Ok(Axis::X),
                'y' => Ok(Axis::Y),
                'z' => Ok(Axis::Z),
                _ => Err(invalid()),
            })
            .collect::<Result<Vec<Axis>>>()?;
        let axes: [Axis; 3] = axes.try_into().map_err(|_| invalid())?;
        Self::new(axes)
    }
}

/// Distinct values in ascending order.
#[must_use]
pub fn unique_sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.into_iter().collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Reverse the stored `ijk_dims` tuple into the natural array shape.
#[must_use]
pub fn natural_shape(ijk_dims: &[usize]) -> Vec<usize> {
    ijk_dims.iter().rev().copied().collect()
}

/// Reshape one flat per-timestep row into `shape`.
///
/// # Errors
///
/// Returns [`SampleError::ShapeMismatch`] if `flat.len()` differs from the product of
/// `shape`.
pub fn reshape(flat: Vec<f64>, shape: &[usize]) -> Result<Field> {
    let expected: usize = shape.iter().product();
    if flat.len() != expected {
        return Err(SampleError::ShapeMismatch {
            expected,
            actual: flat.len(),
        });
    }
    Ok(ArrayD::from_shape_vec(IxDyn(shape), flat)?)
}

/// Flatten a field back into storage (row-major) order.
#[must_use]
pub fn flatten(field: &Field) -> Vec<f64> {
    field.iter().copied().collect()
}

/// Pick values at flat (row-major) point indices, returning a 1-D field.
///
/// # Errors
///
/// Returns [`SampleError::IndexOutOfRange`] for an index past the last point.
pub fn select_points(field: &Field, points: &[usize]) -> Result<Field> {
    let flat = flatten(field);
    let values = points
        .iter()
        .map(|&p| {
            flat.get(p).copied().ok_or(SampleError::IndexOutOfRange {
                index: p as i64,
                len: flat.len(),
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(ArrayD::from_shape_vec(IxDyn(&[values.len()]), values)?)
}

/// x, y, z coordinate arrays of a sampled group, all sharing one shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialGrid {
    pub x: Field,
    pub y: Field,
    pub z: Field,
}

impl SpatialGrid {
    /// Split a flat `num_points × 3` coordinate table into three arrays of `shape`.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::ShapeMismatch`] if the table does not hold exactly
    /// `3 × product(shape)` values.
    pub fn from_coordinates(coordinates: &[f64], shape: &[usize]) -> Result<Self> {
        let num_points: usize = shape.iter().product();
        if coordinates.len() != 3 * num_points {
            return Err(SampleError::ShapeMismatch {
                expected: 3 * num_points,
                actual: coordinates.len(),
            });
        }
        let component = |c: usize| -> Result<Field> {
            let values: Vec<f64> = coordinates.iter().skip(c).step_by(3).copied().collect();
            reshape(values, shape)
        };
        Ok(Self {
            x: component(0)?,
            y: component(1)?,
            z: component(2)?,
        })
    }

    /// Shape shared by the three coordinate arrays
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        self.x.shape()
    }

    #[must_use]
    pub fn num_points(&self) -> usize {
        self.x.len()
    }

    /// Restrict the grid to flat point indices (1-D result).
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::IndexOutOfRange`] for an index past the last point.
    pub fn select_points(&self, points: &[usize]) -> Result<Self> {
        Ok(Self {
            x: select_points(&self.x, points)?,
            y: select_points(&self.y, points)?,
            z: select_points(&self.z, points)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn orderings_parse_and_reject_repeats() -> Result<()> {
        assert_eq!(AxisOrdering::default().to_string(), "xzy");
        assert_eq!("x,y,z".parse::<AxisOrdering>()?.axes(), [Axis::X, Axis::Y, Axis::Z]);
        assert_eq!("ZXY".parse::<AxisOrdering>()?.to_string(), "zxy");
        assert!(matches!("xxy".parse::<AxisOrdering>(), Err(SampleError::InvalidOrdering(_))));
        assert!("xy".parse::<AxisOrdering>().is_err());
        assert!("xyw".parse::<AxisOrdering>().is_err());
        Ok(())
    }

    #[test]
    fn unique_sorted_drops_repeats() {
        assert_eq!(unique_sorted([2.0, 0.0, 2.0, 1.0, 0.0]), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn natural_shape_reverses_ijk() {
        assert_eq!(natural_shape(&[4, 3, 1]), vec![1, 3, 4]);
    }

    #[test]
    fn reshape_rejects_wrong_length() {
        let result = reshape(vec![0.0; 11], &[1, 3, 4]);
        match result {
            Err(SampleError::ShapeMismatch { expected, actual }) => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 11);
            }
            _ => panic!("Expected ShapeMismatch error"),
        }
    }

    #[test]
    fn reshape_inverts_flatten() -> Result<()> {
        let data: Vec<f64> = (0..24).map(f64::from).collect();
        let original = Array3::from_shape_vec((2, 3, 4), data)?.into_dyn();
        let round = reshape(flatten(&original), original.shape())?;
        assert_eq!(round, original);

        // non-standard layout still flattens in logical order
        let transposed = original.clone().reversed_axes();
        let round = reshape(flatten(&transposed), transposed.shape())?;
        assert_eq!(round, transposed);
        Ok(())
    }

    #[test]
    fn coordinates_split_by_component() -> Result<()> {
        // 2 x 2 plane, storage runs fastest along i (x)
        let coords = vec![
            0.0, 0.0, 5.0, //
            1.0, 0.0, 5.0, //
            0.0, 1.0, 5.0, //
            1.0, 1.0, 5.0,
        ];
        let grid = SpatialGrid::from_coordinates(&coords, &natural_shape(&[2, 2, 1]))?;
        assert_eq!(grid.shape(), &[1, 2, 2]);
        assert_eq!(grid.x[[0, 0, 1]], 1.0);
        assert_eq!(grid.y[[0, 1, 0]], 1.0);
        assert!(grid.z.iter().all(|&z| z == 5.0));
        assert_eq!(grid.num_points(), 4);

        let picked = grid.select_points(&[3, 0])?;
        assert_eq!(picked.x.as_slice(), Some(&[1.0, 0.0][..]));
        Ok(())
    }

    #[test]
    fn coordinates_reject_bad_table() {
        let result = SpatialGrid::from_coordinates(&[0.0; 8], &[1, 2, 2]);
        assert!(matches!(
            result,
            Err(SampleError::ShapeMismatch {
                expected: 12,
                actual: 8
            })
        ));
    }

    #[test]
    fn select_points_bounds_checked() -> Result<()> {
        let field = reshape(vec![1.0, 2.0, 3.0, 4.0], &[2, 2])?;
        assert_eq!(flatten(&select_points(&field, &[2, 1])?), vec![3.0, 2.0]);
        assert!(matches!(
            select_points(&field, &[4]),
            Err(SampleError::IndexOutOfRange { index: 4, len: 4 })
        ));
        Ok(())
    }
}
