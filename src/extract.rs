//! Extraction of field snapshots from one sampler group
//!
//! Two modes are offered on top of the [`SampleSource`] abstraction:
//!
//! - [`extract_planes`]: whole snapshots (plane or line layout) per requested timestep
//! - [`extract_points`]: scalar time series at selected flat point indices
//! - [`extract_full_plane`]: every timestep of the velocity components on the sorted
//!   coordinate axes of the plane
//!
//! Timestep indices may be negative and then count from the end of the file's time
//! vector. The group handle is opened and dropped inside each call.

use crate::data_source::{SampleGroup, SampleSource};
use crate::derived::Snapshot;
use crate::errors::{Result, SampleError};
use crate::grid::{flatten, reshape, unique_sorted, Axis, AxisOrdering, GridLayout};
use crate::record::{FieldSet, FullPlaneRecord, PlaneRecord, PointRecord};
use crate::statistics::request::DEFAULT_VARIABLES;
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// Translate a possibly negative timestep index into a position in `0..len`.
///
/// # Errors
///
/// Returns [`SampleError::IndexOutOfRange`] if the index falls outside the time vector.
pub fn resolve_timestep(index: i64, len: usize) -> Result<usize> {
    let out_of_range = || SampleError::IndexOutOfRange { index, len };
    let signed_len = i64::try_from(len).map_err(|_| out_of_range())?;
    let resolved = if index < 0 { signed_len + index } else { index };
    if (0..signed_len).contains(&resolved) {
        usize::try_from(resolved).map_err(|_| out_of_range())
    } else {
        Err(out_of_range())
    }
}

/// What to pull out of a file
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRequest {
    /// Group to read; `None` uses the first group of the file
    pub group: Option<String>,
    /// Timestep indices, negative ones counting from the end
    pub timesteps: Vec<i64>,
    pub fields: Vec<String>,
    pub layout: GridLayout,
    pub include_times: bool,
    pub include_attributes: bool,
}

impl Default for ExtractRequest {
    fn default() -> Self {
        Self {
            group: None,
            timesteps: Vec::new(),
            fields: DEFAULT_VARIABLES.iter().map(|v| v.to_string()).collect(),
            layout: GridLayout::Plane,
            include_times: false,
            include_attributes: false,
        }
    }
}

impl ExtractRequest {
    #[must_use]
    pub fn new(timesteps: Vec<i64>) -> Self {
        Self {
            timesteps,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.group = Some(name.into());
        self
    }

    #[must_use]
    pub fn fields<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.fields = names.iter().map(|n| n.as_ref().to_string()).collect();
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: GridLayout) -> Self {
        self.layout = layout;
        self
    }

    #[must_use]
    pub fn include_times(mut self, yes: bool) -> Self {
        self.include_times = yes;
        self
    }

    #[must_use]
    pub fn include_attributes(mut self, yes: bool) -> Self {
        self.include_attributes = yes;
        self
    }
}

/// Read every field in `fields` at `itime`, reshaped to `shape`, optionally
/// replacing NaN by zero.
pub fn read_snapshot(
    group: &dyn SampleGroup,
    fields: &[String],
    itime: usize,
    shape: &[usize],
    replace_nan: bool,
) -> Result<Snapshot> {
    fields
        .iter()
        .map(|name| {
            let mut field = group.snapshot(name, itime, shape)?;
            if replace_nan {
                field.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
            }
            Ok((name.clone(), field))
        })
        .collect()
}

fn resolve_all(source: &dyn SampleSource, path: &Path, timesteps: &[i64]) -> Result<(Vec<usize>, Vec<f64>)> {
    let times = source.read_times(path)?;
    let indices = timesteps
        .iter()
        .map(|&t| resolve_timestep(t, times.len()))
        .collect::<Result<Vec<usize>>>()?;
    Ok((indices, times))
}

/// Pull whole snapshots of the requested fields at the requested timesteps.
///
/// # Errors
///
/// Fails with [`SampleError::SourceUnavailable`] or [`SampleError::GroupNotFound`]
/// when the file or group cannot be opened, [`SampleError::IndexOutOfRange`] for a bad
/// timestep, [`SampleError::FieldNotFound`] for a missing field.
pub fn extract_planes(source: &dyn SampleSource, path: &Path, request: &ExtractRequest) -> Result<PlaneRecord> {
    let group_name = source.resolve_group(path, request.group.as_deref())?;
    let (timesteps, times) = resolve_all(source, path, &request.timesteps)?;

    let group = source.open_group(path, &group_name)?;
    let shape = group.grid_shape(request.layout)?;
    let grid = group.grid(&shape)?;

    let mut fields: BTreeMap<String, BTreeMap<usize, _>> = request
        .fields
        .iter()
        .map(|name| (name.clone(), BTreeMap::new()))
        .collect();
    for &itime in &timesteps {
        debug!("extracting timestep {} of group '{}'", itime, group_name);
        for (name, field) in read_snapshot(group.as_ref(), &request.fields, itime, &shape, false)? {
            fields.entry(name).or_default().insert(itime, field);
        }
    }

    let attributes = if request.include_attributes {
        Some(group.attributes()?)
    } else {
        None
    };

    Ok(PlaneRecord {
        group: group_name,
        grid,
        times: request
            .include_times
            .then(|| timesteps.iter().map(|&i| times[i]).collect()),
        timesteps,
        fields,
        attributes,
    })
}

/// Pull time series at flat point indices. An empty timestep list selects every
/// timestep in the file.
///
/// # Errors
///
/// As [`extract_planes`], plus [`SampleError::IndexOutOfRange`] for a point past the
/// end of the grid.
pub fn extract_points(
    source: &dyn SampleSource,
    path: &Path,
    request: &ExtractRequest,
    points: &[usize],
) -> Result<PointRecord> {
    let group_name = source.resolve_group(path, request.group.as_deref())?;
    let (timesteps, times) = if request.timesteps.is_empty() {
        let times = source.read_times(path)?;
        ((0..times.len()).collect(), times)
    } else {
        resolve_all(source, path, &request.timesteps)?
    };

    let group = source.open_group(path, &group_name)?;
    let shape = group.grid_shape(request.layout)?;
    let grid = group.grid(&shape)?;
    if let Some(&bad) = points.iter().find(|&&p| p >= grid.num_points()) {
        return Err(SampleError::IndexOutOfRange {
            index: bad as i64,
            len: grid.num_points(),
        });
    }

    let mut series: BTreeMap<usize, BTreeMap<String, Vec<f64>>> = points
        .iter()
        .map(|&p| {
            let per_field = request
                .fields
                .iter()
                .map(|name| (name.clone(), Vec::with_capacity(timesteps.len())))
                .collect();
            (p, per_field)
        })
        .collect();

    for (n, &itime) in timesteps.iter().enumerate() {
        debug!("extracting points at timestep {} ({}/{})", itime, n + 1, timesteps.len());
        for (name, field) in read_snapshot(group.as_ref(), &request.fields, itime, &shape, false)? {
            let flat = flatten(&field);
            for &p in points {
                if let Some(values) = series.get_mut(&p).and_then(|s| s.get_mut(&name)) {
                    values.push(flat[p]);
                }
            }
        }
    }

    let attributes = if request.include_attributes {
        Some(group.attributes()?)
    } else {
        None
    };

    Ok(PointRecord {
        group: group_name,
        grid,
        points: points.to_vec(),
        times: request
            .include_times
            .then(|| timesteps.iter().map(|&i| times[i]).collect()),
        timesteps,
        series,
        attributes,
    })
}

/// Read every timestep of the velocity components into `(times, a, b, c)` arrays,
/// where `a, b, c` follow `ordering` and each axis holds the sorted distinct
/// coordinates along it. Times are the timestep index times `output_dt`.
///
/// Stored rows are reshaped as they are, so `ordering` must match the order in which
/// the sampler wrote its points.
///
/// # Errors
///
/// Returns [`SampleError::ShapeMismatch`] when the distinct coordinates do not span
/// every sampled point (the plane is not a regular lattice), plus the errors of
/// [`extract_planes`].
pub fn extract_full_plane(
    source: &dyn SampleSource,
    path: &Path,
    group: Option<&str>,
    output_dt: f64,
    ordering: AxisOrdering,
) -> Result<FullPlaneRecord> {
    let group_name = source.resolve_group(path, group)?;
    let num_times = source.read_times(path)?.len();
    let group = source.open_group(path, &group_name)?;

    let coordinates = group.coordinates()?;
    let num_points = coordinates.len() / 3;
    let [x, y, z] = [Axis::X, Axis::Y, Axis::Z]
        .map(|axis| unique_sorted(coordinates.chunks_exact(3).map(|p| p[axis.column()])));
    let axis_len = |axis: Axis| match axis {
        Axis::X => x.len(),
        Axis::Y => y.len(),
        Axis::Z => z.len(),
    };

    let mut shape = vec![num_times];
    shape.extend(ordering.axes().map(axis_len));
    let lattice_points: usize = shape[1..].iter().product();
    if lattice_points != num_points {
        return Err(SampleError::ShapeMismatch {
            expected: num_points,
            actual: lattice_points,
        });
    }

    let fields = DEFAULT_VARIABLES
        .iter()
        .map(|&name| {
            debug!("reading {} timesteps of {} from group '{}'", num_times, name, group_name);
            let mut values = Vec::with_capacity(num_times * num_points);
            for itime in 0..num_times {
                values.extend(group.field_row(name, itime)?);
            }
            Ok((name.to_string(), reshape(values, &shape)?))
        })
        .collect::<Result<FieldSet>>()?;

    let mut dims = vec!["times".to_string()];
    dims.extend(ordering.axes().iter().map(|axis| axis.label().to_string()));

    Ok(FullPlaneRecord {
        group: group_name,
        times: (0..num_times).map(|n| n as f64 * output_dt).collect(),
        x,
        y,
        z,
        dims,
        fields,
    })
}
