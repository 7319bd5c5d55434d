//! NetCDF I/O: reading sampler groups and writing statistics
//!
//! [`NetcdfSource`] reads the layout written by AMR-Wind style samplers:
//!
//! - a root variable `time(num_time_steps)`
//! - one group per sampler, with an `ijk_dims` attribute, a
//!   `coordinates(num_points, ndim)` variable and one
//!   `<field>(num_time_steps, num_points)` variable per sampled field
//!
//! [`NetCDFWriter`] writes a [`StatsRecord`] to a new NetCDF file with the source
//! attributes copied and a `history` attribute added.

use crate::data_source::{
    dims_from_json, Attributes, SampleGroup, SampleSource, IJK_DIMS_ATTRIBUTE,
};
use crate::errors::{Result, SampleError};
use crate::record::StatsRecord;
use chrono::Utc;
use log::warn;
use ndarray::Array1;
use netcdf::{AttributeValue, File, FileMut};
use serde_json::Value as JsonValue;
use std::{fs, path::Path, path::PathBuf};

const COORDINATES_VARIABLE: &str = "coordinates";

/// Reads sampler groups from NetCDF files
#[derive(Debug, Clone, Copy, Default)]
pub struct NetcdfSource;

impl NetcdfSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn open_file(path: &Path) -> Result<File> {
    netcdf::open(path).map_err(|e| SampleError::unavailable(path, e))
}

impl SampleSource for NetcdfSource {
    fn list_groups(&self, path: &Path) -> Result<Vec<String>> {
        let file = open_file(path)?;
        let names = file.groups()?.map(|g| g.name().to_string()).collect();
        Ok(names)
    }

    fn open_group(&self, path: &Path, group: &str) -> Result<Box<dyn SampleGroup>> {
        let file = open_file(path)?;
        if file.group(group)?.is_none() {
            return Err(SampleError::GroupNotFound {
                path: path.to_path_buf(),
                group: group.to_string(),
            });
        }
        Ok(Box::new(NetcdfGroup {
            path: path.to_path_buf(),
            name: group.to_string(),
            file,
        }))
    }

    fn read_variable(&self, path: &Path, name: &str) -> Result<Vec<f64>> {
        let file = open_file(path)?;
        let var = file
            .variable(name)
            .ok_or_else(|| SampleError::field_not_found(name))?;
        Ok(var.get_values::<f64, _>(..)?)
    }
}

/// An open group; owns the file handle, which closes on drop
struct NetcdfGroup {
    path: PathBuf,
    name: String,
    file: File,
}

impl NetcdfGroup {
    fn group(&self) -> Result<netcdf::Group<'_>> {
        self.file
            .group(&self.name)?
            .ok_or_else(|| SampleError::GroupNotFound {
                path: self.path.clone(),
                group: self.name.clone(),
            })
    }
}

impl SampleGroup for NetcdfGroup {
    fn name(&self) -> &str {
        &self.name
    }

    fn ijk_dims(&self) -> Result<Vec<usize>> {
        let group = self.group()?;
        let attr = group
            .attribute(IJK_DIMS_ATTRIBUTE)
            .ok_or_else(|| SampleError::field_not_found(IJK_DIMS_ATTRIBUTE))?;
        let value = attribute_to_json(attr.value()?).ok_or_else(|| {
            SampleError::InvalidAttribute {
                name: IJK_DIMS_ATTRIBUTE.to_string(),
                message: "unsupported attribute type".to_string(),
            }
        })?;
        dims_from_json(IJK_DIMS_ATTRIBUTE, &value)
    }

    fn coordinates(&self) -> Result<Vec<f64>> {
        let group = self.group()?;
        let var = group
            .variable(COORDINATES_VARIABLE)
            .ok_or_else(|| SampleError::field_not_found(COORDINATES_VARIABLE))?;
        Ok(var.get_values::<f64, _>(..)?)
    }

    fn field_row(&self, field: &str, itime: usize) -> Result<Vec<f64>> {
        let group = self.group()?;
        let var = group
            .variable(field)
            .ok_or_else(|| SampleError::field_not_found(field))?;
        let steps = var.dimensions().first().map_or(0, netcdf::Dimension::len);
        if itime >= steps {
            return Err(SampleError::IndexOutOfRange {
                index: itime as i64,
                len: steps,
            });
        }
        Ok(var.get_values::<f64, _>((itime, ..))?)
    }

    fn field_names(&self) -> Result<Vec<String>> {
        let group = self.group()?;
        let names = group
            .variables()
            .map(|v| v.name().to_string())
            .filter(|name| name != COORDINATES_VARIABLE)
            .collect();
        Ok(names)
    }

    fn attributes(&self) -> Result<Attributes> {
        let group = self.group()?;
        let mut attributes = Attributes::new();
        for attr in group.attributes() {
            match attribute_to_json(attr.value()?) {
                Some(value) => {
                    attributes.insert(attr.name().to_string(), value);
                }
                None => warn!("⚠ Skipped unsupported attribute type for '{}'", attr.name()),
            }
        }
        Ok(attributes)
    }
}

/// Convert a NetCDF attribute into a JSON value (numbers, strings and arrays of them)
#[must_use]
pub fn attribute_to_json(value: AttributeValue) -> Option<JsonValue> {
    let json = match value {
        AttributeValue::Str(s) => JsonValue::from(s),
        AttributeValue::Strs(ss) => JsonValue::from(ss),
        AttributeValue::Float(v) => JsonValue::from(v),
        AttributeValue::Floats(vs) => JsonValue::from(vs),
        AttributeValue::Double(v) => JsonValue::from(v),
        AttributeValue::Doubles(vs) => JsonValue::from(vs),
        AttributeValue::Short(v) => JsonValue::from(v),
        AttributeValue::Shorts(vs) => JsonValue::from(vs),
        AttributeValue::Ushort(v) => JsonValue::from(v),
        AttributeValue::Ushorts(vs) => JsonValue::from(vs),
        AttributeValue::Int(v) => JsonValue::from(v),
        AttributeValue::Ints(vs) => JsonValue::from(vs),
        AttributeValue::Uint(v) => JsonValue::from(v),
        AttributeValue::Uints(vs) => JsonValue::from(vs),
        AttributeValue::Longlong(v) => JsonValue::from(v),
        AttributeValue::Longlongs(vs) => JsonValue::from(vs),
        AttributeValue::Ulonglong(v) => JsonValue::from(v),
        AttributeValue::Ulonglongs(vs) => JsonValue::from(vs),
        AttributeValue::Uchar(v) => JsonValue::from(v),
        AttributeValue::Uchars(vs) => JsonValue::from(vs),
        _ => return None,
    };
    Some(json)
}

/// Writes statistics records to NetCDF
pub struct NetCDFWriter<'a> {
    output_path: &'a Path,
}

impl<'a> NetCDFWriter<'a> {
    /// Create a new NetCDF writer
    pub fn new(output_path: &'a Path) -> Self {
        Self { output_path }
    }

    /// Write every statistic of `record` as `<name>_<suffix>` variables, plus the grid
    /// (`x`, `y`, `z`) and the accepted `times`.
    pub fn write_stats(&self, record: &StatsRecord) -> Result<()> {
        if self.output_path.exists() {
            fs::remove_file(self.output_path)?;
        }

        let mut file = netcdf::create(self.output_path)?;

        let shape = record.shape();
        let dim_names = dimension_names(&shape);
        for (name, &len) in dim_names.iter().zip(&shape) {
            file.add_dimension(name, len)?;
        }
        let dim_refs: Vec<&str> = dim_names.iter().map(String::as_str).collect();

        if let Some(grid) = &record.grid {
            for (name, coord) in [("x", &grid.x), ("y", &grid.y), ("z", &grid.z)] {
                let mut var = file.add_variable::<f64>(name, &dim_refs)?;
                var.put_attribute("units", "m")?;
                var.put(coord.view(), ..)?;
            }
        }

        if !record.times.is_empty() {
            file.add_dimension("num_samples", record.times.len())?;
            let mut var = file.add_variable::<f64>("times", &["num_samples"])?;
            var.put_attribute("long_name", "accepted sample times")?;
            var.put(Array1::from(record.times.clone()).view(), ..)?;
        }

        for (kind, name, field) in record.stats.iter() {
            let var_name = format!("{name}_{}", kind.suffix());
            let mut var = file.add_variable::<f64>(&var_name, &dim_refs)?;
            var.put_attribute("statistic", kind.as_str())?;
            var.put(field.view(), ..)?;
        }

        file.add_attribute("group", record.group.as_str())?;
        file.add_attribute("count", record.count as i64)?;
        file.add_attribute("window_start", record.window.start)?;
        file.add_attribute("window_end", record.window.end)?;
        if let Some(points) = &record.points {
            let points: Vec<i64> = points.iter().map(|&p| p as i64).collect();
            file.add_attribute("points", points)?;
        }
        if let Some(attributes) = &record.attributes {
            for (name, value) in attributes {
                put_json_attribute(&mut file, name, value)?;
            }
        }

        // Add history attribute
        file.add_attribute(
            "history",
            format!("Created by sample_planes on {}", Utc::now().to_rfc3339()),
        )?;

        Ok(())
    }
}

/// Writes `record` to a new NetCDF file at `output_path`.
pub fn write_stats_to_netcdf(record: &StatsRecord, output_path: &Path) -> Result<()> {
    NetCDFWriter::new(output_path).write_stats(record)
}

fn dimension_names(shape: &[usize]) -> Vec<String> {
    match shape.len() {
        1 => vec!["num_points".to_string()],
        3 => ["nk", "nj", "ni"].iter().map(|s| s.to_string()).collect(),
        _ => (0..shape.len()).map(|d| format!("dim_{d}")).collect(),
    }
}

fn put_json_attribute(file: &mut FileMut, name: &str, value: &JsonValue) -> Result<()> {
    match value {
        JsonValue::String(s) => {
            file.add_attribute(name, s.as_str())?;
        }
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                file.add_attribute(name, i)?;
            } else if let Some(f) = n.as_f64() {
                file.add_attribute(name, f)?;
            }
        }
        JsonValue::Array(items) if items.iter().all(JsonValue::is_i64) => {
            let ints: Vec<i64> = items.iter().filter_map(JsonValue::as_i64).collect();
            file.add_attribute(name, ints)?;
        }
        JsonValue::Array(items) if items.iter().all(JsonValue::is_number) => {
            let floats: Vec<f64> = items.iter().filter_map(JsonValue::as_f64).collect();
            file.add_attribute(name, floats)?;
        }
        _ => {
            warn!("⚠ Skipped unsupported attribute type for '{}'", name);
        }
    }
    Ok(())
}
