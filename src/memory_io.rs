//! In-memory sample source
//!
//! Holds files, groups and field rows in plain vectors. Used for synthetic data and
//! throughout the test suite. It also counts open group handles so callers can check
//! that handles are released between files.

use crate::data_source::{dims_from_json, Attributes, SampleGroup, SampleSource, IJK_DIMS_ATTRIBUTE, TIME_VARIABLE};
use crate::errors::{Result, SampleError};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One sampler group: grid, coordinates and one row per timestep for each field
#[derive(Debug, Clone, Default)]
pub struct MemoryGroup {
    pub attributes: Attributes,
    pub coordinates: Vec<f64>,
    pub fields: BTreeMap<String, Vec<Vec<f64>>>,
}

impl MemoryGroup {
    /// New group with the given `ijk_dims` and flat `num_points × 3` coordinates
    #[must_use]
    pub fn new(ijk_dims: &[usize], coordinates: Vec<f64>) -> Self {
        let mut attributes = Attributes::new();
        attributes.insert(IJK_DIMS_ATTRIBUTE.to_string(), JsonValue::from(ijk_dims.to_vec()));
        Self {
            attributes,
            coordinates,
            fields: BTreeMap::new(),
        }
    }

    /// Add a field given as one flat row per timestep
    #[must_use]
    pub fn with_field(mut self, name: &str, rows: Vec<Vec<f64>>) -> Self {
        self.fields.insert(name.to_string(), rows);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: JsonValue) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }
}

/// One file: top-level variables plus ordered groups
#[derive(Debug, Clone, Default)]
pub struct MemoryFile {
    pub variables: BTreeMap<String, Vec<f64>>,
    pub groups: Vec<(String, Arc<MemoryGroup>)>,
}

impl MemoryFile {
    /// New file with the given time coordinate
    #[must_use]
    pub fn new(times: Vec<f64>) -> Self {
        let mut variables = BTreeMap::new();
        variables.insert(TIME_VARIABLE.to_string(), times);
        Self {
            variables,
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_group(mut self, name: &str, group: MemoryGroup) -> Self {
        self.groups.push((name.to_string(), Arc::new(group)));
        self
    }
}

/// A set of in-memory files addressed by path
#[derive(Debug, Default)]
pub struct MemorySource {
    files: BTreeMap<PathBuf, MemoryFile>,
    open: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, file: MemoryFile) -> Self {
        self.files.insert(path.into(), file);
        self
    }

    /// Group handles currently alive
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Largest number of group handles alive at once so far
    #[must_use]
    pub fn peak_open_handles(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn file(&self, path: &Path) -> Result<&MemoryFile> {
        self.files
            .get(path)
            .ok_or_else(|| SampleError::unavailable(path, "no such file"))
    }
}

impl SampleSource for MemorySource {
    fn list_groups(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self.file(path)?.groups.iter().map(|(name, _)| name.clone()).collect())
    }

    fn open_group(&self, path: &Path, group: &str) -> Result<Box<dyn SampleGroup>> {
        let data = self
            .file(path)?
            .groups
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, g)| Arc::clone(g))
            .ok_or_else(|| SampleError::GroupNotFound {
                path: path.to_path_buf(),
                group: group.to_string(),
            })?;

        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(MemoryGroupHandle {
            name: group.to_string(),
            data,
            open: Arc::clone(&self.open),
        }))
    }

    fn read_variable(&self, path: &Path, name: &str) -> Result<Vec<f64>> {
        self.file(path)?
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| SampleError::field_not_found(name))
    }
}

struct MemoryGroupHandle {
    name: String,
    data: Arc<MemoryGroup>,
    open: Arc<AtomicUsize>,
}

impl Drop for MemoryGroupHandle {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SampleGroup for MemoryGroupHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn ijk_dims(&self) -> Result<Vec<usize>> {
        let value = self
            .data
            .attributes
            .get(IJK_DIMS_ATTRIBUTE)
            .ok_or_else(|| SampleError::field_not_found(IJK_DIMS_ATTRIBUTE))?;
        dims_from_json(IJK_DIMS_ATTRIBUTE, value)
    }

    fn coordinates(&self) -> Result<Vec<f64>> {
        Ok(self.data.coordinates.clone())
    }

    fn field_row(&self, field: &str, itime: usize) -> Result<Vec<f64>> {
        let rows = self
            .data
            .fields
            .get(field)
            .ok_or_else(|| SampleError::field_not_found(field))?;
        rows.get(itime)
            .cloned()
            .ok_or(SampleError::IndexOutOfRange {
                index: itime as i64,
                len: rows.len(),
            })
    }

    fn field_names(&self) -> Result<Vec<String>> {
        Ok(self.data.fields.keys().cloned().collect())
    }

    fn attributes(&self) -> Result<Attributes> {
        Ok(self.data.attributes.clone())
    }
}
