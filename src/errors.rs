//! Centralized error handling for sample_planes
//!
//! Every fallible operation in the crate returns [`Result`], whose error type
//! [`SampleError`] separates data-source failures (file or group cannot be opened),
//! lookup failures (missing field, bad timestep index) and grid shape mismatches.
//!
//! A time window that selects no timesteps is *not* an error: aggregation passes
//! return a record whose `count` is zero, see
//! [`StatsRecord::is_empty_window`](crate::record::StatsRecord::is_empty_window).

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sample_planes operations
#[derive(Debug, Error)]
pub enum SampleError {
    /// NetCDF library errors not covered by a more specific variant
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ndarray shape construction errors
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// A flat array does not have the length implied by the grid
    #[error("Shape mismatch: expected {expected} elements, found {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Requested field, variable or attribute is absent
    #[error("Field '{field}' not found")]
    FieldNotFound { field: String },

    /// File or group could not be opened
    #[error("Source '{}' unavailable: {reason}", path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Named group does not exist in the file
    #[error("Group '{group}' not found in '{}'", path.display())]
    GroupNotFound { path: PathBuf, group: String },

    /// Timestep or point index outside the available range
    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Attribute present but not of a usable type
    #[error("Invalid attribute '{name}': {message}")]
    InvalidAttribute { name: String, message: String },

    /// Two tracked quantities share an output name
    #[error("Duplicate quantity name '{name}'")]
    DuplicateName { name: String },

    /// Axis ordering is not a permutation of x, y and z
    #[error("Invalid axis ordering '{0}': expected each of x, y, z exactly once")]
    InvalidOrdering(String),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl SampleError {
    /// Shorthand for a [`SampleError::FieldNotFound`]
    pub fn field_not_found(field: impl Into<String>) -> Self {
        SampleError::FieldNotFound {
            field: field.into(),
        }
    }

    /// Shorthand for a [`SampleError::SourceUnavailable`]
    pub fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SampleError::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for sample_planes operations
pub type Result<T> = std::result::Result<T, SampleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_item() {
        let err = SampleError::field_not_found("velocityx");
        assert_eq!(err.to_string(), "Field 'velocityx' not found");

        let err = SampleError::ShapeMismatch {
            expected: 12,
            actual: 10,
        };
        assert!(err.to_string().contains("expected 12"));

        let err = SampleError::unavailable("/tmp/missing.nc", "no such file");
        assert!(err.to_string().contains("/tmp/missing.nc"));
        assert!(err.to_string().contains("no such file"));

        let err = SampleError::IndexOutOfRange { index: -7, len: 5 };
        assert_eq!(err.to_string(), "Index -7 out of range for length 5");

        let err = SampleError::DuplicateName {
            name: "velocityx".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate quantity name 'velocityx'");
    }

    #[test]
    fn io_errors_convert() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(SampleError::Io(_))));
    }
}
