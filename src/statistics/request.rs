//! Aggregation requests and correlation pairs

use crate::derived::ExtraFunction;
use crate::errors::{Result, SampleError};
use crate::grid::GridLayout;
use crate::window::TimeWindow;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Velocity components sampled by default
pub const DEFAULT_VARIABLES: [&str; 3] = ["velocityx", "velocityy", "velocityz"];

/// What to aggregate: files (in time order), window, fields and options
#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub files: Vec<PathBuf>,
    pub window: TimeWindow,
    pub variables: Vec<String>,
    /// Group to read; `None` uses the first group of the first file
    pub group: Option<String>,
    pub extra_functions: Vec<ExtraFunction>,
    /// Replace NaN samples by zero before accumulating
    pub replace_nan: bool,
    /// Copy the group attributes of the last file into the record
    pub include_attributes: bool,
    /// Restrict every snapshot to these flat point indices
    pub points: Option<Vec<usize>>,
    pub layout: GridLayout,
}

impl AggregateRequest {
    /// Request over `files` for `window`, with the default velocity variables
    pub fn new<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>, window: TimeWindow) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            window,
            variables: DEFAULT_VARIABLES.iter().map(|v| v.to_string()).collect(),
            group: None,
            extra_functions: Vec::new(),
            replace_nan: false,
            include_attributes: false,
            points: None,
            layout: GridLayout::Plane,
        }
    }

    #[must_use]
    pub fn variables<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.variables = names.iter().map(|n| n.as_ref().to_string()).collect();
        self
    }

    #[must_use]
    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.group = Some(name.into());
        self
    }

    #[must_use]
    pub fn extra_function(mut self, function: ExtraFunction) -> Self {
        self.extra_functions.push(function);
        self
    }

    #[must_use]
    pub fn replace_nan(mut self, yes: bool) -> Self {
        self.replace_nan = yes;
        self
    }

    #[must_use]
    pub fn include_attributes(mut self, yes: bool) -> Self {
        self.include_attributes = yes;
        self
    }

    #[must_use]
    pub fn points(mut self, points: Vec<usize>) -> Self {
        self.points = Some(points);
        self
    }

    #[must_use]
    pub fn layout(mut self, layout: GridLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Names of every tracked quantity: base fields, then derived ones
    #[must_use]
    pub fn tracked_names(&self) -> Vec<String> {
        self.variables
            .iter()
            .cloned()
            .chain(self.extra_functions.iter().map(|f| f.name().to_string()))
            .collect()
    }

    /// Check that no two tracked quantities share a name, so an extra function can
    /// never shadow a base field.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::DuplicateName`] with the first repeated name.
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for name in self.tracked_names() {
            if !seen.insert(name.clone()) {
                return Err(SampleError::DuplicateName { name });
            }
        }
        Ok(())
    }

    /// Copy of the request whose variables also cover every base field used by
    /// `pairs` (derived quantities are left to the extra functions).
    #[must_use]
    pub fn covering(&self, pairs: &[Correlation]) -> Self {
        let mut request = self.clone();
        for pair in pairs {
            for name in [&pair.first, &pair.second] {
                let derived = self.extra_functions.iter().any(|f| f.name() == name.as_str());
                if !derived && !request.variables.contains(name) {
                    request.variables.push(name.clone());
                }
            }
        }
        request
    }
}

/// Covariance of two tracked quantities, stored under `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub name: String,
    pub first: String,
    pub second: String,
}

impl Correlation {
    pub fn new(name: impl Into<String>, first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Every unordered pair (including self-pairs) of `components`, each given as
    /// `(label, field)`; the pair name is the two labels joined.
    #[must_use]
    pub fn upper_triangle(components: &[(&str, &str)]) -> Vec<Self> {
        let mut pairs = Vec::new();
        for (i, (label_a, field_a)) in components.iter().enumerate() {
            for (label_b, field_b) in &components[i..] {
                pairs.push(Self::new(format!("{label_a}{label_b}"), *field_a, *field_b));
            }
        }
        pairs
    }

    /// The six Reynolds-stress pairs `uu, uv, uw, vv, vw, ww` of the default velocity
    /// components
    #[must_use]
    pub fn reynolds_stresses() -> Vec<Self> {
        Self::upper_triangle(&[
            ("u", DEFAULT_VARIABLES[0]),
            ("v", DEFAULT_VARIABLES[1]),
            ("w", DEFAULT_VARIABLES[2]),
        ])
    }
}
