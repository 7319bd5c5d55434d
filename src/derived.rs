//! User-supplied derived quantities
//!
//! An [`ExtraFunction`] turns the base fields of one timestep into an extra array
//! (a velocity magnitude, a product of two components, ...). Every aggregation pass
//! evaluates the registered functions once per accepted timestep and then treats
//! their output exactly like a base field.

use crate::errors::{Result, SampleError};
use crate::grid::Field;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// All fields of one timestep, keyed by name
pub type Snapshot = BTreeMap<String, Field>;

type DerivedFn = dyn Fn(&Snapshot) -> Field + Send + Sync;

/// A named derived quantity
#[derive(Clone)]
pub struct ExtraFunction {
    name: String,
    func: Arc<DerivedFn>,
}

impl ExtraFunction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Snapshot) -> Field + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate on `snapshot`, checking the result against the snapshot shape.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError::ShapeMismatch`] if the function returns an array of a
    /// different shape.
    pub fn evaluate(&self, snapshot: &Snapshot, shape: &[usize]) -> Result<Field> {
        let out = (self.func)(snapshot);
        if out.shape() != shape {
            return Err(SampleError::ShapeMismatch {
                expected: shape.iter().product(),
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

impl fmt::Debug for ExtraFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Evaluate every function against the base fields, then add the results to
/// `snapshot`. Derived quantities never see each other's output.
pub fn extend_snapshot(
    snapshot: &mut Snapshot,
    functions: &[ExtraFunction],
    shape: &[usize],
) -> Result<()> {
    let derived = functions
        .iter()
        .map(|f| Ok((f.name.clone(), f.evaluate(snapshot, shape)?)))
        .collect::<Result<Vec<_>>>()?;
    snapshot.extend(derived);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn base() -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            "velocityx".to_string(),
            ArrayD::from_shape_vec(IxDyn(&[2]), vec![3.0, 0.0]).unwrap(),
        );
        snapshot.insert(
            "velocityy".to_string(),
            ArrayD::from_shape_vec(IxDyn(&[2]), vec![4.0, 1.0]).unwrap(),
        );
        snapshot
    }

    #[test]
    fn magnitude_is_added() -> Result<()> {
        let speed = ExtraFunction::new("speed", |s: &Snapshot| {
            let u = &s["velocityx"];
            let v = &s["velocityy"];
            (u * u + v * v).mapv(f64::sqrt)
        });
        let mut snapshot = base();
        extend_snapshot(&mut snapshot, &[speed], &[2])?;
        assert_eq!(snapshot["speed"].as_slice(), Some(&[5.0, 1.0][..]));
        Ok(())
    }

    #[test]
    fn wrong_shape_rejected() {
        let bad = ExtraFunction::new("bad", |_: &Snapshot| ArrayD::zeros(IxDyn(&[3])));
        let mut snapshot = base();
        let result = extend_snapshot(&mut snapshot, &[bad], &[2]);
        assert!(matches!(
            result,
            Err(SampleError::ShapeMismatch {
                expected: 2,
                actual: 3
            })
        ));
        assert!(!snapshot.contains_key("bad"));
    }

    #[test]
    fn debug_shows_name() {
        let f = ExtraFunction::new("zero", |s: &Snapshot| s["velocityx"].mapv(|_| 0.0));
        assert!(format!("{f:?}").contains("zero"));
    }
}
