//! Regressor port: an opaque, invokable regression function.

use std::fmt::Debug;

use crate::domain::{ModelError, RegressionModel};

/// A fitted model that maps a feature row to a raw case-count value.
///
/// Implementations must be pure: the same input always yields the same
/// output, and no internal state changes between calls.
pub trait Regressor: Send + Sync + Debug {
    /// Evaluate the model on one feature row.
    ///
    /// # Errors
    /// Returns error if the row has the wrong width or the output is not finite.
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;
}

impl Regressor for RegressionModel {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        self.evaluate(features)
    }
}
