//! Regression model types.
//!
//! Two comparable variants are supported: an ordinary least-squares model on
//! standardized features, and the same model on a polynomial expansion of
//! the features. Both are plain data so they can be persisted as JSON and
//! evaluated without any numeric library.

use serde::{Deserialize, Serialize};

/// Model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Linear,
    Polynomial,
}

impl ModelKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Polynomial => "polynomial",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while invoking a model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Feature length mismatch: expected {expected}, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("Model produced a non-finite value")]
    NonFinite,
}

/// Fit quality recorded at training time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    /// R² on the held-out test split
    pub r_squared: f64,

    /// Mean k-fold cross-validated R² (used for model selection)
    pub r_squared_cv: f64,

    /// Mean absolute error on the test split
    pub mean_absolute_error: f64,

    /// Root mean squared error on the test split
    pub rmse: f64,

    /// Polynomial degree, `None` for the linear variant
    pub degree: Option<u32>,
}

/// Per-column standardization (zero mean, unit variance).
///
/// Columns with zero variance keep a scale of 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major data.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut scale = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2);
            }
        }
        for s in &mut scale {
            let std = (*s / n).sqrt();
            *s = if std > f64::EPSILON { std } else { 1.0 };
        }

        Self { mean, scale }
    }

    #[must_use]
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}

/// All monomials of degree `1..=degree` over `x`, without a bias term.
///
/// Terms are ordered by degree, then lexicographically by the
/// non-decreasing index tuple (`x0, x1, x0², x0·x1, x1²` for two inputs).
#[must_use]
pub fn polynomial_expand(x: &[f64], degree: u32) -> Vec<f64> {
    let mut out: Vec<f64> = x.to_vec();
    // (index of the last factor, product so far)
    let mut frontier: Vec<(usize, f64)> = x.iter().copied().enumerate().collect();

    for _ in 1..degree {
        let mut next = Vec::with_capacity(frontier.len() * x.len());
        for &(last, product) in &frontier {
            for (j, &xj) in x.iter().enumerate().skip(last) {
                next.push((j, product * xj));
            }
        }
        out.extend(next.iter().map(|&(_, p)| p));
        frontier = next;
    }

    out
}

/// Number of terms [`polynomial_expand`] produces.
#[must_use]
pub fn expanded_len(inputs: usize, degree: u32) -> usize {
    // Sum over d of C(inputs + d - 1, d)
    let mut total = 0usize;
    let mut term = 1usize;
    for d in 1..=degree as usize {
        term = term * (inputs + d - 1) / d;
        total += term;
    }
    total
}

/// A fitted regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModel {
    pub kind: ModelKind,

    /// Polynomial degree (1 for the linear variant)
    pub degree: u32,

    /// Raw input width
    pub n_inputs: usize,

    pub scaler: StandardScaler,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl RegressionModel {
    /// Map a raw input row into the model's design space.
    #[must_use]
    pub fn design_row(kind: ModelKind, degree: u32, x: &[f64]) -> Vec<f64> {
        match kind {
            ModelKind::Linear => x.to_vec(),
            ModelKind::Polynomial => polynomial_expand(x, degree),
        }
    }

    /// Evaluate the model on a raw input row.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureMismatch` for a wrong-width input and
    /// `ModelError::NonFinite` if the output is NaN or infinite.
    pub fn evaluate(&self, x: &[f64]) -> Result<f64, ModelError> {
        if x.len() != self.n_inputs {
            return Err(ModelError::FeatureMismatch {
                expected: self.n_inputs,
                actual: x.len(),
            });
        }

        let design = Self::design_row(self.kind, self.degree, x);
        if design.len() != self.coefficients.len() {
            return Err(ModelError::FeatureMismatch {
                expected: self.coefficients.len(),
                actual: design.len(),
            });
        }

        let scaled = self.scaler.transform(&design);
        let value = self.intercept
            + scaled
                .iter()
                .zip(&self.coefficients)
                .map(|(v, c)| v * c)
                .sum::<f64>();

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ModelError::NonFinite)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_expand_order() {
        let expanded = polynomial_expand(&[2.0, 3.0], 2);
        assert_eq!(expanded, vec![2.0, 3.0, 4.0, 6.0, 9.0]);

        let cubic = polynomial_expand(&[2.0, 3.0], 3);
        assert_eq!(cubic.len(), 9);
        assert_eq!(&cubic[5..], &[8.0, 12.0, 18.0, 27.0]);
    }

    #[test]
    fn test_expanded_len() {
        assert_eq!(expanded_len(2, 2), 5);
        assert_eq!(expanded_len(11, 1), 11);
        assert_eq!(expanded_len(11, 2), 77);
        assert_eq!(polynomial_expand(&[1.0; 11], 3).len(), expanded_len(11, 3));
    }

    #[test]
    fn test_scaler_constant_column() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&rows);
        assert_eq!(scaler.mean, vec![2.0, 5.0]);
        assert_eq!(scaler.scale, vec![1.0, 1.0]);
        assert_eq!(scaler.transform(&[3.0, 5.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn test_evaluate_linear() {
        let model = RegressionModel {
            kind: ModelKind::Linear,
            degree: 1,
            n_inputs: 2,
            scaler: StandardScaler {
                mean: vec![0.0, 0.0],
                scale: vec![1.0, 2.0],
            },
            coefficients: vec![1.5, 4.0],
            intercept: 10.0,
        };
        let y = model.evaluate(&[2.0, 1.0]).expect("Should evaluate");
        assert!((y - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_evaluate_rejects_wrong_width() {
        let model = RegressionModel {
            kind: ModelKind::Polynomial,
            degree: 2,
            n_inputs: 2,
            scaler: StandardScaler {
                mean: vec![0.0; 5],
                scale: vec![1.0; 5],
            },
            coefficients: vec![0.0; 5],
            intercept: 1.0,
        };
        assert!(model.evaluate(&[1.0, 2.0]).is_ok());
        assert_eq!(
            model.evaluate(&[1.0]),
            Err(ModelError::FeatureMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::Polynomial.to_string(), "polynomial");
        assert!(ModelKind::Linear < ModelKind::Polynomial);
    }
}
