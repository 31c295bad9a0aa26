//! Per-model forecasts and best-model selection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::regression::ModelKind;

/// Successful output of one model variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelOutcome {
    /// `raw_value` clamped at zero and rounded
    pub predicted_count: u64,

    /// Unclamped model output
    pub raw_value: f64,

    /// Cross-validated R² recorded at training time
    pub fit_r2: f64,

    /// Test MAE recorded at training time
    pub fit_mae: f64,
}

impl ModelOutcome {
    /// Wrap a raw model output together with its stored metrics.
    #[must_use]
    pub fn from_raw(raw_value: f64, fit_r2: f64, fit_mae: f64) -> Self {
        Self {
            predicted_count: raw_value.max(0.0).round() as u64,
            raw_value,
            fit_r2,
            fit_mae,
        }
    }
}

/// Result of running one model variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelReport {
    Ok(ModelOutcome),
    Failed { error: String },
}

impl ModelReport {
    #[must_use]
    pub fn outcome(&self) -> Option<&ModelOutcome> {
        match self {
            Self::Ok(outcome) => Some(outcome),
            Self::Failed { .. } => None,
        }
    }
}

/// Combined forecast over every loaded model variant.
///
/// Variants that are not loaded are absent from `per_model`. When no
/// variant produced a value, `best_model` is `None` and `best_count` is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub per_model: BTreeMap<ModelKind, ModelReport>,
    pub best_model: Option<ModelKind>,
    pub best_count: u64,
}

impl PredictionResult {
    /// Select the best error-free variant by stored fit R².
    ///
    /// Ties go to the polynomial variant.
    #[must_use]
    pub fn select(per_model: BTreeMap<ModelKind, ModelReport>) -> Self {
        let linear = per_model.get(&ModelKind::Linear).and_then(ModelReport::outcome);
        let polynomial = per_model
            .get(&ModelKind::Polynomial)
            .and_then(ModelReport::outcome);

        let best = match (linear, polynomial) {
            (Some(lin), Some(poly)) => {
                if poly.fit_r2 >= lin.fit_r2 {
                    Some((ModelKind::Polynomial, poly.predicted_count))
                } else {
                    Some((ModelKind::Linear, lin.predicted_count))
                }
            }
            (Some(lin), None) => Some((ModelKind::Linear, lin.predicted_count)),
            (None, Some(poly)) => Some((ModelKind::Polynomial, poly.predicted_count)),
            (None, None) => None,
        };

        Self {
            best_model: best.map(|(kind, _)| kind),
            best_count: best.map_or(0, |(_, count)| count),
            per_model,
        }
    }

    /// No variant produced a usable forecast.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.best_model.is_none()
    }

    /// Outcome of the selected variant.
    #[must_use]
    pub fn best_outcome(&self) -> Option<&ModelOutcome> {
        self.best_model
            .and_then(|kind| self.per_model.get(&kind))
            .and_then(ModelReport::outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(raw: f64, r2: f64) -> ModelReport {
        ModelReport::Ok(ModelOutcome::from_raw(raw, r2, 1.0))
    }

    #[test]
    fn test_outcome_clamps_and_rounds() {
        let neg = ModelOutcome::from_raw(-3.7, 0.5, 1.0);
        assert_eq!(neg.predicted_count, 0);
        assert_eq!(neg.raw_value, -3.7);

        assert_eq!(ModelOutcome::from_raw(12.5, 0.5, 1.0).predicted_count, 13);
        assert_eq!(ModelOutcome::from_raw(12.49, 0.5, 1.0).predicted_count, 12);
    }

    #[test]
    fn test_tie_prefers_polynomial() {
        let per_model = BTreeMap::from([
            (ModelKind::Linear, ok(10.0, 0.8)),
            (ModelKind::Polynomial, ok(14.0, 0.8)),
        ]);
        let result = PredictionResult::select(per_model);
        assert_eq!(result.best_model, Some(ModelKind::Polynomial));
        assert_eq!(result.best_count, 14);
    }

    #[test]
    fn test_higher_r2_wins() {
        let per_model = BTreeMap::from([
            (ModelKind::Linear, ok(10.0, 0.9)),
            (ModelKind::Polynomial, ok(14.0, 0.8)),
        ]);
        let result = PredictionResult::select(per_model);
        assert_eq!(result.best_model, Some(ModelKind::Linear));
        assert_eq!(result.best_count, 10);
        assert_eq!(result.best_outcome().map(|o| o.raw_value), Some(10.0));
    }

    #[test]
    fn test_failed_variant_is_skipped() {
        let per_model = BTreeMap::from([
            (ModelKind::Linear, ok(10.0, 0.5)),
            (
                ModelKind::Polynomial,
                ModelReport::Failed {
                    error: "boom".to_string(),
                },
            ),
        ]);
        let result = PredictionResult::select(per_model);
        assert_eq!(result.best_model, Some(ModelKind::Linear));
    }

    #[test]
    fn test_nothing_usable_degrades() {
        let result = PredictionResult::select(BTreeMap::new());
        assert!(result.is_degraded());
        assert_eq!(result.best_count, 0);
        assert!(result.best_outcome().is_none());
    }
}
