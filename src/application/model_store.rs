//! Model store: the currently published set of trained models.
//!
//! A [`ModelSnapshot`] is immutable once built. Retraining builds a new
//! snapshot and swaps the shared pointer; callers that already hold an
//! `Arc<ModelSnapshot>` keep using the old one until they drop it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::training::{self, TrainingConfig, TrainingError, TrainingOutcome};
use crate::domain::{
    FeatureVector, FitMetrics, ModelBundle, ModelKind, ModelOutcome, ModelReport,
    PredictionResult, RawDataset, RegionEncoder, RiskThresholds,
};
use crate::ports::Regressor;

/// An invokable model together with the metrics recorded when it was fitted.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub regressor: Arc<dyn Regressor>,
    pub metrics: FitMetrics,
}

impl TrainedModel {
    #[must_use]
    pub fn new(regressor: Arc<dyn Regressor>, metrics: FitMetrics) -> Self {
        Self { regressor, metrics }
    }
}

/// What a snapshot holds, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub models: BTreeMap<ModelKind, FitMetrics>,
    pub thresholds: Option<RiskThresholds>,
    pub regions_encoded: usize,
    pub trained_at: Option<DateTime<Utc>>,

    /// Predictions or risk calibration would fall back
    pub degraded: bool,
}

/// One consistent view of models, calibration and region encoder.
#[derive(Debug, Clone, Default)]
pub struct ModelSnapshot {
    models: BTreeMap<ModelKind, TrainedModel>,
    thresholds: Option<RiskThresholds>,
    encoder: RegionEncoder,
    trained_at: Option<DateTime<Utc>>,
}

impl ModelSnapshot {
    /// Snapshot with nothing loaded. Predictions degrade.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_bundle(bundle: ModelBundle) -> Self {
        let mut models = BTreeMap::new();
        for (kind, stored) in [
            (ModelKind::Linear, bundle.linear),
            (ModelKind::Polynomial, bundle.polynomial),
        ] {
            if let Some(stored) = stored {
                models.insert(
                    kind,
                    TrainedModel::new(Arc::new(stored.model), stored.metrics),
                );
            }
        }

        Self {
            models,
            thresholds: bundle.thresholds,
            encoder: bundle.encoder,
            trained_at: Some(bundle.trained_at),
        }
    }

    #[must_use]
    pub fn with_model(mut self, kind: ModelKind, model: TrainedModel) -> Self {
        self.models.insert(kind, model);
        self
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    #[must_use]
    pub fn with_encoder(mut self, encoder: RegionEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    #[must_use]
    pub fn has_models(&self) -> bool {
        !self.models.is_empty()
    }

    #[must_use]
    pub fn loaded_kinds(&self) -> Vec<ModelKind> {
        self.models.keys().copied().collect()
    }

    #[must_use]
    pub fn thresholds(&self) -> Option<&RiskThresholds> {
        self.thresholds.as_ref()
    }

    #[must_use]
    pub fn encoder(&self) -> &RegionEncoder {
        &self.encoder
    }

    #[must_use]
    pub fn status(&self) -> ModelStatus {
        let calibrated = self.thresholds.is_some_and(|t| t.is_usable());
        ModelStatus {
            models: self
                .models
                .iter()
                .map(|(kind, model)| (*kind, model.metrics))
                .collect(),
            thresholds: self.thresholds,
            regions_encoded: self.encoder.classes().len(),
            trained_at: self.trained_at,
            degraded: !self.has_models() || !calibrated,
        }
    }

    /// Run every loaded model and pick the best by stored cross-validated R².
    ///
    /// Never fails: a model error is recorded in its report, and with no
    /// usable model the result is degraded (`best_model == None`).
    #[must_use]
    pub fn predict(&self, features: &FeatureVector) -> PredictionResult {
        let input = features.to_array();

        let per_model = self
            .models
            .iter()
            .map(|(kind, model)| {
                let report = match model.regressor.predict(&input) {
                    Ok(raw) => ModelReport::Ok(ModelOutcome::from_raw(
                        raw,
                        model.metrics.r_squared_cv,
                        model.metrics.mean_absolute_error,
                    )),
                    Err(e) => {
                        tracing::warn!("{} model failed: {}", kind, e);
                        ModelReport::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                (*kind, report)
            })
            .collect();

        let result = PredictionResult::select(per_model);
        if result.is_degraded() {
            tracing::debug!("No usable model; prediction degraded");
        }
        result
    }
}

/// Holder of the published snapshot.
///
/// # Lock Behavior
///
/// A poisoned lock (from panic in another thread) will cause panic.
#[derive(Debug)]
pub struct ModelStore {
    current: RwLock<Arc<ModelSnapshot>>,
    retrain_lock: Mutex<()>,
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(ModelSnapshot::empty())
    }
}

impl ModelStore {
    #[must_use]
    pub fn new(snapshot: ModelSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            retrain_lock: Mutex::new(()),
        }
    }

    /// The snapshot to use for one whole operation.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ModelSnapshot> {
        Arc::clone(&self.current.read().expect("Lock failed"))
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: ModelSnapshot) {
        let kinds = snapshot.loaded_kinds();
        *self.current.write().expect("Lock failed") = Arc::new(snapshot);
        tracing::info!("Published model snapshot with {:?}", kinds);
    }

    /// Train from a dataset and publish the result.
    ///
    /// Concurrent retrains are serialized. On error the published snapshot
    /// is left untouched.
    ///
    /// # Errors
    /// Returns error if training fails.
    pub fn retrain(
        &self,
        dataset: &RawDataset,
        target_column: &str,
        config: &TrainingConfig,
    ) -> Result<TrainingOutcome, TrainingError> {
        let _guard = self.retrain_lock.lock().expect("Lock failed");

        let outcome = training::train(dataset, target_column, config)?;
        self.publish(ModelSnapshot::from_bundle(outcome.bundle.clone()));
        Ok(outcome)
    }
}
