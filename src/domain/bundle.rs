//! Serializable set of trained artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::features::FEATURE_NAMES;
use super::region::RegionEncoder;
use super::regression::{FitMetrics, RegressionModel};
use super::risk::RiskThresholds;

/// A fitted model together with its training metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModel {
    pub model: RegressionModel,
    pub metrics: FitMetrics,
}

/// Everything a training run produces, persisted and loaded as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub linear: Option<StoredModel>,
    pub polynomial: Option<StoredModel>,
    pub thresholds: Option<RiskThresholds>,
    pub encoder: RegionEncoder,

    /// Input column order the models were fitted on
    pub feature_names: Vec<String>,

    pub trained_at: DateTime<Utc>,
}

impl ModelBundle {
    /// Whether the stored column layout matches this build's feature builder.
    #[must_use]
    pub fn matches_feature_layout(&self) -> bool {
        self.feature_names.iter().map(String::as_str).eq(FEATURE_NAMES)
    }
}

/// Current column names as owned strings.
#[must_use]
pub fn feature_layout() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect()
}
