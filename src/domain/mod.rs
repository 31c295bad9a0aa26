//! Domain layer: Core epidemiological types and pure scoring logic.
//!
//! Nothing in here performs I/O. The one impure input is the calendar
//! default in [`build_features`] when week/month are omitted.

mod alert;
mod bundle;
mod dataset;
mod features;
mod prediction;
mod record;
mod region;
mod regression;
mod risk;
mod trend;
mod validation;

pub use alert::{Alert, AlertFilter, AlertKind, AlertStatus, ForecastRecord, NewAlert};
pub use bundle::{feature_layout, ModelBundle, StoredModel};
pub use dataset::RawDataset;
pub use features::{
    build_features, calendar_of, encode_region, FeatureVector, FEATURE_COUNT, FEATURE_NAMES,
    HISTORY_WINDOW,
};
pub use prediction::{ModelOutcome, ModelReport, PredictionResult};
pub use record::{incidence_per_100k, HistoricalRecord};
pub use region::{
    canonical_region_name, find_region, population, LookupError, Region, RegionEncoder,
    DEFAULT_POPULATION, REGIONS,
};
pub use regression::{
    expanded_len, polynomial_expand, FitMetrics, ModelError, ModelKind, RegressionModel,
    StandardScaler,
};
pub use risk::{
    derive_risk, percentile, Calibration, RiskAssessment, RiskLevel, RiskThresholds,
    ALERT_PROBABILITY, MIN_DENOMINATOR,
};
pub use trend::{TrendDirection, TrendSummary, ValidationSummary, TREND_BAND_PCT};
pub use validation::{ensure_region_id, ValidationError};
