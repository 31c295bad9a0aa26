//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod forecast;
mod model_store;
mod training;

pub use forecast::{
    AlertSweep, AssessmentRequest, EngineStatus, ForecastService, RegionFailure, RegionForecast,
    WeeklyProjection,
};
pub use model_store::{ModelSnapshot, ModelStatus, ModelStore, TrainedModel};
pub use training::{
    parse_observations, train, TargetSummary, TrainingConfig, TrainingError, TrainingOutcome,
    TrainingReport, DEFAULT_TARGET,
};
