//! # Epiwatch
//!
//! Weekly epidemiological case forecasting and outbreak risk scoring.
//!
//! This crate provides:
//! - Feature construction from a short window of weekly case counts
//! - Linear and polynomial regression models with best-model selection
//! - Percentile-calibrated risk probabilities, tiers and alerts
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types and pure scoring functions
//! - `ports`: Trait definitions for models, history and persistence
//! - `adapters`: Concrete implementations (SQLite, model files, CSV)
//! - `application`: Model store, training and the forecast service

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{AssessmentRequest, ForecastService, ModelStore, RegionForecast};
pub use config::EngineConfig;
pub use domain::{derive_risk, FeatureVector, PredictionResult, RiskAssessment, RiskLevel};

/// Result type for Epiwatch operations
pub type Result<T> = std::result::Result<T, EpiwatchError>;

/// Main error type for Epiwatch
#[derive(Debug, thiserror::Error)]
pub enum EpiwatchError {
    #[error("Invalid input: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("No historical data for region {region_id}")]
    NoHistory { region_id: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Training failed: {0}")]
    Training(#[from] application::TrainingError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Model artifact error: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] adapters::DatasetError),
}
