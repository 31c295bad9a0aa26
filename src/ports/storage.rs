//! Storage port: Trait for alert and forecast persistence.
//!
//! This trait abstracts the storage backend (SQLite) from the application logic.

use chrono::{DateTime, Utc};

use crate::domain::{Alert, AlertFilter, ForecastRecord, NewAlert};

/// Persistence sink for alerts and scored forecasts.
pub trait Storage: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a new alert with `Active` status.
    ///
    /// # Returns
    /// The id assigned to the alert.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save_alert(&self, alert: &NewAlert, created_at: DateTime<Utc>) -> Result<i64, Self::Error>;

    /// Load active alerts, newest first (up to `limit`).
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_active_alerts(&self, limit: usize) -> Result<Vec<Alert>, Self::Error>;

    /// Load alerts of any status matching `filter`, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, Self::Error>;

    /// Mark an alert resolved.
    ///
    /// # Returns
    /// `false` if no alert has that id.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn resolve_alert(
        &self,
        id: i64,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<bool, Self::Error>;

    /// Get the total count of alerts.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count_alerts(&self) -> Result<usize, Self::Error>;

    /// Save a scored forecast.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save_forecast(&self, record: &ForecastRecord) -> Result<(), Self::Error>;

    /// Load recent forecasts (up to `limit`), newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_recent_forecasts(&self, limit: usize) -> Result<Vec<ForecastRecord>, Self::Error>;
}
