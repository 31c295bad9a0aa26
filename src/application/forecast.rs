//! Forecast service: end-to-end regional risk assessment.
//!
//! This service coordinates:
//! - History lookup
//! - Feature construction and prediction on one model snapshot
//! - Risk derivation, trend and multi-week projection
//! - Forecast and alert persistence

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use super::model_store::{ModelSnapshot, ModelStatus, ModelStore};
use crate::adapters::StorageError;
use crate::config::EngineConfig;
use crate::domain::{
    build_features, calendar_of, canonical_region_name, derive_risk, ensure_region_id,
    incidence_per_100k, population, Alert, AlertFilter, AlertKind, Calibration, FeatureVector,
    ForecastRecord, HistoricalRecord, ModelKind, NewAlert, PredictionResult, RiskAssessment,
    RiskLevel, TrendSummary, ValidationSummary, HISTORY_WINDOW,
};
use crate::ports::{HistoryProvider, Storage};
use crate::EpiwatchError;

/// Parameters of one regional assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentRequest {
    pub region_id: i64,

    /// Reference date; history is limited to weeks ending before it
    pub as_of: Option<NaiveDate>,

    /// Weeks to project (the first is the main forecast)
    pub horizon_weeks: u32,

    /// Compare against the observed week around `as_of`
    pub validate: bool,
}

impl AssessmentRequest {
    #[must_use]
    pub fn new(region_id: i64) -> Self {
        Self {
            region_id,
            as_of: None,
            horizon_weeks: 1,
            validate: false,
        }
    }

    #[must_use]
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    #[must_use]
    pub fn weeks(mut self, weeks: u32) -> Self {
        self.horizon_weeks = weeks;
        self
    }

    #[must_use]
    pub fn with_validation(mut self) -> Self {
        self.validate = true;
        self
    }
}

/// Forecast for one future week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyProjection {
    /// 1 for the main forecast
    pub week_offset: u32,
    pub week_end_date: NaiveDate,
    pub epi_week: u32,
    pub month: u32,
    pub model: Option<ModelKind>,
    pub predicted_cases: u64,
    pub predicted_incidence: f64,
    pub probability: f64,
    pub level: RiskLevel,
}

/// Full result of a regional assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionForecast {
    pub forecast_id: String,
    pub region_id: i64,
    pub region_name: String,
    pub population: u64,
    pub as_of: Option<NaiveDate>,

    /// Weeks of history the features were built from (at most 4)
    pub history_weeks: usize,

    pub features: FeatureVector,
    pub prediction: PredictionResult,
    pub risk: RiskAssessment,

    /// Predicted cases per 100,000 inhabitants, two decimals
    pub predicted_incidence: f64,

    pub trend: TrendSummary,
    pub projections: Vec<WeeklyProjection>,
    pub validation: Option<ValidationSummary>,

    /// No model produced a value, or the risk used the incidence proxy
    pub degraded: bool,

    /// Alert created by this assessment, if any
    pub alert: Option<Alert>,

    pub generated_at: DateTime<Utc>,
}

/// A region the alert sweep could not assess.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionFailure {
    pub region_id: i64,
    pub error: String,
}

/// Outcome of [`ForecastService::generate_alerts`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertSweep {
    pub regions_assessed: usize,
    pub alerts: Vec<Alert>,
    pub failures: Vec<RegionFailure>,
}

/// Outcome of [`ForecastService::status`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub model: ModelStatus,
    pub alert_threshold: f64,
    pub alerts_recorded: usize,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Calendar of the week after `(week, month)`; the month advances every fourth step.
fn next_calendar(week: u32, month: u32, step: u32) -> (u32, u32) {
    let week = if week >= 52 { 1 } else { week + 1 };
    let month = if step % 4 == 0 { month % 12 + 1 } else { month };
    (week, month)
}

/// Service for scoring regions and managing alerts.
pub struct ForecastService<H, S>
where
    H: HistoryProvider,
    S: Storage,
{
    history: Arc<H>,
    storage: Arc<S>,
    models: Arc<ModelStore>,
    config: EngineConfig,
}

impl<H, S> ForecastService<H, S>
where
    H: HistoryProvider,
    S: Storage,
    H::Error: Into<StorageError>,
    S::Error: Into<StorageError>,
{
    /// Create a new forecast service.
    pub fn new(
        history: Arc<H>,
        storage: Arc<S>,
        models: Arc<ModelStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            history,
            storage,
            models,
            config,
        }
    }

    /// Published model state and alert counters.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn status(&self) -> Result<EngineStatus, EpiwatchError> {
        let alerts_recorded = self
            .storage
            .count_alerts()
            .map_err(|e| EpiwatchError::Storage(e.into()))?;

        Ok(EngineStatus {
            model: self.models.snapshot().status(),
            alert_threshold: self.config.alert_threshold,
            alerts_recorded,
        })
    }

    /// Assess one region and persist the forecast (and an alert when the
    /// probability reaches the configured threshold).
    ///
    /// Persistence failures are logged and do not fail the assessment.
    ///
    /// # Errors
    /// Returns error for an invalid region id, a region without history, or
    /// a failing history lookup.
    pub fn assess_region(&self, request: &AssessmentRequest) -> Result<RegionForecast, EpiwatchError> {
        self.assess_with(request, AlertKind::Forecast)
    }

    fn assess_with(
        &self,
        request: &AssessmentRequest,
        alert_kind: AlertKind,
    ) -> Result<RegionForecast, EpiwatchError> {
        let (mut forecast, record) = self.score(request)?;

        if let Err(e) = self.storage.save_forecast(&record) {
            tracing::warn!("Failed to save forecast {}: {}", record.id, e);
        }

        if forecast.risk.is_alertable(self.config.alert_threshold) {
            let new_alert = NewAlert::from_assessment(
                alert_kind,
                forecast.region_id,
                forecast.region_name.clone(),
                &forecast.risk,
                forecast.prediction.best_count,
            );
            let created_at = Utc::now();
            match self.storage.save_alert(&new_alert, created_at) {
                Ok(id) => forecast.alert = Some(new_alert.into_alert(id, created_at)),
                Err(e) => tracing::warn!(
                    "Failed to save alert for region {}: {}",
                    forecast.region_id,
                    e
                ),
            }
        }

        Ok(forecast)
    }

    fn score(
        &self,
        request: &AssessmentRequest,
    ) -> Result<(RegionForecast, ForecastRecord), EpiwatchError> {
        let region_id = request.region_id;
        ensure_region_id(region_id)?;

        let history = self
            .history
            .recent_records(region_id, HISTORY_WINDOW, request.as_of)
            .map_err(|e| EpiwatchError::Storage(e.into()))?;
        if history.is_empty() {
            return Err(EpiwatchError::NoHistory { region_id });
        }

        // One snapshot for the whole assessment, projections included.
        let snapshot = self.models.snapshot();

        // Without a reference date the target is the week after the newest record.
        let target = request
            .as_of
            .unwrap_or(history[0].week_end_date + Duration::weeks(1));
        let (week, month) = calendar_of(target);
        let features =
            build_features(&history, region_id, Some(week), Some(month), snapshot.encoder())?;
        let prediction = snapshot.predict(&features);

        let population = population(region_id);
        let population_i64 = i64::try_from(population).unwrap_or(i64::MAX);
        let risk = derive_risk(prediction.best_count, population_i64, snapshot.thresholds())?;

        let projections = self.project(
            &snapshot,
            &history,
            region_id,
            &features,
            (&prediction, &risk),
            request.horizon_weeks,
        )?;

        let validation = if request.validate {
            self.validate(region_id, request.as_of, prediction.best_count)?
        } else {
            None
        };

        let degraded =
            prediction.is_degraded() || risk.calibration == Calibration::IncidenceProxy;
        if degraded {
            tracing::warn!(
                "Degraded assessment for region {} (model: {:?}, calibration: {})",
                region_id,
                prediction.best_model,
                risk.calibration.as_str()
            );
        }

        let record = ForecastRecord::new(region_id, prediction.best_model, prediction.best_count, &risk);
        tracing::info!(
            "Region {}: {} cases forecast, {} risk ({:.1}%)",
            region_id,
            prediction.best_count,
            risk.level,
            risk.probability
        );

        let forecast = RegionForecast {
            forecast_id: record.id.clone(),
            region_id,
            region_name: canonical_region_name(region_id),
            population,
            as_of: request.as_of,
            history_weeks: history.len(),
            trend: TrendSummary::from_features(&features),
            predicted_incidence: round2(incidence_per_100k(
                prediction.best_count as f64,
                population,
            )),
            features,
            prediction,
            risk,
            projections,
            validation,
            degraded,
            alert: None,
            generated_at: record.created_at,
        };

        Ok((forecast, record))
    }

    /// Roll the forecast forward one week at a time, feeding each prediction
    /// back in as the newest observation.
    fn project(
        &self,
        snapshot: &ModelSnapshot,
        history: &[HistoricalRecord],
        region_id: i64,
        features: &FeatureVector,
        first: (&PredictionResult, &RiskAssessment),
        horizon_weeks: u32,
    ) -> Result<Vec<WeeklyProjection>, EpiwatchError> {
        let horizon = horizon_weeks.clamp(1, self.config.max_projection_weeks.max(1));
        let population = population(region_id);
        let population_i64 = i64::try_from(population).unwrap_or(i64::MAX);

        let mut window = history.to_vec();
        let mut week_end = history[0].week_end_date;
        let (mut week, mut month) = (features.epi_week, features.month);
        let (mut model, mut cases) = (first.0.best_model, first.0.best_count);
        let (mut probability, mut level) = (first.1.probability, first.1.level);

        let mut projections = Vec::with_capacity(horizon as usize);
        for step in 0..horizon {
            if step > 0 {
                let incidence = incidence_per_100k(cases as f64, population);
                window.insert(0, HistoricalRecord::new(cases, incidence, week_end));
                window.truncate(HISTORY_WINDOW);
                (week, month) = next_calendar(week, month, step);

                let next = build_features(&window, region_id, Some(week), Some(month), snapshot.encoder())?;
                let prediction = snapshot.predict(&next);
                let risk = derive_risk(prediction.best_count, population_i64, snapshot.thresholds())?;

                model = prediction.best_model;
                cases = prediction.best_count;
                probability = risk.probability;
                level = risk.level;
            }
            week_end += Duration::weeks(1);

            projections.push(WeeklyProjection {
                week_offset: step + 1,
                week_end_date: week_end,
                epi_week: week,
                month,
                model,
                predicted_cases: cases,
                predicted_incidence: round2(incidence_per_100k(cases as f64, population)),
                probability,
                level,
            });
        }

        tracing::debug!("Projected region {} over {} weeks", region_id, horizon);
        Ok(projections)
    }

    fn validate(
        &self,
        region_id: i64,
        as_of: Option<NaiveDate>,
        predicted_cases: u64,
    ) -> Result<Option<ValidationSummary>, EpiwatchError> {
        let Some(date) = as_of else {
            tracing::debug!("Validation requested without a reference date; skipped");
            return Ok(None);
        };

        let observed = self
            .history
            .record_near(region_id, date, self.config.validation_tolerance_days)
            .map_err(|e| EpiwatchError::Storage(e.into()))?;

        if observed.is_none() {
            tracing::debug!("No observed week near {} for region {}", date, region_id);
        }

        Ok(observed.map(|obs| {
            ValidationSummary::compare(
                predicted_cases,
                obs.case_count,
                obs.incidence_rate,
                obs.week_end_date,
            )
        }))
    }

    /// Assess every region with data and record alerts for those at or above
    /// the threshold. A failing region is reported and the sweep continues.
    ///
    /// # Errors
    /// Returns error only if the list of regions cannot be read.
    pub fn generate_alerts(&self) -> Result<AlertSweep, EpiwatchError> {
        let regions = self
            .history
            .regions_with_data()
            .map_err(|e| EpiwatchError::Storage(e.into()))?;

        let mut sweep = AlertSweep::default();
        for region_id in regions {
            match self.assess_with(&AssessmentRequest::new(region_id), AlertKind::Automatic) {
                Ok(forecast) => {
                    sweep.regions_assessed += 1;
                    sweep.alerts.extend(forecast.alert);
                }
                Err(e) => {
                    tracing::warn!("Alert sweep skipped region {}: {}", region_id, e);
                    sweep.failures.push(RegionFailure {
                        region_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Alert sweep: {} regions assessed, {} alerts, {} failures",
            sweep.regions_assessed,
            sweep.alerts.len(),
            sweep.failures.len()
        );
        Ok(sweep)
    }

    /// Active alerts, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn active_alerts(&self, limit: usize) -> Result<Vec<Alert>, EpiwatchError> {
        self.storage
            .load_active_alerts(limit)
            .map_err(|e| EpiwatchError::Storage(e.into()))
    }

    /// Alerts of any status, filtered by region name and level.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn alert_history(&self, filter: &AlertFilter) -> Result<Vec<Alert>, EpiwatchError> {
        self.storage
            .load_alerts(filter)
            .map_err(|e| EpiwatchError::Storage(e.into()))
    }

    /// Mark an alert resolved.
    ///
    /// # Errors
    /// Returns `EpiwatchError::NotFound` if no alert has that id.
    pub fn resolve_alert(
        &self,
        id: i64,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<(), EpiwatchError> {
        let resolved = self
            .storage
            .resolve_alert(id, resolved_by, notes)
            .map_err(|e| EpiwatchError::Storage(e.into()))?;

        if resolved {
            Ok(())
        } else {
            Err(EpiwatchError::NotFound(format!("alert {id}")))
        }
    }

    /// Record an operator-entered alert, optionally tied to a region.
    ///
    /// An empty message is replaced by the level's standard message.
    ///
    /// # Errors
    /// Returns error for an invalid region id or if storage operation fails.
    pub fn create_manual_alert(
        &self,
        region_id: Option<i64>,
        level: RiskLevel,
        message: &str,
    ) -> Result<Alert, EpiwatchError> {
        if let Some(id) = region_id {
            ensure_region_id(id)?;
        }

        let message = message.trim();
        let new_alert = NewAlert {
            kind: AlertKind::Manual,
            level,
            region_id,
            region_name: region_id.map_or_else(|| "All regions".to_string(), canonical_region_name),
            message: if message.is_empty() {
                level.message().to_string()
            } else {
                message.to_string()
            },
            probability: level.floor_probability(),
            predicted_cases: 0,
        };

        let created_at = Utc::now();
        let id = self
            .storage
            .save_alert(&new_alert, created_at)
            .map_err(|e| EpiwatchError::Storage(e.into()))?;

        tracing::info!("Manual {} alert {} created for {}", level, id, new_alert.region_name);
        Ok(new_alert.into_alert(id, created_at))
    }

    /// Most recent stored forecasts.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn recent_forecasts(&self, limit: usize) -> Result<Vec<ForecastRecord>, EpiwatchError> {
        self.storage
            .load_recent_forecasts(limit)
            .map_err(|e| EpiwatchError::Storage(e.into()))
    }
}
