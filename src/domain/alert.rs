//! Alert and forecast-history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::regression::ModelKind;
use super::risk::{Calibration, RiskAssessment, RiskLevel};

/// How an alert was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Region sweep over all regions with data
    Automatic,
    /// Single-region assessment
    Forecast,
    /// Entered by an operator
    Manual,
}

impl AlertKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Forecast => "forecast",
            Self::Manual => "manual",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "automatic" => Self::Automatic,
            "forecast" => Self::Forecast,
            _ => Self::Manual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
        }
    }
}

/// Alert to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub kind: AlertKind,
    pub level: RiskLevel,
    pub region_id: Option<i64>,
    pub region_name: String,
    pub message: String,
    pub probability: f64,
    pub predicted_cases: u64,
}

impl NewAlert {
    /// Alert describing a risk assessment for a region.
    #[must_use]
    pub fn from_assessment(
        kind: AlertKind,
        region_id: i64,
        region_name: impl Into<String>,
        risk: &RiskAssessment,
        predicted_cases: u64,
    ) -> Self {
        Self {
            kind,
            level: risk.level,
            region_id: Some(region_id),
            region_name: region_name.into(),
            message: risk.message.clone(),
            probability: risk.probability,
            predicted_cases,
        }
    }

    /// The stored form of this alert, freshly saved under `id`.
    #[must_use]
    pub fn into_alert(self, id: i64, created_at: DateTime<Utc>) -> Alert {
        Alert {
            id,
            kind: self.kind,
            level: self.level,
            region_id: self.region_id,
            region_name: self.region_name,
            message: self.message,
            probability: self.probability,
            predicted_cases: self.predicted_cases,
            created_at,
            status: AlertStatus::Active,
            resolved_by: None,
            resolved_at: None,
            notes: None,
        }
    }
}

/// Stored alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub kind: AlertKind,
    pub level: RiskLevel,
    pub region_id: Option<i64>,
    pub region_name: String,
    pub message: String,
    pub probability: f64,
    pub predicted_cases: u64,
    pub created_at: DateTime<Utc>,
    pub status: AlertStatus,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Filter for alert history queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub region_name: Option<String>,
    pub level: Option<RiskLevel>,
    pub limit: usize,
}

/// One scored forecast, kept for history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub id: String,
    pub region_id: i64,
    pub model: Option<ModelKind>,
    pub predicted_cases: u64,
    pub probability: f64,
    pub level: RiskLevel,
    pub calibration: Calibration,
    pub created_at: DateTime<Utc>,
}

impl ForecastRecord {
    #[must_use]
    pub fn new(
        region_id: i64,
        model: Option<ModelKind>,
        predicted_cases: u64,
        risk: &RiskAssessment,
    ) -> Self {
        Self {
            id: uuid_v4(),
            region_id,
            model,
            predicted_cases,
            probability: risk.probability,
            level: risk.level,
            calibration: risk.calibration,
            created_at: Utc::now(),
        }
    }
}

/// Random (v4) UUID string.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::derive_risk;

    #[test]
    fn test_alert_from_assessment() {
        let risk = derive_risk(500, 1_000_000, None).expect("Should derive");
        let alert = NewAlert::from_assessment(AlertKind::Automatic, 20, "Oaxaca", &risk, 500);

        assert_eq!(alert.level, RiskLevel::Critical);
        assert_eq!(alert.region_id, Some(20));
        assert_eq!(alert.message, RiskLevel::Critical.message());
        assert_eq!(alert.predicted_cases, 500);
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(AlertKind::parse("automatic"), AlertKind::Automatic);
        assert_eq!(AlertKind::parse("forecast"), AlertKind::Forecast);
        assert_eq!(AlertKind::parse("anything"), AlertKind::Manual);
    }

    #[test]
    fn test_forecast_record_ids_unique() {
        let risk = derive_risk(1, 1_000, None).expect("Should derive");
        let a = ForecastRecord::new(1, Some(ModelKind::Linear), 1, &risk);
        let b = ForecastRecord::new(1, Some(ModelKind::Linear), 1, &risk);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 36);
    }
}
