//! Feature construction from a short window of weekly observations.
//!
//! The same builder is used when assembling training rows and when scoring,
//! so the column layout in [`FEATURE_NAMES`] is the contract between the two.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::record::HistoricalRecord;
use super::region::{canonical_region_name, RegionEncoder};
use super::validation::{ensure_region_id, ValidationError};

/// Number of most-recent observations the builder reads.
pub const HISTORY_WINDOW: usize = 4;

/// Width of the model input.
pub const FEATURE_COUNT: usize = 11;

/// Column names in model input order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "cases_lag_1w",
    "cases_lag_2w",
    "cases_lag_3w",
    "cases_lag_4w",
    "rate_lag_1w",
    "rate_lag_2w",
    "cases_mean_4w",
    "cases_trend_4w",
    "epi_week",
    "month",
    "region_code",
];

/// Fixed-width model input for one region and one target week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Case counts, lag 1 (most recent) to lag 4
    pub cases_lag: [f64; 4],

    /// Incidence rates, lag 1 and lag 2
    pub rate_lag: [f64; 2],

    /// Mean of the available case counts (up to 4)
    pub rolling_mean_4w: f64,

    /// `cases_lag[0] - cases_lag[3]`
    pub trend_4w: f64,

    /// ISO week number (1..=53)
    pub epi_week: u32,

    /// Calendar month (1..=12)
    pub month: u32,

    /// Encoded region identifier
    pub region_code: i64,
}

impl FeatureVector {
    /// Flatten into model input order (see [`FEATURE_NAMES`]).
    #[must_use]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.cases_lag[0],
            self.cases_lag[1],
            self.cases_lag[2],
            self.cases_lag[3],
            self.rate_lag[0],
            self.rate_lag[1],
            self.rolling_mean_4w,
            self.trend_4w,
            f64::from(self.epi_week),
            f64::from(self.month),
            self.region_code as f64,
        ]
    }
}

/// ISO week and month of a date.
#[must_use]
pub fn calendar_of(date: NaiveDate) -> (u32, u32) {
    (date.iso_week().week(), date.month())
}

/// Resolve the region code, falling back to `region_id - 1` for names the
/// encoder never saw.
///
/// The fallback may collide with a real code when the encoder vocabulary is
/// ordered differently from the numeric ids.
#[must_use]
pub fn encode_region(region_id: i64, encoder: &RegionEncoder) -> i64 {
    let name = canonical_region_name(region_id);
    match encoder.encode(&name) {
        Ok(code) => i64::from(code),
        Err(e) => {
            tracing::warn!(
                "{e}; using surrogate code {} for region {region_id}",
                region_id - 1
            );
            region_id - 1
        }
    }
}

/// Build the feature vector for the week following `history[0]`.
///
/// Only the first [`HISTORY_WINDOW`] entries of `history` are read. Missing
/// lags repeat the most recent value, or are zero for an empty history.
/// `week`/`month` default to today's calendar, so callers wanting
/// reproducible output must pass them explicitly.
///
/// # Errors
/// Returns `ValidationError::InvalidRegionId` if `region_id <= 0`.
pub fn build_features(
    history: &[HistoricalRecord],
    region_id: i64,
    week: Option<u32>,
    month: Option<u32>,
    encoder: &RegionEncoder,
) -> Result<FeatureVector, ValidationError> {
    ensure_region_id(region_id)?;

    let window = &history[..history.len().min(HISTORY_WINDOW)];
    let lagged = |k: usize| window.get(k).or_else(|| window.first());

    let mut cases_lag = [0.0; 4];
    for (k, slot) in cases_lag.iter_mut().enumerate() {
        *slot = lagged(k).map_or(0.0, |r| r.case_count as f64);
    }

    let mut rate_lag = [0.0; 2];
    for (k, slot) in rate_lag.iter_mut().enumerate() {
        *slot = lagged(k).map_or(0.0, |r| r.incidence_rate);
    }

    // Denominator is the number of weeks actually present.
    let rolling_mean_4w = if window.is_empty() {
        0.0
    } else {
        window.iter().map(|r| r.case_count as f64).sum::<f64>() / window.len() as f64
    };

    let (week, month) = match (week, month) {
        (Some(w), Some(m)) => (w, m),
        (w, m) => {
            let (today_week, today_month) = calendar_of(chrono::Local::now().date_naive());
            (w.unwrap_or(today_week), m.unwrap_or(today_month))
        }
    };

    Ok(FeatureVector {
        cases_lag,
        rate_lag,
        rolling_mean_4w,
        trend_4w: cases_lag[0] - cases_lag[3],
        epi_week: week,
        month,
        region_code: encode_region(region_id, encoder),
    })
}
