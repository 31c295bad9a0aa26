//! Short-term trend and forecast-vs-actual summaries.

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;

/// Percent change beyond which a trend counts as rising or falling.
pub const TREND_BAND_PCT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Rising,
    Stable,
    Falling,
}

/// Four-week case trend for a region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub cases_last_week: f64,
    pub cases_four_weeks_ago: f64,
    pub change_pct: f64,
    pub direction: TrendDirection,
    pub current_incidence_rate: f64,
}

impl TrendSummary {
    /// Derive the trend from the lag features.
    #[must_use]
    pub fn from_features(features: &FeatureVector) -> Self {
        let last = features.cases_lag[0];
        let earlier = features.cases_lag[3];

        let change_pct = if earlier > 0.0 {
            ((last - earlier) / earlier * 100.0 * 10.0).round() / 10.0
        } else {
            0.0
        };

        let direction = if change_pct > TREND_BAND_PCT {
            TrendDirection::Rising
        } else if change_pct < -TREND_BAND_PCT {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        };

        Self {
            cases_last_week: last,
            cases_four_weeks_ago: earlier,
            change_pct,
            direction,
            current_incidence_rate: features.rate_lag[0],
        }
    }
}

/// Comparison of a forecast against the observed count for the same week.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub actual_cases: u64,
    pub predicted_cases: u64,
    pub actual_incidence_rate: f64,
    pub observed_week_end: chrono::NaiveDate,
    pub absolute_error: u64,
    pub percentage_error: f64,
}

impl ValidationSummary {
    #[must_use]
    pub fn compare(
        predicted_cases: u64,
        actual_cases: u64,
        actual_incidence_rate: f64,
        observed_week_end: chrono::NaiveDate,
    ) -> Self {
        let absolute_error = predicted_cases.abs_diff(actual_cases);
        let percentage_error =
            (absolute_error as f64 / actual_cases.max(1) as f64 * 100.0 * 10.0).round() / 10.0;
        Self {
            actual_cases,
            predicted_cases,
            actual_incidence_rate,
            observed_week_end,
            absolute_error,
            percentage_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(lags: [f64; 4]) -> FeatureVector {
        FeatureVector {
            cases_lag: lags,
            rate_lag: [3.2, 2.0],
            rolling_mean_4w: lags.iter().sum::<f64>() / 4.0,
            trend_4w: lags[0] - lags[3],
            epi_week: 10,
            month: 3,
            region_code: 0,
        }
    }

    #[test]
    fn test_rising_trend() {
        let trend = TrendSummary::from_features(&features([10.0, 8.0, 6.0, 4.0]));
        assert_eq!(trend.change_pct, 150.0);
        assert_eq!(trend.direction, TrendDirection::Rising);
        assert_eq!(trend.current_incidence_rate, 3.2);
    }

    #[test]
    fn test_falling_and_stable() {
        let falling = TrendSummary::from_features(&features([6.0, 8.0, 9.0, 9.0]));
        assert_eq!(falling.change_pct, -33.3);
        assert_eq!(falling.direction, TrendDirection::Falling);

        let stable = TrendSummary::from_features(&features([21.0, 20.0, 20.0, 20.0]));
        assert_eq!(stable.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_zero_baseline_is_stable() {
        let trend = TrendSummary::from_features(&features([5.0, 0.0, 0.0, 0.0]));
        assert_eq!(trend.change_pct, 0.0);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_validation_errors() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 4).expect("valid date");
        let v = ValidationSummary::compare(12, 8, 0.5, date);
        assert_eq!(v.absolute_error, 4);
        assert_eq!(v.percentage_error, 50.0);

        let zero = ValidationSummary::compare(3, 0, 0.0, date);
        assert_eq!(zero.percentage_error, 300.0);
    }
}
