//! Outbreak risk derivation.
//!
//! A forecast case count is mapped to a probability in `[0, 100]` through a
//! piecewise-linear ramp over the historical percentiles of weekly cases.
//! When no usable percentiles exist, a crude incidence proxy is used instead
//! and the assessment is tagged so callers can tell the two apart.

use serde::{Deserialize, Serialize};

use super::record::incidence_per_100k;
use super::validation::ValidationError;

/// Floor for every ramp denominator, so collapsed percentiles never divide by zero.
pub const MIN_DENOMINATOR: f64 = 0.01;

/// Probability at which an alert record is created.
pub const ALERT_PROBABILITY: f64 = 25.0;

/// Risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Expected cases within the usual range
    Low,
    /// Above the regional median
    Moderate,
    /// Above the usual range
    High,
    /// At or beyond the historical upper range
    Critical,
}

impl RiskLevel {
    /// Tier for a probability, evaluated high to low.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 75.0 {
            Self::Critical
        } else if probability >= 50.0 {
            Self::High
        } else if probability >= 25.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    /// Lowest probability that maps to this tier.
    #[must_use]
    pub fn floor_probability(&self) -> f64 {
        match self {
            Self::Low => 0.0,
            Self::Moderate => 25.0,
            Self::High => 50.0,
            Self::Critical => 75.0,
        }
    }

    /// Fixed situation message.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::Low => "Low outbreak risk: expected cases are within the usual range for this region.",
            Self::Moderate => "Moderate outbreak risk: expected cases are above the regional median.",
            Self::High => "High outbreak risk: expected cases exceed the usual range for this region.",
            Self::Critical => "Critical outbreak risk: expected cases reach the historical upper range.",
        }
    }

    /// Fixed recommended action.
    #[must_use]
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Low => "Maintain routine surveillance and standard vector control.",
            Self::Moderate => "Intensify surveillance, check reporting completeness and prepare response teams.",
            Self::High => "Launch prevention campaigns, extend vector control coverage and notify health units.",
            Self::Critical => "Activate the emergency response plan, reinforce hospital capacity and issue a public health alert.",
        }
    }

    /// Stable lowercase name used in storage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse the storage name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "moderate" => Some(Self::Moderate),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Percentile cut points of historical weekly case counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl RiskThresholds {
    /// Compute the cut points from a target distribution.
    ///
    /// Returns `None` for an empty slice.
    #[must_use]
    pub fn from_targets(targets: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = targets.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            p25: percentile(&sorted, 25.0),
            p50: percentile(&sorted, 50.0),
            p75: percentile(&sorted, 75.0),
            p90: percentile(&sorted, 90.0),
        })
    }

    /// A table is only usable when its upper quartile is positive.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.p75 > 0.0
    }
}

/// Linear-interpolated percentile of an ascending slice.
#[must_use]
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = pct / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Which formula produced a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calibration {
    /// Piecewise ramp over the percentile table
    Percentile,
    /// Incidence-based fallback, used when no usable table exists
    IncidenceProxy,
}

impl Calibration {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentile => "percentile",
            Self::IncidenceProxy => "incidence_proxy",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentile" => Some(Self::Percentile),
            "incidence_proxy" => Some(Self::IncidenceProxy),
            _ => None,
        }
    }
}

/// Output of [`derive_risk`]. Built fresh on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Probability in `[0, 100]`, one decimal
    pub probability: f64,

    pub level: RiskLevel,

    /// 1 iff `probability >= 50`
    pub binary_class: u8,

    pub message: String,
    pub recommendation: String,
    pub calibration: Calibration,
}

impl RiskAssessment {
    fn from_probability(probability: f64, calibration: Calibration) -> Self {
        let level = RiskLevel::from_probability(probability);
        Self {
            probability,
            level,
            binary_class: u8::from(probability >= 50.0),
            message: level.message().to_string(),
            recommendation: level.recommendation().to_string(),
            calibration,
        }
    }

    /// Whether this assessment warrants an alert record.
    #[must_use]
    pub fn is_alertable(&self, threshold: f64) -> bool {
        self.probability >= threshold
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn ramp(count: f64, lo: f64, hi: f64, base: f64) -> f64 {
    base + 25.0 * (count - lo) / (hi - lo).max(MIN_DENOMINATOR)
}

fn calibrated_probability(count: f64, t: &RiskThresholds) -> f64 {
    if count <= 0.0 {
        0.0
    } else if count <= t.p25 {
        ramp(count, 0.0, t.p25, 0.0)
    } else if count <= t.p50 {
        ramp(count, t.p25, t.p50, 25.0)
    } else if count <= t.p75 {
        ramp(count, t.p50, t.p75, 50.0)
    } else {
        75.0 + (25.0 * (count - t.p75) / (t.p90 - t.p75).max(MIN_DENOMINATOR)).min(25.0)
    }
}

fn proxy_probability(count: f64, population: u64) -> f64 {
    (incidence_per_100k(count, population) * 2.0).clamp(0.0, 100.0)
}

/// Convert a forecast case count into a risk assessment.
///
/// Uses the percentile ramp when `thresholds` is present and usable,
/// otherwise the incidence proxy `clamp(0, 100, incidence_per_100k * 2)`.
///
/// # Errors
/// Returns `ValidationError::NonPositivePopulation` if `population <= 0`.
pub fn derive_risk(
    predicted_count: u64,
    population: i64,
    thresholds: Option<&RiskThresholds>,
) -> Result<RiskAssessment, ValidationError> {
    if population <= 0 {
        return Err(ValidationError::NonPositivePopulation(population));
    }

    let count = predicted_count as f64;
    let (raw, calibration) = match thresholds.filter(|t| t.is_usable()) {
        Some(t) => (calibrated_probability(count, t), Calibration::Percentile),
        None => (
            proxy_probability(count, population as u64),
            Calibration::IncidenceProxy,
        ),
    };

    Ok(RiskAssessment::from_probability(
        round1(raw.clamp(0.0, 100.0)),
        calibration,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const OAXACA: i64 = 4_432_900;

    fn thresholds() -> RiskThresholds {
        RiskThresholds {
            p25: 2.0,
            p50: 5.0,
            p75: 9.0,
            p90: 15.0,
        }
    }

    #[test]
    fn test_upper_quartile_boundary_is_critical() {
        let risk = derive_risk(9, OAXACA, Some(&thresholds())).expect("Should derive");
        assert_eq!(risk.probability, 75.0);
        assert_eq!(risk.level, RiskLevel::Critical);
        assert_eq!(risk.binary_class, 1);
        assert_eq!(risk.calibration, Calibration::Percentile);
    }

    #[test]
    fn test_calibrated_segments() {
        let t = thresholds();
        let p = |c| derive_risk(c, OAXACA, Some(&t)).expect("Should derive").probability;

        assert_eq!(p(0), 0.0);
        assert_eq!(p(1), 12.5);
        assert_eq!(p(2), 25.0);
        assert_eq!(p(4), 41.7);
        assert_eq!(p(5), 50.0);
        assert_eq!(p(7), 62.5);
        assert_eq!(p(12), 87.5);
        assert_eq!(p(15), 100.0);
        assert_eq!(p(10_000), 100.0);
    }

    #[test]
    fn test_levels_and_messages() {
        let t = thresholds();
        let low = derive_risk(1, OAXACA, Some(&t)).expect("Should derive");
        assert_eq!(low.level, RiskLevel::Low);
        assert_eq!(low.binary_class, 0);
        assert_eq!(
            low.message,
            "Low outbreak risk: expected cases are within the usual range for this region."
        );
        assert_eq!(
            low.recommendation,
            "Maintain routine surveillance and standard vector control."
        );

        let moderate = derive_risk(2, OAXACA, Some(&t)).expect("Should derive");
        assert_eq!(moderate.level, RiskLevel::Moderate);
        assert!(moderate.is_alertable(ALERT_PROBABILITY));

        let high = derive_risk(5, OAXACA, Some(&t)).expect("Should derive");
        assert_eq!(high.level, RiskLevel::High);
        assert_eq!(high.binary_class, 1);
        assert!(!low.is_alertable(ALERT_PROBABILITY));

        for level in [RiskLevel::Low, RiskLevel::Moderate, RiskLevel::High, RiskLevel::Critical] {
            assert_eq!(RiskLevel::from_probability(level.floor_probability()), level);
        }
    }

    #[test]
    fn test_message_table() {
        let table = [
            (
                RiskLevel::Low,
                "Low outbreak risk: expected cases are within the usual range for this region.",
                "Maintain routine surveillance and standard vector control.",
            ),
            (
                RiskLevel::Moderate,
                "Moderate outbreak risk: expected cases are above the regional median.",
                "Intensify surveillance, check reporting completeness and prepare response teams.",
            ),
            (
                RiskLevel::High,
                "High outbreak risk: expected cases exceed the usual range for this region.",
                "Launch prevention campaigns, extend vector control coverage and notify health units.",
            ),
            (
                RiskLevel::Critical,
                "Critical outbreak risk: expected cases reach the historical upper range.",
                "Activate the emergency response plan, reinforce hospital capacity and issue a public health alert.",
            ),
        ];

        for (level, message, recommendation) in table {
            let risk = RiskAssessment::from_probability(level.floor_probability(), Calibration::Percentile);
            assert_eq!(risk.level, level);
            assert_eq!(risk.message, message);
            assert_eq!(risk.recommendation, recommendation);
        }
    }

    #[test]
    fn test_fallback_without_thresholds() {
        // 100 cases over 1,000,000 people = 10 per 100k, doubled
        let risk = derive_risk(100, 1_000_000, None).expect("Should derive");
        assert_eq!(risk.probability, 20.0);
        assert_eq!(risk.calibration, Calibration::IncidenceProxy);
        assert_eq!(risk.level, RiskLevel::Low);

        let capped = derive_risk(1_000_000, 1_000_000, None).expect("Should derive");
        assert_eq!(capped.probability, 100.0);
    }

    #[test]
    fn test_degenerate_thresholds_use_fallback() {
        let flat = RiskThresholds {
            p25: 0.0,
            p50: 0.0,
            p75: 0.0,
            p90: 0.0,
        };
        let calibrated = derive_risk(9, OAXACA, Some(&thresholds())).expect("Should derive");
        let fallback = derive_risk(9, OAXACA, Some(&flat)).expect("Should derive");

        assert_eq!(fallback.calibration, Calibration::IncidenceProxy);
        assert_eq!(fallback.probability, 0.4);
        assert_ne!(calibrated.probability, fallback.probability);
    }

    #[test]
    fn test_collapsed_percentiles_do_not_divide_by_zero() {
        let collapsed = RiskThresholds {
            p25: 5.0,
            p50: 5.0,
            p75: 5.0,
            p90: 5.0,
        };
        let risk = derive_risk(6, OAXACA, Some(&collapsed)).expect("Should derive");
        assert_eq!(risk.probability, 100.0);
        let risk = derive_risk(5, OAXACA, Some(&collapsed)).expect("Should derive");
        assert_eq!(risk.probability, 25.0);
    }

    #[test]
    fn test_non_positive_population_rejected() {
        assert_eq!(
            derive_risk(1, 0, None),
            Err(ValidationError::NonPositivePopulation(0))
        );
        assert!(derive_risk(1, -5, Some(&thresholds())).is_err());
    }

    #[test]
    fn test_thresholds_from_targets() {
        let targets: Vec<f64> = (1..=11).map(f64::from).collect();
        let t = RiskThresholds::from_targets(&targets).expect("Should compute");
        assert_eq!(t.p25, 3.5);
        assert_eq!(t.p50, 6.0);
        assert_eq!(t.p75, 8.5);
        assert_eq!(t.p90, 10.0);
        assert!(t.is_usable());
        assert!(RiskThresholds::from_targets(&[]).is_none());
    }

    #[test]
    fn test_level_parse_roundtrip() {
        for level in [RiskLevel::Low, RiskLevel::Moderate, RiskLevel::High, RiskLevel::Critical] {
            assert_eq!(RiskLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(RiskLevel::parse("CRITICAL"), Some(RiskLevel::Critical));
        assert_eq!(RiskLevel::parse("severe"), None);
    }

    fn arb_thresholds() -> impl Strategy<Value = Option<RiskThresholds>> {
        proptest::option::of(
            (0.0f64..50.0, 0.0f64..50.0, 0.0f64..50.0, 0.0f64..50.0).prop_map(|(a, b, c, d)| {
                let p25 = a;
                let p50 = p25 + b;
                let p75 = p50 + c;
                RiskThresholds { p25, p50, p75, p90: p75 + d }
            }),
        )
    }

    proptest! {
        #[test]
        fn prop_probability_bounded(
            count in 0u64..1_000_000,
            population in 1i64..20_000_000,
            t in arb_thresholds(),
        ) {
            let risk = derive_risk(count, population, t.as_ref()).unwrap();
            prop_assert!((0.0..=100.0).contains(&risk.probability));
        }

        #[test]
        fn prop_monotone_in_count(
            a in 0u64..500,
            b in 0u64..500,
            population in 1i64..20_000_000,
            t in arb_thresholds(),
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let r_lo = derive_risk(lo, population, t.as_ref()).unwrap();
            let r_hi = derive_risk(hi, population, t.as_ref()).unwrap();
            prop_assert!(r_lo.probability <= r_hi.probability);
        }

        #[test]
        fn prop_level_consistent(
            count in 0u64..200,
            t in arb_thresholds(),
        ) {
            let risk = derive_risk(count, OAXACA, t.as_ref()).unwrap();
            prop_assert_eq!(risk.level == RiskLevel::Critical, risk.probability >= 75.0);
            prop_assert_eq!(risk.level == RiskLevel::Low, risk.probability < 25.0);
            prop_assert_eq!(risk.binary_class == 1, risk.probability >= 50.0);
        }
    }
}
