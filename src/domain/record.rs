//! Weekly surveillance observations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One region's observation for one epidemiological week.
///
/// Sequences of records are handed around newest-first. Nothing in the
/// domain layer re-sorts them, so the provider owns ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    /// Confirmed cases reported for the week
    pub case_count: u64,

    /// Cases per 100,000 inhabitants
    pub incidence_rate: f64,

    /// Last day of the reporting week
    pub week_end_date: NaiveDate,
}

impl HistoricalRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(case_count: u64, incidence_rate: f64, week_end_date: NaiveDate) -> Self {
        Self {
            case_count,
            incidence_rate,
            week_end_date,
        }
    }
}

/// Incidence per 100,000 inhabitants.
///
/// The population is floored at 1 so an empty catalogue entry never divides by zero.
#[must_use]
pub fn incidence_per_100k(cases: f64, population: u64) -> f64 {
    cases / population.max(1) as f64 * 100_000.0
}
