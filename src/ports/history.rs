//! History port: read access to weekly observations.

use chrono::NaiveDate;

use crate::domain::HistoricalRecord;

/// Provider of weekly historical observations per region.
pub trait HistoryProvider: Send + Sync {
    /// Error type for history lookups.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Up to `limit` most recent records of a region, newest first.
    ///
    /// With `before` set, only weeks ending strictly before that date are
    /// returned.
    ///
    /// # Errors
    /// Returns error if the backend query fails.
    fn recent_records(
        &self,
        region_id: i64,
        limit: usize,
        before: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalRecord>, Self::Error>;

    /// Ids of every region with at least one record, ascending.
    ///
    /// # Errors
    /// Returns error if the backend query fails.
    fn regions_with_data(&self) -> Result<Vec<i64>, Self::Error>;

    /// Record whose week end lies within `tolerance_days` of `date`,
    /// closest first.
    ///
    /// # Errors
    /// Returns error if the backend query fails.
    fn record_near(
        &self,
        region_id: i64,
        date: NaiveDate,
        tolerance_days: u32,
    ) -> Result<Option<HistoricalRecord>, Self::Error>;
}
