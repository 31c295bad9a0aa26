//! SQLite adapter: Implementation of `HistoryProvider` and `Storage`.
//!
//! Provides local persistence for weekly observations, alerts and forecasts.
//!
//! # Mutex Behavior
//!
//! Database connection is protected by `Mutex`. A poisoned mutex (from panic
//! in another thread) will cause panic.
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};

use crate::domain::{
    Alert, AlertFilter, AlertKind, AlertStatus, Calibration, ForecastRecord, HistoricalRecord,
    ModelKind, NewAlert, RiskLevel,
};
use crate::ports::{HistoryProvider, Storage};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// SQLite storage adapter.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Create a new SQLite storage with the given database path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS epi_records (
                region_id INTEGER NOT NULL,
                week_end_date TEXT NOT NULL,
                case_count INTEGER NOT NULL,
                incidence_rate REAL NOT NULL,
                PRIMARY KEY (region_id, week_end_date)
            );

            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                level TEXT NOT NULL,
                region_id INTEGER,
                region_name TEXT NOT NULL,
                message TEXT NOT NULL,
                probability REAL NOT NULL,
                predicted_cases INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                resolved_by TEXT,
                resolved_at TEXT,
                notes TEXT
            );

            CREATE TABLE IF NOT EXISTS forecasts (
                id TEXT PRIMARY KEY,
                region_id INTEGER NOT NULL,
                model TEXT,
                predicted_cases INTEGER NOT NULL,
                probability REAL NOT NULL,
                level TEXT NOT NULL,
                calibration TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_status
                ON alerts(status, created_at DESC);

            CREATE INDEX IF NOT EXISTS idx_forecasts_created
                ON forecasts(created_at DESC);
            ",
        )?;

        Ok(())
    }

    /// Insert or replace weekly observations in a single transaction.
    ///
    /// # Returns
    /// Number of rows written.
    ///
    /// # Errors
    /// Returns error if any insert fails; nothing is written in that case.
    pub fn insert_records(&self, records: &[(i64, HistoricalRecord)]) -> Result<usize, StorageError> {
        let mut conn = self.conn.lock().expect("Lock failed");
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r"
                INSERT OR REPLACE INTO epi_records (
                    region_id, week_end_date, case_count, incidence_rate
                ) VALUES (?1, ?2, ?3, ?4)
                ",
            )?;
            for (region_id, record) in records {
                stmt.execute(params![
                    region_id,
                    record.week_end_date.format(DATE_FORMAT).to_string(),
                    record.case_count as i64,
                    record.incidence_rate,
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!("Stored {} weekly records", records.len());
        Ok(records.len())
    }

    fn parse_date(idx: usize, s: &str) -> rusqlite::Result<NaiveDate> {
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn invalid_text(idx: usize, what: &str, value: &str) -> rusqlite::Error {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown {what} '{value}'").into(),
        )
    }

    /// Fixed-width RFC 3339 so that text ordering matches time ordering.
    fn format_timestamp(dt: DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn record_from_row(row: &Row<'_>) -> rusqlite::Result<HistoricalRecord> {
        let week_end: String = row.get(0)?;
        let case_count: i64 = row.get(1)?;
        let incidence_rate: f64 = row.get(2)?;

        Ok(HistoricalRecord::new(
            case_count.max(0) as u64,
            incidence_rate,
            Self::parse_date(0, &week_end)?,
        ))
    }

    fn alert_from_row(row: &Row<'_>) -> rusqlite::Result<Alert> {
        let kind: String = row.get(1)?;
        let level: String = row.get(2)?;
        let predicted: i64 = row.get(7)?;
        let created_at: String = row.get(8)?;
        let status: String = row.get(9)?;
        let resolved_at: Option<String> = row.get(11)?;

        Ok(Alert {
            id: row.get(0)?,
            kind: AlertKind::parse(&kind),
            level: RiskLevel::parse(&level).unwrap_or(RiskLevel::Moderate),
            region_id: row.get(3)?,
            region_name: row.get(4)?,
            message: row.get(5)?,
            probability: row.get(6)?,
            predicted_cases: predicted.max(0) as u64,
            created_at: Self::parse_timestamp(&created_at),
            status: if status == AlertStatus::Resolved.as_str() {
                AlertStatus::Resolved
            } else {
                AlertStatus::Active
            },
            resolved_by: row.get(10)?,
            resolved_at: resolved_at.as_deref().map(Self::parse_timestamp),
            notes: row.get(12)?,
        })
    }

    fn model_from_str(s: &str) -> Option<ModelKind> {
        match s {
            "linear" => Some(ModelKind::Linear),
            "polynomial" => Some(ModelKind::Polynomial),
            _ => None,
        }
    }
}

const ALERT_COLUMNS: &str = "id, kind, level, region_id, region_name, message, probability, \
     predicted_cases, created_at, status, resolved_by, resolved_at, notes";

impl HistoryProvider for SqliteStorage {
    type Error = StorageError;

    fn recent_records(
        &self,
        region_id: i64,
        limit: usize,
        before: Option<NaiveDate>,
    ) -> Result<Vec<HistoricalRecord>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        // '9999-12-31' sorts after every stored date.
        let cutoff = before.map_or_else(
            || "9999-12-31".to_string(),
            |d| d.format(DATE_FORMAT).to_string(),
        );

        let mut stmt = conn.prepare(
            r"
            SELECT week_end_date, case_count, incidence_rate
            FROM epi_records
            WHERE region_id = ?1 AND week_end_date < ?2
            ORDER BY week_end_date DESC
            LIMIT ?3
            ",
        )?;

        let records = stmt
            .query_map(params![region_id, cutoff, limit as i64], Self::record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn regions_with_data(&self) -> Result<Vec<i64>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let mut stmt =
            conn.prepare("SELECT DISTINCT region_id FROM epi_records ORDER BY region_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    fn record_near(
        &self,
        region_id: i64,
        date: NaiveDate,
        tolerance_days: u32,
    ) -> Result<Option<HistoricalRecord>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let record = conn
            .query_row(
                r"
                SELECT week_end_date, case_count, incidence_rate
                FROM epi_records
                WHERE region_id = ?1
                  AND ABS(julianday(week_end_date) - julianday(?2)) <= ?3
                ORDER BY ABS(julianday(week_end_date) - julianday(?2)) ASC,
                         week_end_date DESC
                LIMIT 1
                ",
                params![
                    region_id,
                    date.format(DATE_FORMAT).to_string(),
                    f64::from(tolerance_days)
                ],
                Self::record_from_row,
            )
            .optional()?;

        Ok(record)
    }
}

impl Storage for SqliteStorage {
    type Error = StorageError;

    fn save_alert(&self, alert: &NewAlert, created_at: DateTime<Utc>) -> Result<i64, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute(
            r"
            INSERT INTO alerts (
                kind, level, region_id, region_name, message,
                probability, predicted_cases, created_at, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                alert.kind.as_str(),
                alert.level.as_str(),
                alert.region_id,
                alert.region_name,
                alert.message,
                alert.probability,
                alert.predicted_cases as i64,
                Self::format_timestamp(created_at),
                AlertStatus::Active.as_str(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        tracing::debug!("Saved {} alert {} for {}", alert.kind.as_str(), id, alert.region_name);
        Ok(id)
    }

    fn load_active_alerts(&self, limit: usize) -> Result<Vec<Alert>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let mut stmt = conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE status = ?1 \
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        ))?;

        let alerts = stmt
            .query_map(
                params![AlertStatus::Active.as_str(), limit as i64],
                Self::alert_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    fn load_alerts(&self, filter: &AlertFilter) -> Result<Vec<Alert>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        // NULL parameters disable the corresponding filter.
        let mut stmt = conn.prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts \
             WHERE (?1 IS NULL OR region_name = ?1) AND (?2 IS NULL OR level = ?2) \
             ORDER BY created_at DESC, id DESC LIMIT ?3"
        ))?;

        let alerts = stmt
            .query_map(
                params![
                    filter.region_name,
                    filter.level.map(|l| l.as_str()),
                    filter.limit as i64
                ],
                Self::alert_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    fn resolve_alert(
        &self,
        id: i64,
        resolved_by: &str,
        notes: Option<&str>,
    ) -> Result<bool, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let changed = conn.execute(
            r"
            UPDATE alerts
            SET status = ?1, resolved_by = ?2, resolved_at = ?3, notes = ?4
            WHERE id = ?5
            ",
            params![
                AlertStatus::Resolved.as_str(),
                resolved_by,
                Self::format_timestamp(Utc::now()),
                notes,
                id,
            ],
        )?;

        if changed > 0 {
            tracing::info!("Alert {} resolved by {}", id, resolved_by);
        }
        Ok(changed > 0)
    }

    fn count_alerts(&self) -> Result<usize, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let count: i64 = conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    fn save_forecast(&self, record: &ForecastRecord) -> Result<(), Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        conn.execute(
            r"
            INSERT INTO forecasts (
                id, region_id, model, predicted_cases, probability,
                level, calibration, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                record.id,
                record.region_id,
                record.model.map(|m| m.as_str()),
                record.predicted_cases as i64,
                record.probability,
                record.level.as_str(),
                record.calibration.as_str(),
                Self::format_timestamp(record.created_at),
            ],
        )?;

        tracing::debug!("Saved forecast {} to storage", record.id);
        Ok(())
    }

    fn load_recent_forecasts(&self, limit: usize) -> Result<Vec<ForecastRecord>, Self::Error> {
        let conn = self.conn.lock().expect("Lock failed");

        let mut stmt = conn.prepare(
            r"
            SELECT id, region_id, model, predicted_cases, probability,
                   level, calibration, created_at
            FROM forecasts
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?1
            ",
        )?;

        let records = stmt
            .query_map(params![limit as i64], |row| {
                let model: Option<String> = row.get(2)?;
                let predicted: i64 = row.get(3)?;
                let level: String = row.get(5)?;
                let calibration: String = row.get(6)?;
                let created_at: String = row.get(7)?;

                Ok(ForecastRecord {
                    id: row.get(0)?,
                    region_id: row.get(1)?,
                    model: model
                        .map(|m| {
                            Self::model_from_str(&m).ok_or_else(|| Self::invalid_text(2, "model", &m))
                        })
                        .transpose()?,
                    predicted_cases: predicted.max(0) as u64,
                    probability: row.get(4)?,
                    level: RiskLevel::parse(&level)
                        .ok_or_else(|| Self::invalid_text(5, "risk level", &level))?,
                    calibration: Calibration::parse(&calibration)
                        .ok_or_else(|| Self::invalid_text(6, "calibration", &calibration))?,
                    created_at: Self::parse_timestamp(&created_at),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::derive_risk;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn seeded() -> SqliteStorage {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        let rows: Vec<(i64, HistoricalRecord)> = (0..6)
            .map(|i| {
                let week_end = date(2024, 1, 6) + chrono::Duration::weeks(i);
                (20, HistoricalRecord::new(10 + i as u64, 0.5, week_end))
            })
            .chain(std::iter::once((7, HistoricalRecord::new(3, 0.1, date(2024, 1, 6)))))
            .collect();
        storage.insert_records(&rows).expect("Should insert");
        storage
    }

    fn alert(region: &str, level: RiskLevel) -> NewAlert {
        NewAlert {
            kind: AlertKind::Automatic,
            level,
            region_id: Some(20),
            region_name: region.to_string(),
            message: level.message().to_string(),
            probability: 60.0,
            predicted_cases: 12,
        }
    }

    #[test]
    fn test_recent_records_newest_first() {
        let storage = seeded();

        let records = storage.recent_records(20, 4, None).expect("Should load");
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].case_count, 15);
        assert_eq!(records[3].case_count, 12);
        assert!(records[0].week_end_date > records[1].week_end_date);

        let before = storage
            .recent_records(20, 4, Some(date(2024, 1, 27)))
            .expect("Should load");
        assert_eq!(before.len(), 3);
        assert_eq!(before[0].week_end_date, date(2024, 1, 20));

        assert!(storage.recent_records(99, 4, None).expect("Should load").is_empty());
    }

    #[test]
    fn test_insert_replaces_same_week() {
        let storage = seeded();
        storage
            .insert_records(&[(7, HistoricalRecord::new(9, 0.3, date(2024, 1, 6)))])
            .expect("Should insert");

        let records = storage.recent_records(7, 4, None).expect("Should load");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].case_count, 9);
    }

    #[test]
    fn test_regions_and_near_lookup() {
        let storage = seeded();
        assert_eq!(storage.regions_with_data().expect("Should list"), vec![7, 20]);

        let near = storage
            .record_near(20, date(2024, 1, 15), 3)
            .expect("Should query")
            .expect("Should find");
        assert_eq!(near.week_end_date, date(2024, 1, 13));

        assert!(storage
            .record_near(20, date(2024, 1, 10), 2)
            .expect("Should query")
            .is_none());
    }

    #[test]
    fn test_alert_lifecycle() {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        assert_eq!(storage.count_alerts().expect("Should count"), 0);

        let first = storage
            .save_alert(&alert("Oaxaca", RiskLevel::High), Utc::now())
            .expect("Should save");
        storage
            .save_alert(&alert("Chiapas", RiskLevel::Critical), Utc::now())
            .expect("Should save");
        assert_eq!(storage.count_alerts().expect("Should count"), 2);

        let active = storage.load_active_alerts(10).expect("Should load");
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].region_name, "Chiapas");

        assert!(storage
            .resolve_alert(first, "duty officer", Some("false positive"))
            .expect("Should resolve"));
        assert!(!storage.resolve_alert(999, "nobody", None).expect("Should run"));

        let active = storage.load_active_alerts(10).expect("Should load");
        assert_eq!(active.len(), 1);

        let history = storage
            .load_alerts(&AlertFilter {
                region_name: Some("Oaxaca".to_string()),
                level: None,
                limit: 10,
            })
            .expect("Should load");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, AlertStatus::Resolved);
        assert_eq!(history[0].resolved_by.as_deref(), Some("duty officer"));
        assert_eq!(history[0].notes.as_deref(), Some("false positive"));
        assert!(history[0].resolved_at.is_some());

        let critical = storage
            .load_alerts(&AlertFilter {
                region_name: None,
                level: Some(RiskLevel::Critical),
                limit: 10,
            })
            .expect("Should load");
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].region_name, "Chiapas");
    }

    #[test]
    fn test_forecast_history() {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        let risk = derive_risk(40, 1_000_000, None).expect("Should derive");

        let older = ForecastRecord::new(20, Some(ModelKind::Polynomial), 40, &risk);
        let newer = ForecastRecord::new(7, None, 0, &risk);
        storage.save_forecast(&older).expect("Should save");
        storage.save_forecast(&newer).expect("Should save");

        let loaded = storage.load_recent_forecasts(10).expect("Should load");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, newer.id);
        assert_eq!(loaded[0].model, None);
        assert_eq!(loaded[1].model, Some(ModelKind::Polynomial));
        assert_eq!(loaded[1].calibration, Calibration::IncidenceProxy);
        assert_eq!(loaded[1].probability, risk.probability);
    }

    #[test]
    fn test_corrupt_forecast_row_is_an_error() {
        let storage = SqliteStorage::in_memory().expect("Should create db");
        let risk = derive_risk(40, 1_000_000, None).expect("Should derive");
        let record = ForecastRecord::new(20, Some(ModelKind::Linear), 40, &risk);
        storage.save_forecast(&record).expect("Should save");

        storage
            .conn
            .lock()
            .expect("Lock failed")
            .execute(
                "UPDATE forecasts SET level = 'severe' WHERE id = ?1",
                params![record.id],
            )
            .expect("Should update");

        let result = storage.load_recent_forecasts(10);
        assert!(matches!(
            result,
            Err(StorageError::Database(
                rusqlite::Error::FromSqlConversionFailure(5, Type::Text, _)
            ))
        ));
    }
}
