//! Runtime configuration from environment variables.
//!
//! Every setting has a default; invalid values are logged and ignored.

use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::ALERT_PROBABILITY;

/// Read `name` and parse it, falling back to `default` when unset or invalid.
pub(crate) fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {:?}", name, raw);
                default
            }
        },
        Err(_) => default,
    }
}

/// Settings for the forecasting engine and its storage.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// SQLite database file
    pub db_path: PathBuf,

    /// Directory holding the model bundle and manifest
    pub model_dir: PathBuf,

    /// Probability at which an alert record is created
    pub alert_threshold: f64,

    /// Upper bound on the projection horizon
    pub max_projection_weeks: u32,

    /// Allowed distance between a reference date and an observed week end
    pub validation_tolerance_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/epiwatch.db"),
            model_dir: PathBuf::from("models"),
            alert_threshold: ALERT_PROBABILITY,
            max_projection_weeks: 12,
            validation_tolerance_days: 3,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `EPIWATCH_*` variables.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();

        let alert_threshold = env_or("EPIWATCH_ALERT_THRESHOLD", defaults.alert_threshold);
        let alert_threshold = if (0.0..=100.0).contains(&alert_threshold) {
            alert_threshold
        } else {
            tracing::warn!(
                "EPIWATCH_ALERT_THRESHOLD out of range ({}), using {}",
                alert_threshold,
                defaults.alert_threshold
            );
            defaults.alert_threshold
        };

        Self {
            db_path: env_or("EPIWATCH_DB_PATH", defaults.db_path),
            model_dir: env_or("EPIWATCH_MODEL_DIR", defaults.model_dir),
            alert_threshold,
            max_projection_weeks: env_or(
                "EPIWATCH_MAX_PROJECTION_WEEKS",
                defaults.max_projection_weeks,
            )
            .max(1),
            validation_tolerance_days: env_or(
                "EPIWATCH_VALIDATION_TOLERANCE_DAYS",
                defaults.validation_tolerance_days,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.alert_threshold, 25.0);
        assert_eq!(config.max_projection_weeks, 12);
        assert_eq!(config.validation_tolerance_days, 3);
        assert_eq!(config.db_path, PathBuf::from("data/epiwatch.db"));
    }

    #[test]
    fn test_env_or_invalid_falls_back() {
        std::env::set_var("EPIWATCH_TEST_ENV_OR_BAD", "not-a-number");
        assert_eq!(env_or("EPIWATCH_TEST_ENV_OR_BAD", 7u32), 7);

        std::env::set_var("EPIWATCH_TEST_ENV_OR_GOOD", " 9 ");
        assert_eq!(env_or("EPIWATCH_TEST_ENV_OR_GOOD", 7u32), 9);

        assert_eq!(env_or("EPIWATCH_TEST_ENV_OR_UNSET", 0.2f64), 0.2);
    }
}
