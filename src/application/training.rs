//! Model training: linear and polynomial least squares on weekly features.
//!
//! Training rows are built with the same [`build_features`] used at serving
//! time: for each observation with four predecessors in its region, the
//! predecessors (newest first) form the history and the observation's case
//! count is the target.

use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, NaiveDate, Utc};
use nalgebra::{DMatrix, DVector};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::config::env_or;
use crate::domain::{
    build_features, calendar_of, canonical_region_name, expanded_len, feature_layout,
    FitMetrics, HistoricalRecord, ModelBundle, ModelError, ModelKind, RawDataset, RegionEncoder,
    RegressionModel, RiskThresholds, StandardScaler, StoredModel, ValidationError,
    FEATURE_COUNT, HISTORY_WINDOW,
};

/// Target column used when none is given.
pub const DEFAULT_TARGET: &str = "casos_confirmados";

/// Floor under `TrainingConfig::min_rows`: one test row and two to fit.
const MIN_TRAINING_ROWS: usize = 3;

const REGION_COLUMNS: &[&str] = &["id_region", "region_id"];
const DATE_COLUMNS: &[&str] = &["fecha_fin_semana", "week_end_date"];
const RATE_COLUMNS: &[&str] = &["tasa_incidencia", "incidence_rate"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Singular values below this fraction of the largest are treated as zero.
const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Error type for training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid value {value:?} in column {column} at row {row}")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Not enough usable rows: need {required}, found {found}")]
    InsufficientRows { required: usize, found: usize },

    #[error("Least squares solver failed: {0}")]
    Solver(String),

    #[error("Model evaluation failed: {0}")]
    Model(#[from] ModelError),

    #[error("Invalid training record: {0}")]
    Validation(#[from] ValidationError),
}

/// Training settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Fraction of usable rows held out for testing
    pub test_fraction: f64,

    /// Folds for cross-validation
    pub cv_folds: usize,

    /// Highest polynomial degree tried (at least 2)
    pub max_poly_degree: u32,

    /// Seed for the train/test shuffle
    pub seed: u64,

    /// Minimum usable rows
    pub min_rows: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            cv_folds: 5,
            max_poly_degree: 5,
            seed: 42,
            min_rows: 20,
        }
    }
}

impl TrainingConfig {
    /// Defaults overridden by `EPIWATCH_*` variables.
    #[must_use]
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let test_fraction = env_or("EPIWATCH_TEST_FRACTION", defaults.test_fraction);

        Self {
            test_fraction: if test_fraction > 0.0 && test_fraction < 1.0 {
                test_fraction
            } else {
                tracing::warn!("EPIWATCH_TEST_FRACTION must be in (0, 1), using default");
                defaults.test_fraction
            },
            cv_folds: env_or("EPIWATCH_CV_FOLDS", defaults.cv_folds).max(2),
            max_poly_degree: env_or("EPIWATCH_MAX_POLY_DEGREE", defaults.max_poly_degree).max(2),
            seed: env_or("EPIWATCH_TRAIN_SEED", defaults.seed),
            min_rows: defaults.min_rows,
        }
    }
}

/// Summary of the target distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl TargetSummary {
    fn of(values: &[f64]) -> Self {
        let n = values.len().max(1) as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        Self {
            mean,
            std,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// What a training run reports, without the fitted coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub target_column: String,
    pub observations: usize,
    pub rows_used: usize,
    pub rows_dropped: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub regions: usize,
    pub linear: FitMetrics,
    pub polynomial: FitMetrics,

    /// Cross-validated R² per polynomial degree tried
    pub degree_scores: BTreeMap<u32, f64>,

    pub thresholds: Option<RiskThresholds>,
    pub target_summary: TargetSummary,
    pub trained_at: DateTime<Utc>,
}

/// Result of a successful training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub report: TrainingReport,
}

/// Parse weekly observations out of a raw dataset.
///
/// Row numbers in errors are 1-based data rows (the header is not counted).
///
/// # Errors
/// Returns error if a required column is missing or a cell cannot be parsed.
pub fn parse_observations(
    dataset: &RawDataset,
    target_column: &str,
) -> Result<Vec<(i64, HistoricalRecord)>, TrainingError> {
    let required = |aliases: &[&str]| {
        dataset
            .column_index(aliases)
            .ok_or_else(|| TrainingError::MissingColumn(aliases.join("|")))
    };
    let region_col = required(REGION_COLUMNS)?;
    let date_col = required(DATE_COLUMNS)?;
    let target_col = required(&[target_column])?;
    let rate_col = dataset.column_index(RATE_COLUMNS);

    let mut observations = Vec::with_capacity(dataset.len());
    for (i, row) in dataset.rows.iter().enumerate() {
        let row_no = i + 1;
        let cell = |col: usize| row.get(col).map_or("", |s| s.trim());
        let invalid = |col: usize| TrainingError::InvalidCell {
            row: row_no,
            column: dataset.headers[col].clone(),
            value: cell(col).to_string(),
        };

        let region_id: i64 = cell(region_col)
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= 1.0)
            .map(|v| v as i64)
            .ok_or_else(|| invalid(region_col))?;

        let week_end = NaiveDate::parse_from_str(cell(date_col), DATE_FORMAT)
            .map_err(|_| invalid(date_col))?;

        let cases: f64 = cell(target_col)
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| invalid(target_col))?;

        let rate = match rate_col {
            Some(col) if !cell(col).is_empty() => cell(col)
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| invalid(col))?,
            _ => 0.0,
        };

        observations.push((
            region_id,
            HistoricalRecord::new(cases.round() as u64, rate, week_end),
        ));
    }

    Ok(observations)
}

/// Feature rows and targets, in region then date order.
struct Samples {
    xs: Vec<[f64; FEATURE_COUNT]>,
    ys: Vec<f64>,
}

impl Samples {
    fn len(&self) -> usize {
        self.ys.len()
    }

    fn targets(&self, idx: &[usize]) -> Vec<f64> {
        idx.iter().map(|&i| self.ys[i]).collect()
    }
}

fn assemble(
    observations: &[(i64, HistoricalRecord)],
    encoder: &RegionEncoder,
) -> Result<Samples, TrainingError> {
    let mut by_region: BTreeMap<i64, Vec<HistoricalRecord>> = BTreeMap::new();
    for (region_id, record) in observations {
        by_region.entry(*region_id).or_default().push(*record);
    }

    let mut samples = Samples {
        xs: Vec::new(),
        ys: Vec::new(),
    };
    for (region_id, records) in &mut by_region {
        records.sort_by_key(|r| r.week_end_date);

        for i in HISTORY_WINDOW..records.len() {
            let history: Vec<HistoricalRecord> =
                records[i - HISTORY_WINDOW..i].iter().rev().copied().collect();
            let (week, month) = calendar_of(records[i].week_end_date);
            let features =
                build_features(&history, *region_id, Some(week), Some(month), encoder)?;

            samples.xs.push(features.to_array());
            samples.ys.push(records[i].case_count as f64);
        }
    }

    Ok(samples)
}

fn fit(
    kind: ModelKind,
    degree: u32,
    data: &Samples,
    idx: &[usize],
) -> Result<RegressionModel, TrainingError> {
    let design: Vec<Vec<f64>> = idx
        .iter()
        .map(|&i| RegressionModel::design_row(kind, degree, &data.xs[i]))
        .collect();
    let scaler = StandardScaler::fit(&design);

    let n = design.len();
    let p = design.first().map_or(0, Vec::len);
    let flat: Vec<f64> = design.iter().flat_map(|row| scaler.transform(row)).collect();

    // Scaled columns are centred, so the intercept is the target mean.
    let intercept = idx.iter().map(|&i| data.ys[i]).sum::<f64>() / n.max(1) as f64;

    let a = DMatrix::from_row_slice(n, p, &flat);
    let b = DVector::from_iterator(n, idx.iter().map(|&i| data.ys[i] - intercept));

    let svd = a.svd(true, true);
    let tol = (svd.singular_values.max() * SINGULAR_TOLERANCE).max(f64::MIN_POSITIVE);
    let solution = svd
        .solve(&b, tol)
        .map_err(|e| TrainingError::Solver(e.to_string()))?;

    if solution.iter().any(|c| !c.is_finite()) {
        return Err(TrainingError::Solver("non-finite coefficients".to_string()));
    }

    Ok(RegressionModel {
        kind,
        degree,
        n_inputs: FEATURE_COUNT,
        scaler,
        coefficients: solution.iter().copied().collect(),
        intercept,
    })
}

fn predict_all(
    model: &RegressionModel,
    data: &Samples,
    idx: &[usize],
) -> Result<Vec<f64>, TrainingError> {
    idx.iter()
        .map(|&i| model.evaluate(&data.xs[i]).map_err(TrainingError::from))
        .collect()
}

fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len().max(1) as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();

    if ss_tot <= f64::EPSILON {
        if ss_res <= f64::EPSILON {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).abs())
        .sum::<f64>()
        / actual.len().max(1) as f64
}

fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    (actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum::<f64>()
        / actual.len().max(1) as f64)
        .sqrt()
}

/// Contiguous folds; the first `n % k` folds take one extra row.
fn fold_ranges(n: usize, k: usize) -> Vec<Range<usize>> {
    let k = k.clamp(2, n.max(2));
    let base = n / k;
    let extra = n % k;

    let mut ranges = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

fn cross_val_r2(
    kind: ModelKind,
    degree: u32,
    data: &Samples,
    idx: &[usize],
    folds: usize,
) -> Result<f64, TrainingError> {
    let ranges = fold_ranges(idx.len(), folds);
    let mut total = 0.0;
    let mut used = 0usize;

    for range in &ranges {
        if range.is_empty() {
            continue;
        }
        let held_out = &idx[range.clone()];
        let fit_idx: Vec<usize> = idx[..range.start]
            .iter()
            .chain(&idx[range.end..])
            .copied()
            .collect();

        let model = fit(kind, degree, data, &fit_idx)?;
        let predicted = predict_all(&model, data, held_out)?;
        total += r_squared(&data.targets(held_out), &predicted);
        used += 1;
    }

    Ok(total / used.max(1) as f64)
}

fn fit_metrics(
    kind: ModelKind,
    degree: u32,
    data: &Samples,
    train: &[usize],
    test: &[usize],
    all: &[usize],
    folds: usize,
) -> Result<StoredModel, TrainingError> {
    let model = fit(kind, degree, data, train)?;
    let actual = data.targets(test);
    let predicted = predict_all(&model, data, test)?;

    let metrics = FitMetrics {
        r_squared: r_squared(&actual, &predicted),
        r_squared_cv: cross_val_r2(kind, degree, data, all, folds)?,
        mean_absolute_error: mean_absolute_error(&actual, &predicted),
        rmse: rmse(&actual, &predicted),
        degree: (kind == ModelKind::Polynomial).then_some(degree),
    };

    Ok(StoredModel { model, metrics })
}

/// Train both model variants and the risk calibration table.
///
/// # Errors
/// Returns error on schema problems, too few usable rows, or solver failure.
pub fn train(
    dataset: &RawDataset,
    target_column: &str,
    config: &TrainingConfig,
) -> Result<TrainingOutcome, TrainingError> {
    let observations = parse_observations(dataset, target_column)?;

    let encoder = RegionEncoder::fit(
        observations
            .iter()
            .map(|(region_id, _)| canonical_region_name(*region_id)),
    );
    let data = assemble(&observations, &encoder)?;

    let n = data.len();
    let required = config.min_rows.max(config.cv_folds).max(MIN_TRAINING_ROWS);
    if n < required {
        return Err(TrainingError::InsufficientRows { required, found: n });
    }
    tracing::info!(
        "Training on {} rows ({} observations, {} regions)",
        n,
        observations.len(),
        encoder.classes().len()
    );

    let all: Vec<usize> = (0..n).collect();
    let mut shuffled = all.clone();
    shuffled.shuffle(&mut ChaCha20Rng::seed_from_u64(config.seed));

    let n_test = ((n as f64 * config.test_fraction).ceil() as usize).clamp(1, n - 2);
    let (test, train) = shuffled.split_at(n_test);

    let linear = fit_metrics(ModelKind::Linear, 1, &data, train, test, &all, config.cv_folds)?;
    tracing::info!(
        "Linear model: R2={:.4} cv={:.4} MAE={:.2}",
        linear.metrics.r_squared,
        linear.metrics.r_squared_cv,
        linear.metrics.mean_absolute_error
    );

    // Higher degrees are only tried while the expansion fits in the training rows.
    let mut degree_scores = BTreeMap::new();
    let mut best_degree = 2;
    let mut best_score = f64::NEG_INFINITY;
    for degree in 2..=config.max_poly_degree.max(2) {
        if degree > 2 && expanded_len(FEATURE_COUNT, degree) > train.len() {
            tracing::debug!(
                "Skipping degrees {}..={}: {} terms exceed {} training rows",
                degree,
                config.max_poly_degree,
                expanded_len(FEATURE_COUNT, degree),
                train.len()
            );
            break;
        }
        let score = cross_val_r2(ModelKind::Polynomial, degree, &data, train, config.cv_folds)?;
        tracing::debug!("Polynomial degree {}: cv R2={:.4}", degree, score);
        degree_scores.insert(degree, score);
        if score > best_score {
            best_score = score;
            best_degree = degree;
        }
    }

    let polynomial = fit_metrics(
        ModelKind::Polynomial,
        best_degree,
        &data,
        train,
        test,
        &all,
        config.cv_folds,
    )?;
    tracing::info!(
        "Polynomial model (degree {}): R2={:.4} cv={:.4} MAE={:.2}",
        best_degree,
        polynomial.metrics.r_squared,
        polynomial.metrics.r_squared_cv,
        polynomial.metrics.mean_absolute_error
    );

    let thresholds = RiskThresholds::from_targets(&data.ys);
    let trained_at = Utc::now();

    let report = TrainingReport {
        target_column: target_column.to_string(),
        observations: observations.len(),
        rows_used: n,
        rows_dropped: observations.len() - n,
        train_rows: train.len(),
        test_rows: test.len(),
        regions: encoder.classes().len(),
        linear: linear.metrics,
        polynomial: polynomial.metrics,
        degree_scores,
        thresholds,
        target_summary: TargetSummary::of(&data.ys),
        trained_at,
    };

    let bundle = ModelBundle {
        linear: Some(linear),
        polynomial: Some(polynomial),
        thresholds,
        encoder,
        feature_names: feature_layout(),
        trained_at,
    };

    Ok(TrainingOutcome { bundle, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{population, HISTORY_WINDOW};

    const REGIONS: [i64; 4] = [5, 12, 20, 27];
    const WEEKS: usize = 60;

    /// Cases grow by a fixed step each week, so next week = last week + step.
    fn linear_growth_dataset() -> RawDataset {
        let start = NaiveDate::from_ymd_opt(2023, 1, 7).expect("valid date");
        let mut rows = Vec::new();
        for (r, region) in REGIONS.iter().enumerate() {
            for w in 0..WEEKS {
                let cases = 10 + 5 * r + 2 * w;
                let date = start + chrono::Duration::weeks(w as i64);
                let rate = cases as f64 / population(*region) as f64 * 100_000.0;
                rows.push(vec![
                    region.to_string(),
                    date.format("%Y-%m-%d").to_string(),
                    cases.to_string(),
                    format!("{rate:.6}"),
                ]);
            }
        }
        RawDataset::new(
            vec![
                "id_region".into(),
                "fecha_fin_semana".into(),
                "casos_confirmados".into(),
                "tasa_incidencia".into(),
            ],
            rows,
        )
    }

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            max_poly_degree: 2,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn test_training_recovers_linear_growth() {
        let outcome =
            train(&linear_growth_dataset(), DEFAULT_TARGET, &quick_config()).expect("Should train");
        let report = &outcome.report;

        assert_eq!(report.observations, REGIONS.len() * WEEKS);
        assert_eq!(report.rows_used, REGIONS.len() * (WEEKS - HISTORY_WINDOW));
        assert_eq!(report.rows_dropped, REGIONS.len() * HISTORY_WINDOW);
        assert_eq!(report.train_rows + report.test_rows, report.rows_used);
        assert_eq!(report.regions, 4);

        assert!(report.linear.r_squared > 0.99, "{:?}", report.linear);
        assert!(report.linear.mean_absolute_error < 0.5, "{:?}", report.linear);
        assert_eq!(report.linear.degree, None);
        assert_eq!(report.polynomial.degree, Some(2));
        assert!(report.degree_scores.contains_key(&2));

        let linear = outcome.bundle.linear.as_ref().expect("Should have linear");
        // Region 20, weeks 10..13 (newest first) predicts week 14.
        let history: Vec<HistoricalRecord> = (10..14)
            .rev()
            .map(|w| {
                let cases = 10 + 5 * 2 + 2 * w;
                let rate = cases as f64 / population(20) as f64 * 100_000.0;
                let date = NaiveDate::from_ymd_opt(2023, 1, 7).expect("valid date")
                    + chrono::Duration::weeks(w as i64);
                HistoricalRecord::new(cases as u64, rate, date)
            })
            .collect();
        let target_date = history[0].week_end_date + chrono::Duration::weeks(1);
        let (week, month) = calendar_of(target_date);
        let features = build_features(
            &history,
            20,
            Some(week),
            Some(month),
            &outcome.bundle.encoder,
        )
        .expect("Should build");

        let predicted = linear
            .model
            .evaluate(&features.to_array())
            .expect("Should evaluate");
        assert!((predicted - 48.0).abs() < 1.0, "predicted {predicted}");
    }

    #[test]
    fn test_thresholds_follow_targets() {
        let outcome =
            train(&linear_growth_dataset(), DEFAULT_TARGET, &quick_config()).expect("Should train");
        let thresholds = outcome.report.thresholds.expect("Should have thresholds");

        assert!(thresholds.p25 <= thresholds.p50);
        assert!(thresholds.p50 <= thresholds.p75);
        assert!(thresholds.p75 <= thresholds.p90);
        assert!(thresholds.is_usable());

        let summary = outcome.report.target_summary;
        // Smallest target: region 5, week 4 -> 10 + 2 * 4.
        assert_eq!(summary.min, 18.0);
        assert!(summary.max >= thresholds.p90);
    }

    #[test]
    fn test_training_is_deterministic() {
        let ds = linear_growth_dataset();
        let a = train(&ds, DEFAULT_TARGET, &quick_config()).expect("Should train");
        let b = train(&ds, DEFAULT_TARGET, &quick_config()).expect("Should train");
        assert_eq!(a.bundle.linear, b.bundle.linear);
        assert_eq!(a.report.linear, b.report.linear);
    }

    #[test]
    fn test_missing_target_column() {
        let err = train(&linear_growth_dataset(), "cases", &quick_config())
            .expect_err("Should fail");
        assert!(matches!(err, TrainingError::MissingColumn(c) if c == "cases"));
    }

    #[test]
    fn test_invalid_cell_names_row_and_column() {
        let mut ds = linear_growth_dataset();
        ds.rows[2][1] = "07/01/2023".to_string();

        match train(&ds, DEFAULT_TARGET, &quick_config()) {
            Err(TrainingError::InvalidCell { row, column, value }) => {
                assert_eq!(row, 3);
                assert_eq!(column, "fecha_fin_semana");
                assert_eq!(value, "07/01/2023");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_insufficient_rows() {
        let mut ds = linear_growth_dataset();
        ds.rows.truncate(10);

        let err = train(&ds, DEFAULT_TARGET, &quick_config()).expect_err("Should fail");
        assert!(matches!(
            err,
            TrainingError::InsufficientRows { required: 20, found: 6 }
        ));
    }

    #[test]
    fn test_wide_degrees_are_skipped() {
        let config = TrainingConfig {
            max_poly_degree: 5,
            ..TrainingConfig::default()
        };
        let outcome = train(&linear_growth_dataset(), DEFAULT_TARGET, &config).expect("Should train");

        // Degree 3 has 363 terms, more than the 179 training rows
        assert!(expanded_len(FEATURE_COUNT, 3) > outcome.report.train_rows);
        assert_eq!(outcome.report.degree_scores.keys().copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(outcome.report.polynomial.degree, Some(2));
    }

    #[test]
    fn test_tiny_min_rows_still_rejects_two_rows() {
        let mut ds = linear_growth_dataset();
        ds.rows.truncate(6);
        let config = TrainingConfig {
            min_rows: 0,
            cv_folds: 2,
            ..quick_config()
        };

        let err = train(&ds, DEFAULT_TARGET, &config).expect_err("Should fail");
        assert!(matches!(
            err,
            TrainingError::InsufficientRows { required: 3, found: 2 }
        ));
    }

    #[test]
    fn test_rate_column_optional() {
        let ds = linear_growth_dataset();
        let headers = ds.headers[..3].to_vec();
        let rows = ds.rows.iter().map(|r| r[..3].to_vec()).collect();
        let observations =
            parse_observations(&RawDataset::new(headers, rows), DEFAULT_TARGET).expect("Should parse");
        assert!(observations.iter().all(|(_, r)| r.incidence_rate == 0.0));
    }

    #[test]
    fn test_fold_ranges_cover_all_rows() {
        let ranges = fold_ranges(11, 5);
        assert_eq!(ranges.len(), 5);
        assert_eq!(ranges[0], 0..3);
        assert_eq!(ranges[4], 9..11);
        assert_eq!(ranges.iter().map(|r| r.len()).sum::<usize>(), 11);
    }

    #[test]
    fn test_r_squared_edge_cases() {
        assert_eq!(r_squared(&[3.0, 3.0], &[3.0, 3.0]), 1.0);
        assert_eq!(r_squared(&[3.0, 3.0], &[2.0, 4.0]), 0.0);
        assert!((r_squared(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
