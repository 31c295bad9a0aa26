//! Epiwatch: weekly case forecasting and outbreak risk scoring.
//!
//! Main entry point for the command-line tool.
//!
//! # Usage
//!
//! ```bash
//! epiwatch ingest <csv> [target]
//! epiwatch train <csv> [target]
//! epiwatch assess <region_id> [--as-of YYYY-MM-DD] [--weeks N] [--validate]
//! epiwatch alerts generate
//! epiwatch alerts active [limit]
//! epiwatch alerts history [region_name] [level]
//! epiwatch alerts resolve <id> [resolved_by] [notes]
//! epiwatch alerts manual <level> [region_id] [message]
//! epiwatch forecasts [limit]
//! epiwatch status
//! ```

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use epiwatch::adapters::{load_csv, ArtifactStore, SqliteStorage};
use epiwatch::application::{
    parse_observations, ModelSnapshot, ModelStore, TrainingConfig, DEFAULT_TARGET,
};
use epiwatch::domain::{AlertFilter, RiskLevel};
use epiwatch::{AssessmentRequest, EngineConfig, ForecastService};

type Service = ForecastService<SqliteStorage, SqliteStorage>;

const USAGE: &str = "usage: epiwatch <ingest|train|assess|alerts|forecasts|status> [args...]";

fn main() -> Result<()> {
    // Logs never go to stdout: it carries the JSON output.
    // - interactive TTY: log to a file
    // - non-interactive: log to stderr
    let log_mode = std::env::var("EPIWATCH_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let interactive = std::io::stdout().is_terminal();
    let use_file = match log_mode.as_str() {
        "file" => true,
        "stderr" => false,
        // auto
        _ => interactive,
    };

    let (writer, _guard) = if use_file {
        let log_file =
            std::env::var("EPIWATCH_LOG_FILE").unwrap_or_else(|_| "data/epiwatch.log".to_string());

        if let Some(parent) = Path::new(&log_file).parent() {
            // Best-effort: a missing directory surfaces as the open error below.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("opening log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!(USAGE);
    };

    let config = EngineConfig::from_env_or_default();
    tracing::debug!("Configuration: {:?}", config);

    match command.as_str() {
        "ingest" => ingest(&config, rest),
        "train" => train(&config, rest),
        "assess" => assess(&build_service(&config)?, rest),
        "alerts" => alerts(&build_service(&config)?, rest),
        "forecasts" => {
            let limit = parse_limit(rest.first())?;
            print_json(&build_service(&config)?.recent_forecasts(limit)?)
        }
        "status" => print_json(&build_service(&config)?.status()?),
        other => bail!("unknown command '{other}'\n{USAGE}"),
    }
}

fn open_storage(config: &EngineConfig) -> Result<SqliteStorage> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    SqliteStorage::new(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path.display()))
}

/// Service over the configured database with the persisted model bundle
/// published. A missing bundle leaves the service in degraded mode.
fn build_service(config: &EngineConfig) -> Result<Service> {
    let storage = Arc::new(open_storage(config)?);
    let models = Arc::new(ModelStore::default());

    match ArtifactStore::new(&config.model_dir).load()? {
        Some(bundle) => models.publish(ModelSnapshot::from_bundle(bundle)),
        None => tracing::warn!(
            "No model bundle in {}; forecasts will be degraded",
            config.model_dir.display()
        ),
    }

    Ok(ForecastService::new(
        Arc::clone(&storage),
        storage,
        models,
        config.clone(),
    ))
}

fn ingest(config: &EngineConfig, args: &[String]) -> Result<()> {
    let path = args.first().ok_or_else(|| anyhow!("ingest: missing <csv>"))?;
    let target = args.get(1).map_or(DEFAULT_TARGET, String::as_str);

    let dataset = load_csv(path)?;
    let observations = parse_observations(&dataset, target)?;
    let inserted = open_storage(config)?.insert_records(&observations)?;

    tracing::info!("Ingested {} weekly records from {}", inserted, path);
    print_json(&serde_json::json!({ "records": inserted }))
}

fn train(config: &EngineConfig, args: &[String]) -> Result<()> {
    let path = args.first().ok_or_else(|| anyhow!("train: missing <csv>"))?;
    let target = args.get(1).map_or(DEFAULT_TARGET, String::as_str);

    let dataset = load_csv(path)?;
    let store = ModelStore::default();
    let outcome = store.retrain(&dataset, target, &TrainingConfig::from_env_or_default())?;

    let manifest = ArtifactStore::new(&config.model_dir).save(&outcome.bundle)?;
    tracing::info!("Model bundle written ({})", manifest.display());
    print_json(&outcome.report)
}

fn assess(service: &Service, args: &[String]) -> Result<()> {
    let region_id: i64 = args
        .first()
        .ok_or_else(|| anyhow!("assess: missing <region_id>"))?
        .parse()
        .context("assess: region id must be an integer")?;

    let mut request = AssessmentRequest::new(region_id);
    let mut flags = args[1..].iter();
    while let Some(flag) = flags.next() {
        match flag.as_str() {
            "--as-of" => {
                let value = flags.next().ok_or_else(|| anyhow!("--as-of needs a date"))?;
                let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .with_context(|| format!("invalid date '{value}'"))?;
                request = request.as_of(date);
            }
            "--weeks" => {
                let value = flags.next().ok_or_else(|| anyhow!("--weeks needs a number"))?;
                request = request.weeks(value.parse().context("invalid --weeks")?);
            }
            "--validate" => request = request.with_validation(),
            other => bail!("assess: unknown flag '{other}'"),
        }
    }

    print_json(&service.assess_region(&request)?)
}

fn alerts(service: &Service, args: &[String]) -> Result<()> {
    let Some((action, rest)) = args.split_first() else {
        bail!("usage: epiwatch alerts <generate|active|history|resolve|manual>");
    };

    match action.as_str() {
        "generate" => print_json(&service.generate_alerts()?),
        "active" => print_json(&service.active_alerts(parse_limit(rest.first())?)?),
        "history" => {
            let level = rest
                .get(1)
                .map(|s| RiskLevel::parse(s).ok_or_else(|| anyhow!("unknown level '{s}'")))
                .transpose()?;
            let filter = AlertFilter {
                region_name: rest.first().cloned(),
                level,
                limit: 100,
            };
            print_json(&service.alert_history(&filter)?)
        }
        "resolve" => {
            let id: i64 = rest
                .first()
                .ok_or_else(|| anyhow!("alerts resolve: missing <id>"))?
                .parse()
                .context("alert id must be an integer")?;
            let by = rest.get(1).map_or("operator", String::as_str);
            service.resolve_alert(id, by, rest.get(2).map(String::as_str))?;
            print_json(&serde_json::json!({ "resolved": id }))
        }
        "manual" => {
            let level = rest
                .first()
                .and_then(|s| RiskLevel::parse(s))
                .ok_or_else(|| anyhow!("alerts manual: missing or unknown <level>"))?;
            let region_id = rest
                .get(1)
                .map(|s| s.parse::<i64>())
                .transpose()
                .context("region id must be an integer")?;
            let message = rest.get(2..).map(|words| words.join(" ")).unwrap_or_default();
            print_json(&service.create_manual_alert(region_id, level, &message)?)
        }
        other => bail!("alerts: unknown action '{other}'"),
    }
}

fn parse_limit(arg: Option<&String>) -> Result<usize> {
    arg.map_or(Ok(20), |s| s.parse().context("limit must be a number"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
