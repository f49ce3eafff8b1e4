pub mod analysis;
pub mod commands;
pub mod error;
pub mod models;
pub mod state;

use commands::{
    analytics::{assess_materiality, forecast_metric, forecast_series},
    db::{company_crud, metric_crud, record_metrics},
    scoring::{assess_mining_risk, compute_esg_score, score_categories},
    settings::{get_settings, save_settings},
    validation::validate_period,
};
use models::company::Company;
use models::materiality::MaterialityTopic;
use models::metric::MetricEntry;
use models::score::RiskInputs;
use models::trend::TrendPoint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use state::EsgState;
use std::collections::HashMap;
use std::io::Read;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrudArgs<T> {
    operation: String,
    item: Option<T>,
    id: Option<String>,
    company_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeriodArgs {
    company_id: String,
    period: i32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RiskArgs {
    company_id: String,
    period: i32,
    attributes: Option<RiskInputs>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordArgs {
    company_id: String,
    period: i32,
    values: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastArgs {
    company_id: String,
    metric_name: String,
    years: Option<usize>,
}

#[derive(Deserialize)]
struct SeriesArgs {
    history: Vec<TrendPoint>,
    years: Option<usize>,
}

#[derive(Deserialize)]
struct TopicsArgs {
    topics: Vec<MaterialityTopic>,
}

#[derive(Deserialize)]
struct ScoresArgs {
    scores: HashMap<String, f64>,
}

/// Route a command name and its JSON payload to the matching command.
pub async fn dispatch(state: &EsgState, command: &str, payload: Value) -> Result<Value, String> {
    log::debug!("dispatching {command}");
    match command {
        "get_settings" => get_settings(state.workspace_str()).await,
        "save_settings" => save_settings(state.workspace_str(), payload).await,
        "company_crud" => {
            let a: CrudArgs<Company> = args(payload)?;
            company_crud(state, a.operation, a.item, a.id).await
        }
        "metric_crud" => {
            let a: CrudArgs<MetricEntry> = args(payload)?;
            metric_crud(state, a.operation, a.item, a.id, a.company_id).await
        }
        "record_metrics" => {
            let a: RecordArgs = args(payload)?;
            to_json(record_metrics(state, a.company_id, a.period, a.values).await?)
        }
        "compute_esg_score" => {
            let a: PeriodArgs = args(payload)?;
            to_json(compute_esg_score(state, a.company_id, a.period).await?)
        }
        "score_categories" => {
            let a: ScoresArgs = args(payload)?;
            to_json(score_categories(state.workspace_str(), a.scores).await?)
        }
        "assess_mining_risk" => {
            let a: RiskArgs = args(payload)?;
            to_json(assess_mining_risk(state, a.company_id, a.period, a.attributes).await?)
        }
        "forecast_metric" => {
            let a: ForecastArgs = args(payload)?;
            to_json(forecast_metric(state, a.company_id, a.metric_name, a.years).await?)
        }
        "forecast_series" => {
            let a: SeriesArgs = args(payload)?;
            to_json(forecast_series(a.history, a.years.unwrap_or(3)).await?)
        }
        "assess_materiality" => {
            let a: TopicsArgs = args(payload)?;
            to_json(assess_materiality(a.topics).await?)
        }
        "validate_period" => {
            let a: PeriodArgs = args(payload)?;
            to_json(validate_period(state, a.company_id, a.period).await?)
        }
        _ => Err(format!("Unknown command: {command}")),
    }
}

fn args<T: DeserializeOwned>(payload: Value) -> Result<T, String> {
    let payload = if payload.is_null() {
        Value::Object(Map::new())
    } else {
        payload
    };
    serde_json::from_value(payload).map_err(|e| format!("Invalid payload: {e}"))
}

fn to_json<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Serialize error: {e}"))
}

/// Binary entry: `esglens <workspace> <command>`, JSON payload on stdin, JSON result on stdout.
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut argv = std::env::args().skip(1);
    let (Some(workspace_path), Some(command)) = (argv.next(), argv.next()) else {
        eprintln!("usage: esglens <workspace> <command> < payload.json");
        std::process::exit(2);
    };

    match run_command(&workspace_path, &command) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            log::error!("{command} failed: {err}");
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

fn run_command(workspace_path: &str, command: &str) -> Result<String, String> {
    let mut raw = String::new();
    std::io::stdin()
        .read_to_string(&mut raw)
        .map_err(|e| format!("Failed to read payload: {e}"))?;
    let payload = if raw.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&raw).map_err(|e| format!("Invalid payload: {e}"))?
    };

    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Runtime error: {e}"))?;
    let state = EsgState::new(workspace_path);
    let result = runtime.block_on(dispatch(&state, command, payload))?;
    serde_json::to_string_pretty(&result).map_err(|e| format!("Serialize error: {e}"))
}
