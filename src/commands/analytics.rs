use crate::analysis::materiality::assess_topics;
use crate::analysis::trend::forecast;
use crate::models::materiality::{MaterialityMatrix, MaterialityTopic};
use crate::models::trend::{TrendAnalysis, TrendPoint};
use crate::state::EsgState;

/// Forecast a stored metric. `years` defaults to the configured horizon.
/// Returns `None` when fewer than two periods are on record.
pub async fn forecast_metric(
    state: &EsgState,
    company_id: String,
    metric_name: String,
    years: Option<usize>,
) -> Result<Option<TrendAnalysis>, String> {
    let settings = crate::commands::settings::load_effective_settings(&state.workspace_str())?;
    let years = years.unwrap_or(settings.forecast_years).min(10);

    let history = state
        .with_store(|conn| {
            crate::commands::db::require_company(conn, &company_id)?;
            Ok(crate::commands::db::load_metric_history(conn, &company_id, &metric_name)?)
        })
        .map_err(String::from)?;

    let analysis = forecast(&history, years);
    if analysis.is_none() {
        log::debug!(
            "not enough history to forecast {metric_name} for {company_id} ({} points)",
            history.len()
        );
    }
    Ok(analysis)
}

/// Forecast an ad-hoc series supplied by the caller.
pub async fn forecast_series(
    mut history: Vec<TrendPoint>,
    years: usize,
) -> Result<Option<TrendAnalysis>, String> {
    history.sort_by_key(|p| p.period);
    Ok(forecast(&history, years.min(10)))
}

pub async fn assess_materiality(topics: Vec<MaterialityTopic>) -> Result<MaterialityMatrix, String> {
    let matrix = assess_topics(&topics);
    log::info!(
        "assessed {} materiality topics, {} material",
        matrix.assessments.len(),
        matrix.material_count
    );
    Ok(matrix)
}
