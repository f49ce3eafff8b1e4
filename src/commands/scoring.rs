use crate::analysis::rule_tables::{climate_table, company_tables, mining_tables};
use crate::analysis::weighted::WeightedScorer;
use crate::models::metric::MetricValues;
use crate::models::score::*;
use crate::state::EsgState;
use std::collections::{BTreeMap, HashMap};

pub async fn compute_esg_score(
    state: &EsgState,
    company_id: String,
    period: i32,
) -> Result<EsgScore, String> {
    let settings = crate::commands::settings::load_effective_settings(&state.workspace_str())?;
    let values = load_values(state, &company_id, period)?;

    let score = score_company(&company_id, period, &values, &settings.category_weights);
    log::info!(
        "ESG score for {company_id}/{period}: {} ({} metrics)",
        score.overall,
        score.metric_count
    );
    Ok(score)
}

pub async fn assess_mining_risk(
    state: &EsgState,
    company_id: String,
    period: i32,
    attributes: Option<RiskInputs>,
) -> Result<RiskAssessment, String> {
    let settings = crate::commands::settings::load_effective_settings(&state.workspace_str())?;
    let values = load_values(state, &company_id, period)?;

    let mut inputs = risk_inputs_from_values(&values);
    if let Some(attributes) = attributes {
        inputs.extend(attributes);
    }

    let assessment = assess_mining(&company_id, period, &inputs, &settings.risk_domain_weights);
    log::info!(
        "mining risk for {company_id}/{period}: {} ({})",
        assessment.overall,
        assessment.level.as_str()
    );
    Ok(assessment)
}

/// Weighted overall score for caller-supplied category scores, using the configured weights.
pub async fn score_categories(
    workspace_path: String,
    scores: HashMap<String, f64>,
) -> Result<u32, String> {
    let settings = crate::commands::settings::load_effective_settings(&workspace_path)?;
    Ok(WeightedScorer::new(settings.category_weights).score_map(&scores))
}

fn load_values(state: &EsgState, company_id: &str, period: i32) -> Result<MetricValues, String> {
    state
        .with_store(|conn| {
            crate::commands::db::require_company(conn, company_id)?;
            Ok(crate::commands::db::load_period_values(conn, company_id, period)?)
        })
        .map_err(String::from)
}

pub fn risk_inputs_from_values(values: &MetricValues) -> RiskInputs {
    values
        .iter()
        .map(|(name, value)| (name.clone(), InputValue::Number(*value)))
        .collect()
}

/// Category scores are 100 minus the category's rule-table risk.
pub fn score_company(
    company_id: &str,
    period: i32,
    values: &MetricValues,
    weights: &HashMap<String, f64>,
) -> EsgScore {
    let inputs = risk_inputs_from_values(values);

    let mut breakdown = BTreeMap::new();
    for table in company_tables() {
        let risk = table.evaluate(&inputs);
        breakdown.insert(table.name.clone(), 100 - risk.score.min(100));
    }

    let overall = WeightedScorer::new(weights.clone())
        .score(breakdown.iter().map(|(k, v)| (k.as_str(), f64::from(*v))));

    EsgScore {
        company_id: company_id.to_string(),
        period,
        overall,
        breakdown,
        level: RiskLevel::from_score(f64::from(100 - overall.min(100))),
        climate_risk: climate_table().evaluate(&inputs),
        metric_count: values.len(),
    }
}

pub fn assess_mining(
    company_id: &str,
    period: i32,
    inputs: &RiskInputs,
    weights: &HashMap<String, f64>,
) -> RiskAssessment {
    let mut breakdown = BTreeMap::new();
    let mut details = BTreeMap::new();
    for table in mining_tables() {
        let risk = table.evaluate(inputs);
        breakdown.insert(table.name.clone(), risk.score);
        details.insert(table.name.clone(), risk);
    }

    let overall = WeightedScorer::new(weights.clone())
        .score(breakdown.iter().map(|(k, v)| (k.as_str(), f64::from(*v))));

    RiskAssessment {
        company_id: company_id.to_string(),
        period,
        overall,
        breakdown,
        level: RiskLevel::from_score(f64::from(overall)),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, f64)]) -> MetricValues {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn company_without_data_scores_from_table_defaults() {
        let score = score_company("c1", 2023, &MetricValues::new(), &default_category_weights());
        // environmental 70, social 50, governance 50 → 28 + 15 + 15
        assert_eq!(score.breakdown[ENVIRONMENTAL], 70);
        assert_eq!(score.breakdown[SOCIAL], 50);
        assert_eq!(score.breakdown[GOVERNANCE], 50);
        assert_eq!(score.overall, 58);
        assert_eq!(score.level, RiskLevel::Medium);
        assert_eq!(score.climate_risk.score, 100);
        assert!(score.climate_risk.defaulted);
    }

    #[test]
    fn clean_reporting_company_scores_high() {
        let score = score_company(
            "c1",
            2023,
            &values(&[
                ("scope1Emissions", 500.0),
                ("waterWithdrawal", 1_000.0),
                ("lostTimeInjuryRate", 0.4),
                ("femaleWorkforcePct", 45.0),
                ("boardIndependencePct", 75.0),
                ("ethicsViolations", 0.0),
            ]),
            &default_category_weights(),
        );
        assert_eq!(score.overall, 100);
        assert_eq!(score.level, RiskLevel::Low);
        assert_eq!(score.metric_count, 6);
    }

    #[test]
    fn mining_assessment_combines_domain_risks() {
        let mut inputs = risk_inputs_from_values(&values(&[
            ("scope1Emissions", 15_000.0),
            ("waterWithdrawal", 150_000.0),
            ("fatalities", 1.0),
            ("regulatoryViolations", 0.0),
        ]));
        inputs.insert(
            "riskClassification".to_string(),
            InputValue::Text("extreme".to_string()),
        );
        inputs.insert("damHeight".to_string(), InputValue::Number(65.0));

        let assessment = assess_mining("c1", 2023, &inputs, &default_risk_domain_weights());
        assert_eq!(assessment.breakdown[TAILINGS], 75);
        assert_eq!(assessment.breakdown[ENVIRONMENTAL], 55);
        assert_eq!(assessment.breakdown[SOCIAL], 40);
        assert_eq!(assessment.breakdown[OPERATIONAL], 0);
        // 22.5 + 16.5 + 8 + 0
        assert_eq!(assessment.overall, 47);
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert!(!assessment.details[OPERATIONAL].defaulted);
    }

    #[test]
    fn mining_assessment_serializes_expected_shape() {
        let assessment = assess_mining("c1", 2023, &RiskInputs::new(), &default_risk_domain_weights());
        let json = serde_json::to_value(&assessment).expect("json");
        assert!(json["overall"].is_u64());
        // 15 + 9 + 6 + 10 = 40, which is not above the medium cutoff
        assert_eq!(json["overall"], serde_json::json!(40));
        assert_eq!(json["level"], serde_json::json!("low"));
        assert_eq!(json["breakdown"]["tailings"], serde_json::json!(50));
        assert_eq!(json["companyId"], serde_json::json!("c1"));
    }
}
