use crate::analysis::validation::{validate, Severity, ValidationIssue};
use crate::state::EsgState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub company_id: String,
    pub period: i32,
    pub rules_checked: usize,
    pub issues: Vec<ValidationIssue>,
    /// False when any error-severity issue was found.
    pub passed: bool,
}

/// Run the configured validation rules over one company's reported period.
pub async fn validate_period(
    state: &EsgState,
    company_id: String,
    period: i32,
) -> Result<ValidationReport, String> {
    let settings = crate::commands::settings::load_effective_settings(&state.workspace_str())?;
    let values = state
        .with_store(|conn| {
            crate::commands::db::require_company(conn, &company_id)?;
            Ok(crate::commands::db::load_period_values(conn, &company_id, period)?)
        })
        .map_err(String::from)?;

    let rules_checked = settings
        .validation_rules
        .iter()
        .filter(|rule| rule.applies_to(&values))
        .count();
    let issues = validate(&settings.validation_rules, &values);
    let passed = !issues.iter().any(|issue| issue.severity == Severity::Error);

    if !passed {
        log::warn!(
            "{company_id}/{period} failed validation with {} issue(s)",
            issues.len()
        );
    }

    Ok(ValidationReport {
        company_id,
        period,
        rules_checked,
        issues,
        passed,
    })
}
