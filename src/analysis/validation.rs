//! Operator-configurable validation rules.
//!
//! Rules are expression trees over a closed operator set, stored as JSON in
//! settings and interpreted here. There is no string evaluation.

use crate::models::metric::MetricValues;
use serde::{Deserialize, Serialize};

/// Expression trees nest at most this deep.
pub const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    /// The value of the metric the rule is attached to.
    Value,
    Const { value: f64 },
    /// Another metric of the same company and period.
    Metric { name: String },
    Add { lhs: Box<Expr>, rhs: Box<Expr> },
    Sub { lhs: Box<Expr>, rhs: Box<Expr> },
    Mul { lhs: Box<Expr>, rhs: Box<Expr> },
    Div { lhs: Box<Expr>, rhs: Box<Expr> },
    Gt { lhs: Box<Expr>, rhs: Box<Expr> },
    Gte { lhs: Box<Expr>, rhs: Box<Expr> },
    Lt { lhs: Box<Expr>, rhs: Box<Expr> },
    Lte { lhs: Box<Expr>, rhs: Box<Expr> },
    Eq { lhs: Box<Expr>, rhs: Box<Expr> },
    Ne { lhs: Box<Expr>, rhs: Box<Expr> },
    And { lhs: Box<Expr>, rhs: Box<Expr> },
    Or { lhs: Box<Expr>, rhs: Box<Expr> },
    Not { expr: Box<Expr> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluated {
    Number(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("metric {0} is not reported for this period")]
    MissingMetric(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("expected a {expected} operand")]
    TypeMismatch { expected: &'static str },

    #[error("expression nests too deeply")]
    TooDeep,

    #[error("result is not a finite number")]
    NonFinite,
}

struct Scope<'a> {
    value: f64,
    metrics: &'a MetricValues,
}

impl Expr {
    pub fn evaluate(&self, value: f64, metrics: &MetricValues) -> Result<Evaluated, EvalError> {
        self.eval(&Scope { value, metrics }, 0)
    }

    fn eval(&self, scope: &Scope<'_>, depth: usize) -> Result<Evaluated, EvalError> {
        if depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        let next = depth + 1;

        let result = match self {
            Expr::Value => Evaluated::Number(scope.value),
            Expr::Const { value } => Evaluated::Number(*value),
            Expr::Metric { name } => Evaluated::Number(
                scope
                    .metrics
                    .get(name)
                    .copied()
                    .ok_or_else(|| EvalError::MissingMetric(name.clone()))?,
            ),
            Expr::Add { lhs, rhs } => {
                Evaluated::Number(lhs.number(scope, next)? + rhs.number(scope, next)?)
            }
            Expr::Sub { lhs, rhs } => {
                Evaluated::Number(lhs.number(scope, next)? - rhs.number(scope, next)?)
            }
            Expr::Mul { lhs, rhs } => {
                Evaluated::Number(lhs.number(scope, next)? * rhs.number(scope, next)?)
            }
            Expr::Div { lhs, rhs } => {
                let numerator = lhs.number(scope, next)?;
                let denominator = rhs.number(scope, next)?;
                if denominator == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Evaluated::Number(numerator / denominator)
            }
            Expr::Gt { lhs, rhs } => Evaluated::Bool(lhs.number(scope, next)? > rhs.number(scope, next)?),
            Expr::Gte { lhs, rhs } => Evaluated::Bool(lhs.number(scope, next)? >= rhs.number(scope, next)?),
            Expr::Lt { lhs, rhs } => Evaluated::Bool(lhs.number(scope, next)? < rhs.number(scope, next)?),
            Expr::Lte { lhs, rhs } => Evaluated::Bool(lhs.number(scope, next)? <= rhs.number(scope, next)?),
            Expr::Eq { lhs, rhs } => {
                Evaluated::Bool((lhs.number(scope, next)? - rhs.number(scope, next)?).abs() < 1e-9)
            }
            Expr::Ne { lhs, rhs } => {
                Evaluated::Bool((lhs.number(scope, next)? - rhs.number(scope, next)?).abs() >= 1e-9)
            }
            Expr::And { lhs, rhs } => Evaluated::Bool(lhs.boolean(scope, next)? && rhs.boolean(scope, next)?),
            Expr::Or { lhs, rhs } => Evaluated::Bool(lhs.boolean(scope, next)? || rhs.boolean(scope, next)?),
            Expr::Not { expr } => Evaluated::Bool(!expr.boolean(scope, next)?),
        };

        match result {
            Evaluated::Number(n) if !n.is_finite() => Err(EvalError::NonFinite),
            other => Ok(other),
        }
    }

    /// Collect the names of other metrics this expression reads.
    pub fn referenced_metrics<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Value | Expr::Const { .. } => {}
            Expr::Metric { name } => out.push(name),
            Expr::Add { lhs, rhs }
            | Expr::Sub { lhs, rhs }
            | Expr::Mul { lhs, rhs }
            | Expr::Div { lhs, rhs }
            | Expr::Gt { lhs, rhs }
            | Expr::Gte { lhs, rhs }
            | Expr::Lt { lhs, rhs }
            | Expr::Lte { lhs, rhs }
            | Expr::Eq { lhs, rhs }
            | Expr::Ne { lhs, rhs }
            | Expr::And { lhs, rhs }
            | Expr::Or { lhs, rhs } => {
                lhs.referenced_metrics(out);
                rhs.referenced_metrics(out);
            }
            Expr::Not { expr } => expr.referenced_metrics(out),
        }
    }

    fn number(&self, scope: &Scope<'_>, depth: usize) -> Result<f64, EvalError> {
        match self.eval(scope, depth)? {
            Evaluated::Number(n) => Ok(n),
            Evaluated::Bool(_) => Err(EvalError::TypeMismatch { expected: "numeric" }),
        }
    }

    fn boolean(&self, scope: &Scope<'_>, depth: usize) -> Result<bool, EvalError> {
        match self.eval(scope, depth)? {
            Evaluated::Bool(b) => Ok(b),
            Evaluated::Number(_) => Err(EvalError::TypeMismatch { expected: "boolean" }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub id: String,
    pub metric_name: String,
    pub description: String,
    pub severity: Severity,
    pub expression: Expr,
}

impl ValidationRule {
    /// A rule applies when its metric and every metric its expression reads are reported.
    pub fn applies_to(&self, metrics: &MetricValues) -> bool {
        if !metrics.contains_key(&self.metric_name) {
            return false;
        }
        let mut referenced = Vec::new();
        self.expression.referenced_metrics(&mut referenced);
        referenced.iter().all(|name| metrics.contains_key(*name))
    }

    /// Passes when the expression evaluates to `true` for `value`.
    pub fn check(&self, value: f64, metrics: &MetricValues) -> Result<bool, EvalError> {
        match self.expression.evaluate(value, metrics)? {
            Evaluated::Bool(passed) => Ok(passed),
            Evaluated::Number(_) => Err(EvalError::TypeMismatch { expected: "boolean" }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub rule_id: String,
    pub metric_name: String,
    pub value: f64,
    pub severity: Severity,
    pub message: String,
}

/// Check every rule that applies to the reported metrics. Rules reading an
/// unreported metric are skipped.
pub fn validate(rules: &[ValidationRule], metrics: &MetricValues) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for rule in rules.iter().filter(|rule| rule.applies_to(metrics)) {
        let Some(value) = metrics.get(&rule.metric_name).copied() else {
            continue;
        };

        let message = match rule.check(value, metrics) {
            Ok(true) => continue,
            Ok(false) => rule.description.clone(),
            Err(err) => format!("{} (rule could not be evaluated: {err})", rule.description),
        };

        issues.push(ValidationIssue {
            rule_id: rule.id.clone(),
            metric_name: rule.metric_name.clone(),
            value,
            severity: rule.severity,
            message,
        });
    }

    issues
}

fn value() -> Box<Expr> {
    Box::new(Expr::Value)
}

fn constant(value: f64) -> Box<Expr> {
    Box::new(Expr::Const { value })
}

fn non_negative(metric: &str) -> ValidationRule {
    ValidationRule {
        id: format!("{metric}-non-negative"),
        metric_name: metric.to_string(),
        description: format!("{metric} must not be negative"),
        severity: Severity::Error,
        expression: Expr::Gte {
            lhs: value(),
            rhs: constant(0.0),
        },
    }
}

fn percentage(metric: &str) -> ValidationRule {
    ValidationRule {
        id: format!("{metric}-percentage"),
        metric_name: metric.to_string(),
        description: format!("{metric} must be between 0 and 100"),
        severity: Severity::Error,
        expression: Expr::And {
            lhs: Box::new(Expr::Gte {
                lhs: value(),
                rhs: constant(0.0),
            }),
            rhs: Box::new(Expr::Lte {
                lhs: value(),
                rhs: constant(100.0),
            }),
        },
    }
}

/// Rules shipped with a fresh settings file.
pub fn default_rules() -> Vec<ValidationRule> {
    let mut rules: Vec<ValidationRule> = [
        "scope1Emissions",
        "scope2Emissions",
        "scope3Emissions",
        "waterWithdrawal",
        "wasteGenerated",
        "fatalities",
    ]
    .iter()
    .map(|m| non_negative(m))
    .collect();

    rules.extend(
        [
            "renewableEnergyPct",
            "boardIndependencePct",
            "femaleWorkforcePct",
            "femaleBoardPct",
            "employeeTurnoverPct",
        ]
        .iter()
        .map(|m| percentage(m)),
    );

    rules.push(ValidationRule {
        id: "scope1-share-of-total".to_string(),
        metric_name: "scope1Emissions".to_string(),
        description: "scope1Emissions should not exceed total reported emissions".to_string(),
        severity: Severity::Warning,
        expression: Expr::Lte {
            lhs: value(),
            rhs: Box::new(Expr::Metric {
                name: "totalEmissions".to_string(),
            }),
        },
    });

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metrics(pairs: &[(&str, f64)]) -> MetricValues {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn rules_deserialize_from_tagged_json() {
        let rule: ValidationRule = serde_json::from_value(json!({
            "id": "intensity-cap",
            "metricName": "scope1Emissions",
            "description": "Emission intensity above 2 t per unit of revenue",
            "severity": "warning",
            "expression": {
                "op": "lte",
                "lhs": {
                    "op": "div",
                    "lhs": { "op": "value" },
                    "rhs": { "op": "metric", "name": "revenue" }
                },
                "rhs": { "op": "const", "value": 2.0 }
            }
        }))
        .expect("rule");

        let ok = metrics(&[("revenue", 10_000.0)]);
        assert_eq!(rule.check(15_000.0, &ok), Ok(true));
        assert_eq!(rule.check(25_000.0, &ok), Ok(false));
    }

    #[test]
    fn unknown_operators_are_rejected_at_parse_time() {
        let parsed = serde_json::from_value::<Expr>(json!({ "op": "eval", "code": "1+1" }));
        assert!(parsed.is_err());
    }

    #[test]
    fn evaluation_errors_are_reported_not_panicked() {
        let div = Expr::Div {
            lhs: value(),
            rhs: constant(0.0),
        };
        assert_eq!(div.evaluate(1.0, &MetricValues::new()), Err(EvalError::DivisionByZero));

        let missing = Expr::Metric {
            name: "revenue".to_string(),
        };
        assert_eq!(
            missing.evaluate(1.0, &MetricValues::new()),
            Err(EvalError::MissingMetric("revenue".to_string()))
        );

        let mismatch = Expr::Not { expr: value() };
        assert_eq!(
            mismatch.evaluate(1.0, &MetricValues::new()),
            Err(EvalError::TypeMismatch { expected: "boolean" })
        );
    }

    #[test]
    fn deeply_nested_expressions_are_rejected() {
        let mut expr = Expr::Value;
        for _ in 0..=MAX_DEPTH {
            expr = Expr::Add {
                lhs: Box::new(expr),
                rhs: constant(1.0),
            };
        }
        assert_eq!(expr.evaluate(0.0, &MetricValues::new()), Err(EvalError::TooDeep));
    }

    #[test]
    fn validate_reports_failed_rules() {
        let rules = default_rules();
        let values = metrics(&[
            ("scope1Emissions", -5.0),
            ("boardIndependencePct", 140.0),
            ("femaleWorkforcePct", 45.0),
        ]);

        let issues = validate(&rules, &values);
        let ids: Vec<&str> = issues.iter().map(|i| i.rule_id.as_str()).collect();
        assert!(ids.contains(&"scope1Emissions-non-negative"));
        assert!(ids.contains(&"boardIndependencePct-percentage"));
        assert!(!ids.contains(&"femaleWorkforcePct-percentage"));
        // totalEmissions is not reported
        assert!(!ids.contains(&"scope1-share-of-total"));
    }

    #[test]
    fn cross_metric_rules_run_once_every_input_is_reported() {
        let rules = default_rules();
        let share = rules
            .iter()
            .find(|r| r.id == "scope1-share-of-total")
            .expect("share rule");
        assert!(!share.applies_to(&metrics(&[("scope1Emissions", 500.0)])));

        let values = metrics(&[("scope1Emissions", 500.0), ("totalEmissions", 300.0)]);
        assert!(share.applies_to(&values));
        let issues = validate(&rules, &values);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule_id, "scope1-share-of-total");
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn unevaluable_rules_are_reported_with_the_cause() {
        let rule = ValidationRule {
            id: "intensity".to_string(),
            metric_name: "scope1Emissions".to_string(),
            description: "Emission intensity must stay below 2".to_string(),
            severity: Severity::Warning,
            expression: Expr::Lt {
                lhs: Box::new(Expr::Div {
                    lhs: value(),
                    rhs: Box::new(Expr::Metric {
                        name: "revenue".to_string(),
                    }),
                }),
                rhs: constant(2.0),
            },
        };
        let values = metrics(&[("scope1Emissions", 10.0), ("revenue", 0.0)]);
        let issues = validate(&[rule], &values);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("could not be evaluated"));
    }
}
