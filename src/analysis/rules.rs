use crate::models::score::{DomainRisk, InputValue, RiskInputs, RiskLevel};
use serde::{Deserialize, Serialize};

/// When a rule fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Above { metric: String, threshold: f64 },
    AtLeast { metric: String, threshold: f64 },
    Below { metric: String, threshold: f64 },
    Equals { metric: String, value: String },
    Flag { metric: String },
}

impl Condition {
    pub fn metric(&self) -> &str {
        match self {
            Condition::Above { metric, .. }
            | Condition::AtLeast { metric, .. }
            | Condition::Below { metric, .. }
            | Condition::Equals { metric, .. }
            | Condition::Flag { metric } => metric,
        }
    }

    pub fn holds(&self, inputs: &RiskInputs) -> bool {
        let Some(input) = inputs.get(self.metric()) else {
            return false;
        };

        match self {
            Condition::Above { threshold, .. } => input.as_number().is_some_and(|v| v > *threshold),
            Condition::AtLeast { threshold, .. } => input.as_number().is_some_and(|v| v >= *threshold),
            Condition::Below { threshold, .. } => input.as_number().is_some_and(|v| v < *threshold),
            Condition::Equals { value, .. } => match input {
                InputValue::Text(text) => text.trim().eq_ignore_ascii_case(value),
                _ => false,
            },
            Condition::Flag { .. } => match input {
                InputValue::Flag(flag) => *flag,
                InputValue::Number(n) => n.is_finite() && *n != 0.0,
                InputValue::Text(text) => {
                    matches!(text.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1")
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRule {
    pub condition: Condition,
    pub points: f64,
    pub label: String,
}

impl RiskRule {
    pub fn new(condition: Condition, points: f64, label: &str) -> Self {
        Self {
            condition,
            points,
            label: label.to_string(),
        }
    }
}

/// A rule-based scorer for one risk domain.
///
/// Points of every matching rule are summed and clamped to [0, 100]. When the
/// inputs carry none of the metrics the table looks at, `default_score` is
/// returned instead: unknown is treated as risky, not as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    pub name: String,
    pub rules: Vec<RiskRule>,
    pub default_score: f64,
}

impl RuleTable {
    pub fn new(name: &str, default_score: f64, rules: Vec<RiskRule>) -> Self {
        Self {
            name: name.to_string(),
            rules,
            default_score,
        }
    }

    pub fn has_data(&self, inputs: &RiskInputs) -> bool {
        self.rules
            .iter()
            .any(|rule| inputs.contains_key(rule.condition.metric()))
    }

    pub fn evaluate(&self, inputs: &RiskInputs) -> DomainRisk {
        if !self.has_data(inputs) {
            let score = self.default_score.clamp(0.0, 100.0);
            return DomainRisk {
                score: score.round() as u32,
                level: RiskLevel::from_score(score),
                triggered: Vec::new(),
                defaulted: true,
            };
        }

        let mut points = 0.0;
        let mut triggered = Vec::new();
        for rule in &self.rules {
            if rule.condition.holds(inputs) {
                points += rule.points;
                triggered.push(rule.label.clone());
            }
        }

        let score = points.clamp(0.0, 100.0);
        DomainRisk {
            score: score.round() as u32,
            level: RiskLevel::from_score(score),
            triggered,
            defaulted: false,
        }
    }
}
