use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const ENVIRONMENTAL: &str = "environmental";
pub const SOCIAL: &str = "social";
pub const GOVERNANCE: &str = "governance";

pub const TAILINGS: &str = "tailings";
pub const OPERATIONAL: &str = "operational";

/// Categorical risk level derived from a 0–100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// > 70 high, > 40 medium, else low.
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            RiskLevel::High
        } else if score > 40.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// A raw input to the risk classifier: a metric value or a descriptive attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl InputValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            InputValue::Number(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }
}

/// Named inputs for one risk assessment.
pub type RiskInputs = HashMap<String, InputValue>;

/// Result of evaluating one rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRisk {
    pub score: u32,
    pub level: RiskLevel,
    pub triggered: Vec<String>,
    /// True when no input for this domain was present and the table default was used.
    pub defaulted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub company_id: String,
    pub period: i32,
    pub overall: u32,
    pub breakdown: BTreeMap<String, u32>,
    pub level: RiskLevel,
    pub details: BTreeMap<String, DomainRisk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EsgScore {
    pub company_id: String,
    pub period: i32,
    pub overall: u32,
    /// Category scores (100 minus category risk).
    pub breakdown: BTreeMap<String, u32>,
    pub level: RiskLevel,
    pub climate_risk: DomainRisk,
    pub metric_count: usize,
}

/// Default category weights (sum to 1.0)
pub fn default_category_weights() -> HashMap<String, f64> {
    let mut w = HashMap::new();
    w.insert(ENVIRONMENTAL.to_string(), 0.4);
    w.insert(SOCIAL.to_string(), 0.3);
    w.insert(GOVERNANCE.to_string(), 0.3);
    w
}

/// Default mining risk-domain weights (sum to 1.0)
pub fn default_risk_domain_weights() -> HashMap<String, f64> {
    let mut w = HashMap::new();
    w.insert(TAILINGS.to_string(), 0.3);
    w.insert(ENVIRONMENTAL.to_string(), 0.3);
    w.insert(SOCIAL.to_string(), 0.2);
    w.insert(OPERATIONAL.to_string(), 0.2);
    w
}
