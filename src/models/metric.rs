use crate::error::{EsgError, EsgResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single reported metric value for a company and reporting year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub id: String,
    pub company_id: String,
    pub metric_name: String,
    pub value: f64,
    pub period: i32,
    #[serde(default)]
    pub created_at: i64,
}

/// Metric values of one company and period, keyed by metric name.
pub type MetricValues = HashMap<String, f64>;

/// Lenient numeric coercion used at the data-entry boundary.
///
/// Mirrors `Number(x) || 0`: numbers pass through, numeric strings are parsed,
/// booleans become 1/0, and anything else (including NaN/inf) becomes 0.
pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Parse a submitted metric value, rejecting non-numeric input when `strict`.
pub fn parse_metric_value(field: &str, value: &Value, strict: bool) -> EsgResult<f64> {
    if !strict {
        return Ok(coerce_number(value));
    }

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| EsgError::InvalidInput {
            field: field.to_string(),
            reason: format!("expected a finite number, got {value}"),
        })
}

/// A metric as submitted for entry, before its value has been parsed.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricEntry {
    #[serde(default)]
    pub id: String,
    pub company_id: String,
    pub metric_name: String,
    #[serde(default)]
    pub value: Value,
    pub period: i32,
    #[serde(default)]
    pub created_at: i64,
}

impl MetricEntry {
    /// Parse the submitted value with the same rules as bulk entry.
    pub fn into_metric(self, strict: bool) -> EsgResult<Metric> {
        let value = parse_metric_value(&self.metric_name, &self.value, strict)?;
        Ok(Metric {
            id: self.id,
            company_id: self.company_id,
            metric_name: self.metric_name,
            value,
            period: self.period,
            created_at: self.created_at,
        })
    }
}
