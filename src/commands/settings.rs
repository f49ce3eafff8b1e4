use crate::analysis::validation::{default_rules, ValidationRule};
use crate::models::score::{default_category_weights, default_risk_domain_weights};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: i64 = 2;

#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub category_weights: HashMap<String, f64>,
    pub risk_domain_weights: HashMap<String, f64>,
    pub forecast_years: usize,
    pub strict_numeric_input: bool,
    pub validation_rules: Vec<ValidationRule>,
}

pub async fn get_settings(workspace_path: String) -> Result<Value, String> {
    load_settings_from_disk(&workspace_path)
}

pub async fn save_settings(workspace_path: String, settings: Value) -> Result<Value, String> {
    save_settings_to_disk(&workspace_path, settings)
}

pub fn load_effective_settings(workspace_path: &str) -> Result<EffectiveSettings, String> {
    let settings = load_settings_from_disk(workspace_path)?;
    Ok(effective_from_value(&settings))
}

fn effective_from_value(settings: &Value) -> EffectiveSettings {
    let forecast_years = settings
        .get("forecastYears")
        .and_then(Value::as_u64)
        .unwrap_or(3)
        .clamp(1, 10) as usize;

    let strict_numeric_input = settings
        .get("strictNumericInput")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let validation_rules = settings
        .get("validationRules")
        .and_then(Value::as_array)
        .map(|rules| {
            rules
                .iter()
                .filter_map(|rule| serde_json::from_value::<ValidationRule>(rule.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    EffectiveSettings {
        category_weights: read_weights(settings, "categoryWeights", default_category_weights()),
        risk_domain_weights: read_weights(settings, "riskDomainWeights", default_risk_domain_weights()),
        forecast_years,
        strict_numeric_input,
        validation_rules,
    }
}

fn read_weights(settings: &Value, key: &str, defaults: HashMap<String, f64>) -> HashMap<String, f64> {
    let mut weights = defaults.clone();
    if let Some(obj) = settings.get(key).and_then(Value::as_object) {
        for (name, value) in obj {
            if let (Some(v), true) = (value.as_f64(), weights.contains_key(name)) {
                weights.insert(name.clone(), v);
            }
        }
    }

    let sum: f64 = weights.values().copied().sum();
    if sum > f64::EPSILON {
        for value in weights.values_mut() {
            *value = (*value / sum).clamp(0.0, 1.0);
        }
        weights
    } else {
        defaults
    }
}

pub fn load_settings_from_disk(workspace_path: &str) -> Result<Value, String> {
    let path = settings_path(workspace_path);
    ensure_esglens_dir(workspace_path)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read settings.json: {e}"))?;
        serde_json::from_str::<Value>(&raw).unwrap_or_else(|e| {
            log::warn!("settings.json is not valid JSON, falling back to defaults: {e}");
            json!({})
        })
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(workspace_path: &str, settings: Value) -> Result<Value, String> {
    let path = settings_path(workspace_path);
    ensure_esglens_dir(workspace_path)?;

    let mut merged = load_settings_from_disk(workspace_path).unwrap_or_else(|_| default_settings());
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    log::info!("saved settings for {workspace_path}");
    Ok(migrated)
}

fn settings_path(workspace_path: &str) -> PathBuf {
    Path::new(workspace_path)
        .join(".esglens")
        .join("settings.json")
}

fn ensure_esglens_dir(workspace_path: &str) -> Result<(), String> {
    let dir = Path::new(workspace_path).join(".esglens");
    fs::create_dir_all(&dir)
        .map_err(|e| format!("Failed to create .esglens directory: {e}"))
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out
        .get("schema_version")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    deep_merge_defaults(&mut out, &defaults);

    if version < 1 {
        migrate_weights_from_percentages(&mut out, "categoryWeights");
        migrate_weights_from_percentages(&mut out, "riskDomainWeights");
    }

    if version < 2 {
        // V2 introduces operator-defined validation rules and strict numeric input.
        ensure_key(&mut out, "validationRules", json!(default_rules()));
        ensure_key(&mut out, "strictNumericInput", json!(false));
    }

    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schema_version".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    json!({
        "schema_version": SETTINGS_SCHEMA_VERSION,
        "categoryWeights": default_category_weights(),
        "riskDomainWeights": default_risk_domain_weights(),
        "forecastYears": 3,
        "strictNumericInput": false,
        "validationRules": default_rules()
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn ensure_key(target: &mut Value, key: &str, value: Value) {
    if let Some(obj) = target.as_object_mut() {
        obj.entry(key.to_string()).or_insert(value);
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn migrate_weights_from_percentages(settings: &mut Value, key: &str) {
    let Some(weights) = settings.get_mut(key).and_then(Value::as_object_mut) else {
        return;
    };

    let has_percentage_like_values = weights.values().any(|v| v.as_f64().unwrap_or(0.0) > 1.0);
    if !has_percentage_like_values {
        return;
    }

    for value in weights.values_mut() {
        if let Some(v) = value.as_f64() {
            *value = json!(v / 100.0);
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "forecastYears", 1, 10, 3);
    ensure_bool(obj, "strictNumericInput", false);

    normalize_weights(obj, "categoryWeights", default_category_weights());
    normalize_weights(obj, "riskDomainWeights", default_risk_domain_weights());

    sanitize_rules(obj);
}

fn normalize_weights(map: &mut Map<String, Value>, key: &str, defaults: HashMap<String, f64>) {
    let weights = map.entry(key.to_string()).or_insert_with(|| json!({}));

    let Some(weight_obj) = weights.as_object_mut() else {
        *weights = json!(defaults);
        return;
    };

    weight_obj.retain(|name, _| defaults.contains_key(name));
    for (name, default_value) in &defaults {
        let current = weight_obj.get(name).and_then(Value::as_f64).unwrap_or(*default_value);
        weight_obj.insert(name.clone(), json!(current.clamp(0.0, 1.0)));
    }

    let sum: f64 = weight_obj.values().filter_map(Value::as_f64).sum();
    if sum > f64::EPSILON {
        for value in weight_obj.values_mut() {
            if let Some(v) = value.as_f64() {
                *value = json!((v / sum).clamp(0.0, 1.0));
            }
        }
    } else {
        *weights = json!(defaults);
    }
}

fn sanitize_rules(map: &mut Map<String, Value>) {
    let rules = map
        .entry("validationRules".to_string())
        .or_insert_with(|| json!([]));

    let Some(list) = rules.as_array_mut() else {
        log::warn!("validationRules is not an array, restoring defaults");
        *rules = json!(default_rules());
        return;
    };

    list.retain(|rule| match serde_json::from_value::<ValidationRule>(rule.clone()) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("dropping malformed validation rule {rule}: {e}");
            false
        }
    });
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn ensure_bool(map: &mut Map<String, Value>, key: &str, default: bool) {
    let value = map.get(key).and_then(Value::as_bool).unwrap_or(default);
    map.insert(key.to_string(), json!(value));
}
