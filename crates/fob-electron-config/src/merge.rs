//! Config merging with bundler semantics.
//!
//! - `null` overrides are skipped
//! - arrays on either side are concatenated (defaults first)
//! - objects merge recursively
//! - anything else is replaced by the override
//!
//! `ssr.noExternal` is special: `true` on either side wins over a list.

use serde_json::{Map, Value};

use crate::error::Result;
use crate::schema::TargetConfig;

/// Merge `overrides` on top of `defaults`, returning a new value.
pub fn merge_config(defaults: &Value, overrides: &Value) -> Value {
    merge_at(defaults, overrides, "")
}

/// Typed wrapper around [`merge_config`].
pub fn merge_targets(defaults: &TargetConfig, overrides: &TargetConfig) -> Result<TargetConfig> {
    let merged = merge_config(&defaults.to_value()?, &overrides.to_value()?);
    TargetConfig::from_value(merged)
}

fn merge_at(defaults: &Value, overrides: &Value, path: &str) -> Value {
    match (defaults, overrides) {
        (Value::Object(base), Value::Object(update)) => Value::Object(merge_maps(base, update, path)),
        (_, Value::Null) => defaults.clone(),
        _ => overrides.clone(),
    }
}

fn merge_maps(base: &Map<String, Value>, update: &Map<String, Value>, path: &str) -> Map<String, Value> {
    let mut merged = base.clone();

    for (key, value) in update {
        if value.is_null() {
            continue;
        }

        let existing = match merged.get(key) {
            Some(existing) if !existing.is_null() => existing,
            _ => {
                merged.insert(key.clone(), value.clone());
                continue;
            }
        };

        let next = if path == "ssr" && key == "noExternal" && (is_true(existing) || is_true(value)) {
            Value::Bool(true)
        } else if existing.is_array() || value.is_array() {
            let mut items = arraify(existing);
            items.extend(arraify(value));
            Value::Array(items)
        } else if existing.is_object() && value.is_object() {
            let child = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}.{key}")
            };
            merge_at(existing, value, &child)
        } else {
            value.clone()
        };

        merged.insert(key.clone(), next);
    }

    merged
}

fn is_true(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

fn arraify(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}
