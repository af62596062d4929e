use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Column filters keyed by field name.
pub type FilterSet = BTreeMap<String, Filter>;

fn default_match_mode() -> String {
    String::from("equals")
}

/// A single column constraint as the data table emits it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default)]
    pub value: Value,
    #[serde(default = "default_match_mode")]
    pub match_mode: String,
}

impl Filter {
    pub fn new(value: impl Into<Value>, match_mode: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            match_mode: match_mode.into(),
        }
    }

    /// An unconstrained filter for `match_mode`.
    pub fn empty(match_mode: impl Into<String>) -> Self {
        Self::new(Value::Null, match_mode)
    }

    /// Whether the filter constrains anything. Null, `""` and `[]` do not.
    pub fn is_active(&self) -> bool {
        match &self.value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => true,
        }
    }
}

/// Rewrites every empty-array value to null so `[]` never goes out as a
/// constraint.
pub fn clear_empty_arrays(filters: &mut FilterSet) {
    for filter in filters.values_mut() {
        if matches!(&filter.value, Value::Array(items) if items.is_empty()) {
            filter.value = Value::Null;
        }
    }
}

/// Restores numeric types lost in the URL round trip and drops duplicate
/// entries from list values. Coercion runs first, so `["1", 1]` collapses
/// to `[1]`.
pub fn coerce_url_filters(filters: &mut FilterSet) {
    for filter in filters.values_mut() {
        let value = std::mem::take(&mut filter.value);
        filter.value = match value {
            Value::Array(items) => {
                let mut unique: Vec<Value> = Vec::with_capacity(items.len());
                for item in items.into_iter().map(coerce_scalar) {
                    if !unique.contains(&item) {
                        unique.push(item);
                    }
                }
                Value::Array(unique)
            }
            other => coerce_scalar(other),
        };
    }
}

fn coerce_scalar(value: Value) -> Value {
    match value {
        Value::String(text) => parse_number(&text).map_or(Value::String(text), Value::Number),
        other => other,
    }
}

/// Parses a numeric string, keeping integers integral.
pub fn parse_number(text: &str) -> Option<Number> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(n.into());
    }
    text.parse::<f64>().ok().and_then(Number::from_f64)
}
