//! Conversion between JSON documents and [`Value`].

use crate::Value;

/// Convert serde_json::Value to Value
///
/// Integers that fit `i64` become [`Value::Int`], larger positive ones
/// [`Value::Uint`], everything else [`Value::Float64`].
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::Uint(u)
            } else {
                n.as_f64().map(Value::Float64).unwrap_or(Value::Null)
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::List(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Map(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert Value to serde_json::Value
///
/// Records become objects keyed by their public field names. Non-string
/// keys are rendered as JSON text. Custom values have no JSON form and
/// become null.
pub fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null | Value::Custom(_) => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Uint(u) => serde_json::Value::Number((*u).into()),
        Value::Float32(f) => float_to_json(f64::from(*f)),
        Value::Float64(f) => float_to_json(*f),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::Pairs(pairs) => serde_json::Value::Object(
            pairs
                .iter()
                .map(|(k, v)| (value_to_json(k).to_string(), value_to_json(v)))
                .collect(),
        ),
        Value::Record(record) => serde_json::Value::Object(
            record
                .fields
                .iter()
                .filter(|field| field.visibility == crate::value::Visibility::Public)
                .map(|field| (field.name.clone(), value_to_json(&field.value)))
                .collect(),
        ),
    }
}

fn float_to_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        json_to_value(v)
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        value_to_json(v)
    }
}
