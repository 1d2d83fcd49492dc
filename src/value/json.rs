//! Simplified JSON view of values
//!
//! Special types collapse to plain JSON: ObjectIds and dates become strings,
//! longs become numbers. Output is meant for piping, not for round trips.

use base64::Engine as _;
use serde_json::{Map, Number, Value as JsonValue};

use super::{Value, format_date, format_double};

/// Convert a value to simplified JSON.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(n) | Value::Long(n) => JsonValue::Number((*n).into()),
        Value::Double(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(format_double(*f))),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Date(dt) => JsonValue::String(format_date(dt)),
        Value::ObjectId(oid) => JsonValue::String(oid.to_hex()),
        Value::Binary(bin) => {
            JsonValue::String(base64::engine::general_purpose::STANDARD.encode(&bin.bytes))
        }
        Value::Decimal(d) => JsonValue::String(d.to_string()),
        Value::Timestamp(ts) => {
            let mut map = Map::new();
            map.insert("t".to_string(), JsonValue::Number(ts.time.into()));
            map.insert("i".to_string(), JsonValue::Number(ts.increment.into()));
            JsonValue::Object(map)
        }
        Value::Regex(re) => JsonValue::String(format!("/{}/{}", re.pattern, re.options)),
        Value::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
        Value::Document(doc) => JsonValue::Object(
            doc.iter()
                .map(|(k, v)| (k.to_string(), value_to_json(v)))
                .collect(),
        ),
    }
}
