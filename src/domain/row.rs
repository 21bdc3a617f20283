use serde_json::{Map, Value};

/// A materialized record, keyed by column name in source order.
pub type Row = Map<String, Value>;

pub trait RowExt {
    /// Value of `key` rendered as text; missing and null values are empty.
    fn text(&self, key: &str) -> String;
}

impl RowExt for Row {
    fn text(&self, key: &str) -> String {
        self.get(key).map(value_to_text).unwrap_or_default()
    }
}

pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
