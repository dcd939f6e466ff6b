//! Permissive entity records.
//!
//! The backend owns the schema for products, orders, employees and the rest,
//! so records are kept as plain JSON objects with a few typed accessors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of a backend record.
///
/// Relational tables use `id` (string or number), document collections use
/// `_id`, which may arrive as a plain string or as `{"$oid": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            Value::Object(obj) => obj.get("$oid").and_then(Self::from_value),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A loosely-validated entity document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from an arbitrary JSON value. Only objects qualify.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// The record id, preferring `id` over `_id`.
    pub fn id(&self) -> Option<RecordId> {
        self.0
            .get("id")
            .and_then(RecordId::from_value)
            .or_else(|| self.0.get("_id").and_then(RecordId::from_value))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String field, if present and a string
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Fields of `edited` whose values differ from `self`.
    ///
    /// Nested objects and arrays are compared structurally. Fields that exist
    /// only in `self` are not reported; the edit form never deletes fields.
    /// Returns `None` when nothing changed.
    pub fn changes_to(&self, edited: &Record) -> Option<Record> {
        let changed: Map<String, Value> = edited
            .0
            .iter()
            .filter(|(key, value)| self.0.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if changed.is_empty() {
            None
        } else {
            Some(Record(changed))
        }
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value).expect("test value must be an object")
    }

    #[test]
    fn test_id_variants() {
        assert_eq!(record(json!({"id": 42})).id(), Some(RecordId::new("42")));
        assert_eq!(record(json!({"id": "P-1"})).id(), Some(RecordId::new("P-1")));
        assert_eq!(
            record(json!({"_id": "65f1c0ffee"})).id(),
            Some(RecordId::new("65f1c0ffee"))
        );
        assert_eq!(
            record(json!({"_id": {"$oid": "65f1c0ffee"}})).id(),
            Some(RecordId::new("65f1c0ffee"))
        );
        assert_eq!(record(json!({"name": "no id"})).id(), None);
        assert_eq!(record(json!({"id": ""})).id(), None);
        assert_eq!(record(json!({"id": null, "_id": "x"})).id(), Some(RecordId::new("x")));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Record::from_value(json!([1, 2])).is_none());
        assert!(Record::from_value(json!("text")).is_none());
    }

    #[test]
    fn test_changes_to_reports_only_differences() {
        let original = record(json!({
            "id": 7,
            "name": "Lipstick",
            "price": 120000,
            "tags": ["red", "matte"],
            "brandData": {"name": "Acme"}
        }));
        let edited = record(json!({
            "name": "Lipstick",
            "price": 99000,
            "tags": ["red", "matte"],
            "brandData": {"name": "Other"}
        }));

        let changes = original.changes_to(&edited).expect("price and brand changed");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get("price"), Some(&json!(99000)));
        assert_eq!(changes.get("brandData"), Some(&json!({"name": "Other"})));
    }

    #[test]
    fn test_changes_to_none_when_identical() {
        let original = record(json!({"id": 1, "name": "Brand"}));
        let edited = record(json!({"name": "Brand"}));
        assert!(original.changes_to(&edited).is_none());
    }

    #[test]
    fn test_serializes_transparently() {
        let r = Record::new().with("name", "Coupon").with("discount", 10);
        let text = serde_json::to_string(&r).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, json!({"name": "Coupon", "discount": 10}));
    }
}
