//! Audit trail entries served by `/logs/collection`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Record;

/// One audit-log entry.
///
/// The log collection is written by the backend and its shape varies between
/// tables, so the entry stays a permissive record with best-effort accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLogEntry(Record);

impl AuditLogEntry {
    pub fn record(&self) -> &Record {
        &self.0
    }

    /// What happened, e.g. "create", "update", "delete"
    pub fn action(&self) -> Option<&str> {
        self.first_str(&["action", "type", "operation"])
    }

    /// Who did it. Accepts a plain string or an embedded employee object.
    pub fn actor(&self) -> Option<String> {
        for key in ["createdBy", "user", "employee", "actor"] {
            match self.0.get(key) {
                Some(Value::String(s)) => return Some(s.clone()),
                Some(Value::Object(obj)) => {
                    let name = obj
                        .get("name")
                        .or_else(|| obj.get("phone"))
                        .and_then(Value::as_str);
                    if let Some(name) = name {
                        return Some(name.to_string());
                    }
                }
                _ => {}
            }
        }
        None
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.first_str(&["createdAt", "timestamp", "time"])
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Field values that changed, when the backend recorded them.
    pub fn changes(&self) -> Option<&Value> {
        ["changes", "data", "newData"]
            .iter()
            .find_map(|key| self.0.get(key))
            .filter(|v| !v.is_null())
    }

    fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.0.str_field(key))
    }
}
