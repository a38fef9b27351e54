//! Structured records flowing from a record source into the part encoder

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field sampled for diagnostics when a part is opened
pub const TIME_FIELD: &str = "time";

/// A key/value document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Unix time in seconds, if the record carries an integral `time`
    pub fn time(&self) -> Option<i64> {
        match self.0.get(TIME_FIELD)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Compact JSON form used in log samples
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "<unprintable>".to_string())
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// One item produced by a record source
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    Record(Record),
    /// Input that could not be turned into a record
    Malformed { reason: String, raw: String },
}
