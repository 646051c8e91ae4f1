use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

/// A single raw data point as delivered by an external source.
///
/// Field values are kept as untyped JSON until normalization; a field may be
/// a number, a locale-formatted string, or null. Observations are transient
/// and never persisted as-is.
#[derive(Debug, Clone)]
pub struct RawObservation {
    pub entity: String,
    pub date: NaiveDate,
    pub fields: HashMap<String, Value>,
}

impl RawObservation {
    pub fn new(entity: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            entity: entity.into(),
            date,
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
