//! Record collection model.
//!
//! A record collection is the JSON object the extension keeps under its
//! storage key: thread identifiers mapped to thread records. Records are
//! kept as generic JSON values so fields this crate does not know about are
//! written back exactly as they were read.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding a record's recency marker.
pub const CAPTURED_AT_FIELD: &str = "capturedAt";

/// Field that, together with [`TEXT_FIELD`], fingerprints a thread record.
pub const PROVIDER_FIELD: &str = "provider";

/// Field that, together with [`PROVIDER_FIELD`], fingerprints a thread record.
pub const TEXT_FIELD: &str = "text";

/// Logical storage key the extension writes its threads under.
pub const DEFAULT_STORAGE_KEY: &str = "threads";

/// A single record: an opaque JSON value, normally an object.
pub type Record = Value;

/// Returns the record's `capturedAt` marker.
///
/// A missing field, a non-string field, or a record that is not an object
/// all read as the empty string, which sorts below every real timestamp.
pub fn recency_marker(record: &Record) -> &str {
    record
        .get(CAPTURED_AT_FIELD)
        .and_then(Value::as_str)
        .unwrap_or("")
}

/// Mapping from record identifier to record.
///
/// Identifier order is preserved through decode and encode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordCollection {
    records: Map<String, Value>,
}

impl RecordCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an already-decoded JSON object.
    #[must_use]
    pub fn from_map(records: Map<String, Value>) -> Self {
        Self { records }
    }

    /// Decodes a collection from raw store bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Json`] if the bytes are not JSON, and
    /// [`CoreError::NotAnObject`] if the JSON is not an object.
    pub fn from_slice(bytes: &[u8]) -> CoreResult<Self> {
        match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(records) => Ok(Self { records }),
            other => Err(CoreError::NotAnObject {
                found: json_type(&other),
            }),
        }
    }

    /// Encodes the collection as compact JSON bytes for the store.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_vec(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(&self.records)?)
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the collection holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the record stored under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.get(id)
    }

    /// Returns true if a record is stored under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Inserts or replaces the record under `id`, returning the previous one.
    pub fn insert(&mut self, id: impl Into<String>, record: Record) -> Option<Record> {
        self.records.insert(id.into(), record)
    }

    /// Iterates over `(id, record)` pairs in collection order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Record)> {
        self.records.iter()
    }

    /// Iterates over identifiers in collection order.
    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }
}

impl FromIterator<(String, Record)> for RecordCollection {
    fn from_iter<I: IntoIterator<Item = (String, Record)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recency_marker_reads_string_field() {
        let record = json!({"capturedAt": "2024-01-01T00:00:00Z"});
        assert_eq!(recency_marker(&record), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn recency_marker_defaults_to_empty() {
        assert_eq!(recency_marker(&json!({"provider": "x"})), "");
        assert_eq!(recency_marker(&json!({"capturedAt": 17})), "");
        assert_eq!(recency_marker(&json!("not an object")), "");
    }

    #[test]
    fn decode_rejects_non_objects() {
        let err = RecordCollection::from_slice(b"[1, 2]").unwrap_err();
        assert!(matches!(err, CoreError::NotAnObject { found: "array" }));

        let err = RecordCollection::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, CoreError::Json(_)));
    }

    #[test]
    fn unknown_fields_and_order_survive_round_trip() {
        let raw = br#"{"z":{"provider":"x","text":"hi","extra":{"nested":[1,2]}},"a":{"provider":"y","text":"yo","capturedAt":"2024"}}"#;
        let collection = RecordCollection::from_slice(raw).unwrap();

        let ids: Vec<&String> = collection.ids().collect();
        assert_eq!(ids, vec!["z", "a"]);
        assert_eq!(collection.to_vec().unwrap(), raw.to_vec());
    }

    #[test]
    fn insert_replaces_and_returns_previous() {
        let mut collection = RecordCollection::new();
        assert!(collection.insert("t1", json!({"text": "a"})).is_none());
        let previous = collection.insert("t1", json!({"text": "b"})).unwrap();

        assert_eq!(previous, json!({"text": "a"}));
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.get("t1"), Some(&json!({"text": "b"})));
    }
}
