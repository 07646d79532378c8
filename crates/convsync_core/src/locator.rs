//! Heuristic discovery of the record collection inside a store.
//!
//! The extension's storage key is namespaced differently by different
//! browser versions, so the record is found by inspecting values rather
//! than by looking up a fixed key. The scan is a single forward pass in the
//! store's native key order; every pair is tested against the match rules
//! in priority order and the first pair satisfying any rule wins.
//!
//! # Known limitation
//!
//! The shape rule accepts any JSON object with a nested object carrying both
//! `provider` and `text`. An unrelated value with those two fields that sorts
//! before the real record would be picked instead.

use crate::error::CoreResult;
use crate::record::{RecordCollection, DEFAULT_STORAGE_KEY, PROVIDER_FIELD, TEXT_FIELD};
use convsync_storage::{display_key, KvStore};
use serde_json::{Map, Value};
use tracing::{debug, trace};

/// A predicate deciding whether a decoded pair is the record collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchRule {
    /// The object is non-empty and some value is an object holding both
    /// `provider` and `text`.
    Shape,
    /// The key, decoded lossily as UTF-8, contains the given substring.
    KeyName(String),
}

impl MatchRule {
    /// Tests a pair whose value already decoded to a JSON object.
    pub fn matches(&self, key: &[u8], object: &Map<String, Value>) -> bool {
        match self {
            MatchRule::Shape => object.values().any(|value| {
                value.as_object().is_some_and(|record| {
                    record.contains_key(PROVIDER_FIELD) && record.contains_key(TEXT_FIELD)
                })
            }),
            MatchRule::KeyName(needle) => display_key(key).contains(needle.as_str()),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            MatchRule::Shape => "shape",
            MatchRule::KeyName(_) => "key-name",
        }
    }
}

/// The record collection found in a store, with the key it lives under.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedRecord {
    /// The store-native key holding the collection.
    pub key: Vec<u8>,
    /// The decoded collection.
    pub collection: RecordCollection,
    /// The rule that selected this pair.
    pub rule: MatchRule,
}

/// Locates the record collection in a store using ordered match rules.
#[derive(Debug, Clone)]
pub struct RecordLocator {
    rules: Vec<MatchRule>,
}

impl RecordLocator {
    /// Creates a locator using the shape rule, then a key-name rule for
    /// `storage_key`.
    pub fn new(storage_key: impl Into<String>) -> Self {
        Self {
            rules: vec![MatchRule::Shape, MatchRule::KeyName(storage_key.into())],
        }
    }

    /// Creates a locator with a custom rule order.
    pub fn with_rules(rules: Vec<MatchRule>) -> Self {
        Self { rules }
    }

    /// Returns the rules in priority order.
    pub fn rules(&self) -> &[MatchRule] {
        &self.rules
    }

    /// Tests a single pair against every rule, returning the first that
    /// matches.
    ///
    /// Values that are not UTF-8, not JSON, or not a JSON object never match.
    pub fn classify(&self, key: &[u8], value: &[u8]) -> Option<(&MatchRule, Map<String, Value>)> {
        let text = std::str::from_utf8(value).ok()?;
        let Value::Object(object) = serde_json::from_str::<Value>(text).ok()? else {
            return None;
        };
        let rule = self.rules.iter().find(|rule| rule.matches(key, &object))?;
        Some((rule, object))
    }

    /// Scans `store` and returns the first matching pair.
    ///
    /// Returns `Ok(None)` when no pair matches; callers must treat that as
    /// a missing record, not as an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be iterated. Undecodable
    /// pairs are skipped.
    pub fn locate<S: KvStore + ?Sized>(&self, store: &mut S) -> CoreResult<Option<LocatedRecord>> {
        let mut scanned = 0usize;
        for (key, value) in store.iter()? {
            scanned += 1;
            match self.classify(&key, &value) {
                Some((rule, object)) => {
                    debug!(
                        key = %display_key(&key),
                        rule = rule.name(),
                        records = object.len(),
                        scanned,
                        "located record collection"
                    );
                    return Ok(Some(LocatedRecord {
                        rule: rule.clone(),
                        collection: RecordCollection::from_map(object),
                        key,
                    }));
                }
                None => trace!(key = %display_key(&key), "skipping pair"),
            }
        }
        debug!(scanned, "no record collection found");
        Ok(None)
    }
}

impl Default for RecordLocator {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_KEY)
    }
}
