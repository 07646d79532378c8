//! Property-based test generators using proptest.
//!
//! Identifiers and timestamps are drawn from small pools so generated
//! collections overlap and tie often.

use convsync_core::RecordCollection;
use proptest::prelude::*;
use serde_json::{json, Value};

/// Strategy for record identifiers from a small shared pool.
pub fn record_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("t[0-9]").expect("Invalid regex")
}

/// Strategy for an optional ISO-8601 recency marker.
pub fn captured_at_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::weighted(
        0.85,
        (1u32..=3, 1u32..=28, 0u32..24)
            .prop_map(|(month, day, hour)| format!("2024-{month:02}-{day:02}T{hour:02}:00:00Z")),
    )
}

/// Strategy for a thread record, sometimes carrying extra opaque fields.
pub fn record_strategy() -> impl Strategy<Value = Value> {
    (
        prop::sample::select(vec!["chatgpt", "claude", "gemini"]),
        "[a-z ]{0,12}",
        captured_at_strategy(),
        prop::option::of(any::<u16>()),
    )
        .prop_map(|(provider, text, captured_at, extra)| {
            let mut record = json!({"provider": provider, "text": text});
            if let Some(at) = captured_at {
                record["capturedAt"] = json!(at);
            }
            if let Some(extra) = extra {
                record["meta"] = json!({"tokens": extra, "tags": ["a", "b"]});
            }
            record
        })
}

/// Strategy for a record collection with up to `max_len` records.
pub fn collection_strategy(max_len: usize) -> impl Strategy<Value = RecordCollection> {
    prop::collection::vec((record_id_strategy(), record_strategy()), 0..=max_len)
        .prop_map(|pairs| pairs.into_iter().collect())
}
