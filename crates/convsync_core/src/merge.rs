//! Union-with-recency merge of two record collections.

use crate::record::{recency_marker, Record, RecordCollection};
use tracing::info;

/// How a single remote record is folded into the merged collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The identifier exists only remotely; the remote record is added.
    Insert,
    /// The local record is at least as recent; it is kept unchanged.
    KeepLocal,
    /// The remote record is strictly more recent; it replaces the local one.
    AcceptRemote,
}

/// Decides how `remote` is merged against the current `local` record.
///
/// Markers are compared as plain strings, so they must sort in
/// chronological order (ISO-8601 does). Equal markers, including two
/// missing ones, keep the local record.
pub fn resolve(local: Option<&Record>, remote: &Record) -> Resolution {
    match local {
        None => Resolution::Insert,
        Some(local) if recency_marker(remote) > recency_marker(local) => {
            Resolution::AcceptRemote
        }
        Some(_) => Resolution::KeepLocal,
    }
}

/// Summary counts of a merge, for operator output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeStats {
    /// Records in the local input.
    pub local: usize,
    /// Records in the remote input.
    pub remote: usize,
    /// Records in the merged output.
    pub merged: usize,
    /// Remote records added because the identifier was new.
    pub added: usize,
    /// Local records replaced by a newer remote version.
    pub updated: usize,
}

/// Result of [`merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The merged collection.
    pub merged: RecordCollection,
    /// Number of identifiers taken from remote only.
    pub added: usize,
    /// Number of local records replaced by remote ones.
    pub updated: usize,
    /// Summary counts.
    pub stats: MergeStats,
}

/// Merges `remote` into a copy of `local`.
///
/// Every identifier in either input appears exactly once in the result.
/// Local identifiers keep their order; new remote identifiers are appended
/// in remote order.
pub fn merge(local: &RecordCollection, remote: &RecordCollection) -> MergeOutcome {
    let mut merged = local.clone();
    let mut added = 0;
    let mut updated = 0;

    for (id, remote_record) in remote.iter() {
        match resolve(merged.get(id), remote_record) {
            Resolution::Insert => {
                merged.insert(id.clone(), remote_record.clone());
                added += 1;
            }
            Resolution::AcceptRemote => {
                merged.insert(id.clone(), remote_record.clone());
                updated += 1;
            }
            Resolution::KeepLocal => {}
        }
    }

    let stats = MergeStats {
        local: local.len(),
        remote: remote.len(),
        merged: merged.len(),
        added,
        updated,
    };
    info!(
        local = stats.local,
        remote = stats.remote,
        merged = stats.merged,
        added = stats.added,
        updated = stats.updated,
        "merged record collections"
    );

    MergeOutcome {
        merged,
        added,
        updated,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn collection(value: Value) -> RecordCollection {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn newer_remote_replaces_and_new_ids_are_added() {
        let local = collection(json!({
            "t1": {"provider": "x", "text": "hi", "capturedAt": "2024-01-01T00:00:00Z"}
        }));
        let remote = collection(json!({
            "t1": {"provider": "x", "text": "hi-edited", "capturedAt": "2024-01-02T00:00:00Z"},
            "t2": {"provider": "y", "text": "new", "capturedAt": "2024-01-01T00:00:00Z"}
        }));

        let outcome = merge(&local, &remote);

        assert_eq!(outcome.merged.len(), 2);
        assert_eq!(outcome.merged.get("t1"), remote.get("t1"));
        assert_eq!(outcome.merged.get("t2"), remote.get("t2"));
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.updated, 1);
        assert_eq!(
            outcome.stats,
            MergeStats {
                local: 1,
                remote: 2,
                merged: 2,
                added: 1,
                updated: 1,
            }
        );
    }

    #[test]
    fn older_or_equal_remote_keeps_local() {
        let local = collection(json!({
            "old": {"text": "local", "capturedAt": "2024-05-01T00:00:00Z"},
            "tie": {"text": "local", "capturedAt": "2024-05-01T00:00:00Z"}
        }));
        let remote = collection(json!({
            "old": {"text": "remote", "capturedAt": "2024-04-01T00:00:00Z"},
            "tie": {"text": "remote", "capturedAt": "2024-05-01T00:00:00Z"}
        }));

        let outcome = merge(&local, &remote);

        assert_eq!(outcome.merged, local);
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.updated, 0);
    }

    #[test]
    fn missing_markers_on_both_sides_keep_local() {
        let local = collection(json!({"t": {"text": "local"}}));
        let remote = collection(json!({"t": {"text": "remote"}}));

        assert_eq!(merge(&local, &remote).merged, local);
    }

    #[test]
    fn missing_local_marker_loses_to_any_remote_marker() {
        let local = collection(json!({"t": {"text": "local"}}));
        let remote = collection(json!({"t": {"text": "remote", "capturedAt": "0"}}));

        let outcome = merge(&local, &remote);
        assert_eq!(outcome.merged.get("t"), remote.get("t"));
        assert_eq!(outcome.updated, 1);
    }

    #[test]
    fn local_order_is_kept_and_new_ids_appended() {
        let local = collection(json!({"b": {}, "a": {}}));
        let remote = collection(json!({"c": {}, "a": {}}));

        let outcome = merge(&local, &remote);
        let ids: Vec<&String> = outcome.merged.ids().collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn resolve_decisions() {
        let newer = json!({"capturedAt": "2024-02-01"});
        let older = json!({"capturedAt": "2024-01-01"});

        assert_eq!(resolve(None, &older), Resolution::Insert);
        assert_eq!(resolve(Some(&older), &newer), Resolution::AcceptRemote);
        assert_eq!(resolve(Some(&newer), &older), Resolution::KeepLocal);
        assert_eq!(resolve(Some(&newer), &newer), Resolution::KeepLocal);
    }

    fn record_strategy() -> impl Strategy<Value = Value> {
        (
            prop::option::of(prop::sample::select(vec![
                "2024-01-01T00:00:00Z",
                "2024-01-02T00:00:00Z",
                "2024-03-15T12:30:00Z",
            ])),
            "[a-z]{0,6}",
        )
            .prop_map(|(captured_at, text)| {
                let mut record = json!({"provider": "p", "text": text});
                if let Some(at) = captured_at {
                    record["capturedAt"] = json!(at);
                }
                record
            })
    }

    fn collection_strategy() -> impl Strategy<Value = RecordCollection> {
        prop::collection::vec(("t[0-7]", record_strategy()), 0..8)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn merge_size_bounds(a in collection_strategy(), b in collection_strategy()) {
            let outcome = merge(&a, &b);
            prop_assert!(outcome.merged.len() >= a.len().max(b.len()));
            prop_assert!(outcome.merged.len() <= a.len() + b.len());
            prop_assert_eq!(outcome.merged.len(), a.len() + outcome.added);
            prop_assert!(outcome.updated <= a.len());
        }

        #[test]
        fn merge_is_idempotent(a in collection_strategy(), b in collection_strategy()) {
            let once = merge(&a, &b).merged;
            let twice = merge(&once, &b);
            prop_assert_eq!(&twice.merged, &once);
            prop_assert_eq!(twice.added, 0);
            prop_assert_eq!(twice.updated, 0);
        }

        #[test]
        fn merge_is_commutative_on_content(a in collection_strategy(), b in collection_strategy()) {
            let ab = merge(&a, &b).merged;
            let ba = merge(&b, &a).merged;

            let mut ab_ids: Vec<&String> = ab.ids().collect();
            let mut ba_ids: Vec<&String> = ba.ids().collect();
            ab_ids.sort();
            ba_ids.sort();
            prop_assert_eq!(ab_ids, ba_ids);

            for (id, record) in ab.iter() {
                let other = ba.get(id).unwrap();
                match (a.get(id), b.get(id)) {
                    (Some(ra), Some(rb)) if recency_marker(ra) == recency_marker(rb) => {
                        prop_assert_eq!(record, ra);
                        prop_assert_eq!(other, rb);
                    }
                    _ => prop_assert_eq!(record, other),
                }
            }
        }
    }
}
