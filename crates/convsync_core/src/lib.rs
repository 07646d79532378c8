//! # convsync Core
//!
//! Record model, record locator and merge engine for convsync.
//!
//! This crate provides:
//! - [`RecordCollection`] - the application's JSON record map, field order preserved
//! - [`RecordLocator`] - single-pass heuristic discovery of the record inside a store
//! - [`merge`] - union-with-recency merge of a local and a remote collection
//!
//! Apart from the locator's store scan, everything here is pure: no
//! filesystem access, no processes, no clocks.
//!
//! ## Key Invariants
//!
//! - The first pair satisfying any match rule, in native key order, is the record
//! - Unknown record fields survive a read-merge-write cycle unchanged
//! - `merge` is deterministic; on equal recency markers the local record wins

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod locator;
mod merge;
mod record;

pub use error::{CoreError, CoreResult};
pub use locator::{LocatedRecord, MatchRule, RecordLocator};
pub use merge::{merge, resolve, MergeOutcome, MergeStats, Resolution};
pub use record::{
    recency_marker, Record, RecordCollection, CAPTURED_AT_FIELD, DEFAULT_STORAGE_KEY,
    PROVIDER_FIELD, TEXT_FIELD,
};
