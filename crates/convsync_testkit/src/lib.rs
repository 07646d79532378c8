//! # convsync Testkit
//!
//! Test utilities for convsync.
//!
//! This crate provides:
//! - Temporary LevelDB stores seeded with records and noise
//! - Record builders
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use convsync_testkit::prelude::*;
//!
//! #[test]
//! fn reads_seeded_store() {
//!     let store = TestStore::with_collection(NAMESPACED_THREADS_KEY, &collection([
//!         ("t1", thread("chatgpt", "hi", "2024-01-01T00:00:00Z")),
//!     ]));
//!     assert_eq!(store.collection_at(NAMESPACED_THREADS_KEY).unwrap().len(), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
