//! Local persistence for aqualog.
//!
//! Two independent storage areas live here:
//!
//! - the **record collection**: a single named collection of
//!   [`ImageRecord`](aqualog_types::ImageRecord)s keyed by id, accessed
//!   through the asynchronous [`RecordStore`] trait;
//! - the **flat namespace**: a string key-value area holding the container
//!   list, global settings, and per-container readings, accessed through
//!   [`KeyValueStore`] and the typed [`FlatNamespace`] wrapper.
//!
//! # Storage Backends
//!
//! - [`InMemoryRecordStore`] / [`InMemoryKeyValueStore`] -- for tests and embedding
//! - [`DirectoryRecordStore`] / [`FileKeyValueStore`] -- durable, on local disk
//!
//! # Design Rules
//!
//! 1. `put` is an upsert: a write with an existing id replaces in place.
//! 2. Every operation is its own transaction; nothing spans operations.
//! 3. A missing record is `Ok(None)`, never an error.
//! 4. The record collection is the only place images are stored.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod directory;
pub mod error;
pub mod memory;
pub mod namespace;
pub mod schema;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use directory::DirectoryRecordStore;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryRecordStore;
pub use namespace::{FileKeyValueStore, FlatNamespace, InMemoryKeyValueStore, KeyValueStore};
pub use schema::DatabaseSchema;
pub use traits::RecordStore;
