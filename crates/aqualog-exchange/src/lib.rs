//! Snapshot export and import for aqualog.
//!
//! A snapshot is the entire local state as one portable JSON document: every
//! image record plus the container list. Export is a pure read. Import
//! replaces whatever is stored with exactly what the document holds.
//!
//! # Architecture
//!
//! - [`SnapshotDocument`]: the `{ images, containers }` value and its JSON form
//! - [`ParsedSnapshot`]: a validated import, including the legacy bare-array shape
//! - [`SnapshotExchange`]: runs export and the import state machine
//! - [`ImportPhase`]: `Idle -> Validating -> Clearing -> Writing -> Done | Failed`

pub mod document;
pub mod error;
pub mod exchange;
pub mod phase;

pub use document::{ParsedSnapshot, SnapshotDocument, SnapshotFormat};
pub use error::{ImportError, ImportResult};
pub use exchange::{ImportReport, SnapshotExchange};
pub use phase::ImportPhase;
