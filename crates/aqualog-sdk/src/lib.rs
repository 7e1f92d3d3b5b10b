//! High-level SDK for aqualog.
//!
//! Provides one explicitly constructed service, [`Tracker`], over the image
//! record collection and the flat key-value namespace. This is the main entry
//! point for applications embedding aqualog.

pub mod config;
pub mod error;
pub mod tracker;

pub use config::{Backend, TrackerConfig};
pub use error::{SdkError, SdkResult};
pub use tracker::Tracker;

// Re-export key types
pub use aqualog_exchange::{ImportError, ImportPhase, ImportReport, SnapshotDocument};
pub use aqualog_store::StorageError;
pub use aqualog_types::{
    Container, ContainerId, GlobalSettings, ImageDraft, ImageEdit, ImageRecord, RecordId,
    StatsEntry, TemperatureReading, WaterStats,
};
