//! Data model for aqualog.
//!
//! This crate provides the record types persisted by the aqualog storage
//! layer. Every other aqualog crate depends on `aqualog-types`.
//!
//! # Key Types
//!
//! - [`ImageRecord`]: One dated photo of a container, keyed by [`RecordId`]
//! - [`Container`]: A tracked aquarium, terrarium, or other ecosystem
//! - [`ContainerSettings`]: Per-container display options
//! - [`GlobalSettings`]: Application-wide settings (webhook target)
//! - [`TemperatureReading`]: One numeric temperature sample for a container
//! - [`StatsEntry`]: One dated set of water and habitat measurements
//!
//! Wire names are camelCase and match the JSON shape written by earlier
//! releases; legacy field names are accepted on input.

pub mod container;
pub mod error;
pub mod id;
pub mod image;
pub mod reading;
pub mod settings;
pub mod stats;
pub mod temporal;

pub use container::{Container, ContainerSettings};
pub use error::{TypeError, TypeResult};
pub use id::{ContainerId, RecordId};
pub use image::{ImageDraft, ImageEdit, ImageRecord};
pub use reading::TemperatureReading;
pub use settings::GlobalSettings;
pub use stats::{StatsEntry, WaterStats};
pub use temporal::{now_timestamp, today};
