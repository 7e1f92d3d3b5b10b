use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Name of the record database.
pub const DATABASE_NAME: &str = "aquariumDB";

/// Schema version the current code expects.
pub const DATABASE_VERSION: u32 = 1;

/// The single record collection.
pub const IMAGES_COLLECTION: &str = "images";

/// Primary key path of the record collection.
pub const PRIMARY_KEY: &str = "id";

/// Identity of a record database: a fixed name, version, and collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub name: String,
    pub version: u32,
    pub collection: String,
    pub key_path: String,
}

impl DatabaseSchema {
    /// Schema with a custom database name (other fields default).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Same schema at a different version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

impl Default for DatabaseSchema {
    fn default() -> Self {
        Self {
            name: DATABASE_NAME.to_string(),
            version: DATABASE_VERSION,
            collection: IMAGES_COLLECTION.to_string(),
            key_path: PRIMARY_KEY.to_string(),
        }
    }
}

/// A collection registered in a database manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSpec {
    pub name: String,
    pub key_path: String,
}

/// On-disk description of a database, written next to its collections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub collections: Vec<CollectionSpec>,
}

/// What [`Manifest::upgrade`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Manifest already matched the schema.
    Current,
    /// Version bumped and/or collection created; the manifest must be rewritten.
    Upgraded,
}

impl Manifest {
    /// A fresh manifest at version 0 with no collections.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: 0,
            collections: Vec::new(),
        }
    }

    pub fn has_collection(&self, name: &str) -> bool {
        self.collections.iter().any(|c| c.name == name)
    }

    /// Bring the manifest up to `schema`.
    ///
    /// Creates the collection if absent. A manifest already at a newer
    /// version than requested is rejected and left untouched.
    pub fn upgrade(&mut self, schema: &DatabaseSchema) -> StorageResult<UpgradeOutcome> {
        if self.version > schema.version {
            return Err(StorageError::VersionConflict {
                name: self.name.clone(),
                found: self.version,
                requested: schema.version,
            });
        }
        let mut outcome = UpgradeOutcome::Current;
        if self.version < schema.version {
            self.version = schema.version;
            outcome = UpgradeOutcome::Upgraded;
        }
        if !self.has_collection(&schema.collection) {
            self.collections.push(CollectionSpec {
                name: schema.collection.clone(),
                key_path: schema.key_path.clone(),
            });
            outcome = UpgradeOutcome::Upgraded;
        }
        Ok(outcome)
    }
}
