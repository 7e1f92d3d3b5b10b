use std::path::{Path, PathBuf};

use aqualog_store::schema::{DATABASE_NAME, DATABASE_VERSION};
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Environment variable that overrides [`TrackerConfig::data_dir`].
pub const DATA_DIR_ENV: &str = "AQUALOG_DATA_DIR";

/// File name of the flat key-value namespace inside `data_dir`.
pub const NAMESPACE_FILE: &str = "local-storage.json";

/// Where a [`Tracker`](crate::Tracker) keeps its state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Records and namespace on disk under `data_dir`.
    #[default]
    Directory,
    /// Nothing survives the process.
    Memory,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub data_dir: PathBuf,
    pub database_name: String,
    pub database_version: u32,
    pub backend: Backend,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".aqualog"),
            database_name: DATABASE_NAME.into(),
            database_version: DATABASE_VERSION,
            backend: Backend::Directory,
        }
    }
}

impl TrackerConfig {
    /// Defaults, or the TOML file at `path` if given, then the
    /// `AQUALOG_DATA_DIR` override.
    pub fn load(path: Option<&Path>) -> SdkResult<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    SdkError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        Ok(config.with_data_dir_override(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from)))
    }

    pub fn from_toml(text: &str) -> SdkResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        if config.database_name.trim().is_empty() {
            return Err(SdkError::Config("database_name must not be empty".into()));
        }
        if config.database_version == 0 {
            return Err(SdkError::Config("database_version must be at least 1".into()));
        }
        Ok(config)
    }

    /// Replace `data_dir` when `dir` is set and non-empty.
    pub fn with_data_dir_override(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) {
            self.data_dir = dir;
        }
        self
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory,
            ..Self::default()
        }
    }

    pub fn namespace_path(&self) -> PathBuf {
        self.data_dir.join(NAMESPACE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = TrackerConfig::default();
        assert_eq!(c.database_name, "aquariumDB");
        assert_eq!(c.database_version, 1);
        assert_eq!(c.backend, Backend::Directory);
        assert_eq!(c.namespace_path(), PathBuf::from(".aqualog/local-storage.json"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = TrackerConfig::from_toml("data_dir = \"/var/lib/aqualog\"\n").unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/var/lib/aqualog"));
        assert_eq!(c.database_name, "aquariumDB");
    }

    #[test]
    fn full_toml() {
        let text = r#"
            data_dir = "tanks"
            database_name = "reefDB"
            database_version = 2
            backend = "memory"
        "#;
        let c = TrackerConfig::from_toml(text).unwrap();
        assert_eq!(c.database_name, "reefDB");
        assert_eq!(c.database_version, 2);
        assert_eq!(c.backend, Backend::Memory);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            TrackerConfig::from_toml("backend = \"cloud\""),
            Err(SdkError::Config(_))
        ));
        assert!(matches!(
            TrackerConfig::from_toml("database_version = 0"),
            Err(SdkError::Config(_))
        ));
        assert!(matches!(
            TrackerConfig::from_toml("database_name = \" \""),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn data_dir_override() {
        let c = TrackerConfig::default().with_data_dir_override(Some("/tmp/x".into()));
        assert_eq!(c.data_dir, PathBuf::from("/tmp/x"));

        let c = TrackerConfig::default().with_data_dir_override(Some(PathBuf::new()));
        assert_eq!(c.data_dir, PathBuf::from(".aqualog"));

        let c = TrackerConfig::default().with_data_dir_override(None);
        assert_eq!(c.data_dir, PathBuf::from(".aqualog"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("aqualog.toml");
        std::fs::write(&path, "database_name = \"fromFile\"").unwrap();
        let c = TrackerConfig::load(Some(&path)).unwrap();
        assert_eq!(c.database_name, "fromFile");
    }

    #[test]
    fn load_missing_file_fails() {
        let err = TrackerConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }
}
