use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::id::ContainerId;
use crate::temporal::now_timestamp;

/// Display options for a container.
///
/// Missing settings decode with every section off; containers created
/// through [`Container::create`] start with the temperature section shown.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSettings {
    #[serde(default, alias = "showTemperature")]
    pub show_temperature_section: bool,
}

/// A tracked aquarium, terrarium, or other ecosystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub settings: ContainerSettings,
}

impl Container {
    /// Build a new container with a fresh id and creation timestamp.
    ///
    /// The name is trimmed and must not be empty. An empty description is
    /// dropped.
    pub fn create(name: &str, description: Option<&str>) -> TypeResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TypeError::EmptyName);
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        Ok(Self {
            id: ContainerId::generate(),
            name: name.to_string(),
            description,
            created_at: now_timestamp(),
            settings: ContainerSettings {
                show_temperature_section: true,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_trims_name_and_enables_temperature() {
        let c = Container::create("  Reef 60L ", Some("")).unwrap();
        assert_eq!(c.name, "Reef 60L");
        assert!(c.description.is_none());
        assert!(c.settings.show_temperature_section);
    }

    #[test]
    fn blank_name_is_rejected() {
        assert_eq!(Container::create("   ", None), Err(TypeError::EmptyName));
    }

    #[test]
    fn legacy_settings_key_is_accepted() {
        let raw = r#"{"id":"a","name":"n","createdAt":"2024-01-01T00:00:00.000Z","settings":{"showTemperature":true}}"#;
        let c: Container = serde_json::from_str(raw).unwrap();
        assert!(c.settings.show_temperature_section);
    }

    #[test]
    fn missing_settings_default_off() {
        let raw = r#"{"id":"a","name":"n","createdAt":"x"}"#;
        let c: Container = serde_json::from_str(raw).unwrap();
        assert_eq!(c.settings, ContainerSettings::default());
    }

    #[test]
    fn serializes_camel_case() {
        let c = Container::create("Tank", Some("planted")).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["settings"]["showTemperatureSection"], true);
        assert_eq!(json["description"], "planted");
    }
}
