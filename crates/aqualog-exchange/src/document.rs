//! The snapshot document: the whole local state as one JSON value.
//!
//! Current shape:
//!
//! ```json
//! { "images": [ImageRecord, ...], "containers": [Container, ...] }
//! ```
//!
//! On input, `containers` is also accepted under its older key `aquariums`
//! (when both are present `containers` wins), a missing or `null` array
//! counts as empty, and unknown fields are ignored. A bare JSON array is read
//! as the legacy image-only export. A container id listed twice keeps only
//! its last copy.

use std::collections::HashSet;

use aqualog_types::{Container, ImageRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{ImportError, ImportResult};

/// The export/import unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDocument {
    pub images: Vec<ImageRecord>,
    pub containers: Vec<Container>,
}

impl SnapshotDocument {
    pub fn new(images: Vec<ImageRecord>, containers: Vec<Container>) -> Self {
        Self { images, containers }
    }

    /// Compact JSON, as written to an export file.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Which input shape a document was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// `{ "images": [...], "containers": [...] }`
    Current,
    /// A bare array of images, with no container list.
    LegacyImageArray,
}

/// A validated document together with the shape it came in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedSnapshot {
    pub document: SnapshotDocument,
    pub format: SnapshotFormat,
}

impl ParsedSnapshot {
    /// Parse and validate an import file. Never touches storage.
    pub fn parse(input: &str) -> ImportResult<Self> {
        let value: Value = serde_json::from_str(input)
            .map_err(|e| ImportError::Malformed(format!("invalid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> ImportResult<Self> {
        let parsed = match value {
            Value::Array(_) => {
                let images: Vec<ImageRecord> = serde_json::from_value(value)
                    .map_err(|e| ImportError::Malformed(format!("legacy image array: {e}")))?;
                Self {
                    document: SnapshotDocument::new(images, Vec::new()),
                    format: SnapshotFormat::LegacyImageArray,
                }
            }
            Value::Object(_) => {
                let wire: WireSnapshot = serde_json::from_value(value)
                    .map_err(|e| ImportError::Malformed(e.to_string()))?;
                let containers = match (wire.containers, wire.aquariums) {
                    (Some(containers), Some(_)) => {
                        warn!("snapshot has both \"containers\" and \"aquariums\"; using \"containers\"");
                        containers
                    }
                    (Some(containers), None) | (None, Some(containers)) => containers,
                    (None, None) => Vec::new(),
                };
                let listed = containers.len();
                let containers = last_copy_of_each(containers);
                if containers.len() < listed {
                    warn!(
                        dupes = listed - containers.len(),
                        "snapshot repeats container ids; the last copy of each wins"
                    );
                }
                Self {
                    document: SnapshotDocument::new(
                        wire.images.unwrap_or_default(),
                        containers,
                    ),
                    format: SnapshotFormat::Current,
                }
            }
            other => {
                return Err(ImportError::Malformed(format!(
                    "expected an object or an array, got {}",
                    json_kind(&other)
                )))
            }
        };
        parsed.warn_on_duplicates();
        Ok(parsed)
    }

    /// Whether importing this document should replace the container list.
    pub fn replaces_containers(&self) -> bool {
        self.format == SnapshotFormat::Current
    }

    fn warn_on_duplicates(&self) {
        let mut seen = HashSet::new();
        let dupes = self
            .document
            .images
            .iter()
            .filter(|r| !seen.insert(&r.id))
            .count();
        if dupes > 0 {
            warn!(dupes, "snapshot repeats image ids; the last copy of each wins");
        }
    }
}

impl From<SnapshotDocument> for ParsedSnapshot {
    fn from(mut document: SnapshotDocument) -> Self {
        document.containers = last_copy_of_each(document.containers);
        Self {
            document,
            format: SnapshotFormat::Current,
        }
    }
}

#[derive(Deserialize)]
struct WireSnapshot {
    #[serde(default)]
    images: Option<Vec<ImageRecord>>,
    #[serde(default)]
    containers: Option<Vec<Container>>,
    #[serde(default)]
    aquariums: Option<Vec<Container>>,
}

/// Drop earlier copies of repeated container ids, keeping list order of the
/// survivors.
fn last_copy_of_each(containers: Vec<Container>) -> Vec<Container> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Container> = containers
        .into_iter()
        .rev()
        .filter(|c| seen.insert(c.id.clone()))
        .collect();
    kept.reverse();
    kept
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: &str = r#"{"id":"1","containerId":"tank1","date":"2024-01-01","description":"","url":"data:,x","title":""}"#;

    #[test]
    fn parses_current_shape() {
        let input = format!(
            r#"{{"images":[{IMAGE}],"containers":[{{"id":"tank1","name":"Reef","createdAt":"2024-01-01T00:00:00.000Z"}}]}}"#
        );
        let parsed = ParsedSnapshot::parse(&input).unwrap();
        assert_eq!(parsed.format, SnapshotFormat::Current);
        assert_eq!(parsed.document.images.len(), 1);
        assert_eq!(parsed.document.containers[0].name, "Reef");
        assert!(parsed.replaces_containers());
    }

    #[test]
    fn accepts_legacy_aquariums_key() {
        let input = r#"{"images":[],"aquariums":[{"id":"a","name":"A","createdAt":"x"}]}"#;
        let parsed = ParsedSnapshot::parse(input).unwrap();
        assert_eq!(parsed.document.containers.len(), 1);
    }

    #[test]
    fn missing_and_null_arrays_are_empty() {
        for input in [r#"{}"#, r#"{"images":null}"#, r#"{"containers":null,"extra":1}"#] {
            let parsed = ParsedSnapshot::parse(input).unwrap();
            assert_eq!(parsed.document, SnapshotDocument::default(), "{input}");
        }
    }

    #[test]
    fn bare_array_is_legacy_image_export() {
        let parsed = ParsedSnapshot::parse(&format!("[{IMAGE}]")).unwrap();
        assert_eq!(parsed.format, SnapshotFormat::LegacyImageArray);
        assert_eq!(parsed.document.images.len(), 1);
        assert!(!parsed.replaces_containers());
    }

    #[test]
    fn rejects_invalid_json() {
        let err = ParsedSnapshot::parse("not json").unwrap_err();
        assert!(matches!(err, ImportError::Malformed(_)));
    }

    #[test]
    fn rejects_scalar_documents() {
        for input in ["42", "\"images\"", "null", "true"] {
            assert!(
                matches!(ParsedSnapshot::parse(input), Err(ImportError::Malformed(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn rejects_non_array_images() {
        let err = ParsedSnapshot::parse(r#"{"images":"nope"}"#).unwrap_err();
        assert!(matches!(err, ImportError::Malformed(_)));
    }

    #[test]
    fn rejects_record_without_id() {
        let input = r#"{"images":[{"containerId":"t","url":"u","date":"d"}]}"#;
        assert!(matches!(
            ParsedSnapshot::parse(input),
            Err(ImportError::Malformed(_))
        ));
    }

    #[test]
    fn repeated_container_ids_keep_last_copy() {
        let input = r#"{"containers":[
            {"id":"X","name":"first","createdAt":"a"},
            {"id":"Y","name":"other","createdAt":"a"},
            {"id":"X","name":"second","createdAt":"b"}
        ]}"#;
        let parsed = ParsedSnapshot::parse(input).unwrap();
        let names: Vec<(&str, &str)> = parsed
            .document
            .containers
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();
        assert_eq!(names, [("Y", "other"), ("X", "second")]);
    }

    #[test]
    fn containers_key_wins_over_aquariums() {
        let input = r#"{
            "aquariums":[{"id":"old","name":"Old","createdAt":"a"}],
            "containers":[{"id":"new","name":"New","createdAt":"a"}]
        }"#;
        let parsed = ParsedSnapshot::parse(input).unwrap();
        assert_eq!(parsed.document.containers.len(), 1);
        assert_eq!(parsed.document.containers[0].id.as_str(), "new");
    }

    #[test]
    fn export_shape_has_both_fields() {
        let json = SnapshotDocument::default().to_json().unwrap();
        assert_eq!(json, r#"{"images":[],"containers":[]}"#);
    }

    #[test]
    fn exported_document_parses_back() {
        let parsed = ParsedSnapshot::parse(&format!(r#"{{"images":[{IMAGE}]}}"#)).unwrap();
        let again = ParsedSnapshot::parse(&parsed.document.to_json_pretty().unwrap()).unwrap();
        assert_eq!(again.document, parsed.document);
    }
}
