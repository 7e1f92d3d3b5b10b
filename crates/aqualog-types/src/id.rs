use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Mint a fresh, time-ordered identifier (UUID v7).
            pub fn generate() -> Self {
                Self(uuid::Uuid::now_v7().to_string())
            }

            /// Wrap an existing identifier. Fails on the empty string.
            pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
                let raw = raw.into();
                if raw.is_empty() {
                    return Err(TypeError::EmptyId);
                }
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = TypeError;

            fn try_from(raw: &str) -> Result<Self, Self::Error> {
                Self::new(raw)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Primary key of an [`ImageRecord`](crate::ImageRecord).
    ///
    /// Opaque and immutable once created. Records imported from older
    /// exports carry short random strings; freshly minted ids are UUID v7.
    RecordId
);

opaque_id!(
    /// Identifier of a [`Container`](crate::Container).
    ContainerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = RecordId::generate();
        let b = RecordId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn empty_id_is_rejected() {
        assert_eq!(RecordId::new(""), Err(TypeError::EmptyId));
        assert_eq!(ContainerId::try_from(""), Err(TypeError::EmptyId));
    }

    #[test]
    fn legacy_short_ids_are_accepted() {
        let id = RecordId::new("k3j9x0a1b").unwrap();
        assert_eq!(id.as_str(), "k3j9x0a1b");
    }

    #[test]
    fn serializes_as_bare_string() {
        let id = ContainerId::new("tank1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tank1\"");
    }

    #[test]
    fn deserializing_empty_string_fails() {
        assert!(serde_json::from_str::<RecordId>("\"\"").is_err());
    }

    #[test]
    fn debug_names_the_kind() {
        let id = RecordId::new("1").unwrap();
        assert_eq!(format!("{id:?}"), "RecordId(1)");
    }
}
