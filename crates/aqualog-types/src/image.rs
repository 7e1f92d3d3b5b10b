use serde::{Deserialize, Serialize};

use crate::error::TypeResult;
use crate::id::{ContainerId, RecordId};
use crate::temporal::{today, validate_date};

/// One photograph of a container at a point in time.
///
/// `url` is either an inline `data:` payload or a remote reference handed
/// back by an upload integration; the store never interprets it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: RecordId,
    #[serde(alias = "aquariumId")]
    pub container_id: ContainerId,
    pub url: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "analysis")]
    pub analysis_flag: bool,
}

impl ImageRecord {
    /// Apply an edit in place. Fields left as `None` keep their value.
    pub fn apply(&mut self, edit: ImageEdit) -> TypeResult<()> {
        if let Some(date) = edit.date {
            validate_date(&date)?;
            self.date = date;
        }
        if let Some(title) = edit.title {
            self.title = if title.is_empty() { None } else { Some(title) };
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        if let Some(flag) = edit.analysis_flag {
            self.analysis_flag = flag;
        }
        Ok(())
    }
}

/// What an upload hands to the storage layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDraft {
    pub container_id: ContainerId,
    pub url: String,
    /// Defaults to today when absent.
    pub date: Option<String>,
    pub description: String,
}

impl ImageDraft {
    pub fn new(container_id: ContainerId, url: impl Into<String>) -> Self {
        Self {
            container_id,
            url: url.into(),
            date: None,
            description: String::new(),
        }
    }

    /// Turn the draft into a record with a freshly minted id.
    pub fn into_record(self) -> TypeResult<ImageRecord> {
        let date = match self.date {
            Some(date) => {
                validate_date(&date)?;
                date
            }
            None => today(),
        };
        Ok(ImageRecord {
            id: RecordId::generate(),
            container_id: self.container_id,
            url: self.url,
            date,
            title: None,
            description: self.description,
            analysis_flag: false,
        })
    }
}

/// A partial update to an [`ImageRecord`].
///
/// An empty `title` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub analysis_flag: Option<bool>,
}
