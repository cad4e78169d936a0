//! Task model definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, Fields};
use crate::Result;

/// Field name of the task title in the stored document
pub const TITLE_FIELD: &str = "title";
/// Field name of the completion flag in the stored document
pub const COMPLETED_FIELD: &str = "completed";

/// A task as rendered locally, projected from one remote document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-assigned document identifier
    pub id: String,
    pub title: String,
    pub completed: bool,
}

impl Task {
    /// Project a stored document into a task: `{id: document id, ...fields}`
    pub fn from_document(document: &Document) -> Result<Self> {
        let fields: TaskFields = serde_json::from_value(Value::Object(document.fields.clone()))?;
        Ok(Self {
            id: document.id.clone(),
            title: fields.title,
            completed: fields.completed,
        })
    }
}

/// Application fields stored in a task document
///
/// The identifier is not a field; the store addresses it separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl TaskFields {
    /// Fields for a freshly created task
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
        }
    }

    /// Convert into the raw document field set
    pub fn into_fields(self) -> Fields {
        let mut fields = Fields::new();
        fields.insert(TITLE_FIELD.to_string(), Value::String(self.title));
        fields.insert(COMPLETED_FIELD.to_string(), Value::Bool(self.completed));
        fields
    }

    /// Partial update flipping the completion flag
    pub fn toggle_patch(current_completed: bool) -> Fields {
        let mut fields = Fields::new();
        fields.insert(
            COMPLETED_FIELD.to_string(),
            Value::Bool(!current_completed),
        );
        fields
    }
}
