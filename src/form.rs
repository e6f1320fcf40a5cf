//! Form fields discovered at runtime, one step at a time.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Semantic kind of a form field; the resolver dispatches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    ShortText,
    LongText,
    SingleSelect,
    MultiSelect,
    Boolean,
    FileUpload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    /// Key used for profile lookup, e.g. `phone` or `years_experience`.
    pub name: String,
    pub kind: FieldKind,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    /// Allowed option labels, in display order. Only used by selects.
    #[serde(default)]
    pub options: Vec<String>,
}

impl FormField {
    /// Long-text field asking for a cover letter.
    pub fn is_cover_letter(&self) -> bool {
        if self.kind != FieldKind::LongText {
            return false;
        }
        let name = self.name.to_lowercase().replace(['-', ' '], "_");
        name.contains("cover_letter")
            || name.contains("coverletter")
            || self.label.to_lowercase().contains("cover letter")
    }
}

/// One screen of the quick-apply flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormStep {
    #[serde(default)]
    pub fields: Vec<FormField>,
    /// The review/submit step.
    #[serde(default)]
    pub is_final: bool,
}

impl FormStep {
    pub fn required_count(&self) -> usize {
        self.fields.iter().filter(|f| f.required).count()
    }
}

/// A value ready to be written into a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Choice(String),
    Choices(Vec<String>),
    Bool(bool),
    File(PathBuf),
    /// Explicitly accepted as empty.
    Empty,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => write!(f, "{text}"),
            FieldValue::Choice(choice) => write!(f, "{choice}"),
            FieldValue::Choices(choices) => write!(f, "{}", choices.join(", ")),
            FieldValue::Bool(true) => write!(f, "Yes"),
            FieldValue::Bool(false) => write!(f, "No"),
            FieldValue::File(path) => write!(f, "{}", path.display()),
            FieldValue::Empty => Ok(()),
        }
    }
}
