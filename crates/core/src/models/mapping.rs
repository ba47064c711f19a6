//! Declarative directory-attribute to local-field mapping.

use serde::{Deserialize, Serialize};

/// How the values of a directory attribute become one local field value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueTransform {
    /// First value only.
    #[default]
    First,
    /// All values joined with the entry's separator.
    Join,
    Lowercase,
    Uppercase,
    Trim,
}

/// One mapping entry: copy `attribute` from the directory into `field`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldMapping {
    pub field: String,
    pub attribute: String,
    #[serde(default)]
    pub transform: ValueTransform,
    /// Separator for [`ValueTransform::Join`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

impl FieldMapping {
    pub fn new(field: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            attribute: attribute.into(),
            transform: ValueTransform::First,
            separator: None,
        }
    }

    pub fn with_transform(mut self, transform: ValueTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn separator(&self) -> &str {
        self.separator.as_deref().unwrap_or(", ")
    }
}

/// Attributes a search must request to fill the given mapping, deduplicated
/// case-insensitively, in first-seen order.
pub fn mapped_attributes(mapping: &[FieldMapping]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    mapping
        .iter()
        .filter(|m| seen.insert(m.attribute.to_ascii_lowercase()))
        .map(|m| m.attribute.clone())
        .collect()
}
