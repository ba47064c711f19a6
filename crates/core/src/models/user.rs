use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A user row in one of the local user tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LocalUser {
    pub uid: i64,
    /// Distinguished name of the directory entry this user was imported from.
    /// `None` for users that were never linked to a directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dn: Option<String>,
    /// Configuration that last imported this user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_uid: Option<u32>,
    pub disabled: bool,
    pub deleted: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl LocalUser {
    /// Value of a local field, empty when it was never set.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// Whether the record is backed by a directory entry.
    pub fn is_directory_linked(&self) -> bool {
        self.dn.as_deref().is_some_and(|dn| !dn.is_empty())
    }

    pub fn is_active(&self) -> bool {
        !self.disabled && !self.deleted
    }
}

/// A directory entry merged onto its local counterpart, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergedUser {
    /// Local uid when the user already exists, `None` when it must be created.
    pub uid: Option<i64>,
    pub dn: String,
    pub disabled: bool,
    pub deleted: bool,
    pub fields: BTreeMap<String, String>,
}

impl MergedUser {
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}
