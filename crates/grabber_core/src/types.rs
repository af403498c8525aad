use std::fmt;

use serde::{Deserialize, Serialize};

/// Build identifier as listed on an app page (a numeric string).
///
/// Builds are ordered by their position in the page listing, never by
/// comparing the strings themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(String);

impl BuildId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BuildId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepotId(String);

impl DepotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DepotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DepotId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Visual diff marker of one row on a patchnotes page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Added,
    Removed,
    Modified,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Added => write!(f, "added"),
            Classification::Removed => write!(f, "removed"),
            Classification::Modified => write!(f, "modified"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffEntry {
    pub classification: Classification,
    pub path: String,
}

impl DiffEntry {
    pub fn new(classification: Classification, path: impl Into<String>) -> Self {
        Self {
            classification,
            path: path.into(),
        }
    }

    pub fn added(path: impl Into<String>) -> Self {
        Self::new(Classification::Added, path)
    }

    pub fn removed(path: impl Into<String>) -> Self {
        Self::new(Classification::Removed, path)
    }

    pub fn modified(path: impl Into<String>) -> Self {
        Self::new(Classification::Modified, path)
    }
}

/// App metadata captured from the app page title.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub app_id: String,
}
