use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{AppInfo, BuildId, Classification, DepotId, DiffEntry};

/// Cumulative file changes for one depot across a build range.
///
/// Serializes to the flat record written to `<depot>_changes.json`.
/// `added`, `removed` and `modified` are pairwise disjoint after every
/// [`ChangeSet::apply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(rename = "name", default)]
    pub app_name: String,
    #[serde(rename = "app", default)]
    pub app_id: String,
    #[serde(rename = "depot")]
    pub depot_id: DepotId,
    pub initial_build: BuildId,
    pub final_build: BuildId,
    #[serde(default)]
    pub added: IndexSet<String>,
    #[serde(default)]
    pub removed: IndexSet<String>,
    #[serde(default)]
    pub modified: IndexSet<String>,
    /// Written as `""` while unknown; the key is always present.
    #[serde(rename = "manifest", default, with = "manifest_field")]
    pub manifest_id: Option<String>,
}

/// Unknown manifest is `""` on disk. `null`, `""` or a missing key read back as `None`.
mod manifest_field {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or_default())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|id| !id.trim().is_empty()))
    }
}

impl ChangeSet {
    pub fn new(app: &AppInfo, depot_id: DepotId, initial_build: BuildId, final_build: BuildId) -> Self {
        Self {
            app_name: app.name.clone(),
            app_id: app.app_id.clone(),
            depot_id,
            initial_build,
            final_build,
            added: IndexSet::new(),
            removed: IndexSet::new(),
            modified: IndexSet::new(),
            manifest_id: None,
        }
    }

    /// Reclassify one path. Order matters: a later entry overrides an earlier
    /// one, except that `Modified` never demotes a path that is `Added`.
    pub fn apply(&mut self, entry: &DiffEntry) {
        let path = entry.path.as_str();
        match entry.classification {
            Classification::Added => {
                self.removed.shift_remove(path);
                if !self.added.contains(path) {
                    self.added.insert(path.to_string());
                }
            }
            Classification::Removed => {
                self.added.shift_remove(path);
                self.modified.shift_remove(path);
                if !self.removed.contains(path) {
                    self.removed.insert(path.to_string());
                }
            }
            Classification::Modified => {
                if self.added.contains(path) || self.modified.contains(path) {
                    return;
                }
                self.removed.shift_remove(path);
                self.modified.insert(path.to_string());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn total_paths(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// The category a path currently sits in, if any.
    pub fn classification_of(&self, path: &str) -> Option<Classification> {
        if self.added.contains(path) {
            Some(Classification::Added)
        } else if self.removed.contains(path) {
            Some(Classification::Removed)
        } else if self.modified.contains(path) {
            Some(Classification::Modified)
        } else {
            None
        }
    }

    pub fn is_disjoint(&self) -> bool {
        self.added.is_disjoint(&self.removed)
            && self.added.is_disjoint(&self.modified)
            && self.removed.is_disjoint(&self.modified)
    }

    pub fn with_manifest(mut self, manifest_id: Option<String>) -> Self {
        self.manifest_id = manifest_id;
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse an exported changes record.
    ///
    /// A `manifest` that is missing or `null` loads as `None`.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Fold one build's entries into the aggregate, in extraction order.
pub fn merge(mut existing: ChangeSet, entries: &[DiffEntry]) -> ChangeSet {
    for entry in entries {
        existing.apply(entry);
    }
    existing
}
