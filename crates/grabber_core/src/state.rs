use crate::{ChangeSet, DepotId};

/// Persistent key holding the serialized in-progress [`ChangeSet`].
pub const CHANGES_KEY: &str = "changesObject";
pub const DEPOT_KEY: &str = "depotID";
pub const MANIFEST_KEY: &str = "manifestID";
/// Mutual-exclusion guard: true while a patchnotes visit is open.
pub const VISIT_IN_FLIGHT_KEY: &str = "gettingChangelogs";
pub const READY_TO_EXPORT_KEY: &str = "readyToDownload";

/// Every key the grabber owns in the persistent store.
pub const ALL_KEYS: [&str; 5] = [
    CHANGES_KEY,
    DEPOT_KEY,
    MANIFEST_KEY,
    VISIT_IN_FLIGHT_KEY,
    READY_TO_EXPORT_KEY,
];

/// Navigation-durable coordination state. Each page load reads it, runs
/// [`crate::update`] and writes back whatever changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoordinationState {
    pub aggregate: Option<ChangeSet>,
    pub depot_id: Option<DepotId>,
    pub manifest_id: Option<String>,
    pub visit_in_flight: bool,
    pub ready_to_export: bool,
}

impl CoordinationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys whose values differ between `self` and `next`.
    pub fn changed_keys(&self, next: &CoordinationState) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.aggregate != next.aggregate {
            keys.push(CHANGES_KEY);
        }
        if self.depot_id != next.depot_id {
            keys.push(DEPOT_KEY);
        }
        if self.manifest_id != next.manifest_id {
            keys.push(MANIFEST_KEY);
        }
        if self.visit_in_flight != next.visit_in_flight {
            keys.push(VISIT_IN_FLIGHT_KEY);
        }
        if self.ready_to_export != next.ready_to_export {
            keys.push(READY_TO_EXPORT_KEY);
        }
        keys
    }
}
