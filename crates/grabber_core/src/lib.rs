//! Grabber core: changelist aggregation state machine and its data model.
mod changes;
mod effect;
mod msg;
mod page;
mod range;
mod state;
mod types;
mod update;

pub use changes::{merge, ChangeSet};
pub use effect::Effect;
pub use msg::{ChangeRequest, Msg};
pub use page::{app_url, classify_url, patchnotes_url, PageKind};
pub use range::{intermediary_builds, normalize_range, BuildRange, ValidationError};
pub use state::{
    CoordinationState, ALL_KEYS, CHANGES_KEY, DEPOT_KEY, MANIFEST_KEY, READY_TO_EXPORT_KEY,
    VISIT_IN_FLIGHT_KEY,
};
pub use types::{AppInfo, BuildId, Classification, DepotId, DiffEntry};
pub use update::update;
