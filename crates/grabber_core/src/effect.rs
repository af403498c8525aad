use crate::{BuildId, ChangeSet, DepotId, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The form was rejected; nothing was stored.
    RejectRequest(ValidationError),
    /// The selection was reversed; reflect it back into the form fields.
    SelectionSwapped { from: BuildId, to: BuildId },
    /// Visit each build's patchnotes page, strictly one after another.
    BeginVisits { depot_id: DepotId, builds: Vec<BuildId> },
    /// Wait for the depot's versions list on the current page and extract it.
    ExtractDiff { depot_id: DepotId },
    /// Close the current page, ending its visit.
    ClosePage,
    /// Reload the app page the run was started from.
    ReloadOrigin,
    /// Write `<depot>_changes.json`.
    Export { changes: ChangeSet },
}
