use crate::{AppInfo, BuildId, DepotId, DiffEntry, PageKind};

/// A depot + build range selection made on an app page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRequest {
    pub app: AppInfo,
    pub depot_id: DepotId,
    pub build_from: BuildId,
    pub build_to: BuildId,
    /// The app page's build listing, most recent first.
    pub listing: Vec<BuildId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A page finished loading; the state machine decides what this page does.
    PageLoaded(PageKind),
    /// User submitted the changes form.
    ChangesRequested(ChangeRequest),
    /// User clicked Reset.
    ResetClicked,
    /// The coordinator opened a patchnotes visit.
    VisitOpened,
    /// A patchnotes visit page closed.
    VisitClosed,
    /// The coordinator saw the last visit close.
    AllVisitsClosed,
    /// The depot anchor was found on a patchnotes page.
    DepotAnchorFound { manifest_id: Option<String> },
    /// The depot's versions list was extracted on a patchnotes page.
    DiffExtracted { entries: Vec<DiffEntry> },
    /// The depot is not listed on this build's patchnotes page.
    DepotMissing,
    /// The versions list never rendered before the extraction deadline.
    ExtractionTimedOut,
    /// The patchnotes page could not be loaded or watched.
    PageFailed,
    /// The changes file was written.
    ExportWritten,
}
