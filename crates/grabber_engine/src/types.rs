use std::fmt;
use std::path::PathBuf;

use grabber_core::{BuildId, DepotId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// How one patchnotes visit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitOutcome {
    /// The versions list was found; `entries` rows were merged.
    Extracted { entries: usize },
    /// The depot is not listed on this build's page.
    DepotMissing,
    /// The versions list never rendered before the deadline.
    TimedOut,
    /// The page could not be watched any further.
    Failed { message: String },
    /// No run was waiting on this page.
    Idle,
}

impl fmt::Display for VisitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitOutcome::Extracted { entries } => write!(f, "extracted {entries} entries"),
            VisitOutcome::DepotMissing => write!(f, "depot not listed"),
            VisitOutcome::TimedOut => write!(f, "timed out waiting for versions list"),
            VisitOutcome::Failed { message } => write!(f, "failed: {message}"),
            VisitOutcome::Idle => write!(f, "nothing to do"),
        }
    }
}

/// Run progress reported to an [`crate::EventSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrabEvent {
    RunStarted {
        depot_id: DepotId,
        from: BuildId,
        to: BuildId,
        visits: usize,
    },
    SelectionSwapped {
        from: BuildId,
        to: BuildId,
    },
    VisitStarted {
        build_id: BuildId,
        url: String,
    },
    VisitFinished {
        build_id: BuildId,
        outcome: VisitOutcome,
    },
    ExportWritten {
        path: PathBuf,
    },
}
