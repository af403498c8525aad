use std::time::Duration;

use grabber_core::ValidationError;

use crate::config::ConfigError;
use crate::export::ExportError;
use crate::store::StoreError;
use crate::wait::WaitError;
use crate::FetchError;

/// Failure of a coordinator run or a single page load.
#[derive(Debug, thiserror::Error)]
pub enum GrabError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("page load failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("state store: {0}")]
    Store(#[from] StoreError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("no builds listed on {url}")]
    NoBuilds { url: String },
    #[error("visit did not close within {0:?}")]
    VisitStalled(Duration),
    #[error("run cancelled")]
    Cancelled,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<WaitError> for GrabError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::TimedOut(limit) => GrabError::VisitStalled(limit),
            WaitError::Cancelled => GrabError::Cancelled,
            WaitError::Store(err) => GrabError::Store(err),
        }
    }
}
