use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("condition not met within {0:?}")]
    TimedOut(Duration),
    #[error("wait cancelled")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Re-check `condition` every `settings.interval` until it holds.
///
/// Checks once immediately. Gives up after `settings.timeout`, or as soon as
/// `cancel` fires.
pub async fn poll_until<F>(
    settings: PollSettings,
    cancel: &CancellationToken,
    mut condition: F,
) -> Result<(), WaitError>
where
    F: FnMut() -> Result<bool, StoreError>,
{
    let deadline = Instant::now() + settings.timeout;
    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        if condition()? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(WaitError::TimedOut(settings.timeout));
        }
        tokio::select! {
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }
}
