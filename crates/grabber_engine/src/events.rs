use std::sync::mpsc;

use grabber_logging::{grabber_info, grabber_warn};

use crate::{GrabEvent, VisitOutcome};

pub trait EventSink: Send + Sync {
    fn emit(&self, event: GrabEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<GrabEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<GrabEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: GrabEvent) {
        let _ = self.tx.send(event);
    }
}

/// Renders run progress as log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: GrabEvent) {
        match event {
            GrabEvent::RunStarted {
                depot_id,
                from,
                to,
                visits,
            } => grabber_info!(
                "Collecting changes for depot {} from build {} to {} ({} pages)",
                depot_id,
                from,
                to,
                visits
            ),
            GrabEvent::SelectionSwapped { from, to } => {
                grabber_info!("Selection reversed; using builds {} -> {}", from, to)
            }
            GrabEvent::VisitStarted { build_id, url } => {
                grabber_info!("Visiting build {} at {}", build_id, url)
            }
            GrabEvent::VisitFinished { build_id, outcome } => match outcome {
                VisitOutcome::TimedOut | VisitOutcome::Failed { .. } => {
                    grabber_warn!("Build {}: {}", build_id, outcome)
                }
                _ => grabber_info!("Build {}: {}", build_id, outcome),
            },
            GrabEvent::ExportWritten { path } => {
                grabber_info!("Wrote changes to {}", path.display())
            }
        }
    }
}
