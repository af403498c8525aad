//! One page lifetime: load, let the state machine decide, carry out its effects.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use grabber_core::{classify_url, DepotId, DiffEntry, Effect, Msg, PageKind};
use grabber_logging::{grabber_debug, grabber_trace, grabber_warn};

use crate::browser::{Browser, Page};
use crate::error::GrabError;
use crate::events::EventSink;
use crate::export::ChangesExporter;
use crate::extract::{inspect_patchnotes, DiffSection};
use crate::state_store::StateStore;
use crate::{FetchError, GrabEvent, VisitOutcome};

/// What a single page load did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub kind: PageKind,
    /// Set for patchnotes pages.
    pub outcome: Option<VisitOutcome>,
    /// Set when this load wrote the changes file.
    pub export_path: Option<PathBuf>,
}

/// Runs the state machine against pages as they load.
#[derive(Clone)]
pub struct PageRuntime {
    store: StateStore,
    browser: Arc<dyn Browser>,
    sink: Arc<dyn EventSink>,
    exporter: ChangesExporter,
    extraction_timeout: Duration,
}

impl PageRuntime {
    pub fn new(
        store: StateStore,
        browser: Arc<dyn Browser>,
        sink: Arc<dyn EventSink>,
        exporter: ChangesExporter,
        extraction_timeout: Duration,
    ) -> Self {
        Self {
            store,
            browser,
            sink,
            exporter,
            extraction_timeout,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn browser(&self) -> &Arc<dyn Browser> {
        &self.browser
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    pub async fn load(&self, url: &str) -> Result<PageReport, GrabError> {
        let mut page = self.browser.open(url).await?;
        let kind = classify_url(page.url());
        grabber_debug!("Loaded {} as {:?}", page.url(), kind);

        let mut report = PageReport {
            kind: kind.clone(),
            outcome: None,
            export_path: None,
        };
        let result = self.run_effects(page.as_mut(), &mut report).await;
        page.close().await;

        if let PageKind::Patchnotes { build_id } = &kind {
            let outcome = match &result {
                Ok(()) => report.outcome.clone().unwrap_or(VisitOutcome::Idle),
                Err(err) => VisitOutcome::Failed {
                    message: err.to_string(),
                },
            };
            report.outcome = Some(outcome.clone());
            self.sink.emit(GrabEvent::VisitFinished {
                build_id: build_id.clone(),
                outcome,
            });
        }
        result.map(|()| report)
    }

    async fn run_effects(
        &self,
        page: &mut dyn Page,
        report: &mut PageReport,
    ) -> Result<(), GrabError> {
        let mut queue: VecDeque<Effect> =
            self.store.apply(Msg::PageLoaded(report.kind.clone()))?.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::ExtractDiff { depot_id } => {
                    let (msgs, outcome) = self.extract_diff(page, &depot_id).await;
                    report.outcome = Some(outcome);
                    for msg in msgs {
                        queue.extend(self.store.apply(msg)?);
                    }
                }
                Effect::ClosePage => {
                    grabber_trace!("Closing {}", page.url());
                }
                Effect::Export { changes } => {
                    let path = self.exporter.write(&changes)?;
                    self.sink.emit(GrabEvent::ExportWritten { path: path.clone() });
                    report.export_path = Some(path);
                    queue.extend(self.store.apply(Msg::ExportWritten)?);
                }
                other => {
                    grabber_warn!("Ignoring {:?} on page {}", other, page.url());
                }
            }
        }
        Ok(())
    }

    /// Find the depot's versions list and turn it into messages.
    ///
    /// Checks the current snapshot first, then watches for changes until the
    /// list renders or `extraction_timeout` expires.
    async fn extract_diff(
        &self,
        page: &mut dyn Page,
        depot_id: &DepotId,
    ) -> (Vec<Msg>, VisitOutcome) {
        let anchor = match inspect_patchnotes(page.html(), depot_id) {
            DiffSection::DepotMissing => {
                return (vec![Msg::DepotMissing], VisitOutcome::DepotMissing);
            }
            DiffSection::Ready { anchor, entries } => {
                return ready(anchor.manifest_id, entries);
            }
            DiffSection::Pending { anchor } => anchor,
        };

        let watch = async {
            loop {
                page.changed().await?;
                if let DiffSection::Ready { anchor, entries } =
                    inspect_patchnotes(page.html(), depot_id)
                {
                    return Ok::<_, FetchError>((anchor.manifest_id, entries));
                }
            }
        };

        match tokio::time::timeout(self.extraction_timeout, watch).await {
            Ok(Ok((manifest_id, entries))) => ready(manifest_id.or(anchor.manifest_id), entries),
            Ok(Err(err)) => {
                grabber_warn!("Stopped watching {}: {}", page.url(), err);
                (
                    vec![
                        Msg::DepotAnchorFound {
                            manifest_id: anchor.manifest_id,
                        },
                        Msg::PageFailed,
                    ],
                    VisitOutcome::Failed {
                        message: err.to_string(),
                    },
                )
            }
            Err(_) => (
                vec![
                    Msg::DepotAnchorFound {
                        manifest_id: anchor.manifest_id,
                    },
                    Msg::ExtractionTimedOut,
                ],
                VisitOutcome::TimedOut,
            ),
        }
    }
}

fn ready(manifest_id: Option<String>, entries: Vec<DiffEntry>) -> (Vec<Msg>, VisitOutcome) {
    let outcome = VisitOutcome::Extracted {
        entries: entries.len(),
    };
    (
        vec![
            Msg::DepotAnchorFound { manifest_id },
            Msg::DiffExtracted { entries },
        ],
        outcome,
    )
}
