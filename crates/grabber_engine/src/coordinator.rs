//! Drives a run: one patchnotes visit per intermediate build, strictly one at
//! a time, then a reload of the app page so the export fires there.

use std::path::PathBuf;
use std::sync::Arc;

use grabber_core::{
    app_url, patchnotes_url, BuildId, ChangeRequest, CoordinationState, DepotId, Effect, Msg,
};
use grabber_logging::{grabber_debug, grabber_error, grabber_info, grabber_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::browser::{Browser, HttpBrowser};
use crate::config::EngineConfig;
use crate::error::GrabError;
use crate::events::EventSink;
use crate::export::ChangesExporter;
use crate::extract::{extract_app_listing, AppListing};
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::state_store::StateStore;
use crate::store::{FileStore, KeyValueStore};
use crate::visit::{PageReport, PageRuntime};
use crate::wait::{poll_until, PollSettings};
use crate::{GrabEvent, VisitOutcome};

/// A depot and build range chosen on an app page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub app_id: String,
    pub depot_id: DepotId,
    pub build_from: BuildId,
    pub build_to: BuildId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// The range actually processed, after any swap.
    pub from: Option<BuildId>,
    pub to: Option<BuildId>,
    pub swapped: bool,
    pub visits: Vec<(BuildId, VisitOutcome)>,
    pub export_path: Option<PathBuf>,
}

pub struct Coordinator {
    runtime: PageRuntime,
    base_url: Url,
    poll: PollSettings,
    cancel: CancellationToken,
}

impl Coordinator {
    pub fn new(runtime: PageRuntime, base_url: Url, poll: PollSettings) -> Self {
        Self {
            runtime,
            base_url,
            poll,
            cancel: CancellationToken::new(),
        }
    }

    /// Wire the HTTP browser, the file-backed store and the exporter from `config`.
    pub fn from_config(config: &EngineConfig, sink: Arc<dyn EventSink>) -> Result<Self, GrabError> {
        let base_url = config.base_url()?;
        let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.state_path.clone()));
        let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(config.fetch.clone()));
        let browser: Arc<dyn Browser> =
            Arc::new(HttpBrowser::new(fetcher, config.mutation_refresh));
        let runtime = PageRuntime::new(
            StateStore::new(kv),
            browser,
            sink,
            ChangesExporter::new(config.output_dir.clone()),
            config.extraction_timeout,
        );
        Ok(Self::new(runtime, base_url, config.visit_poll()))
    }

    /// Cancelling stops the current wait and any visit still running.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &StateStore {
        self.runtime.store()
    }

    pub fn state(&self) -> Result<CoordinationState, GrabError> {
        Ok(self.runtime.store().load()?)
    }

    pub fn reset(&self) -> Result<(), GrabError> {
        self.runtime.store().reset()?;
        grabber_info!("Cleared all stored state");
        Ok(())
    }

    /// Build listing of an app page, most recent first.
    pub async fn builds(&self, app_id: &str) -> Result<AppListing, GrabError> {
        let origin = self.origin(app_id)?;
        self.listing(&origin).await
    }

    /// Load the app page as a fresh page load would. Writes the changes file
    /// if a finished run is waiting for export.
    pub async fn resume(&self, app_id: &str) -> Result<Option<PathBuf>, GrabError> {
        let origin = self.origin(app_id)?;
        let report = self.runtime.load(origin.as_str()).await?;
        Ok(report.export_path)
    }

    pub async fn run(&self, request: RunRequest) -> Result<RunSummary, GrabError> {
        let origin = self.origin(&request.app_id)?;
        let listing = self.listing(&origin).await?;
        if listing.builds.is_empty() {
            return Err(GrabError::NoBuilds {
                url: origin.to_string(),
            });
        }

        let effects = self
            .runtime
            .store()
            .apply(Msg::ChangesRequested(ChangeRequest {
                app: listing.app.clone(),
                depot_id: request.depot_id.clone(),
                build_from: request.build_from.clone(),
                build_to: request.build_to.clone(),
                listing: listing.builds.clone(),
            }))?;

        let mut summary = RunSummary::default();
        for effect in effects {
            match effect {
                Effect::RejectRequest(err) => return Err(err.into()),
                Effect::SelectionSwapped { from, to } => {
                    summary.swapped = true;
                    self.runtime
                        .sink()
                        .emit(GrabEvent::SelectionSwapped { from, to });
                }
                Effect::BeginVisits { depot_id, builds } => {
                    let state = self.runtime.store().load()?;
                    if let Some(aggregate) = &state.aggregate {
                        summary.from = Some(aggregate.initial_build.clone());
                        summary.to = Some(aggregate.final_build.clone());
                        self.runtime.sink().emit(GrabEvent::RunStarted {
                            depot_id,
                            from: aggregate.initial_build.clone(),
                            to: aggregate.final_build.clone(),
                            visits: builds.len(),
                        });
                    }
                    summary.visits = self.visit_all(&listing, &builds).await?;
                    summary.export_path = self.finish(&origin).await?;
                }
                other => grabber_debug!("Coordinator ignoring {:?}", other),
            }
        }
        Ok(summary)
    }

    async fn visit_all(
        &self,
        listing: &AppListing,
        builds: &[BuildId],
    ) -> Result<Vec<(BuildId, VisitOutcome)>, GrabError> {
        let visits = self.cancel.child_token();
        let mut handles = Vec::with_capacity(builds.len());
        if let Err(err) = self.queue_visits(listing, builds, &visits, &mut handles).await {
            // Spawned visits stop here and still release the guard.
            visits.cancel();
            return Err(err);
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (build, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(report)) => report.outcome.unwrap_or(VisitOutcome::Idle),
                Ok(Err(err)) => VisitOutcome::Failed {
                    message: err.to_string(),
                },
                Err(join) => VisitOutcome::Failed {
                    message: join.to_string(),
                },
            };
            outcomes.push((build, outcome));
        }
        Ok(outcomes)
    }

    async fn queue_visits(
        &self,
        listing: &AppListing,
        builds: &[BuildId],
        visits: &CancellationToken,
        handles: &mut Vec<(BuildId, JoinHandle<Result<PageReport, GrabError>>)>,
    ) -> Result<(), GrabError> {
        for build in builds {
            self.wait_for_idle().await?;
            self.runtime.store().apply(Msg::VisitOpened)?;

            let url = match listing.patchnotes_link(build) {
                Some(link) => link.to_string(),
                None => match patchnotes_url(&self.base_url, build) {
                    Some(url) => url.to_string(),
                    None => {
                        self.runtime.store().apply(Msg::VisitClosed)?;
                        return Err(GrabError::InvalidUrl(format!("patchnotes/{build}/")));
                    }
                },
            };
            self.runtime.sink().emit(GrabEvent::VisitStarted {
                build_id: build.clone(),
                url: url.clone(),
            });
            handles.push((build.clone(), self.spawn_visit(url, visits.clone())));
        }
        self.wait_for_idle().await
    }

    /// Run one visit in its own task. The visit guard is released whatever
    /// the outcome, so the queue always advances.
    fn spawn_visit(
        &self,
        url: String,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<PageReport, GrabError>> {
        let runtime = self.runtime.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                result = runtime.load(&url) => result,
                _ = cancel.cancelled() => Err(GrabError::Cancelled),
            };
            if let Err(err) = &result {
                grabber_warn!("Visit to {} failed: {}", url, err);
            }
            if let Err(err) = runtime.store().apply(Msg::VisitClosed) {
                grabber_error!("Could not release visit guard: {}", err);
            }
            result
        })
    }

    async fn finish(&self, origin: &Url) -> Result<Option<PathBuf>, GrabError> {
        let mut export_path = None;
        for effect in self.runtime.store().apply(Msg::AllVisitsClosed)? {
            if let Effect::ReloadOrigin = effect {
                let report = self.runtime.load(origin.as_str()).await?;
                export_path = report.export_path.or(export_path);
            }
        }
        Ok(export_path)
    }

    async fn wait_for_idle(&self) -> Result<(), GrabError> {
        let store = self.runtime.store();
        poll_until(self.poll, &self.cancel, || {
            store.visit_in_flight().map(|busy| !busy)
        })
        .await?;
        Ok(())
    }

    async fn listing(&self, origin: &Url) -> Result<AppListing, GrabError> {
        let mut page = self.runtime.browser().open(origin.as_str()).await?;
        let page_url = Url::parse(page.url()).unwrap_or_else(|_| origin.clone());
        let listing = extract_app_listing(page.html(), &page_url);
        page.close().await;
        grabber_debug!("{} lists {} builds", origin, listing.builds.len());
        Ok(listing)
    }

    fn origin(&self, app_id: &str) -> Result<Url, GrabError> {
        let app_id = app_id.trim();
        if app_id.is_empty() {
            return Err(GrabError::InvalidUrl("empty app id".to_string()));
        }
        app_url(&self.base_url, app_id).ok_or_else(|| GrabError::InvalidUrl(format!("app/{app_id}")))
    }
}
