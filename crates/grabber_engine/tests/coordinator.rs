use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use grabber_core::{BuildId, DepotId, Msg, ValidationError};
use grabber_engine::{
    load_changes, Browser, ChangesExporter, ChannelEventSink, Coordinator, FailureKind,
    FetchError, GrabError, GrabEvent, MemoryStore, Page, PageRuntime, PollSettings, RunRequest,
    StateStore, VisitOutcome,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use url::Url;

const BASE: &str = "http://grabber.test/";
const APP_URL: &str = "http://grabber.test/app/10/patchnotes/";

const APP_PAGE: &str = r#"
<h1><a href="/app/10/" data-appid="10">Test Game</a></h1>
<table id="js-builds">
  <tr><td><a href="/patchnotes/3/">notes</a></td><td>3</td></tr>
  <tr><td><a href="/patchnotes/2/">notes</a></td><td>2</td></tr>
  <tr><td><a href="/patchnotes/1/">notes</a></td><td>1</td></tr>
</table>
"#;

fn patchnotes(depot_block: &str) -> String {
    format!("<html><body><h2>Depots</h2>{depot_block}</body></html>")
}

fn depot_101(manifest: &str, rows: &str) -> String {
    patchnotes(&format!(
        r#"<div><a href="/depot/101/history/?changeid=M:{manifest}">101</a></div><ul>{rows}</ul>"#
    ))
}

fn patchnotes_url(build: &str) -> String {
    format!("{BASE}patchnotes/{build}/")
}

/// Serves canned pages. Each URL has an initial snapshot plus the snapshots
/// `changed()` moves through; once they run out the page never changes again.
#[derive(Clone, Default)]
struct ScriptedBrowser {
    pages: Arc<Mutex<HashMap<String, Vec<String>>>>,
    opened: Arc<Mutex<Vec<String>>>,
    open_now: Arc<AtomicUsize>,
    max_open: Arc<AtomicUsize>,
}

impl ScriptedBrowser {
    fn with_page(self, url: &str, snapshots: Vec<String>) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), snapshots);
        self
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Browser for ScriptedBrowser {
    async fn open(&self, url: &str) -> Result<Box<dyn Page>, FetchError> {
        self.opened.lock().unwrap().push(url.to_string());
        let snapshots = self.pages.lock().unwrap().get(url).cloned();
        let mut snapshots: VecDeque<String> = match snapshots {
            Some(snapshots) => snapshots.into(),
            None => {
                return Err(FetchError {
                    kind: FailureKind::HttpStatus(404),
                    message: "404 Not Found".to_string(),
                })
            }
        };
        let current = snapshots.pop_front().unwrap_or_default();
        let open = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(ScriptedPage {
            url: url.to_string(),
            current,
            snapshots,
            open_now: self.open_now.clone(),
        }))
    }
}

struct ScriptedPage {
    url: String,
    current: String,
    snapshots: VecDeque<String>,
    open_now: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Page for ScriptedPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn html(&self) -> &str {
        &self.current
    }

    async fn changed(&mut self) -> Result<(), FetchError> {
        match self.snapshots.pop_front() {
            Some(next) => {
                tokio::time::sleep(Duration::from_millis(10)).await;
                self.current = next;
                Ok(())
            }
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Harness {
    coordinator: Coordinator,
    browser: ScriptedBrowser,
    events: mpsc::Receiver<GrabEvent>,
    _out: TempDir,
    out_dir: std::path::PathBuf,
}

fn harness(browser: ScriptedBrowser) -> Harness {
    let poll = PollSettings {
        interval: Duration::from_millis(5),
        timeout: Duration::from_secs(5),
    };
    harness_with(browser, Duration::from_millis(150), poll)
}

fn harness_with(
    browser: ScriptedBrowser,
    extraction_timeout: Duration,
    poll: PollSettings,
) -> Harness {
    grabber_logging::initialize_for_tests();
    let out = TempDir::new().unwrap();
    let out_dir = out.path().join("exports");
    let (tx, events) = mpsc::channel();
    let runtime = PageRuntime::new(
        StateStore::new(Arc::new(MemoryStore::new())),
        Arc::new(browser.clone()),
        Arc::new(ChannelEventSink::new(tx)),
        ChangesExporter::new(out_dir.clone()),
        extraction_timeout,
    );
    Harness {
        coordinator: Coordinator::new(runtime, Url::parse(BASE).unwrap(), poll),
        browser,
        events,
        _out: out,
        out_dir,
    }
}

fn standard_browser() -> ScriptedBrowser {
    ScriptedBrowser::default()
        .with_page(APP_URL, vec![APP_PAGE.to_string()])
        .with_page(
            &patchnotes_url("2"),
            vec![
                // Versions list renders only after the first change.
                depot_101("222", ""),
                depot_101(
                    "222",
                    r#"<li class="versions">2</li><li class="diff-added"><ins>a.txt</ins></li>"#,
                ),
            ],
        )
        .with_page(
            &patchnotes_url("3"),
            vec![depot_101(
                "333",
                r#"<li class="versions">3</li>
                   <li class="diff-removed"><del>a.txt</del></li>
                   <li class="diff-modified"><i>b.txt</i></li>"#,
            )],
        )
}

fn request(from: &str, to: &str) -> RunRequest {
    RunRequest {
        app_id: "10".to_string(),
        depot_id: DepotId::new("101"),
        build_from: BuildId::new(from),
        build_to: BuildId::new(to),
    }
}

fn paths(set: &indexmap::IndexSet<String>) -> Vec<&str> {
    set.iter().map(String::as_str).collect()
}

fn exported(path: &Path) -> grabber_core::ChangeSet {
    load_changes(path).unwrap()
}

#[tokio::test]
async fn run_visits_each_build_in_order_and_exports_once() {
    let h = harness(standard_browser());

    let summary = h.coordinator.run(request("1", "3")).await.unwrap();

    assert_eq!(summary.from, Some(BuildId::new("1")));
    assert_eq!(summary.to, Some(BuildId::new("3")));
    assert!(!summary.swapped);
    assert_eq!(
        summary.visits,
        vec![
            (BuildId::new("2"), VisitOutcome::Extracted { entries: 1 }),
            (BuildId::new("3"), VisitOutcome::Extracted { entries: 2 }),
        ]
    );

    let path = summary.export_path.expect("export written");
    assert_eq!(path, h.out_dir.join("101_changes.json"));
    let changes = exported(&path);
    assert_eq!(paths(&changes.added), Vec::<&str>::new());
    assert_eq!(paths(&changes.removed), vec!["a.txt"]);
    assert_eq!(paths(&changes.modified), vec!["b.txt"]);
    assert_eq!(changes.app_name, "Test Game");
    assert_eq!(changes.app_id, "10");
    // Manifest comes from the first visited page.
    assert_eq!(changes.manifest_id.as_deref(), Some("222"));

    assert_eq!(
        h.browser.opened(),
        vec![
            APP_URL.to_string(),
            patchnotes_url("2"),
            patchnotes_url("3"),
            APP_URL.to_string(),
        ]
    );
    assert_eq!(h.browser.max_open.load(Ordering::SeqCst), 1);

    let state = h.coordinator.state().unwrap();
    assert!(!state.visit_in_flight);
    assert!(!state.ready_to_export);

    let exports = h
        .events
        .try_iter()
        .filter(|event| matches!(event, GrabEvent::ExportWritten { .. }))
        .count();
    assert_eq!(exports, 1);
}

#[tokio::test]
async fn reversed_selection_is_swapped_before_visiting() {
    let h = harness(standard_browser());

    let summary = h.coordinator.run(request("3", "1")).await.unwrap();

    assert!(summary.swapped);
    assert_eq!(summary.from, Some(BuildId::new("1")));
    assert_eq!(summary.to, Some(BuildId::new("3")));
    let changes = exported(&summary.export_path.unwrap());
    assert_eq!(paths(&changes.removed), vec!["a.txt"]);

    let swapped = h.events.try_iter().any(|event| {
        event
            == GrabEvent::SelectionSwapped {
                from: BuildId::new("1"),
                to: BuildId::new("3"),
            }
    });
    assert!(swapped);
}

#[tokio::test]
async fn build_without_the_depot_counts_as_no_changes() {
    let browser = standard_browser().with_page(
        &patchnotes_url("2"),
        vec![patchnotes(r#"<div><a href="/depot/555/">555</a></div><ul></ul>"#)],
    );
    let h = harness(browser);

    let summary = h.coordinator.run(request("1", "3")).await.unwrap();

    assert_eq!(summary.visits[0], (BuildId::new("2"), VisitOutcome::DepotMissing));
    let changes = exported(&summary.export_path.unwrap());
    assert_eq!(paths(&changes.removed), vec!["a.txt"]);
    assert_eq!(changes.manifest_id.as_deref(), Some("333"));
}

#[tokio::test]
async fn versions_list_that_never_renders_times_out_and_the_run_continues() {
    let browser = standard_browser().with_page(&patchnotes_url("2"), vec![depot_101("222", "")]);
    let h = harness(browser);

    let summary = h.coordinator.run(request("1", "3")).await.unwrap();

    assert_eq!(summary.visits[0], (BuildId::new("2"), VisitOutcome::TimedOut));
    assert_eq!(
        summary.visits[1],
        (BuildId::new("3"), VisitOutcome::Extracted { entries: 2 })
    );
    assert!(summary.export_path.is_some());
}

#[tokio::test]
async fn unreachable_patchnotes_page_releases_the_visit_guard() {
    let browser = ScriptedBrowser::default()
        .with_page(APP_URL, vec![APP_PAGE.to_string()])
        .with_page(
            &patchnotes_url("3"),
            vec![depot_101("333", r#"<li class="versions">3</li><li class="diff-added"><ins>c.txt</ins></li>"#)],
        );
    let h = harness(browser);

    let summary = h.coordinator.run(request("1", "3")).await.unwrap();

    assert!(matches!(summary.visits[0].1, VisitOutcome::Failed { .. }));
    let changes = exported(&summary.export_path.unwrap());
    assert_eq!(paths(&changes.added), vec!["c.txt"]);
}

#[tokio::test]
async fn build_id_that_prefixes_another_visits_its_own_page() {
    let listing = r#"
<h1><a href="/app/10/" data-appid="10">Test Game</a></h1>
<table id="js-builds">
  <tr><td><a href="/patchnotes/12/">notes</a></td><td>12</td></tr>
  <tr><td><a href="/patchnotes/1/">notes</a></td><td>1</td></tr>
  <tr><td><a href="/patchnotes/0/">notes</a></td><td>0</td></tr>
</table>
"#;
    let browser = ScriptedBrowser::default()
        .with_page(APP_URL, vec![listing.to_string()])
        .with_page(
            &patchnotes_url("12"),
            vec![depot_101(
                "1212",
                r#"<li class="versions">12</li><li class="diff-added"><ins>twelve.txt</ins></li>"#,
            )],
        )
        .with_page(
            &patchnotes_url("1"),
            vec![depot_101(
                "1111",
                r#"<li class="versions">1</li><li class="diff-added"><ins>one.txt</ins></li>"#,
            )],
        );
    let h = harness(browser);

    let summary = h.coordinator.run(request("0", "1")).await.unwrap();

    assert_eq!(
        summary.visits,
        vec![(BuildId::new("1"), VisitOutcome::Extracted { entries: 1 })]
    );
    assert!(!h.browser.opened().contains(&patchnotes_url("12")));
    let changes = exported(&summary.export_path.unwrap());
    assert_eq!(paths(&changes.added), vec!["one.txt"]);
    assert_eq!(changes.manifest_id.as_deref(), Some("1111"));
}

#[tokio::test]
async fn stalled_visit_fails_the_run_and_is_stopped() {
    // Extraction would wait far longer than the coordinator does.
    let browser = standard_browser().with_page(&patchnotes_url("2"), vec![depot_101("222", "")]);
    let poll = PollSettings {
        interval: Duration::from_millis(5),
        timeout: Duration::from_millis(100),
    };
    let h = harness_with(browser, Duration::from_secs(30), poll);

    let err = h.coordinator.run(request("1", "3")).await.unwrap_err();
    assert!(matches!(err, GrabError::VisitStalled(_)));
    assert!(!h.browser.opened().contains(&patchnotes_url("3")));

    // The abandoned visit releases the guard long before its extraction timeout.
    let released = tokio::time::timeout(Duration::from_secs(2), async {
        while h.coordinator.state().unwrap().visit_in_flight {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(released.is_ok());

    // Only that run was stopped; the coordinator stays usable.
    assert!(!h.coordinator.cancel_token().is_cancelled());
    let summary = h.coordinator.run(request("2", "3")).await.unwrap();
    assert_eq!(
        summary.visits,
        vec![(BuildId::new("3"), VisitOutcome::Extracted { entries: 2 })]
    );
}

#[tokio::test]
async fn invalid_range_is_rejected_without_touching_state() {
    let h = harness(standard_browser());

    let err = h.coordinator.run(request("1", "9")).await.unwrap_err();
    assert!(matches!(
        err,
        GrabError::Validation(ValidationError::InvalidBuildRange)
    ));
    assert_eq!(h.coordinator.state().unwrap().aggregate, None);

    let err = h
        .coordinator
        .run(RunRequest {
            depot_id: DepotId::new(" "),
            ..request("1", "3")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GrabError::Validation(ValidationError::MissingDepot)));
}

#[tokio::test]
async fn resume_exports_a_finished_run_exactly_once() {
    let h = harness(standard_browser());
    let store = h.coordinator.store();
    store
        .apply(Msg::ChangesRequested(grabber_core::ChangeRequest {
            app: grabber_core::AppInfo {
                name: "Test Game".to_string(),
                app_id: "10".to_string(),
            },
            depot_id: DepotId::new("101"),
            build_from: BuildId::new("1"),
            build_to: BuildId::new("2"),
            listing: vec![BuildId::new("2"), BuildId::new("1")],
        }))
        .unwrap();
    store.apply(Msg::AllVisitsClosed).unwrap();
    assert!(store.ready_to_export().unwrap());

    let first = h.coordinator.resume("10").await.unwrap();
    assert_eq!(first, Some(h.out_dir.join("101_changes.json")));
    assert_eq!(h.coordinator.resume("10").await.unwrap(), None);
}

#[tokio::test]
async fn cancelled_run_stops_waiting() {
    let h = harness(standard_browser());
    h.coordinator.cancel_token().cancel();

    let err = h.coordinator.run(request("1", "3")).await.unwrap_err();
    assert!(matches!(err, GrabError::Cancelled));
}
