use std::sync::Arc;
use std::time::Duration;

use grabber_core::{BuildId, DepotId};
use grabber_engine::{
    load_changes, Coordinator, EngineConfig, LogEventSink, RunRequest, VisitOutcome,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APP_PAGE: &str = r#"<html><body>
<h1><a href="/app/10/" data-appid="10">Http Game</a></h1>
<table id="js-builds">
  <tr><td><a href="/patchnotes/30/">notes</a></td><td>30</td></tr>
  <tr><td><a href="/patchnotes/20/">notes</a></td><td>20</td></tr>
  <tr><td><a href="/patchnotes/10/">notes</a></td><td>10</td></tr>
</table>
</body></html>"#;

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn depot_section(rows: &str) -> String {
    format!(
        r#"<html><body><div><a href="/depot/101/history/?changeid=M:4242">101</a></div><ul>{rows}</ul></body></html>"#
    )
}

fn config(server: &MockServer, dir: &TempDir) -> EngineConfig {
    EngineConfig {
        base_url: server.uri(),
        output_dir: dir.path().join("out"),
        state_path: dir.path().join("state.json"),
        poll_interval: Duration::from_millis(5),
        extraction_timeout: Duration::from_secs(2),
        visit_timeout: Duration::from_secs(5),
        mutation_refresh: Duration::from_millis(10),
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn run_over_http_waits_for_the_versions_list_and_exports() {
    grabber_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/10/patchnotes/"))
        .respond_with(html(APP_PAGE.to_string()))
        .mount(&server)
        .await;
    // Build 20 renders its versions list only on the second fetch.
    Mock::given(method("GET"))
        .and(path("/patchnotes/20/"))
        .respond_with(html(depot_section("")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/patchnotes/20/"))
        .respond_with(html(depot_section(
            r#"<li class="versions">20</li><li class="diff-added"><ins>a.txt</ins></li>"#,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/patchnotes/30/"))
        .respond_with(html(depot_section(
            r#"<li class="versions">30</li><li class="diff-modified"><i>a.txt</i></li><li class="diff-added"><ins>c.txt</ins></li>"#,
        )))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir);
    let coordinator = Coordinator::from_config(&config, Arc::new(LogEventSink)).unwrap();

    let summary = coordinator
        .run(RunRequest {
            app_id: "10".to_string(),
            depot_id: DepotId::new("101"),
            build_from: BuildId::new("10"),
            build_to: BuildId::new("30"),
        })
        .await
        .unwrap();

    assert_eq!(
        summary.visits,
        vec![
            (BuildId::new("20"), VisitOutcome::Extracted { entries: 1 }),
            (BuildId::new("30"), VisitOutcome::Extracted { entries: 2 }),
        ]
    );
    let path = summary.export_path.unwrap();
    assert_eq!(path, config.output_dir.join("101_changes.json"));

    let changes = load_changes(&path).unwrap();
    assert_eq!(
        changes.added.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["a.txt", "c.txt"]
    );
    assert!(changes.modified.is_empty());
    assert_eq!(changes.app_name, "Http Game");
    assert_eq!(changes.manifest_id.as_deref(), Some("4242"));

    // The state file is left idle for the next run.
    let state = coordinator.state().unwrap();
    assert!(!state.visit_in_flight);
    assert!(!state.ready_to_export);
}

#[tokio::test]
async fn builds_lists_the_app_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app/10/patchnotes/"))
        .respond_with(html(APP_PAGE.to_string()))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let coordinator =
        Coordinator::from_config(&config(&server, &dir), Arc::new(LogEventSink)).unwrap();
    let listing = coordinator.builds("10").await.unwrap();

    assert_eq!(
        listing.builds,
        vec![BuildId::new("30"), BuildId::new("20"), BuildId::new("10")]
    );
    assert_eq!(listing.app.app_id, "10");
}
