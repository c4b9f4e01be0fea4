//! End-to-end research flows against a mock research server.
//!
//! Each test drives `ResearchController` over real HTTP with a short polling
//! interval and checks where the session ends up.

use std::sync::Arc;
use std::time::Duration;

use professor::config::BackendConfig;
use professor::notification::{Notification, NotificationLevel};
use professor::session::ResearchSession;
use professor::{HttpBackend, ResearchController, ResponseStyle, RunOutcome, StatusPoller, ViewState};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn controller(server: &MockServer, max_attempts: u32) -> ResearchController<HttpBackend> {
    let backend = match HttpBackend::new(&BackendConfig::new(server.uri())) {
        Ok(b) => b,
        Err(e) => unreachable!("backend should build: {e}"),
    };
    ResearchController::new(
        Arc::new(backend),
        StatusPoller::new(Duration::from_millis(10), max_attempts),
        ResearchSession::default(),
    )
}

async fn mount_submit(server: &MockServer, topic: &str, task_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/research"))
        .and(body_partial_json(json!({"topic": topic})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": task_id,
            "status": "started"
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Serve `bodies` in order from the task's status endpoint, once each.
async fn mount_status_sequence(server: &MockServer, task_id: &str, bodies: Vec<Value>) {
    let status_path = format!("/api/research/{task_id}/status");
    for body in bodies {
        Mock::given(method("GET"))
            .and(path(status_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn quantum_computing_ends_in_results_with_heading() {
    let server = MockServer::start().await;
    mount_submit(&server, "quantum computing", "q-1").await;
    mount_status_sequence(
        &server,
        "q-1",
        vec![
            json!({"status": "searching", "progress": 10, "current_step": "Searching the web..."}),
            json!({"status": "scraping", "progress": 35}),
            json!({"status": "processing", "progress": 60}),
            json!({"status": "generating", "progress": 85}),
            json!({
                "status": "completed",
                "progress": 100,
                "result": "Quantum computing is...",
                "metadata": {"processing_time": 12.34, "sources_count": 5, "tokens_used": 900}
            }),
        ],
    )
    .await;

    let controller = controller(&server, 300);
    let outcome = controller
        .run("quantum computing", ResponseStyle::Comprehensive, true)
        .await;
    assert!(matches!(outcome, RunOutcome::Completed), "got {outcome:?}");

    let session = controller.session();
    let session = session.lock().await;
    assert_eq!(session.view(), ViewState::Results);
    assert_eq!(session.progress().percent, 100);
    let results = match session.results() {
        Some(r) => r,
        None => unreachable!("results should be present"),
    };
    assert_eq!(
        results.document.html(),
        "<h2>Research Results: quantum computing</h2>\n<p>Quantum computing is...</p>"
    );
    assert_eq!(results.processing_time_display(), "12.3s");
    assert_eq!(results.sources_display(), "5 sources");
    assert_eq!(results.tokens_display(), "900 tokens");
    assert!(session.notifications().is_empty());
}

#[tokio::test]
async fn rate_limited_task_returns_to_search_with_message() {
    let server = MockServer::start().await;
    mount_submit(&server, "x", "x-1").await;
    mount_status_sequence(
        &server,
        "x-1",
        vec![
            json!({"status": "searching", "progress": 10}),
            json!({"status": "error", "progress": 10, "error": "rate limited"}),
        ],
    )
    .await;

    let controller = controller(&server, 300);
    let outcome = controller.run("x", ResponseStyle::Comprehensive, true).await;
    assert!(matches!(outcome, RunOutcome::Failed(_)), "got {outcome:?}");

    let session = controller.session();
    let session = session.lock().await;
    assert_eq!(session.view(), ViewState::Search);
    assert_eq!(
        session.last_notification(),
        Some(&Notification::error("rate limited"))
    );
    assert!(session.results().is_none());
}

#[tokio::test]
async fn backend_error_status_shows_generic_message() {
    let server = MockServer::start().await;
    mount_submit(&server, "rust", "r-1").await;
    Mock::given(method("GET"))
        .and(path("/api/research/r-1/status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let controller = controller(&server, 300);
    let outcome = controller.run("rust", ResponseStyle::Comprehensive, true).await;
    assert!(matches!(outcome, RunOutcome::Failed(_)), "got {outcome:?}");

    let session = controller.session();
    let session = session.lock().await;
    assert_eq!(session.view(), ViewState::Search);
    let notification = session.last_notification().cloned();
    assert_eq!(
        notification,
        Some(Notification::error(
            "An error occurred during research. Please try again."
        ))
    );
}

#[tokio::test]
async fn never_finishing_task_times_out() {
    let server = MockServer::start().await;
    mount_submit(&server, "slow", "s-1").await;
    Mock::given(method("GET"))
        .and(path("/api/research/s-1/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "processing", "progress": 50})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let controller = controller(&server, 3);
    let outcome = controller.run("slow", ResponseStyle::Comprehensive, true).await;
    assert!(matches!(outcome, RunOutcome::Failed(_)), "got {outcome:?}");

    let session = controller.session();
    let session = session.lock().await;
    assert_eq!(session.view(), ViewState::Search);
    assert_eq!(
        session.last_notification().map(|n| n.message.as_str()),
        Some("Research timeout - please try again")
    );
}

#[tokio::test]
async fn empty_topic_is_rejected_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/research"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let controller = controller(&server, 300);
    let outcome = controller.run("   ", ResponseStyle::Comprehensive, true).await;
    assert!(matches!(outcome, RunOutcome::Rejected(_)), "got {outcome:?}");

    let session = controller.session();
    let session = session.lock().await;
    assert_eq!(session.view(), ViewState::Search);
    assert_eq!(
        session.last_notification().map(|n| n.level),
        Some(NotificationLevel::Warning)
    );
}

#[tokio::test]
async fn new_search_mid_task_ignores_later_polls() {
    let server = MockServer::start().await;
    mount_submit(&server, "first", "f-1").await;
    // The first task never finishes; its polls are slow enough to interrupt.
    Mock::given(method("GET"))
        .and(path("/api/research/f-1/status"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "generating", "progress": 90}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    mount_submit(&server, "second", "s-2").await;
    mount_status_sequence(
        &server,
        "s-2",
        vec![json!({"status": "completed", "progress": 100, "result": "Second answer."})],
    )
    .await;

    let controller = Arc::new(controller(&server, 300));
    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller
                .run("first", ResponseStyle::Comprehensive, true)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    controller.new_search().await;

    let second = controller
        .run("second", ResponseStyle::Concise, true)
        .await;
    assert!(matches!(second, RunOutcome::Completed), "got {second:?}");
    assert!(matches!(first.await, Ok(RunOutcome::Abandoned)));

    let session = controller.session();
    let session = session.lock().await;
    assert_eq!(session.view(), ViewState::Results);
    let results = match session.results() {
        Some(r) => r,
        None => unreachable!("second task's results should show"),
    };
    assert_eq!(results.topic, "second");
    assert!(results.document.plain_text().contains("Second answer."));
}
