//! Research backend contract tests.
//!
//! These tests verify the HTTP API format spoken by `HttpBackend`:
//! - request bodies and paths match what the research server expects
//! - status, health and task-listing responses parse, including sparse ones
//! - non-2xx answers, malformed bodies and missing task ids map to the
//!   right `ResearchError` variant

use std::time::Duration;

use professor::config::BackendConfig;
use professor::error::{ResearchError, error_codes};
use professor::types::{ResearchRequest, ResponseStyle, TaskHandle, TaskState};
use professor::{HttpBackend, ResearchBackend};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpBackend {
    let config = BackendConfig::new(server.uri()).with_request_timeout(Duration::from_secs(5));
    match HttpBackend::new(&config) {
        Ok(b) => b,
        Err(e) => unreachable!("backend should build: {e}"),
    }
}

fn request(topic: &str, style: ResponseStyle, include_sources: bool) -> ResearchRequest {
    match ResearchRequest::new(topic, style, include_sources) {
        Ok(r) => r,
        Err(e) => unreachable!("valid request rejected: {e}"),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Submission
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_posts_trimmed_topic_and_options() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/research"))
        .and(header_exists("user-agent"))
        .and(body_partial_json(json!({
            "topic": "quantum computing",
            "response_style": "Beginner-friendly",
            "include_sources": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "abc-123",
            "status": "started",
            "message": "Research task started"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = backend(&server)
        .submit(&request("  quantum computing ", ResponseStyle::BeginnerFriendly, false))
        .await;
    match handle {
        Ok(h) => assert_eq!(h.task_id, "abc-123"),
        Err(e) => unreachable!("submission should succeed: {e}"),
    }
}

#[tokio::test]
async fn submit_without_task_id_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/research"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "started"})))
        .mount(&server)
        .await;

    let result = backend(&server)
        .submit(&request("rust", ResponseStyle::Comprehensive, true))
        .await;
    match result {
        Err(e @ ResearchError::Protocol(_)) => assert_eq!(e.code(), error_codes::PROTOCOL_ERROR),
        other => unreachable!("expected protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_rejected_with_status_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/research"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "Topic is required"})),
        )
        .mount(&server)
        .await;

    let result = backend(&server)
        .submit(&request("rust", ResponseStyle::Comprehensive, true))
        .await;
    match result {
        Err(ResearchError::Http { status }) => assert_eq!(status, 400),
        other => unreachable!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn submit_with_html_error_page_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/research"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let result = backend(&server)
        .submit(&request("rust", ResponseStyle::Comprehensive, true))
        .await;
    match result {
        Err(e @ ResearchError::Http { .. }) => {
            assert_eq!(e.code(), error_codes::HTTP_STATUS);
            assert_eq!(
                e.user_message(),
                "An error occurred during research. Please try again."
            );
        }
        other => unreachable!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    // Bind then drop a listener so the port is closed.
    let addr = match std::net::TcpListener::bind("127.0.0.1:0").and_then(|l| l.local_addr()) {
        Ok(addr) => addr,
        Err(e) => unreachable!("bind should succeed: {e}"),
    };
    let config = BackendConfig::new(format!("http://{addr}")).with_request_timeout(Duration::from_secs(2));
    let backend = match HttpBackend::new(&config) {
        Ok(b) => b,
        Err(e) => unreachable!("backend should build: {e}"),
    };

    let result = backend
        .submit(&request("rust", ResponseStyle::Comprehensive, true))
        .await;
    assert!(
        matches!(result, Err(ResearchError::Network(_))),
        "expected network error, got {result:?}"
    );
}

// ────────────────────────────────────────────────────────────────────────────
// Status
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn status_parses_full_completion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/research/abc-123/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "abc-123",
            "status": "completed",
            "progress": 100,
            "current_step": "Research completed!",
            "result": "## Summary\n\nDone.",
            "metadata": {
                "processing_time": 12.5,
                "sources_count": 4,
                "tokens_used": 1530
            },
            "error": null
        })))
        .mount(&server)
        .await;

    let status = backend(&server).status(&TaskHandle::new("abc-123")).await;
    let status = match status {
        Ok(s) => s,
        Err(e) => unreachable!("status should parse: {e}"),
    };
    assert_eq!(status.status, TaskState::Completed);
    assert_eq!(status.progress, 100);
    assert_eq!(status.current_step.as_deref(), Some("Research completed!"));
    assert_eq!(status.result.as_deref(), Some("## Summary\n\nDone."));
    let metadata = status.metadata.unwrap_or_default();
    assert_eq!(metadata.sources_count, 4);
    assert_eq!(metadata.tokens_used, 1530);
    assert!(status.error.is_none());
}

#[tokio::test]
async fn status_tolerates_sparse_and_unknown_fields() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/research/t1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "queued",
            "eta_seconds": 30,
            "metadata": {}
        })))
        .mount(&server)
        .await;

    let status = backend(&server).status(&TaskHandle::new("t1")).await;
    match status {
        Ok(s) => {
            assert_eq!(s.status, TaskState::Other("queued".into()));
            assert!(!s.status.is_terminal());
            assert_eq!(s.progress, 0);
            assert_eq!(s.metadata.unwrap_or_default().processing_time, 0.0);
        }
        Err(e) => unreachable!("sparse status should parse: {e}"),
    }
}

#[tokio::test]
async fn status_for_unknown_task_is_http_404() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/research/missing/status"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Task not found"})))
        .mount(&server)
        .await;

    let result = backend(&server).status(&TaskHandle::new("missing")).await;
    assert!(matches!(result, Err(ResearchError::Http { status: 404 })));
}

#[tokio::test]
async fn malformed_status_body_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/research/t1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = backend(&server).status(&TaskHandle::new("t1")).await;
    assert!(matches!(result, Err(ResearchError::Protocol(_))));
}

#[tokio::test]
async fn task_id_is_escaped_in_status_path() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/research/a%20b/status"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "searching", "progress": 5})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = backend(&server).status(&TaskHandle::new("a b")).await;
    assert!(result.is_ok(), "escaped path should match: {result:?}");
}

// ────────────────────────────────────────────────────────────────────────────
// Diagnostics
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_report_parses() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "timestamp": "2024-03-07T10:00:00",
            "active_tasks": 2
        })))
        .mount(&server)
        .await;

    match backend(&server).health().await {
        Ok(report) => {
            assert!(report.is_healthy());
            assert_eq!(report.active_tasks, 2);
        }
        Err(e) => unreachable!("health should parse: {e}"),
    }
}

#[tokio::test]
async fn task_listing_parses_float_start_times() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "active_tasks": 1,
            "tasks": [{
                "task_id": "abc",
                "topic": "rust",
                "status": "scraping",
                "progress": 40,
                "start_time": 1709805600.25
            }]
        })))
        .mount(&server)
        .await;

    match backend(&server).list_tasks().await {
        Ok(listing) => {
            assert_eq!(listing.active_tasks, 1);
            let task = &listing.tasks[0];
            assert_eq!(task.status, TaskState::Scraping);
            assert_eq!(task.start_time, Some(1709805600.25));
        }
        Err(e) => unreachable!("listing should parse: {e}"),
    }
}
