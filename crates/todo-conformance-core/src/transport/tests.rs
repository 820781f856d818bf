// crates/todo-conformance-core/src/transport/tests.rs
// ============================================================================
// Module: Transport Unit Tests
// Description: Unit tests for request building, URL resolution, and event emission.
// Purpose: Validate base URL normalization and request telemetry without a network.
// Dependencies: todo-conformance-core
// ============================================================================

//! ## Overview
//! Exercises [`ApiClient`] against a recording transport so URL resolution and
//! event emission can be checked without sockets.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    reason = "Test-only assertions use unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use serde_json::json;
use url::Url;

use super::ApiClient;
use super::HttpMethod;
use super::HttpRequest;
use super::HttpResponse;
use super::Transport;
use super::TransportError;
use crate::events::EventSink;
use crate::events::RunEvent;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Transport that records resolved URLs and replies with a fixed status.
#[derive(Default)]
struct RecordingTransport {
    urls: Mutex<Vec<String>>,
    fail: bool,
}

impl Transport for RecordingTransport {
    fn send(&self, url: &Url, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        if let Ok(mut urls) = self.urls.lock() {
            urls.push(url.to_string());
        }
        if self.fail {
            return Err(TransportError::Request("connection reset".to_string()));
        }
        Ok(HttpResponse::new(200).with_header("Content-Type", "application/json"))
    }
}

/// Sink that keeps event names in order.
#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<(usize, String)>>,
}

impl EventSink for CollectingSink {
    fn record(&self, session: usize, event: &RunEvent) {
        self.events.lock().unwrap().push((session, event.name().to_string()));
    }
}

// ============================================================================
// SECTION: Request Builder Tests
// ============================================================================

#[test]
fn json_body_sets_content_type_once() {
    let request = HttpRequest::new(HttpMethod::Post, "todos").json_body(&json!({"title": "a"}));
    assert_eq!(request.header_value("CONTENT-TYPE"), Some("application/json"));
    assert_eq!(request.headers.len(), 1);
    assert_eq!(request.body.as_deref(), Some(br#"{"title":"a"}"#.as_slice()));
}

#[test]
fn json_body_keeps_explicit_content_type() {
    let request = HttpRequest::new(HttpMethod::Post, "todos")
        .header("Content-Type", "application/xml")
        .json_body(&json!({}));
    assert_eq!(request.header_value("content-type"), Some("application/xml"));
    assert_eq!(request.headers.len(), 1);
}

#[test]
fn response_header_lookup_is_case_insensitive() {
    let response = HttpResponse::new(201).with_header("X-Challenger", "abc");
    assert_eq!(response.header("x-challenger"), Some("abc"));
    assert_eq!(response.header("missing"), None);
}

// ============================================================================
// SECTION: URL Resolution Tests
// ============================================================================

#[test]
fn base_url_without_trailing_slash_keeps_prefix() {
    let transport = Arc::new(RecordingTransport::default());
    let client = ApiClient::new("http://localhost:4567/api", transport).unwrap();
    let url = client.resolve(&HttpRequest::new(HttpMethod::Get, "/todos")).unwrap();
    assert_eq!(url.as_str(), "http://localhost:4567/api/todos");
}

#[test]
fn query_parameters_are_appended() {
    let transport = Arc::new(RecordingTransport::default());
    let client = ApiClient::new("http://localhost:4567", transport).unwrap();
    let request = HttpRequest::new(HttpMethod::Get, "todos").query("doneStatus", "true");
    let url = client.resolve(&request).unwrap();
    assert_eq!(url.as_str(), "http://localhost:4567/todos?doneStatus=true");
}

#[test]
fn rejects_base_url_that_cannot_carry_paths() {
    let transport = Arc::new(RecordingTransport::default());
    let err = ApiClient::new("mailto:someone@example.com", transport).err().unwrap();
    assert!(matches!(err, TransportError::InvalidBaseUrl(_)));
}

// ============================================================================
// SECTION: Event Emission Tests
// ============================================================================

#[test]
fn send_emits_request_and_response_events() {
    let transport = Arc::new(RecordingTransport::default());
    let sink = Arc::new(CollectingSink::default());
    let client = ApiClient::new("http://localhost:4567/", transport.clone())
        .unwrap()
        .with_events(sink.clone())
        .for_session(3);
    let response = client.send(&HttpRequest::new(HttpMethod::Get, "todos")).unwrap();
    assert_eq!(response.status, 200);
    let events = sink.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![(3, "request_sent".to_string()), (3, "response_received".to_string())]
    );
    assert_eq!(transport.urls.lock().unwrap().as_slice(), ["http://localhost:4567/todos"]);
}

#[test]
fn send_emits_failure_event_on_transport_error() {
    let transport = Arc::new(RecordingTransport {
        urls: Mutex::new(Vec::new()),
        fail: true,
    });
    let sink = Arc::new(CollectingSink::default());
    let client =
        ApiClient::new("http://localhost:4567/", transport).unwrap().with_events(sink.clone());
    let err = client.send(&HttpRequest::new(HttpMethod::Delete, "todos/1")).unwrap_err();
    assert!(matches!(err, TransportError::Request(_)));
    let names: Vec<String> = sink.events.lock().unwrap().iter().map(|(_, n)| n.clone()).collect();
    assert_eq!(names, vec!["request_sent", "request_failed"]);
}
