// crates/todo-conformance-core/src/scenario/tests.rs
// ============================================================================
// Module: Scenario Context Unit Tests
// Description: Unit tests for ad hoc assertions inside a scenario.
// Purpose: Keep failure categories tied to the scenario's declared outcome.
// Dependencies: todo-conformance-core
// ============================================================================

//! ## Overview
//! Drives a [`ScenarioCx`] against a fixed-status transport and checks the
//! report produced when [`ScenarioCx::ensure`] fails.

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

use url::Url;

use super::ScenarioCx;
use super::SuiteSettings;
use crate::error::FailureCategory;
use crate::error::ScenarioError;
use crate::fixtures::TodoFactory;
use crate::record::ExpectedOutcome;
use crate::session::SessionContext;
use crate::transport::ApiClient;
use crate::transport::HttpMethod;
use crate::transport::HttpRequest;
use crate::transport::HttpResponse;
use crate::transport::Transport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Transport answering every request with one status.
struct FixedStatus(u16);

impl Transport for FixedStatus {
    fn send(&self, _url: &Url, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(self.0))
    }
}

fn failed_ensure(status: u16, expected: Option<u16>) -> ScenarioError {
    let api = ApiClient::new("http://todos.test/api/", Arc::new(FixedStatus(status))).unwrap();
    let mut session = SessionContext::with_token("token");
    let mut fixtures = TodoFactory::seeded(1);
    let settings = SuiteSettings::default();
    let mut cx = ScenarioCx::new(&api, &mut session, &mut fixtures, &settings);
    if let Some(status) = expected {
        cx = cx.expecting(&ExpectedOutcome {
            status,
            summary: "declared",
        });
    }
    let request = cx.request(HttpMethod::Get, "todos/7");
    cx.send(&request).unwrap();
    cx.ensure(false, "body.id", "7", "8").unwrap_err()
}

// ============================================================================
// SECTION: Ensure Tests
// ============================================================================

#[test]
fn ensure_reports_the_declared_status_as_expected() {
    let err = failed_ensure(200, Some(404));
    let ScenarioError::Contract(report) = &err else {
        panic!("expected contract failure, got {err}");
    };
    assert_eq!((report.expected_status, report.actual_status), (404, 200));
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].path, "body.id");
    assert_eq!(err.category(), FailureCategory::NotFound);
}

#[test]
fn ensure_on_a_created_response_is_an_assertion_failure() {
    let err = failed_ensure(201, Some(201));
    assert_eq!(err.category(), FailureCategory::Assertion);
}

#[test]
fn ensure_without_a_declared_outcome_uses_the_last_status() {
    let err = failed_ensure(415, None);
    let ScenarioError::Contract(report) = &err else {
        panic!("expected contract failure, got {err}");
    };
    assert_eq!((report.expected_status, report.actual_status), (415, 415));
    assert_eq!(err.category(), FailureCategory::Negotiation);
}

#[test]
fn passing_ensure_counts_the_check() {
    let api = ApiClient::new("http://todos.test/api/", Arc::new(FixedStatus(200))).unwrap();
    let mut session = SessionContext::with_token("token");
    let mut fixtures = TodoFactory::seeded(1);
    let settings = SuiteSettings::default();
    let mut cx = ScenarioCx::new(&api, &mut session, &mut fixtures, &settings);
    cx.ensure(true, "body", "anything", "anything").unwrap();
    assert_eq!(cx.actual_outcome(0).checks, 1);
    assert_eq!(cx.actual_outcome(0).last_status, None);
}
