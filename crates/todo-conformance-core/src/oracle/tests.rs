// crates/todo-conformance-core/src/oracle/tests.rs
// ============================================================================
// Module: Oracle Unit Tests
// Description: Unit tests for progress map classification.
// Purpose: Validate the all-true gate and its failure modes.
// Dependencies: todo-conformance-core
// ============================================================================

//! ## Overview
//! Feeds canned challenger documents through a fixed-reply transport and
//! checks the verdict for complete, incomplete, empty, and unreadable maps.

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

use serde_json::Value;
use serde_json::json;
use url::Url;

use super::ChallengeProgressOracle;
use super::OracleVerdict;
use crate::session::ProgressMap;
use crate::session::SessionContext;
use crate::transport::ApiClient;
use crate::transport::HttpRequest;
use crate::transport::HttpResponse;
use crate::transport::Transport;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Transport that answers every request with one response.
struct FixedReply(Result<HttpResponse, TransportError>);

impl Transport for FixedReply {
    fn send(&self, _url: &Url, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.0.clone()
    }
}

fn challenger(status: &Value) -> HttpResponse {
    let body = json!({
        "xChallenger": "token-1",
        "xAuthToken": "",
        "secretNote": "",
        "challengeStatus": status,
    });
    HttpResponse::new(200)
        .with_header("Content-Type", "application/json")
        .with_body(body.to_string())
}

fn verdict_for(reply: Result<HttpResponse, TransportError>) -> OracleVerdict {
    let api = ApiClient::new("http://target.test", Arc::new(FixedReply(reply))).unwrap();
    let mut session = SessionContext::with_token("token-1");
    ChallengeProgressOracle::assert_all_complete(&api, &mut session)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn all_true_map_is_complete() {
    let verdict = verdict_for(Ok(challenger(&json!({"GET_TODOS": true, "POST_TODOS": true}))));
    assert!(verdict.passed());
    assert_eq!(verdict.flags().map(ProgressMap::len), Some(2));
    assert_eq!(verdict.label(), "complete");
}

#[test]
fn false_flags_are_listed_in_map_order() {
    let verdict = verdict_for(Ok(challenger(&json!({
        "PUT_TODOS": false,
        "GET_TODOS": true,
        "DELETE_TODOS": false,
    }))));
    match verdict {
        OracleVerdict::Incomplete {
            incomplete, ..
        } => assert_eq!(incomplete, vec!["DELETE_TODOS", "PUT_TODOS"]),
        other => panic!("unexpected verdict {other:?}"),
    }
}

#[test]
fn empty_map_is_unavailable() {
    let verdict = verdict_for(Ok(challenger(&json!({}))));
    assert!(matches!(verdict, OracleVerdict::Unavailable { .. }));
    assert!(!verdict.passed());
}

#[test]
fn transport_failure_is_unavailable() {
    let verdict = verdict_for(Err(TransportError::Request("connection refused".to_string())));
    match verdict {
        OracleVerdict::Unavailable {
            error,
        } => assert!(error.contains("connection refused")),
        other => panic!("unexpected verdict {other:?}"),
    }
}

#[test]
fn non_boolean_flag_is_unavailable() {
    let verdict = verdict_for(Ok(challenger(&json!({"GET_TODOS": "yes"}))));
    assert!(matches!(verdict, OracleVerdict::Unavailable { .. }));
}

#[test]
fn verdict_serializes_with_status_tag() {
    let mut flags = ProgressMap::new();
    flags.insert("GET_TODOS".to_string(), false);
    let verdict = OracleVerdict::from_progress(&flags);
    let value = serde_json::to_value(&verdict).unwrap();
    assert_eq!(value["status"], "incomplete");
    assert_eq!(value["incomplete"], json!(["GET_TODOS"]));
    assert_eq!(verdict.incomplete_count(), 1);
}
