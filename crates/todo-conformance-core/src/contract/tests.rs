// crates/todo-conformance-core/src/contract/tests.rs
// ============================================================================
// Module: Contract Validation Tests
// Description: Unit tests for status, header, body, and error-message checks.
// Purpose: Validate that every mismatch is collected with a precise path.
// Dependencies: todo-conformance-core, serde_json
// ============================================================================

//! ## Overview
//! Validates mismatch collection and path reporting for response contracts.

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

use serde_json::json;

use super::BodyShape;
use super::Contract;
use super::MAX_REPORTED_VALUE_CHARS;
use super::validate;
use crate::transport::HttpResponse;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn json_response(status: u16, body: &serde_json::Value) -> HttpResponse {
    HttpResponse::new(status)
        .with_header("Content-Type", "application/json")
        .with_body(body.to_string())
}

// ============================================================================
// SECTION: Status and Header Tests
// ============================================================================

#[test]
fn matching_response_passes() {
    let response = json_response(200, &json!({"todos": []}));
    let contract = Contract::status(200)
        .header_contains("content-type", "application/json")
        .json(BodyShape::field("todos", BodyShape::IsArray));
    let report = validate(&response, &contract);
    assert!(report.passed(), "{report}");
}

#[test]
fn collects_status_and_header_mismatches_together() {
    let response = HttpResponse::new(404);
    let contract = Contract::status(200)
        .header_present("X-Challenger")
        .header_equals("Allow", "OPTIONS, GET, HEAD, POST");
    let report = validate(&response, &contract);
    let paths: Vec<&str> = report.mismatches.iter().map(|m| m.path.as_str()).collect();
    assert_eq!(paths, vec!["status", "headers.x-challenger", "headers.allow"]);
    assert_eq!(report.mismatches[1].actual, "<absent>");
    assert_eq!(report.actual_status, 404);
}

#[test]
fn header_contains_ignores_case() {
    let response = HttpResponse::new(200).with_header("content-type", "Application/XML");
    let report = validate(&response, &Contract::status(200).header_contains("Content-Type", "xml"));
    assert!(report.passed());
}

// ============================================================================
// SECTION: Body Tests
// ============================================================================

#[test]
fn empty_body_expectation_reports_text() {
    let response = HttpResponse::new(404).with_body("oops");
    let report = validate(&response, &Contract::status(404).empty_body());
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].path, "body");
    assert_eq!(report.mismatches[0].actual, "oops");
}

#[test]
fn nested_paths_point_at_offending_element() {
    let body = json!({"todos": [{"doneStatus": true}, {"doneStatus": false}]});
    let contract = Contract::status(200).json(BodyShape::field(
        "todos",
        BodyShape::each(BodyShape::field_equals("doneStatus", true)),
    ));
    let report = validate(&json_response(200, &body), &contract);
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].path, "body.todos[1].doneStatus");
    assert_eq!(report.mismatches[0].expected, "true");
    assert_eq!(report.mismatches[0].actual, "false");
}

#[test]
fn length_mismatch_is_reported() {
    let body = json!({"todos": [{"id": 1}]});
    let contract =
        Contract::status(200).json(BodyShape::field("todos", BodyShape::Length(2)));
    let report = validate(&json_response(200, &body), &contract);
    assert_eq!(report.mismatches[0].path, "body.todos.length");
}

#[test]
fn json_shape_on_non_json_body_is_a_mismatch() {
    let response = HttpResponse::new(200).with_body("<todos/>");
    let report = validate(&response, &Contract::status(200).json(BodyShape::IsArray));
    assert_eq!(report.mismatches[0].expected, "json document");
}

#[test]
fn long_actual_values_are_truncated() {
    let response = HttpResponse::new(200).with_body("x".repeat(1_000));
    let report = validate(&response, &Contract::status(200).empty_body());
    let actual = &report.mismatches[0].actual;
    assert_eq!(actual.len(), MAX_REPORTED_VALUE_CHARS + 3);
    assert!(actual.ends_with("..."));
}

// ============================================================================
// SECTION: Error Message Tests
// ============================================================================

#[test]
fn error_message_must_match_first_entry_exactly() {
    let body = json!({"errorMessages": ["title : field is mandatory"]});
    let ok = Contract::status(400).error_message("title : field is mandatory");
    assert!(validate(&json_response(400, &body), &ok).passed());
    let wrong = Contract::status(400).error_message("title : field is required");
    let report = validate(&json_response(400, &body), &wrong);
    assert_eq!(report.mismatches[0].path, "body.errorMessages[0]");
    assert_eq!(report.mismatches[0].actual, "\"title : field is mandatory\"");
}

#[test]
fn missing_error_envelope_is_reported() {
    let contract = Contract::status(400).error_message("anything");
    let report = validate(&json_response(400, &json!({})), &contract);
    assert_eq!(report.mismatches[0].actual, "<absent>");
}

#[test]
fn xml_error_body_matches_by_text() {
    let response = HttpResponse::new(400).with_body(
        "<errorMessages><errorMessage>Could not find field: priority</errorMessage></errorMessages>",
    );
    let contract = Contract::status(400).error_message("Could not find field: priority");
    assert!(validate(&response, &contract).passed());
}

#[test]
fn validation_is_repeatable() {
    let response = json_response(201, &json!({"id": 3}));
    let contract = Contract::status(200).json(BodyShape::HasField("title".to_string()));
    assert_eq!(validate(&response, &contract), validate(&response, &contract));
}
