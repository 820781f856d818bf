// crates/todo-conformance-core/src/scenarios/negotiation.rs
// ============================================================================
// Module: Negotiation Scenarios
// Description: Accept, Content-Type, and mixed negotiation scenarios.
// Purpose: Drive every case of the negotiation table against the target.
// Dependencies: todo-conformance-core
// ============================================================================

//! ## Overview
//! Each scenario looks up its case in the negotiation table, sends the headers
//! the case names, and lets [`ContentNegotiationMatrix`] decide the contract.
//! The unsupported Content-Type case sends a freshly generated media type so
//! the echoed value in the error message is proven to be the one sent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::contract::BodyShape;
use crate::error::ScenarioError;
use crate::negotiation::ContentNegotiationCase;
use crate::negotiation::ContentNegotiationMatrix;
use crate::negotiation::Encoding;
use crate::negotiation::Resolution;
use crate::scenario::Scenario;
use crate::scenario::ScenarioCx;
use crate::scenario::ScenarioGroup;
use crate::session::TODOS_PATH;
use crate::session::response_todo_id;
use crate::transport::HttpMethod;

// ============================================================================
// SECTION: Catalog Slices
// ============================================================================

/// Accept and Content-Type scenarios.
pub(super) fn accept_and_content_type() -> Vec<Scenario> {
    vec![
        Scenario::new("accept_xml", ScenarioGroup::Accept, 200, "xml list", accept_xml),
        Scenario::new("accept_json", ScenarioGroup::Accept, 200, "json list", accept_json),
        Scenario::new("accept_any", ScenarioGroup::Accept, 200, "json by default", accept_any),
        Scenario::new(
            "accept_xml_preferred",
            ScenarioGroup::Accept,
            200,
            "first listed type wins",
            accept_xml_preferred,
        ),
        Scenario::new("accept_empty", ScenarioGroup::Accept, 200, "json by default", accept_empty),
        Scenario::new(
            "accept_unsupported",
            ScenarioGroup::Accept,
            406,
            "unrecognised accept message",
            accept_unsupported,
        ),
        Scenario::new(
            "content_type_xml",
            ScenarioGroup::ContentType,
            201,
            "xml body accepted",
            content_type_xml,
        ),
        Scenario::new(
            "content_type_json",
            ScenarioGroup::ContentType,
            201,
            "json body accepted",
            content_type_json,
        ),
        Scenario::new(
            "content_type_unsupported",
            ScenarioGroup::ContentType,
            415,
            "unsupported content type message",
            content_type_unsupported,
        ),
    ]
}

/// Mixed Accept and Content-Type scenarios.
pub(super) fn mixed() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "mixed_accept_json_content_xml",
            ScenarioGroup::MixedNegotiation,
            201,
            "xml in, json out",
            mixed_accept_json_content_xml,
        ),
        Scenario::new(
            "mixed_accept_xml_content_json",
            ScenarioGroup::MixedNegotiation,
            201,
            "json in, xml out",
            mixed_accept_xml_content_json,
        ),
    ]
}

// ============================================================================
// SECTION: Case Runner
// ============================================================================

/// Looks up a case by name.
fn lookup(name: &'static str) -> Result<&'static ContentNegotiationCase, ScenarioError> {
    crate::negotiation::case(name)
        .ok_or_else(|| ScenarioError::Harness(format!("negotiation case {name} is not defined")))
}

/// Runs a list case (`GET /todos`).
fn run_list_case(cx: &mut ScenarioCx<'_>, name: &'static str) -> Result<(), ScenarioError> {
    let case = lookup(name)?;
    let resolution = ContentNegotiationMatrix::resolve(case.accept, None);
    let mut contract = resolution.contract(200)?;
    if let Resolution::Accepted {
        response, ..
    } = resolution
    {
        contract = match response {
            Encoding::Xml => contract.body_contains(["<todos>"]),
            Encoding::Json => contract.json(BodyShape::field(TODOS_PATH, BodyShape::IsArray)),
        };
    }
    let mut request = cx.request(HttpMethod::Get, TODOS_PATH);
    if let Some(accept) = case.accept {
        request = request.header("Accept", accept);
    }
    cx.expect(&request, &contract)?;
    Ok(())
}

/// Runs a create case (`POST /todos`), optionally overriding the content type.
fn run_create_case(
    cx: &mut ScenarioCx<'_>,
    name: &'static str,
    content_type_override: Option<String>,
) -> Result<(), ScenarioError> {
    let case = lookup(name)?;
    let content_type = content_type_override.or_else(|| case.content_type.map(str::to_string));
    let resolution = ContentNegotiationMatrix::resolve(case.accept, content_type.as_deref());
    let draft = cx.fixtures.draft(&cx.settings.limits);
    let mut request = cx.request(HttpMethod::Post, TODOS_PATH);
    if let Some(accept) = case.accept {
        request = request.header("Accept", accept);
    }
    if let Some(content_type) = &content_type {
        request = request.header("Content-Type", content_type.as_str());
    }
    let contract = match resolution {
        Resolution::Accepted {
            request: request_encoding,
            response,
        } => {
            request = match request_encoding {
                Encoding::Xml => request.raw_body(draft.to_xml()),
                Encoding::Json => request.raw_body(draft.to_json().to_string()),
            };
            draft.created_contract(response)
        }
        Resolution::Rejected(_) => resolution.contract(201)?,
    };
    let response = cx.expect(&request, &contract)?;
    if let Some(id) = response_todo_id(&response) {
        cx.session.observe_id(id);
    }
    Ok(())
}

// ============================================================================
// SECTION: Accept Scenarios
// ============================================================================

/// `Accept: application/xml`.
fn accept_xml(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_list_case(cx, "accept_xml")
}

/// `Accept: application/json`.
fn accept_json(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_list_case(cx, "accept_json")
}

/// `Accept: */*`.
fn accept_any(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_list_case(cx, "accept_any")
}

/// `Accept: application/xml, application/json`.
fn accept_xml_preferred(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_list_case(cx, "accept_xml_preferred")
}

/// Empty `Accept`.
fn accept_empty(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_list_case(cx, "accept_empty")
}

/// `Accept: application/gzip`.
fn accept_unsupported(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_list_case(cx, "accept_unsupported")
}

// ============================================================================
// SECTION: Content-Type Scenarios
// ============================================================================

/// XML request body.
fn content_type_xml(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_create_case(cx, "content_type_xml", None)
}

/// JSON request body.
fn content_type_json(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_create_case(cx, "content_type_json", None)
}

/// Random unsupported media type.
fn content_type_unsupported(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let media_type = cx.fixtures.lower_alpha(10);
    run_create_case(cx, "content_type_unsupported", Some(media_type))
}

// ============================================================================
// SECTION: Mixed Scenarios
// ============================================================================

/// XML in, JSON out.
fn mixed_accept_json_content_xml(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_create_case(cx, "mixed_accept_json_content_xml", None)
}

/// JSON in, XML out.
fn mixed_accept_xml_content_json(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    run_create_case(cx, "mixed_accept_xml_content_json", None)
}
