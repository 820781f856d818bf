// crates/todo-conformance-core/src/scenarios/status.rs
// ============================================================================
// Module: Status Code Scenarios
// Description: Heartbeat status codes and method override scenarios.
// Purpose: Pin the target's method handling on the heartbeat endpoint.
// Dependencies: todo-conformance-core
// ============================================================================

//! ## Overview
//! The heartbeat endpoint answers each method with a fixed status and an empty
//! body. The override scenarios send POST with `X-HTTP-Method-Override` and
//! expect the status the overridden method earns directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use super::HEARTBEAT_PATH;
use super::METHOD_OVERRIDE_HEADER;
use super::empty_body;
use crate::error::ScenarioError;
use crate::scenario::Scenario;
use crate::scenario::ScenarioCx;
use crate::scenario::ScenarioGroup;
use crate::transport::HttpMethod;

// ============================================================================
// SECTION: Catalog Slice
// ============================================================================

/// Heartbeat and override scenarios.
pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "heartbeat_delete",
            ScenarioGroup::StatusCodes,
            405,
            "method not allowed",
            heartbeat_delete,
        ),
        Scenario::new(
            "heartbeat_patch",
            ScenarioGroup::StatusCodes,
            500,
            "server error",
            heartbeat_patch,
        ),
        Scenario::new(
            "heartbeat_trace",
            ScenarioGroup::StatusCodes,
            501,
            "not implemented",
            heartbeat_trace,
        ),
        Scenario::new(
            "heartbeat_get",
            ScenarioGroup::StatusCodes,
            204,
            "no content",
            heartbeat_get,
        ),
        Scenario::new(
            "override_delete",
            ScenarioGroup::MethodOverride,
            405,
            "overridden DELETE not allowed",
            override_delete,
        ),
        Scenario::new(
            "override_patch",
            ScenarioGroup::MethodOverride,
            500,
            "overridden PATCH errors",
            override_patch,
        ),
        Scenario::new(
            "override_trace",
            ScenarioGroup::MethodOverride,
            501,
            "overridden TRACE not implemented",
            override_trace,
        ),
    ]
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Sends `method` to the heartbeat and expects `status` with no body.
fn heartbeat(
    cx: &mut ScenarioCx<'_>,
    method: HttpMethod,
    status: u16,
) -> Result<(), ScenarioError> {
    let request = cx.request(method, HEARTBEAT_PATH);
    cx.expect(&request, &empty_body(status))?;
    Ok(())
}

/// Tunnels `method` through POST and expects `status` with no body.
fn overridden(
    cx: &mut ScenarioCx<'_>,
    method: HttpMethod,
    status: u16,
) -> Result<(), ScenarioError> {
    let request = cx
        .request(HttpMethod::Post, HEARTBEAT_PATH)
        .header(METHOD_OVERRIDE_HEADER, method.as_str());
    cx.expect(&request, &empty_body(status))?;
    Ok(())
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

/// DELETE is not allowed on the heartbeat.
fn heartbeat_delete(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    heartbeat(cx, HttpMethod::Delete, 405)
}

/// PATCH makes the heartbeat fail with 500.
fn heartbeat_patch(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    heartbeat(cx, HttpMethod::Patch, 500)
}

/// TRACE is not implemented by the heartbeat.
fn heartbeat_trace(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    heartbeat(cx, HttpMethod::Trace, 501)
}

/// GET answers 204 with no content.
fn heartbeat_get(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    heartbeat(cx, HttpMethod::Get, 204)
}

/// DELETE tunneled through POST.
fn override_delete(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    overridden(cx, HttpMethod::Delete, 405)
}

/// PATCH tunneled through POST.
fn override_patch(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    overridden(cx, HttpMethod::Patch, 500)
}

/// TRACE tunneled through POST.
fn override_trace(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    overridden(cx, HttpMethod::Trace, 501)
}
