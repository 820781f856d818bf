// crates/todo-conformance-core/src/scenarios.rs
// ============================================================================
// Module: Scenario Catalog
// Description: The standard conformance scenarios in declaration order.
// Purpose: Encode the target's observable contract as dependency-ordered steps.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! [`catalog`] returns every scenario of the standard suite. Declaration order
//! is the intended execution order; dependencies only name the scenarios whose
//! state a later scenario consumes (for example the ids captured by
//! `todos_list`).
//!
//! Submodules group scenarios by the surface they exercise.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod auth;
mod negotiation;
mod restore;
mod status;
mod todos;

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::contract::BodyShape;
use crate::contract::Contract;
use crate::error::ScenarioError;
use crate::resource::FIELD_DESCRIPTION;
use crate::resource::FIELD_DONE_STATUS;
use crate::resource::FIELD_ID;
use crate::resource::FIELD_TITLE;
use crate::scenario::Scenario;
use crate::scenario::ScenarioCx;

// ============================================================================
// SECTION: Paths
// ============================================================================

/// Challenge listing.
pub const CHALLENGES_PATH: &str = "challenges";
/// Session database snapshot prefix.
pub const DATABASE_PATH: &str = "challenger/database";
/// Heartbeat endpoint.
pub const HEARTBEAT_PATH: &str = "heartbeat";
/// Token issuance endpoint.
pub const SECRET_TOKEN_PATH: &str = "secret/token";
/// Secret note endpoint.
pub const SECRET_NOTE_PATH: &str = "secret/note";
/// Method override header.
pub const METHOD_OVERRIDE_HEADER: &str = "X-HTTP-Method-Override";
/// Auth token header.
pub const AUTH_TOKEN_HEADER: &str = "X-AUTH-TOKEN";

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Returns the standard suite in declaration order.
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    let mut scenarios = Vec::new();
    scenarios.extend(todos::setup());
    scenarios.extend(todos::reads());
    scenarios.extend(todos::writes());
    scenarios.extend(negotiation::accept_and_content_type());
    scenarios.extend(restore::scenarios());
    scenarios.extend(negotiation::mixed());
    scenarios.extend(status::scenarios());
    scenarios.extend(auth::scenarios());
    scenarios.extend(todos::miscellaneous());
    scenarios
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

/// Shape of a full todo object.
pub(crate) fn todo_shape() -> BodyShape {
    BodyShape::AllOf(
        [FIELD_ID, FIELD_TITLE, FIELD_DONE_STATUS, FIELD_DESCRIPTION]
            .into_iter()
            .map(|field| BodyShape::HasField(field.to_string()))
            .collect(),
    )
}

/// Contract for a status with an empty body.
pub(crate) fn empty_body(status: u16) -> Contract {
    Contract::status(status).empty_body()
}

/// Returns the auth token or a missing-state error.
pub(crate) fn auth_token(cx: &ScenarioCx<'_>) -> Result<String, ScenarioError> {
    cx.session
        .auth_token()
        .map(|token| token.as_str().to_string())
        .ok_or(ScenarioError::MissingState("auth token"))
}
