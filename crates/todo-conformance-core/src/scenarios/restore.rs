// crates/todo-conformance-core/src/scenarios/restore.rs
// ============================================================================
// Module: Restore Scenarios
// Description: Challenger progress and todo database snapshot scenarios.
// Purpose: Prove a session can be exported and re-imported through the target.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! The GET scenarios capture the challenger document and the todo database
//! into the session; the PUT scenarios send those captures back. A restore
//! without a prior capture fails with missing state instead of sending an
//! invented document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use super::DATABASE_PATH;
use super::empty_body;
use crate::contract::BodyShape;
use crate::contract::Contract;
use crate::error::ScenarioError;
use crate::resource::FIELD_ID;
use crate::resource::FIELD_TITLE;
use crate::scenario::Scenario;
use crate::scenario::ScenarioCx;
use crate::scenario::ScenarioGroup;
use crate::session::CHALLENGE_STATUS_FIELD;
use crate::session::CHALLENGER_PATH;
use crate::session::TODOS_PATH;
use crate::transport::HttpMethod;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Challenge flag forced on when creating progress for an unknown session.
const RESTORED_PROGRESS_FLAG: &str = "PUT_NEW_RESTORED_CHALLENGER_PROGRESS_STATUS";

// ============================================================================
// SECTION: Catalog Slice
// ============================================================================

/// Snapshot and restore scenarios.
pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "challenger_progress_get",
            ScenarioGroup::Restore,
            200,
            "challenger document for the session",
            challenger_progress_get,
        ),
        Scenario::new(
            "challenger_progress_restore",
            ScenarioGroup::Restore,
            200,
            "captured progress accepted",
            challenger_progress_restore,
        )
        .after(&["challenger_progress_get"]),
        Scenario::new(
            "challenger_progress_create",
            ScenarioGroup::Restore,
            200,
            "amended progress accepted",
            challenger_progress_create,
        )
        .after(&["challenger_progress_get"]),
        Scenario::new(
            "challenger_database_get",
            ScenarioGroup::Restore,
            200,
            "todo database for the session",
            challenger_database_get,
        ),
        Scenario::new(
            "challenger_database_restore",
            ScenarioGroup::Restore,
            204,
            "captured database accepted",
            challenger_database_restore,
        )
        .after(&["challenger_database_get"]),
    ]
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Path of this session's challenger document.
fn progress_path(cx: &ScenarioCx<'_>) -> String {
    format!("{CHALLENGER_PATH}/{}", cx.session.token())
}

/// Path of this session's todo database.
fn database_path(cx: &ScenarioCx<'_>) -> String {
    format!("{DATABASE_PATH}/{}", cx.session.token())
}

/// Contract for a challenger document belonging to this session.
fn challenger_contract(cx: &ScenarioCx<'_>) -> Contract {
    Contract::status(200).json(BodyShape::AllOf(vec![
        BodyShape::field_equals("xChallenger", cx.session.token().as_str()),
        BodyShape::HasField("xAuthToken".to_string()),
        BodyShape::HasField("secretNote".to_string()),
        BodyShape::field(CHALLENGE_STATUS_FIELD, BodyShape::NonEmpty),
    ]))
}

/// Sends a challenger document back to the target.
fn put_progress(cx: &mut ScenarioCx<'_>, document: &Value) -> Result<(), ScenarioError> {
    let contract = challenger_contract(cx);
    let request = cx.request(HttpMethod::Put, progress_path(cx)).json_body(document);
    cx.expect(&request, &contract)?;
    Ok(())
}

/// Returns the challenger document captured earlier in the run.
fn snapshot(cx: &ScenarioCx<'_>) -> Result<Value, ScenarioError> {
    cx.session
        .challenger_snapshot()
        .cloned()
        .ok_or(ScenarioError::MissingState("challenger snapshot"))
}

// ============================================================================
// SECTION: Progress Scenarios
// ============================================================================

/// Reads the challenger document.
fn challenger_progress_get(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let contract = challenger_contract(cx);
    let request = cx.request(HttpMethod::Get, progress_path(cx));
    let response = cx.expect(&request, &contract)?;
    let document = response
        .json()
        .ok_or_else(|| ScenarioError::Harness("challenger body is not json".to_string()))?;
    cx.session.record_challenger_snapshot(document)
}

/// Restores the captured document unchanged.
fn challenger_progress_restore(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let document = snapshot(cx)?;
    put_progress(cx, &document)
}

/// Restores the captured document with one extra completed challenge.
fn challenger_progress_create(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let mut document = snapshot(cx)?;
    let status = document
        .get_mut(CHALLENGE_STATUS_FIELD)
        .and_then(Value::as_object_mut)
        .ok_or_else(|| ScenarioError::Harness("challengeStatus is not an object".to_string()))?;
    status.insert(RESTORED_PROGRESS_FLAG.to_string(), Value::Bool(true));
    put_progress(cx, &document)
}

// ============================================================================
// SECTION: Database Scenarios
// ============================================================================

/// Reads the todo database.
fn challenger_database_get(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let todo = BodyShape::AllOf(vec![
        BodyShape::HasField(FIELD_ID.to_string()),
        BodyShape::HasField(FIELD_TITLE.to_string()),
    ]);
    let contract = Contract::status(200).json(BodyShape::field(
        TODOS_PATH,
        BodyShape::AllOf(vec![BodyShape::IsArray, BodyShape::each(todo)]),
    ));
    let request = cx.request(HttpMethod::Get, database_path(cx));
    let response = cx.expect(&request, &contract)?;
    let document = response
        .json()
        .ok_or_else(|| ScenarioError::Harness("database body is not json".to_string()))?;
    cx.session.record_database_snapshot(document);
    Ok(())
}

/// Restores the captured database.
fn challenger_database_restore(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let document = cx
        .session
        .database_snapshot()
        .cloned()
        .ok_or(ScenarioError::MissingState("database snapshot"))?;
    let request = cx.request(HttpMethod::Put, database_path(cx)).json_body(&document);
    cx.expect(&request, &empty_body(204))?;
    Ok(())
}
