// crates/todo-conformance-core/src/scenarios/auth.rs
// ============================================================================
// Module: Authentication Scenarios
// Description: Token issuance and secret note authorization scenarios.
// Purpose: Check credential handling and both token presentation styles.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! `secret_token_issue` captures the auth token from the `X-AUTH-TOKEN`
//! response header. Every note scenario that needs the token depends on it,
//! so a failed issuance skips them rather than failing them twice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::json;

use super::AUTH_TOKEN_HEADER;
use super::SECRET_NOTE_PATH;
use super::SECRET_TOKEN_PATH;
use super::auth_token;
use super::empty_body;
use crate::contract::BodyShape;
use crate::contract::Contract;
use crate::error::ScenarioError;
use crate::scenario::Scenario;
use crate::scenario::ScenarioCx;
use crate::scenario::ScenarioGroup;
use crate::session::AuthToken;
use crate::transport::HttpMethod;
use crate::transport::HttpRequest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Token value the target must reject.
const WRONG_AUTH_TOKEN: &str = "wrong_token";
/// Field holding the note text.
const NOTE_FIELD: &str = "note";

// ============================================================================
// SECTION: Catalog Slice
// ============================================================================

/// Authentication and authorization scenarios.
pub(super) fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(
            "secret_token_wrong_credentials",
            ScenarioGroup::Authentication,
            401,
            "wrong password refused",
            secret_token_wrong_credentials,
        ),
        Scenario::new(
            "secret_token_issue",
            ScenarioGroup::Authentication,
            201,
            "auth token issued in a header",
            secret_token_issue,
        ),
        Scenario::new(
            "note_get_wrong_token",
            ScenarioGroup::Authorization,
            403,
            "unknown token forbidden",
            note_get_wrong_token,
        ),
        Scenario::new(
            "note_get_missing_token",
            ScenarioGroup::Authorization,
            401,
            "absent token unauthorized",
            note_get_missing_token,
        ),
        Scenario::new("note_get", ScenarioGroup::Authorization, 200, "empty note", note_get)
            .after(&["secret_token_issue"]),
        Scenario::new("note_post", ScenarioGroup::Authorization, 200, "note stored", note_post)
            .after(&["secret_token_issue"]),
        Scenario::new(
            "note_post_missing_token",
            ScenarioGroup::Authorization,
            401,
            "absent token unauthorized",
            note_post_missing_token,
        ),
        Scenario::new(
            "note_post_wrong_token",
            ScenarioGroup::Authorization,
            403,
            "unknown token forbidden",
            note_post_wrong_token,
        ),
        Scenario::new(
            "note_get_bearer",
            ScenarioGroup::Authorization,
            200,
            "bearer token reads the stored note",
            note_get_bearer,
        )
        .after(&["note_post"]),
        Scenario::new(
            "note_post_bearer_and_header",
            ScenarioGroup::Authorization,
            200,
            "header token wins over bearer",
            note_post_bearer_and_header,
        )
        .after(&["secret_token_issue"]),
    ]
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Contract for a 200 note body equal to `text`.
fn note_contract(text: &str) -> Contract {
    Contract::status(200).json(BodyShape::Equals(json!({NOTE_FIELD: text})))
}

/// Builds a note write with `text`.
fn note_write(cx: &ScenarioCx<'_>, text: &str) -> HttpRequest {
    cx.request(HttpMethod::Post, SECRET_NOTE_PATH).json_body(&json!({NOTE_FIELD: text}))
}

// ============================================================================
// SECTION: Authentication Scenarios
// ============================================================================

/// Requests a token with the wrong password.
fn secret_token_wrong_credentials(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let request = cx
        .request(HttpMethod::Post, SECRET_TOKEN_PATH)
        .header("Authorization", cx.settings.credentials.wrong_basic());
    cx.expect(&request, &empty_body(401))?;
    Ok(())
}

/// Requests a token with valid credentials and keeps it.
fn secret_token_issue(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let request = cx
        .request(HttpMethod::Post, SECRET_TOKEN_PATH)
        .header("Authorization", cx.settings.credentials.basic());
    let response = cx.expect(&request, &empty_body(201).header_present(AUTH_TOKEN_HEADER))?;
    let token = response
        .header(AUTH_TOKEN_HEADER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ScenarioError::MissingState("auth token"))?;
    cx.session.record_auth_token(AuthToken::new(token));
    Ok(())
}

// ============================================================================
// SECTION: Authorization Scenarios
// ============================================================================

/// Reads the note with a token the target never issued.
fn note_get_wrong_token(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let request =
        cx.request(HttpMethod::Get, SECRET_NOTE_PATH).header(AUTH_TOKEN_HEADER, WRONG_AUTH_TOKEN);
    cx.expect(&request, &empty_body(403))?;
    Ok(())
}

/// Reads the note without a token.
fn note_get_missing_token(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let request = cx.request(HttpMethod::Get, SECRET_NOTE_PATH);
    cx.expect(&request, &empty_body(401))?;
    Ok(())
}

/// Reads the note before anything was written.
fn note_get(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let token = auth_token(cx)?;
    let request = cx.request(HttpMethod::Get, SECRET_NOTE_PATH).header(AUTH_TOKEN_HEADER, token);
    cx.expect(&request, &note_contract(""))?;
    Ok(())
}

/// Writes the note.
fn note_post(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let token = auth_token(cx)?;
    let text = cx.settings.note_text.clone();
    let request = note_write(cx, &text).header(AUTH_TOKEN_HEADER, token);
    cx.expect(&request, &note_contract(&text))?;
    Ok(())
}

/// Writes the note without a token.
fn note_post_missing_token(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let text = cx.settings.note_text.clone();
    let request = note_write(cx, &text);
    cx.expect(&request, &empty_body(401))?;
    Ok(())
}

/// Writes the note with a token the target never issued.
fn note_post_wrong_token(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let text = cx.settings.note_text.clone();
    let request = note_write(cx, &text).header(AUTH_TOKEN_HEADER, WRONG_AUTH_TOKEN);
    cx.expect(&request, &empty_body(403))?;
    Ok(())
}

/// Reads the note presenting the token as a bearer credential.
fn note_get_bearer(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let token = auth_token(cx)?;
    let text = cx.settings.note_text.clone();
    let request = cx
        .request(HttpMethod::Get, SECRET_NOTE_PATH)
        .header("Authorization", format!("Bearer {token}"));
    cx.expect(&request, &note_contract(&text))?;
    Ok(())
}

/// Writes the note presenting the token both ways.
fn note_post_bearer_and_header(cx: &mut ScenarioCx<'_>) -> Result<(), ScenarioError> {
    let token = auth_token(cx)?;
    let text = cx.settings.note_text.clone();
    let request = note_write(cx, &text)
        .header("Authorization", format!("Bearer {token}"))
        .header(AUTH_TOKEN_HEADER, token);
    cx.expect(&request, &note_contract(&text))?;
    Ok(())
}
