// crates/todo-conformance-core/src/session.rs
// ============================================================================
// Module: Session Context
// Description: Identity and mutable state of one conformance session.
// Purpose: Hold the session token, known ids, auth token, and progress map.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`SessionContext`] exists only after the target issued a session token,
//! so no scenario can observe a session without one. State is refreshed from
//! the target rather than assumed, and it is mutated only after a successful
//! response.
//! Invariants:
//! - The session token never changes after [`SessionContext::initialize`].
//! - `resource_ids` is sorted ascending and mirrors the last successful list.
//! - `seen_ids` only grows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::contract::BodyShape;
use crate::contract::Contract;
use crate::contract::validate;
use crate::error::ScenarioError;
use crate::error::SetupError;
use crate::fixtures::TodoFactory;
use crate::resource::FIELD_ID;
use crate::resource::parse_todo_id;
use crate::resource::xml_todo_id;
use crate::transport::ApiClient;
use crate::transport::CHALLENGER_HEADER;
use crate::transport::HttpMethod;
use crate::transport::HttpRequest;
use crate::transport::HttpResponse;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path of the session-creation endpoint.
pub const CHALLENGER_PATH: &str = "challenger";
/// Path of the todo collection.
pub const TODOS_PATH: &str = "todos";
/// Field holding the progress map in a challenger snapshot.
pub const CHALLENGE_STATUS_FIELD: &str = "challengeStatus";
/// Draws attempted before falling back to an id past every seen id.
const UNUSED_ID_ATTEMPTS: usize = 256;

// ============================================================================
// SECTION: Tokens
// ============================================================================

/// Opaque session token issued by the target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer token granting access to the secret note.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wraps a token issued by the target.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Challenge name to completion flag.
pub type ProgressMap = BTreeMap<String, bool>;

// ============================================================================
// SECTION: Session Context
// ============================================================================

/// State of one session against the target.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Session token.
    token: SessionToken,
    /// Auth token once issued.
    auth_token: Option<AuthToken>,
    /// Ids from the last successful list, ascending.
    resource_ids: Vec<u64>,
    /// Every id observed during the session.
    seen_ids: BTreeSet<u64>,
    /// Last fetched progress map.
    progress: ProgressMap,
    /// Last fetched challenger document.
    challenger_snapshot: Option<Value>,
    /// Last fetched database document.
    database_snapshot: Option<Value>,
}

impl SessionContext {
    /// Creates a session by asking the target for a token.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when the request fails, the status is not 2xx, or
    /// the response carries no non-empty `x-challenger` header.
    pub fn initialize(api: &ApiClient) -> Result<Self, SetupError> {
        let response = api.send(&HttpRequest::new(HttpMethod::Post, CHALLENGER_PATH))?;
        if !(200 .. 300).contains(&response.status) {
            return Err(SetupError::UnexpectedStatus {
                status: response.status,
            });
        }
        let token = response
            .header(CHALLENGER_HEADER)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(SetupError::MissingToken)?;
        Ok(Self::with_token(token))
    }

    /// Creates a session around an already issued token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: SessionToken(token.into()),
            auth_token: None,
            resource_ids: Vec::new(),
            seen_ids: BTreeSet::new(),
            progress: ProgressMap::new(),
            challenger_snapshot: None,
            database_snapshot: None,
        }
    }

    /// Returns the session token.
    #[must_use]
    pub const fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Returns a request carrying the session header.
    #[must_use]
    pub fn request(&self, method: HttpMethod, path: impl Into<String>) -> HttpRequest {
        HttpRequest::new(method, path).header(CHALLENGER_HEADER, self.token.as_str())
    }

    /// Reloads the todo ids from the target.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] when the list request fails or its body has an
    /// unexpected shape. State is left untouched on error.
    pub fn refresh_resource_ids(&mut self, api: &ApiClient) -> Result<&[u64], ScenarioError> {
        let response = api.send(&self.request(HttpMethod::Get, TODOS_PATH))?;
        self.absorb_todo_list(&response)
    }

    /// Replaces the known ids with those in a `GET /todos` response.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] when the response is not a 200 todo list.
    /// State is left untouched on error.
    pub fn absorb_todo_list(&mut self, response: &HttpResponse) -> Result<&[u64], ScenarioError> {
        let contract = Contract::status(200).json(BodyShape::field(
            TODOS_PATH,
            BodyShape::each(BodyShape::HasField(FIELD_ID.to_string())),
        ));
        let report = validate(response, &contract);
        if !report.passed() {
            return Err(ScenarioError::Contract(report));
        }
        let mut ids = response
            .json()
            .and_then(|body| body.get(TODOS_PATH).and_then(Value::as_array).cloned())
            .unwrap_or_default()
            .iter()
            .map(|todo| todo.get(FIELD_ID).and_then(parse_todo_id))
            .collect::<Option<Vec<u64>>>()
            .ok_or_else(|| ScenarioError::Harness("todo id is not an integer".to_string()))?;
        ids.sort_unstable();
        self.seen_ids.extend(ids.iter().copied());
        self.resource_ids = ids;
        Ok(&self.resource_ids)
    }

    /// Returns the ids from the last successful list.
    #[must_use]
    pub fn resource_ids(&self) -> &[u64] {
        &self.resource_ids
    }

    /// Returns the lowest known id.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::MissingState`] when no ids are known.
    pub fn first_resource_id(&self) -> Result<u64, ScenarioError> {
        self.resource_ids.first().copied().ok_or(ScenarioError::MissingState("resource ids"))
    }

    /// Records an id assigned by the target. Returns true when it was never
    /// seen before in this session.
    pub fn observe_id(&mut self, id: u64) -> bool {
        self.seen_ids.insert(id)
    }

    /// Returns true when `id` was observed in this session.
    #[must_use]
    pub fn has_seen(&self, id: u64) -> bool {
        self.seen_ids.contains(&id)
    }

    /// Returns an id never observed in this session.
    pub fn unused_id(&self, fixtures: &mut TodoFactory) -> u64 {
        for _ in 0 .. UNUSED_ID_ATTEMPTS {
            let candidate = fixtures.candidate_missing_id();
            if !self.seen_ids.contains(&candidate) {
                return candidate;
            }
        }
        self.seen_ids.last().map_or(1, |max| max.saturating_add(1))
    }

    /// Stores the auth token issued by the target.
    pub fn record_auth_token(&mut self, token: AuthToken) {
        self.auth_token = Some(token);
    }

    /// Returns the auth token once issued.
    #[must_use]
    pub const fn auth_token(&self) -> Option<&AuthToken> {
        self.auth_token.as_ref()
    }

    /// Reloads the progress map from the target and keeps the full document
    /// as the challenger snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] when the request fails or the document has no
    /// boolean `challengeStatus` map.
    pub fn refresh_progress(&mut self, api: &ApiClient) -> Result<&ProgressMap, ScenarioError> {
        let path = format!("{CHALLENGER_PATH}/{}", self.token);
        let response = api.send(&self.request(HttpMethod::Get, path))?;
        let contract = Contract::status(200)
            .json(BodyShape::HasField(CHALLENGE_STATUS_FIELD.to_string()));
        let report = validate(&response, &contract);
        if !report.passed() {
            return Err(ScenarioError::Contract(report));
        }
        let document = response
            .json()
            .ok_or_else(|| ScenarioError::Harness("challenger body is not json".to_string()))?;
        let progress = parse_progress(&document)?;
        self.progress = progress;
        self.challenger_snapshot = Some(document);
        Ok(&self.progress)
    }

    /// Returns the last fetched progress map.
    #[must_use]
    pub const fn progress(&self) -> &ProgressMap {
        &self.progress
    }

    /// Stores a challenger document fetched by a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Harness`] when the document has no boolean
    /// `challengeStatus` map.
    pub fn record_challenger_snapshot(&mut self, document: Value) -> Result<(), ScenarioError> {
        self.progress = parse_progress(&document)?;
        self.challenger_snapshot = Some(document);
        Ok(())
    }

    /// Returns the last challenger document.
    #[must_use]
    pub const fn challenger_snapshot(&self) -> Option<&Value> {
        self.challenger_snapshot.as_ref()
    }

    /// Stores a database document fetched by a scenario.
    pub fn record_database_snapshot(&mut self, document: Value) {
        self.database_snapshot = Some(document);
    }

    /// Returns the last database document.
    #[must_use]
    pub const fn database_snapshot(&self) -> Option<&Value> {
        self.database_snapshot.as_ref()
    }
}

/// Extracts the progress map from a challenger document.
fn parse_progress(document: &Value) -> Result<ProgressMap, ScenarioError> {
    let status = document
        .get(CHALLENGE_STATUS_FIELD)
        .and_then(Value::as_object)
        .ok_or_else(|| ScenarioError::Harness("challengeStatus is not an object".to_string()))?;
    status
        .iter()
        .map(|(name, flag)| {
            flag.as_bool().map(|flag| (name.clone(), flag)).ok_or_else(|| {
                ScenarioError::Harness(format!("challengeStatus.{name} is not a boolean"))
            })
        })
        .collect()
}

/// Extracts the id of a single todo document.
#[must_use]
pub fn todo_id(document: &Value) -> Option<u64> {
    document.get(FIELD_ID).and_then(parse_todo_id)
}

/// Extracts the id of a todo returned as JSON or XML.
#[must_use]
pub fn response_todo_id(response: &HttpResponse) -> Option<u64> {
    response.json().as_ref().and_then(todo_id).or_else(|| xml_todo_id(&response.body_text()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
