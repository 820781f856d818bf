// crates/todo-conformance-core/src/scenario.rs
// ============================================================================
// Module: Scenario Definitions
// Description: Scenario descriptors, suite settings, and the execution context.
// Purpose: Give each scenario one place to send requests and assert contracts.
// Dependencies: base64
// ============================================================================

//! ## Overview
//! A [`Scenario`] is a named function with declared dependencies. At run time
//! it receives a [`ScenarioCx`] that bundles the API client, the session, the
//! fixture factory, and the suite settings, and that counts the contracts it
//! checks.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::contract::Contract;
use crate::contract::ContractReport;
use crate::contract::Mismatch;
use crate::contract::validate;
use crate::error::ScenarioError;
use crate::fixtures::TodoFactory;
use crate::record::ActualOutcome;
use crate::record::ExpectedOutcome;
use crate::resource::TodoLimits;
use crate::session::SessionContext;
use crate::transport::ApiClient;
use crate::transport::HttpMethod;
use crate::transport::HttpRequest;
use crate::transport::HttpResponse;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Challenge count published by the public todo API.
pub const DEFAULT_CHALLENGE_COUNT: usize = 59;
/// Note text written by the authorization scenarios.
pub const DEFAULT_NOTE_TEXT: &str = "custom note";

// ============================================================================
// SECTION: Groups
// ============================================================================

/// Scenario grouping used for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioGroup {
    /// Session preparation.
    Setup,
    /// Challenge listing.
    Challenges,
    /// GET requests.
    Get,
    /// HEAD requests.
    Head,
    /// Creation with POST.
    CreatePost,
    /// Creation with PUT.
    CreatePut,
    /// Update with POST.
    UpdatePost,
    /// Update with PUT.
    UpdatePut,
    /// DELETE requests.
    Delete,
    /// OPTIONS requests.
    Options,
    /// Accept header handling.
    Accept,
    /// Content-Type header handling.
    ContentType,
    /// Session snapshot and restore.
    Restore,
    /// Mixed Accept and Content-Type.
    MixedNegotiation,
    /// Heartbeat status codes.
    StatusCodes,
    /// Method override header.
    MethodOverride,
    /// Token issuance.
    Authentication,
    /// Secret note access.
    Authorization,
    /// Bulk delete and capacity.
    Miscellaneous,
}

impl ScenarioGroup {
    /// Returns a stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Challenges => "challenges",
            Self::Get => "get",
            Self::Head => "head",
            Self::CreatePost => "create_post",
            Self::CreatePut => "create_put",
            Self::UpdatePost => "update_post",
            Self::UpdatePut => "update_put",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Accept => "accept",
            Self::ContentType => "content_type",
            Self::Restore => "restore",
            Self::MixedNegotiation => "mixed_negotiation",
            Self::StatusCodes => "status_codes",
            Self::MethodOverride => "method_override",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Miscellaneous => "miscellaneous",
        }
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Basic credentials for token issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name.
    pub username: String,
    /// Valid password.
    pub password: String,
    /// Password expected to be rejected.
    pub wrong_password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "password".to_string(),
            wrong_password: "admin".to_string(),
        }
    }
}

impl Credentials {
    /// Returns the `Authorization` value for the valid credentials.
    #[must_use]
    pub fn basic(&self) -> String {
        basic_header(&self.username, &self.password)
    }

    /// Returns the `Authorization` value for the rejected credentials.
    #[must_use]
    pub fn wrong_basic(&self) -> String {
        basic_header(&self.username, &self.wrong_password)
    }
}

/// Builds a Basic authorization header value.
fn basic_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Settings shared by every scenario in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteSettings {
    /// Resource limits.
    pub limits: TodoLimits,
    /// Token credentials.
    pub credentials: Credentials,
    /// Expected number of challenges; `None` only requires a non-empty list.
    pub expected_challenge_count: Option<usize>,
    /// Note text written to the secret note.
    pub note_text: String,
}

impl Default for SuiteSettings {
    fn default() -> Self {
        Self {
            limits: TodoLimits::default(),
            credentials: Credentials::default(),
            expected_challenge_count: Some(DEFAULT_CHALLENGE_COUNT),
            note_text: DEFAULT_NOTE_TEXT.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Scenario
// ============================================================================

/// Scenario body.
pub type ScenarioFn = fn(&mut ScenarioCx<'_>) -> Result<(), ScenarioError>;

/// Named, dependency-declaring unit of the suite.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    /// Unique name.
    pub name: &'static str,
    /// Report group.
    pub group: ScenarioGroup,
    /// Expected outcome summary.
    pub expected: ExpectedOutcome,
    /// Names of scenarios that must pass first.
    pub depends_on: &'static [&'static str],
    /// Scenario body.
    pub run: ScenarioFn,
}

impl Scenario {
    /// Creates a scenario without dependencies.
    #[must_use]
    pub const fn new(
        name: &'static str,
        group: ScenarioGroup,
        status: u16,
        summary: &'static str,
        run: ScenarioFn,
    ) -> Self {
        Self {
            name,
            group,
            expected: ExpectedOutcome {
                status,
                summary,
            },
            depends_on: &[],
            run,
        }
    }

    /// Declares dependencies.
    #[must_use]
    pub const fn after(mut self, depends_on: &'static [&'static str]) -> Self {
        self.depends_on = depends_on;
        self
    }
}

// ============================================================================
// SECTION: Execution Context
// ============================================================================

/// Per-scenario execution context.
pub struct ScenarioCx<'a> {
    /// Client for the target.
    pub api: &'a ApiClient,
    /// Session state.
    pub session: &'a mut SessionContext,
    /// Fixture generator.
    pub fixtures: &'a mut TodoFactory,
    /// Suite settings.
    pub settings: &'a SuiteSettings,
    /// Status the running scenario declares for its decisive request.
    expected_status: Option<u16>,
    /// Status of the last response received.
    last_status: Option<u16>,
    /// Contracts checked so far.
    checks: usize,
}

impl<'a> ScenarioCx<'a> {
    /// Creates a context.
    pub const fn new(
        api: &'a ApiClient,
        session: &'a mut SessionContext,
        fixtures: &'a mut TodoFactory,
        settings: &'a SuiteSettings,
    ) -> Self {
        Self {
            api,
            session,
            fixtures,
            settings,
            expected_status: None,
            last_status: None,
            checks: 0,
        }
    }

    /// Binds the context to the outcome the running scenario declares.
    ///
    /// Failed [`ScenarioCx::ensure`] checks report this status as expected,
    /// so their category follows the scenario rather than the last response.
    #[must_use]
    pub const fn expecting(mut self, expected: &ExpectedOutcome) -> Self {
        self.expected_status = Some(expected.status);
        self
    }

    /// Returns a request carrying the session header.
    #[must_use]
    pub fn request(&self, method: HttpMethod, path: impl Into<String>) -> HttpRequest {
        self.session.request(method, path)
    }

    /// Sends a request and remembers its status.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Infrastructure`] when the transport fails.
    pub fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, ScenarioError> {
        let response = self.api.send(request)?;
        self.last_status = Some(response.status);
        Ok(response)
    }

    /// Validates a response against a contract.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Contract`] carrying every mismatch.
    pub fn check(
        &mut self,
        response: &HttpResponse,
        contract: &Contract,
    ) -> Result<(), ScenarioError> {
        self.checks += 1;
        let report = validate(response, contract);
        if report.passed() { Ok(()) } else { Err(ScenarioError::Contract(report)) }
    }

    /// Sends a request and validates the response.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] when the request fails or the contract does not hold.
    pub fn expect(
        &mut self,
        request: &HttpRequest,
        contract: &Contract,
    ) -> Result<HttpResponse, ScenarioError> {
        let response = self.send(request)?;
        self.check(&response, contract)?;
        Ok(response)
    }

    /// Asserts a condition that no declarative contract covers.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Contract`] with a single mismatch when
    /// `condition` is false.
    pub fn ensure(
        &mut self,
        condition: bool,
        path: &str,
        expected: &str,
        actual: impl AsRef<str>,
    ) -> Result<(), ScenarioError> {
        self.checks += 1;
        if condition {
            return Ok(());
        }
        let actual_status = self.last_status.unwrap_or_default();
        Err(ScenarioError::Contract(ContractReport {
            expected_status: self.expected_status.unwrap_or(actual_status),
            actual_status,
            mismatches: vec![Mismatch::new(path, expected, actual)],
        }))
    }

    /// Returns the observed outcome for the record.
    #[must_use]
    pub const fn actual_outcome(&self, elapsed_ms: u64) -> ActualOutcome {
        ActualOutcome {
            last_status: self.last_status,
            checks: self.checks,
            elapsed_ms,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
