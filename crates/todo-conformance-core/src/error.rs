// crates/todo-conformance-core/src/error.rs
// ============================================================================
// Module: Conformance Errors
// Description: Error taxonomy for setup, scenario execution, and suite assembly.
// Purpose: Separate target-contract failures from harness and network faults.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Three error families cover the harness:
//! - [`SetupError`] aborts a run before any scenario executes.
//! - [`ScenarioError`] fails one scenario; the run continues.
//! - [`SuiteError`] rejects a malformed scenario catalog at construction.
//!
//! [`FailureCategory`] classifies scenario failures for reports so a 406 from
//! the target reads differently from a dropped connection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::contract::ContractReport;
use crate::messages::TemplateError;
use crate::transport::TransportError;

// ============================================================================
// SECTION: Setup Errors
// ============================================================================

/// Failures that prevent a run from starting.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// The session-creation request could not be delivered.
    #[error("session creation failed: {0}")]
    Transport(#[from] TransportError),
    /// The target answered session creation with a non-success status.
    #[error("session creation returned status {status}")]
    UnexpectedStatus {
        /// Status returned by the target.
        status: u16,
    },
    /// The target accepted session creation but issued no session token.
    #[error("session creation response carried no x-challenger token")]
    MissingToken,
}

// ============================================================================
// SECTION: Failure Categories
// ============================================================================

/// Report classification for failed scenarios.
///
/// # Invariants
/// - Variants are stable for report consumers; serialized in snake case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Request validation contract (400, 413).
    Validation,
    /// Missing resource contract (404).
    NotFound,
    /// Content negotiation contract (406, 415).
    Negotiation,
    /// Authentication or authorization contract (401, 403).
    Auth,
    /// Method handling contract (405, 500, 501).
    Method,
    /// Any other contract mismatch.
    Assertion,
    /// Network or transport failure; not a target contract violation.
    Infrastructure,
    /// Fault in the harness itself (bad template, missing prerequisite state).
    Harness,
}

impl FailureCategory {
    /// Classifies a contract failure by the status the scenario expected.
    #[must_use]
    pub const fn for_status(status: u16) -> Self {
        match status {
            400 | 413 => Self::Validation,
            404 => Self::NotFound,
            406 | 415 => Self::Negotiation,
            401 | 403 => Self::Auth,
            405 | 500 | 501 => Self::Method,
            _ => Self::Assertion,
        }
    }

    /// Returns a stable label for the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Negotiation => "negotiation",
            Self::Auth => "auth",
            Self::Method => "method",
            Self::Assertion => "assertion",
            Self::Infrastructure => "infrastructure",
            Self::Harness => "harness",
        }
    }
}

// ============================================================================
// SECTION: Scenario Errors
// ============================================================================

/// Failures raised while executing one scenario.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Only [`ScenarioError::Contract`] represents a target contract violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    /// The response did not satisfy the expected contract.
    #[error("{0}")]
    Contract(ContractReport),
    /// The request never produced a response.
    #[error("infrastructure failure: {0}")]
    Infrastructure(#[from] TransportError),
    /// The harness could not build the scenario (template, fixture, or parse fault).
    #[error("harness failure: {0}")]
    Harness(String),
    /// Session state needed by the scenario was never captured.
    #[error("missing session state: {0}")]
    MissingState(&'static str),
}

impl ScenarioError {
    /// Returns the report category for this failure.
    #[must_use]
    pub const fn category(&self) -> FailureCategory {
        match self {
            Self::Contract(report) => FailureCategory::for_status(report.expected_status),
            Self::Infrastructure(_) => FailureCategory::Infrastructure,
            Self::Harness(_) | Self::MissingState(_) => FailureCategory::Harness,
        }
    }
}

impl From<TemplateError> for ScenarioError {
    fn from(err: TemplateError) -> Self {
        Self::Harness(err.to_string())
    }
}

// ============================================================================
// SECTION: Suite Errors
// ============================================================================

/// Catalog validation failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuiteError {
    /// Two scenarios share a name.
    #[error("duplicate scenario name: {0}")]
    DuplicateScenario(String),
    /// A scenario depends on a name that is not in the catalog.
    #[error("scenario {scenario} depends on unknown scenario {dependency}")]
    UnknownDependency {
        /// Declaring scenario.
        scenario: String,
        /// Missing dependency name.
        dependency: String,
    },
    /// The dependency graph contains a cycle through the listed scenarios.
    #[error("dependency cycle among scenarios: {}", .0.join(", "))]
    Cycle(Vec<String>),
    /// A filter named a scenario that is not in the catalog.
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),
}
