// crates/todo-conformance-core/src/record.rs
// ============================================================================
// Module: Scenario Records
// Description: Per-scenario run-table entries with a one-way status lifecycle.
// Purpose: Capture expected and actual outcomes for reporting.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every scheduled scenario gets a [`ScenarioRecord`] before the run starts.
//! Its status moves from `pending` to exactly one terminal state and is never
//! changed afterwards.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::contract::Mismatch;
use crate::error::FailureCategory;
use crate::error::ScenarioError;
use crate::scenario::Scenario;
use crate::scenario::ScenarioGroup;

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// What a scenario expects from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpectedOutcome {
    /// Status of the scenario's decisive request.
    pub status: u16,
    /// Human-readable predicate summary.
    pub summary: &'static str,
}

/// What a scenario observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActualOutcome {
    /// Status of the last response received, if any.
    pub last_status: Option<u16>,
    /// Number of contracts checked.
    pub checks: usize,
    /// Execution time in milliseconds.
    pub elapsed_ms: u64,
}

/// Why a scenario did not execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// A dependency did not pass.
    DependencyFailed {
        /// Name of the first dependency that did not pass.
        blocking: String,
    },
    /// The run was cancelled before the scenario started.
    Cancelled,
}

impl SkipReason {
    /// Returns a short label for events and reports.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::DependencyFailed {
                blocking,
            } => format!("dependency {blocking} did not pass"),
            Self::Cancelled => "cancelled".to_string(),
        }
    }
}

/// Scenario lifecycle status.
///
/// # Invariants
/// - `Pending` is the only non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Not yet executed.
    Pending,
    /// Every assertion held.
    Passed,
    /// An assertion or the request failed.
    Failed {
        /// Failure classification.
        category: FailureCategory,
        /// Failure summary.
        detail: String,
        /// Contract mismatches, when the failure was a contract violation.
        mismatches: Vec<Mismatch>,
    },
    /// Not executed.
    Skipped {
        /// Skip reason.
        reason: SkipReason,
    },
}

impl ScenarioStatus {
    /// Builds a failed status from a scenario error.
    #[must_use]
    pub fn from_error(err: &ScenarioError) -> Self {
        let mismatches = match err {
            ScenarioError::Contract(report) => report.mismatches.clone(),
            _ => Vec::new(),
        };
        Self::Failed {
            category: err.category(),
            detail: err.to_string(),
            mismatches,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed {
                ..
            } => "failed",
            Self::Skipped {
                ..
            } => "skipped",
        }
    }
}

// ============================================================================
// SECTION: Record
// ============================================================================

/// Run-table entry for one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioRecord {
    /// Scenario name.
    pub name: String,
    /// Scenario group.
    pub group: ScenarioGroup,
    /// Expected outcome.
    pub expected_outcome: ExpectedOutcome,
    /// Declared dependencies.
    pub depends_on: Vec<String>,
    /// Observed outcome once executed.
    pub actual_outcome: Option<ActualOutcome>,
    /// Lifecycle status.
    #[serde(flatten)]
    pub status: ScenarioStatus,
}

impl ScenarioRecord {
    /// Creates a pending record for `scenario`.
    #[must_use]
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.to_string(),
            group: scenario.group,
            expected_outcome: scenario.expected,
            depends_on: scenario.depends_on.iter().map(ToString::to_string).collect(),
            actual_outcome: None,
            status: ScenarioStatus::Pending,
        }
    }

    /// Moves the record to a terminal status. Returns false, leaving the record
    /// unchanged, when it already completed or `status` is `Pending`.
    pub fn complete(&mut self, status: ScenarioStatus, actual: Option<ActualOutcome>) -> bool {
        if self.status != ScenarioStatus::Pending || status == ScenarioStatus::Pending {
            return false;
        }
        self.status = status;
        self.actual_outcome = actual;
        true
    }

    /// Returns true when the scenario passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    /// Returns true when the scenario failed.
    #[must_use]
    pub const fn failed(&self) -> bool {
        matches!(self.status, ScenarioStatus::Failed { .. })
    }

    /// Returns true when the scenario was skipped.
    #[must_use]
    pub const fn skipped(&self) -> bool {
        matches!(self.status, ScenarioStatus::Skipped { .. })
    }
}
