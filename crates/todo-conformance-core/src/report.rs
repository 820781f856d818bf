// crates/todo-conformance-core/src/report.rs
// ============================================================================
// Module: Run Report
// Description: Aggregate result of one session run and its renderings.
// Purpose: Present per-scenario outcomes beside the oracle verdict.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`RunReport`] is produced once per session and is read-only afterwards.
//! It serializes to JSON directly and renders a Markdown summary for humans.
//! Success requires every scheduled scenario to pass and the oracle to report
//! a complete map.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::oracle::OracleVerdict;
use crate::record::ScenarioRecord;
use crate::record::ScenarioStatus;
use crate::session::SessionToken;

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Scenario counts by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Scenarios that passed.
    pub passed: usize,
    /// Scenarios that failed.
    pub failed: usize,
    /// Scenarios that were skipped.
    pub skipped: usize,
    /// Scenarios scheduled.
    pub total: usize,
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Result of one session run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Session index within a multi-session run.
    pub session_index: usize,
    /// Token issued by the target.
    pub session_token: SessionToken,
    /// Scenario records in execution order.
    pub scenarios: Vec<ScenarioRecord>,
    /// Oracle verdict.
    pub oracle: OracleVerdict,
    /// Total run time in milliseconds.
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Counts scenarios by outcome.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.scenarios.len(),
            ..RunSummary::default()
        };
        for record in &self.scenarios {
            if record.passed() {
                summary.passed += 1;
            } else if record.failed() {
                summary.failed += 1;
            } else if record.skipped() {
                summary.skipped += 1;
            }
        }
        summary
    }

    /// Returns true when every scenario passed and the oracle passed.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.scenarios.iter().all(ScenarioRecord::passed) && self.oracle.passed()
    }

    /// Returns the record for `name`.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&ScenarioRecord> {
        self.scenarios.iter().find(|record| record.name == name)
    }

    /// Renders a Markdown summary.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let summary = self.summary();
        let mut out = String::new();
        out.push_str("# Conformance Run ");
        out.push_str(&self.session_index.to_string());
        out.push_str("\n\n");
        out.push_str("- Session: `");
        out.push_str(self.session_token.as_str());
        out.push_str("`\n");
        out.push_str(&format!(
            "- Scenarios: {} passed, {} failed, {} skipped of {}\n",
            summary.passed, summary.failed, summary.skipped, summary.total
        ));
        out.push_str("- Oracle: ");
        out.push_str(self.oracle.label());
        out.push('\n');
        out.push_str("- Result: ");
        out.push_str(if self.succeeded() { "SUCCESS" } else { "FAILURE" });
        out.push_str("\n\n");

        out.push_str("## Scenarios\n\n");
        out.push_str("| Scenario | Group | Expected | Actual | Outcome | Detail |\n");
        out.push_str("| --- | --- | --- | --- | --- | --- |\n");
        for record in &self.scenarios {
            let actual = record
                .actual_outcome
                .and_then(|outcome| outcome.last_status)
                .map_or_else(|| "-".to_string(), |status| status.to_string());
            out.push_str("| ");
            out.push_str(&record.name);
            out.push_str(" | ");
            out.push_str(record.group.as_str());
            out.push_str(" | ");
            out.push_str(&record.expected_outcome.status.to_string());
            out.push_str(" | ");
            out.push_str(&actual);
            out.push_str(" | ");
            out.push_str(record.status.label());
            out.push_str(" | ");
            out.push_str(&escape_cell(&status_detail(&record.status)));
            out.push_str(" |\n");
        }

        if let Some(flags) = self.oracle.flags() {
            out.push_str("\n## Challenge Progress\n\n");
            out.push_str("| Challenge | Complete |\n");
            out.push_str("| --- | --- |\n");
            for (name, done) in flags {
                out.push_str("| ");
                out.push_str(name);
                out.push_str(" | ");
                out.push_str(if *done { "yes" } else { "no" });
                out.push_str(" |\n");
            }
        } else if let OracleVerdict::Unavailable {
            error,
        } = &self.oracle
        {
            out.push_str("\n## Challenge Progress\n\nUnavailable: ");
            out.push_str(error);
            out.push('\n');
        }
        out
    }
}

/// Summarizes a terminal status for the table.
fn status_detail(status: &ScenarioStatus) -> String {
    match status {
        ScenarioStatus::Pending | ScenarioStatus::Passed => String::new(),
        ScenarioStatus::Failed {
            category,
            mismatches,
            detail,
        } => {
            let first = mismatches.first().map_or_else(
                || detail.clone(),
                |mismatch| {
                    format!(
                        "{}: expected {}, actual {}",
                        mismatch.path, mismatch.expected, mismatch.actual
                    )
                },
            );
            format!("{}: {first}", category.as_str())
        }
        ScenarioStatus::Skipped {
            reason,
        } => reason.label(),
    }
}

/// Keeps a value inside one table cell.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

// ============================================================================
// SECTION: Tests
// ============================================================================
