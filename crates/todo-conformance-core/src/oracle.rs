// crates/todo-conformance-core/src/oracle.rs
// ============================================================================
// Module: Challenge Progress Oracle
// Description: Final acceptance gate over the target's own progress map.
// Purpose: Cross-check scenario results against what the target recorded.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! After the scenarios run, the target's `challengeStatus` map says which
//! challenges it saw completed. The oracle re-reads that map and passes only
//! when it is non-empty and every flag is true. Its verdict is reported beside
//! the scenario table, never folded into it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::session::ProgressMap;
use crate::session::SessionContext;
use crate::transport::ApiClient;

// ============================================================================
// SECTION: Verdict
// ============================================================================

/// Oracle outcome.
///
/// # Invariants
/// - `Complete` implies a non-empty map with every flag true.
/// - `Incomplete.incomplete` lists the false flags in map order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OracleVerdict {
    /// Every challenge is complete.
    Complete {
        /// Progress map as read.
        flags: ProgressMap,
    },
    /// Some challenges are not complete.
    Incomplete {
        /// Progress map as read.
        flags: ProgressMap,
        /// Names of the incomplete challenges.
        incomplete: Vec<String>,
    },
    /// The progress map could not be read or was empty.
    Unavailable {
        /// Failure summary.
        error: String,
    },
    /// The run ended before the oracle was consulted.
    NotEvaluated,
}

impl OracleVerdict {
    /// Classifies a progress map.
    #[must_use]
    pub fn from_progress(flags: &ProgressMap) -> Self {
        if flags.is_empty() {
            return Self::Unavailable {
                error: "challengeStatus is empty".to_string(),
            };
        }
        let incomplete: Vec<String> =
            flags.iter().filter(|(_, done)| !**done).map(|(name, _)| name.clone()).collect();
        if incomplete.is_empty() {
            Self::Complete {
                flags: flags.clone(),
            }
        } else {
            Self::Incomplete {
                flags: flags.clone(),
                incomplete,
            }
        }
    }

    /// Returns true when every challenge is complete.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// Returns the flags read, if any.
    #[must_use]
    pub const fn flags(&self) -> Option<&ProgressMap> {
        match self {
            Self::Complete {
                flags,
            }
            | Self::Incomplete {
                flags, ..
            } => Some(flags),
            Self::Unavailable {
                ..
            }
            | Self::NotEvaluated => None,
        }
    }

    /// Returns the number of incomplete challenges.
    #[must_use]
    pub fn incomplete_count(&self) -> usize {
        match self {
            Self::Incomplete {
                incomplete, ..
            } => incomplete.len(),
            _ => 0,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Complete {
                ..
            } => "complete",
            Self::Incomplete {
                ..
            } => "incomplete",
            Self::Unavailable {
                ..
            } => "unavailable",
            Self::NotEvaluated => "not_evaluated",
        }
    }
}

// ============================================================================
// SECTION: Oracle
// ============================================================================

/// Reads the target's progress map and judges it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChallengeProgressOracle;

impl ChallengeProgressOracle {
    /// Refreshes the session's progress map and returns the verdict.
    pub fn assert_all_complete(api: &ApiClient, session: &mut SessionContext) -> OracleVerdict {
        match session.refresh_progress(api) {
            Ok(flags) => OracleVerdict::from_progress(flags),
            Err(err) => OracleVerdict::Unavailable {
                error: err.to_string(),
            },
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
