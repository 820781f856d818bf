// crates/todo-conformance-core/src/orchestrator.rs
// ============================================================================
// Module: Scenario Orchestrator
// Description: Dependency-ordered execution of the scenario suite.
// Purpose: Run scenarios against one session, isolate failures, and report.
// Dependencies: todo-conformance-core
// ============================================================================

//! ## Overview
//! [`ScenarioSuite`] validates the scenario graph once and fixes the execution
//! order. [`ScenarioOrchestrator`] owns nothing mutable between runs: each run
//! creates its own session and fixture generator, walks the order, and returns
//! a [`RunReport`].
//! Invariants:
//! - Order is topological with ties broken by declaration order.
//! - A scenario whose dependency did not pass is skipped with that dependency
//!   named; it is never executed.
//! - A failing scenario never aborts the run.
//! - Cancellation skips every remaining scenario and the oracle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::panic;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;

use crate::error::SetupError;
use crate::error::SuiteError;
use crate::events::RunEvent;
use crate::fixtures::TodoFactory;
use crate::oracle::ChallengeProgressOracle;
use crate::oracle::OracleVerdict;
use crate::record::ScenarioRecord;
use crate::record::ScenarioStatus;
use crate::record::SkipReason;
use crate::report::RunReport;
use crate::scenario::Scenario;
use crate::scenario::ScenarioCx;
use crate::scenario::SuiteSettings;
use crate::scenarios::catalog;
use crate::session::SessionContext;
use crate::transport::ApiClient;

// ============================================================================
// SECTION: Suite
// ============================================================================

/// Validated, ordered scenario set.
///
/// # Invariants
/// - Names are unique and every dependency names a member.
/// - `scenarios` is in execution order.
#[derive(Debug, Clone)]
pub struct ScenarioSuite {
    /// Scenarios in execution order.
    scenarios: Vec<Scenario>,
}

impl ScenarioSuite {
    /// Validates `declared` and orders it.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError`] on duplicate names, unknown dependencies, or a
    /// dependency cycle.
    pub fn new(declared: Vec<Scenario>) -> Result<Self, SuiteError> {
        let mut positions: HashMap<&'static str, usize> = HashMap::new();
        for (index, scenario) in declared.iter().enumerate() {
            if positions.insert(scenario.name, index).is_some() {
                return Err(SuiteError::DuplicateScenario(scenario.name.to_string()));
            }
        }

        let mut indegree = vec![0_usize; declared.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); declared.len()];
        for (index, scenario) in declared.iter().enumerate() {
            for dependency in scenario.depends_on {
                let Some(&parent) = positions.get(dependency) else {
                    return Err(SuiteError::UnknownDependency {
                        scenario: scenario.name.to_string(),
                        dependency: (*dependency).to_string(),
                    });
                };
                indegree[index] += 1;
                dependents[parent].push(index);
            }
        }

        let mut ready: BTreeSet<usize> = indegree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(index, _)| index)
            .collect();
        let mut order = Vec::with_capacity(declared.len());
        while let Some(next) = ready.pop_first() {
            order.push(next);
            for &dependent in &dependents[next] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() < declared.len() {
            let blocked = declared
                .iter()
                .zip(&indegree)
                .filter(|(_, degree)| **degree > 0)
                .map(|(scenario, _)| scenario.name.to_string())
                .collect();
            return Err(SuiteError::Cycle(blocked));
        }
        let scenarios = order.into_iter().map(|index| declared[index]).collect();
        Ok(Self {
            scenarios,
        })
    }

    /// Returns the standard suite.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError`] when the built-in catalog is malformed.
    pub fn standard() -> Result<Self, SuiteError> {
        Self::new(catalog())
    }

    /// Restricts the suite to `names` and everything they depend on.
    ///
    /// # Errors
    ///
    /// Returns [`SuiteError::UnknownScenario`] when a name is not a member.
    pub fn only<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, SuiteError> {
        let mut keep: HashSet<&'static str> = HashSet::new();
        let mut pending = Vec::new();
        for name in names {
            let scenario = self
                .get(name.as_ref())
                .ok_or_else(|| SuiteError::UnknownScenario(name.as_ref().to_string()))?;
            pending.push(scenario.name);
        }
        while let Some(name) = pending.pop() {
            if !keep.insert(name) {
                continue;
            }
            if let Some(scenario) = self.get(name) {
                pending.extend(scenario.depends_on.iter().copied());
            }
        }
        let scenarios = self
            .scenarios
            .iter()
            .filter(|scenario| keep.contains(scenario.name))
            .copied()
            .collect();
        Ok(Self {
            scenarios,
        })
    }

    /// Returns the scenarios in execution order.
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Returns the scenario names in execution order.
    #[must_use]
    pub fn order(&self) -> Vec<&'static str> {
        self.scenarios.iter().map(|scenario| scenario.name).collect()
    }

    /// Returns the scenario named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.name == name)
    }

    /// Returns the number of scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Returns true when the suite has no scenarios.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

// ============================================================================
// SECTION: Cancellation
// ============================================================================

/// Shared cancellation flag checked before each scenario.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Runs a suite against the target.
pub struct ScenarioOrchestrator {
    /// Client for the target; carries the event sink.
    api: ApiClient,
    /// Validated suite.
    suite: ScenarioSuite,
    /// Settings shared by every scenario.
    settings: SuiteSettings,
    /// Fixture seed; `None` draws from entropy.
    seed: Option<u64>,
}

impl ScenarioOrchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub const fn new(api: ApiClient, suite: ScenarioSuite, settings: SuiteSettings) -> Self {
        Self {
            api,
            suite,
            settings,
            seed: None,
        }
    }

    /// Makes fixtures reproducible from `seed`.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the suite.
    #[must_use]
    pub const fn suite(&self) -> &ScenarioSuite {
        &self.suite
    }

    /// Runs the suite against a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when the session cannot be created; no scenario
    /// runs in that case.
    pub fn run(&self, cancel: &CancelToken) -> Result<RunReport, SetupError> {
        self.run_session(&self.api, self.seed, cancel)
    }

    /// Runs `sessions` independent sessions concurrently.
    ///
    /// Each session gets its own context, fixture stream, and event label;
    /// results are returned in session order.
    #[must_use]
    pub fn run_isolated_sessions(
        &self,
        sessions: usize,
        cancel: &CancelToken,
    ) -> Vec<Result<RunReport, SetupError>> {
        thread::scope(|scope| {
            let handles: Vec<_> = (0 .. sessions)
                .map(|index| {
                    let api = self.api.for_session(index);
                    let offset = u64::try_from(index).unwrap_or(u64::MAX);
                    let seed = self.seed.map(|seed| seed.wrapping_add(offset));
                    scope.spawn(move || self.run_session(&api, seed, cancel))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect()
        })
    }

    /// Runs the suite against one fresh session.
    fn run_session(
        &self,
        api: &ApiClient,
        seed: Option<u64>,
        cancel: &CancelToken,
    ) -> Result<RunReport, SetupError> {
        let started = Instant::now();
        api.record(&RunEvent::RunStarted {
            base_url: api.base_url().to_string(),
            scenarios: self.suite.len(),
        });
        let mut session = match SessionContext::initialize(api) {
            Ok(session) => session,
            Err(err) => {
                api.record(&RunEvent::SetupFailed {
                    error: err.to_string(),
                });
                return Err(err);
            }
        };
        let mut fixtures = seed.map_or_else(TodoFactory::from_entropy, TodoFactory::seeded);

        let mut passed: HashSet<&'static str> = HashSet::new();
        let mut records = Vec::with_capacity(self.suite.len());
        let mut cancelled = false;
        for scenario in &self.suite.scenarios {
            let mut record = ScenarioRecord::new(scenario);
            cancelled = cancelled || cancel.is_cancelled();
            let blocking =
                scenario.depends_on.iter().find(|dependency| !passed.contains(**dependency));
            let skip = if cancelled {
                Some(SkipReason::Cancelled)
            } else {
                blocking.map(|dependency| SkipReason::DependencyFailed {
                    blocking: (*dependency).to_string(),
                })
            };
            if let Some(reason) = skip {
                api.record(&RunEvent::ScenarioSkipped {
                    scenario: scenario.name.to_string(),
                    reason: reason.label(),
                });
                record.complete(
                    ScenarioStatus::Skipped {
                        reason,
                    },
                    None,
                );
                records.push(record);
                continue;
            }

            api.record(&RunEvent::ScenarioStarted {
                scenario: scenario.name.to_string(),
            });
            let scenario_started = Instant::now();
            let mut cx = ScenarioCx::new(api, &mut session, &mut fixtures, &self.settings)
                .expecting(&scenario.expected);
            let result = (scenario.run)(&mut cx);
            let elapsed_ms = elapsed_ms(scenario_started);
            let actual = cx.actual_outcome(elapsed_ms);
            let (status, category) = match result {
                Ok(()) => {
                    passed.insert(scenario.name);
                    (ScenarioStatus::Passed, None)
                }
                Err(err) => (ScenarioStatus::from_error(&err), Some(err.category())),
            };
            api.record(&RunEvent::ScenarioFinished {
                scenario: scenario.name.to_string(),
                passed: category.is_none(),
                category,
                elapsed_ms,
            });
            record.complete(status, Some(actual));
            records.push(record);
        }

        let oracle = if cancelled {
            OracleVerdict::NotEvaluated
        } else {
            ChallengeProgressOracle::assert_all_complete(api, &mut session)
        };
        api.record(&RunEvent::OracleEvaluated {
            verdict: oracle.label().to_string(),
            incomplete: oracle.incomplete_count(),
        });

        let report = RunReport {
            session_index: api.session_index(),
            session_token: session.token().clone(),
            scenarios: records,
            oracle,
            elapsed_ms: elapsed_ms(started),
        };
        let summary = report.summary();
        api.record(&RunEvent::RunFinished {
            passed: summary.passed,
            failed: summary.failed,
            skipped: summary.skipped,
            elapsed_ms: report.elapsed_ms,
        });
        Ok(report)
    }
}

/// Milliseconds since `started`, saturating.
fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
