// crates/todo-conformance-core/src/capacity.rs
// ============================================================================
// Module: Capacity Boundary Probe
// Description: Fills a session to its todo ceiling and probes one past it.
// Purpose: Verify the ceiling is enforced with the fixed refusal message.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The probe never assumes how many todos a session holds: it reads the count,
//! tops it up to the ceiling one create at a time, then asserts that the next
//! create is refused. Leftover todos from earlier scenarios only shorten the
//! fill phase.
//! Invariants:
//! - The session never holds more todos than the ceiling after the probe.
//! - The boundary create is attempted exactly once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::contract::BodyShape;
use crate::contract::Contract;
use crate::contract::ContractReport;
use crate::contract::ERROR_MESSAGES_FIELD;
use crate::contract::validate;
use crate::error::ScenarioError;
use crate::messages::CAPACITY_REACHED;
use crate::messages::TemplateParams;
use crate::negotiation::Encoding;
use crate::resource::TodoLimits;
use crate::scenario::ScenarioCx;
use crate::session::TODOS_PATH;
use crate::session::todo_id;
use crate::transport::HttpMethod;

// ============================================================================
// SECTION: Report
// ============================================================================

/// Outcome of a completed probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityReport {
    /// Todos present before the probe.
    pub existing: usize,
    /// Todos created to reach the ceiling.
    pub created: usize,
    /// Ceiling probed.
    pub ceiling: usize,
    /// Validation of the refused create.
    pub boundary: ContractReport,
}

// ============================================================================
// SECTION: Probe
// ============================================================================

/// Probe of the per-session todo ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityBoundaryProbe {
    /// Limits whose `max_todos` is the ceiling.
    limits: TodoLimits,
}

impl CapacityBoundaryProbe {
    /// Creates a probe for `limits`.
    #[must_use]
    pub const fn new(limits: TodoLimits) -> Self {
        Self {
            limits,
        }
    }

    /// Returns the contract the refused create must satisfy.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Harness`] when the message template is invalid.
    pub fn boundary_contract(&self) -> Result<Contract, ScenarioError> {
        let message =
            CAPACITY_REACHED.resolve(&TemplateParams::new().with("max", self.limits.max_todos))?;
        Ok(Contract::status(400)
            .json(BodyShape::field(ERROR_MESSAGES_FIELD, BodyShape::IsArray))
            .error_message(message))
    }

    /// Runs the probe inside a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError`] when a fill create fails, the boundary create
    /// is not refused as expected, or the count ends above the ceiling.
    pub fn run(&self, cx: &mut ScenarioCx<'_>) -> Result<CapacityReport, ScenarioError> {
        let ceiling = self.limits.max_todos;
        let existing = cx.session.refresh_resource_ids(cx.api)?.len();
        let mut count = existing;
        let mut created = 0;
        while count < ceiling {
            let draft = cx.fixtures.draft(&self.limits);
            let request = cx.request(HttpMethod::Post, TODOS_PATH).json_body(&draft.to_json());
            let response = cx.expect(&request, &draft.created_contract(Encoding::Json))?;
            if let Some(id) = response.json().as_ref().and_then(todo_id) {
                cx.session.observe_id(id);
            }
            count += 1;
            created += 1;
        }

        let contract = self.boundary_contract()?;
        let draft = cx.fixtures.draft(&self.limits);
        let request = cx.request(HttpMethod::Post, TODOS_PATH).json_body(&draft.to_json());
        let response = cx.send(&request)?;
        let boundary = validate(&response, &contract);
        cx.check(&response, &contract)?;

        let after = cx.session.refresh_resource_ids(cx.api)?.len();
        cx.ensure(
            after <= ceiling,
            "body.todos.length",
            &format!("at most {ceiling}"),
            after.to_string(),
        )?;
        Ok(CapacityReport {
            existing,
            created,
            ceiling,
            boundary,
        })
    }
}
