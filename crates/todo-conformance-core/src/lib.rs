// crates/todo-conformance-core/src/lib.rs
// ============================================================================
// Module: Todo Conformance Core Library
// Description: Session state, contract validation, and scenario orchestration.
// Purpose: Drive a remote todo API through ordered scenarios and judge it bit-exactly.
// Dependencies: base64, rand, reqwest, serde, serde_json, thiserror, url
// ============================================================================

//! ## Overview
//! Todo Conformance Core drives a stateful todo API (sessions, content
//! negotiation, authentication, capacity limits) through a dependency-ordered
//! scenario catalog and validates status codes, headers, and error-message text
//! against a known contract.
//! Invariants:
//! - One [`SessionContext`] is owned by one run and passed by reference into
//!   every scenario; there is no ambient state.
//! - Scenarios execute in topological order; a scenario whose dependency did not
//!   pass is skipped, never failed.
//! - A missing session token is fatal for the run ([`SetupError`]).
//!
//! The remote service is a black box: requests cross the [`Transport`] seam,
//! which has a blocking `reqwest` implementation and can be substituted in tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod capacity;
pub mod contract;
pub mod error;
pub mod events;
pub mod fixtures;
pub mod messages;
pub mod negotiation;
pub mod oracle;
pub mod orchestrator;
pub mod record;
pub mod report;
pub mod resource;
pub mod scenario;
pub mod scenarios;
pub mod session;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use capacity::CapacityBoundaryProbe;
pub use capacity::CapacityReport;
pub use contract::BodyExpectation;
pub use contract::BodyShape;
pub use contract::Contract;
pub use contract::ContractReport;
pub use contract::HeaderExpectation;
pub use contract::Mismatch;
pub use contract::validate;
pub use error::FailureCategory;
pub use error::ScenarioError;
pub use error::SetupError;
pub use error::SuiteError;
pub use events::EventSink;
pub use events::JsonLinesEventSink;
pub use events::NoopEventSink;
pub use events::RunEvent;
pub use fixtures::TodoFactory;
pub use messages::MessageTemplate;
pub use messages::TemplateError;
pub use messages::TemplateParams;
pub use negotiation::ContentNegotiationCase;
pub use negotiation::ContentNegotiationMatrix;
pub use negotiation::Encoding;
pub use negotiation::Rejection;
pub use negotiation::Resolution;
pub use oracle::ChallengeProgressOracle;
pub use oracle::OracleVerdict;
pub use orchestrator::CancelToken;
pub use orchestrator::ScenarioOrchestrator;
pub use orchestrator::ScenarioSuite;
pub use record::ActualOutcome;
pub use record::ExpectedOutcome;
pub use record::ScenarioRecord;
pub use record::ScenarioStatus;
pub use record::SkipReason;
pub use report::RunReport;
pub use report::RunSummary;
pub use resource::CreateExpectation;
pub use resource::Todo;
pub use resource::TodoDraft;
pub use resource::TodoLimits;
pub use resource::parse_todo_id;
pub use resource::xml_todo_id;
pub use scenario::Credentials;
pub use scenario::Scenario;
pub use scenario::ScenarioCx;
pub use scenario::ScenarioFn;
pub use scenario::ScenarioGroup;
pub use scenario::SuiteSettings;
pub use session::AuthToken;
pub use session::ProgressMap;
pub use session::SessionContext;
pub use session::SessionToken;
pub use session::response_todo_id;
pub use session::todo_id;
pub use transport::ApiClient;
pub use transport::HttpMethod;
pub use transport::HttpRequest;
pub use transport::HttpResponse;
pub use transport::ReqwestTransport;
pub use transport::Transport;
pub use transport::TransportConfig;
pub use transport::TransportError;

