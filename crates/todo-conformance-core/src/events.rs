// crates/todo-conformance-core/src/events.rs
// ============================================================================
// Module: Run Events
// Description: Structured run events and pluggable sinks for run telemetry.
// Purpose: Record requests, scenario lifecycle, and verdicts as JSON lines.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every request and every scenario transition is described by a [`RunEvent`]
//! and handed to an [`EventSink`]. The default sink drops events; the
//! [`JsonLinesEventSink`] writes one JSON object per line to any writer.
//! Invariants:
//! - Sequence numbers are strictly increasing per sink, starting at 1.
//! - Events never carry request or response bodies.
//! - Sink failures never abort a run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::error::FailureCategory;
use crate::transport::HttpMethod;

// ============================================================================
// SECTION: Event Payloads
// ============================================================================

/// Run lifecycle and request events.
///
/// # Invariants
/// - Variants are stable for log consumers; the `event` tag is snake case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    /// A run began against `base_url` with `scenarios` scheduled.
    RunStarted {
        /// Target base URL.
        base_url: String,
        /// Number of scheduled scenarios.
        scenarios: usize,
    },
    /// Session initialization failed; no scenarios ran.
    SetupFailed {
        /// Failure detail.
        error: String,
    },
    /// A request was handed to the transport.
    RequestSent {
        /// Request method.
        method: HttpMethod,
        /// Request path.
        path: String,
    },
    /// A response was received.
    ResponseReceived {
        /// Request method.
        method: HttpMethod,
        /// Request path.
        path: String,
        /// Response status.
        status: u16,
        /// Round-trip latency in milliseconds.
        elapsed_ms: u64,
    },
    /// The transport failed before a response was received.
    RequestFailed {
        /// Request method.
        method: HttpMethod,
        /// Request path.
        path: String,
        /// Transport error detail.
        error: String,
    },
    /// A scenario started executing.
    ScenarioStarted {
        /// Scenario name.
        scenario: String,
    },
    /// A scenario completed with a pass or fail verdict.
    ScenarioFinished {
        /// Scenario name.
        scenario: String,
        /// Whether all assertions held.
        passed: bool,
        /// Failure category when the scenario failed.
        #[serde(skip_serializing_if = "Option::is_none")]
        category: Option<FailureCategory>,
        /// Execution time in milliseconds.
        elapsed_ms: u64,
    },
    /// A scenario was skipped without executing.
    ScenarioSkipped {
        /// Scenario name.
        scenario: String,
        /// Skip reason label.
        reason: String,
    },
    /// The progress oracle produced a verdict.
    OracleEvaluated {
        /// Verdict label.
        verdict: String,
        /// Number of flags that are not yet complete.
        incomplete: usize,
    },
    /// The run finished.
    RunFinished {
        /// Scenarios that passed.
        passed: usize,
        /// Scenarios that failed.
        failed: usize,
        /// Scenarios that were skipped.
        skipped: usize,
        /// Total run time in milliseconds.
        elapsed_ms: u64,
    },
}

impl RunEvent {
    /// Returns the stable event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RunStarted {
                ..
            } => "run_started",
            Self::SetupFailed {
                ..
            } => "setup_failed",
            Self::RequestSent {
                ..
            } => "request_sent",
            Self::ResponseReceived {
                ..
            } => "response_received",
            Self::RequestFailed {
                ..
            } => "request_failed",
            Self::ScenarioStarted {
                ..
            } => "scenario_started",
            Self::ScenarioFinished {
                ..
            } => "scenario_finished",
            Self::ScenarioSkipped {
                ..
            } => "scenario_skipped",
            Self::OracleEvaluated {
                ..
            } => "oracle_evaluated",
            Self::RunFinished {
                ..
            } => "run_finished",
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Receives run events.
pub trait EventSink: Send + Sync {
    /// Records one event for the session at `session`.
    fn record(&self, session: usize, event: &RunEvent);
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _session: usize, _event: &RunEvent) {}
}

/// Serialized line layout for [`JsonLinesEventSink`].
#[derive(Serialize)]
struct EventLine<'a> {
    /// Sink-local sequence number.
    seq: u64,
    /// Wall-clock time in milliseconds since the Unix epoch.
    timestamp_ms: u64,
    /// Session index.
    session: usize,
    /// Event payload.
    #[serde(flatten)]
    event: &'a RunEvent,
}

/// Writer-backed sink emitting one JSON object per line.
///
/// # Invariants
/// - Lines are written whole under a single lock, so concurrent sessions never
///   interleave partial lines.
pub struct JsonLinesEventSink<W: Write + Send> {
    /// Output writer.
    writer: Mutex<W>,
    /// Next sequence number.
    counter: AtomicU64,
    /// Number of lines that failed to serialize or write.
    failures: AtomicU64,
}

impl<W: Write + Send> JsonLinesEventSink<W> {
    /// Creates a sink writing to `writer`.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            counter: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Returns the number of events that could not be written.
    #[must_use]
    pub fn write_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Consumes the sink and returns the writer.
    ///
    /// # Errors
    ///
    /// Returns the poisoned writer when a writer thread panicked.
    pub fn into_inner(self) -> Result<W, std::sync::PoisonError<W>> {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> EventSink for JsonLinesEventSink<W> {
    fn record(&self, session: usize, event: &RunEvent) {
        let line = EventLine {
            seq: self.counter.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp_ms: now_millis(),
            session,
            event,
        };
        let Ok(mut bytes) = serde_json::to_vec(&line) else {
            self.failures.fetch_add(1, Ordering::Relaxed);
            return;
        };
        bytes.push(b'\n');
        let written = self.writer.lock().is_ok_and(|mut writer| {
            writer.write_all(&bytes).and_then(|()| writer.flush()).is_ok()
        });
        if !written {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Returns wall-clock milliseconds since the Unix epoch, or zero when the
/// clock is before the epoch.
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
