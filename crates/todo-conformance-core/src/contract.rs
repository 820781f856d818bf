// crates/todo-conformance-core/src/contract.rs
// ============================================================================
// Module: Contract Validation
// Description: Declarative response contracts and a side-effect free validator.
// Purpose: Compare status, headers, and body against expectations bit-exactly.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Contract`] describes what a response must look like: an exact status,
//! header predicates, an optional body expectation, and an optional error
//! message matched against the first entry of the `errorMessages` envelope.
//! [`validate`] never stops at the first problem; it collects every
//! [`Mismatch`] with a field path so a report shows the whole picture.
//! Invariants:
//! - Validation is pure: same response and contract, same report.
//! - Header names are matched case-insensitively.
//! - Reported values are truncated to [`MAX_REPORTED_VALUE_CHARS`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::transport::HttpResponse;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum characters kept when echoing an actual value into a mismatch.
pub const MAX_REPORTED_VALUE_CHARS: usize = 256;
/// Field carrying error messages in the error envelope.
pub const ERROR_MESSAGES_FIELD: &str = "errorMessages";

// ============================================================================
// SECTION: Expectations
// ============================================================================

/// Header predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderExpectation {
    /// Header is present with any value.
    Present(String),
    /// Header value equals the given string exactly.
    Equals(String, String),
    /// Header value contains the given text (case-insensitive).
    Contains(String, String),
}

impl HeaderExpectation {
    /// Returns the header name this predicate inspects.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Present(name) | Self::Equals(name, _) | Self::Contains(name, _) => name,
        }
    }
}

/// Expected JSON structure.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyShape {
    /// Object has the named field.
    HasField(String),
    /// Object field equals a value.
    FieldEquals(String, Value),
    /// Object field exists and satisfies a nested shape.
    Field(String, Box<BodyShape>),
    /// Value is an array.
    IsArray,
    /// Array has exactly this many elements.
    Length(usize),
    /// Array is non-empty or object has at least one field.
    NonEmpty,
    /// Every array element satisfies the shape.
    Each(Box<BodyShape>),
    /// Value equals exactly.
    Equals(Value),
    /// Every shape holds.
    AllOf(Vec<BodyShape>),
}

impl BodyShape {
    /// Shape for an object field satisfying `shape`.
    #[must_use]
    pub fn field(name: impl Into<String>, shape: Self) -> Self {
        Self::Field(name.into(), Box::new(shape))
    }

    /// Shape for an array whose elements all satisfy `shape`.
    #[must_use]
    pub fn each(shape: Self) -> Self {
        Self::Each(Box::new(shape))
    }

    /// Shape for an object field equal to `value`.
    #[must_use]
    pub fn field_equals(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::FieldEquals(name.into(), value.into())
    }
}

/// Body predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyExpectation {
    /// Body has zero bytes.
    Empty,
    /// Body text contains every listed fragment.
    ContainsText(Vec<String>),
    /// Body parses as JSON and satisfies the shape.
    Json(BodyShape),
}

/// Full response contract.
///
/// # Invariants
/// - `status` is matched exactly.
/// - When `error_message` is set and the body is JSON, it must equal
///   `errorMessages[0]`; for any other body it must appear in the body text.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    /// Expected status code.
    pub status: u16,
    /// Header predicates.
    pub headers: Vec<HeaderExpectation>,
    /// Body expectations.
    pub body: Vec<BodyExpectation>,
    /// Expected first error message.
    pub error_message: Option<String>,
}

impl Contract {
    /// Creates a contract that only checks the status code.
    #[must_use]
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            error_message: None,
        }
    }

    /// Requires a header to be present.
    #[must_use]
    pub fn header_present(mut self, name: impl Into<String>) -> Self {
        self.headers.push(HeaderExpectation::Present(name.into()));
        self
    }

    /// Requires a header to equal `value`.
    #[must_use]
    pub fn header_equals(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderExpectation::Equals(name.into(), value.into()));
        self
    }

    /// Requires a header to contain `value`.
    #[must_use]
    pub fn header_contains(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderExpectation::Contains(name.into(), value.into()));
        self
    }

    /// Requires an empty body.
    #[must_use]
    pub fn empty_body(mut self) -> Self {
        self.body.push(BodyExpectation::Empty);
        self
    }

    /// Requires the body text to contain every fragment.
    #[must_use]
    pub fn body_contains<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments.into_iter().map(Into::into).collect();
        self.body.push(BodyExpectation::ContainsText(fragments));
        self
    }

    /// Requires a JSON body with the given shape.
    #[must_use]
    pub fn json(mut self, shape: BodyShape) -> Self {
        self.body.push(BodyExpectation::Json(shape));
        self
    }

    /// Requires the first error message to equal `message`.
    #[must_use]
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// One contract violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    /// Location of the violation (`status`, `headers.content-type`, `body.todos[0].id`).
    pub path: String,
    /// Expected value or predicate.
    pub expected: String,
    /// Observed value.
    pub actual: String,
}

impl Mismatch {
    /// Creates a mismatch, truncating the observed value.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl AsRef<str>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            actual: truncate(actual.as_ref()),
        }
    }
}

/// Validation outcome.
///
/// # Invariants
/// - The contract held iff `mismatches` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractReport {
    /// Status the contract expected.
    pub expected_status: u16,
    /// Status the response carried.
    pub actual_status: u16,
    /// Every violation found.
    pub mismatches: Vec<Mismatch>,
}

impl ContractReport {
    /// Returns true when the contract held.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl fmt::Display for ContractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected status {}, got {}; {} mismatch(es)",
            self.expected_status,
            self.actual_status,
            self.mismatches.len()
        )?;
        for mismatch in &self.mismatches {
            write!(
                f,
                "; {}: expected {}, actual {}",
                mismatch.path, mismatch.expected, mismatch.actual
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates `response` against `contract`, collecting every mismatch.
#[must_use]
pub fn validate(response: &HttpResponse, contract: &Contract) -> ContractReport {
    let mut mismatches = Vec::new();
    if response.status != contract.status {
        mismatches.push(Mismatch::new(
            "status",
            contract.status.to_string(),
            response.status.to_string(),
        ));
    }
    for expectation in &contract.headers {
        check_header(response, expectation, &mut mismatches);
    }
    let parsed = response.json();
    for expectation in &contract.body {
        check_body(response, parsed.as_ref(), expectation, &mut mismatches);
    }
    if let Some(message) = &contract.error_message {
        check_error_message(response, parsed.as_ref(), message, &mut mismatches);
    }
    ContractReport {
        expected_status: contract.status,
        actual_status: response.status,
        mismatches,
    }
}

/// Checks one header predicate.
fn check_header(response: &HttpResponse, expectation: &HeaderExpectation, out: &mut Vec<Mismatch>) {
    let name = expectation.name();
    let path = format!("headers.{}", name.to_ascii_lowercase());
    let actual = response.header(name);
    match (expectation, actual) {
        (HeaderExpectation::Present(_), Some(_)) => {}
        (HeaderExpectation::Equals(_, expected), Some(value)) if value == expected => {}
        (HeaderExpectation::Contains(_, expected), Some(value))
            if value.to_ascii_lowercase().contains(&expected.to_ascii_lowercase()) => {}
        (_, actual) => out.push(Mismatch::new(
            path,
            describe_header(expectation),
            actual.unwrap_or("<absent>"),
        )),
    }
}

/// Describes a header predicate for reports.
fn describe_header(expectation: &HeaderExpectation) -> String {
    match expectation {
        HeaderExpectation::Present(_) => "<present>".to_string(),
        HeaderExpectation::Equals(_, value) => value.clone(),
        HeaderExpectation::Contains(_, value) => format!("contains {value}"),
    }
}

/// Checks one body expectation.
fn check_body(
    response: &HttpResponse,
    parsed: Option<&Value>,
    expectation: &BodyExpectation,
    out: &mut Vec<Mismatch>,
) {
    match expectation {
        BodyExpectation::Empty => {
            if !response.body.is_empty() {
                out.push(Mismatch::new("body", "<empty>", response.body_text()));
            }
        }
        BodyExpectation::ContainsText(fragments) => {
            let text = response.body_text();
            for fragment in fragments {
                if !text.contains(fragment.as_str()) {
                    out.push(Mismatch::new("body", format!("contains {fragment}"), &text));
                }
            }
        }
        BodyExpectation::Json(shape) => match parsed {
            Some(value) => check_shape(value, shape, "body", out),
            None => out.push(Mismatch::new("body", "json document", response.body_text())),
        },
    }
}

/// Checks the first error message in the envelope.
fn check_error_message(
    response: &HttpResponse,
    parsed: Option<&Value>,
    message: &str,
    out: &mut Vec<Mismatch>,
) {
    let path = format!("body.{ERROR_MESSAGES_FIELD}[0]");
    match parsed {
        Some(value) => {
            let actual = value.get(ERROR_MESSAGES_FIELD).and_then(|messages| messages.get(0));
            match actual {
                Some(Value::String(text)) if text == message => {}
                Some(other) => out.push(Mismatch::new(path, message, render(other))),
                None => out.push(Mismatch::new(path, message, "<absent>")),
            }
        }
        None => {
            let text = response.body_text();
            if !text.contains(message) {
                out.push(Mismatch::new(path, message, text));
            }
        }
    }
}

/// Recursively checks a JSON shape, reporting paths relative to `path`.
fn check_shape(value: &Value, shape: &BodyShape, path: &str, out: &mut Vec<Mismatch>) {
    match shape {
        BodyShape::HasField(name) => {
            if value.get(name).is_none() {
                out.push(Mismatch::new(format!("{path}.{name}"), "<present>", "<absent>"));
            }
        }
        BodyShape::FieldEquals(name, expected) => {
            let field_path = format!("{path}.{name}");
            match value.get(name) {
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    out.push(Mismatch::new(field_path, render(expected), render(actual)));
                }
                None => out.push(Mismatch::new(field_path, render(expected), "<absent>")),
            }
        }
        BodyShape::Field(name, nested) => {
            let field_path = format!("{path}.{name}");
            match value.get(name) {
                Some(actual) => check_shape(actual, nested, &field_path, out),
                None => out.push(Mismatch::new(field_path, "<present>", "<absent>")),
            }
        }
        BodyShape::IsArray => {
            if !value.is_array() {
                out.push(Mismatch::new(path, "array", json_type(value)));
            }
        }
        BodyShape::Length(expected) => match value.as_array() {
            Some(items) if items.len() == *expected => {}
            Some(items) => out.push(Mismatch::new(
                format!("{path}.length"),
                expected.to_string(),
                items.len().to_string(),
            )),
            None => out.push(Mismatch::new(path, "array", json_type(value))),
        },
        BodyShape::NonEmpty => {
            let empty = match value {
                Value::Array(items) => items.is_empty(),
                Value::Object(fields) => fields.is_empty(),
                Value::String(text) => text.is_empty(),
                Value::Null => true,
                Value::Bool(_) | Value::Number(_) => false,
            };
            if empty {
                out.push(Mismatch::new(path, "non-empty", render(value)));
            }
        }
        BodyShape::Each(nested) => match value.as_array() {
            Some(items) => {
                for (index, item) in items.iter().enumerate() {
                    check_shape(item, nested, &format!("{path}[{index}]"), out);
                }
            }
            None => out.push(Mismatch::new(path, "array", json_type(value))),
        },
        BodyShape::Equals(expected) => {
            if value != expected {
                out.push(Mismatch::new(path, render(expected), render(value)));
            }
        }
        BodyShape::AllOf(shapes) => {
            for nested in shapes {
                check_shape(value, nested, path, out);
            }
        }
    }
}

/// Renders a JSON value compactly.
fn render(value: &Value) -> String {
    value.to_string()
}

/// Returns the JSON type name of a value.
const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Truncates long values for reports.
fn truncate(value: &str) -> String {
    if value.chars().count() <= MAX_REPORTED_VALUE_CHARS {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(MAX_REPORTED_VALUE_CHARS).collect();
    truncated.push_str("...");
    truncated
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
