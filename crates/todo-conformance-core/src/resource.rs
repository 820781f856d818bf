// crates/todo-conformance-core/src/resource.rs
// ============================================================================
// Module: Todo Resource Model
// Description: Todo payloads, resource limits, and create-request prediction.
// Purpose: Encode the target's validation rules as an expected contract.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The todo resource carries a server-assigned `id`, a `title`, a
//! `description`, and a `doneStatus` flag. [`CreateExpectation::predict`]
//! applies the target's validation rules in the order the target applies
//! them and yields the contract a create request must satisfy.
//! Invariants:
//! - Lengths are measured in characters, body size in encoded bytes.
//! - The first failing rule decides the expected error; later rules are not
//!   consulted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::Error as _;
use serde_json::Map;
use serde_json::Value;

use crate::contract::BodyShape;
use crate::contract::Contract;
use crate::contract::ERROR_MESSAGES_FIELD;
use crate::messages::BODY_TOO_LARGE;
use crate::messages::CAPACITY_REACHED;
use crate::messages::FIELD_MANDATORY;
use crate::messages::FIELD_TOO_LONG;
use crate::messages::FIELD_TYPE;
use crate::messages::MessageTemplate;
use crate::messages::TemplateError;
use crate::messages::TemplateParams;
use crate::messages::UNKNOWN_FIELD;
use crate::negotiation::Encoding;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum todos per session.
pub const MAX_TODOS: usize = 20;
/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 50;
/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;
/// Maximum request body size in bytes.
pub const MAX_BODY_BYTES: usize = 5000;

/// Title field name.
pub const FIELD_TITLE: &str = "title";
/// Description field name.
pub const FIELD_DESCRIPTION: &str = "description";
/// Done flag field name.
pub const FIELD_DONE_STATUS: &str = "doneStatus";
/// Identifier field name.
pub const FIELD_ID: &str = "id";

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Resource limits enforced by the target.
///
/// # Invariants
/// - Defaults match the public todo API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TodoLimits {
    /// Maximum todos per session.
    pub max_todos: usize,
    /// Maximum title length in characters.
    pub max_title_chars: usize,
    /// Maximum description length in characters.
    pub max_description_chars: usize,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for TodoLimits {
    fn default() -> Self {
        Self {
            max_todos: MAX_TODOS,
            max_title_chars: MAX_TITLE_CHARS,
            max_description_chars: MAX_DESCRIPTION_CHARS,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// A todo as returned by the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Server-assigned identifier.
    #[serde(deserialize_with = "deserialize_todo_id")]
    pub id: u64,
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Completion flag.
    #[serde(default)]
    pub done_status: bool,
}

/// Client-side todo payload for create and update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoDraft {
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Completion flag.
    pub done_status: bool,
}

impl TodoDraft {
    /// Returns the JSON object form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert(FIELD_TITLE.to_string(), Value::String(self.title.clone()));
        object.insert(FIELD_DONE_STATUS.to_string(), Value::Bool(self.done_status));
        object.insert(FIELD_DESCRIPTION.to_string(), Value::String(self.description.clone()));
        Value::Object(object)
    }

    /// Returns the XML document form.
    #[must_use]
    pub fn to_xml(&self) -> String {
        format!(
            concat!(
                "<todo><title>{}</title><doneStatus>{}</doneStatus>",
                "<description>{}</description></todo>"
            ),
            escape_xml(&self.title),
            self.done_status,
            escape_xml(&self.description)
        )
    }

    /// Returns the contract for a successful create echoing this draft.
    #[must_use]
    pub fn created_contract(&self, encoding: Encoding) -> Contract {
        let contract = Contract::status(201).header_contains("content-type", encoding.media_type());
        match encoding {
            Encoding::Json => contract.json(BodyShape::AllOf(vec![
                BodyShape::HasField(FIELD_ID.to_string()),
                BodyShape::field_equals(FIELD_TITLE, self.title.clone()),
                BodyShape::field_equals(FIELD_DONE_STATUS, self.done_status),
                BodyShape::field_equals(FIELD_DESCRIPTION, self.description.clone()),
            ])),
            Encoding::Xml => contract.body_contains([
                "<todo>".to_string(),
                "<id>".to_string(),
                format!("<title>{}</title>", escape_xml(&self.title)),
                format!("<doneStatus>{}</doneStatus>", self.done_status),
                format!("<description>{}</description>", escape_xml(&self.description)),
            ]),
        }
    }
}

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Parses a todo id that the target may send as a number or numeric string.
#[must_use]
pub fn parse_todo_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Extracts the first `<id>` element of an XML todo document.
#[must_use]
pub fn xml_todo_id(body: &str) -> Option<u64> {
    let start = body.find("<id>")? + "<id>".len();
    let end = body[start ..].find("</id>")? + start;
    body[start .. end].trim().parse().ok()
}

/// Deserializes a todo id with the leniency of [`parse_todo_id`].
fn deserialize_todo_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_todo_id(&value)
        .ok_or_else(|| D::Error::custom(format!("todo id {value} is not a non-negative integer")))
}

/// Escapes XML text content.
fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

// ============================================================================
// SECTION: Create Prediction
// ============================================================================

/// Expected outcome of `POST /todos`.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateExpectation {
    /// 201 echoing the submitted fields.
    Created {
        /// Submitted fields to echo.
        fields: Map<String, Value>,
    },
    /// Rejected with a status and templated message.
    Rejected {
        /// Expected status.
        status: u16,
        /// Message template.
        template: MessageTemplate,
        /// Template parameters.
        params: TemplateParams,
    },
}

impl CreateExpectation {
    /// Predicts the target's answer to a create request.
    ///
    /// `encoded_len` is the request body size in bytes as sent; `existing` is
    /// the number of todos the session holds before the request.
    #[must_use]
    pub fn predict(body: &Value, encoded_len: usize, existing: usize, limits: &TodoLimits) -> Self {
        if encoded_len > limits.max_body_bytes {
            let params = TemplateParams::new().with("max", limits.max_body_bytes);
            return reject(413, BODY_TOO_LARGE, params);
        }
        let empty = Map::new();
        let fields = body.as_object().unwrap_or(&empty);
        let known = [FIELD_TITLE, FIELD_DESCRIPTION, FIELD_DONE_STATUS];
        if let Some(unknown) = fields.keys().find(|key| !known.contains(&key.as_str())) {
            return reject(400, UNKNOWN_FIELD, TemplateParams::new().with("field", unknown));
        }
        let typed = [
            (FIELD_DONE_STATUS, "BOOLEAN"),
            (FIELD_TITLE, "STRING"),
            (FIELD_DESCRIPTION, "STRING"),
        ];
        for (field, expected) in typed {
            if let Some(value) = fields.get(field) {
                let actual = type_name(value);
                if actual != expected {
                    return reject(
                        400,
                        FIELD_TYPE,
                        TemplateParams::new()
                            .with("field", field)
                            .with("expected", expected)
                            .with("actual", actual),
                    );
                }
            }
        }
        let lengths = [
            (FIELD_TITLE, limits.max_title_chars),
            (FIELD_DESCRIPTION, limits.max_description_chars),
        ];
        for (field, max) in lengths {
            let length =
                fields.get(field).and_then(Value::as_str).map_or(0, |text| text.chars().count());
            if length > max {
                return reject(
                    400,
                    FIELD_TOO_LONG,
                    TemplateParams::new().with("field", field).with("max", max),
                );
            }
        }
        if !fields.contains_key(FIELD_TITLE) {
            return reject(400, FIELD_MANDATORY, TemplateParams::new().with("field", FIELD_TITLE));
        }
        if existing >= limits.max_todos {
            let params = TemplateParams::new().with("max", limits.max_todos);
            return reject(400, CAPACITY_REACHED, params);
        }
        Self::Created {
            fields: fields.clone(),
        }
    }

    /// Returns the expected status.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Created {
                ..
            } => 201,
            Self::Rejected {
                status, ..
            } => *status,
        }
    }

    /// Builds the response contract for a JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when the expected message cannot be bound.
    pub fn contract(&self) -> Result<Contract, TemplateError> {
        match self {
            Self::Created {
                fields,
            } => {
                let mut shapes = vec![BodyShape::HasField(FIELD_ID.to_string())];
                shapes.extend(
                    fields
                        .iter()
                        .map(|(name, value)| BodyShape::field_equals(name.clone(), value.clone())),
                );
                Ok(Contract::status(201).json(BodyShape::AllOf(shapes)))
            }
            Self::Rejected {
                status,
                template,
                params,
            } => Ok(Contract::status(*status)
                .json(BodyShape::field(ERROR_MESSAGES_FIELD, BodyShape::IsArray))
                .error_message(template.resolve(params)?)),
        }
    }
}

/// Builds a rejection.
fn reject(status: u16, template: MessageTemplate, params: TemplateParams) -> CreateExpectation {
    CreateExpectation::Rejected {
        status,
        template,
        params,
    }
}

/// Returns the type label the target uses in validation messages.
#[must_use]
pub const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) => "BOOLEAN",
        Value::Number(_) => "NUMBER",
        Value::String(_) => "STRING",
        Value::Array(_) => "ARRAY",
        Value::Object(_) => "OBJECT",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
