// crates/todo-conformance-core/src/messages.rs
// ============================================================================
// Module: Error Message Templates
// Description: Parameterized error-message catalog for the todo API contract.
// Purpose: Bind ids, field names, and limits into exact expected message text.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! The target API reports failures as `{"errorMessages": ["..."]}` with fixed
//! wording that embeds runtime values. Each wording lives here once as a
//! [`MessageTemplate`] with `{name}` placeholders. Resolution fails on an
//! unbound placeholder instead of leaving the literal in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Display;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Template resolution failures.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A placeholder had no bound value.
    #[error("template {template} has unbound placeholder {{{placeholder}}}")]
    Unbound {
        /// Template name.
        template: &'static str,
        /// Placeholder name.
        placeholder: String,
    },
    /// A `{` was never closed.
    #[error("template {template} has an unterminated placeholder")]
    Unterminated {
        /// Template name.
        template: &'static str,
    },
}

// ============================================================================
// SECTION: Template Types
// ============================================================================

/// Named parameters bound into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateParams {
    /// Bound name/value pairs in insertion order.
    values: Vec<(&'static str, String)>,
}

impl TemplateParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: Vec::new(),
        }
    }

    /// Binds `name` to the display form of `value`. Later bindings win.
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl Display) -> Self {
        self.values.retain(|(existing, _)| *existing != name);
        self.values.push((name, value.to_string()));
        self
    }

    /// Returns the bound value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }
}

/// Error-message wording with `{name}` placeholders.
///
/// # Invariants
/// - `pattern` is the exact server wording with values replaced by placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageTemplate {
    /// Stable template name used in harness errors.
    pub name: &'static str,
    /// Message pattern.
    pub pattern: &'static str,
}

impl MessageTemplate {
    /// Resolves the template against `params`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when a placeholder is unbound or unterminated.
    pub fn resolve(&self, params: &TemplateParams) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(self.pattern.len());
        let mut rest = self.pattern;
        while let Some(start) = rest.find('{') {
            output.push_str(&rest[.. start]);
            let after = &rest[start + 1 ..];
            let end = after.find('}').ok_or(TemplateError::Unterminated {
                template: self.name,
            })?;
            let placeholder = &after[.. end];
            let value = params.get(placeholder).ok_or_else(|| TemplateError::Unbound {
                template: self.name,
                placeholder: placeholder.to_string(),
            })?;
            output.push_str(value);
            rest = &after[end + 1 ..];
        }
        output.push_str(rest);
        Ok(output)
    }

    /// Resolves a template that has no placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Unbound`] when the template does declare placeholders.
    pub fn literal(&self) -> Result<String, TemplateError> {
        self.resolve(&TemplateParams::new())
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Unknown id on a by-id GET.
pub const NOT_FOUND_INSTANCE: MessageTemplate = MessageTemplate {
    name: "not_found_instance",
    pattern: "Could not find an instance with todos/{id}",
};

/// Unknown id on a POST update.
pub const NO_SUCH_ENTITY: MessageTemplate = MessageTemplate {
    name: "no_such_entity",
    pattern: "No such todo entity instance with id == {id} found",
};

/// Field with the wrong JSON type.
pub const FIELD_TYPE: MessageTemplate = MessageTemplate {
    name: "field_type",
    pattern: "Failed Validation: {field} should be {expected} but was {actual}",
};

/// Field longer than its limit.
pub const FIELD_TOO_LONG: MessageTemplate = MessageTemplate {
    name: "field_too_long",
    pattern: "Failed Validation: Maximum allowable length exceeded for {field} - maximum allowed \
              is {max}",
};

/// Request body above the byte limit.
pub const BODY_TOO_LARGE: MessageTemplate = MessageTemplate {
    name: "body_too_large",
    pattern: "Error: Request body too large, max allowed is {max} bytes",
};

/// Field the resource does not declare.
pub const UNKNOWN_FIELD: MessageTemplate = MessageTemplate {
    name: "unknown_field",
    pattern: "Could not find field: {field}",
};

/// PUT against an id that does not exist.
pub const PUT_CREATE_FORBIDDEN: MessageTemplate = MessageTemplate {
    name: "put_create_forbidden",
    pattern: "Cannot create todo with PUT due to Auto fields id",
};

/// Mandatory field absent.
pub const FIELD_MANDATORY: MessageTemplate = MessageTemplate {
    name: "field_mandatory",
    pattern: "{field} : field is mandatory",
};

/// Body id differs from the path id.
pub const AMEND_ID: MessageTemplate = MessageTemplate {
    name: "amend_id",
    pattern: "Can not amend id from {from} to {to}",
};

/// No acceptable response media type.
pub const UNRECOGNISED_ACCEPT: MessageTemplate = MessageTemplate {
    name: "unrecognised_accept",
    pattern: "Unrecognised Accept Type",
};

/// Request body media type not supported.
pub const UNSUPPORTED_CONTENT_TYPE: MessageTemplate = MessageTemplate {
    name: "unsupported_content_type",
    pattern: "Unsupported Content Type - {content_type}",
};

/// Create past the per-session ceiling.
pub const CAPACITY_REACHED: MessageTemplate = MessageTemplate {
    name: "capacity_reached",
    pattern: "ERROR: Cannot add instance, maximum limit of {max} reached",
};

// ============================================================================
// SECTION: Tests
// ============================================================================
