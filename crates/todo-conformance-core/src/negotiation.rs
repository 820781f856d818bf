// crates/todo-conformance-core/src/negotiation.rs
// ============================================================================
// Module: Content Negotiation Matrix
// Description: Pure precedence rules for Accept and Content-Type handling.
// Purpose: Predict the status and encoding the target must produce.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The target supports JSON and XML on both axes. The request axis
//! (`Content-Type`) and the response axis (`Accept`) are resolved
//! independently and then combined: an unsupported request body (415) wins
//! over an unacceptable response type (406) because the body is rejected
//! before any response is rendered.
//! Invariants:
//! - Resolution is pure and idempotent.
//! - Absent, blank, and `*/*` Accept values all resolve to JSON.
//! - Media ranges are scanned left to right; the first recognized one decides.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::contract::Contract;
use crate::messages::TemplateError;
use crate::messages::TemplateParams;
use crate::messages::UNRECOGNISED_ACCEPT;
use crate::messages::UNSUPPORTED_CONTENT_TYPE;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Wire encoding for todo payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// `application/json`.
    Json,
    /// `application/xml`.
    Xml,
}

impl Encoding {
    /// Returns the media type for this encoding.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
        }
    }
}

/// Reason a request is refused during negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No listed media range is producible (406).
    UnrecognisedAccept,
    /// Request body media type is not supported (415); value kept verbatim.
    UnsupportedContentType(String),
}

impl Rejection {
    /// Returns the status code the target must answer with.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::UnrecognisedAccept => 406,
            Self::UnsupportedContentType(_) => 415,
        }
    }

    /// Returns the expected error message.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when the message template cannot be bound.
    pub fn message(&self) -> Result<String, TemplateError> {
        match self {
            Self::UnrecognisedAccept => UNRECOGNISED_ACCEPT.literal(),
            Self::UnsupportedContentType(value) => {
                UNSUPPORTED_CONTENT_TYPE.resolve(&TemplateParams::new().with("content_type", value))
            }
        }
    }
}

/// Combined outcome of both negotiation axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Request accepted; payloads use these encodings.
    Accepted {
        /// Encoding of the request body.
        request: Encoding,
        /// Encoding of the response body.
        response: Encoding,
    },
    /// Request refused.
    Rejected(Rejection),
}

impl Resolution {
    /// Returns the expected status for a request whose success status is
    /// `success_status`.
    #[must_use]
    pub const fn status(&self, success_status: u16) -> u16 {
        match self {
            Self::Accepted {
                ..
            } => success_status,
            Self::Rejected(rejection) => rejection.status(),
        }
    }

    /// Returns the response encoding (error bodies for 406 are JSON).
    #[must_use]
    pub const fn response_encoding(&self) -> Encoding {
        match self {
            Self::Accepted {
                response, ..
            } => *response,
            Self::Rejected(_) => Encoding::Json,
        }
    }

    /// Builds the response contract for this resolution.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] when the rejection message cannot be bound.
    pub fn contract(&self, success_status: u16) -> Result<Contract, TemplateError> {
        match self {
            Self::Accepted {
                response, ..
            } => Ok(Contract::status(success_status)
                .header_contains("content-type", response.media_type())),
            Self::Rejected(rejection @ Rejection::UnrecognisedAccept) => {
                Ok(Contract::status(rejection.status())
                    .header_contains("content-type", Encoding::Json.media_type())
                    .error_message(rejection.message()?))
            }
            Self::Rejected(rejection) => {
                Ok(Contract::status(rejection.status()).error_message(rejection.message()?))
            }
        }
    }
}

// ============================================================================
// SECTION: Matrix
// ============================================================================

/// Negotiation precedence rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentNegotiationMatrix;

impl ContentNegotiationMatrix {
    /// Resolves the response encoding for an `Accept` header value.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::UnrecognisedAccept`] when no listed range is producible.
    pub fn resolve_accept(accept: Option<&str>) -> Result<Encoding, Rejection> {
        let Some(accept) = accept.filter(|value| !value.trim().is_empty()) else {
            return Ok(Encoding::Json);
        };
        accept
            .split(',')
            .filter_map(|range| match media_essence(range).as_str() {
                "*/*" | "application/json" => Some(Encoding::Json),
                "application/xml" => Some(Encoding::Xml),
                _ => None,
            })
            .next()
            .ok_or(Rejection::UnrecognisedAccept)
    }

    /// Resolves the request encoding for a `Content-Type` header value.
    ///
    /// # Errors
    ///
    /// Returns [`Rejection::UnsupportedContentType`] with the verbatim value when
    /// the media type is neither JSON nor XML.
    pub fn resolve_content_type(content_type: Option<&str>) -> Result<Encoding, Rejection> {
        let Some(value) = content_type.filter(|value| !value.trim().is_empty()) else {
            return Ok(Encoding::Json);
        };
        match media_essence(value).as_str() {
            "application/json" => Ok(Encoding::Json),
            "application/xml" => Ok(Encoding::Xml),
            _ => Err(Rejection::UnsupportedContentType(value.to_string())),
        }
    }

    /// Resolves both axes; a request-axis rejection wins.
    #[must_use]
    pub fn resolve(accept: Option<&str>, content_type: Option<&str>) -> Resolution {
        let request = match Self::resolve_content_type(content_type) {
            Ok(encoding) => encoding,
            Err(rejection) => return Resolution::Rejected(rejection),
        };
        match Self::resolve_accept(accept) {
            Ok(response) => Resolution::Accepted {
                request,
                response,
            },
            Err(rejection) => Resolution::Rejected(rejection),
        }
    }
}

/// Lowercased media type with parameters removed.
fn media_essence(value: &str) -> String {
    value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

// ============================================================================
// SECTION: Case Table
// ============================================================================

/// One negotiation case exercised against the target.
///
/// # Invariants
/// - Cases with a `content_type` describe a create (`POST /todos`); all others
///   describe a list (`GET /todos`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentNegotiationCase {
    /// Case name.
    pub name: &'static str,
    /// `Accept` header, if sent.
    pub accept: Option<&'static str>,
    /// `Content-Type` header, if sent.
    pub content_type: Option<&'static str>,
    /// Expected status.
    pub expected_status: u16,
    /// Expected response encoding.
    pub expected_encoding: Encoding,
}

impl ContentNegotiationCase {
    /// Returns true when the case sends a request body.
    #[must_use]
    pub const fn is_create(&self) -> bool {
        self.content_type.is_some()
    }

    /// Returns the success status for the request kind.
    #[must_use]
    pub const fn success_status(&self) -> u16 {
        if self.is_create() { 201 } else { 200 }
    }
}

/// Static negotiation table.
pub const NEGOTIATION_CASES: &[ContentNegotiationCase] = &[
    ContentNegotiationCase {
        name: "accept_xml",
        accept: Some("application/xml"),
        content_type: None,
        expected_status: 200,
        expected_encoding: Encoding::Xml,
    },
    ContentNegotiationCase {
        name: "accept_json",
        accept: Some("application/json"),
        content_type: None,
        expected_status: 200,
        expected_encoding: Encoding::Json,
    },
    ContentNegotiationCase {
        name: "accept_any",
        accept: Some("*/*"),
        content_type: None,
        expected_status: 200,
        expected_encoding: Encoding::Json,
    },
    ContentNegotiationCase {
        name: "accept_xml_preferred",
        accept: Some("application/xml, application/json"),
        content_type: None,
        expected_status: 200,
        expected_encoding: Encoding::Xml,
    },
    ContentNegotiationCase {
        name: "accept_empty",
        accept: Some(""),
        content_type: None,
        expected_status: 200,
        expected_encoding: Encoding::Json,
    },
    ContentNegotiationCase {
        name: "accept_absent",
        accept: None,
        content_type: None,
        expected_status: 200,
        expected_encoding: Encoding::Json,
    },
    ContentNegotiationCase {
        name: "accept_unsupported",
        accept: Some("application/gzip"),
        content_type: None,
        expected_status: 406,
        expected_encoding: Encoding::Json,
    },
    ContentNegotiationCase {
        name: "content_type_xml",
        accept: None,
        content_type: Some("application/xml"),
        expected_status: 201,
        expected_encoding: Encoding::Json,
    },
    ContentNegotiationCase {
        name: "content_type_json",
        accept: None,
        content_type: Some("application/json"),
        expected_status: 201,
        expected_encoding: Encoding::Json,
    },
    ContentNegotiationCase {
        name: "content_type_unsupported",
        accept: None,
        content_type: Some("application/bogus"),
        expected_status: 415,
        expected_encoding: Encoding::Json,
    },
    ContentNegotiationCase {
        name: "mixed_accept_json_content_xml",
        accept: Some("application/json"),
        content_type: Some("application/xml"),
        expected_status: 201,
        expected_encoding: Encoding::Json,
    },
    ContentNegotiationCase {
        name: "mixed_accept_xml_content_json",
        accept: Some("application/xml"),
        content_type: Some("application/json"),
        expected_status: 201,
        expected_encoding: Encoding::Xml,
    },
];

/// Looks up a case by name.
#[must_use]
pub fn case(name: &str) -> Option<&'static ContentNegotiationCase> {
    NEGOTIATION_CASES.iter().find(|case| case.name == name)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
