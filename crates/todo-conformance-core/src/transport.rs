// crates/todo-conformance-core/src/transport.rs
// ============================================================================
// Module: Conformance Transport
// Description: Blocking request/response seam between scenarios and the target API.
// Purpose: Issue bounded HTTP calls and capture status, headers, and body verbatim.
// Dependencies: reqwest, url, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Scenarios never talk to the network directly. They build an [`HttpRequest`]
//! and hand it to an [`ApiClient`], which resolves the target URL against the
//! configured base URL, records request events, and delegates to a
//! [`Transport`]. [`ReqwestTransport`] is the production implementation; tests
//! substitute an in-process simulation.
//! Invariants:
//! - Each call is one blocking request/response unit; no streaming.
//! - Redirects are never followed so status codes are observed as sent.
//! - Response bodies are capped at [`TransportConfig::max_response_bytes`].
//! - Header names are compared case-insensitively.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::events::EventSink;
use crate::events::NoopEventSink;
use crate::events::RunEvent;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default cap on response bodies, in bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Default request timeout, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Header carrying the session token on every scoped request.
pub const CHALLENGER_HEADER: &str = "x-challenger";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport-level failures. These are infrastructure problems, never contract
/// assertions.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Base URL failed to parse or cannot carry paths.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// Request path could not be joined onto the base URL.
    #[error("invalid request target {path}: {reason}")]
    InvalidTarget {
        /// Request path as supplied by the scenario.
        path: String,
        /// Parse failure detail.
        reason: String,
    },
    /// HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    ClientBuild(String),
    /// Request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),
    /// Response body exceeded the configured limit.
    #[error("response body exceeds {0} bytes")]
    ResponseTooLarge(usize),
    /// Response body could not be read.
    #[error("failed to read response: {0}")]
    ResponseRead(String),
}

// ============================================================================
// SECTION: Request and Response Descriptors
// ============================================================================

/// HTTP methods used by the conformance suite.
///
/// # Invariants
/// - Labels are the uppercase wire method names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    Get,
    /// HEAD.
    Head,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
    /// OPTIONS.
    Options,
    /// TRACE.
    Trace,
}

impl HttpMethod {
    /// Returns the wire method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound request descriptor.
///
/// # Invariants
/// - `path` is relative to the client base URL.
/// - Headers are sent in insertion order; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Path relative to the base URL (leading slash optional).
    pub path: String,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Optional raw request body.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with no headers, query, or body.
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets a JSON body, adding `Content-Type: application/json` unless a
    /// content type was already set.
    #[must_use]
    pub fn json_body(self, value: &Value) -> Self {
        let request = if self.header_value("content-type").is_some() {
            self
        } else {
            self.header("Content-Type", "application/json")
        };
        request.raw_body(value.to_string())
    }

    /// Sets the body bytes verbatim without touching headers.
    #[must_use]
    pub fn raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Returns the first header value matching `name` (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Captured response descriptor.
///
/// # Invariants
/// - `body` is the full response body as received (bounded by the transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Response headers as received.
    pub headers: Vec<(String, String)>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with the given status and no headers or body.
    #[must_use]
    pub const fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body bytes.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the first header value matching `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Returns the body decoded as UTF-8 (lossy).
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON, returning `None` when it is not valid JSON.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Finds a header value by case-insensitive name.
fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

// ============================================================================
// SECTION: Transport Trait
// ============================================================================

/// Sends one request and returns the captured response.
pub trait Transport: Send + Sync {
    /// Sends `request` to the fully resolved `url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the request cannot be delivered or the
    /// response cannot be read.
    fn send(&self, url: &Url, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// SECTION: Reqwest Transport
// ============================================================================

/// Configuration for [`ReqwestTransport`].
///
/// # Invariants
/// - `timeout_ms` applies to the full request lifecycle.
/// - `max_response_bytes` is a hard upper bound on response bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// User agent string for outbound requests.
    pub user_agent: String,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: concat!("todo-conformance/", env!("CARGO_PKG_VERSION")).to_string(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

/// Blocking HTTP transport backed by `reqwest`.
pub struct ReqwestTransport {
    /// Transport configuration, including limits.
    config: TransportConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] when the HTTP client cannot be created.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| TransportError::ClientBuild(err.to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, url: &Url, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|err| TransportError::Request(err.to_string()))?;
        let mut builder = self.client.request(method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let mut response =
            builder.send().map_err(|err| TransportError::Request(err.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
            })
            .collect();
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, TransportError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| TransportError::ResponseRead("size limit exceeds u64".to_string()))?;
    if response.content_length().is_some_and(|expected| expected > max_bytes_u64) {
        return Err(TransportError::ResponseTooLarge(max_bytes));
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|err| TransportError::ResponseRead(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(TransportError::ResponseTooLarge(max_bytes));
    }
    Ok(buf)
}

// ============================================================================
// SECTION: API Client
// ============================================================================

/// Client bound to one target base URL.
///
/// # Invariants
/// - `base_url` always ends with `/` so relative paths append rather than replace.
/// - Every request emits a `request_sent` event and exactly one of
///   `response_received` / `request_failed`.
#[derive(Clone)]
pub struct ApiClient {
    /// Base URL of the target service.
    base_url: Url,
    /// Transport used to deliver requests.
    transport: Arc<dyn Transport>,
    /// Event sink for request telemetry.
    events: Arc<dyn EventSink>,
    /// Session index used to label events in multi-session runs.
    session_index: usize,
}

impl ApiClient {
    /// Creates a client for `base_url` using `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidBaseUrl`] when the URL does not parse or
    /// cannot carry a path (for example `mailto:`).
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Result<Self, TransportError> {
        let mut url =
            Url::parse(base_url).map_err(|err| TransportError::InvalidBaseUrl(err.to_string()))?;
        if url.cannot_be_a_base() {
            return Err(TransportError::InvalidBaseUrl(format!("{base_url} cannot carry paths")));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base_url: url,
            transport,
            events: Arc::new(NoopEventSink),
            session_index: 0,
        })
    }

    /// Routes request events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns a copy of this client whose events are labeled with `index`.
    #[must_use]
    pub fn for_session(&self, index: usize) -> Self {
        let mut client = self.clone();
        client.session_index = index;
        client
    }

    /// Returns the normalized base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the session index used for event labeling.
    #[must_use]
    pub const fn session_index(&self) -> usize {
        self.session_index
    }

    /// Records a run event through the client's sink.
    pub fn record(&self, event: &RunEvent) {
        self.events.record(self.session_index, event);
    }

    /// Resolves the full URL for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidTarget`] when the path cannot be joined.
    pub fn resolve(&self, request: &HttpRequest) -> Result<Url, TransportError> {
        let relative = request.path.trim_start_matches('/');
        let mut url = self.base_url.join(relative).map_err(|err| TransportError::InvalidTarget {
            path: request.path.clone(),
            reason: err.to_string(),
        })?;
        if !request.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(request.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// Sends a request through the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the target cannot be resolved or the
    /// transport fails.
    pub fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.resolve(request)?;
        self.record(&RunEvent::RequestSent {
            method: request.method,
            path: request.path.clone(),
        });
        let started = Instant::now();
        let result = self.transport.send(&url, request);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(response) => self.record(&RunEvent::ResponseReceived {
                method: request.method,
                path: request.path.clone(),
                status: response.status,
                elapsed_ms,
            }),
            Err(err) => self.record(&RunEvent::RequestFailed {
                method: request.method,
                path: request.path.clone(),
                error: err.to_string(),
            }),
        }
        result
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
