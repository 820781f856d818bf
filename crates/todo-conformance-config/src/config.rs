// crates/todo-conformance-config/src/config.rs
// ============================================================================
// Module: Conformance Configuration
// Description: Configuration loading, overrides, and validation.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: todo-conformance-core, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is read from a TOML file with size, path, and encoding
//! limits, then overlaid with environment overrides, then validated. A
//! missing file at the default location yields the defaults; a missing file
//! that was named explicitly is an error.
//! Invariants:
//! - A [`ConformanceConfig`] returned by [`ConformanceConfig::load`] has
//!   passed [`ConformanceConfig::validate`].
//! - Environment overrides are parsed strictly; malformed values fail the load
//!   rather than falling back to defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use todo_conformance_core::Credentials;
use todo_conformance_core::ScenarioSuite;
use todo_conformance_core::SuiteSettings;
use todo_conformance_core::TodoLimits;
use todo_conformance_core::TransportConfig;
use todo_conformance_core::scenario::DEFAULT_CHALLENGE_COUNT;
use todo_conformance_core::scenario::DEFAULT_NOTE_TEXT;
use todo_conformance_core::transport::DEFAULT_MAX_RESPONSE_BYTES;
use todo_conformance_core::transport::DEFAULT_TIMEOUT_MS;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "todo-conformance.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TODO_CONFORMANCE_CONFIG";
/// Environment variable overriding `target.base_url`.
pub const BASE_URL_ENV_VAR: &str = "TODO_CONFORMANCE_BASE_URL";
/// Environment variable overriding `target.timeout_ms`.
pub const TIMEOUT_ENV_VAR: &str = "TODO_CONFORMANCE_TIMEOUT_MS";
/// Public deployment of the todo API.
pub const DEFAULT_BASE_URL: &str = "https://apichallenges.herokuapp.com/";

/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum base URL length.
pub(crate) const MAX_BASE_URL_LENGTH: usize = 2048;
/// Upper bound on the request timeout.
pub(crate) const MAX_TIMEOUT_MS: u64 = 300_000;
/// Upper bound on the response size limit.
pub(crate) const MAX_RESPONSE_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum user agent length.
pub(crate) const MAX_USER_AGENT_LENGTH: usize = 256;
/// Maximum credential length.
pub(crate) const MAX_CREDENTIAL_LENGTH: usize = 256;
/// Maximum concurrent sessions per run.
pub const MAX_SESSIONS: usize = 16;
/// Maximum note text length.
pub(crate) const MAX_NOTE_TEXT_LENGTH: usize = 1024;
/// Maximum todo ceiling a config may declare.
pub(crate) const MAX_TODO_CEILING: usize = 1000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Top-level configuration for conformance runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConformanceConfig {
    /// Target service.
    #[serde(default)]
    pub target: TargetConfig,
    /// Credentials for token issuance.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Resource limits the target enforces.
    #[serde(default)]
    pub limits: TodoLimits,
    /// Run shape.
    #[serde(default)]
    pub run: RunConfig,
    /// Report output.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Target service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    /// Base URL every request path is resolved against.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Optional user agent override.
    pub user_agent: Option<String>,
    /// Maximum response body size in bytes.
    pub max_response_bytes: usize,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: None,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

/// Credentials for the secret token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// User name.
    pub username: String,
    /// Password the target accepts.
    pub password: String,
    /// Password the target must reject.
    pub wrong_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let credentials = Credentials::default();
        Self {
            username: credentials.username,
            password: credentials.password,
            wrong_password: credentials.wrong_password,
        }
    }
}

/// Run shape settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Number of isolated sessions to run concurrently.
    pub sessions: usize,
    /// Fixture seed; entropy is used when absent.
    pub seed: Option<u64>,
    /// Expected length of the challenge list; `0` only requires a non-empty list.
    pub expected_challenge_count: usize,
    /// Scenario subset to run (dependencies are added); empty runs everything.
    pub scenarios: Vec<String>,
    /// Text written to the secret note.
    pub note_text: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sessions: 1,
            seed: None,
            expected_challenge_count: DEFAULT_CHALLENGE_COUNT,
            scenarios: Vec::new(),
            note_text: DEFAULT_NOTE_TEXT.to_string(),
        }
    }
}

/// Report format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One JSON document holding every session report.
    Json,
    /// Markdown summary per session.
    #[default]
    Markdown,
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Report format written to stdout.
    pub format: OutputFormat,
    /// JSON-lines event log path; stderr when absent.
    pub event_log: Option<PathBuf>,
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ConformanceConfig {
    /// Loads configuration from disk using the default resolution rules and
    /// the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overriding, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| env::var(name).ok())
    }

    /// Loads configuration using `lookup` in place of the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading, overriding, or validation fails.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (resolved, explicit) = resolve_path(path, &lookup)?;
        validate_path(&resolved)?;
        let mut config = match fs::read(&resolved) {
            Ok(bytes) => Self::parse_bytes(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound && !explicit => Self::default(),
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates TOML text without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses raw file contents after the size and encoding guards.
    fn parse_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides on top of file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override is malformed.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV_VAR) {
            let trimmed = base_url.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Invalid(format!("{BASE_URL_ENV_VAR} must be non-empty")));
            }
            self.target.base_url = trimmed.to_string();
        }
        if let Some(timeout) = lookup(TIMEOUT_ENV_VAR) {
            self.target.timeout_ms = timeout.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!(
                    "{TIMEOUT_ENV_VAR} must be an integer number of milliseconds"
                ))
            })?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

impl ConformanceConfig {
    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        self.auth.validate()?;
        validate_limits(&self.limits)?;
        self.run.validate()?;
        if let Some(path) = &self.output.event_log {
            validate_path_string("output.event_log", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

impl TargetConfig {
    /// Validates target settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.len() > MAX_BASE_URL_LENGTH {
            return Err(ConfigError::Invalid("target.base_url exceeds max length".to_string()));
        }
        let url = Url::parse(&self.base_url)
            .map_err(|err| ConfigError::Invalid(format!("target.base_url is invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("target.base_url must use http or https".to_string()));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(ConfigError::Invalid("target.base_url must name a host".to_string()));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Invalid(
                "target.base_url must not carry a query or fragment".to_string(),
            ));
        }
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "target.timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
            )));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESPONSE_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "target.max_response_bytes must be between 1 and {MAX_RESPONSE_BYTES_LIMIT}"
            )));
        }
        if let Some(agent) = &self.user_agent
            && (agent.trim().is_empty() || agent.len() > MAX_USER_AGENT_LENGTH)
        {
            return Err(ConfigError::Invalid(format!(
                "target.user_agent must be 1 to {MAX_USER_AGENT_LENGTH} bytes"
            )));
        }
        Ok(())
    }
}

impl AuthConfig {
    /// Validates credentials.
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("auth.username", &self.username),
            ("auth.password", &self.password),
            ("auth.wrong_password", &self.wrong_password),
        ] {
            if value.is_empty() || value.len() > MAX_CREDENTIAL_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be 1 to {MAX_CREDENTIAL_LENGTH} bytes"
                )));
            }
        }
        if self.username.contains(':') {
            return Err(ConfigError::Invalid("auth.username must not contain ':'".to_string()));
        }
        if self.wrong_password == self.password {
            return Err(ConfigError::Invalid(
                "auth.wrong_password must differ from auth.password".to_string(),
            ));
        }
        Ok(())
    }
}

impl RunConfig {
    /// Validates the run shape, including scenario names.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.sessions == 0 || self.sessions > MAX_SESSIONS {
            return Err(ConfigError::Invalid(format!(
                "run.sessions must be between 1 and {MAX_SESSIONS}"
            )));
        }
        if self.note_text.chars().count() > MAX_NOTE_TEXT_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "run.note_text exceeds {MAX_NOTE_TEXT_LENGTH} characters"
            )));
        }
        if !self.scenarios.is_empty() {
            select_scenarios(&self.scenarios)?;
        }
        Ok(())
    }
}

/// Validates resource limits.
fn validate_limits(limits: &TodoLimits) -> Result<(), ConfigError> {
    if limits.max_todos == 0 || limits.max_todos > MAX_TODO_CEILING {
        return Err(ConfigError::Invalid(format!(
            "limits.max_todos must be between 1 and {MAX_TODO_CEILING}"
        )));
    }
    for (field, value) in [
        ("limits.max_title_chars", limits.max_title_chars),
        ("limits.max_description_chars", limits.max_description_chars),
        ("limits.max_body_bytes", limits.max_body_bytes),
    ] {
        if value == 0 {
            return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Derived Settings
// ============================================================================

impl ConformanceConfig {
    /// Returns the transport settings.
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        let defaults = TransportConfig::default();
        TransportConfig {
            timeout_ms: self.target.timeout_ms,
            user_agent: self.target.user_agent.clone().unwrap_or(defaults.user_agent),
            max_response_bytes: self.target.max_response_bytes,
        }
    }

    /// Returns the settings shared by every scenario.
    #[must_use]
    pub fn suite_settings(&self) -> SuiteSettings {
        SuiteSettings {
            limits: self.limits,
            credentials: Credentials {
                username: self.auth.username.clone(),
                password: self.auth.password.clone(),
                wrong_password: self.auth.wrong_password.clone(),
            },
            expected_challenge_count: (self.run.expected_challenge_count > 0)
                .then_some(self.run.expected_challenge_count),
            note_text: self.run.note_text.clone(),
        }
    }

    /// Returns the scenario suite selected by `run.scenarios`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a named scenario does not exist.
    pub fn suite(&self) -> Result<ScenarioSuite, ConfigError> {
        select_scenarios(&self.run.scenarios)
    }
}

/// Builds the standard suite, narrowed to `names` when any are given.
fn select_scenarios(names: &[String]) -> Result<ScenarioSuite, ConfigError> {
    let suite = ScenarioSuite::standard()
        .map_err(|err| ConfigError::Invalid(format!("scenario catalog: {err}")))?;
    if names.is_empty() {
        return Ok(suite);
    }
    suite.only(names).map_err(|err| ConfigError::Invalid(format!("run.scenarios: {err}")))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument, the environment, or the
/// default name. The flag is true when the path was named explicitly.
fn resolve_path<F>(path: Option<&Path>, lookup: &F) -> Result<(PathBuf, bool), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = lookup(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path-valued field against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
