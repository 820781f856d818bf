// crates/todo-conformance-cli/src/main.rs
// ============================================================================
// Module: Todo Conformance CLI Entry Point
// Description: Command dispatcher for conformance runs and catalog queries.
// Purpose: Run the suite against a target and report the verdict.
// Dependencies: clap, ctrlc, serde_json, thiserror, todo-conformance-config,
//               todo-conformance-core
// ============================================================================

//! ## Overview
//! The CLI loads configuration, applies command-line overrides, runs one or
//! more isolated sessions against the target, and writes the aggregate report
//! to stdout. The process exits with success only when every session passed
//! every scenario and the progress oracle reported all flags complete. Ctrl-C
//! cancels the run: remaining scenarios are skipped and the partial report is
//! still written.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use todo_conformance_config::ConformanceConfig;
use todo_conformance_config::OutputFormat;
use todo_conformance_core::ApiClient;
use todo_conformance_core::CancelToken;
use todo_conformance_core::EventSink;
use todo_conformance_core::JsonLinesEventSink;
use todo_conformance_core::ReqwestTransport;
use todo_conformance_core::RunReport;
use todo_conformance_core::ScenarioOrchestrator;
use todo_conformance_core::ScenarioSuite;
use todo_conformance_core::SetupError;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "todo-conformance", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the conformance suite against the target.
    Run(RunCommand),
    /// List the scenario catalog in execution order.
    List(ListCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for the `run` command.
#[derive(Args, Debug, Default)]
struct RunCommand {
    /// Optional config file path (defaults to todo-conformance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the target base URL.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,
    /// Number of isolated sessions to run concurrently.
    #[arg(long, value_name = "N")]
    sessions: Option<usize>,
    /// Report format written to stdout.
    #[arg(long, value_enum, value_name = "FORMAT")]
    format: Option<FormatArg>,
    /// Write the JSON-lines event log to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    event_log: Option<PathBuf>,
    /// Run only this scenario and its dependencies (repeatable).
    #[arg(long = "scenario", value_name = "NAME")]
    scenarios: Vec<String>,
    /// Fixture seed for reproducible runs.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

/// Arguments for the `list` command.
#[derive(Args, Debug)]
struct ListCommand {
    /// Output format.
    #[arg(long, value_enum, value_name = "FORMAT", default_value = "markdown")]
    format: FormatArg,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to todo-conformance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Output formats for reports and listings.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum FormatArg {
    /// JSON output.
    Json,
    /// Markdown summary output.
    Markdown,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => Self::Json,
            FormatArg::Markdown => Self::Markdown,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(&command),
        Commands::List(command) => command_list(&command),
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate(command) => command_config_validate(&command),
        },
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
fn command_run(command: &RunCommand) -> CliResult<ExitCode> {
    let mut config = ConformanceConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    apply_run_overrides(&mut config, command);
    config.validate().map_err(|err| CliError::new(format!("failed to load config: {err}")))?;

    let suite = config.suite().map_err(|err| CliError::new(err.to_string()))?;
    let transport = ReqwestTransport::new(config.transport_config())
        .map_err(|err| CliError::new(format!("failed to build http client: {err}")))?;
    let events = open_event_sink(config.output.event_log.as_deref())?;
    let api = ApiClient::new(&config.target.base_url, Arc::new(transport))
        .map_err(|err| CliError::new(format!("invalid base url: {err}")))?
        .with_events(events);

    let orchestrator = ScenarioOrchestrator::new(api, suite, config.suite_settings())
        .with_seed(config.run.seed);
    let cancel = CancelToken::new();
    if let Err(err) = ctrlc::set_handler(interrupt_handler(cancel.clone())) {
        let _ = write_stderr_line(&format!("failed to install interrupt handler: {err}"));
    }
    let results = orchestrator.run_isolated_sessions(config.run.sessions, &cancel);
    if cancel.is_cancelled() {
        write_stderr_line("run interrupted; remaining scenarios were skipped")
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    let rendered = match config.output.format {
        OutputFormat::Json => render_json(&results)?,
        OutputFormat::Markdown => render_markdown(&results),
    };
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(exit_code(&results))
}

/// Returns the Ctrl-C handler that cancels the run.
///
/// Scenarios already in flight finish; the rest are reported as skipped and
/// the partial report is still rendered.
fn interrupt_handler(cancel: CancelToken) -> impl FnMut() + Send + 'static {
    move || cancel.cancel()
}

/// Applies command-line overrides on top of loaded configuration.
fn apply_run_overrides(config: &mut ConformanceConfig, command: &RunCommand) {
    if let Some(base_url) = &command.base_url {
        config.target.base_url.clone_from(base_url);
    }
    if let Some(sessions) = command.sessions {
        config.run.sessions = sessions;
    }
    if let Some(format) = command.format {
        config.output.format = format.into();
    }
    if let Some(path) = &command.event_log {
        config.output.event_log = Some(path.clone());
    }
    if !command.scenarios.is_empty() {
        config.run.scenarios.clone_from(&command.scenarios);
    }
    if command.seed.is_some() {
        config.run.seed = command.seed;
    }
}

/// Opens the event sink: a file when configured, stderr otherwise.
fn open_event_sink(path: Option<&Path>) -> CliResult<Arc<dyn EventSink>> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|err| {
                CliError::new(format!("failed to open event log {}: {err}", path.display()))
            })?;
            Ok(Arc::new(JsonLinesEventSink::new(file)))
        }
        None => Ok(Arc::new(JsonLinesEventSink::new(std::io::stderr()))),
    }
}

/// Returns true when every session ran and succeeded.
fn all_succeeded(results: &[Result<RunReport, SetupError>]) -> bool {
    !results.is_empty()
        && results.iter().all(|result| result.as_ref().is_ok_and(RunReport::succeeded))
}

/// Maps session results to the process exit code.
fn exit_code(results: &[Result<RunReport, SetupError>]) -> ExitCode {
    if all_succeeded(results) { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders session results as one JSON document.
fn render_json(results: &[Result<RunReport, SetupError>]) -> CliResult<String> {
    let mut sessions = Vec::with_capacity(results.len());
    for (index, result) in results.iter().enumerate() {
        let entry = match result {
            Ok(report) => serde_json::to_value(report)
                .map_err(|err| CliError::new(format!("failed to serialize report: {err}")))?,
            Err(err) => json!({
                "session_index": index,
                "setup_error": err.to_string(),
            }),
        };
        sessions.push(entry);
    }
    let document = json!({
        "succeeded": all_succeeded(results),
        "sessions": Value::Array(sessions),
    });
    serde_json::to_string_pretty(&document)
        .map_err(|err| CliError::new(format!("failed to serialize report: {err}")))
}

/// Renders session results as concatenated Markdown summaries.
fn render_markdown(results: &[Result<RunReport, SetupError>]) -> String {
    let mut output = String::new();
    for (index, result) in results.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        match result {
            Ok(report) => output.push_str(&report.to_markdown()),
            Err(err) => {
                output.push_str(&format!("# Conformance Run {index}\n\n- Result: SETUP FAILED\n"));
                output.push_str(&format!("- Error: {err}\n"));
            }
        }
    }
    output
}

// ============================================================================
// SECTION: List Command
// ============================================================================

/// Executes the `list` command.
fn command_list(command: &ListCommand) -> CliResult<ExitCode> {
    let suite = ScenarioSuite::standard().map_err(|err| CliError::new(err.to_string()))?;
    let rendered = match command.format {
        FormatArg::Json => serde_json::to_string_pretty(&catalog_json(&suite))
            .map_err(|err| CliError::new(format!("failed to serialize catalog: {err}")))?,
        FormatArg::Markdown => catalog_markdown(&suite),
    };
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Describes the catalog as a JSON array.
fn catalog_json(suite: &ScenarioSuite) -> Value {
    Value::Array(
        suite
            .scenarios()
            .iter()
            .map(|scenario| {
                json!({
                    "name": scenario.name,
                    "group": scenario.group.as_str(),
                    "expected_status": scenario.expected.status,
                    "summary": scenario.expected.summary,
                    "depends_on": scenario.depends_on,
                })
            })
            .collect(),
    )
}

/// Describes the catalog as a Markdown table.
fn catalog_markdown(suite: &ScenarioSuite) -> String {
    let mut output = String::from("| Scenario | Group | Status | Depends on |\n");
    output.push_str("| --- | --- | --- | --- |\n");
    for scenario in suite.scenarios() {
        output.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            scenario.name,
            scenario.group.as_str(),
            scenario.expected.status,
            scenario.depends_on.join(", ")
        ));
    }
    output
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = ConformanceConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
