// crates/argrule-cli/src/main.rs
// ============================================================================
// Module: Argrule CLI Entry Point
// Description: Command dispatcher for rule compilation, checking, and config
//              validation.
// Purpose: Let authors try rules and validate config files from a shell.
// Dependencies: clap, argrule-core, argrule-config, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The `argrule` binary wraps the rule engine:
//!
//! - `compile` prints a rule's compiled form as JSON;
//! - `describe` prints what a rule expects;
//! - `check` validates one input and prints the outcome as JSON;
//! - `format` renders a typed value with a rule type's formatter;
//! - `types` lists the registered rule types and their functions;
//! - `config validate` checks the engine configuration and prints the
//!   effective settings;
//! - `schema check` validates a TOML document against a key schema.
//!
//! Exit codes: `0` when the input is valid, `1` when it is not, `2` when the
//! rule, schema, or configuration cannot be used.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use argrule_config::ConfigSchema;
use argrule_config::EngineConfig;
use argrule_core::Context;
use argrule_core::MixedConnectivePolicy;
use argrule_core::RuleEngine;
use argrule_core::ValidationOutcome;
use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Exit code for inputs that fail their rule.
const EXIT_INVALID: u8 = 1;
/// Exit code for rules, schemas, or configs that cannot be used.
const EXIT_ERROR: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser)]
#[command(name = "argrule", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Engine config path (overrides `ARGRULE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compile a rule and print its compiled form.
    Compile(RuleArgs),
    /// Describe what a rule expects.
    Describe(RuleArgs),
    /// Validate one input against a rule.
    Check(CheckCommand),
    /// Format a JSON value with a rule type's formatter.
    Format(FormatCommand),
    /// List registered rule types and their functions.
    Types,
    /// Engine configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Config-key schema utilities.
    Schema {
        /// Selected schema subcommand.
        #[command(subcommand)]
        command: SchemaCommand,
    },
}

/// Arguments naming a single rule.
#[derive(Args)]
struct RuleArgs {
    /// Rule text, e.g. `int[between(1,5)]`.
    rule: String,
}

/// Arguments for `check`.
#[derive(Args)]
struct CheckCommand {
    /// Rule text.
    rule: String,
    /// Input to validate.
    input: String,
    /// Treat the input as a JSON value instead of raw text.
    #[arg(long, action = ArgAction::SetTrue)]
    typed: bool,
    /// Context entry as `KEY=VALUE`; VALUE is JSON or a plain string.
    #[arg(long = "context", value_name = "KEY=VALUE")]
    context: Vec<String>,
}

/// Arguments for `format`.
#[derive(Args)]
struct FormatCommand {
    /// Rule type name, e.g. `bool`.
    type_name: String,
    /// JSON value to format.
    value: String,
}

/// Config subcommands.
#[derive(Subcommand)]
enum ConfigCommand {
    /// Load and validate the engine config.
    Validate,
}

/// Schema subcommands.
#[derive(Subcommand)]
enum SchemaCommand {
    /// Validate a TOML document against a schema file.
    Check(SchemaCheckCommand),
}

/// Arguments for `schema check`.
#[derive(Args)]
struct SchemaCheckCommand {
    /// Schema file mapping keys to rules.
    #[arg(long, value_name = "PATH")]
    schema: PathBuf,
    /// TOML document to validate.
    #[arg(long, value_name = "PATH")]
    document: PathBuf,
}

/// JSON shape printed by `config validate`.
#[derive(Serialize)]
struct ConfigSummary {
    /// Maximum rule text size in bytes.
    max_rule_bytes: usize,
    /// Maximum sub-expression nesting depth.
    max_nesting_depth: usize,
    /// Mixed-connective handling.
    mixed_connectives: MixedConnectivePolicy,
}

/// JSON shape printed by `schema check`.
#[derive(Serialize)]
struct SchemaCheckOutput<'a> {
    /// Values that passed.
    values: &'a serde_json::Map<String, Value>,
    /// Rendered failures, one per key.
    issues: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
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

    if cli.show_version {
        write_stdout_line(&format!("argrule {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        return Err(CliError::new("no command given; run `argrule --help`".to_string()));
    };

    let engine = load_config(cli.config.as_deref())?
        .build_engine()
        .map_err(|err| CliError::new(format!("failed to build engine: {err}")))?;

    match command {
        Commands::Compile(args) => command_compile(&engine, &args),
        Commands::Describe(args) => command_describe(&engine, &args),
        Commands::Check(command) => command_check(&engine, &command),
        Commands::Format(command) => command_format(&engine, &command),
        Commands::Types => command_types(&engine),
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(&engine),
        Commands::Schema {
            command: SchemaCommand::Check(command),
        } => command_schema_check(&engine, &command),
    }
}

/// Loads the engine config.
fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    EngineConfig::load(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

// ============================================================================
// SECTION: Rule Commands
// ============================================================================

/// Executes `compile`.
fn command_compile(engine: &RuleEngine, args: &RuleArgs) -> CliResult<ExitCode> {
    let rule = engine.compile_rule(&args.rule).map_err(|err| CliError::new(err.to_string()))?;
    write_json(&rule)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `describe`.
fn command_describe(engine: &RuleEngine, args: &RuleArgs) -> CliResult<ExitCode> {
    let description =
        engine.describe_rule(&args.rule).map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&description)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `check`.
fn command_check(engine: &RuleEngine, command: &CheckCommand) -> CliResult<ExitCode> {
    let context = parse_context(&command.context)?;
    let outcome = if command.typed {
        let value = parse_json_arg("input", &command.input)?;
        engine.parse_typed(&command.rule, &value, &context)
    } else {
        engine.parse(&command.rule, &command.input, &context)
    }
    .map_err(|err| CliError::new(err.to_string()))?;

    write_json(&outcome)?;
    Ok(outcome_code(&outcome))
}

/// Executes `format`.
fn command_format(engine: &RuleEngine, command: &FormatCommand) -> CliResult<ExitCode> {
    let value = parse_json_arg("value", &command.value)?;
    let rendered = engine
        .format_value(&command.type_name, &value)
        .map_err(|err| CliError::new(err.to_string()))?;
    write_stdout_line(&rendered)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `types`: one line per type, then its functions indented.
fn command_types(engine: &RuleEngine) -> CliResult<ExitCode> {
    let registry = engine.registry();
    for name in registry.names() {
        let rule_type = registry.resolve(name).map_err(|err| CliError::new(err.to_string()))?;
        write_stdout_line(&format!("{name}: {}", rule_type.describe()))?;
        for function in rule_type.functions() {
            write_stdout_line(&format!("  {}: {}", function.name(), function.describe()))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Maps a validation outcome to an exit code.
fn outcome_code(outcome: &ValidationOutcome) -> ExitCode {
    if outcome.is_valid() { ExitCode::SUCCESS } else { ExitCode::from(EXIT_INVALID) }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes `config validate`: prints the settings the engine runs with.
fn command_config_validate(engine: &RuleEngine) -> CliResult<ExitCode> {
    let limits = engine.limits();
    write_json(&ConfigSummary {
        max_rule_bytes: limits.max_rule_bytes,
        max_nesting_depth: limits.max_nesting_depth,
        mixed_connectives: engine.mixed_connectives(),
    })?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Schema Commands
// ============================================================================

/// Executes `schema check`.
fn command_schema_check(engine: &RuleEngine, command: &SchemaCheckCommand) -> CliResult<ExitCode> {
    let schema = ConfigSchema::load(engine, &command.schema)
        .map_err(|err| CliError::new(format!("failed to load schema: {err}")))?;
    let report = schema
        .validate_file(engine, &command.document)
        .map_err(|err| CliError::new(format!("failed to validate document: {err}")))?;

    write_json(&SchemaCheckOutput {
        values: &report.values,
        issues: report.issues.iter().map(ToString::to_string).collect(),
    })?;
    if report.is_valid() { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::from(EXIT_INVALID)) }
}

// ============================================================================
// SECTION: Argument Parsing
// ============================================================================

/// Parses `KEY=VALUE` context entries.
///
/// VALUE is read as JSON when it parses, otherwise kept as a string, so
/// `--context limit=5` yields an integer and `--context name=bob` a string.
fn parse_context(entries: &[String]) -> CliResult<Context> {
    let mut context = Context::new();
    for entry in entries {
        let Some((key, raw)) = entry.split_once('=') else {
            return Err(CliError::new(format!("context entry '{entry}' must be KEY=VALUE")));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::new(format!("context entry '{entry}' has an empty key")));
        }
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        context.insert(key.to_string(), value);
    }
    Ok(context)
}

/// Parses a JSON argument.
fn parse_json_arg(label: &str, text: &str) -> CliResult<Value> {
    serde_json::from_str(text)
        .map_err(|err| CliError::new(format!("{label} is not valid JSON: {err}")))
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a value as pretty JSON to stdout.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    write_stdout_line(&text)
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr().lock();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns the error exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::from(EXIT_ERROR)
}
