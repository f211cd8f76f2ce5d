// crates/annotation-broker-cli/src/main.rs
// ============================================================================
// Module: Annotation Broker CLI Entry Point
// Description: Command dispatcher for annotation broker configuration and requests.
// Purpose: Validate configuration and send one-off requests through the broker.
// Dependencies: annotation-broker, annotation-broker-config, clap, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! The annotation broker CLI validates `annotation-broker.toml`, prints a
//! canonical example, and sends single requests to the annotation server
//! through a fully wired broker. Bus messages go to stderr; the delivered
//! response envelope goes to stdout as JSON.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use annotation_broker::Broker;
use annotation_broker::EventBus;
use annotation_broker::HttpTransport;
use annotation_broker::RequestOptions;
use annotation_broker::RequestState;
use annotation_broker::StaticReloadPolicy;
use annotation_broker_config::BrokerConfig;
use annotation_broker_config::LogFormat;
use annotation_broker_config::LoggingConfig;
use annotation_broker_config::config_toml_example;
use annotation_broker_core::BusEvent;
use annotation_broker_core::EventKind;
use annotation_broker_core::Message;
use annotation_broker_core::ReloadDecision;
use annotation_broker_core::RequestPayload;
use annotation_broker_core::ResponseEnvelope;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "annotation-broker", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Send one request to the annotation server.
    Send(SendCommand),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Validate(ConfigValidateCommand),
    /// Print a canonical example configuration.
    Example,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Config file path (defaults to `ANNOTATION_BROKER_CONFIG` or annotation-broker.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `send`.
#[derive(Args, Debug)]
struct SendCommand {
    /// Server action to invoke.
    #[arg(long, value_name = "NAME")]
    action: String,
    /// Payload field as KEY=VALUE; may be repeated.
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,
    /// Protect the request from partial obsolescence.
    #[arg(long)]
    keep: bool,
    /// Answer to a reload prompt after a protocol version mismatch.
    #[arg(long, value_enum, default_value_t = ReloadArg::Decline)]
    reload: ReloadArg,
    /// Config file path (defaults to `ANNOTATION_BROKER_CONFIG` or annotation-broker.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Reload prompt answers.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ReloadArg {
    /// Accept the reload.
    Accept,
    /// Decline the reload.
    Decline,
}

impl From<ReloadArg> for ReloadDecision {
    fn from(value: ReloadArg) -> Self {
        match value {
            ReloadArg::Accept => Self::Accept,
            ReloadArg::Decline => Self::Decline,
        }
    }
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
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Send(command) => command_send(command).await,
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => {
            write_stdout_bytes(config_toml_example().as_bytes())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = BrokerConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line(&format!(
        "config ok: endpoint {} (timeout {} ms), protocol {}, logging {}",
        config.endpoint.url,
        config.endpoint.timeout_ms,
        config.protocol_version(),
        config.logging.level.as_str()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Send Command
// ============================================================================

/// Sends one request and prints the delivered envelope.
async fn command_send(command: SendCommand) -> CliResult<ExitCode> {
    let config = BrokerConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    init_logging(config.logging)?;

    let payload = build_payload(&command.action, command.params)?;
    let bus = Arc::new(EventBus::new());
    bus.on(EventKind::Messages, |event| {
        if let BusEvent::Messages(messages) = event {
            for message in messages {
                let _ = write_stderr_line(&format_message(message));
            }
        }
    });
    bus.on(EventKind::ScreamingHalt, |_| {
        let _ = write_stderr_line("server halted all pending requests");
    });

    let transport = build_transport(config.endpoint.timeout()).await?;
    let mut broker = Broker::builder()
        .endpoint(config.endpoint.url.clone())
        .protocol_version(config.protocol_version())
        .dispatcher(Arc::clone(&bus))
        .transport(Arc::new(transport))
        .reload_policy(Arc::new(StaticReloadPolicy::new(command.reload.into())))
        .build()
        .map_err(|err| CliError::new(format!("failed to build broker: {err}")))?;

    let delivered: Arc<Mutex<Option<ResponseEnvelope>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&delivered);
    let id = broker.submit(
        payload,
        Some(Box::new(move |envelope: ResponseEnvelope| {
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(envelope);
        })),
        RequestOptions::new().keep(command.keep),
    );
    info!(request_id = id.get(), action = %command.action, "request submitted");

    let Some(resolved) = broker.next_resolution().await else {
        return Err(CliError::new("request was never resolved".to_string()));
    };
    bus.run_deferred();

    let envelope = delivered.lock().unwrap_or_else(PoisonError::into_inner).take();
    match (resolved.state, envelope) {
        (RequestState::Delivered, Some(envelope)) => {
            let json = serde_json::to_string_pretty(&envelope)
                .map_err(|err| CliError::new(format!("failed to encode response: {err}")))?;
            write_stdout_line(&json).map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        (state, _) => Err(CliError::new(format!("request {id} ended as {}", state.label()))),
    }
}

/// Builds the request payload from the action and parameters.
fn build_payload(action: &str, params: Vec<(String, String)>) -> CliResult<RequestPayload> {
    if action.trim().is_empty() {
        return Err(CliError::new("action must be non-empty".to_string()));
    }
    let mut payload = RequestPayload::new(action);
    for (key, value) in params {
        if !payload.insert(key.clone(), value) {
            return Err(CliError::new(format!("param {key} is reserved")));
        }
    }
    Ok(payload)
}

/// Builds the HTTP transport on a blocking thread.
///
/// The blocking client cannot be constructed from inside the async runtime.
async fn build_transport(timeout: Duration) -> CliResult<HttpTransport> {
    tokio::task::spawn_blocking(move || HttpTransport::with_timeout(timeout))
        .await
        .map_err(|err| CliError::new(format!("failed to build transport: {err}")))?
        .map_err(|err| CliError::new(format!("failed to build transport: {err}")))
}

/// Parses a `KEY=VALUE` parameter.
fn parse_param(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got {raw}"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err("param key must be non-empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

/// Formats a bus message for stderr.
fn format_message(message: &Message) -> String {
    format!("[{}] {}", message.severity.as_str(), message.text)
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Installs the global tracing subscriber; `RUST_LOG` overrides the configured level.
fn init_logging(logging: LoggingConfig) -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| CliError::new(format!("failed to initialize logging: {err}")))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a line to stderr.
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
