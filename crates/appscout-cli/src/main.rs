// crates/appscout-cli/src/main.rs
// ============================================================================
// Module: Appscout CLI Entry Point
// Description: Command dispatcher for the bridge server and tool catalog.
// Purpose: Provide a safe, localized CLI for running the MCP bridge.
// Dependencies: appscout-config, appscout-mcp, clap, tokio
// ============================================================================

//! ## Overview
//! The Appscout CLI starts the MCP bridge server and inspects the tool
//! catalog. Configuration comes from `appscout.toml` (or `APPSCOUT_CONFIG`)
//! with command-line overrides for transport and bind address. Inputs are
//! untrusted and validated before the server starts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use appscout_config::AppscoutConfig;
use appscout_config::ServerTransport;
use appscout_core::tool_definitions;
use appscout_mcp::McpServer;
use clap::ArgAction;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "appscout", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the MCP bridge server.
    Serve(ServeCommand),
    /// Print the tool catalog.
    Tools(ToolsCommand),
}

/// Arguments for the serve subcommand.
#[derive(clap::Args, Debug)]
struct ServeCommand {
    /// Path to the configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Transport override.
    #[arg(long, value_enum, value_name = "TRANSPORT")]
    transport: Option<TransportArg>,
    /// Bind address override for HTTP or SSE transports.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

/// Arguments for the tools subcommand.
#[derive(clap::Args, Debug)]
struct ToolsCommand {
    /// Emit the catalog as JSON instead of a summary.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// Transport selection for the serve subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportArg {
    /// Serve over stdin/stdout.
    Stdio,
    /// Serve over HTTP.
    Http,
    /// Serve over SSE.
    Sse,
}

impl From<TransportArg> for ServerTransport {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Stdio => Self::Stdio,
            TransportArg::Http => Self::Http,
            TransportArg::Sse => Self::Sse,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI execution error.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable failure description.
    message: String,
}

impl CliError {
    /// Creates a new CLI error.
    fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias.
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
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("appscout {version}"))
            .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        write_stdout_line("usage: appscout <serve|tools> [options]")
            .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
        return Ok(ExitCode::SUCCESS);
    };
    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Tools(command) => command_tools(&command),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Runs the bridge server with config and CLI overrides applied.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let mut config = AppscoutConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(err.to_string()))?;
    if let Some(transport) = command.transport {
        config.server.transport = transport.into();
    }
    if let Some(bind) = command.bind {
        config.server.bind = bind;
    }
    config.validate().map_err(|err| CliError::new(err.to_string()))?;
    let server = McpServer::from_config(config).map_err(|err| CliError::new(err.to_string()))?;
    server.serve().await.map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

/// Prints the tool catalog as a summary or JSON.
fn command_tools(command: &ToolsCommand) -> CliResult<ExitCode> {
    let definitions = tool_definitions();
    if command.json {
        let payload = serde_json::to_string_pretty(&definitions)
            .map_err(|err| CliError::new(format!("catalog serialization failed: {err}")))?;
        write_stdout_line(&payload)
            .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
    } else {
        for definition in definitions {
            let line = format!("{}  {}", definition.name.as_str(), definition.description);
            write_stdout_line(&line)
                .map_err(|err| CliError::new(format!("stdout write failed: {err}")))?;
        }
    }
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

/// Reports an error to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("appscout: {message}"));
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        reason = "Test-only assertions favor direct unwrap/expect for clarity."
    )]

    use clap::Parser;

    use super::Cli;
    use super::Commands;
    use super::TransportArg;

    #[test]
    fn serve_accepts_transport_and_bind_overrides() {
        let cli =
            Cli::parse_from(["appscout", "serve", "--transport", "http", "--bind", "0.0.0.0:9000"]);
        match cli.command {
            Some(Commands::Serve(command)) => {
                assert_eq!(command.transport, Some(TransportArg::Http));
                assert_eq!(command.bind.as_deref(), Some("0.0.0.0:9000"));
            }
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn tools_defaults_to_summary_output() {
        let cli = Cli::parse_from(["appscout", "tools"]);
        match cli.command {
            Some(Commands::Tools(command)) => assert!(!command.json),
            _ => panic!("expected tools command"),
        }
    }

    #[test]
    fn version_flag_parses_without_a_subcommand() {
        let cli = Cli::parse_from(["appscout", "--version"]);
        assert!(cli.show_version);
        assert!(cli.command.is_none());
    }
}
