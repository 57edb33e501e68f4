//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Relay - label-routed message fan-out
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    author,
    version,
    about = "Label-routed message relay",
    long_about = "Delivers a message to every consumer subscribed to a label.\n\n\
                  Consumers are looked up through the configured discovery backend \n\
                  and reached through the configured transports, honouring each \n\
                  fan-out group's ANY / ALL policy."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (disabled when unset)
    #[arg(long, global = true, env = "RELAY_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deliver a payload to every consumer of a label
    Notify(NotifyArgs),

    /// Print the consumers currently subscribed to a label
    Resolve(ResolveArgs),

    /// Validate configuration file without sending anything
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `notify` command
#[derive(Parser, Debug, Clone)]
pub struct NotifyArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Label to notify
    pub label: String,

    /// Payload; read from stdin when omitted or `-`
    pub payload: Option<String>,

    /// Endpoint (defaults to `relay.default_endpoint`)
    #[arg(short, long, env = "RELAY_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Send the payload this many times, reusing one dispatcher
    #[arg(long, default_value = "1")]
    pub count: u32,

    /// Override the per-send timeout in milliseconds
    #[arg(long, env = "RELAY_SEND_TIMEOUT_MS")]
    pub send_timeout_ms: Option<u64>,

    /// Cancel remaining ANY-group sends once one member succeeded
    #[arg(long)]
    pub short_circuit: bool,

    /// Print each dispatch result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `resolve` command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Label to resolve
    pub label: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.toml", env = "RELAY_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show every static service
    #[arg(long)]
    pub services: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
