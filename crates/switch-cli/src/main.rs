//! switch-cli - Command-line tool for switch REST API sessions
//!
//! Logs in to a device, runs one command with the session and logs out.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use switch_session::{
    ConnectOptions, Connector, CredentialSource, RuntimeCapability, DEFAULT_CONNECT_TIMEOUT,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{ArgOverrides, Config};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "switch-cli")]
#[command(author, version, about = "Switch REST API session CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Device address
    #[arg(short, long, env = "SWITCH_SERVER")]
    server: Option<String>,

    /// HTTPS port (default 443)
    #[arg(short = 'P', long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// Login name
    #[arg(short, long, env = "SWITCH_USERNAME")]
    username: Option<String>,

    /// Password (prompted for when not given)
    #[arg(long, env = "SWITCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Accept any server certificate
    #[arg(long)]
    skip_certificate_check: bool,

    /// Use the legacy TLS stack behavior
    #[arg(long)]
    legacy_tls: bool,

    /// Request timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Log out without asking for confirmation
    #[arg(long)]
    no_confirm: bool,

    /// Configuration file path
    #[arg(short, long, env = "SWITCH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and show the negotiated session
    Info,

    /// Send an authenticated request and print the response
    Invoke {
        /// HTTP method: GET, POST, PUT, PATCH, DELETE
        method: String,

        /// Resource path, relative to /rest/v1/ unless it starts with rest/
        path: String,

        /// Request body as JSON
        #[arg(long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(&ArgOverrides {
        server: cli.server.as_deref(),
        port: cli.port,
        username: cli.username.as_deref(),
        skip_certificate_check: cli.skip_certificate_check,
        timeout_secs: cli.timeout,
        no_color: cli.no_color,
    })?;
    let format = cli
        .output
        .or_else(|| config.output.as_deref().and_then(OutputFormat::from_name))
        .unwrap_or_default();

    // Create output context
    let ctx = OutputContext::new(format, merged.no_color, cli.quiet);

    let connector = Connector::builder()
        .timeout(merged.timeout)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(merged.timeout))
        .build();

    let credentials = CredentialSource {
        username: merged.username.clone(),
        secret: cli.password.clone().map(Into::into),
        credential: None,
    };
    let runtime = if cli.legacy_tls {
        RuntimeCapability::Legacy
    } else {
        RuntimeCapability::Modern
    };
    let options = ConnectOptions::new(merged.server.clone())
        .port(merged.port)
        .credentials(credentials)
        .skip_certificate_check(merged.skip_certificate_check)
        .runtime(runtime);

    let connection = connector
        .connect(options)
        .await
        .with_context(|| format!("Failed to connect to {}:{}", merged.server, merged.port))?;

    // Execute command
    let outcome = match &cli.command {
        Commands::Info => commands::info(&connection, &ctx),

        Commands::Invoke { method, path, body } => {
            commands::invoke(&connection, method, path, body.as_deref(), &ctx).await
        }
    };

    let logout = commands::disconnect(&connector, &connection, cli.no_confirm, &ctx).await;
    outcome?;
    logout
}
