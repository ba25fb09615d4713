//! RustRelay - TCP Chat Relay
//!
//! A chat room over plain TCP: one server multiplexing every participant
//! through a single event loop, and an interactive client for joining it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rustrelay::{config::ConfigManager, shutdown, ChatClient, ChatServer};

/// CLI arguments for RustRelay
#[derive(Parser, Debug)]
#[command(name = "rustrelay")]
#[command(about = "RustRelay - TCP chat relay server and client")]
#[command(version)]
#[command(long_about = "
RustRelay - TCP chat relay server and client

Run `rustrelay serve` to open a chat room, and `rustrelay connect` to join
one. Every message a participant sends is relayed to all other participants.

Configuration priority (highest to lowest):
1. Command-line arguments
2. Configuration file
3. Environment variables
4. Built-in defaults

Environment variables:
  RUSTRELAY_BIND_ADDR       - Server bind address (e.g., 127.0.0.1:10000)
  RUSTRELAY_SERVER_ADDR     - Client connect address
  RUSTRELAY_LISTEN_BACKLOG  - Pending connection limit
  RUSTRELAY_RECV_BUFFER     - Receive buffer size in bytes
  RUSTRELAY_POLL_TIMEOUT    - Readiness wait timeout (e.g., 60s)
  RUSTRELAY_CONNECT_TIMEOUT - Client connect timeout (e.g., 2s)
  RUSTRELAY_LOG_LEVEL       - Log level (trace, debug, info, warn, error)
")]
pub struct CliArgs {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config.toml",
        help = "Path to configuration file"
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", help = "Log level")]
    pub log_level: String,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Address to bind or connect to (overrides config file)
    #[arg(short, long, help = "Address (e.g., 127.0.0.1:10000)")]
    pub addr: Option<String>,

    /// Port to bind or connect to (overrides config file)
    #[arg(short, long, help = "Port to bind or connect to")]
    pub port: Option<u16>,

    /// Receive buffer size in bytes
    #[arg(long, help = "Receive buffer size in bytes")]
    pub buffer_size: Option<usize>,

    /// Pending connection limit for the listener
    #[arg(long, help = "Pending connection limit for the listener")]
    pub backlog: Option<u32>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration and exit")]
    pub validate_config: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open a chat room and relay messages between participants
    Serve,
    /// Join a chat room interactively
    Connect,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    init_tracing(&args)?;

    // Load configuration with priority: CLI args > config file > environment > defaults
    let mut config = if args.config.exists() {
        ConfigManager::load_from_file(&args.config)?
    } else {
        info!("Config file not found, checking environment variables");
        ConfigManager::load_from_env()?
    };

    config.merge_with_cli_args(
        args.addr.as_deref(),
        args.port,
        args.buffer_size,
        args.backlog,
    );

    config
        .validate()
        .context("Final configuration validation failed")?;

    if args.validate_config {
        info!("Configuration is valid");
        info!("  Bind address: {}", config.server.bind_addr);
        info!("  Server address: {}", config.client.server_addr);
        info!("  Listen backlog: {}", config.server.listen_backlog);
        info!("  Receive buffer: {} bytes", config.server.recv_buffer_size);
        info!("  Poll timeout: {:?}", config.server.poll_timeout);
        info!("  Connect timeout: {:?}", config.client.connect_timeout);
        return Ok(());
    }

    match args.command {
        Command::Serve => serve(config.server).await,
        Command::Connect => connect(config.client).await,
    }
}

/// Run the chat room server until a shutdown signal arrives
async fn serve(config: rustrelay::config::ServerConfig) -> Result<()> {
    info!(
        "Starting RustRelay v{} chat room server",
        env!("CARGO_PKG_VERSION")
    );

    let mut server = ChatServer::new(config);
    server.bind().await?;
    let signal = server.shutdown_signal();

    tokio::spawn(async move {
        if let Err(e) = shutdown::listen_for_signals(signal).await {
            error!("Error setting up signal handlers: {}", e);
        }
    });

    server.run().await?;
    info!("Server shutdown complete");
    Ok(())
}

/// Run an interactive client session over stdin/stdout
async fn connect(config: rustrelay::config::ClientConfig) -> Result<()> {
    let mut client = match ChatClient::connect(config).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Unable to connect.");
            return Err(e);
        }
    };

    let signal = client.shutdown_signal();
    tokio::spawn(async move {
        if let Err(e) = shutdown::listen_for_signals(signal).await {
            error!("Error setting up signal handlers: {}", e);
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    client.run(stdin, tokio::io::stdout()).await?;
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(args: &CliArgs) -> Result<()> {
    let log_level = if args.verbose {
        "debug"
    } else {
        &args.log_level
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}
