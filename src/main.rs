//! Rust IRC Daemon - Main binary
//!
//! Runs the mode engine behind a line console: each stdin line is
//! `<nick> <irc command>` for a local user (created on first use), or
//! `@server <FMODE|MODE ...>` for a line from a linked server. Whatever the
//! server sends back is printed.

use clap::{Parser, Subcommand};
use modeircd_core::{Config, Message, Server, User, UserId};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Rust IRC Daemon - channel and user mode engine
#[derive(Parser)]
#[command(name = "modeircd")]
#[command(about = "A modular IRC daemon built around an extensible mode engine")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Test configuration and exit
    #[arg(long)]
    test_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a default configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    if let Some(command) = cli.command {
        match command {
            Commands::Config { output } => {
                generate_config(&output)?;
                return Ok(());
            }
            Commands::Version => {
                show_version();
                return Ok(());
            }
        }
    }

    let config = if cli.config.exists() {
        info!("Loading configuration from {:?}", cli.config);
        Config::from_file(&cli.config)?
    } else {
        info!("Configuration file not found, using defaults");
        Config::default()
    };

    config.validate()?;
    if cli.test_config {
        info!("Configuration is valid");
        return Ok(());
    }

    let mut server = Server::new(config);
    modeircd_modules::load_configured(&mut server)?;
    info!(
        "Ready with {} modules: {}",
        server.modules.get_loaded_modules().len(),
        server.isupport().join(" ")
    );

    run_console(&mut server).await
}

/// Feed stdin lines to the server until EOF
async fn run_console(server: &mut Server) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((who, rest)) = line.split_once(' ') else {
            warn!("Expected '<nick> <command>', got {:?}", line);
            continue;
        };

        let message = match Message::parse(rest) {
            Ok(message) => message,
            Err(e) => {
                warn!("Could not parse {:?}: {}", rest, e);
                continue;
            }
        };

        let result = if who == "@server" {
            server.handle_remote_mode(&message)
        } else {
            match console_user(server, who) {
                Ok(id) => server.handle_message(&id, &message),
                Err(e) => Err(e),
            }
        };
        if let Err(e) = result {
            error!("Error handling {:?}: {}", line, e);
        }

        flush(server);
    }
    info!("Console closed, shutting down");
    Ok(())
}

/// Find a local user by nick, connecting a new one if needed
fn console_user(server: &mut Server, nick: &str) -> modeircd_core::Result<UserId> {
    if let Some(id) = server.net.find_nick_id(nick) {
        return Ok(id);
    }
    let user = User::new(
        nick.to_string(),
        nick.to_lowercase(),
        nick.to_string(),
        "console".to_string(),
        server.config().server.name.clone(),
        true,
    );
    server.net.add_user(user)
}

/// Print everything queued for users and linked servers
fn flush(server: &mut Server) {
    for delivery in server.net.take_deliveries() {
        print!("-> {} {}", server.net.nick_of(&delivery.to), delivery.message.to_line());
    }
    for message in server.net.take_propagated() {
        print!("=> {}", message.to_line());
    }
}

/// Initialize logging
fn init_logging(level: &str) -> anyhow::Result<()> {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Generate default configuration file
fn generate_config(output: &Path) -> anyhow::Result<()> {
    let config = Config::default();
    config.to_file(output)?;
    println!("Generated default configuration file: {:?}", output);
    Ok(())
}

/// Show version information
fn show_version() {
    println!("modeircd {}", env!("CARGO_PKG_VERSION"));
}
