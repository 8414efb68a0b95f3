use std::path::Path;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{apply_env_overrides, load_config};
use crate::gateway;

mod doctor;

#[derive(Parser)]
#[command(name = "mediarelay")]
#[command(version)]
#[command(about = "Validating relay for media uploads to the Telegram Bot API")]
pub struct Cli {
    /// Path to the config file (defaults to ./mediarelay.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Bind address override
        #[arg(long)]
        host: Option<String>,
        /// Port override
        #[arg(long)]
        port: Option<u16>,
    },
    /// Check configuration, spool storage and upstream reachability
    Doctor,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => serve(cli.config.as_deref(), host, port).await,
        Commands::Doctor => doctor::doctor_command(cli.config.as_deref()).await,
    }
}

async fn serve(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    apply_env_overrides(&mut config);
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let (server, _addr) = gateway::start(config).await?;

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    server.abort();
    Ok(())
}
