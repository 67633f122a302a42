//! Stub Server - CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use stub_server::{FindRequest, StubServer, StubServerConfig, StubService};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "stub-server",
    about = "Stub matching engine for RPC test doubles - load, validate and query stubs",
    version
)]
struct Args {
    /// Path to stub configuration file (YAML or JSON)
    #[arg(short, long, default_value = "stubs.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, default_value = "info")]
    log_level: Level,

    /// Print default configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Resolve one lookup, given as JSON: {"service": .., "method": .., "data": {..}}
    #[arg(long, value_name = "JSON")]
    find: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if args.print_config {
        let default_config = include_str!("../demos/default-config.yaml");
        println!("{}", default_config);
        return Ok(());
    }

    let config = if args.config.exists() {
        info!(path = ?args.config, "Loading configuration");
        StubServerConfig::from_file(&args.config)?
    } else if args.validate {
        anyhow::bail!("Configuration file not found: {:?}", args.config);
    } else {
        info!("Using default configuration (no stubs)");
        StubServerConfig::default()
    };

    if args.validate {
        config.validate()?;
        println!(
            "Configuration is valid ({} stubs defined)",
            config.stubs.len()
        );
        return Ok(());
    }

    let server = StubServer::new(config)?;

    match args.find {
        Some(query) => {
            let request: FindRequest =
                serde_json::from_str(&query).context("Invalid lookup request")?;
            let output = server.find_stub(request).await?;
            info!(
                status = %output.status_code(),
                failure = output.is_failure(),
                "Lookup resolved"
            );
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        None => {
            let stubs = server.list_stubs().await;
            println!("{}", serde_json::to_string_pretty(&stubs)?);
        }
    }

    Ok(())
}
