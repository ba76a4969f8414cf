use anyhow::{Context, Result};
use clap::Parser;
use golbat_config::RuntimeConfig;
use std::path::PathBuf;

/// Raw proto ingestion server for scanner traffic
#[derive(Parser)]
#[command(name = "golbat")]
#[command(version)]
#[command(about = "Raw proto ingestion server for scanner traffic", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// HTTP listen port (overrides config file)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// gRPC listen port, 0 disables (overrides config file)
    #[arg(long, value_name = "PORT")]
    grpc_port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = if let Some(config_path) = &cli.config {
        RuntimeConfig::load_from_path(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        RuntimeConfig::load().context("Failed to load configuration")?
    };

    apply_cli_overrides(&mut config, &cli);

    golbat::run_with_config(config).await
}

fn apply_cli_overrides(config: &mut RuntimeConfig, cli: &Cli) {
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(port) = cli.grpc_port {
        config.grpc_port = port;
    }
    if cli.debug {
        config.logging.debug = true;
    }
}
