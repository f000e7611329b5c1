use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use switchyard_host::{HostConfig, run as run_host};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "switchyard")]
struct Cli {
    /// Path to a switchyard config file (toml/json).
    #[arg(long = "config", value_name = "PATH")]
    config: PathBuf,

    /// Print the resolved config and exit.
    #[arg(long = "config-explain")]
    config_explain: bool,

    /// Port to serve the HTTP server on; overrides `[server].port`.
    #[arg(long)]
    port: Option<u16>,
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run() {
        tracing::error!(error = %format!("{err:#}"), "switchyard failed");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = HostConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(port) = cli.port {
        config = config.with_port(port);
    }
    if cli.config_explain {
        print!("{}", config.explain()?);
        return Ok(());
    }
    run_host(config)
}
