use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use codeatlas::cli::{Cli, CliApp};
use codeatlas::IndexerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => IndexerConfig::from_file(path)?,
        None => IndexerConfig::default(),
    };
    let app = CliApp::new(config)?;
    app.run(cli.command).await
}
