use anyhow::Result;
use clap::Parser;
use std::path::Path;

mod cli;
mod engine;
mod overlay;

use cli::{Cli, Commands};
use dashkiosk_core::config::Config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    init_logging(cli.verbose, &config_path);

    match cli.command {
        Commands::Run(args) => crate::cli::run::run(args, &config_path).await,
        Commands::Config(args) => crate::cli::config::run(args, &config_path),
        Commands::Check => crate::cli::check::run(&config_path),
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` means debug, else the configured level.
fn init_logging(verbose: bool, config_path: &Path) {
    let level = if verbose {
        "debug".to_string()
    } else {
        Config::read(config_path)
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "info".to_string())
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
