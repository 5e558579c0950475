pub mod check;
pub mod config;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dashkiosk")]
#[command(author, version, about = "Kiosk supervisor that reloads a dashboard when it stops checking in")]
pub struct Cli {
    /// Config file (default: ~/.config/dashkiosk/config.toml)
    #[arg(short, long, global = true, env = "DASHKIOSK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display the receiver and keep it alive
    Run(run::RunArgs),

    /// Inspect or edit the configuration
    Config(config::ConfigArgs),

    /// Validate the configuration and print the receiver URL
    Check,
}
