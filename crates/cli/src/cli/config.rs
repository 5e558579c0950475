use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::Path;

use dashkiosk_core::config::Config;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the default config template
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print a single value (e.g. kiosk.ping_timeout)
    Get { key: String },

    /// Set a single value and save
    Set { key: String, value: String },

    /// Print the config file location
    Path,
}

pub fn run(args: ConfigArgs, config_path: &Path) -> Result<()> {
    match args.command {
        ConfigCommands::Init { force } => init(config_path, force),
        ConfigCommands::Show => {
            let config = Config::load(config_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = Config::load(config_path)?;
            println!("{}", config.get_value(&key)?);
            Ok(())
        }
        ConfigCommands::Set { key, value } => set(config_path, &key, &value),
        ConfigCommands::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

fn init(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }
    Config::save_template(config_path)?;
    Ok(())
}

fn set(config_path: &Path, key: &str, value: &str) -> Result<()> {
    let mut config = Config::load(config_path)?;
    config.set_value(key, value)?;
    config.save(config_path)?;
    println!("{} = {}", key, config.get_value(key)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_set_persists_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        set(&path, "kiosk.ping_url", "http://dash.local/receiver").unwrap();
        set(&path, "kiosk.ping_timeout", "12000").unwrap();

        let config = Config::read(&path).unwrap();
        assert_eq!(config.ping_url().unwrap(), "http://dash.local/receiver");
        assert_eq!(config.timeout().unwrap(), Duration::from_secs(12));
    }

    #[test]
    fn test_set_rejects_invalid_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert!(set(&path, "kiosk.ping_timeout", "-1").is_err());
        assert_eq!(
            Config::read(&path).unwrap().timeout().unwrap(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        init(&path, false).unwrap();
        assert!(init(&path, false).is_err());
        init(&path, true).unwrap();
    }
}
