//! Configuration management CLI commands.
//!
//! Provides `config init`, `config path` and `config show`.

use clap::Subcommand;
use offgrid::config::{config_file_path, ConfigFile};
use std::path::Path;

use crate::error::CliError;
use crate::runner::load_config;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a default config file if none exists
    Init,

    /// Show the configuration file path
    Path,

    /// Print the effective configuration as INI
    Show,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    match command {
        ConfigCommands::Init => {
            if path.exists() {
                println!("Config file already exists: {}", path.display());
            } else {
                ConfigFile::default().save_to(&path)?;
                println!("Created config file: {}", path.display());
            }
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Show => {
            let config = load_config(Some(&path))?;
            print!("{}", config.to_ini_string());
            Ok(())
        }
    }
}
