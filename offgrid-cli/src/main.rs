//! offgrid CLI - Command-line interface
//!
//! This binary provides a command-line interface to the offgrid library:
//! region management, region downloads, and tile resolution.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::config::ConfigCommands;
use commands::download::DownloadArgs;
use commands::region::RegionCommands;
use commands::resolve::ResolveArgs;
use commands::tile::TileArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "offgrid")]
#[command(version = offgrid::VERSION)]
#[command(about = "Offline map tile cache and region download manager", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.offgrid/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print log output to stderr at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage offline regions
    #[command(subcommand)]
    Region(RegionCommands),

    /// Download a region's tiles (Ctrl-C cancels)
    Download(DownloadArgs),

    /// Resolve the tile at a point: offline cache, live server, or placeholder
    Resolve(ResolveArgs),

    /// Show the tile containing a point and its bounds
    Tile(TileArgs),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Tile(args) => commands::tile::run(args),
        Commands::Config(command) => commands::config::run(command, config_path),
        Commands::Region(command) => {
            let runner = CliRunner::new(config_path, cli.verbose)?;
            runner.log_startup("region");
            let manager = runner.create_manager(true)?;
            commands::region::run(&manager, command).await
        }
        Commands::Download(args) => {
            let runner = CliRunner::new(config_path, cli.verbose)?;
            runner.log_startup("download");
            let manager = runner.create_manager(true)?;
            commands::download::run(&manager, args).await
        }
        Commands::Resolve(args) => {
            let runner = CliRunner::new(config_path, cli.verbose)?;
            runner.log_startup("resolve");
            let manager = runner.create_manager(!args.offline)?;
            commands::resolve::run(&manager, args).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_region_add_with_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "offgrid", "region", "add", "--name", "Harbor", "--north", "-33.80", "--south",
            "-33.90", "--east", "151.30", "--west", "151.20", "--max-zoom", "14",
        ])
        .unwrap();

        match cli.command {
            Commands::Region(RegionCommands::Add {
                name,
                south,
                min_zoom,
                max_zoom,
                ..
            }) => {
                assert_eq!(name, "Harbor");
                assert_eq!(south, -33.90);
                assert_eq!(min_zoom, 0);
                assert_eq!(max_zoom, 14);
            }
            _ => panic!("expected region add"),
        }
    }

    #[test]
    fn test_parse_resolve_flags() {
        let cli = Cli::try_parse_from([
            "offgrid", "--config", "/tmp/c.ini", "resolve", "--lat", "1.5", "--lon", "-2.5",
            "--zoom", "12", "--offline", "--output", "tile.png",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.ini")));
        match cli.command {
            Commands::Resolve(args) => {
                assert!(args.offline);
                assert_eq!(args.lon, -2.5);
                assert_eq!(args.output, Some(PathBuf::from("tile.png")));
            }
            _ => panic!("expected resolve"),
        }
    }

    #[test]
    fn test_download_requires_region_id() {
        assert!(Cli::try_parse_from(["offgrid", "download"]).is_err());
    }
}
