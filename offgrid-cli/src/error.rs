//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use offgrid::config::ConfigFileError;
use offgrid::coord::CoordError;
use offgrid::download::DownloadError;
use offgrid::manager::ManagerError;
use std::fmt;
use std::path::PathBuf;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Bad coordinates, zoom levels or identifiers on the command line
    InvalidArgument(String),
    /// Library operation failed
    Manager(ManagerError),
    /// A download finished with tiles missing
    DownloadFailed {
        failed: u64,
        last_error: Option<String>,
    },
    /// The user interrupted a download
    Interrupted,
    /// Failed to write output file
    FileWrite { path: PathBuf, error: std::io::Error },
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) | CliError::Config(_) => 2,
            CliError::Interrupted => 130,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Manager(ManagerError::Download(
                DownloadError::ConcurrentDownloadRejected { .. },
            )) => {
                eprintln!();
                eprintln!("Only one region downloads at a time.");
                eprintln!("Wait for it to finish or cancel it first.");
            }
            CliError::DownloadFailed { .. } => {
                eprintln!();
                eprintln!("Tiles already stored are kept. Run the download again to");
                eprintln!("retry only the missing tiles.");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Run 'offgrid config show' to see the effective settings.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "{}", msg),
            CliError::Manager(e) => write!(f, "{}", e),
            CliError::DownloadFailed { failed, last_error } => {
                write!(f, "Download finished with {} failed tiles", failed)?;
                if let Some(error) = last_error {
                    write!(f, " (last error: {})", error)?;
                }
                Ok(())
            }
            CliError::Interrupted => write!(f, "Download cancelled"),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Manager(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<ManagerError> for CliError {
    fn from(e: ManagerError) -> Self {
        CliError::Manager(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::InvalidArgument(e.to_string())
    }
}
