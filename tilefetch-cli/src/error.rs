//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;
use tilefetch::config::ConfigFileError;
use tilefetch::coord::CoordError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Configuration file could not be loaded
    Config(ConfigFileError),
    /// Invalid command-line value
    InvalidArgument(String),
    /// Tile address or position is invalid
    Coord(CoordError),
    /// No tile was requested
    NoTiles,
    /// The loader stopped before reporting every tile
    LoaderStopped { reported: usize, expected: usize },
    /// Some tiles could not be loaded
    TilesFailed { failed: usize, total: usize },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::NoTiles => {
                eprintln!();
                eprintln!("Request tiles with --tile z/x/y or --lat/--lon/--zoom.");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!(
                    "Check {} or pass another file with --config.",
                    tilefetch::config::config_file_path().display()
                );
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::TilesFailed { .. } => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Coord(e) => write!(f, "Invalid tile: {}", e),
            CliError::NoTiles => write!(f, "No tiles requested"),
            CliError::LoaderStopped { reported, expected } => write!(
                f,
                "Loader stopped after reporting {} of {} tiles",
                reported, expected
            ),
            CliError::TilesFailed { failed, total } => {
                write!(f, "{} of {} tiles failed to load", failed, total)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Coord(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Coord(e)
    }
}
