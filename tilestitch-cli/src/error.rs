//! CLI error handling with user-friendly messages.
//!
//! Every failure that stops the command before or outside the batch ends up
//! here. Per-area failures are not errors at this level; they are reported
//! in the summary and reflected in the exit code.

use std::fmt;
use std::io;
use std::process::ExitCode;

use tilestitch::cache::CacheError;
use tilestitch::config::{ConfigFileError, GOOGLE_API_KEY_ENV};
use tilestitch::coord::CoordError;
use tilestitch::provider::ProviderError;

/// Exit status when the command could not run.
pub const EXIT_ERROR: u8 = 1;

/// Exit status when at least one area of a batch failed.
pub const EXIT_AREA_FAILED: u8 = 2;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to start the async runtime
    Runtime(io::Error),
    /// Configuration file could not be loaded or holds invalid values
    ConfigFile(ConfigFileError),
    /// Invalid command-line input
    Config(String),
    /// Failed to create the tile provider
    Provider(ProviderError),
    /// Failed to open the tile cache
    Cache(CacheError),
    /// Invalid `--bbox`
    BoundingBox(CoordError),
    /// The configuration names no areas
    NoAreas,
    /// `--area` named an area missing from the configuration
    UnknownArea(String),
}

impl CliError {
    /// Prints the error with any hints and returns the exit code to use.
    pub fn report(&self) -> ExitCode {
        eprintln!("Error: {}", self);

        match self {
            CliError::Provider(ProviderError::Configuration(_)) => print_google_hint(),
            CliError::ConfigFile(ConfigFileError::InvalidValue { key, .. })
                if key == "google_api_key" =>
            {
                print_google_hint()
            }
            CliError::NoAreas => {
                eprintln!();
                eprintln!("Add one or more sections like this to the config file:");
                eprintln!("  [area:downtown_la]");
                eprintln!("  bbox = -118.2537, 34.0422, -118.2437, 34.0522");
                eprintln!("or use 'tilestitch bbox' for a single ad-hoc area.");
            }
            _ => {}
        }

        ExitCode::from(EXIT_ERROR)
    }
}

fn print_google_hint() {
    eprintln!();
    eprintln!("If using the Google provider, make sure:");
    eprintln!(
        "  1. google_api_key is set in [provider] or {} is exported",
        GOOGLE_API_KEY_ENV
    );
    eprintln!("  2. The Map Tiles API is enabled in Google Cloud Console");
    eprintln!("  3. Billing is enabled for your project");
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Provider(e) => write!(f, "Failed to create provider: {}", e),
            CliError::Cache(e) => write!(f, "Failed to open tile cache: {}", e),
            CliError::BoundingBox(e) => write!(f, "Invalid --bbox: {}", e),
            CliError::NoAreas => write!(f, "No areas configured"),
            CliError::UnknownArea(name) => {
                write!(f, "Area '{}' is not defined in the config file", name)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Runtime(e) => Some(e),
            CliError::ConfigFile(e) => Some(e),
            CliError::Provider(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::BoundingBox(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}
