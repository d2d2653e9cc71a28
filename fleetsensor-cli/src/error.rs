//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use fleetsensor::catalog::CatalogError;
use fleetsensor::error::FetchError;
use fleetsensor::query::QueryError;
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Failed to open the shared key-value store
    StoreOpen(String),
    /// Failed to create the query service client
    ClientCreation(QueryError),
    /// Channel catalog could not be built
    Catalog(CatalogError),
    /// A fetch was rejected by the engine
    Fetch(FetchError),
    /// Failed to serialize output
    Output(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Catalog(CatalogError::Unavailable) => {
                eprintln!();
                eprintln!("The query service resolved no sensor channels. Make sure:");
                eprintln!("  1. The service URL points at a telemetry deployment");
                eprintln!("  2. The deployment has the fleet channel set provisioned");
            }
            CliError::Fetch(FetchError::Busy { .. }) => {
                eprintln!();
                eprintln!("Another search for this vehicle is still running; retry shortly.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::StoreOpen(msg) => write!(f, "Failed to open store: {}", msg),
            CliError::ClientCreation(e) => write!(f, "Failed to create query client: {}", e),
            CliError::Catalog(e) => write!(f, "Channel catalog error: {}", e),
            CliError::Fetch(e) => write!(f, "{}", e),
            CliError::Output(msg) => write!(f, "Failed to write output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}
