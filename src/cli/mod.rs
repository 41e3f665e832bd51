//! CLI support for query-defer
//!
//! Provides programmatic access to the demo functionality for embedding in
//! other tools.

mod demo;

pub use demo::{run_demo, DemoOptions, DemoReport};

use std::io;

use crate::error::DeferError;

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Defer engine error
    Defer(DeferError),
    /// JSON parsing error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
    /// No input provided
    NoInput,
    /// Input was valid JSON but not an array of rows
    NotAnArray,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Defer(e) => write!(f, "Defer error: {}", e),
            CliError::Json(e) => write!(f, "Invalid JSON: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(f, "No input provided. Use --input or pipe JSON to stdin."),
            CliError::NotAnArray => {
                write!(f, "Input must be a JSON array of row objects.")
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Defer(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DeferError> for CliError {
    fn from(e: DeferError) -> Self {
        CliError::Defer(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}
