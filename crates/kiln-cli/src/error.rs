//! Error types for the kiln CLI.
//!
//! `CliError` is what commands return. Configuration problems carry a hint
//! for the user; build failures keep the library's [`kiln_build::Error`] so
//! the report can be rendered with source snippets at exit.

mod report;

use std::path::PathBuf;

use thiserror::Error;

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] kiln_build::Error),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicit `--config` path doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a kiln.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    /// Merging or deserializing the layered sources failed
    #[error("{0}\n\nHint: Check kiln.config.json and KILN_* environment variables")]
    Extract(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
