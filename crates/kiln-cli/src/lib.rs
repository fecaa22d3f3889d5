//! Command-line interface for kiln.
//!
//! - [`cli`] - argument definitions
//! - [`config`] - `kiln.config.json`, environment and flag layering
//! - [`commands`] - `kiln build` and `kiln watch`
//! - [`error`] - CLI errors and their miette rendering
//! - [`logger`] / [`ui`] - tracing subscriber and terminal output

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;
pub mod watcher;

pub use error::{CliError, ConfigError, Result};
