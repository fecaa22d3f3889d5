//! Command implementations for the kiln CLI.
//!
//! - [`build`] - one build of the configured entries
//! - [`watch`] - initial build, then incremental rebuilds on change

pub mod build;
pub(crate) mod utils;
pub mod watch;

pub use build::execute as build_execute;
pub use watch::execute as watch_execute;
