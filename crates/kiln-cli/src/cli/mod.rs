//! Command-line interface definition.
//!
//! - `kiln build` - one build of the configured entries
//! - `kiln watch` - initial build, then incremental rebuilds on change

mod commands;
pub mod enums;
mod tests;
mod validation;

use clap::Parser;

pub use commands::{BuildArgs, Command, WatchArgs};
pub use enums::*;
pub use validation::{parse_entry, parse_hash_length};

/// kiln - content-versioned, chunked builds for the browser
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Content-versioned, chunked builds of HTML/JS/CSS module graphs",
    long_about = "kiln follows the references of your HTML, JavaScript and CSS entry points,\n\
                  versions every file by its content and everything it depends on, groups\n\
                  modules into chunks and writes them with a manifest and an import map."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}
