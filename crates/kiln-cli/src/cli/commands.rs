use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::enums::*;
use crate::cli::validation::{parse_entry, parse_hash_length};

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the configured entry points once
    ///
    /// Writes one artifact per chunk plus manifest.json (and importmap.json
    /// when needed) to the output directory.
    Build(BuildArgs),

    /// Build, then rebuild incrementally whenever a file under the root changes
    ///
    /// A change that arrives while a build is running cancels that build.
    Watch(WatchArgs),
}

/// Arguments shared by `build` and `watch`. Every option left unset falls
/// back to kiln.config.json, then `KILN_*` environment variables, then the
/// built-in defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Entry points, relative to the root, optionally renamed in the output
    ///
    /// Examples:
    ///   kiln build index.html
    ///   kiln build src/index.html=index.html about.html
    #[arg(value_name = "ENTRY[=NAME]", value_parser = parse_entry)]
    pub entries: Vec<(String, Option<String>)>,

    /// Source root; every module must live below it
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'd', long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Import map used to resolve bare specifiers
    #[arg(long, value_name = "FILE")]
    pub import_map: Option<PathBuf>,

    /// Hex characters of the version embedded in public URLs (4-64)
    #[arg(long, value_name = "N", value_parser = parse_hash_length, conflicts_with = "full_hash")]
    pub hash_length: Option<usize>,

    /// Embed the full digest instead of a prefix
    #[arg(long)]
    pub full_hash: bool,

    /// Digest algorithm
    #[arg(long, value_enum, value_name = "ALGORITHM")]
    pub hash: Option<HashArg>,

    /// Where versions go in public URLs
    #[arg(long, value_enum)]
    pub placement: Option<PlacementArg>,

    /// Whether import() targets feed their importer's version
    #[arg(long, value_enum)]
    pub dynamic_imports: Option<DynamicImportsArg>,

    /// What to do with static import cycles
    #[arg(long, value_enum)]
    pub cycles: Option<CyclesArg>,

    /// Move modules reached from several chunks into shared chunks
    #[arg(long)]
    pub shared_chunks: bool,

    /// Public path the output directory is served from
    #[arg(long, value_name = "PATH")]
    pub base: Option<String>,

    /// Config file (defaults to kiln.config.json when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Quiet period before a batch of changes triggers a rebuild
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub debounce: u64,
}
