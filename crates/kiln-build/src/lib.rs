//! # kiln-build
//!
//! Content versioning, chunk planning and output writing on top of
//! [`kiln_graph`].
//!
//! A build loads the module graph from the configured entries, assigns every
//! module an effective version that changes whenever it or anything it
//! statically depends on changes, groups modules into chunks and writes one
//! artifact per chunk together with a manifest and an import map.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kiln_build::{BuildConfig, VersionPlacement, build};
//!
//! # async fn run() -> kiln_build::Result<()> {
//! let config = BuildConfig::new("site", "dist")
//!     .entry("index.html", "index.html")
//!     .placement(VersionPlacement::Filename);
//!
//! let outcome = build(&config).await?;
//! for (entry, file) in &outcome.manifest.entries {
//!     println!("{entry} -> {file}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Watch-mode callers keep a [`BuildSession`] around and call
//! [`BuildSession::rebuild`] with the files that changed.

pub mod chunking;
pub mod config;
pub mod diagnostics;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod versioning;

#[cfg(feature = "logging")]
pub mod logging;

pub use chunking::{Chunk, ChunkError, ChunkId, ChunkKind, ChunkPlan, plan_chunks};
pub use config::{
    BuildConfig, ChunkingConfig, CyclePolicy, DynamicImportPolicy, HashLength, ImportMapSource,
    VersionPlacement, VersioningConfig,
};
pub use diagnostics::{DiagnosticError, to_diagnostic_error};
pub use output::{
    Emitted, Manifest, ManifestChunk, OutputFile, OutputImportMap, WriteError, WriteReport, emit,
};
pub use pipeline::{BuildOutcome, BuildStats, build, build_with};
pub use session::BuildSession;
pub use versioning::{
    VersionError, Versions, compute_versions, version_chunks, versioned_path, versioned_url,
};

pub use kiln_graph;
pub use kiln_graph::{BuildDiagnostic, BuildReport, DiagnosticKind, HashAlgorithm};

use kiln_graph::GraphError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Build failed with {} error(s)", .0.error_count())]
    Build(BuildReport),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Build cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GraphError> for Error {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Cancelled => Self::Cancelled,
            other => Self::Build(other.report()),
        }
    }
}

impl Error {
    /// Every diagnostic this error stands for.
    pub fn report(&self) -> BuildReport {
        match self {
            Self::Build(report) => report.clone(),
            Self::Version(err) => err.report(),
            Self::Chunk(err) => err.report(),
            Self::Write(err) => err.report(),
            Self::InvalidConfig(_) | Self::Cancelled | Self::Io(_) => {
                BuildReport::new(vec![BuildDiagnostic::error(
                    DiagnosticKind::InvalidConfig,
                    self.to_string(),
                )])
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl miette::Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let code = match self {
            Self::InvalidConfig(_) => "kiln::invalid_config",
            Self::Build(_) => "kiln::build",
            Self::Version(_) => DiagnosticKind::CycleWithoutVersionPolicy.code(),
            Self::Chunk(_) => DiagnosticKind::EmptyChunk.code(),
            Self::Write(WriteError::MissingExport { .. }) => DiagnosticKind::MissingExport.code(),
            Self::Write(_) => DiagnosticKind::WriteError.code(),
            Self::Cancelled => "kiln::cancelled",
            Self::Io(_) => "kiln::io",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let help = match self {
            Self::InvalidConfig(_) => "check kiln.config.json and the command-line flags",
            Self::Version(_) => "set versioning.cycles to \"seed-with-raw-hash\" to allow import cycles",
            Self::Write(WriteError::PathConflict { .. }) => {
                "give the entries distinct output names, or move one of the files"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
