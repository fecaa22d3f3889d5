//! Platform runtime abstraction for the graph builder.
//!
//! The builder never touches the filesystem directly. Everything it reads goes
//! through a [`Runtime`], so the same traversal code runs against the real
//! filesystem ([`NativeRuntime`]) or an in-memory tree ([`MemoryRuntime`]).

mod memory;
mod native;

pub use memory::MemoryRuntime;
pub use native::NativeRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

/// File-read capability consumed by the graph builder.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// from many tasks at once.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file's bytes.
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    /// Check if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Get the current working directory.
    fn get_cwd(&self) -> RuntimeResult<PathBuf>;
}
