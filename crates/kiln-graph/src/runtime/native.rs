//! Native filesystem runtime.

// NativeRuntime is the one place that wraps std::fs for reads
#![allow(clippy::disallowed_methods)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::task;

use super::{Runtime, RuntimeError, RuntimeResult};

/// [`Runtime`] backed by `std::fs`.
///
/// Blocking reads run on tokio's blocking pool via `spawn_blocking` so that
/// concurrent node loads do not stall the async workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = path.to_path_buf();

        task::spawn_blocking(move || {
            std::fs::read(&path).map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RuntimeError::FileNotFound(path.clone())
                } else {
                    RuntimeError::Io(format!("Failed to read {}: {}", path.display(), e))
                }
            })
        })
        .await
        .map_err(|e| RuntimeError::Other(format!("Task join error: {}", e)))?
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        std::env::current_dir()
            .map_err(|e| RuntimeError::Io(format!("Failed to get current directory: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_existing_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.js");
        std::fs::write(&file, b"export const a = 1;").unwrap();

        let runtime = NativeRuntime::new();
        let bytes = runtime.read_file(&file).await.unwrap();
        assert_eq!(bytes, b"export const a = 1;");
        assert!(runtime.exists(&file));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let runtime = NativeRuntime::new();
        let err = runtime
            .read_file(&temp.path().join("missing.js"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::FileNotFound(_)));
    }
}
