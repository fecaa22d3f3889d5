//! In-memory runtime.
//!
//! Serves files from a path-keyed map. Used by tests and by embedders that
//! already hold sources in memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;

use super::{Runtime, RuntimeError, RuntimeResult};

/// Virtual filesystem runtime.
///
/// Clones share the same file table, so a test can keep a handle and mutate
/// files between builds.
#[derive(Debug, Clone, Default)]
pub struct MemoryRuntime {
    files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
    cwd: PathBuf,
}

impl MemoryRuntime {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            files: Arc::default(),
            cwd: cwd.into(),
        }
    }

    /// Insert or replace a file. Relative paths are taken from the runtime's cwd.
    pub fn insert(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = self.normalize(path.as_ref());
        self.files.write().insert(path, content.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        let path = self.normalize(path.as_ref());
        self.files.write().remove(&path)
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.clean()
        } else {
            self.cwd.join(path).clean()
        }
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize(path);
        self.files
            .read()
            .get(&normalized)
            .cloned()
            .ok_or(RuntimeError::FileNotFound(normalized))
    }

    fn exists(&self, path: &Path) -> bool {
        let normalized = self.normalize(path);
        let files = self.files.read();
        files.contains_key(&normalized) || files.keys().any(|p| p.starts_with(&normalized))
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
