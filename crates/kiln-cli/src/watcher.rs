//! Recursive file watcher feeding `kiln watch`.
//!
//! Events are filtered here; batching them into rebuilds happens in the
//! watch command.

#![allow(clippy::disallowed_methods)]

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{CliError, Result};

/// Suffix of the writer's temporary files.
const TEMP_SUFFIX: &str = ".kiln-tmp";

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Watches a directory recursively and sends changes through a channel.
///
/// The watch stops when this value is dropped.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Watch `root`, skipping anything below one of the `ignored` directories.
    pub fn new(
        root: &Path,
        ignored: Vec<PathBuf>,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.is_dir() {
            return Err(CliError::InvalidArgument(format!(
                "watch root is not a directory: {}",
                root.display()
            )));
        }
        // notify reports canonical paths on some platforms
        let root = root.canonicalize()?;
        let ignored: Vec<PathBuf> = ignored
            .into_iter()
            .map(|dir| dir.canonicalize().unwrap_or(dir))
            .collect();

        let (tx, rx) = mpsc::channel(256);
        let filter_root = root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            for path in event.paths {
                if Self::should_ignore(&path, &filter_root, &ignored) {
                    continue;
                }
                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path),
                    EventKind::Modify(_) => FileChange::Modified(path),
                    EventKind::Remove(_) => FileChange::Removed(path),
                    _ => continue,
                };
                trace!(?change, "File change");
                // The receiver is gone once the watch loop exits.
                if tx.blocking_send(change).is_err() {
                    return;
                }
            }
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Paths outside `root`, under an ignored directory, hidden, or
    /// in-flight output writes.
    fn should_ignore(path: &Path, root: &Path, ignored: &[PathBuf]) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return true;
        };

        if ignored.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }

        if path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(TEMP_SUFFIX))
        {
            return true;
        }

        relative.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    /// Canonical root being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
