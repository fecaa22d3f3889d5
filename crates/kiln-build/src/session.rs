//! Long-lived build state for watch mode.
//!
//! A [`BuildSession`] keeps the graph of the last successful build so the
//! next one only reads files that changed. Starting a build cancels the one
//! still in flight; a cancelled or failed build never replaces the graph.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use kiln_graph::{CancellationToken, ModuleGraph, NativeRuntime, Runtime};
use parking_lot::{Mutex, RwLock};
use path_clean::PathClean;
use rustc_hash::FxHashSet;
use tracing::{debug, info};
use url::Url;

use crate::config::BuildConfig;
use crate::pipeline::{self, BuildOutcome, Planned};
use crate::{Error, Result};

pub struct BuildSession {
    config: BuildConfig,
    runtime: Arc<dyn Runtime>,
    graph: RwLock<Option<Arc<ModuleGraph>>>,
    current: Mutex<CancellationToken>,
}

impl BuildSession {
    pub fn new(config: BuildConfig) -> Self {
        Self::with_runtime(config, Arc::new(NativeRuntime::new()))
    }

    pub fn with_runtime(config: BuildConfig, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            config,
            runtime,
            graph: RwLock::new(None),
            current: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Graph of the last successful build.
    pub fn graph(&self) -> Option<Arc<ModuleGraph>> {
        self.graph.read().clone()
    }

    /// Cancel the build in flight, if any.
    pub fn cancel(&self) {
        self.current.lock().cancel();
    }

    /// Cancel the previous build and hand out the token of a new one.
    fn start(&self) -> CancellationToken {
        let mut current = self.current.lock();
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }

    /// Full build, ignoring any previous graph.
    pub async fn build(&self) -> Result<BuildOutcome> {
        let cancel = self.start();
        let started = Instant::now();
        let (builder, entries) =
            pipeline::prepare(&self.config, Arc::clone(&self.runtime), cancel.clone()).await?;
        let build = builder.build(entries).await?;
        let planned = pipeline::plan(&self.config, build, started)?;
        self.commit(planned, &cancel)
    }

    /// Build again after `changed` files were modified, reusing every
    /// unchanged node of the last successful build.
    pub async fn rebuild(&self, changed: &[PathBuf]) -> Result<BuildOutcome> {
        let Some(previous) = self.graph() else {
            debug!("no previous graph, running a full build");
            return self.build().await;
        };
        if let Some(import_map) = pipeline::import_map_path(&self.config)? {
            if changed.iter().any(|path| self.absolute(path) == import_map) {
                info!("Import map changed, running a full build");
                return self.build().await;
            }
        }

        let changed_urls: FxHashSet<Url> = changed
            .iter()
            .filter_map(|path| Url::from_file_path(self.absolute(path)).ok())
            .collect();
        info!(changed = changed_urls.len(), "Rebuilding");

        let cancel = self.start();
        let started = Instant::now();
        let (builder, entries) =
            pipeline::prepare(&self.config, Arc::clone(&self.runtime), cancel.clone()).await?;
        let build = builder.rebuild(entries, &previous, &changed_urls).await?;
        let planned = pipeline::plan(&self.config, build, started)?;
        self.commit(planned, &cancel)
    }

    /// Write `planned` and keep its graph, unless a newer build started.
    /// [`Self::start`] takes the same lock, so none can start mid-write.
    fn commit(&self, planned: Planned, cancel: &CancellationToken) -> Result<BuildOutcome> {
        let _current = self.current.lock();
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let outcome = pipeline::write(&self.config, planned)?;
        *self.graph.write() = Some(Arc::clone(&outcome.graph));
        Ok(outcome)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.clean();
        }
        match self.config.absolute_root() {
            Ok(root) => root.join(path).clean(),
            Err(_) => path.clean(),
        }
    }
}

impl std::fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSession")
            .field("config", &self.config)
            .field("has_graph", &self.graph.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_graph::MemoryRuntime;

    fn site() -> (BuildSession, Arc<MemoryRuntime>, tempfile::TempDir) {
        let out = tempfile::tempdir().unwrap();
        let runtime = Arc::new(MemoryRuntime::new("/site"));
        runtime.insert("/site/main.js", "import { x } from './util.js';\nconsole.log(x);\n");
        runtime.insert("/site/util.js", "export const x = 1;\n");
        let config = BuildConfig::new("/site", out.path()).entry("main.js", "main.js");
        let session = BuildSession::with_runtime(config, runtime.clone());
        (session, runtime, out)
    }

    #[tokio::test]
    async fn test_rebuild_without_graph_is_full_build() {
        let (session, _runtime, _out) = site();
        assert!(session.graph().is_none());

        let outcome = session.rebuild(&[PathBuf::from("util.js")]).await.unwrap();
        assert_eq!(outcome.stats.reused, 0);
        assert!(session.graph().is_some());
    }

    #[tokio::test]
    async fn test_rebuild_reuses_unchanged_nodes() {
        let (session, runtime, _out) = site();
        session.build().await.unwrap();

        runtime.insert("/site/util.js", "export const x = 2;\n");
        let outcome = session.rebuild(&[PathBuf::from("/site/util.js")]).await.unwrap();
        assert_eq!(outcome.stats.loaded, 1);
        assert_eq!(outcome.stats.reused, 1);
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_graph() {
        let (session, runtime, _out) = site();
        session.build().await.unwrap();
        let before = session.graph().unwrap();

        runtime.remove("/site/util.js");
        assert!(session.rebuild(&[PathBuf::from("util.js")]).await.is_err());
        assert!(Arc::ptr_eq(&before, &session.graph().unwrap()));
    }

    #[tokio::test]
    async fn test_superseded_build_writes_nothing() {
        let (session, runtime, out) = site();
        let cancel = session.start();
        let (builder, entries) = pipeline::prepare(&session.config, runtime, cancel.clone())
            .await
            .unwrap();
        let build = builder.build(entries).await.unwrap();
        let planned = pipeline::plan(&session.config, build, Instant::now()).unwrap();

        let newer = session.start();
        let err = session.commit(planned, &cancel).unwrap_err();
        assert!(err.is_cancelled());
        assert!(!newer.is_cancelled());
        assert!(session.graph().is_none());
        assert!(!out.path().join("main.js").exists());

        session.build().await.unwrap();
        assert!(out.path().join("main.js").exists());
    }

    #[test]
    fn test_start_cancels_previous_token() {
        let (session, _runtime, _out) = site();
        let first = session.start();
        let second = session.start();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        session.cancel();
        assert!(second.is_cancelled());
    }
}
