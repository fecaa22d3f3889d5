//! Shared test utilities for kiln-graph tests

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiln_graph::runtime::{Runtime, RuntimeResult};
use kiln_graph::{BuildContext, EntryPoint, GraphBuilder, MemoryRuntime, ModuleGraph};
use url::Url;

pub const ROOT: &str = "/site";

pub fn root_url() -> Url {
    Url::parse("file:///site/").unwrap()
}

pub fn url(path: &str) -> Url {
    root_url().join(path).unwrap()
}

pub fn entry(path: &str) -> EntryPoint {
    EntryPoint::new(url(path), path)
}

/// In-memory project rooted at `/site`.
pub fn project(files: &[(&str, &str)]) -> MemoryRuntime {
    let runtime = MemoryRuntime::new(ROOT);
    for (path, content) in files {
        runtime.insert(Path::new(ROOT).join(path), *content);
    }
    runtime
}

pub fn context(runtime: &MemoryRuntime) -> BuildContext {
    BuildContext::new(Arc::new(runtime.clone()), root_url())
}

pub fn builder(runtime: &MemoryRuntime) -> GraphBuilder {
    GraphBuilder::new(context(runtime))
}

/// Root-relative paths of the graph's nodes in canonical order.
pub fn node_paths(graph: &ModuleGraph) -> Vec<String> {
    graph
        .nodes()
        .map(|node| {
            let path = node.url.path().trim_start_matches("/site/").to_string();
            match node.url.query() {
                Some(query) => format!("{path}?{query}"),
                None => path,
            }
        })
        .collect()
}

/// Runtime that answers every read after a delay.
#[derive(Debug, Clone)]
pub struct SlowRuntime {
    pub inner: MemoryRuntime,
    pub delay: Duration,
}

#[async_trait]
impl Runtime for SlowRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        self.inner.read_file(path).await
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn get_cwd(&self) -> RuntimeResult<std::path::PathBuf> {
        self.inner.get_cwd()
    }
}
