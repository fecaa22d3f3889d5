//! End-to-end build: graph, versions, chunks, output.
//!
//! ```text
//!  BuildConfig ─► entries + import map ─► GraphBuilder ─► ModuleGraph
//!                                                            │
//!            ┌────────────────────────┬──────────────────────┤
//!            ▼                        ▼                      │
//!     compute_versions           plan_chunks                 │
//!            └──────► version_chunks ◄┘                      │
//!                          │                                 │
//!                          ▼                                 │
//!                    output::write ◄─────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kiln_graph::{
    BuildContext, BuildDiagnostic, CancellationToken, EntryPoint, GraphBuild, GraphBuilder,
    ImportMap, ModuleGraph, NativeRuntime, Runtime,
};
use path_clean::PathClean;
use tracing::info;
use url::Url;

use crate::chunking::{ChunkPlan, plan_chunks};
use crate::config::{BuildConfig, ImportMapSource};
use crate::output::{self, Manifest};
use crate::versioning::{Versions, compute_versions, version_chunks};
use crate::{Error, Result};

/// What a successful build produced.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub manifest: Manifest,
    /// Absolute paths of every written file.
    pub files: Vec<PathBuf>,
    /// Non-fatal diagnostics collected while building the graph.
    pub warnings: Vec<BuildDiagnostic>,
    pub graph: Arc<ModuleGraph>,
    pub stats: BuildStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub modules: usize,
    pub chunks: usize,
    /// Modules read and transformed in this run.
    pub loaded: usize,
    /// Modules taken over from the previous graph.
    pub reused: usize,
    pub duration: Duration,
}

/// Build `config` from the local filesystem.
pub async fn build(config: &BuildConfig) -> Result<BuildOutcome> {
    build_with(config, Arc::new(NativeRuntime::new()), CancellationToken::new()).await
}

/// Build `config` reading through `runtime`. Cancelling `cancel` stops the
/// build before anything is written.
pub async fn build_with(
    config: &BuildConfig,
    runtime: Arc<dyn Runtime>,
    cancel: CancellationToken,
) -> Result<BuildOutcome> {
    let started = Instant::now();
    let (builder, entries) = prepare(config, runtime, cancel.clone()).await?;
    let build = builder.build(entries).await?;
    let planned = plan(config, build, started)?;
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    write(config, planned)
}

/// Validate `config` and set up a graph builder for it.
pub(crate) async fn prepare(
    config: &BuildConfig,
    runtime: Arc<dyn Runtime>,
    cancel: CancellationToken,
) -> Result<(GraphBuilder, Vec<EntryPoint>)> {
    config.validate()?;
    let root = config.root_url()?;
    let entries = entry_points(config)?;
    let import_map = load_import_map(config, runtime.as_ref(), &root).await?;

    let ctx = BuildContext::new(runtime, root)
        .with_import_map(import_map)
        .with_hash_algorithm(config.versioning.algorithm)
        .with_cancellation(cancel);
    Ok((GraphBuilder::new(ctx), entries))
}

fn entry_points(config: &BuildConfig) -> Result<Vec<EntryPoint>> {
    let root = config.absolute_root()?;
    config
        .entries
        .iter()
        .map(|(path, name)| {
            let absolute = root.join(path).clean();
            let url = Url::from_file_path(&absolute).map_err(|()| {
                Error::InvalidConfig(format!("entry '{}' is not a valid path", path.display()))
            })?;
            Ok(EntryPoint::new(url, name.clone()))
        })
        .collect()
}

/// Absolute path of the import map file, when it comes from one.
pub(crate) fn import_map_path(config: &BuildConfig) -> Result<Option<PathBuf>> {
    match &config.import_map {
        Some(ImportMapSource::Path(path)) => Ok(Some(config.absolute_root()?.join(path).clean())),
        _ => Ok(None),
    }
}

async fn load_import_map(
    config: &BuildConfig,
    runtime: &dyn Runtime,
    root: &Url,
) -> Result<Option<ImportMap>> {
    let (text, base) = match &config.import_map {
        None => return Ok(None),
        Some(ImportMapSource::Inline(text)) => (text.clone(), root.clone()),
        Some(ImportMapSource::Path(_)) => {
            let Some(path) = import_map_path(config)? else {
                return Ok(None);
            };
            let bytes = runtime.read_file(&path).await.map_err(|e| {
                Error::InvalidConfig(format!(
                    "Failed to read import map '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            let text = String::from_utf8(bytes).map_err(|_| {
                Error::InvalidConfig(format!("Import map '{}' is not UTF-8", path.display()))
            })?;
            let base = Url::from_file_path(&path).map_err(|()| {
                Error::InvalidConfig(format!("Invalid import map path '{}'", path.display()))
            })?;
            (text, base)
        }
    };
    ImportMap::from_json(&text, &base)
        .map(Some)
        .map_err(|e| Error::InvalidConfig(e.to_string()))
}

/// A graph with its versions and chunk plan, not yet written.
pub(crate) struct Planned {
    graph: ModuleGraph,
    plan: ChunkPlan,
    versions: Versions,
    loaded: usize,
    reused: usize,
    started: Instant,
}

/// Version and chunk a freshly built graph.
pub(crate) fn plan(config: &BuildConfig, build: GraphBuild, started: Instant) -> Result<Planned> {
    let GraphBuild {
        graph,
        loaded,
        reused,
    } = build;

    let mut versions = compute_versions(&graph, &config.versioning)?;
    let plan = plan_chunks(&graph, &config.chunking)?;
    version_chunks(&graph, &plan, &mut versions, &config.versioning);

    Ok(Planned {
        graph,
        plan,
        versions,
        loaded,
        reused,
        started,
    })
}

/// Write a planned build to the output directory.
pub(crate) fn write(config: &BuildConfig, planned: Planned) -> Result<BuildOutcome> {
    let Planned {
        graph,
        plan,
        versions,
        loaded,
        reused,
        started,
    } = planned;
    let report = output::write(&graph, &plan, &versions, config)?;

    let stats = BuildStats {
        modules: versions.len(),
        chunks: plan.len(),
        loaded,
        reused,
        duration: started.elapsed(),
    };
    info!(
        modules = stats.modules,
        chunks = stats.chunks,
        files = report.files.len(),
        elapsed_ms = stats.duration.as_millis() as u64,
        "Build complete"
    );

    Ok(BuildOutcome {
        manifest: report.manifest,
        files: report.files,
        warnings: graph.warnings().to_vec(),
        graph: Arc::new(graph),
        stats,
    })
}
