//! Concurrent module graph construction.
//!
//! The builder fans out one tokio task per claimed URL. Claims go through the
//! entry API of a [`DashMap`] so a URL is loaded at most once no matter how
//! many importers discover it at the same time; a revisit just records the
//! edge. Once every task has finished, the results are put into canonical
//! order and failures are classified (see `classify`).

mod classify;
mod load;

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rustc_hash::FxHashSet as HashSet;
use tokio::task::JoinSet;
use tracing::{debug, info};
use url::Url;

use crate::context::BuildContext;
use crate::diagnostics::{BuildDiagnostic, BuildReport, DiagnosticKind};
use crate::graph::{EntryPoint, ModuleGraph};
use crate::resolve::{is_external, strip_markers};

use classify::{Collected, assemble};
use load::{ChildRequest, LoadOutcome, LoadRequest, load};

/// Visited-set state of a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    InProgress,
    Complete,
    Failed,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    #[error("No entry points configured")]
    NoEntryPoints,

    #[error("Entry point {url} is declared more than once")]
    DuplicateEntry { url: Url },

    #[error("Output name '{name}' is used by more than one entry point")]
    DuplicateOutputName { name: String },

    #[error("Entry point {url} is not a local file")]
    InvalidEntry { url: Url },

    #[error("Module graph build failed: {0}")]
    Build(BuildReport),

    #[error("Build cancelled")]
    Cancelled,

    #[error("Load task failed: {0}")]
    Task(String),
}

impl GraphError {
    /// Diagnostics describing this error.
    pub fn report(&self) -> BuildReport {
        match self {
            Self::Build(report) => report.clone(),
            Self::DuplicateEntry { url } | Self::InvalidEntry { url } => BuildReport::new(vec![
                BuildDiagnostic::error(DiagnosticKind::InvalidConfig, self.to_string())
                    .with_url(url.clone()),
            ]),
            other => BuildReport::new(vec![BuildDiagnostic::error(
                DiagnosticKind::InvalidConfig,
                other.to_string(),
            )]),
        }
    }
}

/// Result of a successful graph build.
#[derive(Debug, Clone)]
pub struct GraphBuild {
    pub graph: ModuleGraph,
    /// Nodes read and transformed in this run.
    pub loaded: usize,
    /// Nodes taken over unchanged from a previous graph.
    pub reused: usize,
}

/// Builds [`ModuleGraph`]s from entry points.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    ctx: Arc<BuildContext>,
}

impl GraphBuilder {
    pub fn new(ctx: BuildContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Discover, load and classify everything reachable from `entries`.
    pub async fn build(&self, entries: Vec<EntryPoint>) -> Result<GraphBuild, GraphError> {
        self.run(entries, None, &HashSet::default()).await
    }

    /// Like [`build`](Self::build), but takes over every node of `previous`
    /// whose URL is not in `changed` without reading it again.
    ///
    /// Nodes of `previous` that are no longer reachable are carried over and
    /// marked unreachable.
    pub async fn rebuild(
        &self,
        entries: Vec<EntryPoint>,
        previous: &ModuleGraph,
        changed: &HashSet<Url>,
    ) -> Result<GraphBuild, GraphError> {
        self.run(entries, Some(previous), changed).await
    }

    async fn run(
        &self,
        entries: Vec<EntryPoint>,
        previous: Option<&ModuleGraph>,
        changed: &HashSet<Url>,
    ) -> Result<GraphBuild, GraphError> {
        validate_entries(&entries)?;
        if self.ctx.cancel.is_cancelled() {
            return Err(GraphError::Cancelled);
        }

        let started = Instant::now();
        info!(entries = entries.len(), "Building module graph");

        let slots: DashMap<Url, SlotState> = DashMap::new();
        let mut tasks: JoinSet<LoadOutcome> = JoinSet::new();
        let mut collected = Collected::default();

        for entry in &entries {
            let child = ChildRequest {
                url: entry.url.clone(),
                inline: None,
            };
            self.claim(&slots, &mut tasks, child, previous, changed);
        }

        loop {
            let joined = tokio::select! {
                biased;
                () = self.ctx.cancel.cancelled() => {
                    tasks.abort_all();
                    info!("Module graph build cancelled");
                    return Err(GraphError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };
            let LoadOutcome { url, result } =
                joined.map_err(|err| GraphError::Task(err.to_string()))?;

            match result {
                Ok(loaded) => {
                    slots.insert(url.clone(), SlotState::Complete);
                    for child in &loaded.children {
                        self.claim(&slots, &mut tasks, child.clone(), previous, changed);
                    }
                    collected.loaded.insert(url, loaded);
                }
                Err(failure) => {
                    debug!(url = %url, error = %failure, "load failed");
                    slots.insert(url.clone(), SlotState::Failed);
                    collected.failed.insert(url, failure);
                }
            }
        }

        let (graph, counts) = assemble(&self.ctx.root, entries, collected, previous)?;
        info!(
            nodes = graph.len(),
            loaded = counts.loaded,
            reused = counts.reused,
            warnings = graph.warnings().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Module graph complete"
        );
        Ok(GraphBuild {
            graph,
            loaded: counts.loaded,
            reused: counts.reused,
        })
    }

    /// Claim `child` in the visited set and spawn its load if it was new.
    fn claim(
        &self,
        slots: &DashMap<Url, SlotState>,
        tasks: &mut JoinSet<LoadOutcome>,
        child: ChildRequest,
        previous: Option<&ModuleGraph>,
        changed: &HashSet<Url>,
    ) {
        let claimed = match slots.entry(child.url.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(SlotState::InProgress);
                true
            }
        };
        if !claimed {
            return;
        }

        let request = match child.inline {
            Some((parent, source)) => LoadRequest::Inline {
                url: child.url,
                parent,
                source,
            },
            None => match reusable(previous, &child.url, changed) {
                Some(node) => LoadRequest::Reuse(node),
                None => LoadRequest::Read(child.url),
            },
        };
        tasks.spawn(load(Arc::clone(&self.ctx), request));
    }
}

fn reusable(
    previous: Option<&ModuleGraph>,
    url: &Url,
    changed: &HashSet<Url>,
) -> Option<crate::module::ModuleNode> {
    let previous = previous?;
    let node = previous.node(url)?;
    let touched = |url: &Url| changed.contains(url) || changed.contains(&strip_markers(url).0);
    if touched(url) || node.inline_parent.as_ref().is_some_and(touched) {
        return None;
    }
    Some(node.clone())
}

fn validate_entries(entries: &[EntryPoint]) -> Result<(), GraphError> {
    if entries.is_empty() {
        return Err(GraphError::NoEntryPoints);
    }
    let mut urls = HashSet::default();
    let mut names: HashSet<&str> = HashSet::default();
    for entry in entries {
        if is_external(&entry.url) {
            return Err(GraphError::InvalidEntry {
                url: entry.url.clone(),
            });
        }
        if !urls.insert(&entry.url) {
            return Err(GraphError::DuplicateEntry {
                url: entry.url.clone(),
            });
        }
        if !names.insert(entry.output_name.as_str()) {
            return Err(GraphError::DuplicateOutputName {
                name: entry.output_name.clone(),
            });
        }
    }
    Ok(())
}
