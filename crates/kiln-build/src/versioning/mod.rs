//! Content versioning.
//!
//! A node's effective version is the digest of its raw content hash followed
//! by the effective versions of its dependencies, sorted by URL:
//!
//! ```text
//! effective(n) = digest(raw(n) ‖ effective(d) for d in deps(n))
//! ```
//!
//! so a change anywhere below a module changes the module's version. Which
//! edges count is governed by [`DynamicImportPolicy`]; static cycles by
//! [`CyclePolicy`]. Chunks get versions the same way, from their members'
//! versions and the chunks they depend on.

mod placement;
mod propagate;

pub use placement::{versioned_path, versioned_url};

use indexmap::IndexMap;
use kiln_graph::{
    BuildDiagnostic, BuildReport, DiagnosticKind, ModuleGraph, Reference, ReferenceKind,
};
use tracing::{debug, info};
use url::Url;

use crate::chunking::{ChunkId, ChunkPlan};
use crate::config::{CyclePolicy, DynamicImportPolicy, HashLength, VersioningConfig};
use propagate::propagate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("Import cycle cannot be versioned without a cycle policy: {}", format_members(.members))]
    CycleWithoutVersionPolicy { members: Vec<Url> },
}

impl VersionError {
    pub fn report(&self) -> BuildReport {
        match self {
            Self::CycleWithoutVersionPolicy { members } => {
                let mut diagnostic = BuildDiagnostic::error(
                    DiagnosticKind::CycleWithoutVersionPolicy,
                    self.to_string(),
                )
                .with_chain(members.clone());
                if let Some(first) = members.first() {
                    diagnostic = diagnostic.with_url(first.clone());
                }
                BuildReport::new(vec![diagnostic])
            }
        }
    }
}

fn format_members(members: &[Url]) -> String {
    members
        .iter()
        .map(Url::path)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Effective versions of nodes and, once assigned, chunks.
///
/// Full hex digests are stored; accessors apply the configured length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Versions {
    length: HashLength,
    nodes: IndexMap<Url, String>,
    chunks: IndexMap<ChunkId, String>,
}

impl Versions {
    pub fn node(&self, url: &Url) -> Option<&str> {
        self.nodes.get(url).map(|version| self.length.apply(version))
    }

    pub fn node_full(&self, url: &Url) -> Option<&str> {
        self.nodes.get(url).map(String::as_str)
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&str> {
        self.chunks.get(&id).map(|version| self.length.apply(version))
    }

    /// Node versions in canonical order.
    pub fn nodes(&self) -> impl Iterator<Item = (&Url, &str)> {
        self.nodes
            .iter()
            .map(|(url, version)| (url, self.length.apply(version)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Whether an edge feeds the importer's version.
fn counts(reference: &Reference, policy: DynamicImportPolicy) -> bool {
    match reference.kind() {
        ReferenceKind::StaticImport | ReferenceKind::Asset | ReferenceKind::Inline => true,
        ReferenceKind::DynamicImport => policy == DynamicImportPolicy::Include,
    }
}

/// Effective version of every live node of `graph`.
pub fn compute_versions(
    graph: &ModuleGraph,
    config: &VersioningConfig,
) -> Result<Versions, VersionError> {
    let keys: Vec<Url> = graph.live_nodes().map(|node| node.url.clone()).collect();
    let policy = config.dynamic_imports;

    let effective = propagate(
        &keys,
        |url| {
            graph
                .node(url)
                .map(|node| {
                    node.content_hash
                        .clone()
                        .unwrap_or_else(|| config.algorithm.digest(&node.content))
                })
                .unwrap_or_default()
        },
        |url| {
            graph
                .dependencies(url, |reference| counts(reference, policy))
                .cloned()
                .collect()
        },
        config.algorithm,
        config.cycles,
    )
    .map_err(|members| VersionError::CycleWithoutVersionPolicy { members })?;

    let nodes: IndexMap<Url, String> = keys.into_iter().zip(effective).collect();
    for (url, version) in &nodes {
        debug!(url = %url, version = %config.length.apply(version), "versioned");
    }
    info!(nodes = nodes.len(), algorithm = %config.algorithm, "Computed module versions");

    Ok(Versions {
        length: config.length,
        nodes,
        chunks: IndexMap::new(),
    })
}

/// Assign chunk versions.
///
/// A chunk's raw value is the digest of its members' versions; its
/// dependencies are the chunks its members reference under the same edge
/// policy. Chunk-level cycles are always seeded: module cycles were already
/// dealt with by [`compute_versions`].
pub fn version_chunks(
    graph: &ModuleGraph,
    plan: &ChunkPlan,
    versions: &mut Versions,
    config: &VersioningConfig,
) {
    let keys: Vec<ChunkId> = plan.chunks().iter().map(|chunk| chunk.id).collect();
    let policy = config.dynamic_imports;

    let effective = propagate(
        &keys,
        |id| {
            let mut hasher = config.algorithm.hasher();
            for member in &plan.chunk(*id).members {
                hasher.update(versions.node_full(member).unwrap_or_default().as_bytes());
            }
            hasher.finalize_hex()
        },
        |id| {
            plan.chunk(*id)
                .members
                .iter()
                .flat_map(|member| {
                    graph.dependencies(member, move |reference| counts(reference, policy))
                })
                .filter_map(|target| plan.owner_of(target))
                .filter(|owner| owner != id)
                .collect()
        },
        config.algorithm,
        CyclePolicy::SeedWithRawHash,
    )
    .unwrap_or_default();

    versions.chunks = keys.into_iter().zip(effective).collect();
}
