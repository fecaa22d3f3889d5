use std::collections::{BTreeMap, BTreeSet};

use kiln_graph::ModuleGraph;
use kiln_graph::resolve::{relative_path, strip_markers};
use serde::Serialize;

use super::import_map::OutputImportMap;
use super::layout::Layout;
use crate::chunking::{ChunkId, ChunkKind, ChunkPlan};
use crate::config::VersionPlacement;

/// Contents of `manifest.json`.
///
/// Maps are ordered, so identical builds produce identical manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Root-relative entry path to its public path.
    pub entries: BTreeMap<String, String>,
    /// Root-relative path of every module to the public path of the artifact
    /// that carries it.
    pub modules: BTreeMap<String, String>,
    pub chunks: Vec<ManifestChunk>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub import_map: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestChunk {
    pub id: ChunkId,
    pub kind: ChunkKind,
    pub file: String,
    pub version: String,
    pub members: Vec<String>,
    /// Public paths of the artifacts this one references.
    pub imports: Vec<String>,
}

impl Manifest {
    pub(crate) fn new(
        graph: &ModuleGraph,
        plan: &ChunkPlan,
        layout: &Layout,
        import_map: &OutputImportMap,
        placement: VersionPlacement,
        base: &str,
    ) -> Self {
        let root = graph.root();
        let source_path = |url: &url::Url| relative_path(root, &strip_markers(url).0);

        let entries = graph
            .entries()
            .iter()
            .filter(|entry| graph.contains(&entry.url))
            .map(|entry| (source_path(&entry.url), format!("{base}{}", entry.output_name)))
            .collect();

        let mut modules = BTreeMap::new();
        for node in graph.live_nodes().filter(|node| !node.is_inline()) {
            if let Some(artifact) = layout.of(plan, &node.url) {
                modules
                    .entry(source_path(&node.url))
                    .or_insert_with(|| format!("{base}{}", artifact.public(placement)));
            }
        }

        let chunks = plan
            .chunks()
            .iter()
            .map(|chunk| {
                let artifact = layout.artifact(chunk.id);
                let imports: BTreeSet<String> = chunk
                    .members
                    .iter()
                    .flat_map(|member| graph.dependencies(member, |_| true))
                    .filter_map(|target| plan.owner_of(target))
                    .filter(|id| *id != chunk.id)
                    .map(|id| format!("{base}{}", layout.artifact(id).public(placement)))
                    .collect();
                ManifestChunk {
                    id: chunk.id,
                    kind: chunk.kind,
                    file: artifact.file.clone(),
                    version: artifact.version.clone(),
                    members: chunk.members.iter().map(source_path).collect(),
                    imports: imports.into_iter().collect(),
                }
            })
            .collect();

        Self {
            entries,
            modules,
            chunks,
            import_map: import_map.as_map().clone(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
