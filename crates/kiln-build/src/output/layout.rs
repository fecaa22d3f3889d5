//! Where each chunk lands in the output directory.

use kiln_graph::resolve::{relative_path, strip_markers};
use kiln_graph::ModuleGraph;
use url::Url;

use super::WriteError;
use crate::chunking::{Chunk, ChunkId, ChunkPlan};
use crate::config::VersionPlacement;
use crate::versioning::{Versions, versioned_path};

/// Output location of one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Artifact {
    /// Out-dir relative path the file is written to.
    pub file: String,
    /// `file` without a filename version.
    pub plain: String,
    pub version: String,
    /// Entry artifacts keep their declared names and are never versioned.
    pub entry: bool,
}

impl Artifact {
    /// Out-dir relative path including the version, as it is referenced.
    pub fn public(&self, placement: VersionPlacement) -> String {
        match placement {
            _ if self.entry => self.file.clone(),
            VersionPlacement::Query => versioned_path(&self.file, &self.version, placement),
            VersionPlacement::Filename => self.file.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Layout {
    artifacts: Vec<Artifact>,
}

impl Layout {
    pub fn new(
        graph: &ModuleGraph,
        plan: &ChunkPlan,
        versions: &Versions,
        placement: VersionPlacement,
    ) -> Result<Self, WriteError> {
        let mut artifacts = Vec::with_capacity(plan.len());
        for chunk in plan.chunks() {
            let version = versions.chunk(chunk.id).unwrap_or_default().to_string();
            let entry_name = chunk
                .root
                .as_ref()
                .and_then(|root| graph.entry_index(root))
                .map(|index| graph.entries()[index].output_name.clone());

            let artifact = match entry_name {
                Some(name) => Artifact {
                    plain: name.clone(),
                    file: name,
                    version,
                    entry: true,
                },
                None => {
                    let plain = plain_path(graph, chunk)?;
                    let file = match placement {
                        VersionPlacement::Filename => versioned_path(&plain, &version, placement),
                        VersionPlacement::Query => plain.clone(),
                    };
                    Artifact {
                        file,
                        plain,
                        version,
                        entry: false,
                    }
                }
            };
            artifacts.push(artifact);
        }
        Ok(Self { artifacts })
    }

    pub fn artifact(&self, id: ChunkId) -> &Artifact {
        &self.artifacts[id.0]
    }

    /// Artifact of the chunk that owns `url`.
    pub fn of(&self, plan: &ChunkPlan, url: &Url) -> Option<&Artifact> {
        plan.owner_of(url).map(|id| self.artifact(id))
    }
}

fn plain_path(graph: &ModuleGraph, chunk: &Chunk) -> Result<String, WriteError> {
    let lead = chunk.lead().ok_or_else(|| {
        WriteError::InvalidOutputPath(format!("{} has no members to name it", chunk.id))
    })?;
    let (file, _) = strip_markers(lead);
    let path = relative_path(graph.root(), &file);
    if !chunk.shared {
        return Ok(path);
    }

    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path.as_str()),
    };
    let name = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}.shared.{ext}"),
        _ => format!("{name}.shared"),
    };
    Ok(match dir {
        Some(dir) => format!("{dir}/{name}"),
        None => name,
    })
}

/// Relative URL from the artifact at `from` to the one at `to`, both out-dir
/// relative. Always starts with `./` or `../`.
pub(crate) fn relative_public(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = match from.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let to_parts: Vec<&str> = to.split('/').collect();
    let (to_dir, to_file) = to_parts.split_at(to_parts.len().saturating_sub(1));

    let common = from_dir
        .iter()
        .zip(to_dir)
        .take_while(|(a, b)| a == b)
        .count();
    let ups = from_dir.len() - common;

    let mut relative = if ups == 0 {
        "./".to_string()
    } else {
        "../".repeat(ups)
    };
    for part in &to_dir[common..] {
        relative.push_str(part);
        relative.push('/');
    }
    relative.push_str(to_file.first().copied().unwrap_or_default());
    relative
}
