//! Output writing.
//!
//! [`emit`] renders one artifact per chunk plus `manifest.json` and, when
//! needed, `importmap.json`, without touching the filesystem. [`write`]
//! emits and then writes everything atomically below the output directory.

mod import_map;
mod layout;
mod manifest;
mod render;
pub(crate) mod writer;

pub use import_map::OutputImportMap;
pub use manifest::{Manifest, ManifestChunk};

use std::path::PathBuf;

use indexmap::IndexMap;
use indexmap::map::Entry;
use kiln_graph::{BuildDiagnostic, BuildReport, DiagnosticKind, ModuleGraph};
use tracing::{debug, info};
use url::Url;

use crate::chunking::ChunkPlan;
use crate::config::BuildConfig;
use crate::versioning::Versions;
use layout::Layout;
use render::Renderer;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const IMPORT_MAP_FILE: &str = "importmap.json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    #[error("Reference '{specifier}' in {from} has no resolution at write time")]
    UnresolvedReference { from: Url, specifier: String },

    #[error("{from} imports '{name}' from {target}, which does not export it")]
    MissingExport { from: Url, target: Url, name: String },

    #[error("Output path '{path}' is claimed by both {first} and {second}")]
    PathConflict {
        path: String,
        first: String,
        second: String,
    },

    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    #[error("Write failure: {0}")]
    WriteFailure(String),
}

impl WriteError {
    pub fn report(&self) -> BuildReport {
        let diagnostic = match self {
            Self::MissingExport { from, name, .. } => {
                BuildDiagnostic::error(DiagnosticKind::MissingExport, self.to_string())
                    .with_url(from.clone())
                    .with_specifier(name.clone())
            }
            Self::UnresolvedReference { from, specifier } => {
                BuildDiagnostic::error(DiagnosticKind::WriteError, self.to_string())
                    .with_url(from.clone())
                    .with_specifier(specifier.clone())
            }
            _ => BuildDiagnostic::error(DiagnosticKind::WriteError, self.to_string()),
        };
        BuildReport::new(vec![diagnostic])
    }
}

/// One file of the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Relative to the output directory, `/`-separated.
    pub path: String,
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Everything a build produces, before it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    /// In chunk order, followed by the manifest and import map.
    pub files: Vec<OutputFile>,
    pub manifest: Manifest,
    pub import_map: OutputImportMap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    /// Absolute paths of the written files.
    pub files: Vec<PathBuf>,
    pub manifest: Manifest,
    pub import_map: OutputImportMap,
}

/// Files keyed by output path. The same path may only be claimed twice with
/// identical contents, as happens for one file loaded in two module kinds.
#[derive(Default)]
struct Claims {
    files: IndexMap<String, (String, Vec<u8>)>,
}

impl Claims {
    fn claim(&mut self, path: String, owner: String, contents: Vec<u8>) -> Result<(), WriteError> {
        match self.files.entry(path) {
            Entry::Vacant(slot) => {
                slot.insert((owner, contents));
                Ok(())
            }
            Entry::Occupied(slot) if slot.get().1 == contents => {
                debug!(path = %slot.key(), "identical artifact emitted twice");
                Ok(())
            }
            Entry::Occupied(slot) => Err(WriteError::PathConflict {
                path: slot.key().clone(),
                first: slot.get().0.clone(),
                second: owner,
            }),
        }
    }

    fn into_files(self) -> Vec<OutputFile> {
        self.files
            .into_iter()
            .map(|(path, (_, contents))| OutputFile { path, contents })
            .collect()
    }
}

/// Render every chunk. Pure: identical inputs give identical bytes.
pub fn emit(
    graph: &ModuleGraph,
    plan: &ChunkPlan,
    versions: &Versions,
    config: &BuildConfig,
) -> Result<Emitted, WriteError> {
    let placement = config.versioning.placement;
    let layout = Layout::new(graph, plan, versions, placement)?;
    let renderer = Renderer::new(graph, plan, &layout, &config.versioning)?;
    let import_map = renderer.import_map(&config.base);

    let mut claims = Claims::default();
    for chunk in plan.chunks() {
        let artifact = layout.artifact(chunk.id);
        let owner = chunk
            .lead()
            .map_or_else(|| chunk.id.to_string(), Url::to_string);
        let contents = renderer.render(chunk, &import_map)?;
        debug!(chunk = %chunk.id, file = %artifact.file, members = chunk.members.len(), "rendered");
        claims.claim(artifact.file.clone(), owner.clone(), contents)?;

        let source_map = match chunk.members.as_slice() {
            [single] => graph.node(single).and_then(|node| node.source_map.clone()),
            _ => None,
        };
        if let Some(map) = source_map {
            claims.claim(format!("{}.map", artifact.file), owner, map.into_bytes())?;
        }
    }

    let manifest = Manifest::new(graph, plan, &layout, &import_map, placement, &config.base);
    claims.claim(
        MANIFEST_FILE.to_string(),
        "the build manifest".to_string(),
        manifest.to_json().into_bytes(),
    )?;
    if !import_map.is_empty() {
        claims.claim(
            IMPORT_MAP_FILE.to_string(),
            "the import map".to_string(),
            import_map.to_json().into_bytes(),
        )?;
    }

    Ok(Emitted {
        files: claims.into_files(),
        manifest,
        import_map,
    })
}

/// Emit and write the output tree below `config.out_dir`.
pub fn write(
    graph: &ModuleGraph,
    plan: &ChunkPlan,
    versions: &Versions,
    config: &BuildConfig,
) -> Result<WriteReport, WriteError> {
    let out_dir = config
        .absolute_out_dir()
        .map_err(|e| WriteError::InvalidOutputPath(e.to_string()))?;
    let emitted = emit(graph, plan, versions, config)?;
    let files = writer::write_files(&out_dir, &emitted.files)?;
    info!(files = files.len(), out_dir = %out_dir.display(), "Wrote output");

    Ok(WriteReport {
        files,
        manifest: emitted.manifest,
        import_map: emitted.import_map,
    })
}
