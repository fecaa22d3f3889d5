//! The published module graph.
//!
//! A [`ModuleGraph`] is assembled by the builder and then frozen: consumers
//! only ever see a complete graph, usually behind an `Arc`. Methods are split
//! across submodules the same way the builder uses them.

mod mutations;
mod queries;
mod traversal;

pub(crate) use traversal::breadth_first;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::diagnostics::BuildDiagnostic;
use crate::module::ModuleNode;
use crate::reference::ReferenceId;

/// A declared build root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
    pub url: Url,
    /// Root-relative path of the emitted artifact.
    pub output_name: String,
}

impl EntryPoint {
    pub fn new(url: Url, output_name: impl Into<String>) -> Self {
        Self {
            url,
            output_name: output_name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModuleGraph {
    pub(crate) root: Url,
    pub(crate) entries: Vec<EntryPoint>,
    /// Nodes in canonical order.
    pub(crate) nodes: IndexMap<Url, ModuleNode>,
    pub(crate) incoming: HashMap<Url, Vec<ReferenceId>>,
    /// Targets that failed to load without failing the build.
    pub(crate) pruned: HashSet<Url>,
    /// References that could not be resolved without failing the build.
    pub(crate) unresolved: HashSet<ReferenceId>,
    pub(crate) externals: IndexSet<Url>,
    /// Nodes carried over from a previous build that nothing reaches anymore.
    pub(crate) unreachable: HashSet<Url>,
    pub(crate) warnings: Vec<BuildDiagnostic>,
}

impl ModuleGraph {
    pub fn new(root: Url, entries: Vec<EntryPoint>) -> Self {
        Self {
            root,
            entries,
            nodes: IndexMap::new(),
            incoming: HashMap::default(),
            pruned: HashSet::default(),
            unresolved: HashSet::default(),
            externals: IndexSet::new(),
            unreachable: HashSet::default(),
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_point_serializes_url_as_string() {
        let entry = EntryPoint::new(Url::parse("file:///site/index.html").unwrap(), "index.html");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"url": "file:///site/index.html", "output_name": "index.html"})
        );

        let back: EntryPoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}
