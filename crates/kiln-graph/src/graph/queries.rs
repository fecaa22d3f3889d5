//! Query methods for ModuleGraph.

use url::Url;

use super::{EntryPoint, ModuleGraph};
use crate::diagnostics::BuildDiagnostic;
use crate::module::ModuleNode;
use crate::reference::{Reference, ReferenceId};

impl ModuleGraph {
    /// Directory URL every output path is relative to.
    pub fn root(&self) -> &Url {
        &self.root
    }

    pub fn entries(&self) -> &[EntryPoint] {
        &self.entries
    }

    pub fn entry_index(&self, url: &Url) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.url == url)
    }

    pub fn is_entry(&self, url: &Url) -> bool {
        self.entry_index(url).is_some()
    }

    pub fn node(&self, url: &Url) -> Option<&ModuleNode> {
        self.nodes.get(url)
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.nodes.contains_key(url)
    }

    /// All nodes in canonical order, unreachable ones included.
    pub fn nodes(&self) -> impl Iterator<Item = &ModuleNode> {
        self.nodes.values()
    }

    /// Nodes reachable from the current entries, in canonical order.
    pub fn live_nodes(&self) -> impl Iterator<Item = &ModuleNode> {
        self.nodes
            .values()
            .filter(|node| !self.unreachable.contains(&node.url))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Position of a node in canonical order.
    pub fn order_of(&self, url: &Url) -> Option<usize> {
        self.nodes.get_index_of(url)
    }

    pub fn incoming(&self, url: &Url) -> &[ReferenceId] {
        self.incoming.get(url).map(Vec::as_slice).unwrap_or_default()
    }

    /// Look up the reference behind a handle.
    pub fn reference(&self, id: &ReferenceId) -> Option<&Reference> {
        self.nodes
            .get(&id.source)
            .and_then(|node| node.references.get(id.index))
    }

    pub fn is_pruned(&self, url: &Url) -> bool {
        self.pruned.contains(url)
    }

    pub fn is_unresolved(&self, id: &ReferenceId) -> bool {
        self.unresolved.contains(id)
    }

    pub fn is_external(&self, url: &Url) -> bool {
        self.externals.contains(url)
    }

    pub fn externals(&self) -> impl Iterator<Item = &Url> {
        self.externals.iter()
    }

    pub fn is_unreachable(&self, url: &Url) -> bool {
        self.unreachable.contains(url)
    }

    /// Non-fatal diagnostics collected while building.
    pub fn warnings(&self) -> &[BuildDiagnostic] {
        &self.warnings
    }

    /// Resolved targets of `url` that are nodes of this graph, filtered by
    /// reference, in source order.
    pub fn dependencies<'g>(
        &'g self,
        url: &'g Url,
        filter: impl Fn(&Reference) -> bool + 'g,
    ) -> impl Iterator<Item = &'g Url> + 'g {
        self.nodes
            .get(url)
            .into_iter()
            .flat_map(|node| node.targets())
            .filter(move |(reference, target)| filter(reference) && self.nodes.contains_key(*target))
            .map(|(_, target)| target)
    }
}
