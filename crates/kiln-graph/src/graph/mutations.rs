//! Mutation methods used while the builder assembles a graph.

use url::Url;

use super::ModuleGraph;
use crate::diagnostics::BuildDiagnostic;
use crate::module::ModuleNode;
use crate::reference::ReferenceId;

impl ModuleGraph {
    /// Add a node, keeping insertion order. Replaces a node with the same URL.
    pub fn insert_node(&mut self, node: ModuleNode) {
        self.nodes.insert(node.url.clone(), node);
    }

    pub fn mark_pruned(&mut self, url: Url) {
        self.pruned.insert(url);
    }

    pub fn mark_unresolved(&mut self, reference: ReferenceId) {
        self.unresolved.insert(reference);
    }

    pub fn mark_unreachable(&mut self, url: Url) {
        self.unreachable.insert(url);
    }

    pub fn add_external(&mut self, url: Url) {
        self.externals.insert(url);
    }

    pub fn push_warning(&mut self, warning: BuildDiagnostic) {
        self.warnings.push(warning.into_warning());
    }

    /// Rebuild the incoming-reference index from every node's references.
    ///
    /// Must run after the last node is inserted.
    pub fn link(&mut self) {
        self.incoming.clear();
        for (source, node) in &self.nodes {
            for (index, reference) in node.references.iter().enumerate() {
                let Some(target) = reference.resolved() else {
                    continue;
                };
                if !self.nodes.contains_key(target) {
                    continue;
                }
                self.incoming
                    .entry(target.clone())
                    .or_default()
                    .push(ReferenceId {
                        source: source.clone(),
                        index,
                    });
            }
        }
    }
}
