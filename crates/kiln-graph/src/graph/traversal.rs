//! Traversal methods for ModuleGraph.

use std::collections::VecDeque;

use indexmap::IndexSet;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use url::Url;

use super::ModuleGraph;
use crate::reference::{Reference, ReferenceKind};

/// Breadth-first visit order from `starts`, expanding each URL with `next`.
///
/// Every URL appears once, at its first discovery.
pub(crate) fn breadth_first<F, I>(starts: impl IntoIterator<Item = Url>, mut next: F) -> Vec<Url>
where
    F: FnMut(&Url) -> I,
    I: IntoIterator<Item = Url>,
{
    let mut seen = IndexSet::new();
    let mut queue = VecDeque::new();
    for start in starts {
        if seen.insert(start.clone()) {
            queue.push_back(start);
        }
    }
    while let Some(current) = queue.pop_front() {
        for target in next(&current) {
            if seen.insert(target.clone()) {
                queue.push_back(target);
            }
        }
    }
    seen.into_iter().collect()
}

impl ModuleGraph {
    /// Nodes reachable from `starts` through references accepted by `filter`,
    /// in breadth-first order.
    pub fn reachable_from(
        &self,
        starts: impl IntoIterator<Item = Url>,
        filter: impl Fn(&Reference) -> bool,
    ) -> Vec<Url> {
        breadth_first(
            starts.into_iter().filter(|url| self.contains(url)),
            |url| {
                self.dependencies(url, &filter)
                    .cloned()
                    .collect::<Vec<_>>()
            },
        )
    }

    /// Shortest import chain from an entry point to `target`, entry first.
    ///
    /// `target` does not have to be a node: failed loads are found through
    /// the references pointing at them. Returns an empty chain when nothing
    /// reaches `target`.
    pub fn chain_to(&self, target: &Url) -> Vec<Url> {
        let mut parents: HashMap<Url, Option<Url>> = HashMap::default();
        let mut queue = VecDeque::new();
        for entry in &self.entries {
            if parents.insert(entry.url.clone(), None).is_none() {
                queue.push_back(entry.url.clone());
            }
        }

        let mut found = parents.contains_key(target);
        while !found {
            let Some(current) = queue.pop_front() else {
                break;
            };
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            for (_, next) in node.targets() {
                if parents.contains_key(next) {
                    continue;
                }
                parents.insert(next.clone(), Some(current.clone()));
                if next == target {
                    found = true;
                    break;
                }
                queue.push_back(next.clone());
            }
        }

        if !found {
            return Vec::new();
        }
        let mut chain = vec![target.clone()];
        let mut cursor = target;
        while let Some(Some(parent)) = parents.get(cursor) {
            chain.push(parent.clone());
            cursor = parent;
        }
        chain.reverse();
        chain
    }

    /// Groups of live nodes that import each other statically, in canonical
    /// order. Single nodes only count when they import themselves.
    pub fn static_cycles(&self) -> Vec<Vec<Url>> {
        let mut graph = DiGraph::<&Url, ()>::new();
        let mut indices: HashMap<&Url, NodeIndex> = HashMap::default();
        for node in self.live_nodes() {
            indices.insert(&node.url, graph.add_node(&node.url));
        }
        for node in self.live_nodes() {
            let from = indices[&node.url];
            for (reference, target) in node.targets() {
                if reference.kind() != ReferenceKind::StaticImport {
                    continue;
                }
                if let Some(&to) = indices.get(target) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let mut cycles: Vec<Vec<Url>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut urls: Vec<Url> = scc.iter().map(|&index| graph[index].clone()).collect();
                urls.sort_by_key(|url| self.order_of(url));
                urls
            })
            .collect();
        cycles.sort_by_key(|cycle| self.order_of(&cycle[0]));
        cycles
    }

    /// URLs of all nodes that sit on a static cycle.
    pub fn cyclic_nodes(&self) -> HashSet<Url> {
        self.static_cycles().into_iter().flatten().collect()
    }
}
