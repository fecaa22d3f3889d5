//! Chunk roots and the edges that stay inside a chunk.

use indexmap::IndexMap;
use kiln_graph::{ContentFamily, ImportForm, ModuleGraph, ModuleNode, Reference, ReferenceKind};
use rustc_hash::FxHashSet as HashSet;
use tracing::debug;
use url::Url;

use super::ChunkKind;

/// Whether `target` can be concatenated into the artifact of `source` through
/// the `index`-th reference of `source`.
pub(crate) fn can_merge(
    source: &ModuleNode,
    index: usize,
    reference: &Reference,
    target: &ModuleNode,
    cyclic: &HashSet<Url>,
) -> bool {
    let family = source.content_type.family();
    if !reference.is_mergeable()
        || source.is_inline()
        || family != target.content_type.family()
        || cyclic.contains(&target.url)
        || !target.is_mergeable()
    {
        return false;
    }

    match family {
        ContentFamily::Script => {
            target.syntax.is_some()
                && source.syntax.as_ref().is_some_and(|syntax| {
                    syntax
                        .import_for(index)
                        .is_some_and(|record| record.form == ImportForm::Import)
                })
        }
        ContentFamily::Style => true,
        ContentFamily::Document | ContentFamily::Binary => false,
    }
}

/// Chunk roots in priority order: entries as declared, then every other
/// boundary in canonical discovery order.
pub(crate) fn discover_roots(graph: &ModuleGraph, cyclic: &HashSet<Url>) -> IndexMap<Url, ChunkKind> {
    let mut roots = IndexMap::new();
    for entry in graph.entries() {
        if graph.contains(&entry.url) && !graph.is_unreachable(&entry.url) {
            roots.entry(entry.url.clone()).or_insert(ChunkKind::Entry);
        }
    }

    for node in graph.live_nodes() {
        for (index, reference) in node.references.iter().enumerate() {
            let Some(target) = reference.resolved() else {
                continue;
            };
            let Some(target_node) = graph.node(target) else {
                continue;
            };
            let kind = match reference.kind() {
                ReferenceKind::DynamicImport => ChunkKind::Dynamic,
                ReferenceKind::Asset => ChunkKind::Asset,
                ReferenceKind::Inline => continue,
                ReferenceKind::StaticImport => {
                    if can_merge(node, index, reference, target_node, cyclic) {
                        continue;
                    }
                    ChunkKind::Isolated
                }
            };
            if !roots.contains_key(target) {
                debug!(url = %target, kind = ?kind, from = %node.url, "chunk root");
                roots.insert(target.clone(), kind);
            }
        }
    }
    roots
}

/// Targets of `url` that belong to the same chunk as `url` when reached:
/// inline children and static imports of non-roots.
pub(crate) fn internal_targets(
    graph: &ModuleGraph,
    url: &Url,
    roots: &IndexMap<Url, ChunkKind>,
) -> Vec<Url> {
    let Some(node) = graph.node(url) else {
        return Vec::new();
    };
    node.targets()
        .filter(|(_, target)| graph.contains(target) && !graph.is_unreachable(target))
        .filter(|(reference, target)| match reference.kind() {
            ReferenceKind::Inline => true,
            ReferenceKind::StaticImport => !roots.contains_key(*target),
            ReferenceKind::DynamicImport | ReferenceKind::Asset => false,
        })
        .map(|(_, target)| target.clone())
        .collect()
}

/// Deps-first post-order over `next`, starting from each of `starts` in turn.
pub(crate) fn post_order<F>(starts: impl IntoIterator<Item = Url>, mut next: F) -> Vec<Url>
where
    F: FnMut(&Url) -> Vec<Url>,
{
    let mut visited: HashSet<Url> = HashSet::default();
    let mut order = Vec::new();

    for start in starts {
        if !visited.insert(start.clone()) {
            continue;
        }
        let children = next(&start).into_iter();
        let mut stack = vec![(start, children)];
        loop {
            let Some(top) = stack.last_mut() else {
                break;
            };
            match top.1.next() {
                Some(child) => {
                    if visited.insert(child.clone()) {
                        let children = next(&child).into_iter();
                        stack.push((child, children));
                    }
                }
                None => {
                    if let Some((done, _)) = stack.pop() {
                        order.push(done);
                    }
                }
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("file:///site/{path}")).unwrap()
    }

    #[test]
    fn test_post_order_is_deps_first() {
        // a -> b -> d, a -> c -> d
        let edges = |u: &Url| -> Vec<Url> {
            match u.path() {
                "/site/a" => vec![url("b"), url("c")],
                "/site/b" | "/site/c" => vec![url("d")],
                _ => vec![],
            }
        };
        let order = post_order([url("a")], edges);
        assert_eq!(order, vec![url("d"), url("b"), url("c"), url("a")]);
    }

    #[test]
    fn test_post_order_survives_cycles() {
        let edges = |u: &Url| -> Vec<Url> {
            match u.path() {
                "/site/a" => vec![url("b")],
                "/site/b" => vec![url("a")],
                _ => vec![],
            }
        };
        assert_eq!(post_order([url("a")], edges), vec![url("b"), url("a")]);
    }
}
