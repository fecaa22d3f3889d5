//! Code-splitting.
//!
//! Partitions the live nodes of a [`ModuleGraph`] into [`Chunk`]s, one
//! artifact each. Roots are entries, dynamic-import targets, asset targets
//! and static imports that cannot be concatenated into their importer. Every
//! other node joins the chunk of the first root (in priority order) that
//! reaches it through static edges, or a shared chunk when enabled.
//!
//! Concatenated JS members must not share a top-level name, whether both bind
//! it or one of them reads it as a global. An aliased import of a reassigned
//! binding keeps the exporter out of the importer's chunk. The later member
//! of a conflicting pair becomes a root of its own and the plan is recomputed
//! until it is stable.

mod bindings;
mod boundaries;

pub(crate) use bindings::{ImportPlacement, import_placement};

use std::fmt;

use indexmap::IndexMap;
use kiln_graph::{
    BuildDiagnostic, BuildReport, ContentFamily, ContentType, DiagnosticKind, ModuleGraph,
};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::ChunkingConfig;
use bindings::find_conflict;
use boundaries::{discover_roots, internal_targets, post_order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ChunkId(pub usize);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Entry,
    Dynamic,
    Asset,
    /// Statically imported but not concatenable into its importer.
    Isolated,
    Shared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: ChunkId,
    pub kind: ChunkKind,
    /// Absent for shared chunks.
    pub root: Option<Url>,
    /// Deps-first order; the root, when there is one, comes last.
    pub members: Vec<Url>,
    /// Indices of the entry points whose traversal reaches this chunk.
    pub entries: Vec<usize>,
    pub shared: bool,
}

impl Chunk {
    pub fn is_root(&self, url: &Url) -> bool {
        self.root.as_ref() == Some(url)
    }

    /// The member that names the chunk: its root, or the first member.
    pub fn lead(&self) -> Option<&Url> {
        self.root.as_ref().or(self.members.first())
    }

    pub fn content_type(&self, graph: &ModuleGraph) -> ContentType {
        self.lead()
            .and_then(|url| graph.node(url))
            .map_or(ContentType::Unknown, |node| node.content_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("Chunk {id} has no members")]
    EmptyChunk { id: ChunkId },
}

impl ChunkError {
    pub fn report(&self) -> BuildReport {
        BuildReport::new(vec![BuildDiagnostic::error(
            DiagnosticKind::EmptyChunk,
            self.to_string(),
        )])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkPlan {
    chunks: Vec<Chunk>,
    owner: HashMap<Url, ChunkId>,
}

impl ChunkPlan {
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Ids always come from this plan.
    pub fn chunk(&self, id: ChunkId) -> &Chunk {
        &self.chunks[id.0]
    }

    pub fn owner_of(&self, url: &Url) -> Option<ChunkId> {
        self.owner.get(url).copied()
    }

    pub fn chunk_of(&self, url: &Url) -> Option<&Chunk> {
        self.owner_of(url).map(|id| self.chunk(id))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

struct Draft {
    kind: ChunkKind,
    root: Option<Url>,
    members: Vec<Url>,
}

pub fn plan_chunks(graph: &ModuleGraph, config: &ChunkingConfig) -> Result<ChunkPlan, ChunkError> {
    let cyclic = graph.cyclic_nodes();
    let mut roots = discover_roots(graph, &cyclic);
    let mut promoted = 0usize;

    loop {
        let (drafts, owner) = assign(graph, &roots, config.shared_chunks);
        match conflict(graph, &drafts, &owner) {
            Some(url) => {
                debug!(url = %url, "binding conflict, moving module to its own chunk");
                roots.insert(url, ChunkKind::Isolated);
                promoted += 1;
            }
            None => {
                let plan = finish(graph, drafts, owner)?;
                info!(
                    chunks = plan.len(),
                    roots = roots.len(),
                    promoted,
                    "Planned chunks"
                );
                return Ok(plan);
            }
        }
    }
}

fn assign(
    graph: &ModuleGraph,
    roots: &IndexMap<Url, ChunkKind>,
    shared: bool,
) -> (Vec<Draft>, HashMap<Url, usize>) {
    let mut drafts: Vec<Draft> = roots
        .iter()
        .map(|(root, kind)| Draft {
            kind: *kind,
            root: Some(root.clone()),
            members: Vec::new(),
        })
        .collect();
    let mut owner: HashMap<Url, usize> = roots
        .keys()
        .enumerate()
        .map(|(index, root)| (root.clone(), index))
        .collect();

    if shared {
        let mut reach: HashMap<Url, Vec<usize>> = HashMap::default();
        for (index, root) in roots.keys().enumerate() {
            let reached = post_order([root.clone()], |url| internal_targets(graph, url, roots));
            for url in reached {
                if !roots.contains_key(&url) {
                    reach.entry(url).or_default().push(index);
                }
            }
        }

        let mut groups: IndexMap<Vec<usize>, usize> = IndexMap::new();
        for node in graph.live_nodes() {
            let Some(reached_by) = reach.get(&node.url) else {
                continue;
            };
            let index = if reached_by.len() == 1 {
                reached_by[0]
            } else {
                *groups.entry(reached_by.clone()).or_insert_with(|| {
                    drafts.push(Draft {
                        kind: ChunkKind::Shared,
                        root: None,
                        members: Vec::new(),
                    });
                    drafts.len() - 1
                })
            };
            owner.insert(node.url.clone(), index);
        }
    } else {
        for (index, root) in roots.keys().enumerate() {
            let reached = post_order([root.clone()], |url| {
                internal_targets(graph, url, roots)
                    .into_iter()
                    .filter(|target| !owner.contains_key(target))
                    .collect()
            });
            for url in reached {
                owner.entry(url).or_insert(index);
            }
        }
    }

    for (index, draft) in drafts.iter_mut().enumerate() {
        let starts: Vec<Url> = match &draft.root {
            Some(root) => vec![root.clone()],
            None => graph
                .live_nodes()
                .filter(|node| owner.get(&node.url) == Some(&index))
                .map(|node| node.url.clone())
                .collect(),
        };
        draft.members = post_order(starts, |url| {
            internal_targets(graph, url, roots)
                .into_iter()
                .filter(|target| owner.get(target) == Some(&index))
                .collect()
        });
    }

    (drafts, owner)
}

/// First module to promote, scanning JS chunks in order.
fn conflict(graph: &ModuleGraph, drafts: &[Draft], owner: &HashMap<Url, usize>) -> Option<Url> {
    drafts.iter().enumerate().find_map(|(index, draft)| {
        let lead = draft.root.as_ref().or(draft.members.first())?;
        let family = graph.node(lead)?.content_type.family();
        if family != ContentFamily::Script || draft.members.len() < 2 {
            return None;
        }
        let same_chunk = |url: &Url| owner.get(url) == Some(&index);
        find_conflict(graph, &draft.members, draft.root.as_ref(), &same_chunk)
    })
}

fn finish(
    graph: &ModuleGraph,
    drafts: Vec<Draft>,
    owner: HashMap<Url, usize>,
) -> Result<ChunkPlan, ChunkError> {
    let mut chunks: Vec<Chunk> = drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| Chunk {
            id: ChunkId(index),
            shared: draft.kind == ChunkKind::Shared,
            kind: draft.kind,
            root: draft.root,
            members: draft.members,
            entries: Vec::new(),
        })
        .collect();

    if let Some(empty) = chunks.iter().find(|chunk| chunk.members.is_empty()) {
        return Err(ChunkError::EmptyChunk { id: empty.id });
    }

    let owner: HashMap<Url, ChunkId> = owner
        .into_iter()
        .map(|(url, index)| (url, ChunkId(index)))
        .collect();

    for (entry_index, entry) in graph.entries().iter().enumerate() {
        let mut reached: HashSet<ChunkId> = HashSet::default();
        for url in graph.reachable_from([entry.url.clone()], |_| true) {
            if let Some(id) = owner.get(&url) {
                reached.insert(*id);
            }
        }
        for chunk in &mut chunks {
            if reached.contains(&chunk.id) {
                chunk.entries.push(entry_index);
            }
        }
    }

    Ok(ChunkPlan { chunks, owner })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use kiln_graph::{
        ByteSpan, EntryPoint, EsmSyntax, ExportForm, ExportRecord, ImportBinding, ImportForm,
        ImportRecord, ImportedName, ModuleNode, Reference, ReferenceKind,
    };

    fn url(path: &str) -> Url {
        Url::parse(&format!("file:///site/{path}")).unwrap()
    }

    /// A JS module importing `imports` (kind, target, names) and exporting `declared`.
    fn js(path: &str, imports: &[(ReferenceKind, &str, &[&str])], declared: &[&str]) -> ModuleNode {
        let mut references = Vec::new();
        let mut records = Vec::new();
        for (index, (kind, target, names)) in imports.iter().enumerate() {
            references.push(
                Reference::new(*kind, format!("./{target}"), ByteSpan::default())
                    .resolved_to(url(target)),
            );
            if *kind == ReferenceKind::StaticImport {
                records.push(ImportRecord {
                    reference: index,
                    statement: ByteSpan::default(),
                    form: ImportForm::Import,
                    bindings: names
                        .iter()
                        .map(|name| ImportBinding {
                            imported: ImportedName::Named(name.to_string()),
                            local: name.to_string(),
                        })
                        .collect(),
                });
            }
        }
        let syntax = EsmSyntax {
            imports: records,
            exports: declared
                .iter()
                .map(|name| ExportRecord {
                    statement: ByteSpan::default(),
                    form: ExportForm::Declaration {
                        keyword: ByteSpan::default(),
                        names: vec![name.to_string()],
                    },
                })
                .collect(),
            declared: declared.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        };
        ModuleNode::builder(url(path), ContentType::JavaScript)
            .references(references)
            .syntax(Some(syntax))
            .build()
    }

    /// Sets the names `node` reads as globals and the bindings it reassigns.
    fn scoped(mut node: ModuleNode, globals: &[&str], reassigned: &[&str]) -> ModuleNode {
        if let Some(syntax) = node.syntax.as_mut() {
            let syntax = Arc::make_mut(syntax);
            syntax.globals = globals.iter().map(|name| name.to_string()).collect();
            syntax.reassigned = reassigned.iter().map(|name| name.to_string()).collect();
        }
        node
    }

    /// Renames the local of the first import binding of `imported`.
    fn alias(mut node: ModuleNode, imported: &str, local: &str) -> ModuleNode {
        if let Some(syntax) = node.syntax.as_mut() {
            let binding = Arc::make_mut(syntax)
                .imports
                .iter_mut()
                .flat_map(|record| record.bindings.iter_mut())
                .find(|binding| binding.imported.export_name() == Some(imported));
            if let Some(binding) = binding {
                binding.local = local.to_string();
            }
        }
        node
    }

    fn graph(entries: &[&str], nodes: Vec<ModuleNode>) -> ModuleGraph {
        let entries = entries
            .iter()
            .map(|path| EntryPoint::new(url(path), *path))
            .collect();
        let mut graph = ModuleGraph::new(url(""), entries);
        for node in nodes {
            graph.insert_node(node);
        }
        graph.link();
        graph
    }

    fn members(plan: &ChunkPlan, index: usize) -> Vec<String> {
        plan.chunks()[index]
            .members
            .iter()
            .map(|url| url.path().trim_start_matches("/site/").to_string())
            .collect()
    }

    #[test]
    fn test_static_imports_merge_dynamic_split() {
        use ReferenceKind::*;
        let graph = graph(&["main.js"], vec![
            js("main.js", &[(StaticImport, "util.js", &["helper"]), (DynamicImport, "lazy.js", &[])], &[]),
            js("util.js", &[], &["helper"]),
            js("lazy.js", &[], &["lazy"]),
        ]);
        let plan = plan_chunks(&graph, &ChunkingConfig::default()).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(members(&plan, 0), vec!["util.js", "main.js"]);
        assert_eq!(plan.chunks()[0].kind, ChunkKind::Entry);
        assert_eq!(members(&plan, 1), vec!["lazy.js"]);
        assert_eq!(plan.chunks()[1].kind, ChunkKind::Dynamic);
        assert_eq!(plan.chunks()[1].entries, vec![0]);
    }

    #[test]
    fn test_tie_break_prefers_first_root() {
        use ReferenceKind::*;
        let graph = graph(&["a.js", "b.js"], vec![
            js("a.js", &[(StaticImport, "shared.js", &["s"])], &[]),
            js("b.js", &[(StaticImport, "shared.js", &["s"])], &[]),
            js("shared.js", &[], &["s"]),
        ]);
        let plan = plan_chunks(&graph, &ChunkingConfig::default()).unwrap();
        assert_eq!(members(&plan, 0), vec!["shared.js", "a.js"]);
        assert_eq!(members(&plan, 1), vec!["b.js"]);
        assert_eq!(plan.owner_of(&url("shared.js")), Some(ChunkId(0)));

        let plan = plan_chunks(&graph, &ChunkingConfig { shared_chunks: true }).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(members(&plan, 0), vec!["a.js"]);
        assert_eq!(members(&plan, 2), vec!["shared.js"]);
        assert!(plan.chunks()[2].shared);
        assert_eq!(plan.chunks()[2].root, None);
        assert_eq!(plan.chunks()[2].entries, vec![0, 1]);
    }

    #[test]
    fn test_cycles_are_isolated() {
        use ReferenceKind::*;
        let graph = graph(&["main.js"], vec![
            js("main.js", &[(StaticImport, "a.js", &["a"])], &[]),
            js("a.js", &[(StaticImport, "b.js", &["b"])], &["a"]),
            js("b.js", &[(StaticImport, "a.js", &["a"])], &["b"]),
        ]);
        let plan = plan_chunks(&graph, &ChunkingConfig::default()).unwrap();
        assert_eq!(plan.len(), 3);
        for chunk in plan.chunks() {
            assert_eq!(chunk.members.len(), 1);
        }
    }

    #[test]
    fn test_binding_conflict_promotes_later_member() {
        use ReferenceKind::*;
        let graph = graph(&["main.js"], vec![
            js("main.js", &[(StaticImport, "a.js", &[]), (StaticImport, "b.js", &[])], &[]),
            js("a.js", &[], &["config"]),
            js("b.js", &[], &["config"]),
        ]);
        let plan = plan_chunks(&graph, &ChunkingConfig::default()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(members(&plan, 0), vec!["a.js", "main.js"]);
        assert_eq!(members(&plan, 1), vec!["b.js"]);
        assert_eq!(plan.chunks()[1].kind, ChunkKind::Isolated);
    }

    #[test]
    fn test_name_read_as_global_elsewhere_is_a_conflict() {
        use ReferenceKind::*;
        // util.js binds `name`, which main.js (the root) reads as a global
        let shadowed = graph(&["main.js"], vec![
            scoped(js("main.js", &[(StaticImport, "util.js", &["greet"])], &[]), &["console", "name"], &[]),
            js("util.js", &[], &["greet", "name"]),
        ]);
        let plan = plan_chunks(&shadowed, &ChunkingConfig::default()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(members(&plan, 0), vec!["main.js"]);
        assert_eq!(members(&plan, 1), vec!["util.js"]);
        assert_eq!(plan.chunks()[1].kind, ChunkKind::Isolated);

        // A later non-root reader leaves instead
        let reader = graph(&["main.js"], vec![
            js("main.js", &[(StaticImport, "a.js", &[]), (StaticImport, "b.js", &[])], &[]),
            js("a.js", &[], &["name"]),
            scoped(js("b.js", &[], &[]), &["name"], &[]),
        ]);
        let plan = plan_chunks(&reader, &ChunkingConfig::default()).unwrap();
        assert_eq!(members(&plan, 0), vec!["a.js", "main.js"]);
        assert_eq!(members(&plan, 1), vec!["b.js"]);

        // Globals nobody binds are fine
        let unbound = graph(&["main.js"], vec![
            scoped(js("main.js", &[(StaticImport, "util.js", &["greet"])], &[]), &["document"], &[]),
            scoped(js("util.js", &[], &["greet"]), &["console"], &[]),
        ]);
        let plan = plan_chunks(&unbound, &ChunkingConfig::default()).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_aliased_reassigned_binding_is_not_concatenated() {
        use ReferenceKind::*;
        let main = || js("main.js", &[(StaticImport, "counter.js", &["count", "inc"])], &[]);
        let counter = |reassigned: &[&str]| {
            scoped(js("counter.js", &[], &["count", "inc"]), &[], reassigned)
        };

        let aliased = graph(&["main.js"], vec![alias(main(), "count", "c"), counter(&["count"])]);
        let plan = plan_chunks(&aliased, &ChunkingConfig::default()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(members(&plan, 0), vec!["main.js"]);
        assert_eq!(members(&plan, 1), vec!["counter.js"]);

        // Same local name: the importer reads the exporter's binding directly
        let direct = graph(&["main.js"], vec![main(), counter(&["count"])]);
        let plan = plan_chunks(&direct, &ChunkingConfig::default()).unwrap();
        assert_eq!(members(&plan, 0), vec!["counter.js", "main.js"]);

        // Never reassigned: a `const` alias is equivalent
        let constant = graph(&["main.js"], vec![alias(main(), "count", "c"), counter(&[])]);
        let plan = plan_chunks(&constant, &ChunkingConfig::default()).unwrap();
        assert_eq!(members(&plan, 0), vec!["counter.js", "main.js"]);
    }

    #[test]
    fn test_every_node_has_exactly_one_chunk() {
        use ReferenceKind::*;
        let graph = graph(&["main.js", "other.js"], vec![
            js("main.js", &[(StaticImport, "x.js", &[]), (DynamicImport, "y.js", &[])], &[]),
            js("other.js", &[(StaticImport, "y.js", &[])], &[]),
            js("x.js", &[(StaticImport, "z.js", &[])], &[]),
            js("y.js", &[(StaticImport, "z.js", &[])], &[]),
            js("z.js", &[], &[]),
        ]);
        for shared_chunks in [false, true] {
            let plan = plan_chunks(&graph, &ChunkingConfig { shared_chunks }).unwrap();
            let mut seen = HashSet::default();
            for chunk in plan.chunks() {
                for member in &chunk.members {
                    assert!(seen.insert(member.clone()), "{member} assigned twice");
                    assert_eq!(plan.owner_of(member), Some(chunk.id));
                }
            }
            assert_eq!(seen.len(), graph.len());
        }
    }
}
