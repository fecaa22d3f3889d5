//! Top-level names a JS member binds once concatenated into a chunk.

use kiln_graph::{ImportForm, ImportedName, ModuleGraph, ModuleNode, ReferenceId};
use rustc_hash::FxHashMap as HashMap;
use url::Url;

/// Who provides a top-level name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Binder {
    /// Declared by the member, or an alias it introduces.
    Own(Url),
    /// Hoisted import of `name` from another artifact or an external URL.
    Import { target: Url, name: ImportedName },
}

/// How an import declaration of a member is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImportPlacement {
    /// Left where it is (unresolved, pruned).
    Verbatim,
    /// Replaced by aliases to the target's locals.
    Inlined,
    /// Regenerated at the top of the chunk.
    Hoisted,
}

pub(crate) fn import_placement(
    graph: &ModuleGraph,
    member: &ModuleNode,
    index: usize,
    same_chunk: &dyn Fn(&Url) -> bool,
) -> ImportPlacement {
    let id = ReferenceId {
        source: member.url.clone(),
        index,
    };
    let Some(target) = member.references.get(index).and_then(|r| r.resolved()) else {
        return ImportPlacement::Verbatim;
    };
    if graph.is_unresolved(&id) {
        ImportPlacement::Verbatim
    } else if graph.is_external(target) {
        ImportPlacement::Hoisted
    } else if !graph.contains(target) {
        ImportPlacement::Verbatim
    } else if same_chunk(target) {
        ImportPlacement::Inlined
    } else {
        ImportPlacement::Hoisted
    }
}

/// Names `member` binds at the top level of its chunk, in source order.
///
/// Intra-chunk imports whose local name equals the exporter's local bind
/// nothing new.
pub(crate) fn top_level_bindings(
    graph: &ModuleGraph,
    member: &ModuleNode,
    same_chunk: &dyn Fn(&Url) -> bool,
) -> Vec<(String, Binder)> {
    let Some(syntax) = member.syntax.as_deref() else {
        return Vec::new();
    };
    let own = || Binder::Own(member.url.clone());
    let mut bindings: Vec<(String, Binder)> =
        syntax.declared.iter().map(|name| (name.clone(), own())).collect();

    for record in &syntax.imports {
        if record.form != ImportForm::Import {
            continue;
        }
        let target = member
            .references
            .get(record.reference)
            .and_then(|reference| reference.resolved());
        match (import_placement(graph, member, record.reference, same_chunk), target) {
            (ImportPlacement::Hoisted, Some(target)) => {
                for binding in &record.bindings {
                    bindings.push((
                        binding.local.clone(),
                        Binder::Import {
                            target: target.clone(),
                            name: binding.imported.clone(),
                        },
                    ));
                }
            }
            (ImportPlacement::Inlined, Some(target)) => {
                let exporter = graph.node(target).and_then(|node| node.syntax.as_deref());
                for binding in &record.bindings {
                    let local = binding
                        .imported
                        .export_name()
                        .and_then(|name| exporter.and_then(|s| s.local_for_export(name)));
                    if local != Some(binding.local.as_str()) {
                        bindings.push((binding.local.clone(), own()));
                    }
                }
            }
            _ => {
                for binding in &record.bindings {
                    bindings.push((binding.local.clone(), own()));
                }
            }
        }
    }
    bindings
}

/// Exporter of a same-chunk import that would have to be aliased to a
/// binding it reassigns. A `const` alias would freeze the value.
fn frozen_alias(
    graph: &ModuleGraph,
    member: &ModuleNode,
    same_chunk: &dyn Fn(&Url) -> bool,
) -> Option<Url> {
    let syntax = member.syntax.as_deref()?;
    syntax
        .imports
        .iter()
        .filter(|record| record.form == ImportForm::Import)
        .filter(|record| {
            import_placement(graph, member, record.reference, same_chunk)
                == ImportPlacement::Inlined
        })
        .find_map(|record| {
            let target = member.references.get(record.reference)?.resolved()?;
            let exporter = graph.node(target)?.syntax.as_deref()?;
            record
                .bindings
                .iter()
                .filter_map(|binding| {
                    let name = binding.imported.export_name()?;
                    let local = exporter.local_for_export(name)?;
                    (local != binding.local).then_some(local)
                })
                .any(|local| exporter.is_reassigned(local))
                .then(|| target.clone())
        })
}

/// First member that has to leave the chunk. A member leaves when
///
/// - a name it binds is already bound differently;
/// - a name it binds is read as a global by another member, or the reverse;
/// - it exports a reassigned binding that another member imports under a
///   different name.
///
/// The root never leaves; the other party does.
pub(crate) fn find_conflict(
    graph: &ModuleGraph,
    members: &[Url],
    root: Option<&Url>,
    same_chunk: &dyn Fn(&Url) -> bool,
) -> Option<Url> {
    let leaving = |member: &Url, other: &Url| {
        if Some(member) == root {
            other.clone()
        } else {
            member.clone()
        }
    };
    let mut bound: HashMap<String, (Binder, &Url)> = HashMap::default();
    let mut globals: HashMap<&str, &Url> = HashMap::default();

    for member in members {
        let Some(node) = graph.node(member) else {
            continue;
        };
        if let Some(exporter) = frozen_alias(graph, node, same_chunk) {
            return Some(leaving(&exporter, member));
        }

        for (name, binder) in top_level_bindings(graph, node, same_chunk) {
            if let Some(reader) = globals.get(name.as_str()) {
                return Some(leaving(member, *reader));
            }
            match bound.get(&name) {
                Some((existing, owner)) if *existing != binder => {
                    return Some(leaving(member, *owner));
                }
                Some(_) => {}
                None => {
                    bound.insert(name, (binder, member));
                }
            }
        }

        for name in node.syntax.iter().flat_map(|syntax| &syntax.globals) {
            if let Some((_, owner)) = bound.get(name) {
                return Some(leaving(member, *owner));
            }
            globals.entry(name.as_str()).or_insert(member);
        }
    }
    None
}
