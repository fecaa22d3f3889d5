//! Post-traversal assembly.
//!
//! Turns the unordered results of the load tasks into a canonical
//! [`ModuleGraph`] and decides which failures are fatal. A failure is fatal
//! when the failing node is an entry point or when a statically-live node
//! depends on it through a non-dynamic edge; everything else is pruned with a
//! warning.

use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use tracing::warn;
use url::Url;

use super::GraphError;
use super::load::{LoadFailure, Loaded};
use crate::diagnostics::{BuildDiagnostic, BuildReport, DiagnosticKind, SourcePosition};
use crate::extract::TransformError;
use crate::graph::{EntryPoint, ModuleGraph, breadth_first};
use crate::reference::{Reference, ReferenceId};
use crate::resolve::ResolveError;

/// Raw traversal results, keyed by URL.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub loaded: HashMap<Url, Loaded>,
    pub failed: HashMap<Url, LoadFailure>,
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoadCounts {
    pub loaded: usize,
    pub reused: usize,
}

/// A diagnostic plus the URL its chain should lead to.
struct Pending {
    diagnostic: BuildDiagnostic,
    chain_target: Url,
    fatal: bool,
}

pub(crate) fn assemble(
    root: &Url,
    entries: Vec<EntryPoint>,
    mut collected: Collected,
    previous: Option<&ModuleGraph>,
) -> Result<(ModuleGraph, LoadCounts), GraphError> {
    let starts: Vec<Url> = entries
        .iter()
        .map(|entry| entry.url.clone())
        .filter(|url| collected.loaded.contains_key(url))
        .collect();

    let order = breadth_first(starts.clone(), |url| {
        loaded_targets(&collected.loaded, url, |_| true)
    });
    let static_live: HashSet<Url> = breadth_first(starts, |url| {
        loaded_targets(&collected.loaded, url, |reference| reference.kind().is_eager())
    })
    .into_iter()
    .collect();

    let pending = classify(&entries, &order, &collected, &static_live);

    let mut counts = LoadCounts::default();
    let mut graph = ModuleGraph::new(root.clone(), entries);
    let mut unresolved = Vec::new();
    let mut externals = Vec::new();
    for url in &order {
        let Some(loaded) = collected.loaded.remove(url) else {
            continue;
        };
        if loaded.reused {
            counts.reused += 1;
        } else {
            counts.loaded += 1;
        }
        let indices = loaded
            .unresolved
            .iter()
            .map(|(index, _)| *index)
            .chain(loaded.skipped.iter().copied());
        unresolved.extend(indices.map(|index| ReferenceId {
            source: url.clone(),
            index,
        }));
        externals.extend(loaded.externals);
        graph.insert_node(loaded.node);
    }

    if let Some(previous) = previous {
        let stale: Vec<_> = previous
            .nodes()
            .filter(|node| !graph.contains(&node.url))
            .cloned()
            .collect();
        for node in stale {
            graph.mark_unreachable(node.url.clone());
            graph.insert_node(node);
        }
    }
    graph.link();

    let (fatal, warnings): (Vec<_>, Vec<_>) = pending.into_iter().partition(|p| p.fatal);
    if !fatal.is_empty() {
        let mut diagnostics: Vec<BuildDiagnostic> = fatal
            .into_iter()
            .map(|p| {
                let chain = graph.chain_to(&p.chain_target);
                p.diagnostic.with_chain(chain)
            })
            .collect();
        diagnostics.extend(warnings.into_iter().map(|p| p.diagnostic.into_warning()));
        return Err(GraphError::Build(BuildReport::new(diagnostics)));
    }

    for url in collected.failed.into_keys() {
        graph.mark_pruned(url);
    }
    for id in unresolved {
        graph.mark_unresolved(id);
    }
    for url in externals {
        graph.add_external(url);
    }
    for p in warnings {
        warn!("{}", p.diagnostic.message);
        graph.push_warning(p.diagnostic);
    }

    Ok((graph, counts))
}

fn loaded_targets(
    loaded: &HashMap<Url, Loaded>,
    url: &Url,
    filter: impl Fn(&Reference) -> bool,
) -> Vec<Url> {
    loaded
        .get(url)
        .map(|l| {
            l.node
                .targets()
                .filter(|(reference, target)| filter(reference) && loaded.contains_key(*target))
                .map(|(_, target)| target.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Every failure in a deterministic order: entries first, then in
/// canonical node order and source order of the references.
fn classify(
    entries: &[EntryPoint],
    order: &[Url],
    collected: &Collected,
    static_live: &HashSet<Url>,
) -> Vec<Pending> {
    let mut pending = Vec::new();
    let mut reported: HashSet<&Url> = HashSet::default();

    for entry in entries {
        if let Some(failure) = collected.failed.get(&entry.url) {
            if reported.insert(&entry.url) {
                pending.push(Pending {
                    diagnostic: failure_diagnostic(&entry.url, failure, true, None),
                    chain_target: entry.url.clone(),
                    fatal: true,
                });
            }
        }
    }

    // Which failed targets are pinned by a static edge from live code
    let mut pinned: HashSet<&Url> = HashSet::default();
    for url in order {
        let Some(loaded) = collected.loaded.get(url) else {
            continue;
        };
        if !static_live.contains(url) {
            continue;
        }
        for (reference, target) in loaded.node.targets() {
            if reference.kind().is_eager() && collected.failed.contains_key(target) {
                pinned.insert(target);
            }
        }
    }

    for url in order {
        let Some(loaded) = collected.loaded.get(url) else {
            continue;
        };
        let unresolved: HashMap<usize, &ResolveError> = loaded
            .unresolved
            .iter()
            .map(|(index, err)| (*index, err))
            .collect();

        for (index, reference) in loaded.node.references.iter().enumerate() {
            if let Some(err) = unresolved.get(&index) {
                let fatal = reference.kind().is_eager() && static_live.contains(url);
                let position = loaded
                    .node
                    .text()
                    .map(|text| SourcePosition::from_offset(text, reference.span().start));
                pending.push(Pending {
                    diagnostic: resolve_diagnostic(url, reference, err, position, fatal),
                    chain_target: url.clone(),
                    fatal,
                });
                continue;
            }

            let Some(target) = reference.resolved() else {
                continue;
            };
            let Some(failure) = collected.failed.get(target) else {
                continue;
            };
            if !reported.insert(target) {
                continue;
            }
            let fatal = pinned.contains(target);
            pending.push(Pending {
                diagnostic: failure_diagnostic(target, failure, fatal, Some(reference)),
                chain_target: target.clone(),
                fatal,
            });
        }
    }
    pending
}

fn failure_diagnostic(
    url: &Url,
    failure: &LoadFailure,
    fatal: bool,
    via: Option<&Reference>,
) -> BuildDiagnostic {
    let is_entry = via.is_none();
    let (kind, message, position) = match failure {
        LoadFailure::Read(err) if is_entry => (
            DiagnosticKind::UnreachableEntryPoint,
            format!("Entry point {url} cannot be read: {err}"),
            None,
        ),
        LoadFailure::Read(err) => (
            DiagnosticKind::ReadFailure,
            format!("Failed to read {url}: {err}"),
            None,
        ),
        LoadFailure::Transform(err) => {
            let message = match err {
                TransformError::Syntax { message, .. } => format!("Syntax error in {url}: {message}"),
                other => other.to_string(),
            };
            (DiagnosticKind::SyntaxError, message, err.position())
        }
    };

    let mut diagnostic = if fatal {
        BuildDiagnostic::error(kind, message)
    } else {
        BuildDiagnostic::warning(kind, message)
    };
    diagnostic = diagnostic.with_url(url.clone()).with_position(position);
    if let Some(reference) = via {
        diagnostic = diagnostic.with_specifier(reference.specifier());
    }
    diagnostic
}

fn resolve_diagnostic(
    source: &Url,
    reference: &Reference,
    err: &ResolveError,
    position: Option<SourcePosition>,
    fatal: bool,
) -> BuildDiagnostic {
    let kind = match err {
        ResolveError::UnresolvedBareSpecifier { .. } => DiagnosticKind::UnresolvedBareSpecifier,
        ResolveError::InvalidUrl { .. } | ResolveError::InvalidMapping { .. } => {
            DiagnosticKind::InvalidSpecifier
        }
    };
    let diagnostic = if fatal {
        BuildDiagnostic::error(kind, err.to_string())
    } else {
        BuildDiagnostic::warning(kind, err.to_string())
    };
    diagnostic
        .with_url(source.clone())
        .with_specifier(reference.specifier())
        .with_position(position)
}
