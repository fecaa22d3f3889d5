//! JS chunk rendering.
//!
//! Members are concatenated deps-first. Per member:
//!
//! - imports of same-chunk members turn into `const` aliases, or disappear
//!   when the names already line up;
//! - imports of other artifacts and external URLs are removed and
//!   regenerated once at the top of the artifact;
//! - non-root members lose their `export` syntax.
//!
//! Non-root members that other chunks import from are re-exported under a
//! `__kiln_` prefix at the end of the artifact, so their names cannot clash
//! with the root's own exports.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use kiln_graph::resolve::strip_markers;
use kiln_graph::{
    EsmSyntax, ExportForm, ImportForm, ImportRecord, ImportedName, Marker, ModuleGraph,
    ModuleNode,
};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use url::Url;

use super::{Edit, Renderer, apply_edits, join_parts, quote};
use crate::chunking::{Chunk, ChunkPlan, ImportPlacement, import_placement};
use crate::output::WriteError;
use crate::output::layout::Artifact;

const MANGLE_PREFIX: &str = "__kiln_";

/// Export name under which a non-root member exposes `local`.
pub(crate) fn mangled(local: &str) -> String {
    if local.starts_with(MANGLE_PREFIX) {
        local.to_string()
    } else {
        format!("{MANGLE_PREFIX}{local}")
    }
}

/// Local binding behind `imported` on `target`.
fn export_local<'g>(
    graph: &'g ModuleGraph,
    importer: &Url,
    target: &Url,
    imported: &ImportedName,
) -> Result<&'g str, WriteError> {
    let missing = || WriteError::MissingExport {
        from: importer.clone(),
        target: target.clone(),
        name: imported.export_name().unwrap_or("*").to_string(),
    };
    let syntax = graph
        .node(target)
        .and_then(|node| node.syntax.as_deref())
        .ok_or_else(missing)?;
    imported
        .export_name()
        .and_then(|name| syntax.local_for_export(name))
        .ok_or_else(missing)
}

fn target_of<'n>(node: &'n ModuleNode, record: &ImportRecord) -> Option<&'n Url> {
    node.references
        .get(record.reference)
        .and_then(|reference| reference.resolved())
}

/// Locals of non-root members imported from outside their chunk.
pub(super) fn mangled_exports(
    graph: &ModuleGraph,
    plan: &ChunkPlan,
) -> Result<HashMap<Url, BTreeSet<String>>, WriteError> {
    let mut exported: HashMap<Url, BTreeSet<String>> = HashMap::default();
    for node in graph.live_nodes() {
        let Some(syntax) = node.syntax.as_deref() else {
            continue;
        };
        for record in &syntax.imports {
            if record.form != ImportForm::Import {
                continue;
            }
            let Some(target) = target_of(node, record) else {
                continue;
            };
            let Some(chunk) = plan.chunk_of(target) else {
                continue;
            };
            if chunk.is_root(target) || plan.owner_of(&node.url) == Some(chunk.id) {
                continue;
            }
            for binding in &record.bindings {
                let local = export_local(graph, &node.url, target, &binding.imported)?;
                exported
                    .entry(target.clone())
                    .or_default()
                    .insert(local.to_string());
            }
        }
    }
    Ok(exported)
}

#[derive(Debug, Default)]
struct HoistedImport {
    /// `(export name, local)`
    named: IndexSet<(String, String)>,
    namespaces: IndexSet<String>,
}

/// Import declarations regenerated at the top of the artifact.
#[derive(Debug, Default)]
struct Hoisted {
    imports: IndexMap<(String, Option<Marker>), HoistedImport>,
}

impl Hoisted {
    fn add(
        &mut self,
        renderer: &Renderer<'_>,
        from: &Artifact,
        node: &ModuleNode,
        record: &ImportRecord,
        target: &Url,
    ) -> Result<(), WriteError> {
        let specifier = match renderer.rewrite(from, node, record.reference)? {
            Some(specifier) => specifier,
            None => node
                .references
                .get(record.reference)
                .map(|reference| reference.specifier().to_string())
                .unwrap_or_default(),
        };
        let marker = strip_markers(target).1;
        let mangle = !renderer.graph.is_external(target)
            && renderer
                .plan
                .chunk_of(target)
                .is_some_and(|chunk| !chunk.is_root(target));

        let import = self.imports.entry((specifier, marker)).or_default();
        for binding in &record.bindings {
            match &binding.imported {
                ImportedName::Namespace => {
                    import.namespaces.insert(binding.local.clone());
                }
                imported if mangle => {
                    let local = export_local(renderer.graph, &node.url, target, imported)?;
                    import.named.insert((mangled(local), binding.local.clone()));
                }
                imported => {
                    let name = imported.export_name().unwrap_or("default");
                    import.named.insert((name.to_string(), binding.local.clone()));
                }
            }
        }
        Ok(())
    }

    fn statements(&self) -> Vec<String> {
        let mut statements = Vec::new();
        for ((specifier, marker), import) in &self.imports {
            let from = quote(specifier);
            let attributes = match marker {
                Some(Marker::CssModule) => " with { type: \"css\" }",
                Some(Marker::JsonModule) => " with { type: \"json\" }",
                None => "",
            };
            for namespace in &import.namespaces {
                statements.push(format!("import * as {namespace} from {from}{attributes};"));
            }
            if !import.named.is_empty() {
                let names: Vec<String> = import
                    .named
                    .iter()
                    .map(|(name, local)| {
                        if name == local {
                            name.clone()
                        } else {
                            format!("{name} as {local}")
                        }
                    })
                    .collect();
                statements.push(format!(
                    "import {{ {} }} from {from}{attributes};",
                    names.join(", ")
                ));
            }
            if import.named.is_empty() && import.namespaces.is_empty() {
                statements.push(format!("import {from}{attributes};"));
            }
        }
        statements
    }
}

/// `const local = targetLocal;` for every binding whose names differ. The
/// planner never concatenates an exporter whose aliased binding is reassigned.
fn aliases(
    graph: &ModuleGraph,
    node: &ModuleNode,
    record: &ImportRecord,
    target: &Url,
) -> Result<String, WriteError> {
    let mut aliases = Vec::new();
    for binding in &record.bindings {
        let local = export_local(graph, &node.url, target, &binding.imported)?;
        if local != binding.local {
            aliases.push(format!("const {} = {};", binding.local, local));
        }
    }
    Ok(aliases.join(" "))
}

fn strip_exports(syntax: &EsmSyntax) -> Vec<Edit> {
    let mut edits = Vec::new();
    for record in &syntax.exports {
        match &record.form {
            ExportForm::Declaration { keyword, .. } => edits.push(Edit::remove(keyword.range())),
            ExportForm::Local { .. } => edits.push(Edit::remove(record.statement.range())),
            ExportForm::Default {
                prefix,
                local,
                needs_binding: true,
                value_end,
            } => {
                edits.push(Edit::new(prefix.range(), format!("const {local} = ")));
                edits.push(Edit::new(*value_end..*value_end, ";"));
            }
            ExportForm::Default { prefix, .. } => edits.push(Edit::remove(prefix.range())),
        }
    }
    edits
}

pub(super) fn render(renderer: &Renderer<'_>, chunk: &Chunk) -> Result<Option<String>, WriteError> {
    let graph = renderer.graph;
    let artifact = renderer.layout.artifact(chunk.id);
    let same_chunk = |url: &Url| renderer.plan.owner_of(url) == Some(chunk.id);

    let mut hoisted = Hoisted::default();
    let mut hashbang = None;
    let mut bodies = Vec::with_capacity(chunk.members.len());
    let mut exports = Vec::new();

    for member in &chunk.members {
        let Some(node) = graph.node(member) else {
            continue;
        };
        let Some(text) = node.text() else {
            if chunk.members.len() == 1 {
                return Ok(None);
            }
            continue;
        };
        let is_root = chunk.is_root(member);
        let mut edits = Vec::new();
        let mut handled: HashSet<usize> = HashSet::default();

        if let Some(syntax) = node.syntax.as_deref() {
            for record in &syntax.imports {
                if record.form != ImportForm::Import {
                    continue;
                }
                let Some(target) = target_of(node, record) else {
                    continue;
                };
                match import_placement(graph, node, record.reference, &same_chunk) {
                    ImportPlacement::Verbatim => {}
                    ImportPlacement::Inlined => {
                        handled.insert(record.reference);
                        let replacement = aliases(graph, node, record, target)?;
                        edits.push(Edit::new(record.statement.range(), replacement));
                    }
                    ImportPlacement::Hoisted => {
                        handled.insert(record.reference);
                        hoisted.add(renderer, artifact, node, record, target)?;
                        edits.push(Edit::remove(record.statement.range()));
                    }
                }
            }
            if !is_root {
                edits.extend(strip_exports(syntax));
            }
        }

        if is_root && text.starts_with("#!") {
            let end = text.find('\n').map_or(text.len(), |at| at + 1);
            hashbang = Some(text[..end].trim_end().to_string());
            edits.push(Edit::remove(0..end));
        }

        edits.extend(renderer.reference_edits(artifact, node, |index| handled.contains(&index))?);
        bodies.push(apply_edits(text, edits));

        if !is_root {
            if let Some(locals) = renderer.exported(member) {
                let names: Vec<String> = locals
                    .iter()
                    .map(|local| format!("{local} as {}", mangled(local)))
                    .collect();
                exports.push(format!("export {{ {} }};", names.join(", ")));
            }
        }
    }

    let mut parts: Vec<String> = hashbang.into_iter().collect();
    parts.extend(hoisted.statements());
    parts.extend(bodies);
    parts.extend(exports);
    let mut rendered = join_parts(parts);
    if chunk.members.len() > 1 && !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    Ok(Some(rendered))
}
